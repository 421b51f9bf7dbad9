use crate::core::credentials::PasswordResolver;
use crate::core::models::{
    BlockInfo, ConsensusInfo, DaemonVersion, GatewayInfo, HostContract, HostContracts, HostDbInfo,
    HostInfo, HostStorage, TpoolFee, WalletAddress, WalletAddresses, WalletInfo, WalletSeed,
};
use crate::core::settings::DaemonSettings;
use crate::error::DaemonError;
use crate::sia::{Form, HostApi};
use async_trait::async_trait;
use reqwest::header::USER_AGENT;
use reqwest::{Client, Method};
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::time::Duration;

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
const UNLOCK_TIMEOUT: Duration = Duration::from_secs(10);

/// Any address works; only the shape of the daemon's answer matters.
const CREDENTIAL_PROBE_ADDRESS: &str =
    "2d6c6d705c80f17448d458e47c3fb1a02a24e018a82d702cda35262085a3167d98cc7a2ba339";

const BENIGN_PROBE_ERRORS: [&str; 2] = [
    "wallet must be unlocked before it can be used",
    "no record of UnlockConditions for that UnlockHash",
];

/// Normalized daemon response: any 2xx is reported as 200 and the body is
/// `None` when it was not valid JSON.
#[derive(Debug, Clone)]
pub struct DaemonResponse {
    pub status_code: u16,
    pub body: Option<Value>,
}

impl DaemonResponse {
    pub fn is_success(&self) -> bool {
        self.status_code == 200
    }

    fn message(&self) -> Option<&str> {
        self.body.as_ref()?.get("message")?.as_str()
    }

    fn ensure_success(self) -> Result<Option<Value>, DaemonError> {
        if !self.is_success() {
            return Err(DaemonError::from_body(self.status_code, self.body.as_ref()));
        }
        Ok(self.body)
    }

    fn into_json<T: DeserializeOwned>(self, endpoint: &str) -> Result<T, DaemonError> {
        let body = self
            .ensure_success()?
            .ok_or_else(|| DaemonError::MissingBody {
                endpoint: endpoint.to_string(),
            })?;

        serde_json::from_value(body).map_err(|e| DaemonError::InvalidResponse {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })
    }
}

fn normalize_status(status: u16) -> u16 {
    if (200..300).contains(&status) {
        200
    } else {
        status
    }
}

fn base_url(api_addr: &str) -> String {
    let addr = api_addr.trim().trim_end_matches('/');
    if addr.starts_with("http://") || addr.starts_with("https://") {
        addr.to_string()
    } else {
        format!("http://{}", addr)
    }
}

fn credentials_accepted(response: &DaemonResponse) -> bool {
    if response.is_success() {
        return true;
    }

    response
        .message()
        .is_some_and(|m| BENIGN_PROBE_ERRORS.iter().any(|benign| m.contains(benign)))
}

pub struct DaemonClient {
    http: Client,
    base_url: String,
    agent: String,
    password: PasswordResolver,
    request_timeout: Duration,
    unlock_timeout: Duration,
}

impl DaemonClient {
    pub fn new(settings: &DaemonSettings) -> Result<Self, DaemonError> {
        let password = PasswordResolver::with_defaults(settings.api_password.as_deref());
        Self::with_password(settings, password)
    }

    pub fn with_password(
        settings: &DaemonSettings,
        password: PasswordResolver,
    ) -> Result<Self, DaemonError> {
        let http = Client::builder().build()?;

        Ok(Self {
            http,
            base_url: base_url(&settings.api_addr),
            agent: settings.api_agent.clone(),
            password,
            request_timeout: DEFAULT_TIMEOUT,
            unlock_timeout: UNLOCK_TIMEOUT,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub async fn request(
        &self,
        endpoint: &str,
        method: Method,
        form: Option<&Form>,
    ) -> Result<DaemonResponse, DaemonError> {
        self.request_with_timeout(endpoint, method, form, self.request_timeout)
            .await
    }

    async fn request_with_timeout(
        &self,
        endpoint: &str,
        method: Method,
        form: Option<&Form>,
        timeout: Duration,
    ) -> Result<DaemonResponse, DaemonError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let password = self.password.password().await;

        let mut request = self
            .http
            .request(method.clone(), &url)
            .basic_auth("", Some(password))
            .header(USER_AGENT, &self.agent)
            .timeout(timeout);

        if method == Method::POST {
            if let Some(form) = form {
                request = request.form(form);
            }
        }

        tracing::debug!(%method, endpoint, "Sending daemon request");
        let response = request.send().await?;
        let status_code = normalize_status(response.status().as_u16());
        let bytes = response.bytes().await?;
        let body = serde_json::from_slice::<Value>(&bytes).ok();

        Ok(DaemonResponse { status_code, body })
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, DaemonError> {
        self.request(endpoint, Method::GET, None)
            .await?
            .into_json(endpoint)
    }

    async fn post_form(&self, endpoint: &str, form: &Form) -> Result<Option<Value>, DaemonError> {
        self.request(endpoint, Method::POST, Some(form))
            .await?
            .ensure_success()
    }

    pub async fn stop_daemon(&self) -> Result<(), DaemonError> {
        self.request("/daemon/stop", Method::GET, None)
            .await?
            .ensure_success()
            .map(|_| ())
    }

    pub async fn hostdb(&self) -> Result<HostDbInfo, DaemonError> {
        self.get_json("/hostdb").await
    }

    pub async fn tpool_fee(&self) -> Result<TpoolFee, DaemonError> {
        self.get_json("/tpool/fee").await
    }

    pub async fn wallet_address(&self) -> Result<WalletAddress, DaemonError> {
        self.get_json("/wallet/address").await
    }

    pub async fn wallet_seed_addresses(&self, count: u32) -> Result<WalletAddresses, DaemonError> {
        self.get_json(&format!("/wallet/seedaddrs?count={}", count))
            .await
    }

    pub async fn unlock_conditions(&self, address: &str) -> Result<Value, DaemonError> {
        self.get_json(&format!("/wallet/unlockconditions/{}", address))
            .await
    }

    pub async fn unlock_wallet(&self, encryption_password: &str) -> Result<(), DaemonError> {
        let form = Form::from([(
            "encryptionpassword".to_string(),
            encryption_password.to_string(),
        )]);

        self.request_with_timeout("/wallet/unlock", Method::POST, Some(&form), self.unlock_timeout)
            .await?
            .ensure_success()
            .map(|_| ())
    }

    pub async fn init_wallet(&self, encryption_password: &str) -> Result<WalletSeed, DaemonError> {
        let form = Form::from([(
            "encryptionpassword".to_string(),
            encryption_password.to_string(),
        )]);

        self.request("/wallet/init", Method::POST, Some(&form))
            .await?
            .into_json("/wallet/init")
    }

    pub async fn recover_wallet(
        &self,
        seed: &str,
        encryption_password: &str,
    ) -> Result<(), DaemonError> {
        let form = Form::from([
            (
                "encryptionpassword".to_string(),
                encryption_password.to_string(),
            ),
            ("seed".to_string(), seed.to_string()),
        ]);

        self.post_form("/wallet/init/seed", &form).await.map(|_| ())
    }

    pub async fn announce_host(&self, address: Option<&str>) -> Result<(), DaemonError> {
        let mut form = Form::new();
        if let Some(address) = address.filter(|a| !a.is_empty()) {
            form.insert("netaddress".to_string(), address.to_string());
        }

        self.post_form("/host/announce", &form).await.map(|_| ())
    }

    pub async fn add_storage_folder(&self, path: &str, size: u64) -> Result<(), DaemonError> {
        let form = Form::from([
            ("path".to_string(), path.to_string()),
            ("size".to_string(), size.to_string()),
        ]);

        self.post_form("/host/storage/folders/add", &form)
            .await
            .map(|_| ())
    }

    pub async fn resize_storage_folder(&self, path: &str, size: u64) -> Result<(), DaemonError> {
        let form = Form::from([
            ("path".to_string(), path.to_string()),
            ("newsize".to_string(), size.to_string()),
        ]);

        self.post_form("/host/storage/folders/resize", &form)
            .await
            .map(|_| ())
    }

    pub async fn remove_storage_folder(&self, path: &str, force: bool) -> Result<(), DaemonError> {
        let mut form = Form::from([("path".to_string(), path.to_string())]);
        if force {
            form.insert("force".to_string(), "true".to_string());
        }

        self.post_form("/host/storage/folders/remove", &form)
            .await
            .map(|_| ())
    }
}

#[async_trait]
impl HostApi for DaemonClient {
    async fn check_credentials(&self) -> bool {
        let endpoint = format!("/wallet/unlockconditions/{}", CREDENTIAL_PROBE_ADDRESS);

        match self.request(&endpoint, Method::GET, None).await {
            Ok(response) => credentials_accepted(&response),
            Err(e) => {
                tracing::error!(error = %e, "Failed to check API credentials");
                false
            }
        }
    }

    async fn consensus(&self) -> Result<ConsensusInfo, DaemonError> {
        self.get_json("/consensus").await
    }

    async fn block(&self, height: u64) -> Result<BlockInfo, DaemonError> {
        self.get_json(&format!("/consensus/blocks?height={}", height))
            .await
    }

    async fn daemon_version(&self) -> Result<DaemonVersion, DaemonError> {
        self.get_json("/daemon/version").await
    }

    async fn gateway(&self) -> Result<GatewayInfo, DaemonError> {
        self.get_json("/gateway").await
    }

    async fn gateway_connect(&self, peer: &str) -> Result<(), DaemonError> {
        self.post_form(&format!("/gateway/connect/{}", peer), &Form::new())
            .await
            .map(|_| ())
    }

    async fn host(&self) -> Result<HostInfo, DaemonError> {
        self.get_json("/host").await
    }

    async fn update_host(&self, config: &Form) -> Result<(), DaemonError> {
        self.post_form("/host", config).await.map(|_| ())
    }

    async fn host_contracts(&self) -> Result<Vec<HostContract>, DaemonError> {
        let contracts: HostContracts = self.get_json("/host/contracts").await?;
        Ok(contracts.contracts)
    }

    async fn host_storage(&self) -> Result<HostStorage, DaemonError> {
        self.get_json("/host/storage").await
    }

    async fn wallet(&self) -> Result<WalletInfo, DaemonError> {
        self.get_json("/wallet").await
    }
}
