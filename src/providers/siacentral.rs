//! Sia Central API client for exchange rates, bootstrap peers and host
//! explorer data

use crate::core::models::{ExchangeRate, ExplorerHost};
use crate::core::settings::PriceSourceSettings;
use crate::error::PriceSourceError;
use crate::providers::PriceSource;
use async_trait::async_trait;
use reqwest::Client;
use rust_decimal::Decimal;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;

const USER_AGENT: &str = concat!("sia-host-monitor/", env!("CARGO_PKG_VERSION"));

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    message: String,
    #[serde(flatten)]
    payload: Option<T>,
}

#[derive(Debug, Deserialize)]
struct RatesPayload {
    rates: BTreeMap<String, BTreeMap<String, Decimal>>,
}

#[derive(Debug, Deserialize)]
struct PeersPayload {
    peers: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct HostPayload {
    host: ExplorerHost,
}

pub struct SiaCentralClient {
    client: Client,
    base_url: String,
}

impl SiaCentralClient {
    pub fn new(settings: &PriceSourceSettings) -> Result<Self, PriceSourceError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            client,
            base_url: settings.base_url.trim_end_matches('/').to_string(),
        })
    }

    async fn get<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, PriceSourceError> {
        let url = format!("{}{}", self.base_url, endpoint);
        tracing::debug!(%url, "Fetching from Sia Central");

        let response = self.client.get(&url).send().await?;
        let status = response.status();
        let text = response.text().await?;

        let envelope: Envelope<T> = serde_json::from_str(&text).map_err(|e| {
            if status.is_success() {
                PriceSourceError::InvalidResponse(format!("{}: {}", endpoint, e))
            } else {
                PriceSourceError::Api(format!("HTTP {}: {}", status, text))
            }
        })?;

        if envelope.kind != "success" {
            return Err(PriceSourceError::Api(envelope.message));
        }

        envelope.payload.ok_or_else(|| {
            PriceSourceError::InvalidResponse(format!("{}: missing payload", endpoint))
        })
    }
}

#[async_trait]
impl PriceSource for SiaCentralClient {
    fn name(&self) -> &'static str {
        "Sia Central"
    }

    async fn coin_price(&self) -> Result<ExchangeRate, PriceSourceError> {
        let payload: RatesPayload = self.get("/market/exchange-rate?currencies=sc").await?;

        let prices = payload
            .rates
            .get("sc")
            .ok_or_else(|| PriceSourceError::InvalidResponse("no rates for sc".to_string()))?;

        Ok(ExchangeRate::from_coin_prices(prices))
    }

    async fn bootstrap_peers(&self) -> Result<Vec<String>, PriceSourceError> {
        let payload: PeersPayload = self.get("/explorer/peers").await?;
        Ok(payload.peers)
    }

    async fn explorer_host(&self, netaddress: &str) -> Result<ExplorerHost, PriceSourceError> {
        let payload: HostPayload = self
            .get(&format!("/explorer/hosts/{}", netaddress))
            .await?;
        Ok(payload.host)
    }
}
