//! In-process daemon and price-service fakes for the refresh loop tests.

use crate::core::models::{
    BlockInfo, ConsensusInfo, DaemonVersion, ExchangeRate, ExplorerHost, GatewayInfo,
    GatewayPeer, HostContract, HostInfo, HostStorage, WalletInfo,
};
use crate::error::{DaemonError, PriceSourceError};
use crate::providers::PriceSource;
use crate::sia::{Form, HostApi};
use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::json;
use std::collections::{BTreeMap, HashSet};
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub type CallLog = Arc<Mutex<Vec<String>>>;

fn failure(op: &str) -> DaemonError {
    DaemonError::Api {
        status: 500,
        message: format!("{} failed", op),
    }
}

pub struct FakeDaemon {
    pub credentials_ok: bool,
    pub peer_count: usize,
    pub failing: HashSet<&'static str>,
    pub failing_peers: HashSet<String>,
    pub wallet_gate: Option<Arc<Notify>>,
    pub host: Mutex<HostInfo>,
    pub updates: Mutex<Vec<Form>>,
    pub calls: CallLog,
}

impl FakeDaemon {
    pub fn new(calls: CallLog) -> Self {
        Self::with_settings(
            calls,
            json!({
                "netaddress": "host.example.com:9982",
                "minstorageprice": "1",
                "collateral": "1",
                "windowsize": 72
            }),
        )
    }

    /// A daemon whose host reports `settings` as its internal settings.
    pub fn with_settings(calls: CallLog, settings: serde_json::Value) -> Self {
        let host = serde_json::from_value(json!({ "internalsettings": settings }))
            .unwrap_or_default();

        Self {
            credentials_ok: true,
            peer_count: 8,
            failing: HashSet::new(),
            failing_peers: HashSet::new(),
            wallet_gate: None,
            host: Mutex::new(host),
            updates: Mutex::new(Vec::new()),
            calls,
        }
    }

    fn record(&self, op: &'static str) -> Result<(), DaemonError> {
        self.calls.lock().unwrap().push(op.to_string());
        if self.failing.contains(op) {
            return Err(failure(op));
        }
        Ok(())
    }
}

pub fn count_calls(calls: &CallLog, op: &str) -> usize {
    calls.lock().unwrap().iter().filter(|c| c.as_str() == op).count()
}

pub fn position(calls: &CallLog, op: &str) -> Option<usize> {
    calls.lock().unwrap().iter().position(|c| c.as_str() == op)
}

#[async_trait]
impl HostApi for FakeDaemon {
    async fn check_credentials(&self) -> bool {
        self.calls.lock().unwrap().push("check_credentials".to_string());
        self.credentials_ok
    }

    async fn consensus(&self) -> Result<ConsensusInfo, DaemonError> {
        self.record("consensus")?;
        Ok(ConsensusInfo {
            synced: true,
            height: 250_000,
            currentblock: "tip".to_string(),
        })
    }

    async fn block(&self, height: u64) -> Result<BlockInfo, DaemonError> {
        self.record("block")?;
        Ok(BlockInfo {
            id: "tip".to_string(),
            height,
            parentid: "parent".to_string(),
            timestamp: 1_700_000_000,
        })
    }

    async fn daemon_version(&self) -> Result<DaemonVersion, DaemonError> {
        self.record("daemon_version")?;
        Ok(DaemonVersion {
            version: "1.5.9".to_string(),
            ..Default::default()
        })
    }

    async fn gateway(&self) -> Result<GatewayInfo, DaemonError> {
        self.record("gateway")?;
        Ok(GatewayInfo {
            netaddress: "127.0.0.1:9981".to_string(),
            peers: (0..self.peer_count)
                .map(|i| GatewayPeer {
                    netaddress: format!("10.0.0.{}:9981", i),
                    ..Default::default()
                })
                .collect(),
        })
    }

    async fn gateway_connect(&self, peer: &str) -> Result<(), DaemonError> {
        self.record("gateway_connect")?;
        if self.failing_peers.contains(peer) {
            return Err(failure("gateway_connect"));
        }
        Ok(())
    }

    async fn host(&self) -> Result<HostInfo, DaemonError> {
        self.record("host")?;
        Ok(self.host.lock().unwrap().clone())
    }

    async fn update_host(&self, config: &Form) -> Result<(), DaemonError> {
        self.record("update_host")?;
        let mut host = self.host.lock().unwrap();
        for (key, value) in config {
            host.internalsettings.0.insert(key.clone(), json!(value));
        }
        self.updates.lock().unwrap().push(config.clone());
        Ok(())
    }

    async fn host_contracts(&self) -> Result<Vec<HostContract>, DaemonError> {
        self.record("host_contracts")?;
        Ok(vec![HostContract {
            obligationstatus: "obligationUnresolved".to_string(),
            ..Default::default()
        }])
    }

    async fn host_storage(&self) -> Result<HostStorage, DaemonError> {
        self.record("host_storage")?;
        Ok(HostStorage::default())
    }

    async fn wallet(&self) -> Result<WalletInfo, DaemonError> {
        if let Some(gate) = &self.wallet_gate {
            gate.notified().await;
        }
        self.record("wallet")?;
        Ok(WalletInfo {
            unlocked: true,
            ..Default::default()
        })
    }
}

pub struct FakePrices {
    pub bootstrap: Vec<String>,
    pub fail_coin_price: bool,
    pub calls: CallLog,
}

impl FakePrices {
    pub fn new(calls: CallLog) -> Self {
        Self {
            bootstrap: vec![
                "1.1.1.1:9981".to_string(),
                "2.2.2.2:9981".to_string(),
                "3.3.3.3:9981".to_string(),
            ],
            fail_coin_price: false,
            calls,
        }
    }

    fn record(&self, op: &str) {
        self.calls.lock().unwrap().push(op.to_string());
    }
}

#[async_trait]
impl PriceSource for FakePrices {
    fn name(&self) -> &'static str {
        "fake"
    }

    async fn coin_price(&self) -> Result<ExchangeRate, PriceSourceError> {
        self.record("coin_price");
        if self.fail_coin_price {
            return Err(PriceSourceError::Api("rate limited".to_string()));
        }
        let usd = Decimal::from_str("0.002").map_err(|e| PriceSourceError::InvalidResponse(e.to_string()))?;
        Ok(ExchangeRate::new(BTreeMap::from([("usd".to_string(), usd)])))
    }

    async fn bootstrap_peers(&self) -> Result<Vec<String>, PriceSourceError> {
        self.record("bootstrap_peers");
        Ok(self.bootstrap.clone())
    }

    async fn explorer_host(&self, netaddress: &str) -> Result<ExplorerHost, PriceSourceError> {
        self.record("explorer_host");
        Ok(ExplorerHost {
            net_address: netaddress.to_string(),
            online: true,
            ..Default::default()
        })
    }
}
