use crate::core::models::{
    BlockInfo, ConsensusInfo, ContractSummary, DaemonVersion, ExchangeRate, ExplorerHost,
    HostContract, HostInfo, HostStorage, WalletInfo,
};
use chrono::{DateTime, Duration, Utc};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tokio::sync::RwLock;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StoreField {
    Consensus,
    LastBlock,
    DaemonVersion,
    Wallet,
    Storage,
    HostConfig,
    Contracts,
    Explorer,
    CoinPrice,
}

#[derive(Default)]
struct StoreInner {
    consensus: Option<ConsensusInfo>,
    last_block: Option<BlockInfo>,
    daemon_version: Option<DaemonVersion>,
    wallet: Option<WalletInfo>,
    storage: Option<HostStorage>,
    host: Option<HostInfo>,
    contracts: Vec<HostContract>,
    explorer: Option<ExplorerHost>,
    coin_price: Option<ExchangeRate>,
    loaded: bool,
    refreshing_data: bool,
    last_updated: HashMap<StoreField, DateTime<Utc>>,
}

impl StoreInner {
    fn touch(&mut self, field: StoreField) {
        self.last_updated.insert(field, Utc::now());
    }
}

/// Point-in-time view of the store, logged after each refresh cycle.
#[derive(Debug, Clone, Default)]
pub struct StoreSummary {
    pub loaded: bool,
    pub refreshing: bool,
    pub height: Option<u64>,
    pub synced: bool,
    pub last_block_age: Option<Duration>,
    pub daemon_version: Option<String>,
    pub wallet_unlocked: Option<bool>,
    pub capacity: u64,
    pub used: u64,
    pub contracts: ContractSummary,
    pub explorer_online: Option<bool>,
    pub coin_price_age: Option<Duration>,
    /// Field that has gone longest without an update, and for how long.
    pub stalest: Option<(StoreField, Duration)>,
}

fn yes_no(value: Option<bool>, yes: &str, no: &str) -> String {
    match value {
        Some(true) => yes.to_string(),
        Some(false) => no.to_string(),
        None => "unknown".to_string(),
    }
}

impl fmt::Display for StoreSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if !self.loaded {
            write!(f, "not loaded, ")?;
        } else if self.refreshing {
            write!(f, "refreshing, ")?;
        }
        if let Some(version) = &self.daemon_version {
            write!(f, "siad {}, ", version)?;
        }
        match self.height {
            Some(height) => write!(
                f,
                "height {} ({})",
                height,
                if self.synced { "synced" } else { "syncing" }
            )?,
            None => write!(f, "height unknown")?,
        }
        if let Some(age) = self.last_block_age {
            write!(f, ", last block {}m ago", age.num_minutes())?;
        }
        write!(
            f,
            ", wallet {}, storage {:.1}/{:.1} GB, {} contracts, explorer {}",
            yes_no(self.wallet_unlocked, "unlocked", "locked"),
            self.used as f64 / 1e9,
            self.capacity as f64 / 1e9,
            self.contracts.total,
            yes_no(self.explorer_online, "online", "offline"),
        )?;
        if let Some(age) = self.coin_price_age {
            write!(f, ", coin price {}m old", age.num_minutes())?;
        }
        if let Some((field, age)) = self.stalest {
            write!(f, ", oldest {:?} {}s", field, age.num_seconds())?;
        }
        Ok(())
    }
}

/// Application state written by the refresh loops. Last write wins.
#[derive(Clone, Default)]
pub struct HostStore {
    inner: Arc<RwLock<StoreInner>>,
}

impl HostStore {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(RwLock::new(StoreInner::default())),
        }
    }

    pub async fn set_consensus(&self, consensus: ConsensusInfo) {
        let mut inner = self.inner.write().await;
        inner.consensus = Some(consensus);
        inner.touch(StoreField::Consensus);
    }

    pub async fn set_last_block(&self, block: BlockInfo) {
        let mut inner = self.inner.write().await;
        inner.last_block = Some(block);
        inner.touch(StoreField::LastBlock);
    }

    pub async fn set_daemon_version(&self, version: DaemonVersion) {
        let mut inner = self.inner.write().await;
        inner.daemon_version = Some(version);
        inner.touch(StoreField::DaemonVersion);
    }

    pub async fn set_wallet(&self, wallet: WalletInfo) {
        let mut inner = self.inner.write().await;
        inner.wallet = Some(wallet);
        inner.touch(StoreField::Wallet);
    }

    pub async fn set_storage(&self, storage: HostStorage) {
        let mut inner = self.inner.write().await;
        inner.storage = Some(storage);
        inner.touch(StoreField::Storage);
    }

    pub async fn set_host(&self, host: HostInfo) {
        let mut inner = self.inner.write().await;
        inner.host = Some(host);
        inner.touch(StoreField::HostConfig);
    }

    pub async fn set_contracts(&self, contracts: Vec<HostContract>) {
        let mut inner = self.inner.write().await;
        inner.contracts = contracts;
        inner.touch(StoreField::Contracts);
    }

    pub async fn set_explorer(&self, explorer: ExplorerHost) {
        let mut inner = self.inner.write().await;
        inner.explorer = Some(explorer);
        inner.touch(StoreField::Explorer);
    }

    pub async fn set_coin_price(&self, rate: ExchangeRate) {
        let mut inner = self.inner.write().await;
        inner.coin_price = Some(rate);
        inner.touch(StoreField::CoinPrice);
    }

    pub async fn set_loaded(&self, loaded: bool) {
        self.inner.write().await.loaded = loaded;
    }

    pub async fn set_refreshing_data(&self, refreshing: bool) {
        self.inner.write().await.refreshing_data = refreshing;
    }

    pub async fn host(&self) -> Option<HostInfo> {
        self.inner.read().await.host.clone()
    }

    pub async fn coin_price(&self) -> Option<ExchangeRate> {
        self.inner.read().await.coin_price.clone()
    }

    pub async fn summary(&self) -> StoreSummary {
        let inner = self.inner.read().await;
        let now = Utc::now();

        StoreSummary {
            loaded: inner.loaded,
            refreshing: inner.refreshing_data,
            height: inner.consensus.as_ref().map(|c| c.height),
            synced: inner.consensus.as_ref().is_some_and(|c| c.synced),
            last_block_age: inner
                .last_block
                .as_ref()
                .and_then(BlockInfo::time)
                .map(|t| now - t),
            daemon_version: inner.daemon_version.as_ref().map(|v| v.version.clone()),
            wallet_unlocked: inner.wallet.as_ref().map(|w| w.unlocked),
            capacity: inner.storage.as_ref().map_or(0, HostStorage::total_capacity),
            used: inner.storage.as_ref().map_or(0, HostStorage::used_capacity),
            contracts: ContractSummary::from_contracts(&inner.contracts),
            explorer_online: inner.explorer.as_ref().map(|e| e.online),
            coin_price_age: inner.coin_price.as_ref().map(|r| now - r.fetched_at),
            stalest: inner
                .last_updated
                .iter()
                .min_by_key(|(_, at)| **at)
                .map(|(field, at)| (*field, now - *at)),
        }
    }
}

#[cfg(test)]
impl HostStore {
    pub async fn consensus(&self) -> Option<ConsensusInfo> {
        self.inner.read().await.consensus.clone()
    }

    pub async fn last_block(&self) -> Option<BlockInfo> {
        self.inner.read().await.last_block.clone()
    }

    pub async fn wallet(&self) -> Option<WalletInfo> {
        self.inner.read().await.wallet.clone()
    }

    pub async fn contract_summary(&self) -> ContractSummary {
        ContractSummary::from_contracts(&self.inner.read().await.contracts)
    }

    pub async fn explorer(&self) -> Option<ExplorerHost> {
        self.inner.read().await.explorer.clone()
    }

    pub async fn is_loaded(&self) -> bool {
        self.inner.read().await.loaded
    }

    pub async fn is_refreshing_data(&self) -> bool {
        self.inner.read().await.refreshing_data
    }

    pub async fn last_updated(&self, field: StoreField) -> Option<DateTime<Utc>> {
        self.inner.read().await.last_updated.get(&field).copied()
    }
}
