mod client;

use crate::core::models::{
    BlockInfo, ConsensusInfo, DaemonVersion, GatewayInfo, HostContract, HostInfo, HostStorage,
    WalletInfo,
};
use crate::error::DaemonError;
use async_trait::async_trait;
use std::collections::BTreeMap;

pub use client::DaemonClient;

/// Form fields for POST requests; the daemon only accepts urlencoded bodies.
pub type Form = BTreeMap<String, String>;

/// Daemon operations used by the refresh loops and the pricing reconciler.
#[async_trait]
pub trait HostApi: Send + Sync {
    async fn check_credentials(&self) -> bool;
    async fn consensus(&self) -> Result<ConsensusInfo, DaemonError>;
    async fn block(&self, height: u64) -> Result<BlockInfo, DaemonError>;
    async fn daemon_version(&self) -> Result<DaemonVersion, DaemonError>;
    async fn gateway(&self) -> Result<GatewayInfo, DaemonError>;
    async fn gateway_connect(&self, peer: &str) -> Result<(), DaemonError>;
    async fn host(&self) -> Result<HostInfo, DaemonError>;
    async fn update_host(&self, config: &Form) -> Result<(), DaemonError>;
    async fn host_contracts(&self) -> Result<Vec<HostContract>, DaemonError>;
    async fn host_storage(&self) -> Result<HostStorage, DaemonError>;
    async fn wallet(&self) -> Result<WalletInfo, DaemonError>;

    async fn last_block(&self) -> Result<BlockInfo, DaemonError> {
        let consensus = self.consensus().await?;
        self.block(consensus.height).await
    }
}
