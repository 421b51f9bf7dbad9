use crate::core::models::ContractSummary;
use crate::core::store::HostStore;
use crate::providers::PriceSource;
use crate::sia::HostApi;
use anyhow::{Context, Result};
use futures::future::join_all;
use std::sync::Arc;

/// Peer count above which the gateway is considered connected.
pub const MIN_PEERS: usize = 1;

/// Collaborators shared by every refresh: the daemon, the external price
/// service and the store they feed.
pub struct SyncContext {
    pub api: Arc<dyn HostApi>,
    pub prices: Arc<dyn PriceSource>,
    pub store: HostStore,
}

impl SyncContext {
    pub fn new(api: Arc<dyn HostApi>, prices: Arc<dyn PriceSource>, store: HostStore) -> Self {
        Self { api, prices, store }
    }

    pub async fn refresh_block_height(&self) -> Result<()> {
        let consensus = self.api.consensus().await.context("consensus")?;
        tracing::debug!(height = consensus.height, synced = consensus.synced, "Block height");
        self.store.set_consensus(consensus).await;
        Ok(())
    }

    pub async fn refresh_last_block(&self) -> Result<()> {
        let block = self.api.last_block().await.context("last block")?;
        self.store.set_last_block(block).await;
        Ok(())
    }

    pub async fn refresh_daemon_version(&self) -> Result<()> {
        let version = self.api.daemon_version().await.context("daemon version")?;
        self.store.set_daemon_version(version).await;
        Ok(())
    }

    pub async fn refresh_host_wallet(&self) -> Result<()> {
        let wallet = self.api.wallet().await.context("wallet")?;
        self.store.set_wallet(wallet).await;
        Ok(())
    }

    pub async fn refresh_host_storage(&self) -> Result<()> {
        let storage = self.api.host_storage().await.context("host storage")?;
        tracing::debug!(
            folders = storage.folders.len(),
            capacity = storage.total_capacity(),
            used = storage.used_capacity(),
            "Host storage"
        );
        self.store.set_storage(storage).await;
        Ok(())
    }

    pub async fn refresh_host_config(&self) -> Result<()> {
        let host = self.api.host().await.context("host config")?;
        self.store.set_host(host).await;
        Ok(())
    }

    pub async fn refresh_host_contracts(&self) -> Result<()> {
        let contracts = self.api.host_contracts().await.context("host contracts")?;
        let summary = ContractSummary::from_contracts(&contracts);
        tracing::debug!(total = summary.total, by_status = ?summary.by_status, "Host contracts");
        self.store.set_contracts(contracts).await;
        Ok(())
    }

    /// Needs the host config in the store for the announced address.
    pub async fn refresh_explorer(&self) -> Result<()> {
        let netaddress = self
            .store
            .host()
            .await
            .and_then(|h| h.netaddress())
            .context("host net address not known yet")?;

        let explorer = self
            .prices
            .explorer_host(&netaddress)
            .await
            .with_context(|| format!("explorer lookup for {}", netaddress))?;

        self.store.set_explorer(explorer).await;
        Ok(())
    }

    /// Connects to bootstrap peers when the gateway has too few.
    pub async fn check_peers(&self) -> Result<()> {
        let gateway = self.api.gateway().await.context("gateway")?;
        if gateway.peers.len() > MIN_PEERS {
            return Ok(());
        }

        let peers = self
            .prices
            .bootstrap_peers()
            .await
            .context("bootstrap peers")?;
        tracing::info!(
            connected = gateway.peers.len(),
            bootstrap = peers.len(),
            "Few gateway peers, connecting to bootstrap peers"
        );

        let results = join_all(peers.iter().map(|peer| self.api.gateway_connect(peer))).await;
        for (peer, result) in peers.iter().zip(results) {
            if let Err(e) = result {
                tracing::debug!(peer = %peer, error = %e, "Failed to connect to peer");
            }
        }

        Ok(())
    }

    pub async fn refresh_coin_price(&self) -> Result<()> {
        let rate = self
            .prices
            .coin_price()
            .await
            .with_context(|| format!("coin price from {}", self.prices.name()))?;

        tracing::debug!(currencies = ?rate.currencies().collect::<Vec<_>>(), "Coin price");
        self.store.set_coin_price(rate).await;
        Ok(())
    }
}
