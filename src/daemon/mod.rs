mod fanout;
mod polling;
mod refresh;
#[cfg(test)]
pub(crate) mod testing;

use crate::core::settings::Settings;
use crate::core::store::HostStore;
use crate::pricing::PricingReconciler;
use crate::providers::{PriceSource, SiaCentralClient};
use crate::sia::{DaemonClient, HostApi};
use anyhow::{Context, Result};
use std::sync::Arc;

use polling::{Intervals, Scheduler};
pub use refresh::SyncContext;

pub async fn run(settings: Settings) -> Result<()> {
    tracing::info!(api_addr = %settings.daemon.api_addr, "Starting sia-host-monitor daemon");

    let client = DaemonClient::new(&settings.daemon).context("Failed to build daemon client")?;
    let api: Arc<dyn HostApi> = Arc::new(client);
    let prices: Arc<dyn PriceSource> = Arc::new(
        SiaCentralClient::new(&settings.price_source).context("Failed to build price client")?,
    );
    let store = HostStore::new();

    let ctx = Arc::new(SyncContext::new(api.clone(), prices, store.clone()));
    let reconciler = PricingReconciler::new(
        api,
        store,
        settings.host_pricing_pins.clone(),
        settings.data_unit,
    );
    let scheduler = Arc::new(Scheduler::new(
        ctx,
        reconciler,
        Intervals::from(&settings.polling),
    ));

    scheduler.refresh_data().await?;
    scheduler.start();

    tokio::signal::ctrl_c()
        .await
        .context("Failed to listen for shutdown signal")?;
    tracing::info!("Shutdown requested");

    scheduler.shutdown().await;
    Ok(())
}
