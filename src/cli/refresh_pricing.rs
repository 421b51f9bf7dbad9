use crate::cli::connect;
use crate::core::settings::Settings;
use crate::core::store::HostStore;
use crate::daemon::SyncContext;
use crate::pricing::{PricingReconciler, ReconcileOutcome};
use crate::providers::SiaCentralClient;
use crate::sia::{Form, HostApi};
use anyhow::{Context, Result};
use std::sync::Arc;

pub async fn run(settings: &Settings, dry_run: bool) -> Result<()> {
    if settings.host_pricing_pins.is_empty() {
        println!("No pricing pins configured");
        return Ok(());
    }

    let api: Arc<dyn HostApi> = Arc::new(connect(settings)?);
    let prices = Arc::new(
        SiaCentralClient::new(&settings.price_source).context("Failed to build price client")?,
    );
    let store = HostStore::new();
    let ctx = SyncContext::new(api.clone(), prices, store.clone());

    ctx.refresh_host_config().await?;
    ctx.refresh_coin_price().await?;

    let reconciler = PricingReconciler::new(
        api,
        store,
        settings.host_pricing_pins.clone(),
        settings.data_unit,
    );

    if dry_run {
        match reconciler.plan().await? {
            Some(update) => {
                println!("Would update host pricing:");
                print_update(&update);
            }
            None => println!("Host pricing already matches pins"),
        }
        return Ok(());
    }

    match reconciler.reconcile().await? {
        ReconcileOutcome::Updated(update) => {
            println!("Updated host pricing:");
            print_update(&update);
        }
        ReconcileOutcome::Unchanged | ReconcileOutcome::NoPins => {
            println!("Host pricing already matches pins")
        }
    }

    Ok(())
}

fn print_update(update: &Form) {
    for (key, value) in update {
        println!("  {:<28} {}", key, value);
    }
}
