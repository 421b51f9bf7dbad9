use crate::core::models::DataUnit;
use crate::core::settings::PriceEntry;
use crate::core::store::HostStore;
use crate::error::PricingError;
use crate::pricing::pins::plan_update;
use crate::sia::{Form, HostApi};
use std::collections::BTreeMap;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReconcileOutcome {
    NoPins,
    Unchanged,
    Updated(Form),
}

/// Keeps the daemon's host pricing in line with the configured pins.
pub struct PricingReconciler {
    api: Arc<dyn HostApi>,
    store: HostStore,
    pins: BTreeMap<String, PriceEntry>,
    unit: DataUnit,
}

impl PricingReconciler {
    pub fn new(
        api: Arc<dyn HostApi>,
        store: HostStore,
        pins: BTreeMap<String, PriceEntry>,
        unit: DataUnit,
    ) -> Self {
        Self {
            api,
            store,
            pins,
            unit,
        }
    }

    pub fn has_pins(&self) -> bool {
        !self.pins.is_empty()
    }

    /// The update the next pass would send, without sending it.
    pub async fn plan(&self) -> Result<Option<Form>, PricingError> {
        let host = self.store.host().await.ok_or(PricingError::MissingHostConfig)?;
        let rate = self.store.coin_price().await;

        plan_update(&self.pins, &host.internalsettings, rate.as_ref(), self.unit)
    }

    pub async fn reconcile(&self) -> Result<ReconcileOutcome, PricingError> {
        if !self.has_pins() {
            return Ok(ReconcileOutcome::NoPins);
        }

        let Some(update) = self.plan().await? else {
            tracing::debug!("Pinned pricing already matches host config");
            return Ok(ReconcileOutcome::Unchanged);
        };

        tracing::info!(keys = ?update.keys().collect::<Vec<_>>(), "Updating pinned host pricing");
        self.api.update_host(&update).await?;

        let host = self.api.host().await?;
        self.store.set_host(host).await;

        Ok(ReconcileOutcome::Updated(update))
    }
}
