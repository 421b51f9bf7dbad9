use crate::core::settings::PollingSettings;
use crate::daemon::fanout::{settle_all, Settled};
use crate::daemon::refresh::SyncContext;
use crate::error::SyncError;
use crate::pricing::{PricingReconciler, ReconcileOutcome};
use futures::FutureExt;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopKind {
    Short,
    Long,
    Price,
}

impl LoopKind {
    pub fn name(&self) -> &'static str {
        match self {
            LoopKind::Short => "short",
            LoopKind::Long => "long",
            LoopKind::Price => "price",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopPhase {
    Idle,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunOutcome {
    Ran,
    Skipped,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

struct LoopState {
    kind: LoopKind,
    phase: Mutex<LoopPhase>,
}

impl LoopState {
    fn new(kind: LoopKind) -> Self {
        Self {
            kind,
            phase: Mutex::new(LoopPhase::Idle),
        }
    }

    #[cfg(test)]
    fn phase(&self) -> LoopPhase {
        *lock(&self.phase)
    }

    fn try_enter(&self) -> Option<RunGuard<'_>> {
        let mut phase = lock(&self.phase);
        if *phase == LoopPhase::Running {
            return None;
        }
        *phase = LoopPhase::Running;
        Some(RunGuard { state: self })
    }
}

/// Puts its loop back to Idle when dropped, whatever the run's outcome.
struct RunGuard<'a> {
    state: &'a LoopState,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        *lock(&self.state.phase) = LoopPhase::Idle;
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Intervals {
    pub short: Duration,
    pub long: Duration,
    pub price: Duration,
}

impl Intervals {
    pub fn get(&self, kind: LoopKind) -> Duration {
        match kind {
            LoopKind::Short => self.short,
            LoopKind::Long => self.long,
            LoopKind::Price => self.price,
        }
    }
}

impl From<&PollingSettings> for Intervals {
    fn from(settings: &PollingSettings) -> Self {
        Self {
            short: settings.short(),
            long: settings.long(),
            price: settings.price(),
        }
    }
}

/// Owns the three polling loops: short (daemon version, height, wallet,
/// storage), long (last block, host config, contracts, peers, explorer) and
/// price (exchange rate plus pinned pricing).
pub struct Scheduler {
    ctx: Arc<SyncContext>,
    reconciler: PricingReconciler,
    intervals: Intervals,
    short: LoopState,
    long: LoopState,
    price: LoopState,
    shutdown_tx: watch::Sender<bool>,
    tasks: Mutex<Vec<JoinHandle<()>>>,
}

impl Scheduler {
    pub fn new(ctx: Arc<SyncContext>, reconciler: PricingReconciler, intervals: Intervals) -> Self {
        let (shutdown_tx, _) = watch::channel(false);

        Self {
            ctx,
            reconciler,
            intervals,
            short: LoopState::new(LoopKind::Short),
            long: LoopState::new(LoopKind::Long),
            price: LoopState::new(LoopKind::Price),
            shutdown_tx,
            tasks: Mutex::new(Vec::new()),
        }
    }

    #[cfg(test)]
    fn state(&self, kind: LoopKind) -> &LoopState {
        match kind {
            LoopKind::Short => &self.short,
            LoopKind::Long => &self.long,
            LoopKind::Price => &self.price,
        }
    }

    #[cfg(test)]
    pub fn phase(&self, kind: LoopKind) -> LoopPhase {
        self.state(kind).phase()
    }

    /// Validates credentials, then runs the initial refresh chain in order.
    /// Only invalid credentials are fatal.
    pub async fn refresh_data(&self) -> Result<(), SyncError> {
        if !self.ctx.api.check_credentials().await {
            return Err(SyncError::InvalidCredentials);
        }

        self.ctx.store.set_refreshing_data(true).await;

        if let Err(e) = self.ctx.refresh_last_block().await {
            tracing::warn!(error = %format!("{:#}", e), "Initial block refresh failed");
        }
        self.long_refresh().await;
        self.short_refresh().await;
        self.price_refresh().await;

        self.ctx.store.set_loaded(true).await;
        self.ctx.store.set_refreshing_data(false).await;
        let summary = self.ctx.store.summary().await;
        tracing::info!(status = %summary, "Initial data refresh complete");

        Ok(())
    }

    /// Arms the three loops. Each waits its interval after the previous run
    /// finished before running again.
    pub fn start(self: &Arc<Self>) {
        let mut tasks = lock(&self.tasks);
        if !tasks.is_empty() {
            tracing::warn!("Refresh loops already started");
            return;
        }

        for kind in [LoopKind::Short, LoopKind::Long, LoopKind::Price] {
            let scheduler = Arc::clone(self);
            let shutdown = self.shutdown_tx.subscribe();
            tasks.push(tokio::spawn(run_loop(scheduler, kind, shutdown)));
        }

        tracing::info!(
            short_secs = self.intervals.short.as_secs_f64(),
            long_secs = self.intervals.long.as_secs_f64(),
            price_secs = self.intervals.price.as_secs_f64(),
            "Refresh loops started"
        );
    }

    /// Cancels pending timers and waits for in-flight runs to finish.
    pub async fn shutdown(&self) {
        self.shutdown_tx.send_replace(true);

        let tasks = std::mem::take(&mut *lock(&self.tasks));
        for task in tasks {
            if let Err(e) = task.await {
                tracing::warn!(error = %e, "Refresh loop ended abnormally");
            }
        }

        tracing::info!("Refresh loops stopped");
    }

    pub async fn run(&self, kind: LoopKind) -> RunOutcome {
        match kind {
            LoopKind::Short => self.short_refresh().await,
            LoopKind::Long => self.long_refresh().await,
            LoopKind::Price => self.price_refresh().await,
        }
    }

    pub async fn short_refresh(&self) -> RunOutcome {
        let Some(_guard) = self.short.try_enter() else {
            return RunOutcome::Skipped;
        };

        let ctx = &self.ctx;
        settle_all(
            self.short.kind.name(),
            vec![
                ("daemon_version", ctx.refresh_daemon_version().boxed()),
                ("block_height", ctx.refresh_block_height().boxed()),
                ("wallet", ctx.refresh_host_wallet().boxed()),
                ("storage", ctx.refresh_host_storage().boxed()),
            ],
        )
        .await;

        RunOutcome::Ran
    }

    pub async fn long_refresh(&self) -> RunOutcome {
        let Some(_guard) = self.long.try_enter() else {
            return RunOutcome::Skipped;
        };

        let ctx = &self.ctx;
        let settled: Settled = settle_all(
            self.long.kind.name(),
            vec![
                ("last_block", ctx.refresh_last_block().boxed()),
                ("host_config", ctx.refresh_host_config().boxed()),
                ("host_contracts", ctx.refresh_host_contracts().boxed()),
                ("peers", ctx.check_peers().boxed()),
            ],
        )
        .await;

        // explorer lookups use the net address from the host config above
        if let Err(e) = ctx.refresh_explorer().await {
            tracing::warn!(
                error = %format!("{:#}", e),
                host_config_ok = settled.succeeded.contains(&"host_config"),
                "Explorer refresh failed"
            );
        }

        RunOutcome::Ran
    }

    pub async fn price_refresh(&self) -> RunOutcome {
        let Some(_guard) = self.price.try_enter() else {
            return RunOutcome::Skipped;
        };

        match self.ctx.refresh_coin_price().await {
            Ok(()) => self.update_pinned_pricing().await,
            Err(e) => tracing::error!(error = %format!("{:#}", e), "Coin price refresh failed"),
        }

        RunOutcome::Ran
    }

    /// Host status after a loop run; the long loop reports at info, the
    /// others at debug.
    async fn log_summary(&self, kind: LoopKind) {
        let summary = self.ctx.store.summary().await;
        match kind {
            LoopKind::Long => tracing::info!(refresh = kind.name(), status = %summary, "Host status"),
            _ => tracing::debug!(refresh = kind.name(), status = %summary, "Host status"),
        }
    }

    async fn update_pinned_pricing(&self) {
        match self.reconciler.reconcile().await {
            Ok(ReconcileOutcome::NoPins) => {}
            Ok(ReconcileOutcome::Unchanged) => {
                tracing::debug!("Pinned pricing unchanged");
            }
            Ok(ReconcileOutcome::Updated(update)) => {
                tracing::info!(settings = ?update, "Applied pinned pricing");
            }
            Err(e) => tracing::error!(error = %e, "Update pinned pricing failed"),
        }
    }
}

async fn run_loop(scheduler: Arc<Scheduler>, kind: LoopKind, mut shutdown: watch::Receiver<bool>) {
    let delay = scheduler.intervals.get(kind);

    loop {
        tokio::select! {
            _ = tokio::time::sleep(delay) => {}
            _ = shutdown.changed() => break,
        }

        let stopping = *shutdown.borrow();
        if stopping {
            break;
        }

        match scheduler.run(kind).await {
            RunOutcome::Ran => scheduler.log_summary(kind).await,
            RunOutcome::Skipped => {
                tracing::debug!(refresh = kind.name(), "Refresh still running, skipping tick");
            }
        }
    }

    tracing::debug!(refresh = kind.name(), "Refresh loop exited");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::models::DataUnit;
    use crate::core::settings::PriceEntry;
    use crate::core::store::HostStore;
    use crate::daemon::testing::{count_calls, position, CallLog, FakeDaemon, FakePrices};
    use std::collections::BTreeMap;
    use tokio::sync::Notify;

    fn intervals(ms: u64) -> Intervals {
        Intervals {
            short: Duration::from_millis(ms),
            long: Duration::from_millis(ms),
            price: Duration::from_millis(ms),
        }
    }

    fn build(
        daemon: FakeDaemon,
        prices: FakePrices,
        pins: BTreeMap<String, PriceEntry>,
        intervals: Intervals,
    ) -> (Arc<Scheduler>, Arc<FakeDaemon>, HostStore) {
        let daemon = Arc::new(daemon);
        let store = HostStore::new();
        let ctx = Arc::new(SyncContext::new(
            daemon.clone(),
            Arc::new(prices),
            store.clone(),
        ));
        let reconciler = PricingReconciler::new(daemon.clone(), store.clone(), pins, DataUnit::Binary);
        let scheduler = Arc::new(Scheduler::new(ctx, reconciler, intervals));
        (scheduler, daemon, store)
    }

    fn fakes() -> (CallLog, FakeDaemon, FakePrices) {
        let calls = CallLog::default();
        let daemon = FakeDaemon::new(calls.clone());
        let prices = FakePrices::new(calls.clone());
        (calls, daemon, prices)
    }

    #[tokio::test]
    async fn test_refresh_data_rejects_invalid_credentials() {
        let (calls, mut daemon, prices) = fakes();
        daemon.credentials_ok = false;
        let (scheduler, _daemon, store) = build(daemon, prices, BTreeMap::new(), intervals(1000));

        let result = scheduler.refresh_data().await;
        assert!(matches!(result, Err(SyncError::InvalidCredentials)));
        assert_eq!(
            result.unwrap_err().to_string(),
            "API credentials invalid"
        );
        assert!(!store.is_loaded().await);
        assert_eq!(calls.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_refresh_data_runs_initial_chain() {
        let (calls, daemon, prices) = fakes();
        let (scheduler, _daemon, store) = build(daemon, prices, BTreeMap::new(), intervals(1000));

        scheduler.refresh_data().await.unwrap();

        assert!(store.is_loaded().await);
        assert!(!store.is_refreshing_data().await);
        assert_eq!(store.consensus().await.unwrap().height, 250_000);
        assert_eq!(store.last_block().await.unwrap().height, 250_000);
        assert!(store.host().await.is_some());
        assert!(store.wallet().await.unwrap().unlocked);
        assert!(store.explorer().await.unwrap().online);
        assert!(store.coin_price().await.is_some());
        assert_eq!(store.contract_summary().await.total, 1);
        let summary = store.summary().await;
        assert!(summary.loaded);
        assert_eq!(summary.explorer_online, Some(true));

        let log = calls.lock().unwrap().clone();
        assert_eq!(log[0], "check_credentials");
        assert_eq!(log[1], "consensus");
        assert_eq!(log[2], "block");
        let explorer = position(&calls, "explorer_host").unwrap();
        assert!(position(&calls, "host").unwrap() < explorer);
        assert!(explorer < position(&calls, "daemon_version").unwrap());
        assert!(position(&calls, "wallet").unwrap() < position(&calls, "coin_price").unwrap());
    }

    #[tokio::test]
    async fn test_short_refresh_is_not_reentrant() {
        let (calls, mut daemon, prices) = fakes();
        let gate = Arc::new(Notify::new());
        daemon.wallet_gate = Some(gate.clone());
        let (scheduler, _daemon, _store) = build(daemon, prices, BTreeMap::new(), intervals(1000));

        let first = {
            let scheduler = Arc::clone(&scheduler);
            tokio::spawn(async move { scheduler.short_refresh().await })
        };

        tokio::time::timeout(Duration::from_secs(5), async {
            while scheduler.phase(LoopKind::Short) != LoopPhase::Running {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        assert_eq!(scheduler.short_refresh().await, RunOutcome::Skipped);
        // the long loop has its own guard
        assert_eq!(scheduler.phase(LoopKind::Long), LoopPhase::Idle);

        gate.notify_one();
        assert_eq!(first.await.unwrap(), RunOutcome::Ran);
        assert_eq!(scheduler.phase(LoopKind::Short), LoopPhase::Idle);
        assert_eq!(count_calls(&calls, "wallet"), 1);
        assert_eq!(count_calls(&calls, "daemon_version"), 1);
    }

    #[tokio::test]
    async fn test_long_refresh_tolerates_failures() {
        let (calls, mut daemon, prices) = fakes();
        daemon.failing.insert("host_contracts");
        daemon.failing.insert("gateway");
        daemon.failing.insert("block");
        let (scheduler, _daemon, store) = build(daemon, prices, BTreeMap::new(), intervals(1000));

        assert_eq!(scheduler.long_refresh().await, RunOutcome::Ran);
        assert_eq!(scheduler.phase(LoopKind::Long), LoopPhase::Idle);

        assert!(store.host().await.is_some());
        assert_eq!(count_calls(&calls, "explorer_host"), 1);
        assert!(position(&calls, "host").unwrap() < position(&calls, "explorer_host").unwrap());

        // and it runs again afterwards
        assert_eq!(scheduler.long_refresh().await, RunOutcome::Ran);
        assert_eq!(count_calls(&calls, "explorer_host"), 2);
    }

    #[tokio::test]
    async fn test_explorer_skipped_without_host_config() {
        let (calls, mut daemon, prices) = fakes();
        daemon.failing.insert("host");
        let (scheduler, _daemon, store) = build(daemon, prices, BTreeMap::new(), intervals(1000));

        assert_eq!(scheduler.long_refresh().await, RunOutcome::Ran);
        assert!(store.host().await.is_none());
        assert_eq!(count_calls(&calls, "explorer_host"), 0);
    }

    #[tokio::test]
    async fn test_check_peers_noop_when_connected() {
        let (calls, mut daemon, prices) = fakes();
        daemon.peer_count = 2;
        let (scheduler, _daemon, _store) = build(daemon, prices, BTreeMap::new(), intervals(1000));

        scheduler.ctx.check_peers().await.unwrap();
        assert_eq!(count_calls(&calls, "bootstrap_peers"), 0);
        assert_eq!(count_calls(&calls, "gateway_connect"), 0);
    }

    #[tokio::test]
    async fn test_check_peers_connects_bootstrap_peers() {
        let (calls, mut daemon, prices) = fakes();
        daemon.peer_count = 1;
        daemon.failing_peers.insert("2.2.2.2:9981".to_string());
        let (scheduler, _daemon, _store) = build(daemon, prices, BTreeMap::new(), intervals(1000));

        scheduler.ctx.check_peers().await.unwrap();
        assert_eq!(count_calls(&calls, "bootstrap_peers"), 1);
        assert_eq!(count_calls(&calls, "gateway_connect"), 3);
    }

    #[tokio::test]
    async fn test_price_refresh_applies_pins() {
        let (_calls, daemon, prices) = fakes();
        let pins = BTreeMap::from([("minstorageprice".to_string(), PriceEntry::new("1", "usd"))]);
        let (scheduler, daemon, store) = build(daemon, prices, pins, intervals(1000));

        scheduler.refresh_data().await.unwrap();

        let updates = daemon.updates.lock().unwrap().clone();
        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].get("minstorageprice").map(String::as_str), Some("421062"));
        assert_eq!(updates[0].get("windowsize").map(String::as_str), Some("144"));

        let host = store.host().await.unwrap();
        assert_eq!(host.internalsettings.value_of("windowsize").as_deref(), Some("144"));
    }

    #[tokio::test]
    async fn test_price_refresh_failure_skips_reconcile() {
        let (calls, daemon, mut prices) = fakes();
        prices.fail_coin_price = true;
        let pins = BTreeMap::from([("minstorageprice".to_string(), PriceEntry::new("1", "usd"))]);
        let (scheduler, daemon, _store) = build(daemon, prices, pins, intervals(1000));

        assert_eq!(scheduler.price_refresh().await, RunOutcome::Ran);
        assert_eq!(count_calls(&calls, "coin_price"), 1);
        assert!(daemon.updates.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_loops_reschedule_after_failures_and_stop_on_shutdown() {
        let (calls, mut daemon, prices) = fakes();
        daemon.failing.insert("wallet");
        daemon.failing.insert("host");
        let (scheduler, _daemon, _store) = build(daemon, prices, BTreeMap::new(), intervals(20));

        scheduler.start();
        scheduler.start();
        tokio::time::sleep(Duration::from_millis(200)).await;
        scheduler.shutdown().await;

        let short_runs = count_calls(&calls, "wallet");
        let long_runs = count_calls(&calls, "host");
        let price_runs = count_calls(&calls, "coin_price");
        assert!(short_runs >= 2, "short loop ran {} times", short_runs);
        assert!(long_runs >= 2, "long loop ran {} times", long_runs);
        assert!(price_runs >= 2, "price loop ran {} times", price_runs);

        tokio::time::sleep(Duration::from_millis(80)).await;
        assert_eq!(count_calls(&calls, "wallet"), short_runs);
        assert_eq!(count_calls(&calls, "coin_price"), price_runs);
    }
}
