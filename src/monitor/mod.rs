pub mod cycle;
pub mod decision;

use std::sync::{Arc, Mutex, MutexGuard};

use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::db::ProductStore;
use crate::error::{AppError, Result};
use crate::fetcher::FetcherSet;
use crate::notifier::Notifier;
use crate::state::MonitorStatus;

pub use cycle::{CycleReport, MonitorSettings, ProductOutcome};
pub use decision::AlertDecision;

use cycle::MonitorContext;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum MonitorState {
    Stopped,
    Running,
    Stopping,
}

struct Lifecycle {
    state: MonitorState,
    scheduler: Option<JoinHandle<()>>,
}

/// Periodic price monitor: runs a fetch cycle at start and then every
/// `settings.interval`, plus on-demand single-product checks.
///
/// Scheduled cycles never overlap. Shutdown is one watch flag, observed by
/// the scheduler and by every worker before it starts its next product.
pub struct PriceMonitor {
    ctx: Arc<MonitorContext>,
    shutdown_tx: watch::Sender<bool>,
    /// Flips to true once the scheduler and its workers have returned.
    stopped_tx: watch::Sender<bool>,
    lifecycle: Mutex<Lifecycle>,
}

impl PriceMonitor {
    pub fn new(
        store: Arc<dyn ProductStore>,
        fetchers: FetcherSet,
        notifier: Arc<dyn Notifier>,
        status: Arc<MonitorStatus>,
        settings: MonitorSettings,
    ) -> Self {
        let (shutdown_tx, _) = watch::channel(false);
        let (stopped_tx, _) = watch::channel(false);
        Self {
            ctx: Arc::new(MonitorContext { store, fetchers, notifier, status, settings }),
            shutdown_tx,
            stopped_tx,
            lifecycle: Mutex::new(Lifecycle { state: MonitorState::Stopped, scheduler: None }),
        }
    }

    fn lifecycle(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn state(&self) -> MonitorState {
        self.lifecycle().state
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.ctx.settings
    }

    /// Spawn the scheduler. A second call while running is ignored. A
    /// stopped monitor cannot be restarted.
    pub fn start(&self) {
        let mut lifecycle = self.lifecycle();
        if lifecycle.state != MonitorState::Stopped || *self.shutdown_tx.borrow() {
            warn!("Price monitor already started or stopped, ignoring start");
            return;
        }

        let ctx = Arc::clone(&self.ctx);
        let shutdown = self.shutdown_tx.subscribe();
        lifecycle.scheduler = Some(tokio::spawn(schedule(ctx, shutdown)));
        lifecycle.state = MonitorState::Running;

        info!(
            interval_secs = self.ctx.settings.interval.as_secs(),
            workers = self.ctx.settings.workers,
            window_days = self.ctx.settings.window_days,
            "Price monitor started",
        );
    }

    /// Signal shutdown and wait for the scheduler and any in-flight workers
    /// to finish. Products not yet started in the current cycle are dropped.
    /// No-op when never started. Concurrent callers all wait for the same
    /// drain.
    pub async fn stop(&self) {
        let claimed = {
            let mut lifecycle = self.lifecycle();
            match lifecycle.state {
                MonitorState::Running => {
                    lifecycle.state = MonitorState::Stopping;
                    Some(lifecycle.scheduler.take())
                }
                MonitorState::Stopping => None,
                MonitorState::Stopped => return,
            }
        };
        let Some(scheduler) = claimed else {
            // Another caller is draining; wait for it to finish.
            let mut stopped = self.stopped_tx.subscribe();
            let _ = stopped.wait_for(|done| *done).await;
            return;
        };

        info!("Stopping price monitor...");
        self.shutdown_tx.send_replace(true);

        if let Some(handle) = scheduler {
            if let Err(e) = handle.await {
                error!("Scheduler task failed: {e}");
            }
        }

        self.lifecycle().state = MonitorState::Stopped;
        self.stopped_tx.send_replace(true);
        info!("Price monitor stopped");
    }

    /// Check one product immediately. Same path as a scheduled check
    /// (alerting included) but the outcome is returned to the caller.
    pub async fn trigger(&self, product_id: &str) -> Result<ProductOutcome> {
        let product = self
            .ctx
            .store
            .list_products()
            .await?
            .into_iter()
            .find(|p| p.id == product_id)
            .ok_or_else(|| AppError::NotFound(format!("product {product_id}")))?;

        info!(product_id = %product.id, url = %product.url, "Manual price check");
        cycle::process_product(&self.ctx, &product).await
    }
}

async fn schedule(ctx: Arc<MonitorContext>, mut shutdown: watch::Receiver<bool>) {
    // Cold start: first prices without waiting a full interval.
    run_logged(&ctx, &shutdown).await;

    let mut ticker = interval(ctx.settings.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await; // consume immediate first tick

    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => break,
        }
        run_logged(&ctx, &shutdown).await;
    }
}

async fn run_logged(ctx: &Arc<MonitorContext>, shutdown: &watch::Receiver<bool>) {
    if *shutdown.borrow() {
        return;
    }
    if let Err(e) = cycle::run_cycle(Arc::clone(ctx), shutdown.clone()).await {
        error!("Fetch cycle aborted, could not list products: {e}");
    }
}
