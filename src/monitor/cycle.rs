use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tokio::sync::{mpsc, watch, Mutex};
use tracing::{debug, error, info, warn};

use crate::config::{PRICE_HISTORY_DAYS, SCRAPING_INTERVAL_SECS, WORKER_POOL_SIZE};
use crate::db::ProductStore;
use crate::error::{Result, StoreError};
use crate::fetcher::FetcherSet;
use crate::monitor::decision::{decide, needs_window_minimum, render_alert, AlertDecision, NewLow};
use crate::notifier::Notifier;
use crate::state::MonitorStatus;
use crate::types::{normalize_price, now_ns, AlertRecord, PriceObservation, Product, Quote};

#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub interval: Duration,
    /// Upper bound on concurrent product checks within one cycle.
    pub workers: usize,
    pub window_days: u32,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(SCRAPING_INTERVAL_SECS),
            workers: WORKER_POOL_SIZE,
            window_days: PRICE_HISTORY_DAYS,
        }
    }
}

/// Collaborators shared by the scheduler, every worker and on-demand checks.
pub(crate) struct MonitorContext {
    pub store: Arc<dyn ProductStore>,
    pub fetchers: FetcherSet,
    pub notifier: Arc<dyn Notifier>,
    pub status: Arc<MonitorStatus>,
    pub settings: MonitorSettings,
}

/// Tally of one fetch cycle. `skipped` counts products abandoned because
/// shutdown was signalled before a worker reached them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub products: usize,
    pub succeeded: usize,
    pub failed: usize,
    pub skipped: usize,
    pub alerts: usize,
}

#[derive(Debug, Default)]
struct WorkerTally {
    succeeded: usize,
    failed: usize,
    alerts: usize,
}

#[derive(Debug, Clone)]
pub struct ProductOutcome {
    pub quote: Quote,
    /// None when the history lookup failed and the alert check was skipped.
    pub decision: Option<AlertDecision>,
    pub alert_sent: bool,
    pub observation: PriceObservation,
}

/// One pass over the catalog snapshot taken at cycle start.
///
/// Products are preloaded into a closed queue and drained by
/// `min(workers, products)` tasks. Returns once every worker has exited.
/// A listing failure aborts the cycle before any work is dispatched.
pub(crate) async fn run_cycle(
    ctx: Arc<MonitorContext>,
    shutdown: watch::Receiver<bool>,
) -> std::result::Result<CycleReport, StoreError> {
    ctx.status.cycle_started();
    let products = ctx.store.list_products().await?;

    if products.is_empty() {
        info!("No products to check");
        ctx.status.cycle_finished();
        return Ok(CycleReport::default());
    }

    let total = products.len();
    let (tx, rx) = mpsc::channel::<Product>(total);
    for product in products {
        // Capacity equals the batch size, so this never waits.
        if tx.send(product).await.is_err() {
            break;
        }
    }
    drop(tx);

    let queue = Arc::new(Mutex::new(rx));
    let workers = ctx.settings.workers.clamp(1, total);
    info!(products = total, workers, "Fetch cycle started");

    let handles: Vec<_> = (0..workers)
        .map(|id| {
            tokio::spawn(worker(
                id,
                Arc::clone(&ctx),
                Arc::clone(&queue),
                shutdown.clone(),
            ))
        })
        .collect();

    let mut report = CycleReport { products: total, ..Default::default() };
    for joined in join_all(handles).await {
        match joined {
            Ok(tally) => {
                report.succeeded += tally.succeeded;
                report.failed += tally.failed;
                report.alerts += tally.alerts;
            }
            Err(e) => error!("Fetch worker panicked: {e}"),
        }
    }
    report.skipped = total.saturating_sub(report.succeeded + report.failed);
    ctx.status.cycle_finished();

    info!(
        products = report.products,
        succeeded = report.succeeded,
        failed = report.failed,
        skipped = report.skipped,
        alerts = report.alerts,
        "Fetch cycle complete: {}/{} ok, {} failed, {} skipped, {} alerts",
        report.succeeded, report.products, report.failed, report.skipped, report.alerts,
    );
    Ok(report)
}

async fn worker(
    id: usize,
    ctx: Arc<MonitorContext>,
    queue: Arc<Mutex<mpsc::Receiver<Product>>>,
    shutdown: watch::Receiver<bool>,
) -> WorkerTally {
    let mut tally = WorkerTally::default();

    loop {
        let Some(product) = queue.lock().await.recv().await else {
            break;
        };
        if *shutdown.borrow() {
            debug!(worker = id, "Shutdown signalled, leaving remaining products");
            break;
        }

        match process_product(&ctx, &product).await {
            Ok(outcome) => {
                tally.succeeded += 1;
                if outcome.alert_sent {
                    tally.alerts += 1;
                }
            }
            Err(e) => {
                tally.failed += 1;
                warn!(
                    worker = id,
                    product_id = %product.id,
                    url = %product.url,
                    "Price check failed: {e}",
                );
            }
        }
    }

    tally
}

/// Fetch, decide, alert, persist, for one product.
///
/// Alerting comes before the observation write so the decision compares
/// against history that excludes the current price. A failed history lookup
/// skips alerting but still records the price.
pub(crate) async fn process_product(ctx: &MonitorContext, product: &Product) -> Result<ProductOutcome> {
    let result = check(ctx, product).await;
    match &result {
        Ok(outcome) => ctx.status.record_success(&product.id, &outcome.quote),
        Err(e) => ctx.status.record_failure(&product.id, &e.to_string()),
    }
    result
}

async fn check(ctx: &MonitorContext, product: &Product) -> Result<ProductOutcome> {
    let fetcher = ctx.fetchers.get(product.platform)?;
    let mut quote = fetcher.fetch_price(&product.url).await?;
    quote.price = normalize_price(quote.price);

    let decision = match evaluate(ctx, product, quote.price).await {
        Ok(decision) => Some(decision),
        Err(e) => {
            warn!(product_id = %product.id, "Skipping alert check, history lookup failed: {e}");
            None
        }
    };

    let alert_sent = match &decision {
        Some(AlertDecision::NewLow(low)) => send_alert(ctx, product, low, &quote.currency).await,
        _ => false,
    };

    let observation = ctx
        .store
        .record_observation(&product.id, quote.price, &quote.currency)
        .await?;

    debug!(
        product_id = %product.id,
        price = %quote.price,
        alert = alert_sent,
        "Recorded price for {}",
        product.name,
    );

    Ok(ProductOutcome { quote, decision, alert_sent, observation })
}

async fn evaluate(
    ctx: &MonitorContext,
    product: &Product,
    current: rust_decimal::Decimal,
) -> std::result::Result<AlertDecision, StoreError> {
    let previous = ctx.store.latest_price(&product.id).await?;
    let window_min = if needs_window_minimum(previous, current) {
        ctx.store
            .window_minimum(&product.id, ctx.settings.window_days)
            .await?
    } else {
        None
    };
    Ok(decide(previous, current, window_min))
}

/// Returns true when the notifier accepted the message. The audit row is
/// written only after delivery.
async fn send_alert(ctx: &MonitorContext, product: &Product, low: &NewLow, currency: &str) -> bool {
    let message = render_alert(product, low, ctx.settings.window_days, currency);

    if let Err(e) = ctx.notifier.send(&message).await {
        warn!(
            product_id = %product.id,
            channel = ctx.notifier.channel_name(),
            "Alert delivery failed: {e}",
        );
        return false;
    }

    info!(
        product_id = %product.id,
        old_price = %low.previous,
        new_price = %low.current,
        "Price drop alert sent for {}",
        product.name,
    );
    ctx.status.record_alert(&product.id);

    let record = AlertRecord {
        product_id: product.id.clone(),
        old_price: low.previous,
        new_price: low.current,
        currency: currency.to_string(),
        message,
        sent_at: now_ns(),
    };
    if let Err(e) = ctx.store.record_alert(&record).await {
        warn!(product_id = %product.id, "Failed to record sent alert: {e}");
    }
    true
}
