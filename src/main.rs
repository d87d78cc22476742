mod api;
mod config;
mod db;
mod error;
mod fetcher;
mod monitor;
mod notifier;
mod state;
mod types;

use std::sync::Arc;

use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use crate::api::routes::{router, ApiState};
use crate::config::{Config, NOTIFY_TIMEOUT_SECS};
use crate::db::{ProductStore, SqliteStore};
use crate::error::Result;
use crate::fetcher::FetcherSet;
use crate::monitor::{MonitorSettings, PriceMonitor};
use crate::notifier::{Notifier, TelegramNotifier};
use crate::state::MonitorStatus;

#[tokio::main]
async fn main() {
    let cfg = match Config::from_env() {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Config error: {e}");
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(&cfg.log_level))
        .init();

    if let Err(e) = run(cfg).await {
        error!("Fatal error: {e}");
        std::process::exit(1);
    }
}

async fn run(cfg: Config) -> Result<()> {
    // --- Storage ---
    let store: Arc<dyn ProductStore> = Arc::new(SqliteStore::connect(&cfg.db_path).await?);

    // --- Collaborators ---
    let fetchers = FetcherSet::http(cfg.fetch_timeout, &cfg.currency)?;
    let telegram = TelegramNotifier::from_config(
        cfg.telegram_token.clone(),
        cfg.telegram_chat_id.clone(),
        std::time::Duration::from_secs(NOTIFY_TIMEOUT_SECS),
    )?;
    if telegram.is_enabled() {
        info!("Telegram alerts enabled");
    }
    let notifier: Arc<dyn Notifier> = Arc::new(telegram);

    // --- Monitor ---
    let status = MonitorStatus::new();
    let settings = MonitorSettings {
        interval: cfg.scraping_interval,
        workers: cfg.worker_pool_size,
        window_days: cfg.price_history_days,
    };
    let monitor = Arc::new(PriceMonitor::new(
        Arc::clone(&store),
        fetchers.clone(),
        notifier,
        Arc::clone(&status),
        settings,
    ));
    monitor.start();

    // --- HTTP API ---
    let api_state = ApiState {
        store,
        monitor: Arc::clone(&monitor),
        fetchers,
        status,
    };
    let app = router(api_state);
    let bind_addr = format!("0.0.0.0:{}", cfg.api_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    info!("HTTP API listening on {bind_addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    info!("HTTP API stopped, draining monitor");
    if tokio::time::timeout(cfg.shutdown_timeout, monitor.stop())
        .await
        .is_err()
    {
        warn!(
            timeout_secs = cfg.shutdown_timeout.as_secs(),
            "Monitor did not stop in time, exiting with checks in flight"
        );
    }

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {e}");
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {e}");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("Shutdown signal received");
}
