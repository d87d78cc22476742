use std::time::Duration;

use crate::error::{AppError, Result};

pub const DB_PATH: &str = "price_watcher.db";

/// Seconds between scheduled fetch cycles.
pub const SCRAPING_INTERVAL_SECS: u64 = 3600;

/// Concurrent fetch workers per cycle.
pub const WORKER_POOL_SIZE: usize = 5;

/// Trailing window (days) used to decide whether a price is a new low.
pub const PRICE_HISTORY_DAYS: u32 = 30;

/// Grace period for the monitor to drain in-flight workers on shutdown.
pub const SHUTDOWN_TIMEOUT_SECS: u64 = 30;

/// Per-request bound on page fetches. The monitor never times out a fetch
/// itself, so this is what bounds shutdown.
pub const FETCH_TIMEOUT_SECS: u64 = 20;

/// Per-request bound on Telegram delivery.
pub const NOTIFY_TIMEOUT_SECS: u64 = 10;

pub const CURRENCY: &str = "INR";

pub const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    pub db_path: String,
    pub api_port: u16,
    /// Interval between scheduled cycles (SCRAPING_INTERVAL, seconds)
    pub scraping_interval: Duration,
    /// Fixed worker count per cycle (WORKER_POOL_SIZE)
    pub worker_pool_size: usize,
    /// Trailing window length for the new-low check (PRICE_HISTORY_DAYS)
    pub price_history_days: u32,
    /// Bound on `PriceMonitor::stop` during process shutdown (SHUTDOWN_TIMEOUT, seconds)
    pub shutdown_timeout: Duration,
    pub fetch_timeout: Duration,
    pub currency: String,
    /// Blank token or chat id puts the notifier in log-only mode.
    pub telegram_token: Option<String>,
    pub telegram_chat_id: Option<String>,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        // A missing .env file is fine; real environment variables still apply.
        let _ = dotenvy::dotenv();

        Ok(Self {
            log_level: std::env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            db_path: std::env::var("DB_PATH").unwrap_or_else(|_| DB_PATH.to_string()),
            api_port: std::env::var("API_PORT")
                .unwrap_or_else(|_| "8080".to_string())
                .parse::<u16>()
                .map_err(|_| AppError::Config("API_PORT must be a valid port number".to_string()))?,
            scraping_interval: Duration::from_secs(positive_var(
                "SCRAPING_INTERVAL",
                SCRAPING_INTERVAL_SECS,
            )?),
            worker_pool_size: positive_var("WORKER_POOL_SIZE", WORKER_POOL_SIZE as u64)? as usize,
            price_history_days: u32::try_from(positive_var(
                "PRICE_HISTORY_DAYS",
                u64::from(PRICE_HISTORY_DAYS),
            )?)
            .map_err(|_| AppError::Config("PRICE_HISTORY_DAYS is out of range".to_string()))?,
            shutdown_timeout: Duration::from_secs(positive_var(
                "SHUTDOWN_TIMEOUT",
                SHUTDOWN_TIMEOUT_SECS,
            )?),
            fetch_timeout: Duration::from_secs(positive_var("FETCH_TIMEOUT", FETCH_TIMEOUT_SECS)?),
            currency: std::env::var("CURRENCY")
                .ok()
                .map(|c| c.trim().to_uppercase())
                .filter(|c| !c.is_empty())
                .unwrap_or_else(|| CURRENCY.to_string()),
            telegram_token: non_blank_var("TELEGRAM_TOKEN"),
            telegram_chat_id: non_blank_var("TELEGRAM_CHAT_ID"),
        })
    }
}

fn non_blank_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn positive_var(key: &str, default: u64) -> Result<u64> {
    match non_blank_var(key) {
        None => Ok(default),
        Some(raw) => parse_positive(key, &raw),
    }
}

fn parse_positive(key: &str, raw: &str) -> Result<u64> {
    match raw.parse::<u64>() {
        Ok(0) => Err(AppError::Config(format!("{key} must be greater than zero"))),
        Ok(v) => Ok(v),
        Err(_) => Err(AppError::Config(format!("{key} must be a positive integer, got {raw:?}"))),
    }
}
