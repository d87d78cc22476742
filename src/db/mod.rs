#[cfg(test)]
pub mod memory;
pub mod models;
pub mod sqlite;

use async_trait::async_trait;
use rust_decimal::Decimal;

use crate::error::StoreError;
use crate::types::{AlertRecord, PriceObservation, Platform, Product};

pub use sqlite::SqliteStore;

/// Durable catalog of tracked products plus the append-only price and alert
/// logs. Every call is independent; callers add no cross-call locking.
#[async_trait]
pub trait ProductStore: Send + Sync {
    async fn list_products(&self) -> Result<Vec<Product>, StoreError>;

    async fn get_product(&self, id: &str) -> Result<Option<Product>, StoreError>;

    async fn create_product(
        &self,
        name: &str,
        url: &str,
        platform: Platform,
    ) -> Result<Product, StoreError>;

    /// Removes the product and, by cascade, its observations and alerts.
    /// Returns false when no such product exists.
    async fn delete_product(&self, id: &str) -> Result<bool, StoreError>;

    /// Price of the most recent observation; None before the first one.
    async fn latest_price(&self, product_id: &str) -> Result<Option<Decimal>, StoreError>;

    /// Lowest observed price within the trailing `window_days`; None when the
    /// window holds no observations.
    async fn window_minimum(
        &self,
        product_id: &str,
        window_days: u32,
    ) -> Result<Option<Decimal>, StoreError>;

    async fn record_observation(
        &self,
        product_id: &str,
        price: Decimal,
        currency: &str,
    ) -> Result<PriceObservation, StoreError>;

    async fn record_alert(&self, alert: &AlertRecord) -> Result<(), StoreError>;

    /// Newest first.
    async fn price_history(
        &self,
        product_id: &str,
        limit: i64,
    ) -> Result<Vec<PriceObservation>, StoreError>;

    /// Newest first.
    async fn recent_alerts(&self, limit: i64) -> Result<Vec<AlertRecord>, StoreError>;
}

/// Start of the trailing window, in epoch nanoseconds.
pub fn window_start_ns(now_ns: i64, window_days: u32) -> i64 {
    now_ns.saturating_sub(i64::from(window_days) * 86_400 * 1_000_000_000)
}
