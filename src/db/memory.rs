//! In-memory `ProductStore` for monitor tests, with switches for injecting
//! store failures.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use dashmap::DashMap;
use rust_decimal::Decimal;
use uuid::Uuid;

use crate::db::{window_start_ns, ProductStore};
use crate::error::StoreError;
use crate::types::{
    normalize_price, now_ns, to_minor_units, AlertRecord, PriceObservation, Platform, Product,
};

#[derive(Default)]
pub struct MemoryStore {
    products: DashMap<String, Product>,
    observations: Mutex<Vec<PriceObservation>>,
    alerts: Mutex<Vec<AlertRecord>>,
    fail_listing: AtomicBool,
    fail_observations: AtomicBool,
    fail_history: AtomicBool,
    fail_alerts: AtomicBool,
}

fn injected() -> StoreError {
    StoreError::InvalidRow("injected failure".to_string())
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_product(&self, name: &str, url: &str, platform: Platform) -> Product {
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            url: url.to_string(),
            platform,
            created_at: now_ns(),
        };
        self.products.insert(product.id.clone(), product.clone());
        product
    }

    /// Seed history at an explicit timestamp.
    pub fn seed_observation(&self, product_id: &str, price: Decimal, observed_at: i64) {
        self.observations.lock().unwrap().push(PriceObservation {
            product_id: product_id.to_string(),
            price: normalize_price(price),
            currency: "INR".to_string(),
            observed_at,
        });
    }

    pub fn observations_for(&self, product_id: &str) -> Vec<PriceObservation> {
        self.observations
            .lock()
            .unwrap()
            .iter()
            .filter(|o| o.product_id == product_id)
            .cloned()
            .collect()
    }

    pub fn alerts(&self) -> Vec<AlertRecord> {
        self.alerts.lock().unwrap().clone()
    }

    pub fn set_fail_listing(&self, fail: bool) {
        self.fail_listing.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_observations(&self, fail: bool) {
        self.fail_observations.store(fail, Ordering::SeqCst);
    }

    /// Fail `latest_price` and `window_minimum`.
    pub fn set_fail_history(&self, fail: bool) {
        self.fail_history.store(fail, Ordering::SeqCst);
    }

    pub fn set_fail_alerts(&self, fail: bool) {
        self.fail_alerts.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProductStore for MemoryStore {
    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        if self.fail_listing.load(Ordering::SeqCst) {
            return Err(injected());
        }
        let mut products: Vec<Product> = self.products.iter().map(|e| e.value().clone()).collect();
        products.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(products)
    }

    async fn get_product(&self, id: &str) -> Result<Option<Product>, StoreError> {
        Ok(self.products.get(id).map(|p| p.clone()))
    }

    async fn create_product(
        &self,
        name: &str,
        url: &str,
        platform: Platform,
    ) -> Result<Product, StoreError> {
        if self.products.iter().any(|p| p.url == url) {
            return Err(StoreError::Duplicate(format!("product URL already tracked: {url}")));
        }
        Ok(self.add_product(name, url, platform))
    }

    async fn delete_product(&self, id: &str) -> Result<bool, StoreError> {
        let removed = self.products.remove(id).is_some();
        self.observations.lock().unwrap().retain(|o| o.product_id != id);
        self.alerts.lock().unwrap().retain(|a| a.product_id != id);
        Ok(removed)
    }

    async fn latest_price(&self, product_id: &str) -> Result<Option<Decimal>, StoreError> {
        if self.fail_history.load(Ordering::SeqCst) {
            return Err(injected());
        }
        Ok(self
            .observations_for(product_id)
            .into_iter()
            .max_by_key(|o| o.observed_at)
            .map(|o| o.price))
    }

    async fn window_minimum(
        &self,
        product_id: &str,
        window_days: u32,
    ) -> Result<Option<Decimal>, StoreError> {
        if self.fail_history.load(Ordering::SeqCst) {
            return Err(injected());
        }
        let since = window_start_ns(now_ns(), window_days);
        Ok(self
            .observations_for(product_id)
            .into_iter()
            .filter(|o| o.observed_at >= since)
            .map(|o| o.price)
            .min())
    }

    async fn record_observation(
        &self,
        product_id: &str,
        price: Decimal,
        currency: &str,
    ) -> Result<PriceObservation, StoreError> {
        if self.fail_observations.load(Ordering::SeqCst) {
            return Err(injected());
        }
        if to_minor_units(price).is_none() {
            return Err(StoreError::InvalidRow(format!("price {price} out of range")));
        }
        let mut observations = self.observations.lock().unwrap();
        let floor = observations
            .iter()
            .filter(|o| o.product_id == product_id)
            .map(|o| o.observed_at + 1)
            .max()
            .unwrap_or(0);
        let obs = PriceObservation {
            product_id: product_id.to_string(),
            price: normalize_price(price),
            currency: currency.to_string(),
            observed_at: now_ns().max(floor),
        };
        observations.push(obs.clone());
        Ok(obs)
    }

    async fn record_alert(&self, alert: &AlertRecord) -> Result<(), StoreError> {
        if self.fail_alerts.load(Ordering::SeqCst) {
            return Err(injected());
        }
        self.alerts.lock().unwrap().push(alert.clone());
        Ok(())
    }

    async fn price_history(
        &self,
        product_id: &str,
        limit: i64,
    ) -> Result<Vec<PriceObservation>, StoreError> {
        let mut history = self.observations_for(product_id);
        history.sort_by(|a, b| b.observed_at.cmp(&a.observed_at));
        history.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(history)
    }

    async fn recent_alerts(&self, limit: i64) -> Result<Vec<AlertRecord>, StoreError> {
        let mut alerts = self.alerts();
        alerts.sort_by(|a, b| b.sent_at.cmp(&a.sent_at));
        alerts.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(alerts)
    }
}
