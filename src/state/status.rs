//! Live per-product check results and cycle counters.
//! Written by monitor workers, read by the /api/status endpoint.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicI64, AtomicU64, Ordering};
use std::sync::Arc;

use dashmap::DashMap;
use rust_decimal::Decimal;
use serde::Serialize;

use crate::types::{now_ns, Quote};

/// Most recent check outcome for one product. Timestamps are epoch ns.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ProductStatus {
    pub last_price: Option<Decimal>,
    pub currency: Option<String>,
    pub last_success_at: Option<i64>,
    pub last_error: Option<String>,
    pub last_error_at: Option<i64>,
    pub last_alert_at: Option<i64>,
    pub consecutive_failures: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct StatusSnapshot {
    pub cycles_completed: u64,
    /// 0 = no cycle yet.
    pub last_cycle_started_at: i64,
    pub last_cycle_finished_at: i64,
    pub products: BTreeMap<String, ProductStatus>,
}

#[derive(Default)]
pub struct MonitorStatus {
    products: DashMap<String, ProductStatus>,
    cycles_completed: AtomicU64,
    last_cycle_started_at: AtomicI64,
    last_cycle_finished_at: AtomicI64,
}

impl MonitorStatus {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn cycle_started(&self) {
        self.last_cycle_started_at.store(now_ns(), Ordering::Relaxed);
    }

    pub fn cycle_finished(&self) {
        self.last_cycle_finished_at.store(now_ns(), Ordering::Relaxed);
        self.cycles_completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn record_success(&self, product_id: &str, quote: &Quote) {
        let mut entry = self.products.entry(product_id.to_string()).or_default();
        entry.last_price = Some(quote.price);
        entry.currency = Some(quote.currency.clone());
        entry.last_success_at = Some(now_ns());
        entry.consecutive_failures = 0;
    }

    /// Keeps the last good price; only the error fields move.
    pub fn record_failure(&self, product_id: &str, error: &str) {
        let mut entry = self.products.entry(product_id.to_string()).or_default();
        entry.last_error = Some(error.to_string());
        entry.last_error_at = Some(now_ns());
        entry.consecutive_failures = entry.consecutive_failures.saturating_add(1);
    }

    pub fn record_alert(&self, product_id: &str) {
        self.products
            .entry(product_id.to_string())
            .or_default()
            .last_alert_at = Some(now_ns());
    }

    pub fn forget(&self, product_id: &str) {
        self.products.remove(product_id);
    }

    pub fn product(&self, product_id: &str) -> Option<ProductStatus> {
        self.products.get(product_id).map(|s| s.clone())
    }

    pub fn cycles_completed(&self) -> u64 {
        self.cycles_completed.load(Ordering::Relaxed)
    }

    pub fn snapshot(&self) -> StatusSnapshot {
        StatusSnapshot {
            cycles_completed: self.cycles_completed(),
            last_cycle_started_at: self.last_cycle_started_at.load(Ordering::Relaxed),
            last_cycle_finished_at: self.last_cycle_finished_at.load(Ordering::Relaxed),
            products: self
                .products
                .iter()
                .map(|e| (e.key().clone(), e.value().clone()))
                .collect(),
        }
    }
}
