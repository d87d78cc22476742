use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::{delete, get, post},
    Json, Router,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::api::health::health;
use crate::db::ProductStore;
use crate::error::AppError;
use crate::fetcher::FetcherSet;
use crate::monitor::{MonitorState, PriceMonitor};
use crate::state::{MonitorStatus, ProductStatus, StatusSnapshot};
use crate::types::{AlertRecord, Platform, PriceObservation, Product};

const DEFAULT_HISTORY_LIMIT: i64 = 100;
const DEFAULT_ALERT_LIMIT: i64 = 50;
const MAX_LIMIT: i64 = 1000;

#[derive(Clone)]
pub struct ApiState {
    pub store: Arc<dyn ProductStore>,
    pub monitor: Arc<PriceMonitor>,
    pub fetchers: FetcherSet,
    pub status: Arc<MonitorStatus>,
}

pub fn router(state: ApiState) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/api/products", get(list_products).post(create_product))
        .route("/api/products/:id", delete(delete_product))
        .route("/api/products/:id/scrape", post(scrape_product))
        .route("/api/products/:id/history", get(get_history))
        .route("/api/alerts", get(get_alerts))
        .route("/api/status", get(get_status))
        .with_state(state)
}

// ---------------------------------------------------------------------------
// Request / query types
// ---------------------------------------------------------------------------

#[derive(Deserialize)]
pub struct CreateProductRequest {
    pub name: String,
    pub url: String,
}

#[derive(Deserialize)]
pub struct LimitQuery {
    pub limit: Option<i64>,
}

impl LimitQuery {
    fn resolve(&self, default: i64) -> i64 {
        self.limit.unwrap_or(default).clamp(1, MAX_LIMIT)
    }
}

// ---------------------------------------------------------------------------
// Response types
// ---------------------------------------------------------------------------

#[derive(Serialize)]
pub struct ProductView {
    #[serde(flatten)]
    pub product: Product,
    pub status: Option<ProductStatus>,
}

#[derive(Serialize)]
pub struct ScrapeResponse {
    pub product_id: String,
    pub price: Decimal,
    pub currency: String,
    /// Absent when the alert check was skipped.
    pub decision: Option<&'static str>,
    pub alert_sent: bool,
    pub observed_at: i64,
}

#[derive(Serialize)]
pub struct StatusResponse {
    pub monitor: MonitorState,
    pub interval_secs: u64,
    pub workers: usize,
    pub window_days: u32,
    pub platforms: Vec<Platform>,
    #[serde(flatten)]
    pub snapshot: StatusSnapshot,
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

async fn list_products(State(state): State<ApiState>) -> Result<Json<Vec<ProductView>>, AppError> {
    let products = state.store.list_products().await?;
    let views = products
        .into_iter()
        .map(|product| {
            let status = state.status.product(&product.id);
            ProductView { product, status }
        })
        .collect();
    Ok(Json(views))
}

async fn create_product(
    State(state): State<ApiState>,
    Json(req): Json<CreateProductRequest>,
) -> Result<(StatusCode, Json<Product>), AppError> {
    let name = req.name.trim();
    let url = req.url.trim();
    if name.is_empty() || url.is_empty() {
        return Err(AppError::BadRequest("name and url are required".to_string()));
    }

    let platform = state.fetchers.platform_for_url(url)?;
    let product = state.store.create_product(name, url, platform).await?;
    info!(product_id = %product.id, platform = %platform, "Tracking new product {name}");

    Ok((StatusCode::CREATED, Json(product)))
}

async fn delete_product(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    if !state.store.delete_product(&id).await? {
        return Err(AppError::NotFound(format!("product {id}")));
    }
    state.status.forget(&id);
    info!(product_id = %id, "Stopped tracking product");
    Ok(StatusCode::NO_CONTENT)
}

async fn scrape_product(
    State(state): State<ApiState>,
    Path(id): Path<String>,
) -> Result<Json<ScrapeResponse>, AppError> {
    let outcome = state.monitor.trigger(&id).await?;
    Ok(Json(ScrapeResponse {
        product_id: id,
        price: outcome.quote.price,
        currency: outcome.quote.currency,
        decision: outcome.decision.as_ref().map(|d| d.label()),
        alert_sent: outcome.alert_sent,
        observed_at: outcome.observation.observed_at,
    }))
}

async fn get_history(
    State(state): State<ApiState>,
    Path(id): Path<String>,
    Query(params): Query<LimitQuery>,
) -> Result<Json<Vec<PriceObservation>>, AppError> {
    if state.store.get_product(&id).await?.is_none() {
        return Err(AppError::NotFound(format!("product {id}")));
    }
    let history = state
        .store
        .price_history(&id, params.resolve(DEFAULT_HISTORY_LIMIT))
        .await?;
    Ok(Json(history))
}

async fn get_alerts(
    State(state): State<ApiState>,
    Query(params): Query<LimitQuery>,
) -> Result<Json<Vec<AlertRecord>>, AppError> {
    let alerts = state
        .store
        .recent_alerts(params.resolve(DEFAULT_ALERT_LIMIT))
        .await?;
    Ok(Json(alerts))
}

async fn get_status(State(state): State<ApiState>) -> Json<StatusResponse> {
    let settings = state.monitor.settings();
    Json(StatusResponse {
        monitor: state.monitor.state(),
        interval_secs: settings.interval.as_secs(),
        workers: settings.workers,
        window_days: settings.window_days,
        platforms: state.fetchers.platforms(),
        snapshot: state.status.snapshot(),
    })
}
