//! Database row types matching `migrations/0001_init.sql`.
//! Used by sqlx for typed queries; converted to domain types on the way out.

use std::str::FromStr;

use crate::error::StoreError;
use crate::types::{from_minor_units, AlertRecord, PriceObservation, Platform, Product};

#[derive(Debug, sqlx::FromRow)]
pub struct ProductRow {
    pub id: String,
    pub name: String,
    pub url: String,
    pub platform: String,
    pub created_at: i64,
}

impl TryFrom<ProductRow> for Product {
    type Error = StoreError;

    fn try_from(row: ProductRow) -> Result<Self, Self::Error> {
        let platform = Platform::from_str(&row.platform)
            .map_err(|e| StoreError::InvalidRow(format!("product {}: {e}", row.id)))?;
        Ok(Product {
            id: row.id,
            name: row.name,
            url: row.url,
            platform,
            created_at: row.created_at,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct ObservationRow {
    pub product_id: String,
    pub price_minor: i64,
    pub currency: String,
    pub observed_at: i64,
}

impl From<ObservationRow> for PriceObservation {
    fn from(row: ObservationRow) -> Self {
        PriceObservation {
            product_id: row.product_id,
            price: from_minor_units(row.price_minor),
            currency: row.currency,
            observed_at: row.observed_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct AlertRow {
    pub product_id: String,
    pub old_price_minor: i64,
    pub new_price_minor: i64,
    pub currency: String,
    pub message: String,
    pub sent_at: i64,
}

impl From<AlertRow> for AlertRecord {
    fn from(row: AlertRow) -> Self {
        AlertRecord {
            product_id: row.product_id,
            old_price: from_minor_units(row.old_price_minor),
            new_price: from_minor_units(row.new_price_minor),
            currency: row.currency,
            message: row.message,
            sent_at: row.sent_at,
        }
    }
}
