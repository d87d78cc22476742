use std::str::FromStr;

use async_trait::async_trait;
use rust_decimal::Decimal;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use crate::db::models::{AlertRow, ObservationRow, ProductRow};
use crate::db::{window_start_ns, ProductStore};
use crate::error::StoreError;
use crate::types::{
    from_minor_units, now_ns, to_minor_units, AlertRecord, PriceObservation, Platform, Product,
};

pub struct SqliteStore {
    pool: SqlitePool,
}

impl SqliteStore {
    /// Open (creating if needed) the database file and apply migrations.
    pub async fn connect(db_path: &str) -> Result<Self, StoreError> {
        let opts = SqliteConnectOptions::from_str(&format!("sqlite:{db_path}"))?
            .create_if_missing(true)
            .foreign_keys(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new()
            .max_connections(8)
            .connect_with(opts)
            .await?;
        let store = Self::from_pool(pool).await?;
        info!("Database ready at {db_path}");
        Ok(store)
    }

    /// Private in-memory database. Pinned to one connection: every SQLite
    /// memory connection is its own database.
    #[cfg(test)]
    pub async fn in_memory() -> Result<Self, StoreError> {
        let opts = SqliteConnectOptions::from_str("sqlite::memory:")?.foreign_keys(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .connect_with(opts)
            .await?;
        Self::from_pool(pool).await
    }

    async fn from_pool(pool: SqlitePool) -> Result<Self, StoreError> {
        sqlx::migrate!("./migrations").run(&pool).await?;
        Ok(Self { pool })
    }
}

fn minor(price: Decimal) -> Result<i64, StoreError> {
    to_minor_units(price).ok_or_else(|| StoreError::InvalidRow(format!("price {price} out of range")))
}

#[async_trait]
impl ProductStore for SqliteStore {
    async fn list_products(&self) -> Result<Vec<Product>, StoreError> {
        let rows = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, url, platform, created_at FROM products ORDER BY created_at DESC",
        )
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(Product::try_from).collect()
    }

    async fn get_product(&self, id: &str) -> Result<Option<Product>, StoreError> {
        let row = sqlx::query_as::<_, ProductRow>(
            "SELECT id, name, url, platform, created_at FROM products WHERE id = ?",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(Product::try_from).transpose()
    }

    async fn create_product(
        &self,
        name: &str,
        url: &str,
        platform: Platform,
    ) -> Result<Product, StoreError> {
        let product = Product {
            id: Uuid::new_v4().to_string(),
            name: name.to_string(),
            url: url.to_string(),
            platform,
            created_at: now_ns(),
        };

        let result = sqlx::query(
            r#"
            INSERT INTO products (id, name, url, platform, created_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&product.id)
        .bind(&product.name)
        .bind(&product.url)
        .bind(product.platform.as_str())
        .bind(product.created_at)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(product),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::Duplicate(format!("product URL already tracked: {url}")))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn delete_product(&self, id: &str) -> Result<bool, StoreError> {
        let result = sqlx::query("DELETE FROM products WHERE id = ?")
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn latest_price(&self, product_id: &str) -> Result<Option<Decimal>, StoreError> {
        let price = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT price_minor FROM price_observations
            WHERE product_id = ?
            ORDER BY observed_at DESC, id DESC
            LIMIT 1
            "#,
        )
        .bind(product_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(price.map(from_minor_units))
    }

    async fn window_minimum(
        &self,
        product_id: &str,
        window_days: u32,
    ) -> Result<Option<Decimal>, StoreError> {
        let since = window_start_ns(now_ns(), window_days);
        let min = sqlx::query_scalar::<_, Option<i64>>(
            r#"
            SELECT MIN(price_minor) FROM price_observations
            WHERE product_id = ? AND observed_at >= ?
            "#,
        )
        .bind(product_id)
        .bind(since)
        .fetch_one(&self.pool)
        .await?;

        Ok(min.map(from_minor_units))
    }

    async fn record_observation(
        &self,
        product_id: &str,
        price: Decimal,
        currency: &str,
    ) -> Result<PriceObservation, StoreError> {
        // observed_at is forced strictly past the product's previous row so
        // the per-product log stays ordered even if the wall clock steps back.
        let row = sqlx::query_as::<_, ObservationRow>(
            r#"
            INSERT INTO price_observations (product_id, price_minor, currency, observed_at)
            VALUES (?, ?, ?, MAX(?, COALESCE(
                (SELECT MAX(observed_at) + 1 FROM price_observations WHERE product_id = ?), 0)))
            RETURNING product_id, price_minor, currency, observed_at
            "#,
        )
        .bind(product_id)
        .bind(minor(price)?)
        .bind(currency)
        .bind(now_ns())
        .bind(product_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(row.into())
    }

    async fn record_alert(&self, alert: &AlertRecord) -> Result<(), StoreError> {
        sqlx::query(
            r#"
            INSERT INTO alerts (product_id, old_price_minor, new_price_minor, currency, message, sent_at)
            VALUES (?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(&alert.product_id)
        .bind(minor(alert.old_price)?)
        .bind(minor(alert.new_price)?)
        .bind(&alert.currency)
        .bind(&alert.message)
        .bind(alert.sent_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    async fn price_history(
        &self,
        product_id: &str,
        limit: i64,
    ) -> Result<Vec<PriceObservation>, StoreError> {
        let rows = sqlx::query_as::<_, ObservationRow>(
            r#"
            SELECT product_id, price_minor, currency, observed_at
            FROM price_observations
            WHERE product_id = ?
            ORDER BY observed_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(product_id)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(PriceObservation::from).collect())
    }

    async fn recent_alerts(&self, limit: i64) -> Result<Vec<AlertRecord>, StoreError> {
        let rows = sqlx::query_as::<_, AlertRow>(
            r#"
            SELECT product_id, old_price_minor, new_price_minor, currency, message, sent_at
            FROM alerts
            ORDER BY sent_at DESC, id DESC
            LIMIT ?
            "#,
        )
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows.into_iter().map(AlertRecord::from).collect())
    }
}
