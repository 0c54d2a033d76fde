//! # Product Repository
//!
//! Database operations for the POS catalog (minibar, restaurant, laundry,
//! ...). Stock for inventory-tracked products is decremented inside the
//! same transaction as the charge lines that consume it.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use posada_core::Product;

/// Repository for product database operations.
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Inserts a product.
    pub async fn create(&self, product: &Product) -> DbResult<()> {
        debug!(id = %product.id, name = %product.name, "Inserting product");

        sqlx::query(
            r#"
            INSERT INTO products (
                id, operator_id, category, name, price_cents, tax_rate_bps,
                track_inventory, stock_quantity, is_active, created_at, updated_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&product.id)
        .bind(&product.operator_id)
        .bind(&product.category)
        .bind(&product.name)
        .bind(product.price_cents)
        .bind(product.tax_rate_bps)
        .bind(product.track_inventory)
        .bind(product.stock_quantity)
        .bind(product.is_active)
        .bind(product.created_at)
        .bind(product.updated_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets a product by id within the operator's scope.
    pub async fn get(&self, operator_id: &str, product_id: &str) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE id = ?1 AND operator_id = ?2",
        )
        .bind(product_id)
        .bind(operator_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(product)
    }

    /// Transaction-scoped variant of [`get`](Self::get).
    pub async fn get_tx(
        conn: &mut SqliteConnection,
        operator_id: &str,
        product_id: &str,
    ) -> DbResult<Option<Product>> {
        let product = sqlx::query_as::<_, Product>(
            "SELECT * FROM products WHERE id = ?1 AND operator_id = ?2",
        )
        .bind(product_id)
        .bind(operator_id)
        .fetch_optional(conn)
        .await?;

        Ok(product)
    }

    /// Lists products for the POS, optionally filtered by category.
    pub async fn list(
        &self,
        operator_id: &str,
        category: Option<&str>,
        only_active: bool,
    ) -> DbResult<Vec<Product>> {
        let products = sqlx::query_as::<_, Product>(
            r#"
            SELECT * FROM products
            WHERE operator_id = ?1
              AND (?2 IS NULL OR category = ?2)
              AND (?3 = 0 OR is_active = 1)
            ORDER BY category, name
            "#,
        )
        .bind(operator_id)
        .bind(category)
        .bind(only_active)
        .fetch_all(&self.pool)
        .await?;

        Ok(products)
    }

    /// Decrements stock for an inventory-tracked product, as part of the
    /// charge transaction. No-op (returns `false`) for products that do not
    /// track inventory.
    ///
    /// Stock may go negative: the front desk sells what is physically in
    /// the minibar; the count is corrected at restock.
    pub async fn decrement_stock(
        conn: &mut SqliteConnection,
        operator_id: &str,
        product_id: &str,
        quantity: i64,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        debug!(product_id = %product_id, quantity, "Decrementing stock");

        let result = sqlx::query(
            r#"
            UPDATE products SET stock_quantity = stock_quantity - ?1, updated_at = ?2
            WHERE id = ?3 AND operator_id = ?4 AND track_inventory = 1
            "#,
        )
        .bind(quantity)
        .bind(now)
        .bind(product_id)
        .bind(operator_id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
