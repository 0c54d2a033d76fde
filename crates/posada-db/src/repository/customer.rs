//! # Customer Repository
//!
//! Database operations for the guest registry.

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use posada_core::{Customer, FREQUENT_GUEST_STAYS};

/// Repository for customer database operations.
#[derive(Debug, Clone)]
pub struct CustomerRepository {
    pool: SqlitePool,
}

impl CustomerRepository {
    /// Creates a new CustomerRepository.
    pub fn new(pool: SqlitePool) -> Self {
        CustomerRepository { pool }
    }

    /// Inserts a customer.
    pub async fn create(&self, customer: &Customer) -> DbResult<()> {
        let mut conn = self.pool.acquire().await?;
        Self::create_tx(&mut conn, customer).await
    }

    /// Transaction-scoped insert (used by one-shot guest registration,
    /// where the customer and their check-in commit together).
    pub async fn create_tx(conn: &mut SqliteConnection, customer: &Customer) -> DbResult<()> {
        debug!(id = %customer.id, name = %customer.full_name, "Inserting customer");

        sqlx::query(
            r#"
            INSERT INTO customers (
                id, operator_id, full_name, document_number, phone,
                age, nationality, origin,
                total_stays, total_spent_cents, last_stay_date, is_frequent,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)
            "#,
        )
        .bind(&customer.id)
        .bind(&customer.operator_id)
        .bind(&customer.full_name)
        .bind(&customer.document_number)
        .bind(&customer.phone)
        .bind(customer.age)
        .bind(&customer.nationality)
        .bind(&customer.origin)
        .bind(customer.total_stays)
        .bind(customer.total_spent_cents)
        .bind(customer.last_stay_date)
        .bind(customer.is_frequent)
        .bind(customer.created_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Gets a customer by id within the operator's scope.
    pub async fn get(&self, operator_id: &str, customer_id: &str) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            "SELECT * FROM customers WHERE id = ?1 AND operator_id = ?2",
        )
        .bind(customer_id)
        .bind(operator_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(customer)
    }

    /// Transaction-scoped variant of [`get`](Self::get).
    pub async fn get_tx(
        conn: &mut SqliteConnection,
        operator_id: &str,
        customer_id: &str,
    ) -> DbResult<Option<Customer>> {
        let customer = sqlx::query_as::<_, Customer>(
            "SELECT * FROM customers WHERE id = ?1 AND operator_id = ?2",
        )
        .bind(customer_id)
        .bind(operator_id)
        .fetch_optional(conn)
        .await?;

        Ok(customer)
    }

    /// Searches customers by name, document number or phone.
    ///
    /// Best-spending guests first, matching how the front desk uses the
    /// result (recognize the regulars).
    pub async fn search(&self, operator_id: &str, query: &str, limit: u32) -> DbResult<Vec<Customer>> {
        let pattern = format!("%{}%", query.trim());

        let customers = sqlx::query_as::<_, Customer>(
            r#"
            SELECT * FROM customers
            WHERE operator_id = ?1
              AND (full_name LIKE ?2 OR document_number LIKE ?2 OR phone LIKE ?2)
            ORDER BY total_spent_cents DESC
            LIMIT ?3
            "#,
        )
        .bind(operator_id)
        .bind(pattern)
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;

        Ok(customers)
    }

    /// Folds one completed stay into the customer's aggregates: bumps the
    /// stay count and lifetime spend, stamps the last stay date, and flips
    /// the frequent-guest flag once the count reaches the threshold.
    ///
    /// Runs inside the checkout transaction. Returns `false` if the
    /// customer row is missing (checkout must then abort).
    pub async fn record_stay(
        conn: &mut SqliteConnection,
        operator_id: &str,
        customer_id: &str,
        spent_cents: i64,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        debug!(customer_id = %customer_id, spent_cents, "Recording completed stay");

        let result = sqlx::query(
            r#"
            UPDATE customers SET
                total_stays = total_stays + 1,
                total_spent_cents = total_spent_cents + ?1,
                last_stay_date = ?2,
                is_frequent = CASE WHEN total_stays + 1 >= ?3 THEN 1 ELSE 0 END
            WHERE id = ?4 AND operator_id = ?5
            "#,
        )
        .bind(spent_cents)
        .bind(now)
        .bind(FREQUENT_GUEST_STAYS)
        .bind(customer_id)
        .bind(operator_id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }
}
