//! # Operator Repository
//!
//! Database operations for operator (tenant) accounts. Only what the core
//! needs: the step-up authorizer reads the stored password hash. Account
//! provisioning and login are outside this repository.

use sqlx::SqlitePool;
use tracing::debug;

use crate::error::DbResult;
use posada_core::Operator;

/// Repository for operator database operations.
#[derive(Debug, Clone)]
pub struct OperatorRepository {
    pool: SqlitePool,
}

impl OperatorRepository {
    /// Creates a new OperatorRepository.
    pub fn new(pool: SqlitePool) -> Self {
        OperatorRepository { pool }
    }

    /// Inserts an operator.
    pub async fn create(&self, operator: &Operator) -> DbResult<()> {
        debug!(id = %operator.id, name = %operator.name, "Inserting operator");

        sqlx::query(
            r#"
            INSERT INTO operators (id, name, phone, password_hash, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
        )
        .bind(&operator.id)
        .bind(&operator.name)
        .bind(&operator.phone)
        .bind(&operator.password_hash)
        .bind(operator.created_at)
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Gets an operator by id.
    pub async fn get(&self, operator_id: &str) -> DbResult<Option<Operator>> {
        let operator =
            sqlx::query_as::<_, Operator>("SELECT * FROM operators WHERE id = ?1")
                .bind(operator_id)
                .fetch_optional(&self.pool)
                .await?;

        Ok(operator)
    }
}
