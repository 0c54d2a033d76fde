//! # Step-Up Authorization
//!
//! Re-verifies an operator's credential and mints a short-lived
//! [`StepUpToken`] for one high-risk ledger operation (a large discount or
//! any refund).
//!
//! Keeping the credential check here, separate from the ledger, means:
//! - ledger operations take a token parameter, never a raw password
//! - the argon2 verification happens in exactly one place
//! - a token expires on its own; there is nothing to revoke

use sqlx::SqlitePool;
use tracing::{info, warn};

use posada_core::{CoreError, StepUpToken};

use crate::error::{DbError, DbResult};
use crate::repository::operator::OperatorRepository;
use crate::service::EngineResult;

/// Verifies operator credentials for step-up authorization.
#[derive(Debug, Clone)]
pub struct StepUpAuthorizer {
    pool: SqlitePool,
}

impl StepUpAuthorizer {
    /// Creates a new StepUpAuthorizer.
    pub fn new(pool: SqlitePool) -> Self {
        StepUpAuthorizer { pool }
    }

    /// Checks the operator's password and mints a token scoped to their
    /// tenant, valid for a few minutes.
    ///
    /// ## Errors
    /// - `NotFound` if the operator does not exist
    /// - `StepUpRejected` if the password does not verify
    pub async fn authorize(&self, operator_id: &str, password: &str) -> EngineResult<StepUpToken> {
        let operator = OperatorRepository::new(self.pool.clone())
            .get(operator_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Operator", operator_id))?;

        if !verify_password(password, &operator.password_hash) {
            warn!(operator_id = %operator_id, "Step-up credential rejected");
            return Err(CoreError::StepUpRejected.into());
        }

        let token = StepUpToken::mint(&operator.id, &operator.id, chrono::Utc::now());
        info!(
            operator_id = %operator_id,
            expires_at = %token.expires_at,
            "Step-up authorization granted"
        );

        Ok(token)
    }
}

/// Verifies a password against its stored Argon2 PHC hash.
fn verify_password(password: &str, hash: &str) -> bool {
    use argon2::{Argon2, PasswordHash, PasswordVerifier};

    let parsed_hash = match PasswordHash::new(hash) {
        Ok(h) => h,
        Err(_) => return false,
    };

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok()
}

/// Hashes a password for storage. Used by seeding and operator
/// provisioning; verification lives in [`StepUpAuthorizer`].
pub fn hash_password(password: &str) -> DbResult<String> {
    use argon2::{
        password_hash::{rand_core::OsRng, SaltString},
        Argon2, PasswordHasher,
    };

    let salt = SaltString::generate(&mut OsRng);

    let hash = Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| DbError::Internal(format!("Failed to hash password: {}", e)))?;

    Ok(hash.to_string())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{seed_operator, test_db, OPERATOR_PASSWORD};

    #[test]
    fn test_hash_roundtrip() {
        let hash = hash_password("hunter2").unwrap();
        assert!(verify_password("hunter2", &hash));
        assert!(!verify_password("hunter3", &hash));
        assert!(!verify_password("hunter2", "not-a-phc-hash"));
    }

    #[tokio::test]
    async fn test_authorize_with_correct_password() {
        let db = test_db().await;
        let op = seed_operator(&db).await;

        let token = db.step_up().authorize(&op.id, OPERATOR_PASSWORD).await.unwrap();
        assert_eq!(token.operator_id, op.id);
        assert_eq!(token.authorized_by, op.id);
        assert!(token.validate(&op.id, chrono::Utc::now()).is_ok());
    }

    #[tokio::test]
    async fn test_authorize_rejects_wrong_password() {
        let db = test_db().await;
        let op = seed_operator(&db).await;

        let err = db.step_up().authorize(&op.id, "wrong").await.unwrap_err();
        assert!(matches!(err.domain(), Some(CoreError::StepUpRejected)));
    }

    #[tokio::test]
    async fn test_authorize_unknown_operator() {
        let db = test_db().await;

        let err = db.step_up().authorize("missing", "pw").await.unwrap_err();
        assert!(matches!(err.domain(), Some(CoreError::NotFound { .. })));
    }
}
