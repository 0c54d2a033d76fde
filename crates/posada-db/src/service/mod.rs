//! # Service Module
//!
//! The atomic front-desk operations. Each public method on these services
//! is one logical transaction: it validates preconditions, performs all of
//! its sub-mutations (ledger line inserts, counter updates, room status
//! changes) inside a single database transaction, and emits notification
//! events only after the commit.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Operation Anatomy                                  │
//! │                                                                         │
//! │  validate input (posada_core::validation)                               │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  AuthorizationGate::evaluate(actor, action)                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  BEGIN ── read entities ── check state ── guarded writes ── COMMIT      │
//! │       │                                              │                  │
//! │       │ any error → implicit ROLLBACK                │                  │
//! │       ▼                                              ▼                  │
//! │  typed EngineError                     NotificationPort::deliver(...)   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod ledger;
pub mod reconciler;
pub mod registry;
pub mod stepup;

use thiserror::Error;

use crate::error::DbError;
use posada_core::{CoreError, ValidationError};

/// Failure of a front-desk operation: either a typed domain error or an
/// infrastructure error from the storage layer.
#[derive(Debug, Error)]
pub enum EngineError {
    /// Domain failure (validation, state conflict, invariant violation,
    /// authorization, not found).
    #[error(transparent)]
    Domain(#[from] CoreError),

    /// Storage failure.
    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<ValidationError> for EngineError {
    fn from(err: ValidationError) -> Self {
        EngineError::Domain(CoreError::Validation(err))
    }
}

impl EngineError {
    /// The domain error, if this is one. Convenient for matching in tests
    /// and at the boundary.
    pub fn domain(&self) -> Option<&CoreError> {
        match self {
            EngineError::Domain(err) => Some(err),
            EngineError::Db(_) => None,
        }
    }
}

/// Result type for service operations.
pub type EngineResult<T> = Result<T, EngineError>;
