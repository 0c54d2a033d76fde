//! # Error Types
//!
//! Domain-specific error types for posada-core.
//!
//! ## Error Taxonomy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Categories                                │
//! │                                                                         │
//! │  Validation          - malformed/out-of-range input, rejected before   │
//! │                        any mutation is attempted                       │
//! │  StateConflict       - precondition on current entity state violated   │
//! │                        (RoomNotAvailable, BookingNotActive, ...)        │
//! │  InvariantViolation  - would break the balance/occupancy invariants    │
//! │                        (OverpaymentRejected, BalanceNotSettled, ...)    │
//! │  Authorization       - capability missing or step-up credential        │
//! │                        invalid/absent                                  │
//! │  NotFound            - entity absent or not owned by caller's tenant   │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → EngineError (posada-db) → caller  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Design Principles
//! 1. Use `thiserror` for derive macros (not manual impl)
//! 2. Include enough context to display a corrective message
//!    (e.g. the exact pending balance on `BalanceNotSettled`)
//! 3. Errors are enum variants, never String
//! 4. Since every operation is one atomic unit, an error means the system
//!    state is as if the operation never ran

use thiserror::Error;

use crate::money::Money;

// =============================================================================
// Core Error
// =============================================================================

/// Domain errors for front-desk and ledger operations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// Input validation failed (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    // -------------------------------------------------------------------------
    // State conflicts
    // -------------------------------------------------------------------------
    /// Room exists but is not available for a new stay.
    ///
    /// Also returned when two cashiers race for the same room: exactly one
    /// check-in wins, the other observes this error.
    #[error("Room {room_id} is not available")]
    RoomNotAvailable { room_id: String },

    /// Room cannot enter maintenance while a guest holds it.
    #[error("Room {room_id} is {status}, cannot toggle maintenance")]
    RoomBusy { room_id: String, status: String },

    /// Requested room transition is not an edge of the state machine.
    #[error("Room {room_id} is {status}, cannot {attempted}")]
    InvalidTransition {
        room_id: String,
        status: String,
        attempted: &'static str,
    },

    /// Booking is terminal (or still reserved where check-in is required);
    /// no ledger mutation is permitted.
    #[error("Booking {booking_id} is {status}, operation not allowed")]
    BookingNotActive { booking_id: String, status: String },

    /// Cashier already has an open drawer.
    #[error("Cashier {cashier_id} already has an open shift")]
    ShiftAlreadyOpen { cashier_id: String },

    /// No open drawer to summarize or close.
    #[error("Cashier {cashier_id} has no open shift")]
    ShiftNotOpen { cashier_id: String },

    /// Shift review is terminal; approve/reject only applies once.
    #[error("Shift {shift_id} is {status}, cannot review")]
    ShiftNotPending { shift_id: String, status: String },

    // -------------------------------------------------------------------------
    // Invariant violations
    // -------------------------------------------------------------------------
    /// Payment would push amount_paid above total_amount.
    #[error("Payment of {amount} exceeds pending balance of {balance}")]
    OverpaymentRejected { amount: Money, balance: Money },

    /// Discount would drop total_amount below amount_paid, inverting the
    /// balance sign.
    #[error("Discount of {discount} would leave total {new_total} below amount paid {paid}")]
    ResultingNegativeBalance {
        discount: Money,
        new_total: Money,
        paid: Money,
    },

    /// Refund larger than what was actually paid.
    #[error("Refund of {amount} exceeds amount paid {paid}")]
    RefundExceedsPaid { amount: Money, paid: Money },

    /// Checkout attempted with money still owed.
    #[error("Pending balance of {pending} must be settled before checkout")]
    BalanceNotSettled { pending: Money },

    // -------------------------------------------------------------------------
    // Authorization
    // -------------------------------------------------------------------------
    /// Actor's capability set does not include this operation.
    #[error("Missing capability: {capability}")]
    MissingCapability { capability: &'static str },

    /// Percentage discount above the cashier's configured cap.
    #[error(
        "Discount of {requested_bps} bps exceeds cashier limit of {max_bps} bps"
    )]
    ExceedsDiscountLimit { requested_bps: u32, max_bps: u32 },

    /// High-risk operation needs operator step-up and no valid token was
    /// supplied.
    #[error("{action} requires operator authorization")]
    AuthorizationRequired { action: &'static str },

    /// Step-up credential did not verify.
    #[error("Operator credential rejected")]
    StepUpRejected,

    /// Step-up token is past its expiry or scoped to another tenant.
    #[error("Step-up authorization expired or not valid here")]
    StepUpInvalid,

    // -------------------------------------------------------------------------
    // Not found
    // -------------------------------------------------------------------------
    /// Entity absent, or owned by a different operator. The two cases are
    /// indistinguishable on purpose: tenancy must not leak through errors.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },
}

impl CoreError {
    /// Creates a NotFound error for a given entity type and id.
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        CoreError::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// The taxonomy category this error belongs to.
    pub const fn category(&self) -> ErrorCategory {
        match self {
            CoreError::Validation(_) => ErrorCategory::Validation,
            CoreError::RoomNotAvailable { .. }
            | CoreError::RoomBusy { .. }
            | CoreError::InvalidTransition { .. }
            | CoreError::BookingNotActive { .. }
            | CoreError::ShiftAlreadyOpen { .. }
            | CoreError::ShiftNotOpen { .. }
            | CoreError::ShiftNotPending { .. } => ErrorCategory::StateConflict,
            CoreError::OverpaymentRejected { .. }
            | CoreError::ResultingNegativeBalance { .. }
            | CoreError::RefundExceedsPaid { .. }
            | CoreError::BalanceNotSettled { .. } => ErrorCategory::InvariantViolation,
            CoreError::MissingCapability { .. }
            | CoreError::ExceedsDiscountLimit { .. }
            | CoreError::AuthorizationRequired { .. }
            | CoreError::StepUpRejected
            | CoreError::StepUpInvalid => ErrorCategory::Authorization,
            CoreError::NotFound { .. } => ErrorCategory::NotFound,
        }
    }
}

/// The five failure categories every operation can surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    Validation,
    StateConflict,
    InvariantViolation,
    Authorization,
    NotFound,
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// These occur before business logic runs; nothing has been mutated when one
/// is returned.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: &'static str },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: &'static str, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange {
        field: &'static str,
        min: i64,
        max: i64,
    },

    /// Value must be strictly positive.
    #[error("{field} must be positive")]
    MustBePositive { field: &'static str },

    /// Value must not be negative.
    #[error("{field} must not be negative")]
    MustNotBeNegative { field: &'static str },

    /// Invalid format (e.g. invalid UUID).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat {
        field: &'static str,
        reason: &'static str,
    },

    /// The room does not offer the requested short-stay tariff.
    #[error("Room {room_number} has no {tier} tariff configured")]
    TariffNotConfigured {
        room_number: String,
        tier: &'static str,
    },

    /// A collection that must have members is empty.
    #[error("{field} must contain at least one item")]
    Empty { field: &'static str },
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages() {
        let err = CoreError::OverpaymentRejected {
            amount: Money::from_cents(15_000),
            balance: Money::from_cents(10_000),
        };
        assert_eq!(
            err.to_string(),
            "Payment of Bs 150.00 exceeds pending balance of Bs 100.00"
        );

        let err = CoreError::BalanceNotSettled {
            pending: Money::from_cents(2_200),
        };
        assert_eq!(
            err.to_string(),
            "Pending balance of Bs 22.00 must be settled before checkout"
        );
    }

    #[test]
    fn test_categories() {
        assert_eq!(
            CoreError::RoomNotAvailable { room_id: "r".into() }.category(),
            ErrorCategory::StateConflict
        );
        assert_eq!(
            CoreError::RefundExceedsPaid {
                amount: Money::from_cents(1),
                paid: Money::zero(),
            }
            .category(),
            ErrorCategory::InvariantViolation
        );
        assert_eq!(
            CoreError::StepUpRejected.category(),
            ErrorCategory::Authorization
        );
        assert_eq!(
            CoreError::not_found("Booking", "b1").category(),
            ErrorCategory::NotFound
        );
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let validation_err = ValidationError::Required { field: "room_id" };
        let core_err: CoreError = validation_err.into();
        assert!(matches!(core_err, CoreError::Validation(_)));
        assert_eq!(core_err.category(), ErrorCategory::Validation);
    }
}
