//! # Validation Module
//!
//! Input validation for front-desk operations.
//!
//! ## Validation Strategy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Validation Layers                                  │
//! │                                                                         │
//! │  Layer 1: THIS MODULE - field-level checks, before any I/O             │
//! │           (amounts positive, quantities sane, ids well-formed)          │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: Service preconditions - entity state checks inside the       │
//! │           transaction (room available, booking active, balance)         │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: Database - UNIQUE / FK / partial-index constraints as the    │
//! │           last line against concurrent writers                          │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use crate::error::ValidationError;

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

/// Maximum quantity of a single item in one charge line.
pub const MAX_ITEM_QUANTITY: i64 = 999;

/// Maximum items in a single add-charges call.
pub const MAX_CHARGE_ITEMS: usize = 100;

// =============================================================================
// String Validators
// =============================================================================

/// Validates a room number.
///
/// ## Rules
/// - Must not be empty
/// - At most 20 characters
/// - Alphanumeric plus hyphens
pub fn validate_room_number(number: &str) -> ValidationResult<()> {
    let number = number.trim();

    if number.is_empty() {
        return Err(ValidationError::Required {
            field: "room_number",
        });
    }

    if number.len() > 20 {
        return Err(ValidationError::TooLong {
            field: "room_number",
            max: 20,
        });
    }

    if !number.chars().all(|c| c.is_alphanumeric() || c == '-') {
        return Err(ValidationError::InvalidFormat {
            field: "room_number",
            reason: "must contain only letters, numbers and hyphens",
        });
    }

    Ok(())
}

/// Validates a person's full name.
pub fn validate_full_name(name: &str) -> ValidationResult<()> {
    let name = name.trim();

    if name.is_empty() {
        return Err(ValidationError::Required { field: "full_name" });
    }

    if name.len() > 200 {
        return Err(ValidationError::TooLong {
            field: "full_name",
            max: 200,
        });
    }

    Ok(())
}

/// Validates a free-text reason (discounts, refunds).
///
/// A reason is mandatory on every discount and refund line; "no reason"
/// lines are exactly what the audit trail exists to prevent.
pub fn validate_reason(reason: &str) -> ValidationResult<()> {
    if reason.trim().is_empty() {
        return Err(ValidationError::Required { field: "reason" });
    }

    if reason.len() > 500 {
        return Err(ValidationError::TooLong {
            field: "reason",
            max: 500,
        });
    }

    Ok(())
}

/// Validates a UUID string format.
pub fn validate_uuid(field: &'static str, id: &str) -> ValidationResult<()> {
    if id.trim().is_empty() {
        return Err(ValidationError::Required { field });
    }

    uuid::Uuid::parse_str(id).map_err(|_| ValidationError::InvalidFormat {
        field,
        reason: "must be a valid UUID",
    })?;

    Ok(())
}

// =============================================================================
// Numeric Validators
// =============================================================================

/// Validates a payment or refund amount in cents.
///
/// ## Rules
/// - Must be strictly positive; zero-amount ledger lines are noise
pub fn validate_amount_cents(field: &'static str, cents: i64) -> ValidationResult<()> {
    if cents <= 0 {
        return Err(ValidationError::MustBePositive { field });
    }

    Ok(())
}

/// Validates a non-negative money value (prices, opening cash).
///
/// Zero is allowed: a drawer can open empty and a product can be free.
pub fn validate_non_negative_cents(field: &'static str, cents: i64) -> ValidationResult<()> {
    if cents < 0 {
        return Err(ValidationError::MustNotBeNegative { field });
    }

    Ok(())
}

/// Validates a charge line quantity.
pub fn validate_quantity(qty: i64) -> ValidationResult<()> {
    if qty <= 0 {
        return Err(ValidationError::MustBePositive { field: "quantity" });
    }

    if qty > MAX_ITEM_QUANTITY {
        return Err(ValidationError::OutOfRange {
            field: "quantity",
            min: 1,
            max: MAX_ITEM_QUANTITY,
        });
    }

    Ok(())
}

/// Validates a rate in basis points (0% to 100%).
pub fn validate_rate_bps(field: &'static str, bps: u32) -> ValidationResult<()> {
    if bps > 10_000 {
        return Err(ValidationError::OutOfRange {
            field,
            min: 0,
            max: 10_000,
        });
    }

    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_room_number() {
        assert!(validate_room_number("101").is_ok());
        assert!(validate_room_number("R101-A").is_ok());

        assert!(validate_room_number("").is_err());
        assert!(validate_room_number("   ").is_err());
        assert!(validate_room_number("has space").is_err());
        assert!(validate_room_number(&"9".repeat(21)).is_err());
    }

    #[test]
    fn test_validate_full_name() {
        assert!(validate_full_name("María Fernández").is_ok());
        assert!(validate_full_name("").is_err());
        assert!(validate_full_name(&"A".repeat(300)).is_err());
    }

    #[test]
    fn test_validate_reason() {
        assert!(validate_reason("guest complaint").is_ok());
        assert!(validate_reason("  ").is_err());
    }

    #[test]
    fn test_validate_amount_cents() {
        assert!(validate_amount_cents("amount", 1).is_ok());
        assert!(validate_amount_cents("amount", 0).is_err());
        assert!(validate_amount_cents("amount", -100).is_err());
    }

    #[test]
    fn test_validate_non_negative_cents() {
        assert!(validate_non_negative_cents("initial_cash", 0).is_ok());
        assert!(validate_non_negative_cents("initial_cash", 5_000).is_ok());
        assert!(validate_non_negative_cents("initial_cash", -1).is_err());
    }

    #[test]
    fn test_validate_quantity() {
        assert!(validate_quantity(1).is_ok());
        assert!(validate_quantity(999).is_ok());
        assert!(validate_quantity(0).is_err());
        assert!(validate_quantity(1000).is_err());
    }

    #[test]
    fn test_validate_rate_bps() {
        assert!(validate_rate_bps("tax_rate", 0).is_ok());
        assert!(validate_rate_bps("tax_rate", 1300).is_ok());
        assert!(validate_rate_bps("tax_rate", 10_000).is_ok());
        assert!(validate_rate_bps("tax_rate", 10_001).is_err());
    }

    #[test]
    fn test_validate_uuid() {
        assert!(validate_uuid("room_id", "550e8400-e29b-41d4-a716-446655440000").is_ok());
        assert!(validate_uuid("room_id", "").is_err());
        assert!(validate_uuid("room_id", "not-a-uuid").is_err());
    }
}
