//! # Authorization Gate
//!
//! Pure evaluation of whether an actor may perform a privileged ledger
//! operation.
//!
//! ## Two-Tier Model
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Tier 1: CAPABILITIES (what a role can generally do)                    │
//! │    Typed flags resolved at the boundary and passed in explicitly:       │
//! │    can_create_bookings, can_apply_discounts + max_discount_bps,         │
//! │    can_process_refunds, ...                                             │
//! │                                                                         │
//! │  Tier 2: STEP-UP (this specific high-value action)                      │
//! │    A discount above 10% of the booking total, or ANY refund, also       │
//! │    needs an operator to re-authenticate by credential. The credential   │
//! │    check lives in the persistence layer; it mints a short-lived         │
//! │    StepUpToken that the ledger operation takes as a parameter.          │
//! │                                                                         │
//! │  evaluate() runs BOTH tiers every time. The cashier cap check and the   │
//! │  step-up requirement are independent: neither can mask the other.       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};
use crate::money::Money;
use crate::types::RateBps;

/// Discount size, relative to the booking total, above which step-up
/// authorization is required. 1000 bps = 10%.
pub const DISCOUNT_STEP_UP_THRESHOLD: RateBps = RateBps::from_bps(1000);

/// How long a step-up token stays valid. Long enough to finish the one
/// operation it was minted for, nothing more.
pub const STEP_UP_TOKEN_TTL_SECS: i64 = 300;

// =============================================================================
// Actors and capabilities
// =============================================================================

/// The role of the authenticated principal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorRole {
    /// Property owner; holds every capability implicitly.
    Operator,
    /// Front-desk cashier; holds exactly the capabilities granted.
    Cashier,
}

/// A cashier's capability set, configured by the operator.
///
/// Modeled as named typed fields rather than a string→bool map so a typo'd
/// capability name is a compile error, not a silent deny.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub can_create_bookings: bool,
    pub can_modify_bookings: bool,
    pub can_cancel_bookings: bool,
    pub can_apply_discounts: bool,

    /// Largest percentage discount this cashier may apply, in basis points.
    pub max_discount_bps: u32,

    pub can_process_refunds: bool,
    pub can_view_reports: bool,
    pub can_manage_inventory: bool,
}

impl Capabilities {
    /// No capabilities at all - the default for a newly created cashier.
    pub const fn none() -> Self {
        Capabilities {
            can_create_bookings: false,
            can_modify_bookings: false,
            can_cancel_bookings: false,
            can_apply_discounts: false,
            max_discount_bps: 0,
            can_process_refunds: false,
            can_view_reports: false,
            can_manage_inventory: false,
        }
    }

    /// Everything granted; what an operator implicitly holds.
    pub const fn all() -> Self {
        Capabilities {
            can_create_bookings: true,
            can_modify_bookings: true,
            can_cancel_bookings: true,
            can_apply_discounts: true,
            max_discount_bps: 10_000,
            can_process_refunds: true,
            can_view_reports: true,
            can_manage_inventory: true,
        }
    }
}

impl Default for Capabilities {
    fn default() -> Self {
        Capabilities::none()
    }
}

/// The authenticated principal behind an operation request.
///
/// `operator_id` is the tenant scope, fixed at authentication time (a
/// cashier's tenant is their configured operator, never caller-supplied).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: String,
    pub operator_id: String,
    pub role: ActorRole,
    pub capabilities: Capabilities,
}

impl Actor {
    /// An operator acting on their own property.
    pub fn operator(id: impl Into<String>, operator_id: impl Into<String>) -> Self {
        Actor {
            id: id.into(),
            operator_id: operator_id.into(),
            role: ActorRole::Operator,
            capabilities: Capabilities::all(),
        }
    }

    /// A cashier with an explicit capability set.
    pub fn cashier(
        id: impl Into<String>,
        operator_id: impl Into<String>,
        capabilities: Capabilities,
    ) -> Self {
        Actor {
            id: id.into(),
            operator_id: operator_id.into(),
            role: ActorRole::Cashier,
            capabilities,
        }
    }

    fn has(&self, flag: bool) -> bool {
        self.role == ActorRole::Operator || flag
    }
}

// =============================================================================
// Actions and decisions
// =============================================================================

/// A privileged operation being requested against the ledger.
#[derive(Debug, Clone)]
pub enum LedgerAction {
    CreateBooking,
    ModifyBooking,
    CancelBooking,

    /// Discount with its computed amount; `percent_bps` is Some for
    /// percentage discounts (checked against the cashier's cap).
    ApplyDiscount {
        percent_bps: Option<u32>,
        amount: Money,
        booking_total: Money,
    },

    ProcessRefund,
    ViewReports,
    ManageInventory,
}

/// What the gate demands beyond the capability check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    /// Capability alone suffices.
    None,
    /// The operation must also present a valid [`StepUpToken`].
    StepUp,
}

/// Pure allow/deny evaluator. Stateless; all inputs arrive as parameters.
pub struct AuthorizationGate;

impl AuthorizationGate {
    /// Evaluates an action against an actor's capabilities.
    ///
    /// Returns the step-up requirement on allow, or the denial error. Both
    /// the cashier percentage cap and the step-up threshold are always
    /// checked for discounts; the outcome does not depend on which is
    /// examined first (an over-cap discount is rejected with
    /// `ExceedsDiscountLimit` whether or not a token is also needed, and a
    /// within-cap large discount still demands step-up).
    pub fn evaluate(actor: &Actor, action: &LedgerAction) -> CoreResult<Requirement> {
        match action {
            LedgerAction::CreateBooking => {
                Self::require(actor, actor.capabilities.can_create_bookings, "create_bookings")?;
                Ok(Requirement::None)
            }
            LedgerAction::ModifyBooking => {
                Self::require(actor, actor.capabilities.can_modify_bookings, "modify_bookings")?;
                Ok(Requirement::None)
            }
            LedgerAction::CancelBooking => {
                Self::require(actor, actor.capabilities.can_cancel_bookings, "cancel_bookings")?;
                Ok(Requirement::None)
            }
            LedgerAction::ApplyDiscount {
                percent_bps,
                amount,
                booking_total,
            } => {
                Self::require(actor, actor.capabilities.can_apply_discounts, "apply_discounts")?;

                // Cap check: cashier's configured maximum percentage.
                // Operators are capped at 100% via Capabilities::all().
                if let Some(bps) = percent_bps {
                    let max = match actor.role {
                        ActorRole::Operator => 10_000,
                        ActorRole::Cashier => actor.capabilities.max_discount_bps,
                    };
                    if *bps > max {
                        return Err(CoreError::ExceedsDiscountLimit {
                            requested_bps: *bps,
                            max_bps: max,
                        });
                    }
                }

                // Step-up check: amount above 10% of the booking total.
                // Applies to every role; the point is a second credential
                // for this specific action, not a role privilege.
                if *amount > booking_total.apply_rate(DISCOUNT_STEP_UP_THRESHOLD) {
                    Ok(Requirement::StepUp)
                } else {
                    Ok(Requirement::None)
                }
            }
            LedgerAction::ProcessRefund => {
                Self::require(actor, actor.capabilities.can_process_refunds, "process_refunds")?;
                // Refunds are higher-risk than discounts: always step-up,
                // regardless of size.
                Ok(Requirement::StepUp)
            }
            LedgerAction::ViewReports => {
                Self::require(actor, actor.capabilities.can_view_reports, "view_reports")?;
                Ok(Requirement::None)
            }
            LedgerAction::ManageInventory => {
                Self::require(actor, actor.capabilities.can_manage_inventory, "manage_inventory")?;
                Ok(Requirement::None)
            }
        }
    }

    fn require(actor: &Actor, flag: bool, capability: &'static str) -> CoreResult<()> {
        if actor.has(flag) {
            Ok(())
        } else {
            Err(CoreError::MissingCapability { capability })
        }
    }
}

// =============================================================================
// Step-up tokens
// =============================================================================

/// Proof of a recent operator credential check, scoped to one tenant and a
/// short time window.
///
/// Minted by the step-up service after verifying the operator's password
/// hash; consumed as an explicit parameter by discount/refund operations.
/// Keeping the credential check out of ledger code means ledger logic never
/// sees a password.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StepUpToken {
    /// Operator who re-authenticated.
    pub authorized_by: String,

    /// Tenant the token is valid for.
    pub operator_id: String,

    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl StepUpToken {
    /// Mints a token valid for [`STEP_UP_TOKEN_TTL_SECS`] from `now`.
    pub fn mint(
        authorized_by: impl Into<String>,
        operator_id: impl Into<String>,
        now: DateTime<Utc>,
    ) -> Self {
        StepUpToken {
            authorized_by: authorized_by.into(),
            operator_id: operator_id.into(),
            issued_at: now,
            expires_at: now + Duration::seconds(STEP_UP_TOKEN_TTL_SECS),
        }
    }

    /// Checks the token covers this tenant at this instant.
    pub fn validate(&self, operator_id: &str, now: DateTime<Utc>) -> CoreResult<()> {
        if self.operator_id != operator_id || now >= self.expires_at {
            return Err(CoreError::StepUpInvalid);
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn cashier_with(caps: Capabilities) -> Actor {
        Actor::cashier("cash-1", "op-1", caps)
    }

    fn discount(percent_bps: Option<u32>, amount: i64, total: i64) -> LedgerAction {
        LedgerAction::ApplyDiscount {
            percent_bps,
            amount: Money::from_cents(amount),
            booking_total: Money::from_cents(total),
        }
    }

    #[test]
    fn test_missing_capability_denied() {
        let actor = cashier_with(Capabilities::none());
        let err = AuthorizationGate::evaluate(&actor, &LedgerAction::CreateBooking).unwrap_err();
        assert!(matches!(err, CoreError::MissingCapability { capability } if capability == "create_bookings"));
    }

    #[test]
    fn test_operator_bypasses_capability_flags() {
        let actor = Actor::operator("op-1", "op-1");
        assert_eq!(
            AuthorizationGate::evaluate(&actor, &LedgerAction::CreateBooking).unwrap(),
            Requirement::None
        );
    }

    #[test]
    fn test_discount_within_cap_and_threshold() {
        let actor = cashier_with(Capabilities {
            can_apply_discounts: true,
            max_discount_bps: 1000,
            ..Capabilities::none()
        });

        // 5% of Bs 100.00 = Bs 5.00: within cap, below threshold.
        let req =
            AuthorizationGate::evaluate(&actor, &discount(Some(500), 500, 10_000)).unwrap();
        assert_eq!(req, Requirement::None);
    }

    #[test]
    fn test_discount_over_cashier_cap() {
        let actor = cashier_with(Capabilities {
            can_apply_discounts: true,
            max_discount_bps: 1000, // 10%
            ..Capabilities::none()
        });

        // 25% requested, cap is 10%.
        let err =
            AuthorizationGate::evaluate(&actor, &discount(Some(2500), 2_500, 10_000)).unwrap_err();
        assert!(matches!(
            err,
            CoreError::ExceedsDiscountLimit {
                requested_bps: 2500,
                max_bps: 1000
            }
        ));
    }

    #[test]
    fn test_large_discount_requires_step_up() {
        let actor = cashier_with(Capabilities {
            can_apply_discounts: true,
            max_discount_bps: 5000,
            ..Capabilities::none()
        });

        // 20% is within this cashier's 50% cap but above the 10% threshold.
        let req =
            AuthorizationGate::evaluate(&actor, &discount(Some(2000), 2_000, 10_000)).unwrap();
        assert_eq!(req, Requirement::StepUp);
    }

    #[test]
    fn test_fixed_discount_over_threshold_requires_step_up() {
        let actor = cashier_with(Capabilities {
            can_apply_discounts: true,
            max_discount_bps: 0,
            ..Capabilities::none()
        });

        // Fixed Bs 15.00 on a Bs 100.00 booking: no percentage cap applies,
        // but the amount is above 10% of the total.
        let req = AuthorizationGate::evaluate(&actor, &discount(None, 1_500, 10_000)).unwrap();
        assert_eq!(req, Requirement::StepUp);
    }

    #[test]
    fn test_cap_check_fires_even_when_step_up_also_needed() {
        // Both violations present: the cap error must surface no matter
        // what; a supervisor token cannot rescue an over-cap discount.
        let actor = cashier_with(Capabilities {
            can_apply_discounts: true,
            max_discount_bps: 1000,
            ..Capabilities::none()
        });

        let err =
            AuthorizationGate::evaluate(&actor, &discount(Some(5000), 5_000, 10_000)).unwrap_err();
        assert!(matches!(err, CoreError::ExceedsDiscountLimit { .. }));
    }

    #[test]
    fn test_operator_large_discount_still_steps_up() {
        let actor = Actor::operator("op-1", "op-1");
        let req =
            AuthorizationGate::evaluate(&actor, &discount(Some(5000), 5_000, 10_000)).unwrap();
        assert_eq!(req, Requirement::StepUp);
    }

    #[test]
    fn test_refund_always_requires_step_up() {
        let actor = cashier_with(Capabilities {
            can_process_refunds: true,
            ..Capabilities::none()
        });

        assert_eq!(
            AuthorizationGate::evaluate(&actor, &LedgerAction::ProcessRefund).unwrap(),
            Requirement::StepUp
        );

        // Even for a tiny refund by the operator themselves.
        let operator = Actor::operator("op-1", "op-1");
        assert_eq!(
            AuthorizationGate::evaluate(&operator, &LedgerAction::ProcessRefund).unwrap(),
            Requirement::StepUp
        );
    }

    #[test]
    fn test_token_validation() {
        let now = Utc::now();
        let token = StepUpToken::mint("op-1", "op-1", now);

        assert!(token.validate("op-1", now).is_ok());
        assert!(token
            .validate("op-1", now + Duration::seconds(STEP_UP_TOKEN_TTL_SECS - 1))
            .is_ok());

        // Expired.
        assert!(matches!(
            token
                .validate("op-1", now + Duration::seconds(STEP_UP_TOKEN_TTL_SECS))
                .unwrap_err(),
            CoreError::StepUpInvalid
        ));

        // Wrong tenant.
        assert!(token.validate("op-2", now).is_err());
    }
}
