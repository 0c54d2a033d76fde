//! # Cash Register Reconciler
//!
//! Owns the cash drawer lifecycle: open → (summaries) → close →
//! pending_approval → approved/rejected.
//!
//! ## Reconciliation Math
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Attribution: payments with this cashier_id whose created_at falls in   │
//! │  [opening_time, close_time) belong to this shift.                       │
//! │                                                                         │
//! │  expected_cash   = initial_cash + Σ cash payments in window             │
//! │  total_collected = Σ payments across every method                       │
//! │  variance        = declared actual_cash − expected_cash                 │
//! │                    (negative = short drawer)                            │
//! │                                                                         │
//! │  Closing never auto-approves: every close waits for operator review.    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::info;
use uuid::Uuid;

use posada_core::{Actor, ActorRole, CashRegisterShift, CoreError, Money, ShiftStatus};
use posada_core::validation::validate_non_negative_cents;

use crate::error::DbError;
use crate::repository::shift::{MethodTotals, ShiftRepository};
use crate::service::{EngineError, EngineResult};

/// A live view of an open drawer.
#[derive(Debug, Clone)]
pub struct ShiftSummary {
    pub shift: CashRegisterShift,
    pub totals: MethodTotals,

    /// initial_cash + cash payments so far.
    pub expected_cash_cents: i64,

    /// Every method combined.
    pub total_collected_cents: i64,
}

/// The outcome of closing a drawer.
#[derive(Debug, Clone)]
pub struct ShiftClose {
    pub shift_id: String,
    pub totals: MethodTotals,
    pub expected_cash_cents: i64,
    pub actual_cash_cents: i64,

    /// actual − expected; negative means the drawer came up short.
    pub variance_cents: i64,
}

impl ShiftClose {
    /// The signed variance as Money.
    pub fn variance(&self) -> Money {
        Money::from_cents(self.variance_cents)
    }
}

/// Operator verdict on a closed shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReviewAction {
    Approve,
    Reject,
}

/// Cash drawer operations, scoped to the actor's operator.
#[derive(Debug, Clone)]
pub struct CashRegisterReconciler {
    pool: SqlitePool,
}

impl CashRegisterReconciler {
    /// Creates a new CashRegisterReconciler.
    pub fn new(pool: SqlitePool) -> Self {
        CashRegisterReconciler { pool }
    }

    /// Opens a drawer for the acting cashier.
    ///
    /// The one-open-shift invariant is enforced inside the same atomic unit
    /// as the insert: a concurrent open loses on the partial unique index
    /// and surfaces the same `ShiftAlreadyOpen` as the pre-check.
    pub async fn open(&self, actor: &Actor, initial_cash_cents: i64) -> EngineResult<CashRegisterShift> {
        validate_non_negative_cents("initial_cash", initial_cash_cents)?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        if ShiftRepository::find_open_tx(&mut tx, &actor.operator_id, &actor.id)
            .await?
            .is_some()
        {
            return Err(CoreError::ShiftAlreadyOpen {
                cashier_id: actor.id.clone(),
            }
            .into());
        }

        let shift = CashRegisterShift {
            id: Uuid::new_v4().to_string(),
            operator_id: actor.operator_id.clone(),
            cashier_id: actor.id.clone(),
            opening_time: now,
            initial_cash_cents,
            closing_time: None,
            expected_cash_cents: None,
            actual_cash_cents: None,
            variance_cents: None,
            total_cash_cents: None,
            total_card_cents: None,
            total_transfer_cents: None,
            total_check_cents: None,
            status: ShiftStatus::Open,
            notes: None,
            reviewed_by: None,
            reviewed_at: None,
            created_at: now,
        };

        match ShiftRepository::insert_open(&mut tx, &shift).await {
            Ok(()) => {}
            Err(err) if err.is_unique_violation() => {
                return Err(CoreError::ShiftAlreadyOpen {
                    cashier_id: actor.id.clone(),
                }
                .into());
            }
            Err(err) => return Err(err.into()),
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(
            shift_id = %shift.id,
            cashier_id = %actor.id,
            initial_cash = %Money::from_cents(initial_cash_cents),
            "Shift opened"
        );

        Ok(shift)
    }

    /// Live summary of the acting cashier's open drawer.
    pub async fn current_summary(&self, actor: &Actor) -> EngineResult<ShiftSummary> {
        let mut conn = self.pool.acquire().await.map_err(DbError::from)?;

        let shift = ShiftRepository::find_open_tx(&mut conn, &actor.operator_id, &actor.id)
            .await?
            .ok_or_else(|| CoreError::ShiftNotOpen {
                cashier_id: actor.id.clone(),
            })?;

        let totals = ShiftRepository::method_totals(
            &mut conn,
            &actor.operator_id,
            &actor.id,
            shift.opening_time,
            Utc::now(),
        )
        .await?;

        let expected_cash_cents = shift.initial_cash_cents + totals.cash_cents;
        let total_collected_cents = totals.collected_cents();

        Ok(ShiftSummary {
            shift,
            totals,
            expected_cash_cents,
            total_collected_cents,
        })
    }

    /// Closes the acting cashier's open drawer against a declared cash
    /// count. Snapshots the per-method totals and records the signed
    /// variance; the shift then waits for operator review.
    pub async fn close(
        &self,
        actor: &Actor,
        actual_cash_cents: i64,
        notes: Option<&str>,
    ) -> EngineResult<ShiftClose> {
        validate_non_negative_cents("actual_cash", actual_cash_cents)?;

        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let shift = ShiftRepository::find_open_tx(&mut tx, &actor.operator_id, &actor.id)
            .await?
            .ok_or_else(|| CoreError::ShiftNotOpen {
                cashier_id: actor.id.clone(),
            })?;

        let totals = ShiftRepository::method_totals(
            &mut tx,
            &actor.operator_id,
            &actor.id,
            shift.opening_time,
            now,
        )
        .await?;

        let expected_cash_cents = shift.initial_cash_cents + totals.cash_cents;

        let closed = ShiftRepository::close_guarded(
            &mut tx,
            &actor.operator_id,
            &shift.id,
            &totals,
            expected_cash_cents,
            actual_cash_cents,
            notes,
            now,
        )
        .await?;
        if !closed {
            return Err(CoreError::ShiftNotOpen {
                cashier_id: actor.id.clone(),
            }
            .into());
        }

        tx.commit().await.map_err(DbError::from)?;

        let variance_cents = actual_cash_cents - expected_cash_cents;
        info!(
            shift_id = %shift.id,
            cashier_id = %actor.id,
            expected = %Money::from_cents(expected_cash_cents),
            actual = %Money::from_cents(actual_cash_cents),
            variance = %Money::from_cents(variance_cents),
            "Shift closed, pending approval"
        );

        Ok(ShiftClose {
            shift_id: shift.id,
            totals,
            expected_cash_cents,
            actual_cash_cents,
            variance_cents,
        })
    }

    /// Operator review of a closed shift. Terminal: a reviewed shift cannot
    /// be reviewed again.
    pub async fn review(
        &self,
        actor: &Actor,
        shift_id: &str,
        action: ReviewAction,
        notes: Option<&str>,
    ) -> EngineResult<CashRegisterShift> {
        if actor.role != ActorRole::Operator {
            return Err(CoreError::MissingCapability {
                capability: "review_shifts",
            }
            .into());
        }

        let verdict = match action {
            ReviewAction::Approve => ShiftStatus::Approved,
            ReviewAction::Reject => ShiftStatus::Rejected,
        };

        let now = Utc::now();
        let mut tx = self.pool.begin().await.map_err(DbError::from)?;

        let shift = ShiftRepository::get_tx(&mut tx, &actor.operator_id, shift_id)
            .await?
            .ok_or_else(|| CoreError::not_found("Shift", shift_id))?;

        let reviewed = ShiftRepository::review_guarded(
            &mut tx,
            &actor.operator_id,
            shift_id,
            verdict,
            &actor.id,
            notes,
            now,
        )
        .await?;
        if !reviewed {
            return Err(CoreError::ShiftNotPending {
                shift_id: shift_id.to_string(),
                status: format!("{:?}", shift.status),
            }
            .into());
        }

        tx.commit().await.map_err(DbError::from)?;

        info!(shift_id = %shift_id, ?verdict, "Shift reviewed");

        let repo = ShiftRepository::new(self.pool.clone());
        let updated = repo
            .get(&actor.operator_id, shift_id)
            .await?
            .ok_or_else(|| EngineError::from(CoreError::not_found("Shift", shift_id)))?;

        Ok(updated)
    }

    /// Shift audit listing for the operator.
    pub async fn list(
        &self,
        actor: &Actor,
        status: Option<ShiftStatus>,
        cashier_id: Option<&str>,
    ) -> EngineResult<Vec<CashRegisterShift>> {
        if actor.role != ActorRole::Operator && !actor.capabilities.can_view_reports {
            return Err(CoreError::MissingCapability {
                capability: "view_reports",
            }
            .into());
        }

        Ok(ShiftRepository::new(self.pool.clone())
            .list(&actor.operator_id, status, cashier_id)
            .await?)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
