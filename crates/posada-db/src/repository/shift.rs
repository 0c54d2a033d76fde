//! # Cash Register Shift Repository
//!
//! Database operations for cash drawer sessions.
//!
//! ## One Open Shift Per Cashier
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  The invariant is enforced twice:                                       │
//! │                                                                         │
//! │  1. Service pre-check: find_open() → friendly ShiftAlreadyOpen error    │
//! │  2. Partial unique index:                                               │
//! │       CREATE UNIQUE INDEX ... ON cash_register_shifts (cashier_id)      │
//! │       WHERE status = 'open'                                             │
//! │                                                                         │
//! │  Two concurrent opens both pass the pre-check at most once; the loser   │
//! │  hits the index inside the insert and gets the same domain error. The   │
//! │  exclusivity check and the insert are one atomic unit.                  │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use crate::error::DbResult;
use posada_core::{CashRegisterShift, ShiftStatus};

/// Per-method payment sums over a shift window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct MethodTotals {
    pub cash_cents: i64,
    pub card_cents: i64,
    pub transfer_cents: i64,
    pub check_cents: i64,
    pub other_cents: i64,
    /// Distinct bookings paid in the window.
    pub transactions: i64,
}

impl MethodTotals {
    /// Sum across every method.
    pub fn collected_cents(&self) -> i64 {
        self.cash_cents + self.card_cents + self.transfer_cents + self.check_cents + self.other_cents
    }
}

/// Repository for cash register shift database operations.
#[derive(Debug, Clone)]
pub struct ShiftRepository {
    pool: SqlitePool,
}

impl ShiftRepository {
    /// Creates a new ShiftRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ShiftRepository { pool }
    }

    /// Inserts a newly opened shift. The partial unique index rejects a
    /// second open shift for the same cashier with a unique violation.
    pub async fn insert_open(conn: &mut SqliteConnection, shift: &CashRegisterShift) -> DbResult<()> {
        debug!(id = %shift.id, cashier_id = %shift.cashier_id, "Opening shift");

        sqlx::query(
            r#"
            INSERT INTO cash_register_shifts (
                id, operator_id, cashier_id, opening_time, initial_cash_cents,
                closing_time, expected_cash_cents, actual_cash_cents, variance_cents,
                total_cash_cents, total_card_cents, total_transfer_cents, total_check_cents,
                status, notes, reviewed_by, reviewed_at, created_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5,
                ?6, ?7, ?8, ?9,
                ?10, ?11, ?12, ?13,
                ?14, ?15, ?16, ?17, ?18
            )
            "#,
        )
        .bind(&shift.id)
        .bind(&shift.operator_id)
        .bind(&shift.cashier_id)
        .bind(shift.opening_time)
        .bind(shift.initial_cash_cents)
        .bind(shift.closing_time)
        .bind(shift.expected_cash_cents)
        .bind(shift.actual_cash_cents)
        .bind(shift.variance_cents)
        .bind(shift.total_cash_cents)
        .bind(shift.total_card_cents)
        .bind(shift.total_transfer_cents)
        .bind(shift.total_check_cents)
        .bind(shift.status)
        .bind(&shift.notes)
        .bind(&shift.reviewed_by)
        .bind(shift.reviewed_at)
        .bind(shift.created_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Finds a cashier's open shift, if any.
    pub async fn find_open(
        &self,
        operator_id: &str,
        cashier_id: &str,
    ) -> DbResult<Option<CashRegisterShift>> {
        let mut conn = self.pool.acquire().await?;
        Self::find_open_tx(&mut conn, operator_id, cashier_id).await
    }

    /// Transaction-scoped variant of [`find_open`](Self::find_open).
    pub async fn find_open_tx(
        conn: &mut SqliteConnection,
        operator_id: &str,
        cashier_id: &str,
    ) -> DbResult<Option<CashRegisterShift>> {
        let shift = sqlx::query_as::<_, CashRegisterShift>(
            r#"
            SELECT * FROM cash_register_shifts
            WHERE operator_id = ?1 AND cashier_id = ?2 AND status = 'open'
            "#,
        )
        .bind(operator_id)
        .bind(cashier_id)
        .fetch_optional(conn)
        .await?;

        Ok(shift)
    }

    /// Gets a shift by id within the operator's scope.
    pub async fn get(&self, operator_id: &str, shift_id: &str) -> DbResult<Option<CashRegisterShift>> {
        let mut conn = self.pool.acquire().await?;
        Self::get_tx(&mut conn, operator_id, shift_id).await
    }

    /// Transaction-scoped variant of [`get`](Self::get).
    pub async fn get_tx(
        conn: &mut SqliteConnection,
        operator_id: &str,
        shift_id: &str,
    ) -> DbResult<Option<CashRegisterShift>> {
        let shift = sqlx::query_as::<_, CashRegisterShift>(
            "SELECT * FROM cash_register_shifts WHERE id = ?1 AND operator_id = ?2",
        )
        .bind(shift_id)
        .bind(operator_id)
        .fetch_optional(conn)
        .await?;

        Ok(shift)
    }

    /// Sums a cashier's payments per method over `[from, to)`.
    ///
    /// Payments are attributed to the shift whose window covers their
    /// timestamp; a payment recorded before the drawer opened belongs to
    /// the previous shift and is excluded.
    pub async fn method_totals(
        conn: &mut SqliteConnection,
        operator_id: &str,
        cashier_id: &str,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
    ) -> DbResult<MethodTotals> {
        let totals = sqlx::query_as::<_, MethodTotals>(
            r#"
            SELECT
                COALESCE(SUM(CASE WHEN method = 'cash' THEN amount_cents ELSE 0 END), 0) AS cash_cents,
                COALESCE(SUM(CASE WHEN method = 'card' THEN amount_cents ELSE 0 END), 0) AS card_cents,
                COALESCE(SUM(CASE WHEN method = 'transfer' THEN amount_cents ELSE 0 END), 0) AS transfer_cents,
                COALESCE(SUM(CASE WHEN method = 'check' THEN amount_cents ELSE 0 END), 0) AS check_cents,
                COALESCE(SUM(CASE WHEN method = 'other' THEN amount_cents ELSE 0 END), 0) AS other_cents,
                COUNT(DISTINCT booking_id) AS transactions
            FROM payments
            WHERE operator_id = ?1 AND cashier_id = ?2
              AND created_at >= ?3 AND created_at < ?4
            "#,
        )
        .bind(operator_id)
        .bind(cashier_id)
        .bind(from)
        .bind(to)
        .fetch_one(conn)
        .await?;

        Ok(totals)
    }

    /// Closes an open shift: snapshots totals, expected/actual cash and the
    /// signed variance, and moves it to pending_approval. Guarded on the
    /// shift still being open.
    #[allow(clippy::too_many_arguments)]
    pub async fn close_guarded(
        conn: &mut SqliteConnection,
        operator_id: &str,
        shift_id: &str,
        totals: &MethodTotals,
        expected_cash_cents: i64,
        actual_cash_cents: i64,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE cash_register_shifts SET
                closing_time = ?1,
                expected_cash_cents = ?2,
                actual_cash_cents = ?3,
                variance_cents = ?3 - ?2,
                total_cash_cents = ?4,
                total_card_cents = ?5,
                total_transfer_cents = ?6,
                total_check_cents = ?7,
                status = 'pending_approval',
                notes = ?8
            WHERE id = ?9 AND operator_id = ?10 AND status = 'open'
            "#,
        )
        .bind(now)
        .bind(expected_cash_cents)
        .bind(actual_cash_cents)
        .bind(totals.cash_cents)
        .bind(totals.card_cents)
        .bind(totals.transfer_cents)
        .bind(totals.check_cents)
        .bind(notes)
        .bind(shift_id)
        .bind(operator_id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Records the operator's review verdict. Guarded on the shift awaiting
    /// approval; review is terminal, a second attempt affects zero rows.
    pub async fn review_guarded(
        conn: &mut SqliteConnection,
        operator_id: &str,
        shift_id: &str,
        verdict: ShiftStatus,
        reviewed_by: &str,
        notes: Option<&str>,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE cash_register_shifts SET
                status = ?1,
                reviewed_by = ?2,
                reviewed_at = ?3,
                notes = CASE
                    WHEN ?4 IS NULL THEN notes
                    ELSE COALESCE(notes || char(10), '') || 'review: ' || ?4
                END
            WHERE id = ?5 AND operator_id = ?6 AND status = 'pending_approval'
            "#,
        )
        .bind(verdict)
        .bind(reviewed_by)
        .bind(now)
        .bind(notes)
        .bind(shift_id)
        .bind(operator_id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Lists shifts for the operator's audit view, newest first.
    pub async fn list(
        &self,
        operator_id: &str,
        status: Option<ShiftStatus>,
        cashier_id: Option<&str>,
    ) -> DbResult<Vec<CashRegisterShift>> {
        let shifts = sqlx::query_as::<_, CashRegisterShift>(
            r#"
            SELECT * FROM cash_register_shifts
            WHERE operator_id = ?1
              AND (?2 IS NULL OR status = ?2)
              AND (?3 IS NULL OR cashier_id = ?3)
            ORDER BY opening_time DESC
            "#,
        )
        .bind(operator_id)
        .bind(status)
        .bind(cashier_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(shifts)
    }
}
