//! # Booking Repository
//!
//! Database operations for bookings and their ledger lines.
//!
//! ## Counter Discipline
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  A booking's money fields are incrementally maintained counters:        │
//! │                                                                         │
//! │    additional_charges_cents  = Σ charge lines                           │
//! │    discounts_cents           = Σ discount lines                         │
//! │    amount_paid_cents         = Σ payments − Σ refunds                   │
//! │    total_amount_cents        = base×nights + extras + charges − disc.   │
//! │                                                                         │
//! │  Every mutation inserts its ledger line AND bumps the counters in the   │
//! │  same transaction, through a guarded UPDATE that re-asserts the         │
//! │  precondition (active status, balance bound) at execution time.         │
//! │  `fold_ledger` recomputes the sums so tests can detect drift.           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::{SqliteConnection, SqlitePool};
use tracing::debug;

use chrono::{DateTime, Utc};

use crate::error::DbResult;
use posada_core::{Booking, ChargeLine, DiscountLine, PaymentLine, RefundLine};

/// Recomputed sums of a booking's ledger lines (see `fold_ledger`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, sqlx::FromRow)]
pub struct LedgerFold {
    pub charges_cents: i64,
    pub discounts_cents: i64,
    pub payments_cents: i64,
    pub refunds_cents: i64,
}

/// Repository for booking database operations.
#[derive(Debug, Clone)]
pub struct BookingRepository {
    pool: SqlitePool,
}

impl BookingRepository {
    /// Creates a new BookingRepository.
    pub fn new(pool: SqlitePool) -> Self {
        BookingRepository { pool }
    }

    // -------------------------------------------------------------------------
    // Booking header
    // -------------------------------------------------------------------------

    /// Inserts a booking inside the check-in transaction.
    pub async fn insert(conn: &mut SqliteConnection, booking: &Booking) -> DbResult<()> {
        debug!(id = %booking.id, code = %booking.code, "Inserting booking");

        sqlx::query(
            r#"
            INSERT INTO bookings (
                id, code, operator_id, cashier_id, customer_id, room_id,
                check_in, expected_checkout, actual_checkout,
                stay_type, nights, guests,
                base_price_cents, additional_income_cents,
                additional_charges_cents, discounts_cents,
                total_amount_cents, amount_paid_cents,
                status, notes, created_at, updated_at
            ) VALUES (
                ?1, ?2, ?3, ?4, ?5, ?6,
                ?7, ?8, ?9,
                ?10, ?11, ?12,
                ?13, ?14,
                ?15, ?16,
                ?17, ?18,
                ?19, ?20, ?21, ?22
            )
            "#,
        )
        .bind(&booking.id)
        .bind(&booking.code)
        .bind(&booking.operator_id)
        .bind(&booking.cashier_id)
        .bind(&booking.customer_id)
        .bind(&booking.room_id)
        .bind(booking.check_in)
        .bind(booking.expected_checkout)
        .bind(booking.actual_checkout)
        .bind(booking.stay_type)
        .bind(booking.nights)
        .bind(booking.guests)
        .bind(booking.base_price_cents)
        .bind(booking.additional_income_cents)
        .bind(booking.additional_charges_cents)
        .bind(booking.discounts_cents)
        .bind(booking.total_amount_cents)
        .bind(booking.amount_paid_cents)
        .bind(booking.status)
        .bind(&booking.notes)
        .bind(booking.created_at)
        .bind(booking.updated_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Gets a booking by id within the operator's scope.
    pub async fn get(&self, operator_id: &str, booking_id: &str) -> DbResult<Option<Booking>> {
        let booking = sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE id = ?1 AND operator_id = ?2",
        )
        .bind(booking_id)
        .bind(operator_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(booking)
    }

    /// Transaction-scoped variant of [`get`](Self::get).
    pub async fn get_tx(
        conn: &mut SqliteConnection,
        operator_id: &str,
        booking_id: &str,
    ) -> DbResult<Option<Booking>> {
        let booking = sqlx::query_as::<_, Booking>(
            "SELECT * FROM bookings WHERE id = ?1 AND operator_id = ?2",
        )
        .bind(booking_id)
        .bind(operator_id)
        .fetch_optional(conn)
        .await?;

        Ok(booking)
    }

    /// Lists active bookings (reserved or checked in), newest first.
    pub async fn active(&self, operator_id: &str) -> DbResult<Vec<Booking>> {
        let bookings = sqlx::query_as::<_, Booking>(
            r#"
            SELECT * FROM bookings
            WHERE operator_id = ?1 AND status IN ('reserved', 'checked_in')
            ORDER BY check_in DESC
            "#,
        )
        .bind(operator_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(bookings)
    }

    // -------------------------------------------------------------------------
    // Ledger line inserts (append-only)
    // -------------------------------------------------------------------------

    /// Appends a charge line.
    pub async fn insert_charge(conn: &mut SqliteConnection, line: &ChargeLine) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO booking_charges (
                id, booking_id, operator_id, cashier_id, product_id,
                description, quantity, unit_price_cents, tax_cents, total_cents,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&line.id)
        .bind(&line.booking_id)
        .bind(&line.operator_id)
        .bind(&line.cashier_id)
        .bind(&line.product_id)
        .bind(&line.description)
        .bind(line.quantity)
        .bind(line.unit_price_cents)
        .bind(line.tax_cents)
        .bind(line.total_cents)
        .bind(line.created_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Appends a payment line.
    pub async fn insert_payment(conn: &mut SqliteConnection, line: &PaymentLine) -> DbResult<()> {
        debug!(booking_id = %line.booking_id, amount = line.amount_cents, "Recording payment");

        sqlx::query(
            r#"
            INSERT INTO payments (
                id, booking_id, operator_id, cashier_id,
                amount_cents, method, reference, notes, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
        )
        .bind(&line.id)
        .bind(&line.booking_id)
        .bind(&line.operator_id)
        .bind(&line.cashier_id)
        .bind(line.amount_cents)
        .bind(line.method)
        .bind(&line.reference)
        .bind(&line.notes)
        .bind(line.created_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Appends a discount line.
    pub async fn insert_discount(conn: &mut SqliteConnection, line: &DiscountLine) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO discounts (
                id, booking_id, operator_id, cashier_id, authorized_by,
                kind, value, amount_cents, reason, requires_authorization,
                created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
        )
        .bind(&line.id)
        .bind(&line.booking_id)
        .bind(&line.operator_id)
        .bind(&line.cashier_id)
        .bind(&line.authorized_by)
        .bind(line.kind)
        .bind(line.value)
        .bind(line.amount_cents)
        .bind(&line.reason)
        .bind(line.requires_authorization)
        .bind(line.created_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    /// Appends a refund line.
    pub async fn insert_refund(conn: &mut SqliteConnection, line: &RefundLine) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO refunds (
                id, booking_id, operator_id, cashier_id, authorized_by,
                payment_id, amount_cents, reason, notes, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
        )
        .bind(&line.id)
        .bind(&line.booking_id)
        .bind(&line.operator_id)
        .bind(&line.cashier_id)
        .bind(&line.authorized_by)
        .bind(&line.payment_id)
        .bind(line.amount_cents)
        .bind(&line.reason)
        .bind(&line.notes)
        .bind(line.created_at)
        .execute(conn)
        .await?;

        Ok(())
    }

    // -------------------------------------------------------------------------
    // Guarded counter updates
    // -------------------------------------------------------------------------

    /// Adds charge totals to the booking counters. Guarded on the booking
    /// still being active.
    pub async fn add_charges_guarded(
        conn: &mut SqliteConnection,
        operator_id: &str,
        booking_id: &str,
        charge_cents: i64,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE bookings SET
                additional_charges_cents = additional_charges_cents + ?1,
                total_amount_cents = total_amount_cents + ?1,
                updated_at = ?2
            WHERE id = ?3 AND operator_id = ?4
              AND status IN ('reserved', 'checked_in')
            "#,
        )
        .bind(charge_cents)
        .bind(now)
        .bind(booking_id)
        .bind(operator_id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Increments amount_paid. Guarded on the booking being active AND the
    /// payment not exceeding the balance, so the balance invariant holds
    /// even if another payment landed since the booking was read.
    pub async fn apply_payment_guarded(
        conn: &mut SqliteConnection,
        operator_id: &str,
        booking_id: &str,
        amount_cents: i64,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE bookings SET
                amount_paid_cents = amount_paid_cents + ?1,
                updated_at = ?2
            WHERE id = ?3 AND operator_id = ?4
              AND status IN ('reserved', 'checked_in')
              AND total_amount_cents - amount_paid_cents >= ?1
            "#,
        )
        .bind(amount_cents)
        .bind(now)
        .bind(booking_id)
        .bind(operator_id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Applies a discount to the counters. Guarded so the new total never
    /// drops below what was already paid (the balance must not go negative).
    pub async fn apply_discount_guarded(
        conn: &mut SqliteConnection,
        operator_id: &str,
        booking_id: &str,
        amount_cents: i64,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE bookings SET
                discounts_cents = discounts_cents + ?1,
                total_amount_cents = total_amount_cents - ?1,
                updated_at = ?2
            WHERE id = ?3 AND operator_id = ?4
              AND status IN ('reserved', 'checked_in')
              AND total_amount_cents - ?1 >= amount_paid_cents
            "#,
        )
        .bind(amount_cents)
        .bind(now)
        .bind(booking_id)
        .bind(operator_id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Decrements amount_paid for a refund. Guarded on enough having been
    /// paid.
    pub async fn apply_refund_guarded(
        conn: &mut SqliteConnection,
        operator_id: &str,
        booking_id: &str,
        amount_cents: i64,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE bookings SET
                amount_paid_cents = amount_paid_cents - ?1,
                updated_at = ?2
            WHERE id = ?3 AND operator_id = ?4
              AND status IN ('reserved', 'checked_in')
              AND amount_paid_cents >= ?1
            "#,
        )
        .bind(amount_cents)
        .bind(now)
        .bind(booking_id)
        .bind(operator_id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    /// Moves a checked-in, fully settled booking to checked_out and stamps
    /// the actual checkout time. The settled condition is re-asserted here:
    /// checkout never leaves a dangling receivable, even under a race with
    /// a concurrent refund.
    pub async fn checkout_guarded(
        conn: &mut SqliteConnection,
        operator_id: &str,
        booking_id: &str,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE bookings SET
                status = 'checked_out',
                actual_checkout = ?1,
                updated_at = ?1
            WHERE id = ?2 AND operator_id = ?3
              AND status = 'checked_in'
              AND total_amount_cents = amount_paid_cents
            "#,
        )
        .bind(now)
        .bind(booking_id)
        .bind(operator_id)
        .execute(conn)
        .await?;

        Ok(result.rows_affected() == 1)
    }

    // -------------------------------------------------------------------------
    // Ledger line reads
    // -------------------------------------------------------------------------

    /// All charge lines for a booking, oldest first.
    pub async fn charges_for(&self, booking_id: &str) -> DbResult<Vec<ChargeLine>> {
        let lines = sqlx::query_as::<_, ChargeLine>(
            "SELECT * FROM booking_charges WHERE booking_id = ?1 ORDER BY created_at",
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Transaction-scoped variant of [`charges_for`](Self::charges_for),
    /// used to build the checkout summary inside the checkout transaction.
    pub async fn charges_for_tx(
        conn: &mut SqliteConnection,
        booking_id: &str,
    ) -> DbResult<Vec<ChargeLine>> {
        let lines = sqlx::query_as::<_, ChargeLine>(
            "SELECT * FROM booking_charges WHERE booking_id = ?1 ORDER BY created_at",
        )
        .bind(booking_id)
        .fetch_all(conn)
        .await?;

        Ok(lines)
    }

    /// All payment lines for a booking, oldest first.
    pub async fn payments_for(&self, booking_id: &str) -> DbResult<Vec<PaymentLine>> {
        let lines = sqlx::query_as::<_, PaymentLine>(
            "SELECT * FROM payments WHERE booking_id = ?1 ORDER BY created_at",
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// All discount lines for a booking, oldest first.
    pub async fn discounts_for(&self, booking_id: &str) -> DbResult<Vec<DiscountLine>> {
        let lines = sqlx::query_as::<_, DiscountLine>(
            "SELECT * FROM discounts WHERE booking_id = ?1 ORDER BY created_at",
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// All refund lines for a booking, oldest first.
    pub async fn refunds_for(&self, booking_id: &str) -> DbResult<Vec<RefundLine>> {
        let lines = sqlx::query_as::<_, RefundLine>(
            "SELECT * FROM refunds WHERE booking_id = ?1 ORDER BY created_at",
        )
        .bind(booking_id)
        .fetch_all(&self.pool)
        .await?;

        Ok(lines)
    }

    /// Recomputes the sums of all ledger lines for a booking.
    ///
    /// The counters on the booking row are the source of truth at runtime;
    /// this fold exists so tests can assert the counters never drift from
    /// the lines they summarize.
    pub async fn fold_ledger(&self, operator_id: &str, booking_id: &str) -> DbResult<LedgerFold> {
        let fold = sqlx::query_as::<_, LedgerFold>(
            r#"
            SELECT
                COALESCE((SELECT SUM(total_cents) FROM booking_charges
                          WHERE booking_id = ?1 AND operator_id = ?2), 0) AS charges_cents,
                COALESCE((SELECT SUM(amount_cents) FROM discounts
                          WHERE booking_id = ?1 AND operator_id = ?2), 0) AS discounts_cents,
                COALESCE((SELECT SUM(amount_cents) FROM payments
                          WHERE booking_id = ?1 AND operator_id = ?2), 0) AS payments_cents,
                COALESCE((SELECT SUM(amount_cents) FROM refunds
                          WHERE booking_id = ?1 AND operator_id = ?2), 0) AS refunds_cents
            "#,
        )
        .bind(booking_id)
        .bind(operator_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(fold)
    }
}
