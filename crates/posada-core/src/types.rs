//! # Domain Types
//!
//! Core domain types for the front-desk and point-of-sale ledger.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │      Room       │   │     Booking     │   │  Ledger lines   │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  room_number    │   │  code           │   │  ChargeLine     │       │
//! │  │  base_price     │   │  total_amount   │   │  PaymentLine    │       │
//! │  │  status         │   │  amount_paid    │   │  DiscountLine   │       │
//! │  └─────────────────┘   │  balance()      │   │  RefundLine     │       │
//! │                        └─────────────────┘   └─────────────────┘       │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │    Customer     │   │     Product     │   │CashRegisterShift│       │
//! │  └─────────────────┘   └─────────────────┘   └─────────────────┘       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Tenant Scoping
//! Every persisted entity carries an `operator_id`. The operator (tenant) is
//! resolved once at the boundary from the authenticated actor and threaded
//! explicitly through every operation; it is never re-derived downstream.
//!
//! ## Dual-Key Identity Pattern
//! Entities have an immutable UUID `id` for relations, plus a business
//! identifier where one exists (`room_number`, booking `code`).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::money::Money;

// =============================================================================
// Rates (basis points)
// =============================================================================

/// A percentage rate in basis points (bps).
///
/// 1 basis point = 0.01% = 1/10000. Used for product tax rates, percentage
/// discounts, the per-cashier discount cap and the step-up threshold, so all
/// rate math shares one integer representation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RateBps(u32);

impl RateBps {
    /// Creates a rate from basis points (1350 = 13.5%).
    #[inline]
    pub const fn from_bps(bps: u32) -> Self {
        RateBps(bps)
    }

    /// Creates a rate from whole percent (13 = 13%).
    #[inline]
    pub const fn from_percent(pct: u32) -> Self {
        RateBps(pct * 100)
    }

    /// Returns the rate in basis points.
    #[inline]
    pub const fn bps(&self) -> u32 {
        self.0
    }

    /// Returns the rate as a percentage (for display only).
    #[inline]
    pub fn percent(&self) -> f64 {
        self.0 as f64 / 100.0
    }

    /// Zero rate.
    #[inline]
    pub const fn zero() -> Self {
        RateBps(0)
    }

    /// Checks if the rate is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }
}

impl Default for RateBps {
    fn default() -> Self {
        RateBps::zero()
    }
}

// =============================================================================
// Rooms
// =============================================================================

/// The occupancy status of a room.
///
/// Transitions are constrained to the graph below; anything else is an
/// `InvalidTransition`:
///
/// ```text
///   maintenance ⇄ available ──► occupied ──► available
///                     │                         ▲
///                     └────► reserved ──────────┘ (via occupied)
/// ```
///
/// There is deliberately no occupied→maintenance edge: a room must be
/// released first so an active guest is never lost track of.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum RoomStatus {
    /// Ready for a new guest.
    Available,
    /// A guest is checked in.
    Occupied,
    /// Held for an upcoming stay.
    Reserved,
    /// Out of service.
    Maintenance,
}

impl Default for RoomStatus {
    fn default() -> Self {
        RoomStatus::Available
    }
}

/// A room owned by an operator.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Room {
    /// Unique identifier (UUID v4).
    pub id: String,

    /// Operator (tenant) this room belongs to.
    pub operator_id: String,

    /// Room number - business identifier, unique per operator.
    pub room_number: String,

    /// Room type label (simple, doble, suite, ...).
    pub room_type: String,

    /// Nightly price in cents.
    pub base_price_cents: i64,

    /// 3-hour short-stay tariff; None if the tier is not offered.
    pub short_stay_3h_price_cents: Option<i64>,

    /// 6-hour short-stay tariff; None if the tier is not offered.
    pub short_stay_6h_price_cents: Option<i64>,

    /// Floor number, where the property tracks it.
    pub floor: Option<i64>,

    /// Maximum number of guests.
    pub max_occupancy: i64,

    /// Current occupancy status.
    pub status: RoomStatus,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Room {
    /// Returns the nightly price as Money.
    #[inline]
    pub fn base_price(&self) -> Money {
        Money::from_cents(self.base_price_cents)
    }
}

// =============================================================================
// Stay types
// =============================================================================

/// How a stay is billed: per night, or as a short-stay block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum StayType {
    /// Standard nightly stay; billed base_price × nights.
    Daily,
    /// 3-hour block at the room's 3h tariff. Always one "night".
    ThreeHours,
    /// 6-hour block at the room's 6h tariff. Always one "night".
    SixHours,
}

// =============================================================================
// Bookings
// =============================================================================

/// The lifecycle status of a booking.
///
/// `CheckedOut` and `Cancelled` are terminal: no ledger mutation is permitted
/// once a booking reaches either.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum BookingStatus {
    /// Held for arrival; charges may accrue.
    Reserved,
    /// Guest is in the room.
    CheckedIn,
    /// Stay settled and finished (terminal).
    CheckedOut,
    /// Abandoned before completion (terminal).
    Cancelled,
}

impl BookingStatus {
    /// Whether ledger operations may still mutate a booking in this status.
    #[inline]
    pub const fn is_active(&self) -> bool {
        matches!(self, BookingStatus::Reserved | BookingStatus::CheckedIn)
    }
}

/// A guest stay and its financial ledger header.
///
/// ## The Balance Invariant
/// `balance = total_amount - amount_paid`, and `balance >= 0` at all times.
/// `total_amount`/`amount_paid`/`additional_charges`/`discounts` are
/// incrementally maintained counters; they must always equal the fold of the
/// booking's ledger lines plus the stay price. Tests recompute the fold after
/// every mutation to catch drift.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Booking {
    pub id: String,

    /// Human-facing booking code, generated at creation, unique.
    pub code: String,

    pub operator_id: String,

    /// Cashier who registered the check-in.
    pub cashier_id: String,

    pub customer_id: String,
    pub room_id: String,

    pub check_in: DateTime<Utc>,
    pub expected_checkout: Option<DateTime<Utc>>,

    /// Set when the guest actually checks out.
    pub actual_checkout: Option<DateTime<Utc>>,

    pub stay_type: StayType,
    pub nights: i64,
    pub guests: i64,

    /// Price per night / short-stay block at booking time (frozen).
    pub base_price_cents: i64,

    /// Extras agreed at check-in (parking, extra bed, ...).
    pub additional_income_cents: i64,

    /// Running sum of charge lines.
    pub additional_charges_cents: i64,

    /// Running sum of discount lines.
    pub discounts_cents: i64,

    /// base_price × nights + additional_income + charges − discounts.
    pub total_amount_cents: i64,

    /// Running sum of payment lines minus refund lines.
    pub amount_paid_cents: i64,

    pub status: BookingStatus,
    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Booking {
    /// The outstanding balance: `total_amount − amount_paid`.
    #[inline]
    pub fn balance(&self) -> Money {
        Money::from_cents(self.total_amount_cents - self.amount_paid_cents)
    }

    /// Returns the total amount as Money.
    #[inline]
    pub fn total_amount(&self) -> Money {
        Money::from_cents(self.total_amount_cents)
    }

    /// Returns the amount paid as Money.
    #[inline]
    pub fn amount_paid(&self) -> Money {
        Money::from_cents(self.amount_paid_cents)
    }
}

// =============================================================================
// Ledger lines
// =============================================================================

/// A product or service charged to a booking (minibar, laundry, ...).
///
/// Ledger lines are append-only and immutable once written; corrections are
/// new lines (discounts/refunds), never edits.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct ChargeLine {
    pub id: String,
    pub booking_id: String,
    pub operator_id: String,
    pub cashier_id: String,

    /// Catalog product, if the charge came from one.
    pub product_id: Option<String>,

    /// Description at time of sale (frozen; survives catalog edits).
    pub description: String,

    pub quantity: i64,
    pub unit_price_cents: i64,

    /// Tax portion of this line.
    pub tax_cents: i64,

    /// unit_price × quantity + tax.
    pub total_cents: i64,

    pub created_at: DateTime<Utc>,
}

/// How a guest paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    /// Physical cash - the only method that lands in the drawer.
    Cash,
    Card,
    Transfer,
    Check,
    Other,
}

/// A payment recorded against a booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct PaymentLine {
    pub id: String,
    pub booking_id: String,
    pub operator_id: String,

    /// Cashier who took the payment; shift summaries attribute by this plus
    /// the `created_at` window.
    pub cashier_id: String,

    pub amount_cents: i64,
    pub method: PaymentMethod,

    /// External reference (card voucher, transfer id).
    pub reference: Option<String>,
    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
}

impl PaymentLine {
    /// Returns the payment amount as Money.
    #[inline]
    pub fn amount(&self) -> Money {
        Money::from_cents(self.amount_cents)
    }
}

/// Whether a discount is a percentage of the total or a fixed amount.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum DiscountKind {
    Percentage,
    Fixed,
}

/// A discount applied to a booking.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct DiscountLine {
    pub id: String,
    pub booking_id: String,
    pub operator_id: String,
    pub cashier_id: String,

    /// Operator who authorized via step-up, when one was required.
    pub authorized_by: Option<String>,

    pub kind: DiscountKind,

    /// Basis points for percentage discounts, cents for fixed ones.
    pub value: i64,

    /// The computed amount deducted from the total.
    pub amount_cents: i64,

    pub reason: String,
    pub requires_authorization: bool,

    pub created_at: DateTime<Utc>,
}

/// A refund of previously paid money.
///
/// Refunds always carry an authorizer: they cannot be recorded without
/// step-up authorization, regardless of size.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct RefundLine {
    pub id: String,
    pub booking_id: String,
    pub operator_id: String,
    pub cashier_id: String,

    /// Operator who authorized the refund (never empty).
    pub authorized_by: String,

    /// Original payment being reversed, when known.
    pub payment_id: Option<String>,

    pub amount_cents: i64,
    pub reason: String,
    pub notes: Option<String>,

    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Customers
// =============================================================================

/// A guest on file with the operator.
///
/// The aggregate fields (`total_stays`, `total_spent_cents`, `is_frequent`)
/// are updated inside the checkout transaction, never by ad-hoc writes.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Customer {
    pub id: String,
    pub operator_id: String,
    pub full_name: String,
    pub document_number: Option<String>,
    pub phone: Option<String>,
    pub age: Option<i64>,
    pub nationality: Option<String>,
    pub origin: Option<String>,

    /// Completed stays.
    pub total_stays: i64,

    /// Lifetime spend across completed stays.
    pub total_spent_cents: i64,

    pub last_stay_date: Option<DateTime<Utc>>,

    /// Set once total_stays reaches 3.
    pub is_frequent: bool,

    pub created_at: DateTime<Utc>,
}

/// Completed stays needed before a guest counts as frequent.
pub const FREQUENT_GUEST_STAYS: i64 = 3;

// =============================================================================
// Products
// =============================================================================

/// A catalog item sellable as a booking charge (minibar, restaurant, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Product {
    pub id: String,
    pub operator_id: String,

    /// Category label (minibar, restaurant, laundry, spa, other).
    pub category: String,

    pub name: String,
    pub price_cents: i64,

    /// Tax rate in basis points (1300 = 13%).
    pub tax_rate_bps: u32,

    /// Whether stock is decremented when the product is charged.
    pub track_inventory: bool,
    pub stock_quantity: i64,

    /// Soft-delete flag.
    pub is_active: bool,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Product {
    /// Returns the unit price as Money.
    #[inline]
    pub fn price(&self) -> Money {
        Money::from_cents(self.price_cents)
    }

    /// Returns the tax rate.
    #[inline]
    pub fn tax_rate(&self) -> RateBps {
        RateBps::from_bps(self.tax_rate_bps)
    }
}

// =============================================================================
// Cash register shifts
// =============================================================================

/// The lifecycle status of a cashier's drawer session.
///
/// `Approved` and `Rejected` are terminal; shifts are never deleted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "snake_case"))]
#[serde(rename_all = "snake_case")]
pub enum ShiftStatus {
    /// Drawer is open and taking payments.
    Open,
    /// Closed by the cashier, awaiting operator review.
    PendingApproval,
    /// Operator signed off (terminal).
    Approved,
    /// Operator flagged the count (terminal).
    Rejected,
}

/// A cashier's open-to-close cash drawer session.
///
/// At most one shift per cashier may be `Open` at any time. The per-method
/// totals, expected cash and variance are snapshotted at close; until then
/// they are None and computed on demand.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct CashRegisterShift {
    pub id: String,
    pub operator_id: String,
    pub cashier_id: String,

    pub opening_time: DateTime<Utc>,
    pub initial_cash_cents: i64,

    pub closing_time: Option<DateTime<Utc>>,

    /// initial_cash + cash payments in window, snapshotted at close.
    pub expected_cash_cents: Option<i64>,

    /// What the cashier counted in the drawer.
    pub actual_cash_cents: Option<i64>,

    /// actual − expected (negative = short drawer).
    pub variance_cents: Option<i64>,

    pub total_cash_cents: Option<i64>,
    pub total_card_cents: Option<i64>,
    pub total_transfer_cents: Option<i64>,
    pub total_check_cents: Option<i64>,

    pub status: ShiftStatus,
    pub notes: Option<String>,

    /// Operator who approved/rejected the close.
    pub reviewed_by: Option<String>,
    pub reviewed_at: Option<DateTime<Utc>>,

    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Operators
// =============================================================================

/// A property owner (tenant). Owns rooms, cashiers, customers and bookings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
pub struct Operator {
    pub id: String,
    pub name: String,
    pub phone: Option<String>,

    /// Argon2 PHC hash, checked during step-up authorization only.
    /// Credential issuance (login) is outside this crate.
    #[serde(skip_serializing)]
    pub password_hash: String,

    pub created_at: DateTime<Utc>,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rate_from_percent() {
        let rate = RateBps::from_percent(13);
        assert_eq!(rate.bps(), 1300);
        assert!((rate.percent() - 13.0).abs() < 0.001);
    }

    #[test]
    fn test_booking_status_active() {
        assert!(BookingStatus::Reserved.is_active());
        assert!(BookingStatus::CheckedIn.is_active());
        assert!(!BookingStatus::CheckedOut.is_active());
        assert!(!BookingStatus::Cancelled.is_active());
    }

    #[test]
    fn test_booking_balance() {
        let now = Utc::now();
        let booking = Booking {
            id: "b1".into(),
            code: "BK0001".into(),
            operator_id: "op1".into(),
            cashier_id: "c1".into(),
            customer_id: "g1".into(),
            room_id: "r1".into(),
            check_in: now,
            expected_checkout: None,
            actual_checkout: None,
            stay_type: StayType::Daily,
            nights: 1,
            guests: 1,
            base_price_cents: 10_000,
            additional_income_cents: 0,
            additional_charges_cents: 2_200,
            discounts_cents: 0,
            total_amount_cents: 12_200,
            amount_paid_cents: 5_000,
            status: BookingStatus::CheckedIn,
            notes: None,
            created_at: now,
            updated_at: now,
        };

        assert_eq!(booking.balance().cents(), 7_200);
        assert!(!booking.balance().is_negative());
    }

    #[test]
    fn test_room_status_default() {
        assert_eq!(RoomStatus::default(), RoomStatus::Available);
    }
}
