//! # posada-db: Persistence and Atomic Operations for Posada
//!
//! SQLite persistence (via `sqlx`) plus the transactional service layer
//! that executes every front-desk operation as a single atomic unit.
//!
//! ## Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                          posada-db                                      │
//! │                                                                         │
//! │  Database ── pool, migrations, handles                                  │
//! │     │                                                                   │
//! │     ├── repositories: rooms, customers, products, bookings (+ ledger    │
//! │     │   lines), shifts, operators - row-level reads/writes              │
//! │     │                                                                   │
//! │     └── services: RoomRegistry, LedgerEngine, CashRegisterReconciler,   │
//! │         StepUpAuthorizer - the operations the front desk calls, each    │
//! │         one transaction, each scoped by the actor's operator            │
//! │                                                                         │
//! │  Events go out through posada_core::NotificationPort after commit;      │
//! │  the default TracingNotifier just logs them.                            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//! ```rust,ignore
//! let db = Database::new(DbConfig::new("./posada.db")).await?;
//! let actor = Actor::cashier("cashier-1", "operator-1", capabilities);
//!
//! let booking = db.ledger().create_booking(&actor, new_booking).await?;
//! db.ledger().apply_payment(&actor, &booking.id, 12_200, PaymentMethod::Cash, None).await?;
//! db.ledger().checkout(&actor, &booking.id).await?;
//! ```

pub mod error;
pub mod migrations;
pub mod notifier;
pub mod pool;
pub mod repository;
pub mod service;

#[cfg(test)]
pub(crate) mod testutil;

pub use error::{DbError, DbResult};
pub use notifier::TracingNotifier;
pub use pool::{Database, DbConfig};
pub use service::ledger::{
    BookingCustomer, BookingFolio, ChargeItem, ChargesReceipt, CheckoutSummary, DiscountReceipt,
    DiscountSpec, LedgerEngine, NewBooking, NewGuest, PaymentReceipt, RefundReceipt,
};
pub use service::reconciler::{
    CashRegisterReconciler, ReviewAction, ShiftClose, ShiftSummary,
};
pub use service::registry::{RoomFilter, RoomRegistry};
pub use service::stepup::{hash_password, StepUpAuthorizer};
pub use service::{EngineError, EngineResult};
