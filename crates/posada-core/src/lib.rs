//! # posada-core: Pure Business Logic for Posada
//!
//! Posada is a multi-tenant hotel front-desk and point-of-sale backend.
//! This crate is its **heart**: the stay ledger's invariants, room state
//! machine rules, stay pricing and authorization decisions, all as pure
//! code with zero I/O dependencies.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Posada Architecture                              │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                 Front-desk operation requests                   │   │
//! │  │   check-in · add-charges · pay · discount · refund · checkout   │   │
//! │  │             open-drawer · close-drawer · review                 │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ posada-core (THIS CRATE) ★                      │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────┐  ┌───────────┐  ┌───────────┐  ┌────────────┐  │   │
//! │  │   │   types   │  │   money   │  │  pricing  │  │authorization│ │   │
//! │  │   │  Booking  │  │   Money   │  │ StayQuote │  │  AuthGate   │ │   │
//! │  │   │   Room    │  │  RateBps  │  │  tariffs  │  │  StepUp     │ │   │
//! │  │   └───────────┘  └───────────┘  └───────────┘  └────────────┘  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO NETWORK • PURE FUNCTIONS            │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                 posada-db (Persistence Layer)                   │   │
//! │  │     SQLite repositories, migrations, atomic service operations  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (Room, Booking, ledger lines, shifts, ...)
//! - [`money`] - Money type with integer arithmetic (no floating point!)
//! - [`pricing`] - Stay tariff selection and base-charge calculation
//! - [`authorization`] - Capability gate and step-up token model
//! - [`notify`] - Outbound notification event contract
//! - [`error`] - Domain error taxonomy
//! - [`validation`] - Input validation
//!
//! ## Design Principles
//!
//! 1. **Pure functions**: every function is deterministic; time always
//!    arrives as a parameter
//! 2. **No I/O**: database, network and file system access are FORBIDDEN here
//! 3. **Integer money**: all amounts are cents (i64), all rates basis points
//! 4. **Explicit errors**: typed variants, never strings or panics
//! 5. **Explicit tenancy**: `operator_id` is a parameter everywhere, never
//!    ambient state

// =============================================================================
// Module Declarations
// =============================================================================

pub mod authorization;
pub mod error;
pub mod money;
pub mod notify;
pub mod pricing;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================
// These allow users to do `use posada_core::Money` instead of
// `use posada_core::money::Money`

pub use authorization::{
    Actor, ActorRole, AuthorizationGate, Capabilities, LedgerAction, Requirement, StepUpToken,
};
pub use error::{CoreError, CoreResult, ErrorCategory, ValidationError};
pub use money::Money;
pub use notify::{ChargeSummaryLine, NotificationEvent, NotificationPort, NullNotifier};
pub use pricing::{PricingCalculator, StayParams, StayQuote};
pub use types::*;
