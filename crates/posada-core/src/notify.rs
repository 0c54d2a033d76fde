//! # Notification Contract
//!
//! Outbound event types and the port the core calls after state-changing
//! operations.
//!
//! ## Fire-and-Forget Semantics
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Ledger transaction ──► COMMIT ──► NotificationPort::deliver(event)     │
//! │                                                                         │
//! │  • Events are emitted strictly AFTER the transaction commits.           │
//! │  • Delivery failures are the implementation's problem: logged, never    │
//! │    surfaced as operation failures, never rolled back into the ledger.   │
//! │  • How events actually reach guests/operators (WhatsApp, SMS, ...) is   │
//! │    outside this repository; only the event and payload contract is.     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{DateTime, Utc};
use serde::Serialize;

// =============================================================================
// Events
// =============================================================================

/// One charged item, summarized for the operator's checkout audit message.
#[derive(Debug, Clone, Serialize)]
pub struct ChargeSummaryLine {
    pub description: String,
    pub quantity: i64,
    pub total_cents: i64,
}

/// Events emitted after state-changing front-desk operations.
///
/// Payloads carry what a guest-facing or operator-facing message needs:
/// booking code, room number, customer name and the relevant amounts.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum NotificationEvent {
    /// A payment was recorded against a booking.
    PaymentRecorded {
        booking_code: String,
        room_number: String,
        customer_name: String,
        amount_cents: i64,
        total_paid_cents: i64,
        total_amount_cents: i64,
        balance_cents: i64,
    },

    /// Charges were added to a booking's folio.
    ChargeAdded {
        booking_code: String,
        room_number: String,
        customer_name: String,
        charge_total_cents: i64,
        total_amount_cents: i64,
    },

    /// A stay was settled and checked out (guest-facing).
    CheckoutCompleted {
        booking_code: String,
        room_number: String,
        customer_name: String,
        total_amount_cents: i64,
        check_in: DateTime<Utc>,
        check_out: DateTime<Utc>,
    },

    /// Checkout audit trail for the operator. Unlike the guest-facing
    /// event, this one carries the guest's identity document details.
    OperatorCheckoutSummary {
        booking_code: String,
        room_number: String,
        customer_name: String,
        document_number: Option<String>,
        age: Option<i64>,
        nationality: Option<String>,
        origin: Option<String>,
        total_amount_cents: i64,
        check_in: DateTime<Utc>,
        check_out: DateTime<Utc>,
        charges: Vec<ChargeSummaryLine>,
    },
}

impl NotificationEvent {
    /// Stable event name, for logs and routing.
    pub const fn name(&self) -> &'static str {
        match self {
            NotificationEvent::PaymentRecorded { .. } => "payment_recorded",
            NotificationEvent::ChargeAdded { .. } => "charge_added",
            NotificationEvent::CheckoutCompleted { .. } => "checkout_completed",
            NotificationEvent::OperatorCheckoutSummary { .. } => "operator_checkout_summary",
        }
    }
}

// =============================================================================
// Port
// =============================================================================

/// Outbound notification interface, implemented externally.
///
/// `deliver` must not block the caller on delivery and must swallow (and
/// log) its own failures; the financial transaction already committed by the
/// time it runs.
pub trait NotificationPort: Send + Sync {
    fn deliver(&self, event: &NotificationEvent);
}

/// A port that drops every event. Useful in tests asserting ledger behavior
/// without caring about notifications.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullNotifier;

impl NotificationPort for NullNotifier {
    fn deliver(&self, _event: &NotificationEvent) {}
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_names() {
        let event = NotificationEvent::ChargeAdded {
            booking_code: "BK1".into(),
            room_number: "101".into(),
            customer_name: "Ana".into(),
            charge_total_cents: 2_200,
            total_amount_cents: 12_200,
        };
        assert_eq!(event.name(), "charge_added");
    }

    #[test]
    fn test_event_serializes_with_tag() {
        let event = NotificationEvent::PaymentRecorded {
            booking_code: "BK1".into(),
            room_number: "101".into(),
            customer_name: "Ana".into(),
            amount_cents: 12_200,
            total_paid_cents: 12_200,
            total_amount_cents: 12_200,
            balance_cents: 0,
        };

        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "payment_recorded");
        assert_eq!(json["balance_cents"], 0);
    }
}
