//! # Notification Glue
//!
//! Default [`NotificationPort`] implementation that logs events instead of
//! delivering them anywhere. Real delivery (WhatsApp, SMS, email) lives
//! outside this repository; deployments plug their own port into
//! [`Database::with_notifier`](crate::Database::with_notifier).

use tracing::{info, warn};

use posada_core::{NotificationEvent, NotificationPort};

/// Logs every event as a structured tracing record with its JSON payload.
///
/// Serialization failures are logged and swallowed: by the time an event is
/// delivered the ledger transaction has committed, and nothing here may turn
/// into an operation failure.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl NotificationPort for TracingNotifier {
    fn deliver(&self, event: &NotificationEvent) {
        match serde_json::to_string(event) {
            Ok(payload) => {
                info!(
                    target: "posada::notify",
                    event = event.name(),
                    %payload,
                    "notification event"
                );
            }
            Err(err) => {
                warn!(
                    target: "posada::notify",
                    event = event.name(),
                    error = %err,
                    "failed to serialize notification event"
                );
            }
        }
    }
}
