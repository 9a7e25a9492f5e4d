use crate::gateway::types::{Money, PaymentMethod};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Transient user-facing messages (kiosk/web toasts).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Notification {
    ActiveBookingFound {
        booking_id: String,
    },
    PaymentSuccessful {
        booking_id: String,
        method: PaymentMethod,
    },
    PaymentDeferred {
        booking_id: Option<String>,
        amount_due: Money,
    },
}

impl Notification {
    pub fn message(&self) -> String {
        match self {
            Notification::ActiveBookingFound { .. } => {
                "You already have an active booking".to_string()
            }
            Notification::PaymentSuccessful { method, .. } => {
                format!("Payment successful via {}", method)
            }
            Notification::PaymentDeferred { amount_due, .. } => {
                format!("Amount of {} recorded as due", amount_due)
            }
        }
    }
}

/// Sink for user notifications. Delivery is fire-and-forget.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: Notification);
}

/// Default notifier: emits notifications as structured log events.
#[derive(Debug, Default, Clone)]
pub struct NotificationService;

impl NotificationService {
    pub fn new() -> Self {
        Self
    }
}

impl Notifier for NotificationService {
    fn notify(&self, notification: Notification) {
        let message = notification.message();
        match &notification {
            Notification::ActiveBookingFound { booking_id } => {
                info!(
                    notification = "active_booking_found",
                    booking_id = %booking_id,
                    "🔔 NOTIFICATION: {}", message
                );
            }
            Notification::PaymentSuccessful { booking_id, method } => {
                info!(
                    notification = "payment_successful",
                    booking_id = %booking_id,
                    method = %method,
                    "🔔 NOTIFICATION: {}", message
                );
            }
            Notification::PaymentDeferred {
                booking_id,
                amount_due,
            } => {
                info!(
                    notification = "payment_deferred",
                    booking_id = booking_id.as_deref().unwrap_or("-"),
                    amount_due = %amount_due,
                    "🔔 NOTIFICATION: {}", message
                );
            }
        }
    }
}
