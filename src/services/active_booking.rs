//! Enforces at most one pending/active booking per user before a new
//! reservation is attempted.
//!
//! Lookups are evaluated in order until one gives a definitive answer. The
//! default order queries the caller's current booking first and falls back to
//! listing active bookings when that endpoint fails for any reason other than
//! "not found".

use crate::gateway::client::BookingGateway;
use crate::gateway::error::GatewayError;
use crate::gateway::types::Booking;
use crate::services::notification::{Notification, Notifier};
use std::collections::HashSet;
use std::fmt;
use std::str::FromStr;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

/// What an exhausted lookup chain resolves to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FailurePolicy {
    /// Report no active booking so the user is not blocked.
    #[default]
    FailOpen,
    /// Report an active booking so the one-booking limit cannot be bypassed.
    FailClosed,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "fail_open" | "open" => Ok(FailurePolicy::FailOpen),
            "fail_closed" | "closed" => Ok(FailurePolicy::FailClosed),
            other => Err(format!("unknown failure policy: {}", other)),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BookingLookup {
    /// `GET /booking`
    CurrentBooking,
    /// `GET /booking/active`
    ActiveList,
}

impl fmt::Display for BookingLookup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            BookingLookup::CurrentBooking => write!(f, "current_booking"),
            BookingLookup::ActiveList => write!(f, "active_list"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CheckSource {
    Primary,
    Fallback,
    /// Every lookup failed; the failure policy decided.
    Exhausted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ActiveBookingCheck {
    pub has_active: bool,
    pub booking: Option<Booking>,
    pub source: CheckSource,
}

enum LookupVerdict {
    Definitive(Option<Booking>),
    Inconclusive(GatewayError),
}

pub struct ActiveBookingGuard {
    gateway: Arc<dyn BookingGateway>,
    notifier: Arc<dyn Notifier>,
    policy: FailurePolicy,
    lookups: Vec<BookingLookup>,
    notified: Mutex<HashSet<String>>,
}

impl ActiveBookingGuard {
    pub fn new(gateway: Arc<dyn BookingGateway>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            gateway,
            notifier,
            policy: FailurePolicy::default(),
            lookups: vec![BookingLookup::CurrentBooking, BookingLookup::ActiveList],
            notified: Mutex::new(HashSet::new()),
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_lookups(mut self, lookups: Vec<BookingLookup>) -> Self {
        self.lookups = lookups;
        self
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    /// Never fails: backend errors degrade according to the failure policy.
    pub async fn check_active_booking(&self) -> ActiveBookingCheck {
        for (position, lookup) in self.lookups.iter().enumerate() {
            match self.evaluate(*lookup).await {
                LookupVerdict::Definitive(booking) => {
                    let source = if position == 0 {
                        CheckSource::Primary
                    } else {
                        CheckSource::Fallback
                    };
                    if let Some(found) = &booking {
                        self.notify_once(found);
                    }
                    debug!(
                        lookup = %lookup,
                        has_active = booking.is_some(),
                        "active booking check resolved"
                    );
                    return ActiveBookingCheck {
                        has_active: booking.is_some(),
                        booking,
                        source,
                    };
                }
                LookupVerdict::Inconclusive(err) => {
                    warn!(lookup = %lookup, error = %err, "active booking lookup failed");
                }
            }
        }

        let has_active = self.policy == FailurePolicy::FailClosed;
        warn!(
            policy = ?self.policy,
            has_active,
            "all active booking lookups failed; applying failure policy"
        );
        ActiveBookingCheck {
            has_active,
            booking: None,
            source: CheckSource::Exhausted,
        }
    }

    async fn evaluate(&self, lookup: BookingLookup) -> LookupVerdict {
        match lookup {
            BookingLookup::CurrentBooking => match self.gateway.current_booking().await {
                Ok(booking) => LookupVerdict::Definitive(Some(booking)),
                Err(err) if err.is_not_found() => {
                    debug!("no current booking for caller");
                    LookupVerdict::Definitive(None)
                }
                Err(err) => LookupVerdict::Inconclusive(err),
            },
            BookingLookup::ActiveList => match self.gateway.active_bookings().await {
                Ok(bookings) => LookupVerdict::Definitive(bookings.into_iter().next()),
                Err(err) => LookupVerdict::Inconclusive(err),
            },
        }
    }

    fn notify_once(&self, booking: &Booking) {
        let first_time = match self.notified.lock() {
            Ok(mut seen) => seen.insert(booking.id.clone()),
            Err(poisoned) => poisoned.into_inner().insert(booking.id.clone()),
        };
        if first_time {
            info!(booking_id = %booking.id, status = %booking.status, "active booking detected");
            self.notifier.notify(Notification::ActiveBookingFound {
                booking_id: booking.id.clone(),
            });
        }
    }
}
