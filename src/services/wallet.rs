use crate::gateway::client::WalletLedger;
use crate::gateway::types::{Booking, DebitRequest, Money, PaymentMethod, PaymentStatus};
use crate::services::notification::{Notification, Notifier};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

/// Wallet settlement is all-or-nothing: the balance must cover the full amount.
pub fn can_settle_from_wallet(balance: Money, amount_due: Money) -> bool {
    balance >= amount_due
}

#[derive(Debug, Clone, PartialEq)]
pub enum PaymentResolution {
    Paid {
        method: PaymentMethod,
        amount: Money,
        /// Balance reported by the backend after the debit, if one was issued.
        remaining_balance: Option<Money>,
    },
    Due {
        amount: Money,
    },
}

impl PaymentResolution {
    pub fn payment_status(&self) -> PaymentStatus {
        match self {
            PaymentResolution::Paid { .. } => PaymentStatus::Paid,
            PaymentResolution::Due { .. } => PaymentStatus::Due,
        }
    }

    pub fn is_paid(&self) -> bool {
        matches!(self, PaymentResolution::Paid { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SettlementError {
    #[error("a settlement request is already in flight")]
    AlreadyInFlight,
}

/// Releases the in-flight flag on every exit path.
struct InFlightGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> InFlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, SettlementError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SettlementError::AlreadyInFlight)?;
        Ok(Self { flag })
    }
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Decides between settling from the shared wallet and recording a due.
///
/// The balance is never cached here; callers pass the value they just read,
/// or use [`WalletPaymentResolver::settle`] which reads it from the ledger.
pub struct WalletPaymentResolver {
    ledger: Arc<dyn WalletLedger>,
    notifier: Arc<dyn Notifier>,
    in_flight: AtomicBool,
}

impl WalletPaymentResolver {
    pub fn new(ledger: Arc<dyn WalletLedger>, notifier: Arc<dyn Notifier>) -> Self {
        Self {
            ledger,
            notifier,
            in_flight: AtomicBool::new(false),
        }
    }

    pub fn can_settle_from_wallet(&self, balance: Money, amount_due: Money) -> bool {
        can_settle_from_wallet(balance, amount_due)
    }

    pub fn is_settling(&self) -> bool {
        self.in_flight.load(Ordering::Acquire)
    }

    /// Settles `amount_due` for `booking_id` from the wallet when `balance`
    /// covers it, otherwise records it as due. Issues at most one debit.
    pub async fn resolve_payment(
        &self,
        balance: Money,
        amount_due: Money,
        booking_id: &str,
    ) -> Result<PaymentResolution, SettlementError> {
        let _guard = InFlightGuard::acquire(&self.in_flight)?;
        Ok(self.resolve(balance, amount_due, booking_id).await)
    }

    /// Reads the current wallet balance and settles the booking's amount due.
    pub async fn settle(&self, booking: &Booking) -> Result<PaymentResolution, SettlementError> {
        let _guard = InFlightGuard::acquire(&self.in_flight)?;
        let amount_due = booking.amount_due_or_zero();

        let balance = match self.ledger.global_account().await {
            Ok(account) => account.balance,
            Err(e) => {
                warn!(
                    booking_id = %booking.id,
                    error = %e,
                    "wallet balance unavailable; recording amount as due"
                );
                return Ok(self.record_due(amount_due, Some(&booking.id)));
            }
        };

        Ok(self.resolve(balance, amount_due, &booking.id).await)
    }

    /// The "pay later" path: records the amount as due without touching the wallet.
    pub fn defer(
        &self,
        amount_due: Money,
        booking_id: Option<&str>,
    ) -> Result<PaymentResolution, SettlementError> {
        let _guard = InFlightGuard::acquire(&self.in_flight)?;
        Ok(self.record_due(amount_due, booking_id))
    }

    async fn resolve(&self, balance: Money, amount_due: Money, booking_id: &str) -> PaymentResolution {
        if !can_settle_from_wallet(balance, amount_due) {
            debug!(
                booking_id = %booking_id,
                balance = %balance,
                amount_due = %amount_due,
                "wallet balance insufficient"
            );
            return self.record_due(amount_due, Some(booking_id));
        }

        if amount_due.is_zero() {
            return self.record_paid(booking_id, PaymentMethod::Free, amount_due, Some(balance));
        }

        let request = DebitRequest {
            amount: amount_due,
            booking_id: booking_id.to_string(),
        };
        match self.ledger.debit(request).await {
            Ok(account) => {
                self.record_paid(booking_id, PaymentMethod::Wallet, amount_due, Some(account.balance))
            }
            Err(e) => {
                warn!(
                    booking_id = %booking_id,
                    amount_due = %amount_due,
                    error = %e,
                    "wallet debit failed; recording amount as due"
                );
                self.record_due(amount_due, Some(booking_id))
            }
        }
    }

    fn record_paid(
        &self,
        booking_id: &str,
        method: PaymentMethod,
        amount: Money,
        remaining_balance: Option<Money>,
    ) -> PaymentResolution {
        info!(
            booking_id = %booking_id,
            method = %method,
            amount = %amount,
            "booking settled"
        );
        self.notifier.notify(Notification::PaymentSuccessful {
            booking_id: booking_id.to_string(),
            method,
        });
        PaymentResolution::Paid {
            method,
            amount,
            remaining_balance,
        }
    }

    fn record_due(&self, amount: Money, booking_id: Option<&str>) -> PaymentResolution {
        self.notifier.notify(Notification::PaymentDeferred {
            booking_id: booking_id.map(str::to_string),
            amount_due: amount,
        });
        PaymentResolution::Due { amount }
    }
}
