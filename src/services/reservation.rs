use crate::config::AppConfig;
use crate::gateway::client::{BookingGateway, WalletLedger};
use crate::gateway::error::GatewayError;
use crate::gateway::types::{Booking, CreateBookingRequest};
use crate::services::active_booking::{ActiveBookingGuard, CheckSource};
use crate::services::notification::Notifier;
use crate::services::wallet::{PaymentResolution, SettlementError, WalletPaymentResolver};
use crate::workers::payment_verification::{PaymentVerificationPoller, VerificationState};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error)]
pub enum ReservationError {
    #[error("user already holds an active booking ({})", .booking_id.as_deref().unwrap_or("unknown"))]
    ActiveBookingExists { booking_id: Option<String> },

    #[error("booking backend error: {0}")]
    Gateway(#[from] GatewayError),
}

#[derive(Debug, Clone, PartialEq)]
pub struct Reservation {
    pub booking: Booking,
    /// Which lookup cleared the reservation.
    pub cleared_by: CheckSource,
}

/// Drives a reservation: guard check, booking creation, then either
/// asynchronous payment verification or immediate wallet settlement.
pub struct ReservationCoordinator {
    gateway: Arc<dyn BookingGateway>,
    guard: ActiveBookingGuard,
    resolver: WalletPaymentResolver,
    poller: PaymentVerificationPoller,
}

impl ReservationCoordinator {
    pub fn new(
        gateway: Arc<dyn BookingGateway>,
        guard: ActiveBookingGuard,
        resolver: WalletPaymentResolver,
        poller: PaymentVerificationPoller,
    ) -> Self {
        Self {
            gateway,
            guard,
            resolver,
            poller,
        }
    }

    pub fn from_config(
        gateway: Arc<dyn BookingGateway>,
        ledger: Arc<dyn WalletLedger>,
        notifier: Arc<dyn Notifier>,
        config: &AppConfig,
    ) -> Self {
        let guard = ActiveBookingGuard::new(gateway.clone(), notifier.clone())
            .with_policy(config.guard.failure_policy);
        let resolver = WalletPaymentResolver::new(ledger, notifier.clone());
        let poller =
            PaymentVerificationPoller::from_config(gateway.clone(), notifier, &config.verification);
        Self::new(gateway, guard, resolver, poller)
    }

    pub fn guard(&self) -> &ActiveBookingGuard {
        &self.guard
    }

    pub fn resolver(&self) -> &WalletPaymentResolver {
        &self.resolver
    }

    pub fn poller(&self) -> &PaymentVerificationPoller {
        &self.poller
    }

    pub async fn reserve(
        &self,
        request: CreateBookingRequest,
    ) -> Result<Reservation, ReservationError> {
        let check = self.guard.check_active_booking().await;
        if check.has_active {
            let booking_id = check.booking.map(|b| b.id);
            warn!(
                booking_id = booking_id.as_deref().unwrap_or("unknown"),
                source = ?check.source,
                "reservation refused: active booking exists"
            );
            return Err(ReservationError::ActiveBookingExists { booking_id });
        }

        let booking = self.gateway.create_booking(request).await?;
        info!(
            booking_id = %booking.id,
            spot_type = ?booking.spot_type,
            amount_due = %booking.amount_due_or_zero(),
            "booking created"
        );

        Ok(Reservation {
            booking,
            cleared_by: check.source,
        })
    }

    /// Watches for asynchronous (e.g. UPI) payment confirmation.
    pub fn begin_verification(&self, booking: &Booking) {
        self.poller.start(Some(&booking.id));
    }

    pub fn stop_verification(&self) {
        self.poller.stop();
    }

    pub fn verification_state(&self) -> VerificationState {
        self.poller.state()
    }

    /// Immediate settlement path. A paid result stops verification of the
    /// same booking; a session watching another booking keeps running.
    pub async fn settle_from_wallet(
        &self,
        booking: &Booking,
    ) -> Result<PaymentResolution, SettlementError> {
        let resolution = self.resolver.settle(booking).await?;
        if resolution.is_paid() {
            match self.poller.state() {
                VerificationState::Polling { booking_id } if booking_id == booking.id => {
                    self.poller.stop();
                }
                VerificationState::Polling { booking_id } => {
                    debug!(
                        settled = %booking.id,
                        polling = %booking_id,
                        "verification left running for a different booking"
                    );
                }
                _ => {}
            }
        }
        Ok(resolution)
    }

    pub fn defer_payment(&self, booking: &Booking) -> Result<PaymentResolution, SettlementError> {
        self.resolver
            .defer(booking.amount_due_or_zero(), Some(&booking.id))
    }
}
