//! Services module for booking/payment coordination

pub mod active_booking;
pub mod notification;
pub mod reservation;
pub mod wallet;

pub use active_booking::{ActiveBookingCheck, ActiveBookingGuard, CheckSource, FailurePolicy};
pub use notification::{Notification, NotificationService, Notifier};
pub use reservation::{Reservation, ReservationCoordinator, ReservationError};
pub use wallet::{can_settle_from_wallet, PaymentResolution, SettlementError, WalletPaymentResolver};
