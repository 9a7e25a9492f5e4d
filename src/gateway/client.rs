use crate::gateway::error::GatewayResult;
use crate::gateway::types::{
    Booking, CreateBookingRequest, DebitRequest, GlobalAccount, PaymentStatusReport,
};
use async_trait::async_trait;

/// Booking and payment-status endpoints of the parking backend.
#[async_trait]
pub trait BookingGateway: Send + Sync {
    /// The caller's current booking. A backend 404 surfaces as
    /// `GatewayError::NotFound`.
    async fn current_booking(&self) -> GatewayResult<Booking>;

    async fn active_bookings(&self) -> GatewayResult<Vec<Booking>>;

    async fn payment_status(&self, booking_id: &str) -> GatewayResult<PaymentStatusReport>;

    async fn create_booking(&self, request: CreateBookingRequest) -> GatewayResult<Booking>;
}

/// Read/debit access to the global wallet pool.
#[async_trait]
pub trait WalletLedger: Send + Sync {
    async fn global_account(&self) -> GatewayResult<GlobalAccount>;

    /// Exactly one remote call per invocation; implementations must not retry.
    async fn debit(&self, request: DebitRequest) -> GatewayResult<GlobalAccount>;
}
