//! Client side of the parking backend: shared booking/payment contracts and
//! the traits the coordination services depend on.

pub mod client;
pub mod error;
#[cfg(feature = "http")]
pub mod http;
pub mod types;

pub use client::{BookingGateway, WalletLedger};
pub use error::{GatewayError, GatewayResult};
#[cfg(feature = "http")]
pub use http::HttpBookingGateway;
