use crate::gateway::error::GatewayError;
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum SpotType {
    #[default]
    Normal,
    Disability,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum BookingStatus {
    Pending,
    Active,
    Completed,
    Cancelled,
    Expired,
}

impl BookingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "pending",
            BookingStatus::Active => "active",
            BookingStatus::Completed => "completed",
            BookingStatus::Cancelled => "cancelled",
            BookingStatus::Expired => "expired",
        }
    }

    /// Pending and active bookings count against the one-booking-per-user limit.
    pub fn is_active(&self) -> bool {
        matches!(self, BookingStatus::Pending | BookingStatus::Active)
    }

    pub fn is_terminal(&self) -> bool {
        !self.is_active()
    }
}

impl fmt::Display for BookingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PaymentStatus {
    #[default]
    Pending,
    Paid,
    Due,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Wallet,
    Gateway,
    Upi,
    Free,
    #[default]
    None,
    Due,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Wallet => "wallet",
            PaymentMethod::Gateway => "gateway",
            PaymentMethod::Upi => "upi",
            PaymentMethod::Free => "free",
            PaymentMethod::None => "none",
            PaymentMethod::Due => "due",
        }
    }
}

impl fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = GatewayError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_lowercase().as_str() {
            "wallet" => Ok(PaymentMethod::Wallet),
            "gateway" => Ok(PaymentMethod::Gateway),
            "upi" => Ok(PaymentMethod::Upi),
            "free" => Ok(PaymentMethod::Free),
            "none" => Ok(PaymentMethod::None),
            "due" => Ok(PaymentMethod::Due),
            _ => Err(GatewayError::Validation {
                message: format!("unsupported payment method: {}", value),
                field: Some("paymentMethod".to_string()),
            }),
        }
    }
}

/// A non-negative monetary value. Travels as a JSON number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Default)]
pub struct Money(Decimal);

impl Money {
    pub const ZERO: Self = Self(Decimal::ZERO);

    pub fn new(value: Decimal) -> Result<Self, GatewayError> {
        if value.is_sign_negative() && !value.is_zero() {
            return Err(GatewayError::Validation {
                message: format!("amount cannot be negative: {}", value),
                field: Some("amount".to_string()),
            });
        }
        Ok(Self(value))
    }

    pub fn value(&self) -> Decimal {
        self.0
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }
}

impl TryFrom<Decimal> for Money {
    type Error = GatewayError;

    fn try_from(value: Decimal) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Money> for Decimal {
    fn from(money: Money) -> Self {
        money.0
    }
}

impl Serialize for Money {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        rust_decimal::serde::float::serialize(&self.0, serializer)
    }
}

impl<'de> Deserialize<'de> for Money {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = rust_decimal::serde::float::deserialize(deserializer)?;
        Money::new(value).map_err(serde::de::Error::custom)
    }
}

impl From<u32> for Money {
    fn from(value: u32) -> Self {
        Self(Decimal::from(value))
    }
}

impl fmt::Display for Money {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A reference to another backend document, either as a bare id or populated.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum EntityRef {
    Id(String),
    Populated {
        #[serde(rename = "_id", alias = "id")]
        id: String,
    },
}

impl EntityRef {
    pub fn id(&self) -> &str {
        match self {
            EntityRef::Id(id) => id,
            EntityRef::Populated { id } => id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Booking {
    #[serde(rename = "_id", alias = "id")]
    pub id: String,
    pub user: Option<EntityRef>,
    pub floor: Option<EntityRef>,
    #[serde(default)]
    pub spot_type: SpotType,
    pub spot_number: Option<u32>,
    pub status: BookingStatus,
    #[serde(default)]
    pub payment_status: PaymentStatus,
    #[serde(default)]
    pub payment_method: PaymentMethod,
    pub created_at: Option<DateTime<Utc>>,
    pub expected_exit_time: Option<DateTime<Utc>>,
    pub expires_at: Option<DateTime<Utc>>,
    pub amount_due: Option<Money>,
}

impl Booking {
    pub fn amount_due_or_zero(&self) -> Money {
        self.amount_due.unwrap_or_default()
    }

    pub fn is_active(&self) -> bool {
        self.status.is_active()
    }
}

/// The shared wallet pool. Owned by the backend; only ever read or debited.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct GlobalAccount {
    #[serde(default)]
    pub balance: Money,
    pub last_updated: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DebitRequest {
    pub amount: Money,
    pub booking_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct CreateBookingRequest {
    pub floor: String,
    pub spot_type: SpotType,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub spot_number: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected_exit_time: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentStatusReport {
    pub booking_id: String,
    pub is_paid: bool,
    pub payment_method: Option<PaymentMethod>,
}

// ---------------------------------------------------------------------------
// Response envelopes
// ---------------------------------------------------------------------------

#[derive(Debug, Deserialize)]
pub struct BookingEnvelope {
    #[serde(default)]
    pub success: bool,
    pub booking: Option<Booking>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BookingListEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub bookings: Vec<Booking>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentStatusEnvelope {
    #[serde(default)]
    pub success: bool,
    #[serde(default)]
    pub is_paid: bool,
    pub payment_method: Option<PaymentMethod>,
    pub message: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct AccountEnvelope {
    #[serde(default)]
    pub success: bool,
    pub account: Option<GlobalAccount>,
    pub message: Option<String>,
}
