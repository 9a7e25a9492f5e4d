use crate::config::{GatewayConfig, MAX_GATEWAY_RETRIES};
use crate::gateway::client::{BookingGateway, WalletLedger};
use crate::gateway::error::{GatewayError, GatewayResult};
use crate::gateway::types::{
    AccountEnvelope, Booking, BookingEnvelope, BookingListEnvelope, CreateBookingRequest,
    DebitRequest, GlobalAccount, PaymentMethod, PaymentStatusEnvelope, PaymentStatusReport,
};
use async_trait::async_trait;
use reqwest::{Client, Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value as JsonValue;
use std::time::Duration;
use tracing::{debug, warn};

const BASE_RETRY_DELAY_MS: u64 = 250;
const MAX_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Exponential backoff after the given (1-based) failed attempt, capped.
fn retry_delay(attempt: u32) -> Duration {
    let factor = 1u64
        .checked_shl(attempt.saturating_sub(1))
        .unwrap_or(u64::MAX);
    Duration::from_millis(BASE_RETRY_DELAY_MS.saturating_mul(factor)).min(MAX_RETRY_DELAY)
}

#[derive(Clone)]
pub struct ApiHttpClient {
    client: Client,
    timeout: Duration,
    max_retries: u32,
}

impl ApiHttpClient {
    pub fn new(timeout: Duration, max_retries: u32) -> GatewayResult<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("parkwise/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| GatewayError::network(format!("failed to initialize HTTP client: {}", e)))?;

        if max_retries > MAX_GATEWAY_RETRIES {
            warn!(
                requested = max_retries,
                limit = MAX_GATEWAY_RETRIES,
                "GET retry count clamped"
            );
        }

        Ok(Self {
            client,
            timeout,
            max_retries: max_retries.min(MAX_GATEWAY_RETRIES),
        })
    }

    /// Sends a JSON request. Only GETs are retried; a POST is issued exactly once.
    pub async fn request_json<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        bearer_token: Option<&str>,
        body: Option<&JsonValue>,
    ) -> GatewayResult<T> {
        let max_attempts = if method == Method::GET {
            self.max_retries.saturating_add(1)
        } else {
            1
        };

        let mut attempt: u32 = 0;
        loop {
            attempt += 1;
            match self.send_once(method.clone(), url, bearer_token, body).await {
                Ok(value) => return Ok(value),
                Err(e) if e.is_retryable() && attempt < max_attempts => {
                    warn!(
                        url = %url,
                        attempt,
                        error = %e,
                        "backend request failed, retrying"
                    );
                    tokio::time::sleep(retry_delay(attempt)).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn send_once<T: DeserializeOwned>(
        &self,
        method: Method,
        url: &str,
        bearer_token: Option<&str>,
        body: Option<&JsonValue>,
    ) -> GatewayResult<T> {
        let mut request = self.client.request(method, url);
        if let Some(token) = bearer_token {
            request = request.bearer_auth(token);
        }
        if let Some(payload) = body {
            request = request.json(payload);
        }

        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                GatewayError::Timeout {
                    timeout_secs: self.timeout.as_secs(),
                }
            } else {
                GatewayError::network(format!("backend request failed: {}", e))
            }
        })?;

        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        if status.is_success() {
            return serde_json::from_str::<T>(&text).map_err(|e| GatewayError::InvalidResponse {
                message: format!("invalid backend JSON response: {}", e),
            });
        }

        Err(match status {
            StatusCode::NOT_FOUND => GatewayError::not_found(format!("{} returned 404", url)),
            StatusCode::TOO_MANY_REQUESTS => GatewayError::RateLimited {
                message: "backend rate limit exceeded".to_string(),
            },
            s if s.is_server_error() => GatewayError::server(s.as_u16(), text),
            s => GatewayError::Rejected {
                message: format!("HTTP {}: {}", s, text),
            },
        })
    }
}

/// REST client for the parking backend.
pub struct HttpBookingGateway {
    config: GatewayConfig,
    http: ApiHttpClient,
}

impl HttpBookingGateway {
    pub fn new(config: GatewayConfig) -> GatewayResult<Self> {
        let http = ApiHttpClient::new(
            Duration::from_secs(config.request_timeout),
            config.max_retries,
        )?;
        Ok(Self { config, http })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn token(&self) -> Option<&str> {
        self.config.api_token.as_deref()
    }

    fn ensure_booking_id(booking_id: &str) -> GatewayResult<&str> {
        let trimmed = booking_id.trim();
        if trimmed.is_empty()
            || !trimmed
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
        {
            return Err(GatewayError::Validation {
                message: format!("invalid booking id: {:?}", booking_id),
                field: Some("bookingId".to_string()),
            });
        }
        Ok(trimmed)
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> GatewayResult<T> {
        self.http
            .request_json(Method::GET, &self.endpoint(path), self.token(), None)
            .await
    }

    async fn post<T: DeserializeOwned>(&self, path: &str, body: &JsonValue) -> GatewayResult<T> {
        self.http
            .request_json(Method::POST, &self.endpoint(path), self.token(), Some(body))
            .await
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> GatewayResult<JsonValue> {
    serde_json::to_value(value).map_err(|e| GatewayError::Validation {
        message: format!("failed to encode request: {}", e),
        field: None,
    })
}

#[async_trait]
impl BookingGateway for HttpBookingGateway {
    async fn current_booking(&self) -> GatewayResult<Booking> {
        let raw: BookingEnvelope = self.get("/booking").await?;
        match (raw.success, raw.booking) {
            (true, Some(booking)) => Ok(booking),
            _ => Err(GatewayError::not_found(
                raw.message
                    .unwrap_or_else(|| "no current booking".to_string()),
            )),
        }
    }

    async fn active_bookings(&self) -> GatewayResult<Vec<Booking>> {
        let raw: BookingListEnvelope = self.get("/booking/active").await?;
        if !raw.success {
            return Err(GatewayError::Rejected {
                message: raw
                    .message
                    .unwrap_or_else(|| "active booking listing failed".to_string()),
            });
        }
        debug!(count = raw.bookings.len(), "fetched active bookings");
        Ok(raw.bookings)
    }

    async fn payment_status(&self, booking_id: &str) -> GatewayResult<PaymentStatusReport> {
        let booking_id = Self::ensure_booking_id(booking_id)?;
        let raw: PaymentStatusEnvelope = self
            .get(&format!("/payment/check-status/booking/{}", booking_id))
            .await?;
        if !raw.success {
            return Err(GatewayError::Rejected {
                message: raw
                    .message
                    .unwrap_or_else(|| "payment status check failed".to_string()),
            });
        }

        Ok(PaymentStatusReport {
            booking_id: booking_id.to_string(),
            is_paid: raw.is_paid,
            payment_method: raw
                .payment_method
                .or(raw.is_paid.then_some(PaymentMethod::Upi)),
        })
    }

    async fn create_booking(&self, request: CreateBookingRequest) -> GatewayResult<Booking> {
        if request.floor.trim().is_empty() {
            return Err(GatewayError::Validation {
                message: "floor is required".to_string(),
                field: Some("floor".to_string()),
            });
        }

        let raw: BookingEnvelope = self.post("/booking", &to_json(&request)?).await?;
        if !raw.success {
            return Err(GatewayError::Rejected {
                message: raw
                    .message
                    .unwrap_or_else(|| "booking was not created".to_string()),
            });
        }
        raw.booking.ok_or(GatewayError::InvalidResponse {
            message: "booking missing from creation response".to_string(),
        })
    }
}

#[async_trait]
impl WalletLedger for HttpBookingGateway {
    async fn global_account(&self) -> GatewayResult<GlobalAccount> {
        let raw: AccountEnvelope = self.get("/wallet/global").await?;
        match (raw.success, raw.account) {
            (true, Some(account)) => Ok(account),
            _ => Err(GatewayError::Rejected {
                message: raw
                    .message
                    .unwrap_or_else(|| "global account unavailable".to_string()),
            }),
        }
    }

    async fn debit(&self, request: DebitRequest) -> GatewayResult<GlobalAccount> {
        Self::ensure_booking_id(&request.booking_id)?;
        let raw: AccountEnvelope = self
            .post("/wallet/global/debit", &to_json(&request)?)
            .await?;
        match (raw.success, raw.account) {
            (true, Some(account)) => Ok(account),
            _ => Err(GatewayError::Rejected {
                message: raw.message.unwrap_or_else(|| "debit was declined".to_string()),
            }),
        }
    }
}
