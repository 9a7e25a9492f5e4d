//! Application configuration module
//! Handles environment variable loading, configuration validation, and application settings

use crate::services::active_booking::FailurePolicy;
use std::env;
use std::time::Duration;

/// Main application configuration
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub gateway: GatewayConfig,
    pub verification: VerificationConfig,
    pub guard: GuardConfig,
    pub logging: LoggingConfig,
    pub kiosk: KioskConfig,
}

/// Parking backend connection settings
#[derive(Debug, Clone)]
pub struct GatewayConfig {
    pub base_url: String,
    pub api_token: Option<String>,
    pub request_timeout: u64, // seconds
    pub max_retries: u32,
}

/// Upper bound on GET retries; keeps a failing lookup from stalling the guard.
pub const MAX_GATEWAY_RETRIES: u32 = 5;

/// Payment verification polling settings
#[derive(Debug, Clone)]
pub struct VerificationConfig {
    pub poll_interval_ms: u64,
}

/// Active booking guard settings
#[derive(Debug, Clone)]
pub struct GuardConfig {
    pub failure_policy: FailurePolicy,
}

/// Kiosk binary settings
#[derive(Debug, Clone, Default)]
pub struct KioskConfig {
    /// Booking to verify; when unset the kiosk uses the active booking it finds.
    pub booking_id: Option<String>,
}

/// Logging configuration
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub level: String,
    pub format: LogFormat,
}

/// Log format options
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LogFormat {
    Json,
    Plain,
}

impl AppConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenv::dotenv().ok();

        Ok(AppConfig {
            gateway: GatewayConfig::from_env()?,
            verification: VerificationConfig::from_env()?,
            guard: GuardConfig::from_env()?,
            logging: LoggingConfig::from_env()?,
            kiosk: KioskConfig::from_env(),
        })
    }

    /// Validate the entire configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.gateway.validate()?;
        self.verification.validate()?;
        self.logging.validate()?;

        Ok(())
    }
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:5000/api".to_string(),
            api_token: None,
            request_timeout: 15,
            max_retries: 0,
        }
    }
}

impl GatewayConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(GatewayConfig {
            base_url: env::var("PARKWISE_API_BASE_URL").unwrap_or(defaults.base_url),
            api_token: env::var("PARKWISE_API_TOKEN")
                .ok()
                .filter(|token| !token.trim().is_empty()),
            request_timeout: env::var("PARKWISE_API_TIMEOUT_SECS")
                .unwrap_or_else(|_| defaults.request_timeout.to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PARKWISE_API_TIMEOUT_SECS".to_string()))?,
            max_retries: env::var("PARKWISE_API_MAX_RETRIES")
                .unwrap_or_else(|_| defaults.max_retries.to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PARKWISE_API_MAX_RETRIES".to_string()))?,
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.is_empty() {
            return Err(ConfigError::InvalidValue("PARKWISE_API_BASE_URL".to_string()));
        }

        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(
                "PARKWISE_API_BASE_URL must be a valid URL".to_string(),
            ));
        }

        if self.max_retries > MAX_GATEWAY_RETRIES {
            return Err(ConfigError::InvalidValue(format!(
                "PARKWISE_API_MAX_RETRIES cannot exceed {}",
                MAX_GATEWAY_RETRIES
            )));
        }

        if self.request_timeout == 0 {
            return Err(ConfigError::InvalidValue(
                "PARKWISE_API_TIMEOUT_SECS".to_string(),
            ));
        }

        Ok(())
    }
}

impl Default for VerificationConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 5000,
        }
    }
}

impl VerificationConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(VerificationConfig {
            poll_interval_ms: env::var("PAYMENT_POLL_INTERVAL_MS")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()
                .map_err(|_| ConfigError::InvalidValue("PAYMENT_POLL_INTERVAL_MS".to_string()))?,
        })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidValue(
                "PAYMENT_POLL_INTERVAL_MS cannot be 0".to_string(),
            ));
        }

        Ok(())
    }
}

impl KioskConfig {
    pub fn from_env() -> Self {
        KioskConfig {
            booking_id: env::var("PARKWISE_BOOKING_ID")
                .ok()
                .map(|id| id.trim().to_string())
                .filter(|id| !id.is_empty()),
        }
    }
}

impl GuardConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(GuardConfig {
            failure_policy: env::var("ACTIVE_BOOKING_FAILURE_POLICY")
                .unwrap_or_else(|_| "fail_open".to_string())
                .parse()
                .map_err(|_| {
                    ConfigError::InvalidValue("ACTIVE_BOOKING_FAILURE_POLICY".to_string())
                })?,
        })
    }
}

impl LoggingConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Ok(LoggingConfig {
            level: env::var("LOG_LEVEL").unwrap_or_else(|_| "INFO".to_string()),
            format: match env::var("LOG_FORMAT")
                .unwrap_or_else(|_| "plain".to_string())
                .as_str()
            {
                "json" => LogFormat::Json,
                _ => LogFormat::Plain,
            },
        })
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let valid_levels = ["TRACE", "DEBUG", "INFO", "WARN", "ERROR"];
        if !valid_levels.contains(&self.level.to_uppercase().as_str()) {
            return Err(ConfigError::InvalidValue("LOG_LEVEL".to_string()));
        }

        Ok(())
    }
}

/// Configuration error types
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid value for configuration: {0}")]
    InvalidValue(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gateway_config_validation() {
        assert!(GatewayConfig::default().validate().is_ok());
    }

    #[test]
    fn test_gateway_config_rejects_non_http_url() {
        let config = GatewayConfig {
            base_url: "ftp://parking.local".to_string(),
            ..GatewayConfig::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_zero_timeout_validation() {
        let config = GatewayConfig {
            request_timeout: 0, // Invalid timeout
            ..GatewayConfig::default()
        };

        assert!(config.validate().is_err());
    }

    #[test]
    fn test_max_retries_upper_bound() {
        let at_limit = GatewayConfig {
            max_retries: MAX_GATEWAY_RETRIES,
            ..GatewayConfig::default()
        };
        let too_many = GatewayConfig {
            max_retries: 70,
            ..GatewayConfig::default()
        };

        assert!(at_limit.validate().is_ok());
        assert!(too_many.validate().is_err());
    }

    #[test]
    fn test_default_poll_interval_is_five_seconds() {
        let config = VerificationConfig::default();
        assert_eq!(config.poll_interval(), Duration::from_secs(5));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_zero_poll_interval_validation() {
        let config = VerificationConfig { poll_interval_ms: 0 };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_log_level_validation() {
        let ok = LoggingConfig {
            level: "debug".to_string(),
            format: LogFormat::Plain,
        };
        let bad = LoggingConfig {
            level: "verbose".to_string(),
            format: LogFormat::Json,
        };

        assert!(ok.validate().is_ok());
        assert!(bad.validate().is_err());
    }
}
