use thiserror::Error;

pub type GatewayResult<T> = Result<T, GatewayError>;

#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    #[error("Not found: {message}")]
    NotFound { message: String },

    #[error("Network error: {message}")]
    Network { message: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Rate limit exceeded: {message}")]
    RateLimited { message: String },

    #[error("Server error: status={status}, message={message}")]
    Server { status: u16, message: String },

    #[error("Request rejected by backend: {message}")]
    Rejected { message: String },

    #[error("Invalid response: {message}")]
    InvalidResponse { message: String },

    #[error("Validation error: {message}")]
    Validation {
        message: String,
        field: Option<String>,
    },
}

impl GatewayError {
    pub fn not_found(message: impl Into<String>) -> Self {
        GatewayError::NotFound {
            message: message.into(),
        }
    }

    pub fn network(message: impl Into<String>) -> Self {
        GatewayError::Network {
            message: message.into(),
        }
    }

    pub fn server(status: u16, message: impl Into<String>) -> Self {
        GatewayError::Server {
            status,
            message: message.into(),
        }
    }

    /// A 404 on a lookup means "nothing there", not a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, GatewayError::NotFound { .. })
    }

    pub fn is_retryable(&self) -> bool {
        match self {
            GatewayError::NotFound { .. } => false,
            GatewayError::Network { .. } => true,
            GatewayError::Timeout { .. } => true,
            GatewayError::RateLimited { .. } => true,
            GatewayError::Server { .. } => true,
            GatewayError::Rejected { .. } => false,
            GatewayError::InvalidResponse { .. } => false,
            GatewayError::Validation { .. } => false,
        }
    }

    pub fn status_code(&self) -> Option<u16> {
        match self {
            GatewayError::NotFound { .. } => Some(404),
            GatewayError::RateLimited { .. } => Some(429),
            GatewayError::Server { status, .. } => Some(*status),
            _ => None,
        }
    }

    pub fn user_message(&self) -> String {
        match self {
            GatewayError::NotFound { .. } => "Nothing was found for this request".to_string(),
            GatewayError::Network { .. } | GatewayError::Timeout { .. } => {
                "The parking service is temporarily unreachable".to_string()
            }
            GatewayError::RateLimited { .. } => {
                "Too many requests. Please retry shortly".to_string()
            }
            GatewayError::Server { .. } => "The parking service returned an error".to_string(),
            GatewayError::Rejected { message } => message.clone(),
            GatewayError::InvalidResponse { .. } => {
                "The parking service sent an unexpected response".to_string()
            }
            GatewayError::Validation { message, .. } => message.clone(),
        }
    }
}
