use thiserror::Error;

/// Error taxonomy for the data layer.
///
/// Classification happens once, at the boundary where a raw transport or
/// response error is first observed. Callers match on variants instead of
/// re-inspecting message strings.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DataError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Rate limit exceeded")]
    RateLimited,

    #[error("Server error {status}: {message}")]
    Server { status: u16, message: String },

    #[error("Authentication failed: {0}")]
    Auth(String),

    #[error("Permission denied: {0}")]
    Permission(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Data client is not initialized")]
    NotInitialized,

    #[error("Unexpected error: {0}")]
    Unknown(String),
}

pub type DataResult<T> = Result<T, DataError>;

impl DataError {
    /// Classify an HTTP-shaped failure by status code and response body.
    pub fn from_status(status: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status {
            401 => DataError::Auth(message),
            403 => DataError::Permission(message),
            404 => DataError::NotFound(message),
            408 => DataError::Timeout(message),
            429 => DataError::RateLimited,
            400 | 422 => {
                // JWT and row-level-security failures surface as 400 on some
                // gateways; keep them in their own variants.
                let lower = message.to_lowercase();
                if lower.contains("jwt") {
                    DataError::Auth(message)
                } else if lower.contains("row-level security") || lower.contains("policy") {
                    DataError::Permission(message)
                } else {
                    DataError::Validation(message)
                }
            }
            500..=599 => DataError::Server { status, message },
            _ => DataError::Unknown(format!("HTTP {}: {}", status, message)),
        }
    }

    /// Whether a retry can reasonably be expected to succeed.
    ///
    /// Covers 5xx, 429, 408 and transport-level network failures; everything
    /// else (validation, auth, permission, not-found) fails fast.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            DataError::Network(_)
                | DataError::Timeout(_)
                | DataError::RateLimited
                | DataError::Server { .. }
        )
    }
}

impl From<reqwest::Error> for DataError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            DataError::Timeout(format!("Connection timeout: {}", err))
        } else if err.is_connect() {
            DataError::Network(format!("Connection failed: {}", err))
        } else if let Some(status) = err.status() {
            DataError::from_status(status.as_u16(), err.to_string())
        } else {
            DataError::Network(format!("Network error: {}", err))
        }
    }
}
