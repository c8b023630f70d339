//! Unified error handling for shipdash-core
//!
//! # Example
//!
//! ```rust
//! use shipdash_core::CoreError;
//!
//! let err = CoreError::Http { status: 404, body: "no such job".to_string() };
//! assert!(err.is_not_found());
//! assert!(!err.is_retryable());
//! ```

use crate::config::ConfigError;
use thiserror::Error;

/// Core error type
#[derive(Error, Debug)]
pub enum CoreError {
    /// The HTTP request could not be sent or its body could not be read
    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The backend answered with a non-success status code
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// The response body did not have the expected shape
    #[error("Malformed response: {0}")]
    Decode(String),

    /// Input rejected before anything was sent
    #[error("Validation error: {0}")]
    Validation(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The operation reached a failed terminal state
    #[error("Operation failed: {0}")]
    OperationFailed(String),

    /// No terminal state was observed within the configured number of polls
    #[error("Operation did not finish after {0} status checks")]
    AttemptsExhausted(u32),

    /// Polling was cancelled before a terminal state was observed
    #[error("Polling was cancelled")]
    Cancelled,
}

/// Result type alias for core operations
pub type Result<T> = std::result::Result<T, CoreError>;

impl CoreError {
    /// Returns true if this is a "not found" error (404)
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, CoreError::Http { status: 404, .. })
    }

    /// Returns true if this is an authentication/authorization error (401/403)
    #[must_use]
    pub fn is_unauthorized(&self) -> bool {
        matches!(self, CoreError::Http { status: 401 | 403, .. })
    }

    /// Returns true if this is a server error (5xx)
    #[must_use]
    pub fn is_server_error(&self) -> bool {
        matches!(self, CoreError::Http { status, .. } if (500..600).contains(status))
    }

    /// Returns true if this is a timeout, either from the transport or from polling
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        match self {
            CoreError::Request(e) => e.is_timeout(),
            CoreError::AttemptsExhausted(_) => true,
            _ => false,
        }
    }

    /// Returns true if this error is potentially retryable
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            CoreError::Request(e) => e.is_timeout() || e.is_connect(),
            CoreError::Http { status, .. } => *status == 429 || (500..600).contains(status),
            CoreError::AttemptsExhausted(_) => true,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_helpers() {
        let not_found = CoreError::Http {
            status: 404,
            body: "missing".to_string(),
        };
        assert!(not_found.is_not_found());
        assert!(!not_found.is_server_error());
        assert!(!not_found.is_retryable());

        let forbidden = CoreError::Http {
            status: 403,
            body: String::new(),
        };
        assert!(forbidden.is_unauthorized());

        let unavailable = CoreError::Http {
            status: 503,
            body: "maintenance".to_string(),
        };
        assert!(unavailable.is_server_error());
        assert!(unavailable.is_retryable());

        let throttled = CoreError::Http {
            status: 429,
            body: String::new(),
        };
        assert!(throttled.is_retryable());
        assert!(!throttled.is_server_error());
    }

    #[test]
    fn test_attempts_exhausted_is_timeout() {
        let err = CoreError::AttemptsExhausted(3);
        assert!(err.is_timeout());
        assert!(err.is_retryable());
        assert!(err.to_string().contains("3 status checks"));
    }

    #[test]
    fn test_validation_not_retryable() {
        let err = CoreError::Validation("end date before start date".to_string());
        assert!(!err.is_retryable());
        assert!(!err.is_timeout());
    }

    #[test]
    fn test_config_error_converts() {
        let err: CoreError = ConfigError::ProfileNotFound {
            name: "prod".to_string(),
        }
        .into();
        assert!(err.to_string().contains("Profile 'prod' not found"));
    }

    #[test]
    fn test_display() {
        let err = CoreError::OperationFailed("database unavailable".to_string());
        assert_eq!(err.to_string(), "Operation failed: database unavailable");
        assert_eq!(CoreError::Cancelled.to_string(), "Polling was cancelled");
    }
}
