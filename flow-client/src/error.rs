//! Error types for flow-client.

use thiserror::Error;

/// Result type for client operations.
pub type ClientResult<T> = Result<T, ClientError>;

/// Errors that can occur when talking to the onboarding backend or local storage.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The base URL provided by configuration is invalid.
    #[error("invalid onboarding API URL: {0}")]
    InvalidUrl(String),
    /// HTTP layer failed (connection, timeout, etc.).
    #[error("onboarding API request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// JSON parsing failed.
    #[error("failed to parse onboarding payload: {0}")]
    Json(#[from] serde_json::Error),
    /// The flow configuration was rejected by the core.
    #[error("invalid flow configuration: {0}")]
    Flow(#[from] flow_core::FlowError),
    /// Local persistence failed.
    #[error("storage error: {0}")]
    Io(#[from] std::io::Error),
    /// The server answered with a non-success status.
    #[error("onboarding API returned {status}: {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Response body or reason.
        message: String,
    },
    /// SDK configuration is incomplete.
    #[error("invalid SDK configuration: {0}")]
    Config(String),
}

impl ClientError {
    /// Returns true for transient failures worth retrying.
    ///
    /// Transport errors, rate limiting and server errors are retryable;
    /// client errors and local failures are not.
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Http(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_status_retryability() {
        let server = ClientError::Api {
            status: 503,
            message: "unavailable".into(),
        };
        assert!(server.is_retryable());

        let limited = ClientError::Api {
            status: 429,
            message: "slow down".into(),
        };
        assert!(limited.is_retryable());

        let unauthorized = ClientError::Api {
            status: 401,
            message: "bad key".into(),
        };
        assert!(!unauthorized.is_retryable());
    }

    #[test]
    fn test_local_errors_not_retryable() {
        assert!(!ClientError::InvalidUrl("x".into()).is_retryable());
        assert!(!ClientError::Config("missing key".into()).is_retryable());
        let io = ClientError::from(std::io::Error::other("disk"));
        assert!(!io.is_retryable());
    }
}
