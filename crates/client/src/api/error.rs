//! REST API error types.

use thiserror::Error;

/// Errors that can occur when talking to the marketplace backend.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The backend rejected the token or credentials (401/403, or `valid: false`).
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// The request did not complete within its timeout.
    #[error("Request timed out")]
    Timeout,

    /// Connection or transport failure.
    #[error("HTTP error: {0}")]
    Http(reqwest::Error),

    /// Any other non-success status.
    #[error("Backend returned {status}: {message}")]
    Status {
        /// HTTP status code.
        status: u16,
        /// Error message from the body, or the truncated body.
        message: String,
    },

    /// The response body was not the expected JSON.
    #[error("JSON parse error: {0}")]
    Parse(#[from] serde_json::Error),

    /// An endpoint path could not be joined to the base URL.
    #[error("Invalid endpoint URL: {0}")]
    Url(#[from] url::ParseError),
}

impl ApiError {
    /// Whether the backend definitively rejected the caller.
    ///
    /// These errors are terminal for token verification: no retry, forced logout.
    #[must_use]
    pub const fn is_auth_rejection(&self) -> bool {
        matches!(self, Self::Unauthorized(_))
    }

    /// Whether retrying later may succeed (network trouble or a server-side fault).
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        match self {
            Self::Timeout | Self::Http(_) => true,
            Self::Status { status, .. } => *status >= 500 || *status == 429 || *status == 408,
            Self::Unauthorized(_) | Self::Parse(_) | Self::Url(_) => false,
        }
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else {
            Self::Http(err)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classification() {
        assert!(ApiError::Unauthorized("expired".into()).is_auth_rejection());
        assert!(!ApiError::Unauthorized("expired".into()).is_transient());

        assert!(ApiError::Timeout.is_transient());
        assert!(!ApiError::Timeout.is_auth_rejection());

        let unavailable = ApiError::Status {
            status: 503,
            message: "down".into(),
        };
        assert!(unavailable.is_transient());

        let bad_request = ApiError::Status {
            status: 400,
            message: "nope".into(),
        };
        assert!(!bad_request.is_transient());
        assert!(!bad_request.is_auth_rejection());
    }

    #[test]
    fn test_display() {
        let err = ApiError::Status {
            status: 502,
            message: "bad gateway".into(),
        };
        assert_eq!(err.to_string(), "Backend returned 502: bad gateway");
    }
}
