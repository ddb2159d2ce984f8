use thiserror::Error;

/// Failure of a call into one of the backend services.
///
/// Everything here is a network-class error from the composer's point of
/// view: it is surfaced to the user and never retried automatically.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// Transport failed (connect, timeout, TLS, ...)
    #[error("request failed: {0}")]
    Network(String),

    /// Service answered with a non-success status
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    #[error("authentication required")]
    Unauthorized,

    #[error("not found: {0}")]
    NotFound(String),

    /// Response body did not match the expected shape
    #[error("failed to parse response: {0}")]
    Parse(String),

    #[error("invalid backend url: {0}")]
    InvalidUrl(String),
}

impl BackendError {
    /// Timeouts, connection drops and 5xx are worth a manual retry.
    pub fn is_transient(&self) -> bool {
        match self {
            BackendError::Network(_) => true,
            BackendError::Server { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }
}

impl From<reqwest::Error> for BackendError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_decode() {
            BackendError::Parse(error.to_string())
        } else {
            BackendError::Network(error.to_string())
        }
    }
}
