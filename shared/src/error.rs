//! Error types for the booking Lambda functions.

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in the booking Lambda functions.
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// AWS SDK error
    #[error("AWS error: {0}")]
    Aws(String),

    /// Validation error
    #[error("Validation error: {0}")]
    Validation(String),

    /// Webhook signature rejected
    #[error("Signature error: {0}")]
    Signature(String),

    /// Not found error
    #[error("Not found: {0}")]
    NotFound(String),

    /// Third-party API answered with an unexpected status or payload
    #[error("{service} error ({status}): {message}")]
    Upstream {
        service: &'static str,
        status: u16,
        message: String,
    },

    /// Transport-level HTTP failure
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Get HTTP status code for this error.
    pub fn status_code(&self) -> u16 {
        match self {
            Error::Validation(_) => 400,
            Error::Signature(_) => 401,
            Error::NotFound(_) => 404,
            Error::Upstream { .. } | Error::Http(_) => 502,
            _ => 500,
        }
    }

    pub(crate) fn upstream(service: &'static str, status: u16, message: impl Into<String>) -> Self {
        Error::Upstream {
            service,
            status,
            message: message.into(),
        }
    }
}

impl From<validator::ValidationErrors> for Error {
    fn from(errors: validator::ValidationErrors) -> Self {
        Error::Validation(errors.to_string())
    }
}
