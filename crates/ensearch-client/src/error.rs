//! Client error types

use std::sync::Arc;

use ensearch_core::ErrorBody;
use thiserror::Error;

/// Errors are `Clone` so one in-flight request can hand the same failure
/// to every caller waiting on it.
#[derive(Error, Debug, Clone)]
pub enum ClientError {
    #[error("HTTP error: {0}")]
    Http(Arc<reqwest::Error>),

    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Too many inputs: got {count}, max is {max}")]
    TooManyInputs { count: usize, max: usize },

    #[error("Server error: {status} - {message}")]
    Server { status: u16, message: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Invalid URL: {0}")]
    Url(#[from] url::ParseError),

    #[error("Empty query")]
    EmptyQuery,
}

impl ClientError {
    /// Network or backend failure, as opposed to a definitive answer
    pub fn is_transport(&self) -> bool {
        matches!(
            self,
            ClientError::Http(_) | ClientError::Server { .. } | ClientError::InvalidResponse(_)
        )
    }

    /// Whether this error means "there is no profile" rather than "lookup broke"
    pub fn is_no_profile(&self) -> bool {
        matches!(
            self,
            ClientError::NotFound(_) | ClientError::InvalidFormat(_) | ClientError::EmptyQuery
        )
    }

    /// HTTP status equivalent, when there is one
    pub fn status(&self) -> Option<u16> {
        match self {
            ClientError::InvalidFormat(_) => Some(400),
            ClientError::NotFound(_) => Some(404),
            ClientError::TooManyInputs { .. } => Some(400),
            ClientError::Server { status, .. } => Some(*status),
            ClientError::Http(err) => err.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for ClientError {
    fn from(err: reqwest::Error) -> Self {
        ClientError::Http(Arc::new(err))
    }
}

impl From<ensearch_core::Error> for ClientError {
    fn from(err: ensearch_core::Error) -> Self {
        match err {
            ensearch_core::Error::InvalidFormat(msg) => ClientError::InvalidFormat(msg),
            ensearch_core::Error::NotFound(msg) => ClientError::NotFound(msg),
            ensearch_core::Error::TooManyInputs { count, max } => {
                ClientError::TooManyInputs { count, max }
            }
        }
    }
}

impl From<&ClientError> for ErrorBody {
    fn from(err: &ClientError) -> Self {
        ErrorBody {
            status: err.status().unwrap_or(500),
            error: err.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ClientError>;
