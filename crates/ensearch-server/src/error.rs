//! Server error types

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use ensearch_core::ErrorBody;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ServerError {
    #[error(transparent)]
    Lookup(#[from] ensearch_core::Error),

    #[error("Unknown route")]
    UnknownRoute,

    #[error("No directory source configured")]
    NoSource,

    #[error("Failed to read directory {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid directory entry: {0}")]
    InvalidEntry(String),

    #[error("Invalid directory JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl ServerError {
    /// Get the HTTP status code for this error
    pub fn status(&self) -> StatusCode {
        match self {
            ServerError::Lookup(e) => {
                StatusCode::from_u16(e.status()).unwrap_or(StatusCode::BAD_REQUEST)
            }
            ServerError::UnknownRoute => StatusCode::NOT_FOUND,
            ServerError::NoSource => StatusCode::CONFLICT,
            ServerError::Io { .. } => StatusCode::INTERNAL_SERVER_ERROR,
            ServerError::InvalidEntry(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::Json(_) => StatusCode::UNPROCESSABLE_ENTITY,
            ServerError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<&ServerError> for ErrorBody {
    fn from(err: &ServerError) -> Self {
        ErrorBody {
            status: err.status().as_u16(),
            error: err.to_string(),
        }
    }
}

impl IntoResponse for ServerError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(error = %self, "Request failed");
        }
        (status, Json(ErrorBody::from(&self))).into_response()
    }
}

pub type Result<T> = std::result::Result<T, ServerError>;
