//! Core error types

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Error {
    #[error("Invalid format: {0}")]
    InvalidFormat(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Too many inputs: got {count}, max is {max}")]
    TooManyInputs { count: usize, max: usize },
}

impl Error {
    /// HTTP status equivalent of this error
    pub fn status(&self) -> u16 {
        match self {
            Error::InvalidFormat(_) => 400,
            Error::NotFound(_) => 404,
            Error::TooManyInputs { .. } => 400,
        }
    }
}
