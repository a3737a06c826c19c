use std::fmt::Display;

use thiserror::Error;

/// Failures surfaced by the console core and its data providers.
#[derive(Debug, Error)]
pub enum ConsoleError {
    /// A record is missing a required identifier or is otherwise malformed.
    #[error("Invalid record: {message}")]
    Validation { message: String },
    /// The requested event has no detail available.
    #[error("No event found with id {id}")]
    NotFound { id: String },
    /// A collaborator (HTTP backend, database) failed to answer.
    #[error("Fetch failed: {message}")]
    Fetch { message: String },
}

impl ConsoleError {
    pub fn validation(message: impl Into<String>) -> Self {
        ConsoleError::Validation {
            message: message.into(),
        }
    }

    pub fn not_found(id: impl Into<String>) -> Self {
        ConsoleError::NotFound { id: id.into() }
    }

    pub fn fetch(cause: impl Display) -> Self {
        ConsoleError::Fetch {
            message: cause.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, ConsoleError>;
