use thiserror::Error;

use crate::domain::error::DomainError;

/// Errors that are safe to expose to other modules
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HelpdeskError {
    #[error("Validation error: {message}")]
    Validation { message: String },

    /// The ticket exists but the write was refused (closed or stale).
    #[error("Conflict: {message}")]
    Conflict { message: String },

    #[error("No support member available for assignment")]
    Unavailable,

    #[error("Internal error")]
    Internal,
}

impl HelpdeskError {
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict {
            message: message.into(),
        }
    }

    pub fn internal() -> Self {
        Self::Internal
    }
}

impl From<DomainError> for HelpdeskError {
    fn from(domain_error: DomainError) -> Self {
        match domain_error {
            e @ DomainError::Validation { .. } => Self::validation(e.to_string()),
            e @ (DomainError::InvalidState { .. } | DomainError::ConcurrencyConflict { .. }) => {
                Self::conflict(e.to_string())
            }
            DomainError::NoAssigneeAvailable => Self::Unavailable,
            DomainError::Codec(_) | DomainError::Database { .. } => Self::internal(),
        }
    }
}
