use thiserror::Error;
use uuid::Uuid;

use crate::contract::model::TicketStatus;
use crate::infra::crypto::CodecError;

/// Domain-specific errors using thiserror
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DomainError {
    #[error("Validation failed: {field}: {message}")]
    Validation { field: String, message: String },

    #[error("Ticket {id} is {status} and cannot be modified")]
    InvalidState { id: Uuid, status: TicketStatus },

    #[error("No active support member available for assignment")]
    NoAssigneeAvailable,

    #[error("Ticket {id} was modified concurrently; reload and retry")]
    ConcurrencyConflict { id: Uuid },

    #[error(transparent)]
    Codec(#[from] CodecError),

    #[error("Database error: {message}")]
    Database { message: String },
}

impl DomainError {
    pub fn validation(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Validation {
            field: field.into(),
            message: message.into(),
        }
    }

    pub fn invalid_state(id: Uuid, status: TicketStatus) -> Self {
        Self::InvalidState { id, status }
    }

    pub fn no_assignee_available() -> Self {
        Self::NoAssigneeAvailable
    }

    pub fn concurrency_conflict(id: Uuid) -> Self {
        Self::ConcurrencyConflict { id }
    }

    pub fn database(message: impl Into<String>) -> Self {
        Self::Database {
            message: message.into(),
        }
    }

    /// Recover a typed error carried through an `anyhow` port boundary.
    ///
    /// Storage adapters raise `DomainError` / `CodecError` for conditions the
    /// caller must see (stale token, closed ticket, cipher failure); anything
    /// else is reported as a database error.
    pub fn from_port(err: anyhow::Error) -> Self {
        let err = match err.downcast::<DomainError>() {
            Ok(domain) => return domain,
            Err(err) => err,
        };
        match err.downcast::<CodecError>() {
            Ok(codec) => Self::Codec(codec),
            Err(err) => Self::database(format!("{err:#}")),
        }
    }
}
