use axum::http::StatusCode;
use uuid::Uuid;

use crate::api::rest::problem::{Problem, ProblemResponse};
use crate::domain::error::DomainError;
use crate::infra::crypto::CodecError;

fn from_parts(
    status: StatusCode,
    code: &str,
    title: &str,
    detail: impl Into<String>,
    instance: &str,
) -> ProblemResponse {
    ProblemResponse(Problem::new(status, code, title, detail, instance))
}

pub fn ticket_not_found(id: Uuid, instance: &str) -> ProblemResponse {
    from_parts(
        StatusCode::NOT_FOUND,
        "HELPDESK_TICKET_NOT_FOUND",
        "Ticket not found",
        format!("Ticket with id {} was not found", id),
        instance,
    )
}

pub fn bad_request(detail: impl Into<String>, instance: &str) -> ProblemResponse {
    from_parts(
        StatusCode::BAD_REQUEST,
        "HELPDESK_VALIDATION",
        "Validation error",
        detail,
        instance,
    )
}

/// Map domain error to RFC9457 ProblemResponse
pub fn map_domain_error(e: &DomainError, instance: &str) -> ProblemResponse {
    match e {
        DomainError::Validation { .. } => bad_request(e.to_string(), instance),
        DomainError::InvalidState { .. } => from_parts(
            StatusCode::CONFLICT,
            "HELPDESK_TICKET_CLOSED",
            "Ticket is closed",
            e.to_string(),
            instance,
        ),
        DomainError::ConcurrencyConflict { .. } => from_parts(
            StatusCode::CONFLICT,
            "HELPDESK_CONCURRENCY_CONFLICT",
            "Concurrent modification",
            e.to_string(),
            instance,
        ),
        DomainError::NoAssigneeAvailable => from_parts(
            StatusCode::SERVICE_UNAVAILABLE,
            "HELPDESK_NO_ASSIGNEE",
            "No assignee available",
            e.to_string(),
            instance,
        ),
        DomainError::Codec(codec) => {
            tracing::error!(error = ?codec, "Attachment codec failure");
            let detail = match codec {
                CodecError::NotConfigured => "Attachment encryption is not configured",
                CodecError::Crypto(_) => "Stored attachment could not be processed",
            };
            from_parts(
                StatusCode::INTERNAL_SERVER_ERROR,
                "HELPDESK_ATTACHMENT_CODEC",
                "Internal error",
                detail,
                instance,
            )
        }
        DomainError::Database { .. } => {
            // Log the internal error details but don't expose them to the client
            tracing::error!(error = ?e, "Database error occurred");
            from_parts(
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_DB",
                "Internal error",
                "An internal database error occurred",
                instance,
            )
        }
    }
}
