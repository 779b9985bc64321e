use axum::{
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

pub const APPLICATION_PROBLEM_JSON: &str = "application/problem+json";

/// Base of the `type` URI; the error code is appended.
const PROBLEM_TYPE_BASE: &str = "https://errors.example.com/";

/// Error body returned by every helpdesk endpoint (RFC 9457 shape).
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
#[schema(title = "Problem", description = "Helpdesk error response")]
pub struct Problem {
    #[serde(rename = "type")]
    pub type_url: String,
    pub title: String,
    pub status: u16,
    pub detail: String,
    /// The request path that produced the problem.
    pub instance: String,
    /// Stable machine-readable code, e.g. `HELPDESK_TICKET_CLOSED`.
    pub code: String,
    /// Id of the tracing span that handled the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub trace_id: Option<String>,
}

impl Problem {
    /// Builds a problem for `instance`, tagged with the current span id when
    /// the request is being traced.
    pub fn new(
        status: StatusCode,
        code: &str,
        title: &str,
        detail: impl Into<String>,
        instance: &str,
    ) -> Self {
        Self {
            type_url: format!("{PROBLEM_TYPE_BASE}{code}"),
            title: title.to_string(),
            status: status.as_u16(),
            detail: detail.into(),
            instance: instance.to_string(),
            code: code.to_string(),
            trace_id: tracing::Span::current()
                .id()
                .map(|id| id.into_u64().to_string()),
        }
    }
}

/// Renders a [`Problem`] with its status and `application/problem+json`.
#[derive(Debug, Clone)]
pub struct ProblemResponse(pub Problem);

impl IntoResponse for ProblemResponse {
    fn into_response(self) -> Response {
        let status =
            StatusCode::from_u16(self.0.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut resp = axum::Json(self.0).into_response();
        *resp.status_mut() = status;
        resp.headers_mut().insert(
            header::CONTENT_TYPE,
            HeaderValue::from_static(APPLICATION_PROBLEM_JSON),
        );
        resp
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn response_carries_status_and_problem_content_type() {
        let p = Problem::new(
            StatusCode::CONFLICT,
            "HELPDESK_TICKET_CLOSED",
            "Ticket is closed",
            "ticket is closed",
            "/helpdesk/v1/tickets/1",
        );
        let resp = ProblemResponse(p).into_response();
        assert_eq!(resp.status(), StatusCode::CONFLICT);
        let ct = resp
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("");
        assert_eq!(ct, APPLICATION_PROBLEM_JSON);
    }

    #[test]
    fn type_uri_is_derived_from_code() {
        let p = Problem::new(
            StatusCode::NOT_FOUND,
            "HELPDESK_TICKET_NOT_FOUND",
            "Ticket not found",
            "no such ticket",
            "/helpdesk/v1/tickets/1",
        );

        assert_eq!(p.status, 404);
        assert_eq!(p.instance, "/helpdesk/v1/tickets/1");
        // No span is entered in a plain unit test.
        assert_eq!(p.trace_id, None);

        let json = serde_json::to_value(&p).unwrap();
        assert_eq!(
            json["type"],
            "https://errors.example.com/HELPDESK_TICKET_NOT_FOUND"
        );
        assert!(json.get("trace_id").is_none());
    }
}
