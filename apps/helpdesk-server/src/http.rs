use std::time::Duration;

use axum::{
    body::Body,
    http::{HeaderName, Request, StatusCode},
    routing::get,
    Router,
};
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use tracing::field::Empty;

pub fn request_id_header() -> HeaderName {
    HeaderName::from_static("x-request-id")
}

async fn health_check() -> StatusCode {
    StatusCode::OK
}

/// Wrap module routes with the HTTP middleware stack.
///
/// Layer order, outermost first: request-id propagate, request-id set, trace, timeout.
pub fn build_router(routes: Router, timeout_sec: u64) -> Router {
    let x_request_id = request_id_header();

    let mut router = routes.route("/health", get(health_check));

    if timeout_sec > 0 {
        router = router.layer(TimeoutLayer::new(Duration::from_secs(timeout_sec)));
    }

    router
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                let rid = req
                    .headers()
                    .get(request_id_header())
                    .and_then(|v| v.to_str().ok())
                    .unwrap_or("n/a");
                tracing::info_span!(
                    "http_request",
                    method = %req.method(),
                    uri = %req.uri().path(),
                    request_id = %rid,
                    status = Empty,
                    latency_ms = Empty
                )
            }),
        )
        .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
        .layer(PropagateRequestIdLayer::new(x_request_id))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tower::ServiceExt;

    #[tokio::test]
    async fn health_sets_request_id() {
        let app = build_router(Router::new(), 5);
        let resp = app
            .oneshot(Request::builder().uri("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(resp.status(), StatusCode::OK);
        assert!(resp.headers().contains_key(request_id_header()));
    }

    #[tokio::test]
    async fn client_request_id_is_propagated() {
        let app = build_router(Router::new(), 0);
        let resp = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .header(request_id_header(), "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(resp.headers()[request_id_header()], "abc-123");
    }
}
