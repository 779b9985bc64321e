use std::sync::Arc;

use axum::{
    routing::{delete, get, post},
    Extension, Json, Router,
};
use utoipa::OpenApi;

use crate::api::rest::{dto, handlers, problem};
use crate::domain::service::Service;

pub const BASE_PATH: &str = "/helpdesk/v1";

#[derive(OpenApi)]
#[openapi(
    info(title = "Helpdesk API", description = "Ticket tracking with automatic assignment"),
    paths(
        handlers::create_ticket,
        handlers::list_tickets,
        handlers::get_ticket,
        handlers::update_ticket,
        handlers::add_comment,
        handlers::attach_tag,
        handlers::detach_tag,
        handlers::dashboard,
        handlers::list_members,
    ),
    components(schemas(
        dto::TicketDto,
        dto::TagDto,
        dto::CommentDto,
        dto::MemberDto,
        dto::DashboardDto,
        dto::CreateTicketReq,
        dto::UpdateTicketReq,
        dto::CreateCommentReq,
        dto::TagReq,
        problem::Problem,
    )),
    tags(
        (name = "tickets", description = "Ticket lifecycle"),
        (name = "members", description = "Support roster")
    )
)]
pub struct HelpdeskApiDoc;

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(HelpdeskApiDoc::openapi())
}

fn path(suffix: &str) -> String {
    format!("{BASE_PATH}{suffix}")
}

pub fn register_routes(router: Router, service: Arc<Service>) -> anyhow::Result<Router> {
    let api = Router::new()
        .route(
            &path("/tickets"),
            get(handlers::list_tickets).post(handlers::create_ticket),
        )
        .route(&path("/tickets/dashboard"), get(handlers::dashboard))
        .route(
            &path("/tickets/{id}"),
            get(handlers::get_ticket).put(handlers::update_ticket),
        )
        .route(&path("/tickets/{id}/comments"), post(handlers::add_comment))
        .route(&path("/tickets/{id}/tags"), post(handlers::attach_tag))
        .route(
            &path("/tickets/{id}/tags/{tag_id}"),
            delete(handlers::detach_tag),
        )
        .route(&path("/members"), get(handlers::list_members))
        .route(&path("/openapi.json"), get(openapi_json))
        .layer(Extension(service));

    Ok(router.merge(api))
}
