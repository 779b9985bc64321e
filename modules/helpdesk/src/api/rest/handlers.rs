use std::sync::Arc;

use axum::{
    extract::Path,
    http::{StatusCode, Uri},
    response::Json,
    Extension,
};
use tracing::{error, info};
use uuid::Uuid;

use crate::api::rest::dto::{
    CommentDto, CreateCommentReq, CreateTicketReq, DashboardDto, MemberDto, TagReq, TicketDto,
    UpdateTicketReq,
};
use crate::api::rest::error::{bad_request, map_domain_error, ticket_not_found};
use crate::api::rest::problem::{Problem, ProblemResponse};
use crate::contract::model::TicketUpdate;
use crate::domain::service::Service;

/// Create a ticket and auto-assign it
#[utoipa::path(
    post,
    path = "/helpdesk/v1/tickets",
    tag = "tickets",
    request_body = CreateTicketReq,
    responses(
        (status = 201, description = "Created ticket, or the existing one for a repeated idempotency key", body = TicketDto),
        (status = 400, description = "Bad Request", body = Problem),
        (status = 503, description = "No active support member", body = Problem),
        (status = 500, description = "Internal Server Error", body = Problem)
    )
)]
pub async fn create_ticket(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Json(req_body): Json<CreateTicketReq>,
) -> Result<(StatusCode, Json<TicketDto>), ProblemResponse> {
    info!("Creating ticket: {}", req_body.title);

    match svc.create_ticket(req_body.into()).await {
        Ok(ticket) => Ok((StatusCode::CREATED, Json(TicketDto::from(ticket)))),
        Err(e) => {
            error!("Failed to create ticket: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// List all tickets, newest first
#[utoipa::path(
    get,
    path = "/helpdesk/v1/tickets",
    tag = "tickets",
    responses(
        (status = 200, description = "All tickets", body = [TicketDto]),
        (status = 500, description = "Internal Server Error", body = Problem)
    )
)]
pub async fn list_tickets(
    Extension(svc): Extension<Arc<Service>>,
    uri: Uri,
) -> Result<Json<Vec<TicketDto>>, ProblemResponse> {
    match svc.list_tickets().await {
        Ok(tickets) => Ok(Json(tickets.into_iter().map(TicketDto::from).collect())),
        Err(e) => {
            error!("Failed to list tickets: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

#[utoipa::path(
    get,
    path = "/helpdesk/v1/tickets/{id}",
    tag = "tickets",
    params(("id" = Uuid, Path, description = "Ticket id")),
    responses(
        (status = 200, description = "Ticket found", body = TicketDto),
        (status = 404, description = "Not Found", body = Problem),
        (status = 500, description = "Internal Server Error", body = Problem)
    )
)]
pub async fn get_ticket(
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
    uri: Uri,
) -> Result<Json<TicketDto>, ProblemResponse> {
    match svc.get_ticket(id).await {
        Ok(Some(ticket)) => Ok(Json(TicketDto::from(ticket))),
        Ok(None) => Err(ticket_not_found(id, uri.path())),
        Err(e) => {
            error!("Failed to get ticket {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Replace title, description and status; optionally the attachment
#[utoipa::path(
    put,
    path = "/helpdesk/v1/tickets/{id}",
    tag = "tickets",
    params(("id" = Uuid, Path, description = "Ticket id")),
    request_body = UpdateTicketReq,
    responses(
        (status = 200, description = "Updated ticket", body = TicketDto),
        (status = 400, description = "Bad Request", body = Problem),
        (status = 404, description = "Not Found", body = Problem),
        (status = 409, description = "Ticket is closed or was modified concurrently", body = Problem),
        (status = 500, description = "Internal Server Error", body = Problem)
    )
)]
pub async fn update_ticket(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
    Json(req_body): Json<UpdateTicketReq>,
) -> Result<Json<TicketDto>, ProblemResponse> {
    info!("Updating ticket {}", id);

    let update =
        TicketUpdate::try_from(req_body).map_err(|e| bad_request(e.to_string(), uri.path()))?;

    match svc.update_ticket(id, update).await {
        Ok(Some(ticket)) => Ok(Json(TicketDto::from(ticket))),
        Ok(None) => Err(ticket_not_found(id, uri.path())),
        Err(e) => {
            error!("Failed to update ticket {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

#[utoipa::path(
    post,
    path = "/helpdesk/v1/tickets/{id}/comments",
    tag = "tickets",
    params(("id" = Uuid, Path, description = "Ticket id")),
    request_body = CreateCommentReq,
    responses(
        (status = 200, description = "Added comment", body = CommentDto),
        (status = 400, description = "Bad Request", body = Problem),
        (status = 404, description = "Not Found", body = Problem),
        (status = 409, description = "Ticket is closed", body = Problem),
        (status = 500, description = "Internal Server Error", body = Problem)
    )
)]
pub async fn add_comment(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
    Json(req_body): Json<CreateCommentReq>,
) -> Result<Json<CommentDto>, ProblemResponse> {
    info!("Adding comment to ticket {}", id);

    match svc.add_comment(id, req_body.into()).await {
        Ok(Some(comment)) => Ok(Json(CommentDto::from(comment))),
        Ok(None) => Err(ticket_not_found(id, uri.path())),
        Err(e) => {
            error!("Failed to add comment to ticket {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Attach a tag by name, creating it if needed
#[utoipa::path(
    post,
    path = "/helpdesk/v1/tickets/{id}/tags",
    tag = "tickets",
    params(("id" = Uuid, Path, description = "Ticket id")),
    request_body = TagReq,
    responses(
        (status = 200, description = "Ticket with the tag attached", body = TicketDto),
        (status = 400, description = "Tag name is required", body = Problem),
        (status = 404, description = "Not Found", body = Problem),
        (status = 500, description = "Internal Server Error", body = Problem)
    )
)]
pub async fn attach_tag(
    uri: Uri,
    Extension(svc): Extension<Arc<Service>>,
    Path(id): Path<Uuid>,
    Json(req_body): Json<TagReq>,
) -> Result<Json<TicketDto>, ProblemResponse> {
    info!("Attaching tag '{}' to ticket {}", req_body.name, id);

    match svc.attach_tag(id, &req_body.name).await {
        Ok(Some(ticket)) => Ok(Json(TicketDto::from(ticket))),
        Ok(None) => Err(ticket_not_found(id, uri.path())),
        Err(e) => {
            error!("Failed to attach tag to ticket {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

#[utoipa::path(
    delete,
    path = "/helpdesk/v1/tickets/{id}/tags/{tag_id}",
    tag = "tickets",
    params(
        ("id" = Uuid, Path, description = "Ticket id"),
        ("tag_id" = Uuid, Path, description = "Tag id")
    ),
    responses(
        (status = 200, description = "Ticket without the tag", body = TicketDto),
        (status = 404, description = "Not Found", body = Problem),
        (status = 500, description = "Internal Server Error", body = Problem)
    )
)]
pub async fn detach_tag(
    Extension(svc): Extension<Arc<Service>>,
    Path((id, tag_id)): Path<(Uuid, Uuid)>,
    uri: Uri,
) -> Result<Json<TicketDto>, ProblemResponse> {
    info!("Detaching tag {} from ticket {}", tag_id, id);

    match svc.detach_tag(id, tag_id).await {
        Ok(Some(ticket)) => Ok(Json(TicketDto::from(ticket))),
        Ok(None) => Err(ticket_not_found(id, uri.path())),
        Err(e) => {
            error!("Failed to detach tag from ticket {}: {}", id, e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

#[utoipa::path(
    get,
    path = "/helpdesk/v1/tickets/dashboard",
    tag = "tickets",
    responses(
        (status = 200, description = "Ticket counts", body = DashboardDto),
        (status = 500, description = "Internal Server Error", body = Problem)
    )
)]
pub async fn dashboard(
    Extension(svc): Extension<Arc<Service>>,
    uri: Uri,
) -> Result<Json<DashboardDto>, ProblemResponse> {
    match svc.dashboard().await {
        Ok(stats) => Ok(Json(DashboardDto::from(stats))),
        Err(e) => {
            error!("Failed to compute dashboard: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}

/// Active support members ordered by name
#[utoipa::path(
    get,
    path = "/helpdesk/v1/members",
    tag = "members",
    responses(
        (status = 200, description = "Active members", body = [MemberDto]),
        (status = 500, description = "Internal Server Error", body = Problem)
    )
)]
pub async fn list_members(
    Extension(svc): Extension<Arc<Service>>,
    uri: Uri,
) -> Result<Json<Vec<MemberDto>>, ProblemResponse> {
    match svc.list_members().await {
        Ok(members) => Ok(Json(members.into_iter().map(MemberDto::from).collect())),
        Err(e) => {
            error!("Failed to list members: {}", e);
            Err(map_domain_error(&e, uri.path()))
        }
    }
}
