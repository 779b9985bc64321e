use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

use crate::contract::model::{
    DashboardStats, NewAttachment, NewComment, NewTicket, SupportMember, Tag, TicketComment,
    TicketStatus, TicketUpdate, TicketView, UnknownStatus,
};

/// REST DTO for ticket representation with serde/utoipa
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TicketDto {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub requester_name: String,
    pub created_at: DateTime<Utc>,
    /// Display name, empty when the assignee is unknown or inactive
    pub assigned_support_member: String,
    /// One of `Open`, `InProgress`, `Resolved`, `Closed`
    pub status: String,
    pub attachment_file_name: Option<String>,
    pub attachment_content_type: Option<String>,
    pub attachment_base64: Option<String>,
    pub idempotency_key: Option<String>,
    /// Opaque; send it back on update to guard against lost writes
    pub concurrency_token: Option<String>,
    /// Sorted case-insensitively by name
    pub tags: Vec<TagDto>,
    pub comments: Vec<CommentDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TagDto {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CommentDto {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub author_name: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MemberDto {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DashboardDto {
    pub total_tickets: u64,
    pub in_progress_tickets: u64,
    pub unresolved_tickets: u64,
}

/// REST DTO for creating a ticket
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateTicketReq {
    pub title: String,
    pub description: String,
    pub requester_name: String,
    #[serde(default)]
    pub idempotency_key: Option<String>,
    #[serde(default)]
    pub attachment_base64: Option<String>,
    #[serde(default)]
    pub attachment_file_name: Option<String>,
    #[serde(default)]
    pub attachment_content_type: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

/// REST DTO for replacing the editable fields of a ticket
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct UpdateTicketReq {
    pub title: String,
    pub description: String,
    pub status: String,
    #[serde(default)]
    pub attachment_base64: Option<String>,
    #[serde(default)]
    pub attachment_file_name: Option<String>,
    #[serde(default)]
    pub attachment_content_type: Option<String>,
    #[serde(default)]
    pub concurrency_token: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct CreateCommentReq {
    pub author_name: String,
    pub message: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TagReq {
    pub name: String,
}

// Conversion implementations between REST DTOs and contract models

fn new_attachment(
    data_base64: Option<String>,
    file_name: Option<String>,
    content_type: Option<String>,
) -> Option<NewAttachment> {
    data_base64.map(|data_base64| NewAttachment {
        file_name,
        content_type,
        data_base64,
    })
}

impl From<TicketView> for TicketDto {
    fn from(t: TicketView) -> Self {
        Self {
            id: t.id,
            title: t.title,
            description: t.description,
            requester_name: t.requester_name,
            created_at: t.created_at,
            assigned_support_member: t.assigned_support_member,
            status: t.status.to_string(),
            attachment_file_name: t.attachment_file_name,
            attachment_content_type: t.attachment_content_type,
            attachment_base64: t.attachment_base64,
            idempotency_key: t.idempotency_key,
            concurrency_token: t.concurrency_token,
            tags: t.tags.into_iter().map(TagDto::from).collect(),
            comments: t.comments.into_iter().map(CommentDto::from).collect(),
        }
    }
}

impl From<Tag> for TagDto {
    fn from(t: Tag) -> Self {
        Self {
            id: t.id,
            name: t.name,
        }
    }
}

impl From<TicketComment> for CommentDto {
    fn from(c: TicketComment) -> Self {
        Self {
            id: c.id,
            ticket_id: c.ticket_id,
            author_name: c.author_name,
            message: c.message,
            created_at: c.created_at,
        }
    }
}

impl From<SupportMember> for MemberDto {
    fn from(m: SupportMember) -> Self {
        Self {
            id: m.id,
            name: m.name,
        }
    }
}

impl From<DashboardStats> for DashboardDto {
    fn from(s: DashboardStats) -> Self {
        Self {
            total_tickets: s.total,
            in_progress_tickets: s.in_progress,
            unresolved_tickets: s.unresolved,
        }
    }
}

impl From<CreateTicketReq> for NewTicket {
    fn from(req: CreateTicketReq) -> Self {
        Self {
            title: req.title,
            description: req.description,
            requester_name: req.requester_name,
            idempotency_key: req.idempotency_key,
            attachment: new_attachment(
                req.attachment_base64,
                req.attachment_file_name,
                req.attachment_content_type,
            ),
            tags: req.tags,
        }
    }
}

impl TryFrom<UpdateTicketReq> for TicketUpdate {
    type Error = UnknownStatus;

    fn try_from(req: UpdateTicketReq) -> Result<Self, Self::Error> {
        let status: TicketStatus = req.status.parse()?;
        Ok(Self {
            title: req.title,
            description: req.description,
            status,
            attachment: new_attachment(
                req.attachment_base64,
                req.attachment_file_name,
                req.attachment_content_type,
            ),
            concurrency_token: req.concurrency_token,
        })
    }
}

impl From<CreateCommentReq> for NewComment {
    fn from(req: CreateCommentReq) -> Self {
        Self {
            author_name: req.author_name,
            message: req.message,
        }
    }
}
