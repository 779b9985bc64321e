use anyhow::Context;
use sea_orm::Set;

use crate::contract::model::{Attachment, SupportMember, Tag, TicketComment, TicketStatus};
use crate::domain::ticket::{Ticket, TicketState};
use crate::infra::crypto::{AttachmentCodec, CodecError};
use crate::infra::storage::entity::{comment, member, tag, ticket};

fn require_codec(codec: Option<&AttachmentCodec>) -> Result<&AttachmentCodec, CodecError> {
    codec.ok_or(CodecError::NotConfigured)
}

/// Rebuild the aggregate from its row plus already-loaded children.
/// The stored attachment is decrypted here.
pub fn ticket_from_rows(
    row: ticket::Model,
    tags: Vec<Tag>,
    comments: Vec<TicketComment>,
    codec: Option<&AttachmentCodec>,
) -> anyhow::Result<Ticket> {
    let status: TicketStatus = row
        .status
        .parse()
        .with_context(|| format!("ticket {} has an unreadable status", row.id))?;

    let attachment = match row.attachment_data {
        Some(sealed) => Some(Attachment {
            file_name: row.attachment_file_name.unwrap_or_default(),
            content_type: row.attachment_content_type.unwrap_or_default(),
            data: require_codec(codec)?.decrypt(&sealed)?,
        }),
        None => None,
    };

    Ok(Ticket::restore(TicketState {
        id: row.id,
        title: row.title,
        description: row.description,
        requester_name: row.requester_name,
        created_at: row.created_at,
        assigned_member_id: row.assigned_member_id,
        status,
        attachment,
        idempotency_key: row.idempotency_key,
        version: row.row_version,
        tags,
        comments,
    }))
}

/// Full row for a new ticket; the attachment is encrypted here.
pub fn ticket_to_active_model(
    ticket: &Ticket,
    version: i64,
    codec: Option<&AttachmentCodec>,
) -> anyhow::Result<ticket::ActiveModel> {
    let mut am = ticket::ActiveModel {
        id: Set(ticket.id()),
        title: Set(ticket.title().to_string()),
        description: Set(ticket.description().to_string()),
        requester_name: Set(ticket.requester_name().to_string()),
        created_at: Set(ticket.created_at()),
        assigned_member_id: Set(ticket.assigned_member_id()),
        status: Set(ticket.status().as_str().to_string()),
        attachment_file_name: Set(None),
        attachment_content_type: Set(None),
        attachment_data: Set(None),
        idempotency_key: Set(ticket.idempotency_key().map(str::to_string)),
        row_version: Set(version),
    };
    set_attachment(&mut am, ticket.attachment(), codec)?;
    Ok(am)
}

/// Only the fields an edit may touch, for `update_many().set(..)`.
/// The version column is advanced by the caller.
pub fn ticket_edit_model(
    ticket: &Ticket,
    codec: Option<&AttachmentCodec>,
) -> anyhow::Result<ticket::ActiveModel> {
    let mut am = ticket::ActiveModel {
        title: Set(ticket.title().to_string()),
        description: Set(ticket.description().to_string()),
        status: Set(ticket.status().as_str().to_string()),
        ..Default::default()
    };
    set_attachment(&mut am, ticket.attachment(), codec)?;
    Ok(am)
}

fn set_attachment(
    am: &mut ticket::ActiveModel,
    attachment: Option<&Attachment>,
    codec: Option<&AttachmentCodec>,
) -> anyhow::Result<()> {
    if let Some(att) = attachment {
        let sealed = require_codec(codec)?.encrypt(&att.data)?;
        am.attachment_file_name = Set(Some(att.file_name.clone()));
        am.attachment_content_type = Set(Some(att.content_type.clone()));
        am.attachment_data = Set(Some(sealed));
    }
    Ok(())
}

pub fn tag_from_row(row: tag::Model) -> Tag {
    Tag {
        id: row.id,
        name: row.name,
    }
}

pub fn comment_from_row(row: comment::Model) -> TicketComment {
    TicketComment {
        id: row.id,
        ticket_id: row.ticket_id,
        author_name: row.author_name,
        message: row.message,
        created_at: row.created_at,
    }
}

pub fn comment_to_active_model(c: &TicketComment, seq: i32) -> comment::ActiveModel {
    comment::ActiveModel {
        id: Set(c.id),
        ticket_id: Set(c.ticket_id),
        author_name: Set(c.author_name.clone()),
        message: Set(c.message.clone()),
        created_at: Set(c.created_at),
        seq: Set(seq),
    }
}

pub fn member_from_row(row: member::Model) -> SupportMember {
    SupportMember {
        id: row.id,
        name: row.name,
        is_active: row.is_active,
    }
}
