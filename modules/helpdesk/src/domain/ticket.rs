//! The ticket aggregate.
//!
//! Fields are private; every mutation goes through one of the operations
//! below, which enforce the lifecycle rules:
//!
//! ```text
//! Open ──assign──▶ InProgress ──resolve──▶ Resolved
//!   │                  │                      │
//!   └──────────────────┴───────close──────────┴──▶ Closed (absorbing)
//! ```
//!
//! `Closed` rejects edits, comments, attachments and status changes with
//! [`DomainError::InvalidState`]. Tag attach/detach is not gated on status.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::contract::model::{Attachment, Tag, TicketComment, TicketStatus};
use crate::domain::error::DomainError;

pub const MAX_IDEMPOTENCY_KEY_LEN: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ticket {
    id: Uuid,
    title: String,
    description: String,
    requester_name: String,
    created_at: DateTime<Utc>,
    assigned_member_id: Option<Uuid>,
    status: TicketStatus,
    attachment: Option<Attachment>,
    idempotency_key: Option<String>,
    version: i64,
    tags: Vec<Tag>,
    comments: Vec<TicketComment>,
}

/// Plain snapshot of a ticket, used by storage adapters to rebuild the
/// aggregate from rows and to flatten it back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketState {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub requester_name: String,
    pub created_at: DateTime<Utc>,
    pub assigned_member_id: Option<Uuid>,
    pub status: TicketStatus,
    pub attachment: Option<Attachment>,
    pub idempotency_key: Option<String>,
    pub version: i64,
    pub tags: Vec<Tag>,
    pub comments: Vec<TicketComment>,
}

fn require_non_blank(field: &str, value: &str) -> Result<(), DomainError> {
    if value.trim().is_empty() {
        return Err(DomainError::validation(field, "must not be blank"));
    }
    Ok(())
}

impl Ticket {
    /// Start a new ticket in `Open`. A blank idempotency key is treated as absent.
    pub fn create(
        title: &str,
        description: &str,
        requester_name: &str,
        now: DateTime<Utc>,
        idempotency_key: Option<&str>,
    ) -> Result<Self, DomainError> {
        require_non_blank("title", title)?;
        require_non_blank("description", description)?;
        require_non_blank("requester_name", requester_name)?;

        let idempotency_key = idempotency_key.filter(|k| !k.trim().is_empty());
        if let Some(key) = idempotency_key {
            let len = key.chars().count();
            if len > MAX_IDEMPOTENCY_KEY_LEN {
                return Err(DomainError::validation(
                    "idempotency_key",
                    format!("too long: {len} characters (max: {MAX_IDEMPOTENCY_KEY_LEN})"),
                ));
            }
        }

        Ok(Self {
            id: Uuid::new_v4(),
            title: title.to_string(),
            description: description.to_string(),
            requester_name: requester_name.to_string(),
            created_at: now,
            assigned_member_id: None,
            status: TicketStatus::Open,
            attachment: None,
            idempotency_key: idempotency_key.map(str::to_string),
            version: 0,
            tags: Vec::new(),
            comments: Vec::new(),
        })
    }

    pub fn restore(state: TicketState) -> Self {
        Self {
            id: state.id,
            title: state.title,
            description: state.description,
            requester_name: state.requester_name,
            created_at: state.created_at,
            assigned_member_id: state.assigned_member_id,
            status: state.status,
            attachment: state.attachment,
            idempotency_key: state.idempotency_key,
            version: state.version,
            tags: state.tags,
            comments: state.comments,
        }
    }

    pub fn into_state(self) -> TicketState {
        TicketState {
            id: self.id,
            title: self.title,
            description: self.description,
            requester_name: self.requester_name,
            created_at: self.created_at,
            assigned_member_id: self.assigned_member_id,
            status: self.status,
            attachment: self.attachment,
            idempotency_key: self.idempotency_key,
            version: self.version,
            tags: self.tags,
            comments: self.comments,
        }
    }

    fn ensure_not_closed(&self) -> Result<(), DomainError> {
        if self.status.is_closed() {
            return Err(DomainError::invalid_state(self.id, self.status));
        }
        Ok(())
    }

    pub fn attach_file(
        &mut self,
        file_name: &str,
        content_type: &str,
        data: Vec<u8>,
    ) -> Result<(), DomainError> {
        self.ensure_not_closed()?;
        require_non_blank("attachment_file_name", file_name)?;
        require_non_blank("attachment_content_type", content_type)?;

        self.attachment = Some(Attachment {
            file_name: file_name.to_string(),
            content_type: content_type.to_string(),
            data,
        });
        Ok(())
    }

    /// Assignment moves an `Open` ticket into active work.
    pub fn assign(&mut self, member_id: Uuid) {
        self.assigned_member_id = Some(member_id);
        if self.status == TicketStatus::Open {
            self.status = TicketStatus::InProgress;
        }
    }

    pub fn resolve(&mut self) -> Result<(), DomainError> {
        self.ensure_not_closed()?;
        self.status = TicketStatus::Resolved;
        Ok(())
    }

    pub fn close(&mut self) {
        self.status = TicketStatus::Closed;
    }

    /// Returns `false` when a tag with the same case-insensitive name is already present.
    pub fn add_tag(&mut self, tag: Tag) -> bool {
        let key = tag_key(&tag.name);
        if self.tags.iter().any(|t| tag_key(&t.name) == key) {
            return false;
        }
        self.tags.push(tag);
        true
    }

    pub fn remove_tag(&mut self, tag_id: Uuid) -> bool {
        let before = self.tags.len();
        self.tags.retain(|t| t.id != tag_id);
        self.tags.len() != before
    }

    pub fn add_comment(
        &mut self,
        author_name: &str,
        message: &str,
        now: DateTime<Utc>,
    ) -> Result<&TicketComment, DomainError> {
        self.ensure_not_closed()?;
        require_non_blank("author_name", author_name)?;
        require_non_blank("message", message)?;

        let idx = self.comments.len();
        self.comments.push(TicketComment {
            id: Uuid::new_v4(),
            ticket_id: self.id,
            author_name: author_name.to_string(),
            message: message.to_string(),
            created_at: now,
        });
        Ok(&self.comments[idx])
    }

    pub fn update_details(&mut self, title: &str, description: &str) -> Result<(), DomainError> {
        self.ensure_not_closed()?;
        require_non_blank("title", title)?;
        require_non_blank("description", description)?;

        self.title = title.to_string();
        self.description = description.to_string();
        Ok(())
    }

    /// Set the status directly, bypassing the normal flow.
    pub fn change_status(&mut self, status: TicketStatus) -> Result<(), DomainError> {
        self.ensure_not_closed()?;
        self.status = status;
        Ok(())
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn requester_name(&self) -> &str {
        &self.requester_name
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn assigned_member_id(&self) -> Option<Uuid> {
        self.assigned_member_id
    }

    pub fn status(&self) -> TicketStatus {
        self.status
    }

    pub fn attachment(&self) -> Option<&Attachment> {
        self.attachment.as_ref()
    }

    pub fn idempotency_key(&self) -> Option<&str> {
        self.idempotency_key.as_deref()
    }

    /// Persisted version; 0 until the ticket is first stored.
    pub fn version(&self) -> i64 {
        self.version
    }

    pub fn tags(&self) -> &[Tag] {
        &self.tags
    }

    pub fn comments(&self) -> &[TicketComment] {
        &self.comments
    }
}

/// Comparison key for tag names: trimmed and lowercased.
pub fn tag_key(name: &str) -> String {
    name.trim().to_lowercase()
}

/// Trim, drop blanks and collapse case-insensitive duplicates, keeping the
/// first spelling seen.
pub fn normalize_tag_names<I, S>(names: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut seen = std::collections::HashSet::new();
    names
        .into_iter()
        .filter_map(|n| {
            let trimmed = n.as_ref().trim();
            if trimmed.is_empty() || !seen.insert(trimmed.to_lowercase()) {
                return None;
            }
            Some(trimmed.to_string())
        })
        .collect()
}
