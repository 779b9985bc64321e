use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Ticket lifecycle states. `Closed` is absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TicketStatus {
    Open,
    InProgress,
    Resolved,
    Closed,
}

impl TicketStatus {
    pub const ALL: [TicketStatus; 4] = [
        TicketStatus::Open,
        TicketStatus::InProgress,
        TicketStatus::Resolved,
        TicketStatus::Closed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            TicketStatus::Open => "Open",
            TicketStatus::InProgress => "InProgress",
            TicketStatus::Resolved => "Resolved",
            TicketStatus::Closed => "Closed",
        }
    }

    /// Open and InProgress tickets count towards a member's load.
    pub fn is_unresolved(self) -> bool {
        matches!(self, TicketStatus::Open | TicketStatus::InProgress)
    }

    pub fn is_closed(self) -> bool {
        self == TicketStatus::Closed
    }
}

impl fmt::Display for TicketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStatus(pub String);

impl fmt::Display for UnknownStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown ticket status '{}'", self.0)
    }
}

impl std::error::Error for UnknownStatus {}

impl FromStr for TicketStatus {
    type Err = UnknownStatus;

    /// Case-insensitive; accepts `in_progress` / `in-progress` as aliases.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let folded: String = s
            .trim()
            .chars()
            .filter(|c| *c != '_' && *c != '-')
            .collect::<String>()
            .to_ascii_lowercase();
        TicketStatus::ALL
            .into_iter()
            .find(|st| st.as_str().to_ascii_lowercase() == folded)
            .ok_or_else(|| UnknownStatus(s.to_string()))
    }
}

/// A person tickets can be assigned to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SupportMember {
    pub id: Uuid,
    pub name: String,
    pub is_active: bool,
}

/// Shared tag value; the name is stored trimmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tag {
    pub id: Uuid,
    pub name: String,
}

impl Tag {
    pub fn new(id: Uuid, name: &str) -> Self {
        Self {
            id,
            name: name.trim().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketComment {
    pub id: Uuid,
    pub ticket_id: Uuid,
    pub author_name: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

/// Attachment as seen by callers: plaintext bytes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attachment {
    pub file_name: String,
    pub content_type: String,
    pub data: Vec<u8>,
}

/// Attachment payload as supplied by callers (base64 encoded).
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewAttachment {
    pub file_name: Option<String>,
    pub content_type: Option<String>,
    pub data_base64: String,
}

/// Data for creating a new ticket
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NewTicket {
    pub title: String,
    pub description: String,
    pub requester_name: String,
    pub idempotency_key: Option<String>,
    pub attachment: Option<NewAttachment>,
    pub tags: Vec<String>,
}

/// Full replacement of the editable ticket fields
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketUpdate {
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    pub attachment: Option<NewAttachment>,
    /// Token from a previous read; a mismatch rejects the write.
    pub concurrency_token: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewComment {
    pub author_name: String,
    pub message: String,
}

/// Ticket projection returned to callers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketView {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    pub requester_name: String,
    pub created_at: DateTime<Utc>,
    /// Display name of the assignee, empty when it cannot be resolved.
    pub assigned_support_member: String,
    pub status: TicketStatus,
    pub attachment_file_name: Option<String>,
    pub attachment_content_type: Option<String>,
    pub attachment_base64: Option<String>,
    pub idempotency_key: Option<String>,
    pub concurrency_token: Option<String>,
    /// Sorted case-insensitively by name.
    pub tags: Vec<Tag>,
    /// In creation order.
    pub comments: Vec<TicketComment>,
}

impl TicketView {
    pub fn tag_names(&self) -> Vec<&str> {
        self.tags.iter().map(|t| t.name.as_str()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DashboardStats {
    pub total: u64,
    pub in_progress: u64,
    /// Open + InProgress
    pub unresolved: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_parses_case_insensitively() {
        assert_eq!("open".parse::<TicketStatus>(), Ok(TicketStatus::Open));
        assert_eq!(
            "in_progress".parse::<TicketStatus>(),
            Ok(TicketStatus::InProgress)
        );
        assert_eq!(
            "InProgress".parse::<TicketStatus>(),
            Ok(TicketStatus::InProgress)
        );
        assert_eq!(" CLOSED ".parse::<TicketStatus>(), Ok(TicketStatus::Closed));
        assert!("pending".parse::<TicketStatus>().is_err());
    }

    #[test]
    fn status_display_round_trips() {
        for st in TicketStatus::ALL {
            assert_eq!(st.to_string().parse::<TicketStatus>(), Ok(st));
        }
    }

    #[test]
    fn unresolved_covers_open_and_in_progress_only() {
        assert!(TicketStatus::Open.is_unresolved());
        assert!(TicketStatus::InProgress.is_unresolved());
        assert!(!TicketStatus::Resolved.is_unresolved());
        assert!(!TicketStatus::Closed.is_unresolved());
    }

    #[test]
    fn tag_name_is_trimmed() {
        let tag = Tag::new(Uuid::new_v4(), "  P1 ");
        assert_eq!(tag.name, "P1");
    }
}
