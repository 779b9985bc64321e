use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::contract::model::{
    Attachment, DashboardStats, SupportMember, TicketComment, TicketStatus,
};
use crate::domain::assignment::TicketLoad;
use crate::domain::ticket::Ticket;

/// Result of inserting a new ticket.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InsertOutcome {
    /// The stored ticket, re-read after commit.
    Inserted(Ticket),
    /// Another ticket already holds the idempotency key; nothing was written.
    DuplicateIdempotencyKey,
}

/// Editable fields applied by [`TicketsRepository::update_ticket`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TicketChanges {
    pub title: String,
    pub description: String,
    pub status: TicketStatus,
    /// Plaintext replacement attachment; `None` keeps the current one.
    pub attachment: Option<Attachment>,
    /// Version the caller read; `None` means "the version loaded in this unit of work".
    pub expected_version: Option<i64>,
}

/// Port for the domain layer: ticket persistence.
///
/// Mutating methods run as one unit of work: they load the ticket, apply the
/// change through the aggregate, check and advance its version and write an
/// audit record, or do nothing at all. `Ok(None)` means the ticket does not
/// exist. Rule violations surface as a `DomainError` inside the `anyhow::Error`.
#[async_trait]
pub trait TicketsRepository: Send + Sync {
    async fn find_by_idempotency_key(&self, key: &str) -> anyhow::Result<Option<Ticket>>;

    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Ticket>>;

    /// Newest first.
    async fn list_all(&self) -> anyhow::Result<Vec<Ticket>>;

    /// Tickets in `Open` or `InProgress`.
    async fn unresolved_tickets(&self) -> anyhow::Result<Vec<TicketLoad>>;

    /// Persist a new ticket together with its tags (already normalized),
    /// reusing existing tags by case-insensitive name.
    async fn insert_with_tags(
        &self,
        ticket: Ticket,
        tag_names: Vec<String>,
    ) -> anyhow::Result<InsertOutcome>;

    async fn attach_tag(&self, ticket_id: Uuid, tag_name: &str) -> anyhow::Result<Option<Ticket>>;

    async fn detach_tag(&self, ticket_id: Uuid, tag_id: Uuid) -> anyhow::Result<Option<Ticket>>;

    async fn update_ticket(
        &self,
        id: Uuid,
        changes: TicketChanges,
    ) -> anyhow::Result<Option<Ticket>>;

    async fn add_comment(
        &self,
        ticket_id: Uuid,
        author_name: &str,
        message: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<TicketComment>>;

    async fn dashboard_stats(&self) -> anyhow::Result<DashboardStats>;
}

/// Port for the domain layer: the support roster.
#[async_trait]
pub trait MembersRepository: Send + Sync {
    /// Active members ordered by name.
    async fn active_members(&self) -> anyhow::Result<Vec<SupportMember>>;

    /// Insert the given names as active members if the roster is empty.
    /// Returns how many were inserted.
    async fn ensure_roster(&self, names: &[String]) -> anyhow::Result<usize>;
}
