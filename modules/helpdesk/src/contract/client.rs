use async_trait::async_trait;
use uuid::Uuid;

use crate::contract::{
    error::HelpdeskError,
    model::{
        DashboardStats, NewComment, NewTicket, SupportMember, TicketComment, TicketUpdate,
        TicketView,
    },
};

/// Public API trait for the helpdesk module that other modules can use.
///
/// `Ok(None)` means the ticket does not exist; it is never reported as an error.
#[async_trait]
pub trait HelpdeskApi: Send + Sync {
    /// Create a ticket, or return the existing one for a repeated idempotency key
    async fn create_ticket(&self, new_ticket: NewTicket) -> Result<TicketView, HelpdeskError>;

    async fn get_ticket(&self, id: Uuid) -> Result<Option<TicketView>, HelpdeskError>;

    /// All tickets, newest first
    async fn list_tickets(&self) -> Result<Vec<TicketView>, HelpdeskError>;

    async fn update_ticket(
        &self,
        id: Uuid,
        update: TicketUpdate,
    ) -> Result<Option<TicketView>, HelpdeskError>;

    async fn add_comment(
        &self,
        id: Uuid,
        comment: NewComment,
    ) -> Result<Option<TicketComment>, HelpdeskError>;

    async fn attach_tag(&self, id: Uuid, name: &str) -> Result<Option<TicketView>, HelpdeskError>;

    async fn detach_tag(&self, id: Uuid, tag_id: Uuid)
        -> Result<Option<TicketView>, HelpdeskError>;

    async fn dashboard(&self) -> Result<DashboardStats, HelpdeskError>;

    /// Active roster ordered by name
    async fn list_members(&self) -> Result<Vec<SupportMember>, HelpdeskError>;
}
