use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Duration;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::contract::model::{
    Attachment, DashboardStats, NewAttachment, NewComment, NewTicket, SupportMember,
    TicketComment, TicketUpdate, TicketView,
};
use crate::domain::assignment::select_assignee;
use crate::domain::error::DomainError;
use crate::domain::ports::Clock;
use crate::domain::repo::{InsertOutcome, MembersRepository, TicketChanges, TicketsRepository};
use crate::domain::ticket::{normalize_tag_names, Ticket};

/// Ticket lifecycle service: creation with idempotency and auto-assignment,
/// edits, comments and tag mutations.
/// Depends only on the repository ports, not on infra types.
#[derive(Clone)]
pub struct Service {
    tickets: Arc<dyn TicketsRepository>,
    members: Arc<dyn MembersRepository>,
    clock: Arc<dyn Clock>,
    config: ServiceConfig,
}

/// Configuration for the domain service
#[derive(Debug, Clone)]
pub struct ServiceConfig {
    pub default_attachment_file_name: String,
    pub default_attachment_content_type: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            default_attachment_file_name: "attachment".to_string(),
            default_attachment_content_type: "application/octet-stream".to_string(),
        }
    }
}

impl Service {
    /// Create a service with dependencies.
    pub fn new(
        tickets: Arc<dyn TicketsRepository>,
        members: Arc<dyn MembersRepository>,
        clock: Arc<dyn Clock>,
        config: ServiceConfig,
    ) -> Self {
        Self {
            tickets,
            members,
            clock,
            config,
        }
    }

    #[instrument(
        name = "helpdesk.service.create_ticket",
        skip(self, new_ticket),
        fields(title = %new_ticket.title, requester = %new_ticket.requester_name)
    )]
    pub async fn create_ticket(&self, new_ticket: NewTicket) -> Result<TicketView, DomainError> {
        info!("Creating ticket");

        let members = self.active_members().await?;

        let key = new_ticket
            .idempotency_key
            .as_deref()
            .filter(|k| !k.trim().is_empty());
        if let Some(key) = key {
            if let Some(existing) = self
                .tickets
                .find_by_idempotency_key(key)
                .await
                .map_err(DomainError::from_port)?
            {
                info!(ticket_id = %existing.id(), "Idempotency key already used, returning existing ticket");
                return Ok(project(&existing, &members));
            }
        }

        if members.is_empty() {
            return Err(DomainError::no_assignee_available());
        }

        let loads = self
            .tickets
            .unresolved_tickets()
            .await
            .map_err(DomainError::from_port)?;
        let assignee = select_assignee(&members, &loads)?;
        debug!(assignee = %assignee.name, unresolved = loads.len(), "Selected assignee");

        let mut ticket = Ticket::create(
            &new_ticket.title,
            &new_ticket.description,
            &new_ticket.requester_name,
            self.clock.now(),
            key,
        )?;
        if let Some(att) = self.decode_attachment(new_ticket.attachment.as_ref())? {
            ticket.attach_file(&att.file_name, &att.content_type, att.data)?;
        }
        ticket.assign(assignee.id);

        let tags = normalize_tag_names(&new_ticket.tags);
        let stored = match self
            .tickets
            .insert_with_tags(ticket, tags)
            .await
            .map_err(DomainError::from_port)?
        {
            InsertOutcome::Inserted(stored) => stored,
            InsertOutcome::DuplicateIdempotencyKey => {
                // Lost a race on the same key: the winner's ticket is the answer.
                let key = key.unwrap_or_default();
                warn!("Concurrent create with the same idempotency key, re-reading winner");
                self.tickets
                    .find_by_idempotency_key(key)
                    .await
                    .map_err(DomainError::from_port)?
                    .ok_or_else(|| {
                        DomainError::database("idempotency key conflict without a stored ticket")
                    })?
            }
        };

        info!(ticket_id = %stored.id(), "Successfully created ticket");
        Ok(project(&stored, &members))
    }

    #[instrument(name = "helpdesk.service.get_ticket", skip(self), fields(ticket_id = %id))]
    pub async fn get_ticket(&self, id: Uuid) -> Result<Option<TicketView>, DomainError> {
        debug!("Getting ticket by id");

        let Some(ticket) = self
            .tickets
            .find_by_id(id)
            .await
            .map_err(DomainError::from_port)?
        else {
            return Ok(None);
        };
        let members = self.active_members().await?;
        Ok(Some(project(&ticket, &members)))
    }

    #[instrument(name = "helpdesk.service.list_tickets", skip(self))]
    pub async fn list_tickets(&self) -> Result<Vec<TicketView>, DomainError> {
        debug!("Listing tickets");

        let tickets = self
            .tickets
            .list_all()
            .await
            .map_err(DomainError::from_port)?;
        let members = self.active_members().await?;

        debug!("Successfully listed {} tickets", tickets.len());
        Ok(tickets.iter().map(|t| project(t, &members)).collect())
    }

    #[instrument(
        name = "helpdesk.service.update_ticket",
        skip(self, update),
        fields(ticket_id = %id, status = %update.status)
    )]
    pub async fn update_ticket(
        &self,
        id: Uuid,
        update: TicketUpdate,
    ) -> Result<Option<TicketView>, DomainError> {
        info!("Updating ticket");

        let attachment = self.decode_attachment(update.attachment.as_ref())?;
        let expected_version = update
            .concurrency_token
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .map(parse_concurrency_token)
            .transpose()?;

        let changes = TicketChanges {
            title: update.title,
            description: update.description,
            status: update.status,
            attachment,
            expected_version,
        };

        let Some(ticket) = self
            .tickets
            .update_ticket(id, changes)
            .await
            .map_err(DomainError::from_port)?
        else {
            return Ok(None);
        };

        let members = self.active_members().await?;
        info!("Successfully updated ticket");
        Ok(Some(project(&ticket, &members)))
    }

    #[instrument(name = "helpdesk.service.add_comment", skip(self, comment), fields(ticket_id = %id))]
    pub async fn add_comment(
        &self,
        id: Uuid,
        comment: NewComment,
    ) -> Result<Option<TicketComment>, DomainError> {
        info!("Adding comment");

        let added = self
            .tickets
            .add_comment(id, &comment.author_name, &comment.message, self.clock.now())
            .await
            .map_err(DomainError::from_port)?;

        if let Some(ref c) = added {
            info!(comment_id = %c.id, "Successfully added comment");
        }
        Ok(added)
    }

    #[instrument(name = "helpdesk.service.attach_tag", skip(self), fields(ticket_id = %id))]
    pub async fn attach_tag(&self, id: Uuid, name: &str) -> Result<Option<TicketView>, DomainError> {
        info!("Attaching tag");

        let name = name.trim();
        if name.is_empty() {
            return Err(DomainError::validation("name", "tag name is required"));
        }

        let Some(ticket) = self
            .tickets
            .attach_tag(id, name)
            .await
            .map_err(DomainError::from_port)?
        else {
            return Ok(None);
        };
        let members = self.active_members().await?;
        Ok(Some(project(&ticket, &members)))
    }

    #[instrument(name = "helpdesk.service.detach_tag", skip(self), fields(ticket_id = %id, tag_id = %tag_id))]
    pub async fn detach_tag(
        &self,
        id: Uuid,
        tag_id: Uuid,
    ) -> Result<Option<TicketView>, DomainError> {
        info!("Detaching tag");

        let Some(ticket) = self
            .tickets
            .detach_tag(id, tag_id)
            .await
            .map_err(DomainError::from_port)?
        else {
            return Ok(None);
        };
        let members = self.active_members().await?;
        Ok(Some(project(&ticket, &members)))
    }

    #[instrument(name = "helpdesk.service.dashboard", skip(self))]
    pub async fn dashboard(&self) -> Result<DashboardStats, DomainError> {
        debug!("Computing dashboard stats");
        self.tickets
            .dashboard_stats()
            .await
            .map_err(DomainError::from_port)
    }

    #[instrument(name = "helpdesk.service.list_members", skip(self))]
    pub async fn list_members(&self) -> Result<Vec<SupportMember>, DomainError> {
        debug!("Listing active members");
        self.active_members().await
    }

    /// Seed the roster when it is empty. Returns how many members were added.
    #[instrument(name = "helpdesk.service.seed_roster", skip(self, names))]
    pub async fn seed_roster(&self, names: &[String]) -> Result<usize, DomainError> {
        let added = self
            .members
            .ensure_roster(names)
            .await
            .map_err(DomainError::from_port)?;
        if added > 0 {
            info!("Seeded {} support members", added);
        }
        Ok(added)
    }

    /// Insert two demo tickets assigned to the first active member, if the
    /// store holds no tickets yet. Returns how many were inserted.
    #[instrument(name = "helpdesk.service.seed_sample_tickets", skip(self))]
    pub async fn seed_sample_tickets(&self) -> Result<usize, DomainError> {
        let existing = self
            .tickets
            .list_all()
            .await
            .map_err(DomainError::from_port)?;
        if !existing.is_empty() {
            return Ok(0);
        }
        let members = self.active_members().await?;
        let Some(assignee) = members.first() else {
            debug!("No active members, skipping sample tickets");
            return Ok(0);
        };

        let now = self.clock.now();

        let mut onboarding = Ticket::create(
            "Onboarding help",
            "Need assistance with VPN configuration",
            "Jordan",
            now - Duration::days(2),
            None,
        )?;
        onboarding.attach_file("vpn-instructions.txt", "text/plain", b"VPN steps...".to_vec())?;
        onboarding.assign(assignee.id);

        let mut laptop = Ticket::create(
            "Broken laptop",
            "Laptop screen flickers intermittently",
            "Riley",
            now - Duration::days(1),
            None,
        )?;
        laptop.attach_file("screen-photo.jpg", "image/jpeg", (0..=255u8).collect())?;
        laptop.assign(assignee.id);
        laptop.resolve()?;

        let mut inserted = 0;
        for (ticket, tag) in [(onboarding, "Networking"), (laptop, "Hardware")] {
            if let InsertOutcome::Inserted(_) = self
                .tickets
                .insert_with_tags(ticket, vec![tag.to_string()])
                .await
                .map_err(DomainError::from_port)?
            {
                inserted += 1;
            }
        }

        info!("Seeded {} sample tickets", inserted);
        Ok(inserted)
    }

    async fn active_members(&self) -> Result<Vec<SupportMember>, DomainError> {
        self.members
            .active_members()
            .await
            .map_err(DomainError::from_port)
    }

    /// Blank payloads mean "no attachment"; missing metadata gets defaults.
    fn decode_attachment(
        &self,
        attachment: Option<&NewAttachment>,
    ) -> Result<Option<Attachment>, DomainError> {
        let Some(att) = attachment else {
            return Ok(None);
        };
        let payload = att.data_base64.trim();
        if payload.is_empty() {
            return Ok(None);
        }

        let data = STANDARD.decode(payload).map_err(|e| {
            DomainError::validation("attachment_base64", format!("invalid base64: {e}"))
        })?;

        let or_default = |value: Option<&String>, default: &str| {
            value
                .filter(|v| !v.trim().is_empty())
                .map_or_else(|| default.to_string(), Clone::clone)
        };

        Ok(Some(Attachment {
            file_name: or_default(
                att.file_name.as_ref(),
                &self.config.default_attachment_file_name,
            ),
            content_type: or_default(
                att.content_type.as_ref(),
                &self.config.default_attachment_content_type,
            ),
            data,
        }))
    }
}

/// Caller-facing projection of a ticket.
fn project(ticket: &Ticket, members: &[SupportMember]) -> TicketView {
    let assigned_support_member = ticket
        .assigned_member_id()
        .and_then(|id| members.iter().find(|m| m.id == id))
        .map(|m| m.name.clone())
        .unwrap_or_default();

    let mut tags = ticket.tags().to_vec();
    tags.sort_by_key(|t| t.name.to_lowercase());

    let attachment = ticket.attachment();

    TicketView {
        id: ticket.id(),
        title: ticket.title().to_string(),
        description: ticket.description().to_string(),
        requester_name: ticket.requester_name().to_string(),
        created_at: ticket.created_at(),
        assigned_support_member,
        status: ticket.status(),
        attachment_file_name: attachment.map(|a| a.file_name.clone()),
        attachment_content_type: attachment.map(|a| a.content_type.clone()),
        attachment_base64: attachment.map(|a| STANDARD.encode(&a.data)),
        idempotency_key: ticket.idempotency_key().map(str::to_string),
        concurrency_token: (ticket.version() > 0)
            .then(|| encode_concurrency_token(ticket.version())),
        tags,
        comments: ticket.comments().to_vec(),
    }
}

pub fn encode_concurrency_token(version: i64) -> String {
    STANDARD.encode(version.to_be_bytes())
}

pub fn parse_concurrency_token(token: &str) -> Result<i64, DomainError> {
    let malformed = || DomainError::validation("concurrency_token", "malformed token");
    let bytes = STANDARD.decode(token.trim()).map_err(|_| malformed())?;
    let bytes: [u8; 8] = bytes.try_into().map_err(|_| malformed())?;
    Ok(i64::from_be_bytes(bytes))
}
