//! SeaORM-backed implementations of the domain repository ports.
//!
//! Both repositories are generic over `C: ConnectionTrait + TransactionTrait`,
//! so they can be built on a `DatabaseConnection` or on an outer transaction.
//! Every ticket mutation opens its own transaction; dropping it at any await
//! point rolls the whole unit of work back.

use std::collections::HashMap;
use std::sync::Arc;

use anyhow::{anyhow, Context};
use chrono::{DateTime, Utc};
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    QuerySelect, Set, SqlErr, TransactionTrait,
};
use tracing::{debug, instrument};
use uuid::Uuid;

use crate::contract::model::{DashboardStats, SupportMember, Tag, TicketComment, TicketStatus};
use crate::domain::assignment::TicketLoad;
use crate::domain::error::DomainError;
use crate::domain::repo::{InsertOutcome, MembersRepository, TicketChanges, TicketsRepository};
use crate::domain::ticket::{tag_key, Ticket};
use crate::infra::crypto::AttachmentCodec;
use crate::infra::storage::entity::{audit_log, comment, member, tag, ticket, ticket_tag};
use crate::infra::storage::mapper;

/// Audit actions written alongside ticket mutations.
#[derive(Debug, Clone, Copy)]
enum AuditAction {
    Created,
    Updated,
    CommentAdded,
    TagAttached,
    TagDetached,
}

impl AuditAction {
    fn as_str(self) -> &'static str {
        match self {
            AuditAction::Created => "Created",
            AuditAction::Updated => "Updated",
            AuditAction::CommentAdded => "CommentAdded",
            AuditAction::TagAttached => "TagAttached",
            AuditAction::TagDetached => "TagDetached",
        }
    }
}

/// SeaORM tickets repository.
/// Holds a connection object and the attachment codec, if one is configured.
pub struct SeaOrmTicketsRepository<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync,
{
    conn: C,
    codec: Option<Arc<AttachmentCodec>>,
}

impl<C> SeaOrmTicketsRepository<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync,
{
    pub fn new(conn: C, codec: Option<Arc<AttachmentCodec>>) -> Self {
        Self { conn, codec }
    }

    fn codec(&self) -> Option<&AttachmentCodec> {
        self.codec.as_deref()
    }
}

/// Load tags and comments for `rows` with one query per table and rebuild
/// the aggregates, keeping the order of `rows`.
async fn hydrate<D>(
    db: &D,
    codec: Option<&AttachmentCodec>,
    rows: Vec<ticket::Model>,
) -> anyhow::Result<Vec<Ticket>>
where
    D: ConnectionTrait,
{
    if rows.is_empty() {
        return Ok(Vec::new());
    }
    let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();

    let links = ticket_tag::Entity::find()
        .filter(ticket_tag::Column::TicketId.is_in(ids.clone()))
        .all(db)
        .await
        .context("load ticket tags failed")?;
    let tag_ids: Vec<Uuid> = links.iter().map(|l| l.tag_id).collect();
    let tags: HashMap<Uuid, Tag> = if tag_ids.is_empty() {
        HashMap::new()
    } else {
        tag::Entity::find()
            .filter(tag::Column::Id.is_in(tag_ids))
            .all(db)
            .await
            .context("load tags failed")?
            .into_iter()
            .map(|t| (t.id, mapper::tag_from_row(t)))
            .collect()
    };

    let mut tags_by_ticket: HashMap<Uuid, Vec<Tag>> = HashMap::new();
    for link in links {
        if let Some(t) = tags.get(&link.tag_id) {
            tags_by_ticket
                .entry(link.ticket_id)
                .or_default()
                .push(t.clone());
        }
    }

    let mut comments_by_ticket: HashMap<Uuid, Vec<TicketComment>> = HashMap::new();
    for c in comment::Entity::find()
        .filter(comment::Column::TicketId.is_in(ids))
        .order_by_asc(comment::Column::CreatedAt)
        .order_by_asc(comment::Column::Seq)
        .all(db)
        .await
        .context("load comments failed")?
    {
        comments_by_ticket
            .entry(c.ticket_id)
            .or_default()
            .push(mapper::comment_from_row(c));
    }

    rows.into_iter()
        .map(|row| {
            let tags = tags_by_ticket.remove(&row.id).unwrap_or_default();
            let comments = comments_by_ticket.remove(&row.id).unwrap_or_default();
            mapper::ticket_from_rows(row, tags, comments, codec)
        })
        .collect()
}

async fn load_one<D>(
    db: &D,
    codec: Option<&AttachmentCodec>,
    id: Uuid,
) -> anyhow::Result<Option<Ticket>>
where
    D: ConnectionTrait,
{
    let Some(row) = ticket::Entity::find_by_id(id)
        .one(db)
        .await
        .context("find ticket failed")?
    else {
        return Ok(None);
    };
    Ok(hydrate(db, codec, vec![row]).await?.pop())
}

/// Same as [`load_one`], but a ticket that vanished mid-transaction is an error.
async fn reload<D>(db: &D, codec: Option<&AttachmentCodec>, id: Uuid) -> anyhow::Result<Ticket>
where
    D: ConnectionTrait,
{
    load_one(db, codec, id)
        .await?
        .ok_or_else(|| anyhow!("ticket {id} disappeared during update"))
}

/// Insert-or-reuse a tag by its case-insensitive name.
/// A concurrent insert of the same name makes ours a no-op; the re-read
/// then picks up the winner's row.
async fn upsert_tag<D>(db: &D, name: &str) -> anyhow::Result<Tag>
where
    D: ConnectionTrait,
{
    let name = name.trim();
    let key = tag_key(name);

    let am = tag::ActiveModel {
        id: Set(Uuid::new_v4()),
        name: Set(name.to_string()),
        name_key: Set(key.clone()),
    };
    tag::Entity::insert(am)
        .on_conflict(
            OnConflict::column(tag::Column::NameKey)
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await
        .context("tag upsert failed")?;

    let row = tag::Entity::find()
        .filter(tag::Column::NameKey.eq(key))
        .one(db)
        .await
        .context("tag lookup failed")?
        .ok_or_else(|| anyhow!("tag '{name}' missing after upsert"))?;
    Ok(mapper::tag_from_row(row))
}

async fn link_tag<D>(db: &D, ticket_id: Uuid, tag_id: Uuid) -> anyhow::Result<()>
where
    D: ConnectionTrait,
{
    let am = ticket_tag::ActiveModel {
        ticket_id: Set(ticket_id),
        tag_id: Set(tag_id),
    };
    ticket_tag::Entity::insert(am)
        .on_conflict(
            OnConflict::columns([ticket_tag::Column::TicketId, ticket_tag::Column::TagId])
                .do_nothing()
                .to_owned(),
        )
        .exec_without_returning(db)
        .await
        .context("link tag failed")?;
    Ok(())
}

/// Compare-and-swap on `row_version`. Zero rows touched means someone
/// else wrote first.
async fn advance_version<D>(
    db: &D,
    id: Uuid,
    expected: i64,
    changes: ticket::ActiveModel,
) -> anyhow::Result<()>
where
    D: ConnectionTrait,
{
    let res = ticket::Entity::update_many()
        .set(changes)
        .col_expr(ticket::Column::RowVersion, Expr::value(expected + 1))
        .filter(ticket::Column::Id.eq(id))
        .filter(ticket::Column::RowVersion.eq(expected))
        .exec(db)
        .await
        .context("versioned update failed")?;

    if res.rows_affected == 0 {
        return Err(DomainError::concurrency_conflict(id).into());
    }
    Ok(())
}

async fn audit<D>(
    db: &D,
    ticket_id: Uuid,
    action: AuditAction,
    details: String,
) -> anyhow::Result<()>
where
    D: ConnectionTrait,
{
    let am = audit_log::ActiveModel {
        id: Set(Uuid::new_v4()),
        ticket_id: Set(Some(ticket_id)),
        action: Set(action.as_str().to_string()),
        details: Set(details),
        created_at: Set(Utc::now()),
    };
    audit_log::Entity::insert(am)
        .exec_without_returning(db)
        .await
        .context("audit insert failed")?;
    Ok(())
}

fn is_unique_violation(err: &DbErr) -> bool {
    matches!(err.sql_err(), Some(SqlErr::UniqueConstraintViolation(_)))
}

#[async_trait::async_trait]
impl<C> TicketsRepository for SeaOrmTicketsRepository<C>
where
    C: ConnectionTrait + TransactionTrait + Send + Sync + 'static,
{
    #[instrument(name = "helpdesk.repo.find_by_idempotency_key", skip_all)]
    async fn find_by_idempotency_key(&self, key: &str) -> anyhow::Result<Option<Ticket>> {
        let rows = ticket::Entity::find()
            .filter(ticket::Column::IdempotencyKey.eq(key))
            .all(&self.conn)
            .await
            .context("find_by_idempotency_key failed")?;
        Ok(hydrate(&self.conn, self.codec(), rows).await?.pop())
    }

    #[instrument(name = "helpdesk.repo.find_by_id", skip(self))]
    async fn find_by_id(&self, id: Uuid) -> anyhow::Result<Option<Ticket>> {
        load_one(&self.conn, self.codec(), id).await
    }

    #[instrument(name = "helpdesk.repo.list_all", skip(self))]
    async fn list_all(&self) -> anyhow::Result<Vec<Ticket>> {
        let rows = ticket::Entity::find()
            .order_by_desc(ticket::Column::CreatedAt)
            .all(&self.conn)
            .await
            .context("list_all failed")?;
        hydrate(&self.conn, self.codec(), rows).await
    }

    #[instrument(name = "helpdesk.repo.unresolved_tickets", skip(self))]
    async fn unresolved_tickets(&self) -> anyhow::Result<Vec<TicketLoad>> {
        let unresolved: Vec<&str> = TicketStatus::ALL
            .into_iter()
            .filter(|s| s.is_unresolved())
            .map(TicketStatus::as_str)
            .collect();

        let rows: Vec<(Uuid, Option<Uuid>, String)> = ticket::Entity::find()
            .select_only()
            .column(ticket::Column::Id)
            .column(ticket::Column::AssignedMemberId)
            .column(ticket::Column::Status)
            .filter(ticket::Column::Status.is_in(unresolved))
            .into_tuple()
            .all(&self.conn)
            .await
            .context("unresolved_tickets failed")?;

        rows.into_iter()
            .map(|(ticket_id, assignee, status)| -> anyhow::Result<TicketLoad> {
                Ok(TicketLoad {
                    ticket_id,
                    assignee,
                    status: status.parse()?,
                })
            })
            .collect()
    }

    #[instrument(
        name = "helpdesk.repo.insert_with_tags",
        skip_all,
        fields(ticket_id = %ticket.id(), tags = tag_names.len())
    )]
    async fn insert_with_tags(
        &self,
        mut ticket: Ticket,
        tag_names: Vec<String>,
    ) -> anyhow::Result<InsertOutcome> {
        let txn = self.conn.begin().await.context("begin failed")?;

        let mut tag_ids = Vec::with_capacity(tag_names.len());
        for name in &tag_names {
            let tag = upsert_tag(&txn, name).await?;
            let tag_id = tag.id;
            if ticket.add_tag(tag) {
                tag_ids.push(tag_id);
            }
        }

        let am = mapper::ticket_to_active_model(&ticket, 1, self.codec())?;
        if let Err(e) = ticket::Entity::insert(am).exec_without_returning(&txn).await {
            if ticket.idempotency_key().is_some() && is_unique_violation(&e) {
                debug!("Idempotency key already taken; rolling back");
                return Ok(InsertOutcome::DuplicateIdempotencyKey);
            }
            return Err(e).context("insert ticket failed");
        }

        for tag_id in tag_ids {
            link_tag(&txn, ticket.id(), tag_id).await?;
        }
        audit(
            &txn,
            ticket.id(),
            AuditAction::Created,
            format!("Ticket '{}' created.", ticket.title()),
        )
        .await?;

        let stored = reload(&txn, self.codec(), ticket.id()).await?;
        txn.commit().await.context("commit failed")?;
        Ok(InsertOutcome::Inserted(stored))
    }

    #[instrument(name = "helpdesk.repo.attach_tag", skip(self))]
    async fn attach_tag(&self, ticket_id: Uuid, tag_name: &str) -> anyhow::Result<Option<Ticket>> {
        let txn = self.conn.begin().await.context("begin failed")?;
        let Some(mut ticket) = load_one(&txn, self.codec(), ticket_id).await? else {
            return Ok(None);
        };

        let tag = upsert_tag(&txn, tag_name).await?;
        let (tag_id, name) = (tag.id, tag.name.clone());
        if ticket.add_tag(tag) {
            link_tag(&txn, ticket_id, tag_id).await?;
            advance_version(&txn, ticket_id, ticket.version(), Default::default()).await?;
            audit(
                &txn,
                ticket_id,
                AuditAction::TagAttached,
                format!("Tag '{name}' attached."),
            )
            .await?;
        }

        let stored = reload(&txn, self.codec(), ticket_id).await?;
        txn.commit().await.context("commit failed")?;
        Ok(Some(stored))
    }

    #[instrument(name = "helpdesk.repo.detach_tag", skip(self))]
    async fn detach_tag(&self, ticket_id: Uuid, tag_id: Uuid) -> anyhow::Result<Option<Ticket>> {
        let txn = self.conn.begin().await.context("begin failed")?;
        let Some(mut ticket) = load_one(&txn, self.codec(), ticket_id).await? else {
            return Ok(None);
        };

        if ticket.remove_tag(tag_id) {
            ticket_tag::Entity::delete_many()
                .filter(ticket_tag::Column::TicketId.eq(ticket_id))
                .filter(ticket_tag::Column::TagId.eq(tag_id))
                .exec(&txn)
                .await
                .context("unlink tag failed")?;
            advance_version(&txn, ticket_id, ticket.version(), Default::default()).await?;
            audit(
                &txn,
                ticket_id,
                AuditAction::TagDetached,
                format!("Tag {tag_id} detached."),
            )
            .await?;
        }

        let stored = reload(&txn, self.codec(), ticket_id).await?;
        txn.commit().await.context("commit failed")?;
        Ok(Some(stored))
    }

    #[instrument(name = "helpdesk.repo.update_ticket", skip(self, changes))]
    async fn update_ticket(
        &self,
        id: Uuid,
        changes: TicketChanges,
    ) -> anyhow::Result<Option<Ticket>> {
        let txn = self.conn.begin().await.context("begin failed")?;
        let Some(mut ticket) = load_one(&txn, self.codec(), id).await? else {
            return Ok(None);
        };

        let expected = changes.expected_version.unwrap_or(ticket.version());
        if expected != ticket.version() {
            return Err(DomainError::concurrency_conflict(id).into());
        }

        ticket.update_details(&changes.title, &changes.description)?;
        if let Some(att) = changes.attachment {
            ticket.attach_file(&att.file_name, &att.content_type, att.data)?;
        }
        ticket.change_status(changes.status)?;

        let edit = mapper::ticket_edit_model(&ticket, self.codec())?;
        advance_version(&txn, id, expected, edit).await?;
        audit(
            &txn,
            id,
            AuditAction::Updated,
            format!("Ticket '{}' updated; status {}.", ticket.title(), ticket.status()),
        )
        .await?;

        let stored = reload(&txn, self.codec(), id).await?;
        txn.commit().await.context("commit failed")?;
        Ok(Some(stored))
    }

    #[instrument(name = "helpdesk.repo.add_comment", skip(self, message))]
    async fn add_comment(
        &self,
        ticket_id: Uuid,
        author_name: &str,
        message: &str,
        now: DateTime<Utc>,
    ) -> anyhow::Result<Option<TicketComment>> {
        let txn = self.conn.begin().await.context("begin failed")?;
        let Some(mut ticket) = load_one(&txn, self.codec(), ticket_id).await? else {
            return Ok(None);
        };

        let added = ticket.add_comment(author_name, message, now)?.clone();
        let seq = i32::try_from(ticket.comments().len() - 1)
            .context("comment thread too long")?;
        comment::Entity::insert(mapper::comment_to_active_model(&added, seq))
            .exec_without_returning(&txn)
            .await
            .context("insert comment failed")?;
        advance_version(&txn, ticket_id, ticket.version(), Default::default()).await?;
        audit(
            &txn,
            ticket_id,
            AuditAction::CommentAdded,
            format!("Comment by '{}' added.", added.author_name),
        )
        .await?;

        txn.commit().await.context("commit failed")?;
        Ok(Some(added))
    }

    #[instrument(name = "helpdesk.repo.dashboard_stats", skip(self))]
    async fn dashboard_stats(&self) -> anyhow::Result<DashboardStats> {
        let counts: Vec<(String, i64)> = ticket::Entity::find()
            .select_only()
            .column(ticket::Column::Status)
            .column_as(Expr::col(ticket::Column::Id).count(), "count")
            .group_by(ticket::Column::Status)
            .into_tuple()
            .all(&self.conn)
            .await
            .context("dashboard_stats failed")?;

        let mut stats = DashboardStats::default();
        for (status, count) in counts {
            let count = u64::try_from(count).unwrap_or_default();
            stats.total += count;
            let status: TicketStatus = status.parse()?;
            if status == TicketStatus::InProgress {
                stats.in_progress += count;
            }
            if status.is_unresolved() {
                stats.unresolved += count;
            }
        }
        Ok(stats)
    }
}

/// SeaORM support-roster repository.
pub struct SeaOrmMembersRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    conn: C,
}

impl<C> SeaOrmMembersRepository<C>
where
    C: ConnectionTrait + Send + Sync,
{
    pub fn new(conn: C) -> Self {
        Self { conn }
    }
}

#[async_trait::async_trait]
impl<C> MembersRepository for SeaOrmMembersRepository<C>
where
    C: ConnectionTrait + Send + Sync + 'static,
{
    #[instrument(name = "helpdesk.repo.active_members", skip(self))]
    async fn active_members(&self) -> anyhow::Result<Vec<SupportMember>> {
        let rows = member::Entity::find()
            .filter(member::Column::IsActive.eq(true))
            .order_by_asc(member::Column::Name)
            .all(&self.conn)
            .await
            .context("active_members failed")?;
        Ok(rows.into_iter().map(mapper::member_from_row).collect())
    }

    #[instrument(name = "helpdesk.repo.ensure_roster", skip_all)]
    async fn ensure_roster(&self, names: &[String]) -> anyhow::Result<usize> {
        let existing = member::Entity::find()
            .count(&self.conn)
            .await
            .context("count members failed")?;
        if existing > 0 {
            return Ok(0);
        }

        let rows: Vec<member::ActiveModel> = names
            .iter()
            .map(|n| n.trim())
            .filter(|n| !n.is_empty())
            .map(|n| member::ActiveModel {
                id: Set(Uuid::new_v4()),
                name: Set(n.to_string()),
                is_active: Set(true),
            })
            .collect();
        let n = rows.len();
        if n == 0 {
            return Ok(0);
        }

        member::Entity::insert_many(rows)
            .exec_without_returning(&self.conn)
            .await
            .context("seed roster failed")?;
        Ok(n)
    }
}
