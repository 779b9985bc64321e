use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "tickets")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,
    pub title: String,
    #[sea_orm(column_type = "Text")]
    pub description: String,
    pub requester_name: String,
    pub created_at: DateTime<Utc>,
    pub assigned_member_id: Option<Uuid>,
    /// `TicketStatus` name, e.g. `InProgress`.
    pub status: String,
    pub attachment_file_name: Option<String>,
    pub attachment_content_type: Option<String>,
    /// AES-GCM sealed payload, never plaintext.
    pub attachment_data: Option<Vec<u8>>,
    #[sea_orm(unique)]
    pub idempotency_key: Option<String>,
    pub row_version: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::member::Entity",
        from = "Column::AssignedMemberId",
        to = "super::member::Column::Id"
    )]
    Member,
}

impl ActiveModelBehavior for ActiveModel {}
