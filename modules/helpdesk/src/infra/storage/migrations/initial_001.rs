use sea_orm::{EntityName, EntityTrait, Schema};
use sea_orm_migration::prelude::*;

use crate::infra::storage::entity::{audit_log, comment, member, tag, ticket, ticket_tag};

#[derive(DeriveMigrationName)]
pub struct Migration;

async fn create_from_entity<E>(
    manager: &SchemaManager<'_>,
    schema: &Schema,
    entity: E,
) -> Result<(), DbErr>
where
    E: EntityTrait,
{
    manager
        .create_table(
            schema
                .create_table_from_entity(entity)
                .if_not_exists()
                .to_owned(),
        )
        .await
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let schema = Schema::new(manager.get_database_backend());

        // Parents before children so foreign keys resolve.
        create_from_entity(manager, &schema, member::Entity).await?;
        create_from_entity(manager, &schema, tag::Entity).await?;
        create_from_entity(manager, &schema, ticket::Entity).await?;
        create_from_entity(manager, &schema, ticket_tag::Entity).await?;
        create_from_entity(manager, &schema, comment::Entity).await?;
        create_from_entity(manager, &schema, audit_log::Entity).await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_tickets_status")
                    .table(ticket::Entity)
                    .col(ticket::Column::Status)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx_ticket_comments_ticket_id")
                    .table(comment::Entity)
                    .col(comment::Column::TicketId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        for table in [
            audit_log::Entity.table_ref(),
            comment::Entity.table_ref(),
            ticket_tag::Entity.table_ref(),
            ticket::Entity.table_ref(),
            tag::Entity.table_ref(),
            member::Entity.table_ref(),
        ] {
            manager
                .drop_table(Table::drop().table(table).if_exists().to_owned())
                .await?;
        }
        Ok(())
    }
}
