use async_trait::async_trait;
use std::sync::Arc;
use uuid::Uuid;

use crate::contract::{
    client::HelpdeskApi,
    error::HelpdeskError,
    model::{
        DashboardStats, NewComment, NewTicket, SupportMember, TicketComment, TicketUpdate,
        TicketView,
    },
};
use crate::domain::service::Service;

/// Local implementation of the HelpdeskApi trait that delegates to the domain service
pub struct HelpdeskLocalClient {
    service: Arc<Service>,
}

impl HelpdeskLocalClient {
    pub fn new(service: Arc<Service>) -> Self {
        Self { service }
    }
}

#[async_trait]
impl HelpdeskApi for HelpdeskLocalClient {
    async fn create_ticket(&self, new_ticket: NewTicket) -> Result<TicketView, HelpdeskError> {
        self.service
            .create_ticket(new_ticket)
            .await
            .map_err(Into::into)
    }

    async fn get_ticket(&self, id: Uuid) -> Result<Option<TicketView>, HelpdeskError> {
        self.service.get_ticket(id).await.map_err(Into::into)
    }

    async fn list_tickets(&self) -> Result<Vec<TicketView>, HelpdeskError> {
        self.service.list_tickets().await.map_err(Into::into)
    }

    async fn update_ticket(
        &self,
        id: Uuid,
        update: TicketUpdate,
    ) -> Result<Option<TicketView>, HelpdeskError> {
        self.service
            .update_ticket(id, update)
            .await
            .map_err(Into::into)
    }

    async fn add_comment(
        &self,
        id: Uuid,
        comment: NewComment,
    ) -> Result<Option<TicketComment>, HelpdeskError> {
        self.service
            .add_comment(id, comment)
            .await
            .map_err(Into::into)
    }

    async fn attach_tag(&self, id: Uuid, name: &str) -> Result<Option<TicketView>, HelpdeskError> {
        self.service.attach_tag(id, name).await.map_err(Into::into)
    }

    async fn detach_tag(
        &self,
        id: Uuid,
        tag_id: Uuid,
    ) -> Result<Option<TicketView>, HelpdeskError> {
        self.service
            .detach_tag(id, tag_id)
            .await
            .map_err(Into::into)
    }

    async fn dashboard(&self) -> Result<DashboardStats, HelpdeskError> {
        self.service.dashboard().await.map_err(Into::into)
    }

    async fn list_members(&self) -> Result<Vec<SupportMember>, HelpdeskError> {
        self.service.list_members().await.map_err(Into::into)
    }
}
