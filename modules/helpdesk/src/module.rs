use std::sync::Arc;

use sea_orm::DatabaseConnection;
use sea_orm_migration::MigratorTrait;
use tracing::{debug, info, warn};

use crate::api::rest::routes;
use crate::config::HelpdeskConfig;
use crate::contract::client::HelpdeskApi;
use crate::domain::ports::SystemClock;
use crate::domain::service::{Service, ServiceConfig};
use crate::gateways::local::HelpdeskLocalClient;
use crate::infra::crypto::{AttachmentCodec, CodecError};
use crate::infra::storage::sea_orm_repo::{SeaOrmMembersRepository, SeaOrmTicketsRepository};

/// Helpdesk module: owns the wired domain service and exposes it through
/// the local client and the REST router.
#[derive(Default)]
pub struct Helpdesk {
    // Keep the domain service behind ArcSwap for cheap read-mostly access.
    service: arc_swap::ArcSwapOption<Service>,
}

impl Clone for Helpdesk {
    fn clone(&self) -> Self {
        Self {
            service: arc_swap::ArcSwapOption::new(self.service.load_full()),
        }
    }
}

impl Helpdesk {
    pub async fn migrate(db: &DatabaseConnection) -> anyhow::Result<()> {
        info!("Running helpdesk database migrations");
        crate::infra::storage::migrations::Migrator::up(db, None).await?;
        info!("Helpdesk database migrations completed successfully");
        Ok(())
    }

    /// Wire repositories and the service, then seed the roster and demo
    /// data as configured.
    pub async fn init(&self, db: DatabaseConnection, cfg: HelpdeskConfig) -> anyhow::Result<()> {
        info!("Initializing helpdesk module");
        debug!(
            "Loaded helpdesk config: seed_roster={}, roster={}, seed_sample_tickets={}",
            cfg.seed_roster,
            cfg.roster.len(),
            cfg.seed_sample_tickets
        );

        let codec = match cfg.attachment_key.as_deref().map(AttachmentCodec::from_secret) {
            Some(Ok(codec)) => Some(Arc::new(codec)),
            Some(Err(CodecError::NotConfigured)) | None => {
                warn!("No attachment_key configured; tickets with attachments will be rejected");
                None
            }
            Some(Err(e)) => return Err(e.into()),
        };
        let has_codec = codec.is_some();

        let tickets = SeaOrmTicketsRepository::new(db.clone(), codec);
        let members = SeaOrmMembersRepository::new(db);
        let service_config = ServiceConfig {
            default_attachment_file_name: cfg.default_attachment_file_name.clone(),
            default_attachment_content_type: cfg.default_attachment_content_type.clone(),
        };
        let service = Arc::new(Service::new(
            Arc::new(tickets),
            Arc::new(members),
            Arc::new(SystemClock),
            service_config,
        ));

        if cfg.seed_roster {
            service.seed_roster(&cfg.roster).await?;
        }
        if cfg.seed_sample_tickets {
            if has_codec {
                service.seed_sample_tickets().await?;
            } else {
                warn!("Sample tickets carry attachments; skipping them without attachment_key");
            }
        }

        self.service.store(Some(service));
        info!("Helpdesk module initialized");
        Ok(())
    }

    pub fn service(&self) -> anyhow::Result<Arc<Service>> {
        self.service
            .load_full()
            .ok_or_else(|| anyhow::anyhow!("Service not initialized"))
    }

    /// In-process client for other modules.
    pub fn client(&self) -> anyhow::Result<Arc<dyn HelpdeskApi>> {
        Ok(Arc::new(HelpdeskLocalClient::new(self.service()?)))
    }

    pub fn register_rest(&self, router: axum::Router) -> anyhow::Result<axum::Router> {
        info!("Registering helpdesk REST routes");
        let router = routes::register_routes(router, self.service()?)?;
        info!("Helpdesk REST routes registered successfully");
        Ok(router)
    }
}
