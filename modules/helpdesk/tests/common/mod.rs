//! Shared fixtures: fresh in-memory SQLite with migrations and a wired service.
#![allow(dead_code)]

use std::sync::Arc;

use sea_orm::{ConnectOptions, Database, DatabaseConnection};
use sea_orm_migration::MigratorTrait;

use helpdesk::{
    domain::{
        ports::SystemClock,
        repo::MembersRepository,
        service::{Service, ServiceConfig},
    },
    infra::{
        crypto::AttachmentCodec,
        storage::{migrations::Migrator, SeaOrmMembersRepository, SeaOrmTicketsRepository},
    },
    model::{NewAttachment, NewTicket},
};

pub const TEST_SECRET: &str = "helpdesk-test-secret";

/// Fresh in-memory database with migrations applied.
///
/// One pooled connection: every `sqlite::memory:` connection is its own database.
pub async fn create_test_db() -> DatabaseConnection {
    let mut opts = ConnectOptions::new("sqlite::memory:");
    opts.max_connections(1).sqlx_logging(false);
    let db = Database::connect(opts)
        .await
        .expect("Failed to connect to test database");
    Migrator::up(&db, None)
        .await
        .expect("Failed to run migrations");
    db
}

pub struct TestEnv {
    pub db: DatabaseConnection,
    pub service: Arc<Service>,
}

/// Service over SeaORM repositories with the given roster and an attachment codec.
pub async fn env_with_members(names: &[&str]) -> TestEnv {
    env(names, true).await
}

pub async fn env(names: &[&str], with_codec: bool) -> TestEnv {
    let db = create_test_db().await;

    let codec = with_codec
        .then(|| AttachmentCodec::from_secret(TEST_SECRET).expect("codec"))
        .map(Arc::new);
    let tickets = SeaOrmTicketsRepository::new(db.clone(), codec);
    let members = SeaOrmMembersRepository::new(db.clone());

    let roster: Vec<String> = names.iter().map(|n| n.to_string()).collect();
    members.ensure_roster(&roster).await.expect("seed roster");

    let service = Arc::new(Service::new(
        Arc::new(tickets),
        Arc::new(members),
        Arc::new(SystemClock),
        ServiceConfig::default(),
    ));
    TestEnv { db, service }
}

pub fn new_ticket(title: &str) -> NewTicket {
    NewTicket {
        title: title.to_string(),
        description: format!("{title} description"),
        requester_name: "Jordan".to_string(),
        ..Default::default()
    }
}

pub fn with_attachment(mut t: NewTicket, data_base64: &str) -> NewTicket {
    t.attachment = Some(NewAttachment {
        file_name: None,
        content_type: None,
        data_base64: data_base64.to_string(),
    });
    t
}
