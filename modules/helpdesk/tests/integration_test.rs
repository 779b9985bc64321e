//! Integration tests for the helpdesk module.
//!
//! Each test runs on a fresh in-memory SQLite DB with migrations applied and
//! drives the domain service over the SeaORM repositories.

mod common;

use std::sync::Arc;

use chrono::{TimeZone, Utc};
use sea_orm::{EntityTrait, PaginatorTrait};
use uuid::Uuid;

use common::{env, env_with_members, new_ticket, with_attachment};
use helpdesk::{
    contract::{client::HelpdeskApi, error::HelpdeskError},
    domain::{error::DomainError, repo::TicketsRepository},
    gateways::local::HelpdeskLocalClient,
    infra::{
        crypto::CodecError,
        storage::{
            entity::{audit_log, ticket},
            SeaOrmTicketsRepository,
        },
    },
    model::{DashboardStats, NewComment, TicketStatus, TicketUpdate, TicketView},
};

fn update_from(view: &TicketView, status: TicketStatus) -> TicketUpdate {
    TicketUpdate {
        title: view.title.clone(),
        description: view.description.clone(),
        status,
        attachment: None,
        concurrency_token: None,
    }
}

#[tokio::test]
async fn assignment_rotates_alphabetically_then_wraps() {
    let env = env_with_members(&["Carol", "Alice", "Bob"]).await;

    let mut assigned = Vec::new();
    for i in 0..4 {
        let t = env
            .service
            .create_ticket(new_ticket(&format!("Issue {i}")))
            .await
            .unwrap();
        assert_eq!(t.status, TicketStatus::InProgress);
        assigned.push(t.assigned_support_member);
    }

    assert_eq!(assigned, vec!["Alice", "Bob", "Carol", "Alice"]);
}

#[tokio::test]
async fn n_members_get_distinct_tickets_before_repeating() {
    let names = ["Eve", "Dave", "Carol", "Bob", "Alice"];
    let env = env_with_members(&names).await;

    let mut assigned = Vec::new();
    for i in 0..names.len() {
        let t = env
            .service
            .create_ticket(new_ticket(&format!("Issue {i}")))
            .await
            .unwrap();
        assigned.push(t.assigned_support_member);
    }

    assigned.sort();
    assigned.dedup();
    assert_eq!(assigned.len(), names.len());
}

#[tokio::test]
async fn resolved_tickets_free_up_capacity() {
    let env = env_with_members(&["Alice", "Bob"]).await;

    let first = env.service.create_ticket(new_ticket("A")).await.unwrap();
    assert_eq!(first.assigned_support_member, "Alice");
    env.service
        .update_ticket(first.id, update_from(&first, TicketStatus::Resolved))
        .await
        .unwrap()
        .unwrap();

    // Alice has no unresolved work again, so the tie-break picks her.
    let second = env.service.create_ticket(new_ticket("B")).await.unwrap();
    assert_eq!(second.assigned_support_member, "Alice");
}

#[tokio::test]
async fn create_without_members_fails() {
    let env = env_with_members(&[]).await;
    let err = env.service.create_ticket(new_ticket("X")).await.unwrap_err();
    assert_eq!(err, DomainError::NoAssigneeAvailable);
}

#[tokio::test]
async fn create_rejects_blank_title() {
    let env = env_with_members(&["Alice"]).await;
    let err = env.service.create_ticket(new_ticket("  ")).await.unwrap_err();
    assert!(matches!(err, DomainError::Validation { .. }));
    assert!(env.service.list_tickets().await.unwrap().is_empty());
}

#[tokio::test]
async fn idempotent_create_returns_existing_ticket() {
    let env = env_with_members(&["Alice", "Bob"]).await;

    let mut req = new_ticket("Printer jam");
    req.idempotency_key = Some("req-42".to_string());
    let first = env.service.create_ticket(req).await.unwrap();

    // Different payload, same key.
    let mut retry = new_ticket("Something else entirely");
    retry.idempotency_key = Some("req-42".to_string());
    retry.tags = vec!["P1".to_string()];
    let second = env.service.create_ticket(retry).await.unwrap();

    assert_eq!(second.id, first.id);
    assert_eq!(second.title, "Printer jam");
    assert_eq!(second.assigned_support_member, first.assigned_support_member);
    assert!(second.tags.is_empty());
    assert_eq!(second.idempotency_key.as_deref(), Some("req-42"));

    assert_eq!(env.service.list_tickets().await.unwrap().len(), 1);
}

#[tokio::test]
async fn concurrent_creates_with_same_key_store_one_ticket() {
    let env = env_with_members(&["Alice", "Bob"]).await;

    let mut req = new_ticket("Race");
    req.idempotency_key = Some("race-key".to_string());

    let (a, b) = tokio::join!(
        env.service.create_ticket(req.clone()),
        env.service.create_ticket(req.clone())
    );
    let (a, b) = (a.unwrap(), b.unwrap());

    assert_eq!(a.id, b.id);
    assert_eq!(ticket::Entity::find().count(&env.db).await.unwrap(), 1);
}

#[tokio::test]
async fn blank_idempotency_key_is_ignored() {
    let env = env_with_members(&["Alice"]).await;

    let mut req = new_ticket("Same");
    req.idempotency_key = Some("   ".to_string());
    let a = env.service.create_ticket(req.clone()).await.unwrap();
    let b = env.service.create_ticket(req).await.unwrap();

    assert_ne!(a.id, b.id);
    assert_eq!(a.idempotency_key, None);
}

#[tokio::test]
async fn oversized_idempotency_key_is_rejected() {
    let env = env_with_members(&["Alice"]).await;

    let mut req = new_ticket("Long key");
    req.idempotency_key = Some("k".repeat(101));
    let err = env.service.create_ticket(req).await.unwrap_err();
    assert!(matches!(err, DomainError::Validation { .. }));
}

#[tokio::test]
async fn creation_tags_are_normalized_and_sorted() {
    let env = env_with_members(&["Alice"]).await;

    let mut req = new_ticket("Tagged");
    req.tags = ["  vpn ", "P1", "", "p1", "Hardware", "   "]
        .into_iter()
        .map(String::from)
        .collect();
    let t = env.service.create_ticket(req).await.unwrap();

    assert_eq!(t.tag_names(), vec!["Hardware", "P1", "vpn"]);
}

#[tokio::test]
async fn attach_tag_dedups_case_insensitively() {
    let env = env_with_members(&["Alice"]).await;
    let t = env.service.create_ticket(new_ticket("T")).await.unwrap();

    let after_first = env.service.attach_tag(t.id, "P1").await.unwrap().unwrap();
    let after_second = env.service.attach_tag(t.id, "p1").await.unwrap().unwrap();

    assert_eq!(after_first.tag_names(), vec!["P1"]);
    assert_eq!(after_second.tag_names(), vec!["P1"]);
    assert_eq!(after_first.tags[0].id, after_second.tags[0].id);
}

#[tokio::test]
async fn tags_are_shared_between_tickets() {
    let env = env_with_members(&["Alice"]).await;
    let a = env.service.create_ticket(new_ticket("A")).await.unwrap();
    let b = env.service.create_ticket(new_ticket("B")).await.unwrap();

    let a = env.service.attach_tag(a.id, "Network").await.unwrap().unwrap();
    let b = env.service.attach_tag(b.id, " NETWORK ").await.unwrap().unwrap();

    assert_eq!(a.tags[0].id, b.tags[0].id);
    assert_eq!(b.tags[0].name, "Network");
}

#[tokio::test]
async fn attach_blank_tag_is_validation_error() {
    let env = env_with_members(&["Alice"]).await;
    let t = env.service.create_ticket(new_ticket("T")).await.unwrap();

    let err = env.service.attach_tag(t.id, "  ").await.unwrap_err();
    assert!(matches!(err, DomainError::Validation { .. }));
}

#[tokio::test]
async fn tag_operations_on_missing_ticket_return_none() {
    let env = env_with_members(&["Alice"]).await;

    assert!(env
        .service
        .attach_tag(Uuid::new_v4(), "P1")
        .await
        .unwrap()
        .is_none());
    assert!(env
        .service
        .detach_tag(Uuid::new_v4(), Uuid::new_v4())
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn detach_tag_removes_by_id() {
    let env = env_with_members(&["Alice"]).await;
    let mut req = new_ticket("T");
    req.tags = vec!["P1".to_string(), "Hardware".to_string()];
    let t = env.service.create_ticket(req).await.unwrap();

    let p1 = t.tags.iter().find(|tag| tag.name == "P1").unwrap().id;
    let after = env.service.detach_tag(t.id, p1).await.unwrap().unwrap();
    assert_eq!(after.tag_names(), vec!["Hardware"]);

    // Unknown tag id is a no-op.
    let same = env
        .service
        .detach_tag(t.id, Uuid::new_v4())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(same.tag_names(), vec!["Hardware"]);
    assert_eq!(same.concurrency_token, after.concurrency_token);
}

#[tokio::test]
async fn closed_ticket_rejects_edits_and_comments() {
    let env = env_with_members(&["Alice"]).await;
    let t = env.service.create_ticket(new_ticket("T")).await.unwrap();

    let closed = env
        .service
        .update_ticket(t.id, update_from(&t, TicketStatus::Closed))
        .await
        .unwrap()
        .unwrap();
    assert_eq!(closed.status, TicketStatus::Closed);

    let mut edit = update_from(&closed, TicketStatus::Open);
    edit.title = "Reopened".to_string();
    let err = env.service.update_ticket(t.id, edit).await.unwrap_err();
    assert!(matches!(
        err,
        DomainError::InvalidState {
            status: TicketStatus::Closed,
            ..
        }
    ));

    let err = env
        .service
        .add_comment(
            t.id,
            NewComment {
                author_name: "Alice".to_string(),
                message: "Any update?".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::InvalidState { .. }));

    let stored = env.service.get_ticket(t.id).await.unwrap().unwrap();
    assert_eq!(stored, closed);
}

#[tokio::test]
async fn closed_ticket_still_accepts_tag_changes() {
    let env = env_with_members(&["Alice"]).await;
    let t = env.service.create_ticket(new_ticket("T")).await.unwrap();
    env.service
        .update_ticket(t.id, update_from(&t, TicketStatus::Closed))
        .await
        .unwrap();

    let tagged = env.service.attach_tag(t.id, "Archived").await.unwrap().unwrap();
    assert_eq!(tagged.tag_names(), vec!["Archived"]);

    let untagged = env
        .service
        .detach_tag(t.id, tagged.tags[0].id)
        .await
        .unwrap()
        .unwrap();
    assert!(untagged.tags.is_empty());
}

#[tokio::test]
async fn missing_ticket_is_none_not_error() {
    let env = env_with_members(&["Alice"]).await;
    let id = Uuid::new_v4();

    assert!(env.service.get_ticket(id).await.unwrap().is_none());
    assert!(env
        .service
        .update_ticket(
            id,
            TicketUpdate {
                title: "t".to_string(),
                description: "d".to_string(),
                status: TicketStatus::Open,
                attachment: None,
                concurrency_token: None,
            }
        )
        .await
        .unwrap()
        .is_none());
    assert!(env
        .service
        .add_comment(
            id,
            NewComment {
                author_name: "a".to_string(),
                message: "m".to_string(),
            }
        )
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn comments_are_appended_in_order() {
    let env = env_with_members(&["Alice"]).await;
    let t = env.service.create_ticket(new_ticket("T")).await.unwrap();

    for (author, message) in [("Alice", "Looking into it"), ("Jordan", "Thanks")] {
        let c = env
            .service
            .add_comment(
                t.id,
                NewComment {
                    author_name: author.to_string(),
                    message: message.to_string(),
                },
            )
            .await
            .unwrap()
            .unwrap();
        assert_eq!(c.ticket_id, t.id);
    }

    let stored = env.service.get_ticket(t.id).await.unwrap().unwrap();
    let authors: Vec<_> = stored.comments.iter().map(|c| c.author_name.as_str()).collect();
    assert_eq!(authors, vec!["Alice", "Jordan"]);
    assert_ne!(stored.concurrency_token, t.concurrency_token);
}

#[tokio::test]
async fn comments_with_equal_timestamps_keep_thread_order() {
    let env = env_with_members(&["Alice"]).await;
    let t = env.service.create_ticket(new_ticket("T")).await.unwrap();
    let repo = SeaOrmTicketsRepository::new(env.db.clone(), None);
    let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 30, 0).unwrap();

    let expected: Vec<String> = (0..12).map(|i| format!("reply {i}")).collect();
    for message in &expected {
        repo.add_comment(t.id, "Alice", message, at)
            .await
            .unwrap()
            .unwrap();
    }

    let stored = repo.find_by_id(t.id).await.unwrap().unwrap();
    let messages: Vec<_> = stored.comments().iter().map(|c| c.message.clone()).collect();
    assert_eq!(messages, expected);
}

#[tokio::test]
async fn stale_concurrency_token_is_rejected() {
    let env = env_with_members(&["Alice"]).await;
    let t = env.service.create_ticket(new_ticket("T")).await.unwrap();
    let stale_token = t.concurrency_token.clone();
    assert!(stale_token.is_some());

    let mut first = update_from(&t, TicketStatus::InProgress);
    first.title = "First edit".to_string();
    first.concurrency_token = stale_token.clone();
    let updated = env.service.update_ticket(t.id, first).await.unwrap().unwrap();
    assert_ne!(updated.concurrency_token, stale_token);

    let mut second = update_from(&t, TicketStatus::InProgress);
    second.title = "Second edit".to_string();
    second.concurrency_token = stale_token;
    let err = env.service.update_ticket(t.id, second).await.unwrap_err();
    assert_eq!(err, DomainError::ConcurrencyConflict { id: t.id });

    let stored = env.service.get_ticket(t.id).await.unwrap().unwrap();
    assert_eq!(stored.title, "First edit");
}

#[tokio::test]
async fn malformed_concurrency_token_is_validation_error() {
    let env = env_with_members(&["Alice"]).await;
    let t = env.service.create_ticket(new_ticket("T")).await.unwrap();

    let mut update = update_from(&t, TicketStatus::Resolved);
    update.concurrency_token = Some("%%%".to_string());
    let err = env.service.update_ticket(t.id, update).await.unwrap_err();
    assert!(matches!(err, DomainError::Validation { .. }));
}

#[tokio::test]
async fn attachment_is_encrypted_at_rest() {
    let env = env_with_members(&["Alice"]).await;

    // "VPN steps..."
    let payload = "VlBOIHN0ZXBzLi4u";
    let t = env
        .service
        .create_ticket(with_attachment(new_ticket("VPN"), payload))
        .await
        .unwrap();

    assert_eq!(t.attachment_base64.as_deref(), Some(payload));
    assert_eq!(t.attachment_file_name.as_deref(), Some("attachment"));
    assert_eq!(
        t.attachment_content_type.as_deref(),
        Some("application/octet-stream")
    );

    let row = ticket::Entity::find_by_id(t.id)
        .one(&env.db)
        .await
        .unwrap()
        .unwrap();
    let sealed = row.attachment_data.unwrap();
    assert_ne!(sealed, b"VPN steps...".to_vec());
    // nonce + ciphertext + tag
    assert_eq!(sealed.len(), 12 + b"VPN steps...".len() + 16);

    let reread = env.service.get_ticket(t.id).await.unwrap().unwrap();
    assert_eq!(reread.attachment_base64.as_deref(), Some(payload));
}

#[tokio::test]
async fn update_replaces_attachment() {
    let env = env_with_members(&["Alice"]).await;
    let t = env
        .service
        .create_ticket(with_attachment(new_ticket("T"), "AQID"))
        .await
        .unwrap();

    let mut update = update_from(&t, TicketStatus::InProgress);
    update.attachment = Some(helpdesk::model::NewAttachment {
        file_name: Some("log.txt".to_string()),
        content_type: Some("text/plain".to_string()),
        data_base64: "BAUG".to_string(),
    });
    let updated = env.service.update_ticket(t.id, update).await.unwrap().unwrap();

    assert_eq!(updated.attachment_base64.as_deref(), Some("BAUG"));
    assert_eq!(updated.attachment_file_name.as_deref(), Some("log.txt"));
    assert_eq!(updated.attachment_content_type.as_deref(), Some("text/plain"));
}

#[tokio::test]
async fn blank_attachment_payload_means_no_attachment() {
    let env = env_with_members(&["Alice"]).await;
    let t = env
        .service
        .create_ticket(with_attachment(new_ticket("T"), "  "))
        .await
        .unwrap();
    assert_eq!(t.attachment_base64, None);
}

#[tokio::test]
async fn malformed_attachment_is_validation_error() {
    let env = env_with_members(&["Alice"]).await;
    let err = env
        .service
        .create_ticket(with_attachment(new_ticket("T"), "not base64!"))
        .await
        .unwrap_err();
    assert!(matches!(err, DomainError::Validation { .. }));
}

#[tokio::test]
async fn attachment_without_key_is_not_configured() {
    let env = env(&["Alice"], false).await;

    let err = env
        .service
        .create_ticket(with_attachment(new_ticket("T"), "AQID"))
        .await
        .unwrap_err();
    assert_eq!(err, DomainError::Codec(CodecError::NotConfigured));
    assert!(env.service.list_tickets().await.unwrap().is_empty());

    // Tickets without attachments still work.
    assert!(env.service.create_ticket(new_ticket("Plain")).await.is_ok());
}

#[tokio::test]
async fn dashboard_counts_by_status() {
    let env = env_with_members(&["Alice", "Bob"]).await;

    let a = env.service.create_ticket(new_ticket("A")).await.unwrap();
    env.service.create_ticket(new_ticket("B")).await.unwrap();
    env.service
        .update_ticket(a.id, update_from(&a, TicketStatus::Resolved))
        .await
        .unwrap();

    let stats = env.service.dashboard().await.unwrap();
    assert_eq!(
        stats,
        DashboardStats {
            total: 2,
            in_progress: 1,
            unresolved: 1,
        }
    );
}

#[tokio::test]
async fn list_is_newest_first() {
    let env = env_with_members(&["Alice"]).await;
    for title in ["first", "second", "third"] {
        env.service.create_ticket(new_ticket(title)).await.unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
    }
    let titles: Vec<_> = env
        .service
        .list_tickets()
        .await
        .unwrap()
        .into_iter()
        .map(|t| t.title)
        .collect();
    assert_eq!(titles, vec!["third", "second", "first"]);
}

#[tokio::test]
async fn mutations_write_audit_records() {
    let env = env_with_members(&["Alice"]).await;
    let t = env.service.create_ticket(new_ticket("T")).await.unwrap();
    env.service.attach_tag(t.id, "P1").await.unwrap();
    env.service
        .add_comment(
            t.id,
            NewComment {
                author_name: "Alice".to_string(),
                message: "On it".to_string(),
            },
        )
        .await
        .unwrap();

    let actions: Vec<String> = audit_log::Entity::find()
        .all(&env.db)
        .await
        .unwrap()
        .into_iter()
        .map(|a| a.action)
        .collect();
    assert!(actions.contains(&"Created".to_string()));
    assert!(actions.contains(&"TagAttached".to_string()));
    assert!(actions.contains(&"CommentAdded".to_string()));
}

#[tokio::test]
async fn sample_tickets_seed_once() {
    let env = env_with_members(&["Alice", "Bob"]).await;

    assert_eq!(env.service.seed_sample_tickets().await.unwrap(), 2);
    assert_eq!(env.service.seed_sample_tickets().await.unwrap(), 0);

    let tickets = env.service.list_tickets().await.unwrap();
    let laptop = tickets.iter().find(|t| t.title == "Broken laptop").unwrap();
    assert_eq!(laptop.status, TicketStatus::Resolved);
    assert_eq!(laptop.tag_names(), vec!["Hardware"]);

    let onboarding = tickets.iter().find(|t| t.title == "Onboarding help").unwrap();
    assert_eq!(onboarding.assigned_support_member, "Alice");
    assert_eq!(onboarding.attachment_base64.as_deref(), Some("VlBOIHN0ZXBzLi4u"));

    let stats = env.service.dashboard().await.unwrap();
    assert_eq!((stats.total, stats.in_progress, stats.unresolved), (2, 1, 1));
}

#[tokio::test]
async fn members_are_listed_by_name() {
    let env = env_with_members(&["Carol", "Alice", "Bob"]).await;
    let names: Vec<_> = env
        .service
        .list_members()
        .await
        .unwrap()
        .into_iter()
        .map(|m| m.name)
        .collect();
    assert_eq!(names, vec!["Alice", "Bob", "Carol"]);
}

#[tokio::test]
async fn local_client_maps_errors() {
    let env = env_with_members(&["Alice"]).await;
    let client: Arc<dyn HelpdeskApi> = Arc::new(HelpdeskLocalClient::new(env.service.clone()));

    let t = client.create_ticket(new_ticket("T")).await.unwrap();
    assert!(client.get_ticket(Uuid::new_v4()).await.unwrap().is_none());

    client
        .update_ticket(t.id, update_from(&t, TicketStatus::Closed))
        .await
        .unwrap();
    let err = client
        .add_comment(
            t.id,
            NewComment {
                author_name: "Alice".to_string(),
                message: "late".to_string(),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, HelpdeskError::Conflict { .. }));

    let err = client.create_ticket(new_ticket(" ")).await.unwrap_err();
    assert!(matches!(err, HelpdeskError::Validation { .. }));

    let stats = client.dashboard().await.unwrap();
    assert_eq!(stats.total, 1);
    assert_eq!(client.list_members().await.unwrap().len(), 1);
}
