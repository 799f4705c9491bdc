use chrono::{Duration, SubsecRound, Utc};
use inventra_application::{PendingChangeQuery, PendingChangeRepository};
use inventra_core::{NonEmptyString, WorkspaceId};
use inventra_domain::{ChangeAction, EntityKind, NewPendingChange, PendingChange, PendingChangeStatus};
use serde_json::json;
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use super::PostgresPendingChangeRepository;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run migrations for postgres pending change tests: {error}");
    }

    Some(pool)
}

fn change(workspace_id: WorkspaceId, requester: &str, offset_seconds: i64) -> PendingChange {
    PendingChange::submit(
        NewPendingChange {
            id: Uuid::new_v4().to_string(),
            workspace_id,
            requester: requester.to_owned(),
            entity_kind: EntityKind::Company,
            entity_id: None,
            action: ChangeAction::Create,
            payload: json!({"name": "Acme"}),
        },
        Utc::now().trunc_subsecs(6) + Duration::seconds(offset_seconds),
    )
    .unwrap_or_else(|_| unreachable!())
}

#[tokio::test]
async fn insert_and_find_preserve_every_column() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresPendingChangeRepository::new(pool);
    let workspace_id = WorkspaceId::new();
    let pending = change(workspace_id, "viewer", 0);

    assert!(repository.insert(&pending).await.is_ok());
    let found = repository.find(workspace_id, pending.id()).await;
    assert_eq!(found.ok().flatten(), Some(pending.clone()));

    let elsewhere = repository.find(WorkspaceId::new(), pending.id()).await;
    assert_eq!(elsewhere.ok().flatten(), None);
}

#[tokio::test]
async fn review_is_saved_only_while_pending() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresPendingChangeRepository::new(pool);
    let workspace_id = WorkspaceId::new();
    let pending = change(workspace_id, "viewer", 0);
    assert!(repository.insert(&pending).await.is_ok());

    let reason = NonEmptyString::new("duplicate vendor").unwrap_or_else(|_| unreachable!());
    let rejected = pending
        .reject("owner", reason, Utc::now().trunc_subsecs(6))
        .unwrap_or_else(|_| unreachable!());
    let approved = pending
        .approve("admin", Utc::now().trunc_subsecs(6))
        .unwrap_or_else(|_| unreachable!());

    assert_eq!(repository.save_review(&rejected).await.ok(), Some(true));
    assert_eq!(repository.save_review(&approved).await.ok(), Some(false));

    let stored = repository.find(workspace_id, pending.id()).await;
    assert_eq!(stored.ok().flatten(), Some(rejected));
}

#[tokio::test]
async fn approved_create_stores_the_created_entity_id() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresPendingChangeRepository::new(pool);
    let workspace_id = WorkspaceId::new();
    let pending = change(workspace_id, "viewer", 0);
    assert!(repository.insert(&pending).await.is_ok());

    let approved = pending
        .approve("owner", Utc::now().trunc_subsecs(6))
        .unwrap_or_else(|_| unreachable!());
    assert_eq!(repository.save_review(&approved).await.ok(), Some(true));

    let stored = repository.find(workspace_id, pending.id()).await.ok().flatten();
    assert_eq!(
        stored.as_ref().and_then(PendingChange::entity_id),
        Some(pending.id())
    );
}

#[tokio::test]
async fn list_filters_and_orders_oldest_first() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresPendingChangeRepository::new(pool);
    let workspace_id = WorkspaceId::new();
    let newer = change(workspace_id, "viewer", 5);
    let older = change(workspace_id, "member", 1);
    assert!(repository.insert(&newer).await.is_ok());
    assert!(repository.insert(&older).await.is_ok());

    let all = repository
        .list(workspace_id, PendingChangeQuery::default())
        .await
        .unwrap_or_default();
    let ids = all.iter().map(PendingChange::id).collect::<Vec<_>>();
    assert_eq!(ids, vec![older.id(), newer.id()]);

    let mine = repository
        .list(
            workspace_id,
            PendingChangeQuery {
                status: Some(PendingChangeStatus::Pending),
                requester: Some("viewer".to_owned()),
            },
        )
        .await
        .unwrap_or_default();
    assert_eq!(mine, vec![newer.clone()]);

    assert_eq!(repository.delete(workspace_id, newer.id()).await.ok(), Some(true));
    assert_eq!(repository.delete(workspace_id, newer.id()).await.ok(), Some(false));
}
