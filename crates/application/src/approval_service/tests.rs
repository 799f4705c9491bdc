use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use inventra_core::{AppError, AppResult, UserIdentity, WorkspaceId};
use inventra_domain::{AuditAction, Item, PendingChange, PendingChangeStatus, WorkspaceRole};
use serde_json::{Value, json};
use tokio::sync::Mutex;

use super::{ApprovalError, ApprovalErrorCode, ApprovalService, SubmitChangeInput};
use crate::AuthorizationService;
use crate::catalog_ports::EntityRepository;
use crate::change_ports::{
    AuditEvent, AuditRepository, ChangeEvent, ChangeEventKind, ChangeEventPublisher,
    PendingChangeQuery, PendingChangeRepository,
};
use crate::change_router::ChangeRouter;
use crate::entity_gateway::EntityGatewayRegistry;
use crate::test_support::{
    FakeAuthorizationRepository, FakeEntityRepository, actor, item_registry, seed_item, t0,
};

#[derive(Default)]
struct FakePendingChangeRepository {
    changes: Mutex<HashMap<String, PendingChange>>,
}

#[async_trait]
impl PendingChangeRepository for FakePendingChangeRepository {
    async fn insert(&self, change: &PendingChange) -> AppResult<()> {
        self.changes
            .lock()
            .await
            .insert(change.id().to_owned(), change.clone());
        Ok(())
    }

    async fn find(
        &self,
        workspace_id: WorkspaceId,
        change_id: &str,
    ) -> AppResult<Option<PendingChange>> {
        Ok(self
            .changes
            .lock()
            .await
            .get(change_id)
            .filter(|change| change.workspace_id() == workspace_id)
            .cloned())
    }

    async fn list(
        &self,
        workspace_id: WorkspaceId,
        query: PendingChangeQuery,
    ) -> AppResult<Vec<PendingChange>> {
        let mut changes = self
            .changes
            .lock()
            .await
            .values()
            .filter(|change| change.workspace_id() == workspace_id)
            .filter(|change| query.status.is_none_or(|status| change.status() == status))
            .filter(|change| {
                query
                    .requester
                    .as_deref()
                    .is_none_or(|requester| change.requester() == requester)
            })
            .cloned()
            .collect::<Vec<_>>();
        changes.sort_by_key(PendingChange::created_at);
        Ok(changes)
    }

    async fn save_review(&self, change: &PendingChange) -> AppResult<bool> {
        let mut changes = self.changes.lock().await;
        match changes.get(change.id()) {
            Some(stored) if stored.is_pending() => {
                changes.insert(change.id().to_owned(), change.clone());
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn delete(&self, _workspace_id: WorkspaceId, change_id: &str) -> AppResult<bool> {
        Ok(self.changes.lock().await.remove(change_id).is_some())
    }
}

#[derive(Default)]
struct RecordingPublisher {
    events: Mutex<Vec<ChangeEvent>>,
    fail: bool,
}

#[async_trait]
impl ChangeEventPublisher for RecordingPublisher {
    async fn publish(&self, event: ChangeEvent) -> AppResult<()> {
        if self.fail {
            return Err(AppError::Internal("broadcaster offline".to_owned()));
        }
        self.events.lock().await.push(event);
        Ok(())
    }
}

struct HungPublisher;

#[async_trait]
impl ChangeEventPublisher for HungPublisher {
    async fn publish(&self, _event: ChangeEvent) -> AppResult<()> {
        std::future::pending::<()>().await;
        Ok(())
    }
}

/// Item storage that suspends once before every insert.
struct YieldingItems(Arc<FakeEntityRepository<Item>>);

#[async_trait]
impl EntityRepository<Item> for YieldingItems {
    async fn find(&self, workspace_id: WorkspaceId, entity_id: &str) -> AppResult<Option<Item>> {
        self.0.find(workspace_id, entity_id).await
    }

    async fn insert(&self, entity: Item) -> AppResult<()> {
        tokio::task::yield_now().await;
        self.0.insert(entity).await
    }

    async fn update(&self, entity: Item, read_version: DateTime<Utc>) -> AppResult<()> {
        self.0.update(entity, read_version).await
    }

    async fn delete(&self, workspace_id: WorkspaceId, entity_id: &str) -> AppResult<()> {
        self.0.delete(workspace_id, entity_id).await
    }
}

#[derive(Default)]
struct FakeAuditRepository {
    events: Mutex<Vec<AuditEvent>>,
}

#[async_trait]
impl AuditRepository for FakeAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        self.events.lock().await.push(event);
        Ok(())
    }
}

struct Harness {
    workspace_id: WorkspaceId,
    service: ApprovalService,
    changes: Arc<FakePendingChangeRepository>,
    items: Arc<FakeEntityRepository<Item>>,
    publisher: Arc<RecordingPublisher>,
    audit: Arc<FakeAuditRepository>,
}

impl Harness {
    fn actor(&self, subject: &str) -> UserIdentity {
        actor(subject, self.workspace_id)
    }

    async fn stored(&self, change_id: &str) -> Option<PendingChange> {
        self.changes.lock_get(change_id).await
    }

    /// Waits for the background publisher to deliver `count` events.
    async fn published(&self, count: usize) -> Vec<ChangeEvent> {
        for _ in 0..100 {
            let events = self.publisher.events.lock().await.clone();
            if events.len() >= count {
                return events;
            }
            tokio::task::yield_now().await;
        }
        self.publisher.events.lock().await.clone()
    }
}

impl FakePendingChangeRepository {
    async fn lock_get(&self, change_id: &str) -> Option<PendingChange> {
        self.changes.lock().await.get(change_id).cloned()
    }
}

struct Services {
    service: ApprovalService,
    changes: Arc<FakePendingChangeRepository>,
    audit: Arc<FakeAuditRepository>,
}

async fn services(
    workspace_id: WorkspaceId,
    router: ChangeRouter,
    publisher: Arc<dyn ChangeEventPublisher>,
) -> Services {
    let authorization = FakeAuthorizationRepository::with_members(
        workspace_id,
        &[
            ("owner", WorkspaceRole::Owner),
            ("admin", WorkspaceRole::Admin),
            ("member", WorkspaceRole::Member),
            ("viewer", WorkspaceRole::Viewer),
        ],
    )
    .await;
    let changes = Arc::new(FakePendingChangeRepository::default());
    let audit = Arc::new(FakeAuditRepository::default());

    let service = ApprovalService::new(
        AuthorizationService::new(authorization),
        changes.clone(),
        router,
        publisher,
        audit.clone(),
    );

    Services {
        service,
        changes,
        audit,
    }
}

async fn harness_with(publisher: RecordingPublisher) -> Harness {
    let workspace_id = WorkspaceId::new();
    let items = Arc::new(FakeEntityRepository::<Item>::default());
    seed_item(&items, workspace_id, "item-x", "Drill", t0()).await;
    let publisher = Arc::new(publisher);
    let Services {
        service,
        changes,
        audit,
    } = services(
        workspace_id,
        ChangeRouter::new(item_registry(items.clone())),
        publisher.clone(),
    )
    .await;

    Harness {
        workspace_id,
        service,
        changes,
        items,
        publisher,
        audit,
    }
}

async fn harness() -> Harness {
    harness_with(RecordingPublisher::default()).await
}

fn create_item(name: &str) -> SubmitChangeInput {
    SubmitChangeInput {
        entity_type: "item".to_owned(),
        entity_id: None,
        action: "create".to_owned(),
        payload: json!({ "name": name }),
    }
}

fn change_on(action: &str, entity_id: &str, payload: Value) -> SubmitChangeInput {
    SubmitChangeInput {
        entity_type: "item".to_owned(),
        entity_id: Some(entity_id.to_owned()),
        action: action.to_owned(),
        payload,
    }
}

async fn submitted(harness: &Harness, input: SubmitChangeInput) -> PendingChange {
    let change = harness.service.submit(&harness.actor("viewer"), input).await;
    assert!(change.is_ok());
    change.unwrap_or_else(|_| unreachable!())
}

fn code<T>(result: &Result<T, ApprovalError>) -> Option<ApprovalErrorCode> {
    result.as_ref().err().and_then(ApprovalError::code)
}

#[tokio::test]
async fn submit_persists_a_pending_change_and_notifies() {
    let harness = harness().await;

    let change = submitted(&harness, create_item("Ladder")).await;

    assert_eq!(change.status(), PendingChangeStatus::Pending);
    assert_eq!(change.requester(), "viewer");
    assert_eq!(harness.stored(change.id()).await, Some(change.clone()));
    assert_eq!(harness.items.len().await, 1);

    let events = harness.published(1).await;
    assert_eq!(events.len(), 1);
    assert_eq!(events[0].kind, ChangeEventKind::Created);
    assert_eq!(events[0].change_id, change.id());
    let audit = harness.audit.events.lock().await;
    assert_eq!(audit[0].action, AuditAction::PendingChangeSubmitted);
}

#[tokio::test]
async fn submit_validates_the_proposed_change() {
    let harness = harness().await;
    let viewer = harness.actor("viewer");

    let unknown_kind = harness
        .service
        .submit(
            &viewer,
            SubmitChangeInput {
                entity_type: "spaceship".to_owned(),
                ..create_item("Ladder")
            },
        )
        .await;
    assert_eq!(code(&unknown_kind), Some(ApprovalErrorCode::InvalidEntityType));

    let unregistered_kind = harness
        .service
        .submit(
            &viewer,
            SubmitChangeInput {
                entity_type: "loan".to_owned(),
                ..create_item("Ladder")
            },
        )
        .await;
    assert_eq!(
        code(&unregistered_kind),
        Some(ApprovalErrorCode::InvalidEntityType)
    );

    let unknown_action = harness
        .service
        .submit(
            &viewer,
            SubmitChangeInput {
                action: "upsert".to_owned(),
                ..create_item("Ladder")
            },
        )
        .await;
    assert_eq!(code(&unknown_action), Some(ApprovalErrorCode::InvalidAction));

    let empty_payload = harness
        .service
        .submit(&viewer, change_on("update", "item-x", json!({})))
        .await;
    assert_eq!(code(&empty_payload), Some(ApprovalErrorCode::InvalidData));

    assert!(harness.changes.changes.lock().await.is_empty());
}

#[tokio::test]
async fn non_members_cannot_submit() {
    let harness = harness().await;

    let result = harness
        .service
        .submit(&harness.actor("stranger"), create_item("Ladder"))
        .await;
    assert_eq!(code(&result), Some(ApprovalErrorCode::Unauthorized));
}

#[tokio::test]
async fn failing_notifications_never_fail_the_submission() {
    let harness = harness_with(RecordingPublisher {
        fail: true,
        ..RecordingPublisher::default()
    })
    .await;

    let change = submitted(&harness, create_item("Ladder")).await;
    assert!(harness.stored(change.id()).await.is_some());
}

#[tokio::test]
async fn owner_approval_creates_the_item() {
    let harness = harness().await;
    let change = submitted(&harness, create_item("Ladder")).await;

    let approved = harness
        .service
        .approve(&harness.actor("owner"), change.id())
        .await;
    assert!(approved.is_ok());
    let approved = approved.unwrap_or_else(|_| unreachable!());

    assert_eq!(approved.change.status(), PendingChangeStatus::Approved);
    assert_eq!(approved.change.reviewer(), Some("owner"));
    assert!(approved.change.reviewed_at().is_some());
    assert_eq!(approved.entity_id, change.id());
    assert_eq!(approved.change.entity_id(), Some(change.id()));
    let created = harness
        .items
        .get(harness.workspace_id, approved.entity_id.as_str())
        .await;
    assert_eq!(
        created.map(|item| item.name().as_str().to_owned()),
        Some("Ladder".to_owned())
    );
    assert_eq!(harness.stored(change.id()).await, Some(approved.change));

    let events = harness.published(2).await;
    assert_eq!(events.last().map(|event| event.kind), Some(ChangeEventKind::Approved));
    assert_eq!(
        events.last().and_then(|event| event.entity_id.clone()),
        Some(approved.entity_id)
    );
}

#[tokio::test]
async fn concurrent_approvals_of_one_create_insert_a_single_item() {
    let workspace_id = WorkspaceId::new();
    let items = Arc::new(FakeEntityRepository::<Item>::default());
    let registry =
        EntityGatewayRegistry::new().register::<Item>(Arc::new(YieldingItems(items.clone())));
    let Services {
        service, changes, ..
    } = services(
        workspace_id,
        ChangeRouter::new(registry),
        Arc::new(RecordingPublisher::default()),
    )
    .await;
    let change = service
        .submit(&actor("viewer", workspace_id), create_item("Ladder"))
        .await
        .unwrap_or_else(|_| unreachable!());

    let owner = actor("owner", workspace_id);
    let admin = actor("admin", workspace_id);
    let (first, second) = tokio::join!(
        service.approve(&owner, change.id()),
        service.approve(&admin, change.id())
    );

    assert_eq!(items.len().await, 1);
    assert!(items.get(workspace_id, change.id()).await.is_some());
    assert_eq!(u8::from(first.is_ok()) + u8::from(second.is_ok()), 1);
    let loser = if first.is_ok() { &second } else { &first };
    assert_eq!(code(loser), Some(ApprovalErrorCode::AlreadyReviewed));

    let stored = changes.lock_get(change.id()).await;
    assert_eq!(
        stored.as_ref().map(PendingChange::status),
        Some(PendingChangeStatus::Approved)
    );
    assert_eq!(
        stored.as_ref().and_then(PendingChange::entity_id),
        Some(change.id())
    );
}

#[tokio::test]
async fn a_publisher_that_never_returns_does_not_block_the_pipeline() {
    let workspace_id = WorkspaceId::new();
    let items = Arc::new(FakeEntityRepository::<Item>::default());
    let Services { service, audit, .. } = services(
        workspace_id,
        ChangeRouter::new(item_registry(items.clone())),
        Arc::new(HungPublisher),
    )
    .await;
    let viewer = actor("viewer", workspace_id);
    let owner = actor("owner", workspace_id);
    let limit = Duration::from_secs(2);

    let submitted = tokio::time::timeout(limit, service.submit(&viewer, create_item("Ladder"))).await;
    let change = submitted.ok().and_then(Result::ok);
    assert!(change.is_some());
    let change = change.unwrap_or_else(|| unreachable!());

    let approved = tokio::time::timeout(limit, service.approve(&owner, change.id())).await;
    assert!(approved.is_ok_and(|approved| approved.is_ok()));
    assert_eq!(items.len().await, 1);

    let other = service
        .submit(&viewer, create_item("Rope"))
        .await
        .unwrap_or_else(|_| unreachable!());
    let rejected = tokio::time::timeout(limit, service.reject(&owner, other.id(), "no")).await;
    assert!(rejected.is_ok_and(|rejected| rejected.is_ok()));

    assert_eq!(audit.events.lock().await.len(), 4);
}

#[tokio::test]
async fn approval_applies_updates_and_deletes() {
    let harness = harness().await;
    let owner = harness.actor("admin");

    let update = submitted(&harness, change_on("update", "item-x", json!({"quantity": 7}))).await;
    let result = harness.service.approve(&owner, update.id()).await;
    assert!(result.is_ok());
    let item = harness.items.get(harness.workspace_id, "item-x").await;
    assert_eq!(item.map(|item| item.quantity()), Some(7));

    let delete = submitted(&harness, change_on("delete", "item-x", Value::Null)).await;
    let result = harness.service.approve(&owner, delete.id()).await;
    assert!(result.is_ok());
    assert_eq!(harness.items.len().await, 0);
}

#[tokio::test]
async fn non_reviewers_cannot_review() {
    let harness = harness().await;
    let change = submitted(&harness, create_item("Ladder")).await;

    for subject in ["member", "viewer", "stranger"] {
        let rejected = harness
            .service
            .reject(&harness.actor(subject), change.id(), "not needed")
            .await;
        assert_eq!(code(&rejected), Some(ApprovalErrorCode::Unauthorized));

        let approved = harness
            .service
            .approve(&harness.actor(subject), change.id())
            .await;
        assert_eq!(code(&approved), Some(ApprovalErrorCode::Unauthorized));
    }

    let stored = harness.stored(change.id()).await;
    assert_eq!(stored, Some(change));
    assert_eq!(harness.items.len().await, 1);
}

#[tokio::test]
async fn blank_reason_is_refused_and_leaves_the_change_pending() {
    let harness = harness().await;
    let change = submitted(&harness, create_item("Ladder")).await;

    for reason in ["", "   "] {
        let result = harness
            .service
            .reject(&harness.actor("owner"), change.id(), reason)
            .await;
        assert_eq!(code(&result), Some(ApprovalErrorCode::ReasonRequired));
    }

    let stored = harness.stored(change.id()).await;
    assert!(stored.as_ref().is_some_and(PendingChange::is_pending));
    assert_eq!(stored.as_ref().and_then(PendingChange::reviewer), None);
    assert_eq!(stored.as_ref().and_then(PendingChange::reviewed_at), None);
}

#[tokio::test]
async fn rejecting_twice_is_already_reviewed_and_changes_nothing() {
    let harness = harness().await;
    let owner = harness.actor("owner");
    let change = submitted(&harness, create_item("Ladder")).await;

    let first = harness.service.reject(&owner, change.id(), "duplicate").await;
    assert!(first.is_ok());
    let after_first = harness.stored(change.id()).await;
    assert_eq!(
        after_first.as_ref().and_then(PendingChange::rejection_reason),
        Some("duplicate")
    );

    let second = harness
        .service
        .reject(&harness.actor("admin"), change.id(), "still a duplicate")
        .await;
    assert_eq!(code(&second), Some(ApprovalErrorCode::AlreadyReviewed));
    assert_eq!(harness.stored(change.id()).await, after_first);
}

#[tokio::test]
async fn terminal_changes_refuse_every_review_transition() {
    let harness = harness().await;
    let owner = harness.actor("owner");

    let approved = submitted(&harness, create_item("Ladder")).await;
    assert!(harness.service.approve(&owner, approved.id()).await.is_ok());
    let rejected = submitted(&harness, create_item("Rope")).await;
    assert!(harness.service.reject(&owner, rejected.id(), "no").await.is_ok());
    let items_after_reviews = harness.items.len().await;

    for change_id in [approved.id(), rejected.id()] {
        let before = harness.stored(change_id).await;

        let approve = harness.service.approve(&owner, change_id).await;
        assert_eq!(code(&approve), Some(ApprovalErrorCode::AlreadyReviewed));
        let reject = harness.service.reject(&owner, change_id, "again").await;
        assert_eq!(code(&reject), Some(ApprovalErrorCode::AlreadyReviewed));

        assert_eq!(harness.stored(change_id).await, before);
    }
    assert_eq!(harness.items.len().await, items_after_reviews);
}

#[tokio::test]
async fn failed_mutation_fails_the_approval_and_keeps_the_change_pending() {
    let harness = harness().await;
    let owner = harness.actor("owner");

    let invalid = submitted(&harness, change_on("update", "item-x", json!({"quantity": -3}))).await;
    let result = harness.service.approve(&owner, invalid.id()).await;
    assert_eq!(code(&result), Some(ApprovalErrorCode::ApplyFailed));
    let app_error = result.err().map(AppError::from);
    assert!(matches!(app_error, Some(AppError::Validation(_))));
    assert!(
        harness
            .stored(invalid.id())
            .await
            .is_some_and(|change| change.is_pending())
    );

    let missing = submitted(&harness, change_on("delete", "item-gone", json!({}))).await;
    let result = harness.service.approve(&owner, missing.id()).await;
    assert_eq!(code(&result), Some(ApprovalErrorCode::ApplyFailed));
    assert!(
        harness
            .stored(missing.id())
            .await
            .is_some_and(|change| change.is_pending())
    );

    let malformed = submitted(&harness, change_on("update", "item-x", json!({"quantity": "lots"}))).await;
    let result = harness.service.approve(&owner, malformed.id()).await;
    assert_eq!(code(&result), Some(ApprovalErrorCode::InvalidData));
}

#[tokio::test]
async fn unknown_change_is_not_found() {
    let harness = harness().await;

    let approve = harness
        .service
        .approve(&harness.actor("owner"), "missing")
        .await;
    assert_eq!(code(&approve), Some(ApprovalErrorCode::NotFound));

    let foreign = actor("owner", WorkspaceId::new());
    let change = submitted(&harness, create_item("Ladder")).await;
    let get = harness.service.get(&foreign, change.id()).await;
    assert_eq!(code(&get), Some(ApprovalErrorCode::NotFound));
}

#[tokio::test]
async fn listings_respect_roles() {
    let harness = harness().await;
    let first = submitted(&harness, create_item("Ladder")).await;
    let second = submitted(&harness, create_item("Rope")).await;
    let owner = harness.actor("owner");
    assert!(harness.service.reject(&owner, second.id(), "no").await.is_ok());

    let pending = harness.service.list_pending(&owner).await;
    assert_eq!(
        pending
            .unwrap_or_default()
            .iter()
            .map(|change| change.id().to_owned())
            .collect::<Vec<_>>(),
        vec![first.id().to_owned()]
    );

    let everything = harness.service.list(&owner, None).await;
    assert_eq!(everything.map(|changes| changes.len()).ok(), Some(2));

    let viewer = harness.actor("viewer");
    let forbidden = harness.service.list_pending(&viewer).await;
    assert_eq!(code(&forbidden), Some(ApprovalErrorCode::Unauthorized));

    let mine = harness
        .service
        .list_mine(&viewer, Some(PendingChangeStatus::Rejected))
        .await;
    assert_eq!(mine.map(|changes| changes.len()).ok(), Some(1));
    let nothing = harness.service.list_mine(&harness.actor("member"), None).await;
    assert_eq!(nothing.map(|changes| changes.len()).ok(), Some(0));
}

#[tokio::test]
async fn submitter_and_reviewers_can_read_a_change() {
    let harness = harness().await;
    let change = submitted(&harness, create_item("Ladder")).await;

    assert!(harness.service.get(&harness.actor("viewer"), change.id()).await.is_ok());
    assert!(harness.service.get(&harness.actor("admin"), change.id()).await.is_ok());
    let other = harness.service.get(&harness.actor("member"), change.id()).await;
    assert_eq!(code(&other), Some(ApprovalErrorCode::Unauthorized));
}

#[tokio::test]
async fn only_administrators_delete_changes() {
    let harness = harness().await;
    let change = submitted(&harness, create_item("Ladder")).await;

    let denied = harness
        .service
        .delete(&harness.actor("member"), change.id())
        .await;
    assert_eq!(code(&denied), Some(ApprovalErrorCode::Unauthorized));

    assert!(
        harness
            .service
            .delete(&harness.actor("admin"), change.id())
            .await
            .is_ok()
    );
    assert_eq!(harness.stored(change.id()).await, None);
    let audit = harness.audit.events.lock().await;
    assert_eq!(
        audit.last().map(|event| event.action),
        Some(AuditAction::PendingChangeDeleted)
    );
}

#[test]
fn codes_map_onto_transport_categories() {
    let cases = [
        (ApprovalErrorCode::NotFound, "not found"),
        (ApprovalErrorCode::Unauthorized, "forbidden"),
        (ApprovalErrorCode::AlreadyReviewed, "conflict"),
        (ApprovalErrorCode::ReasonRequired, "validation error"),
    ];

    for (code, prefix) in cases {
        let error = AppError::from(ApprovalError::refused(code, "detail"));
        assert!(error.to_string().starts_with(prefix));
        assert!(error.to_string().contains(code.as_str()));
    }

    let storage = AppError::from(ApprovalError::from(AppError::Internal("db".to_owned())));
    assert!(matches!(storage, AppError::Internal(_)));
}

