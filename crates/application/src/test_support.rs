use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use inventra_core::{AppError, AppResult, UserIdentity, WorkspaceId};
use inventra_domain::{CatalogEntity, EntityKind, Item, ItemInput, WorkspaceRole};
use serde_json::Value;
use tokio::sync::Mutex;

use crate::AuthorizationRepository;
use crate::catalog_ports::EntityRepository;
use crate::entity_gateway::{EntityGateway, EntityGatewayRegistry, EntitySnapshot, GatewayError};

pub(crate) struct FakeEntityRepository<E: CatalogEntity> {
    records: Mutex<HashMap<(WorkspaceId, String), E>>,
}

impl<E: CatalogEntity> Default for FakeEntityRepository<E> {
    fn default() -> Self {
        Self {
            records: Mutex::new(HashMap::new()),
        }
    }
}

impl<E: CatalogEntity> FakeEntityRepository<E> {
    pub(crate) async fn get(&self, workspace_id: WorkspaceId, entity_id: &str) -> Option<E> {
        self.records
            .lock()
            .await
            .get(&(workspace_id, entity_id.to_owned()))
            .cloned()
    }

    pub(crate) async fn len(&self) -> usize {
        self.records.lock().await.len()
    }
}

#[async_trait]
impl<E: CatalogEntity> EntityRepository<E> for FakeEntityRepository<E> {
    async fn find(&self, workspace_id: WorkspaceId, entity_id: &str) -> AppResult<Option<E>> {
        Ok(self.get(workspace_id, entity_id).await)
    }

    async fn insert(&self, entity: E) -> AppResult<()> {
        let mut records = self.records.lock().await;
        let key = (entity.workspace_id(), entity.id().to_owned());
        if records.contains_key(&key) {
            return Err(AppError::Conflict(format!("'{}' already exists", entity.id())));
        }
        records.insert(key, entity);
        Ok(())
    }

    async fn update(&self, entity: E, read_version: DateTime<Utc>) -> AppResult<()> {
        let mut records = self.records.lock().await;
        let key = (entity.workspace_id(), entity.id().to_owned());
        let stored = records
            .get(&key)
            .ok_or_else(|| AppError::NotFound(format!("'{}' does not exist", entity.id())))?;
        if stored.updated_at() != read_version {
            return Err(AppError::Conflict(format!("'{}' changed", entity.id())));
        }
        records.insert(key, entity);
        Ok(())
    }

    async fn delete(&self, workspace_id: WorkspaceId, entity_id: &str) -> AppResult<()> {
        self.records
            .lock()
            .await
            .remove(&(workspace_id, entity_id.to_owned()))
            .map(|_| ())
            .ok_or_else(|| AppError::NotFound(format!("'{entity_id}' does not exist")))
    }
}

/// Seeds an item whose modification time is exactly `updated_at`.
pub(crate) async fn seed_item(
    repository: &FakeEntityRepository<Item>,
    workspace_id: WorkspaceId,
    entity_id: &str,
    name: &str,
    updated_at: DateTime<Utc>,
) {
    let input: ItemInput =
        serde_json::from_value(serde_json::json!({ "name": name })).unwrap_or_else(|_| unreachable!());
    let item = Item::create(entity_id.to_owned(), workspace_id, input, updated_at)
        .unwrap_or_else(|_| unreachable!());
    assert!(repository.insert(item).await.is_ok());
}

/// Fixed point in time with whole-second precision.
pub(crate) fn t0() -> DateTime<Utc> {
    DateTime::<Utc>::from_timestamp(1_760_000_000, 0).unwrap_or_default()
}

pub(crate) fn one_hour() -> Duration {
    Duration::hours(1)
}

pub(crate) fn item_registry(
    repository: Arc<FakeEntityRepository<Item>>,
) -> EntityGatewayRegistry {
    EntityGatewayRegistry::new().register::<Item>(repository)
}

/// Gateway that records every call and never touches storage.
pub(crate) struct CountingGateway {
    kind: EntityKind,
    calls: AtomicUsize,
}

impl CountingGateway {
    pub(crate) fn new(kind: EntityKind) -> Self {
        Self {
            kind,
            calls: AtomicUsize::new(0),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    fn snapshot(&self, entity_id: &str) -> EntitySnapshot {
        EntitySnapshot {
            entity_id: entity_id.to_owned(),
            updated_at: t0(),
            data: Value::Null,
        }
    }
}

#[async_trait]
impl EntityGateway for CountingGateway {
    fn kind(&self) -> EntityKind {
        self.kind
    }

    async fn find(
        &self,
        _workspace_id: WorkspaceId,
        entity_id: &str,
    ) -> AppResult<Option<EntitySnapshot>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(Some(self.snapshot(entity_id)))
    }

    async fn apply_create(
        &self,
        _workspace_id: WorkspaceId,
        entity_id: String,
        _payload: Value,
    ) -> Result<EntitySnapshot, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.snapshot(entity_id.as_str()))
    }

    async fn apply_update(
        &self,
        _workspace_id: WorkspaceId,
        entity_id: &str,
        _payload: Value,
        _read_version: DateTime<Utc>,
    ) -> Result<EntitySnapshot, GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.snapshot(entity_id))
    }

    async fn apply_delete(
        &self,
        _workspace_id: WorkspaceId,
        _entity_id: &str,
    ) -> Result<(), GatewayError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[derive(Default)]
pub(crate) struct FakeAuthorizationRepository {
    roles: Mutex<HashMap<(WorkspaceId, String), WorkspaceRole>>,
}

impl FakeAuthorizationRepository {
    pub(crate) async fn with_members(
        workspace_id: WorkspaceId,
        members: &[(&str, WorkspaceRole)],
    ) -> Arc<Self> {
        let repository = Arc::new(Self::default());
        for (subject, role) in members {
            assert!(
                repository
                    .save_member_role(workspace_id, subject, *role)
                    .await
                    .is_ok()
            );
        }
        repository
    }
}

#[async_trait]
impl AuthorizationRepository for FakeAuthorizationRepository {
    async fn find_member_role(
        &self,
        workspace_id: WorkspaceId,
        subject: &str,
    ) -> AppResult<Option<WorkspaceRole>> {
        Ok(self
            .roles
            .lock()
            .await
            .get(&(workspace_id, subject.to_owned()))
            .copied())
    }

    async fn save_member_role(
        &self,
        workspace_id: WorkspaceId,
        subject: &str,
        role: WorkspaceRole,
    ) -> AppResult<()> {
        self.roles
            .lock()
            .await
            .insert((workspace_id, subject.to_owned()), role);
        Ok(())
    }
}

pub(crate) fn actor(subject: &str, workspace_id: WorkspaceId) -> UserIdentity {
    UserIdentity::new(subject, subject, None, workspace_id)
}
