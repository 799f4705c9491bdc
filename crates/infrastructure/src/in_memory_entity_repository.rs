use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use inventra_application::EntityRepository;
use inventra_core::{AppError, AppResult, WorkspaceId};
use inventra_domain::CatalogEntity;
use tokio::sync::RwLock;

/// In-memory store for one catalog entity kind.
///
/// Each write holds the write lock for its whole check-and-set, which makes
/// single-record writes atomic.
#[derive(Debug)]
pub struct InMemoryEntityRepository<E: CatalogEntity> {
    records: RwLock<HashMap<(WorkspaceId, String), E>>,
}

impl<E: CatalogEntity> InMemoryEntityRepository<E> {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self {
            records: RwLock::new(HashMap::new()),
        }
    }
}

impl<E: CatalogEntity> Default for InMemoryEntityRepository<E> {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl<E: CatalogEntity> EntityRepository<E> for InMemoryEntityRepository<E> {
    async fn find(&self, workspace_id: WorkspaceId, entity_id: &str) -> AppResult<Option<E>> {
        Ok(self
            .records
            .read()
            .await
            .get(&(workspace_id, entity_id.to_owned()))
            .cloned())
    }

    async fn insert(&self, entity: E) -> AppResult<()> {
        let key = (entity.workspace_id(), entity.id().to_owned());
        let mut records = self.records.write().await;

        if records.contains_key(&key) {
            return Err(AppError::Conflict(format!(
                "{} '{}' already exists in workspace '{}'",
                E::KIND,
                key.1,
                key.0
            )));
        }

        records.insert(key, entity);
        Ok(())
    }

    async fn update(&self, entity: E, read_version: DateTime<Utc>) -> AppResult<()> {
        let key = (entity.workspace_id(), entity.id().to_owned());
        let mut records = self.records.write().await;

        let stored = records.get(&key).ok_or_else(|| {
            AppError::NotFound(format!(
                "{} '{}' does not exist in workspace '{}'",
                E::KIND,
                key.1,
                key.0
            ))
        })?;
        if stored.updated_at() != read_version {
            return Err(AppError::Conflict(format!(
                "{} '{}' was modified at {}",
                E::KIND,
                key.1,
                stored.updated_at().to_rfc3339()
            )));
        }

        records.insert(key, entity);
        Ok(())
    }

    async fn delete(&self, workspace_id: WorkspaceId, entity_id: &str) -> AppResult<()> {
        self.records
            .write()
            .await
            .remove(&(workspace_id, entity_id.to_owned()))
            .map(|_| ())
            .ok_or_else(|| {
                AppError::NotFound(format!(
                    "{} '{entity_id}' does not exist in workspace '{workspace_id}'",
                    E::KIND
                ))
            })
    }
}
