use async_trait::async_trait;
use chrono::{DateTime, Utc};
use inventra_core::{AppResult, WorkspaceId};
use inventra_domain::CatalogEntity;

/// Storage port for one catalog entity kind.
///
/// Every write is a single-record atomic operation. `update` is a conditional
/// write: it only succeeds while the stored record still carries
/// `read_version` as its modification time.
#[async_trait]
pub trait EntityRepository<E: CatalogEntity>: Send + Sync {
    /// Finds one record in the workspace.
    async fn find(&self, workspace_id: WorkspaceId, entity_id: &str) -> AppResult<Option<E>>;

    /// Inserts a new record. Fails with a conflict when the id is taken.
    async fn insert(&self, entity: E) -> AppResult<()>;

    /// Replaces a record if it has not changed since `read_version`.
    ///
    /// Returns `AppError::Conflict` when another writer got there first and
    /// `AppError::NotFound` when the record is gone.
    async fn update(&self, entity: E, read_version: DateTime<Utc>) -> AppResult<()>;

    /// Deletes a record. Fails with not-found when it does not exist.
    async fn delete(&self, workspace_id: WorkspaceId, entity_id: &str) -> AppResult<()>;
}
