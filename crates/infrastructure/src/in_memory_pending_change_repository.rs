use std::collections::HashMap;

use async_trait::async_trait;
use inventra_application::{PendingChangeQuery, PendingChangeRepository};
use inventra_core::{AppError, AppResult, WorkspaceId};
use inventra_domain::PendingChange;
use tokio::sync::RwLock;

/// In-memory pending change repository implementation.
#[derive(Debug, Default)]
pub struct InMemoryPendingChangeRepository {
    changes: RwLock<HashMap<(WorkspaceId, String), PendingChange>>,
}

impl InMemoryPendingChangeRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PendingChangeRepository for InMemoryPendingChangeRepository {
    async fn insert(&self, change: &PendingChange) -> AppResult<()> {
        let key = (change.workspace_id(), change.id().to_owned());
        let mut changes = self.changes.write().await;

        if changes.contains_key(&key) {
            return Err(AppError::Conflict(format!(
                "pending change '{}' already exists",
                key.1
            )));
        }

        changes.insert(key, change.clone());
        Ok(())
    }

    async fn find(
        &self,
        workspace_id: WorkspaceId,
        change_id: &str,
    ) -> AppResult<Option<PendingChange>> {
        Ok(self
            .changes
            .read()
            .await
            .get(&(workspace_id, change_id.to_owned()))
            .cloned())
    }

    async fn list(
        &self,
        workspace_id: WorkspaceId,
        query: PendingChangeQuery,
    ) -> AppResult<Vec<PendingChange>> {
        let changes = self.changes.read().await;

        let mut values: Vec<PendingChange> = changes
            .iter()
            .filter_map(|((stored_workspace_id, _), change)| {
                (stored_workspace_id == &workspace_id).then_some(change)
            })
            .filter(|change| query.status.is_none_or(|status| change.status() == status))
            .filter(|change| {
                query
                    .requester
                    .as_deref()
                    .is_none_or(|requester| change.requester() == requester)
            })
            .cloned()
            .collect();
        values.sort_by(|left, right| {
            left.created_at()
                .cmp(&right.created_at())
                .then_with(|| left.id().cmp(right.id()))
        });

        Ok(values)
    }

    async fn save_review(&self, change: &PendingChange) -> AppResult<bool> {
        let key = (change.workspace_id(), change.id().to_owned());
        let mut changes = self.changes.write().await;

        match changes.get(&key) {
            Some(stored) if stored.is_pending() => {
                changes.insert(key, change.clone());
                Ok(true)
            }
            Some(_) => Ok(false),
            None => Err(AppError::NotFound(format!(
                "pending change '{}' does not exist",
                key.1
            ))),
        }
    }

    async fn delete(&self, workspace_id: WorkspaceId, change_id: &str) -> AppResult<bool> {
        Ok(self
            .changes
            .write()
            .await
            .remove(&(workspace_id, change_id.to_owned()))
            .is_some())
    }
}
