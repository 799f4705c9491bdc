use std::collections::HashMap;

use async_trait::async_trait;
use inventra_application::AuthorizationRepository;
use inventra_core::{AppResult, WorkspaceId};
use inventra_domain::WorkspaceRole;
use tokio::sync::RwLock;

/// In-memory workspace membership store.
#[derive(Debug, Default)]
pub struct InMemoryAuthorizationRepository {
    members: RwLock<HashMap<(WorkspaceId, String), WorkspaceRole>>,
}

impl InMemoryAuthorizationRepository {
    /// Creates an empty repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AuthorizationRepository for InMemoryAuthorizationRepository {
    async fn find_member_role(
        &self,
        workspace_id: WorkspaceId,
        subject: &str,
    ) -> AppResult<Option<WorkspaceRole>> {
        Ok(self
            .members
            .read()
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
        self.members
            .write()
            .await
            .insert((workspace_id, subject.to_owned()), role);
        Ok(())
    }
}
