use async_trait::async_trait;
use inventra_application::{AuditEvent, AuditRepository};
use inventra_core::{AppResult, WorkspaceId};
use tokio::sync::RwLock;

/// In-memory append-only audit log.
#[derive(Debug, Default)]
pub struct InMemoryAuditRepository {
    events: RwLock<Vec<AuditEvent>>,
}

impl InMemoryAuditRepository {
    /// Creates an empty audit log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the events recorded for a workspace, oldest first.
    pub async fn events_for(&self, workspace_id: WorkspaceId) -> Vec<AuditEvent> {
        self.events
            .read()
            .await
            .iter()
            .filter(|event| event.workspace_id == workspace_id)
            .cloned()
            .collect()
    }
}

#[async_trait]
impl AuditRepository for InMemoryAuditRepository {
    async fn append_event(&self, event: AuditEvent) -> AppResult<()> {
        self.events.write().await.push(event);
        Ok(())
    }
}
