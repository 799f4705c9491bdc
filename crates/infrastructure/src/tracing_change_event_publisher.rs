use async_trait::async_trait;
use inventra_application::{ChangeEvent, ChangeEventPublisher};
use inventra_core::AppResult;
use tracing::info;

/// Publishes pending change events to the structured log.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingChangeEventPublisher;

#[async_trait]
impl ChangeEventPublisher for TracingChangeEventPublisher {
    async fn publish(&self, event: ChangeEvent) -> AppResult<()> {
        info!(
            event = event.kind.as_str(),
            workspace_id = %event.workspace_id,
            change_id = event.change_id.as_str(),
            entity_kind = %event.entity_kind,
            action = %event.action,
            entity_id = event.entity_id.as_deref().unwrap_or_default(),
            actor = event.actor.as_str(),
            "pending change event"
        );
        Ok(())
    }
}
