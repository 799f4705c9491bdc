use async_trait::async_trait;
use inventra_core::{AppResult, WorkspaceId};
use inventra_domain::{
    AuditAction, ChangeAction, EntityKind, PendingChange, PendingChangeStatus,
};

/// Filter for pending change listings.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PendingChangeQuery {
    /// Optional status filter.
    pub status: Option<PendingChangeStatus>,
    /// Optional submitter filter.
    pub requester: Option<String>,
}

/// Repository port for proposed changes.
#[async_trait]
pub trait PendingChangeRepository: Send + Sync {
    /// Persists a newly submitted change.
    async fn insert(&self, change: &PendingChange) -> AppResult<()>;

    /// Finds one change in the workspace.
    async fn find(
        &self,
        workspace_id: WorkspaceId,
        change_id: &str,
    ) -> AppResult<Option<PendingChange>>;

    /// Lists changes in the workspace, oldest first.
    async fn list(
        &self,
        workspace_id: WorkspaceId,
        query: PendingChangeQuery,
    ) -> AppResult<Vec<PendingChange>>;

    /// Stores the review outcome only if the stored change is still pending.
    ///
    /// Returns `false` when the change was already reviewed by someone else.
    async fn save_review(&self, change: &PendingChange) -> AppResult<bool>;

    /// Removes a change. Returns `false` when nothing was removed.
    async fn delete(&self, workspace_id: WorkspaceId, change_id: &str) -> AppResult<bool>;
}

/// Lifecycle moment a change notification describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeEventKind {
    /// A change was submitted for review.
    Created,
    /// A change was approved and applied.
    Approved,
    /// A change was rejected.
    Rejected,
}

impl ChangeEventKind {
    /// Returns the stable event name.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Created => "pending_change.created",
            Self::Approved => "pending_change.approved",
            Self::Rejected => "pending_change.rejected",
        }
    }
}

/// Notification describing a pending change transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// Event kind.
    pub kind: ChangeEventKind,
    /// Workspace scope.
    pub workspace_id: WorkspaceId,
    /// Change id.
    pub change_id: String,
    /// Target entity kind.
    pub entity_kind: EntityKind,
    /// Requested action.
    pub action: ChangeAction,
    /// Target or created record, when known.
    pub entity_id: Option<String>,
    /// Subject that caused the event.
    pub actor: String,
}

/// Port for broadcasting change notifications. Delivery is best-effort.
#[async_trait]
pub trait ChangeEventPublisher: Send + Sync {
    /// Publishes one event.
    async fn publish(&self, event: ChangeEvent) -> AppResult<()>;
}

/// Immutable audit event payload emitted by application services.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    /// Workspace scope for the event.
    pub workspace_id: WorkspaceId,
    /// Subject that performed the action.
    pub subject: String,
    /// Stable audit action identifier.
    pub action: AuditAction,
    /// Resource type label.
    pub resource_type: String,
    /// Resource identifier.
    pub resource_id: String,
    /// Optional audit detail payload.
    pub detail: Option<String>,
}

/// Port for persisting append-only audit events.
#[async_trait]
pub trait AuditRepository: Send + Sync {
    /// Persists one audit event.
    async fn append_event(&self, event: AuditEvent) -> AppResult<()>;
}
