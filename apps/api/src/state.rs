use inventra_application::{ApprovalService, BatchSyncService};

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub batch_sync_service: BatchSyncService,
    pub approval_service: ApprovalService,
}
