mod common;
mod pending_changes;
mod sync;

pub use common::HealthResponse;
pub use pending_changes::{
    ApprovedPendingChangeResponse, PendingChangeListQuery, PendingChangeResponse,
    RejectPendingChangeRequest, SubmitPendingChangeRequest,
};
pub use sync::{BatchSyncRequest, BatchSyncResponse};
