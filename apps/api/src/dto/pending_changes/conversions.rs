use inventra_application::ApprovedChange;
use inventra_domain::PendingChange;

use super::types::{ApprovedPendingChangeResponse, PendingChangeResponse};

impl From<PendingChange> for PendingChangeResponse {
    fn from(value: PendingChange) -> Self {
        Self {
            id: value.id().to_owned(),
            workspace_id: value.workspace_id().to_string(),
            requester: value.requester().to_owned(),
            entity_type: value.entity_kind().as_str().to_owned(),
            entity_id: value.entity_id().map(str::to_owned),
            action: value.action().as_str().to_owned(),
            payload: value.payload().clone(),
            status: value.status().as_str().to_owned(),
            reviewer: value.reviewer().map(str::to_owned),
            reviewed_at: value.reviewed_at(),
            rejection_reason: value.rejection_reason().map(str::to_owned),
            created_at: value.created_at(),
            updated_at: value.updated_at(),
        }
    }
}

impl From<ApprovedChange> for ApprovedPendingChangeResponse {
    fn from(value: ApprovedChange) -> Self {
        Self {
            change: PendingChangeResponse::from(value.change),
            entity_id: value.entity_id,
        }
    }
}
