use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

/// Incoming payload queuing a mutation for review.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/submit-pending-change-request.ts"
)]
pub struct SubmitPendingChangeRequest {
    pub entity_type: String,
    #[serde(default)]
    #[ts(optional)]
    pub entity_id: Option<String>,
    #[ts(type = "\"create\" | \"update\" | \"delete\"")]
    pub action: String,
    #[serde(default)]
    #[ts(type = "Record<string, unknown>")]
    pub payload: Value,
}

/// Incoming rejection payload.
#[derive(Debug, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/reject-pending-change-request.ts"
)]
pub struct RejectPendingChangeRequest {
    #[serde(default)]
    pub reason: String,
}

/// Optional status filter for listings.
#[derive(Debug, Default, Deserialize)]
pub struct PendingChangeListQuery {
    pub status: Option<String>,
}

/// API representation of a pending change.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/pending-change-response.ts"
)]
pub struct PendingChangeResponse {
    pub id: String,
    pub workspace_id: String,
    pub requester: String,
    pub entity_type: String,
    pub entity_id: Option<String>,
    pub action: String,
    #[ts(type = "Record<string, unknown>")]
    pub payload: Value,
    #[ts(type = "\"pending\" | \"approved\" | \"rejected\"")]
    pub status: String,
    pub reviewer: Option<String>,
    #[ts(type = "string | null")]
    pub reviewed_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// Approval outcome with the record the change was applied to.
///
/// An approved create produces a record whose id is the change id; the same
/// id is reported as `change.entity_id`.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/approved-pending-change-response.ts"
)]
pub struct ApprovedPendingChangeResponse {
    pub change: PendingChangeResponse,
    pub entity_id: String,
}
