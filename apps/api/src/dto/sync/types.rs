use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use ts_rs::TS;

/// One mutation inside a batch sync request.
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/sync-operation-request.ts"
)]
pub struct SyncOperationRequest {
    #[ts(type = "\"create\" | \"update\" | \"delete\"")]
    pub operation: String,
    pub entity_type: String,
    #[serde(default)]
    #[ts(optional)]
    pub entity_id: Option<String>,
    #[serde(default)]
    #[ts(optional, type = "Record<string, unknown>")]
    pub data: Option<Value>,
    #[serde(default)]
    #[ts(optional, type = "string")]
    pub updated_at: Option<DateTime<Utc>>,
}

/// Incoming batch sync payload.
#[derive(Debug, Clone, Deserialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/batch-sync-request.ts"
)]
pub struct BatchSyncRequest {
    pub operations: Vec<SyncOperationRequest>,
}

/// Outcome of one operation, aligned with its request index.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/sync-operation-response.ts"
)]
pub struct SyncOperationResponse {
    pub index: usize,
    #[ts(type = "\"success\" | \"error\" | \"conflict\" | \"skipped\"")]
    pub status: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub entity_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional)]
    pub error_code: Option<&'static str>,
    pub has_conflict: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[ts(optional, type = "Record<string, unknown>")]
    pub server_data: Option<Value>,
}

/// Batch sync response with per-operation results and counters.
#[derive(Debug, Serialize, TS)]
#[ts(
    export,
    export_to = "../../../packages/api-types/src/generated/batch-sync-response.ts"
)]
pub struct BatchSyncResponse {
    pub results: Vec<SyncOperationResponse>,
    pub succeeded: usize,
    pub failed: usize,
    pub conflicts: usize,
}
