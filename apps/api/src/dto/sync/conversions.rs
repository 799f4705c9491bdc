use inventra_application::{BatchResult, ChangeRequest, OperationResult};

use super::types::{BatchSyncRequest, BatchSyncResponse, SyncOperationResponse};

impl BatchSyncRequest {
    /// Numbers the operations in submission order.
    pub fn into_change_requests(self) -> Vec<ChangeRequest> {
        self.operations
            .into_iter()
            .enumerate()
            .map(|(index, operation)| ChangeRequest {
                index,
                operation: operation.operation,
                entity_type: operation.entity_type,
                entity_id: operation.entity_id,
                payload: operation.data,
                expected_updated_at: operation.updated_at,
            })
            .collect()
    }
}

impl From<OperationResult> for SyncOperationResponse {
    fn from(value: OperationResult) -> Self {
        Self {
            index: value.index,
            status: value.status.as_str(),
            entity_id: value.entity_id,
            error: value.error_message,
            error_code: value.error_code.map(|code| code.as_str()),
            has_conflict: value.has_conflict,
            server_data: value.server_snapshot,
        }
    }
}

impl From<BatchResult> for BatchSyncResponse {
    fn from(value: BatchResult) -> Self {
        Self {
            results: value
                .results
                .into_iter()
                .map(SyncOperationResponse::from)
                .collect(),
            succeeded: value.succeeded,
            failed: value.failed,
            conflicts: value.conflicts,
        }
    }
}
