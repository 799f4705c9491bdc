use axum::Json;
use axum::extract::{Extension, State};
use inventra_application::{BatchCancellation, validate_batch_size};
use inventra_core::{AppError, UserIdentity};

use crate::dto::{BatchSyncRequest, BatchSyncResponse};
use crate::error::ApiResult;
use crate::state::AppState;

/// Applies a batch of offline mutations.
///
/// The batch runs on its own task. If the client goes away the cancellation
/// handle is dropped with this future and the remaining operations are skipped.
pub async fn batch_sync_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<BatchSyncRequest>,
) -> ApiResult<Json<BatchSyncResponse>> {
    validate_batch_size(payload.operations.len())?;

    let requests = payload.into_change_requests();
    let (_cancel_on_drop, cancellation) = BatchCancellation::pair();
    let service = state.batch_sync_service.clone();

    let result = tokio::spawn(async move { service.sync(&user, requests, &cancellation).await })
        .await
        .map_err(|error| AppError::Internal(format!("batch sync task failed: {error}")))??;

    Ok(Json(BatchSyncResponse::from(result)))
}

#[cfg(test)]
mod tests;
