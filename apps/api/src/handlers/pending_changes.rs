use axum::Json;
use axum::extract::{Extension, Path, Query, State};
use axum::http::StatusCode;
use inventra_application::SubmitChangeInput;
use inventra_core::UserIdentity;
use inventra_domain::PendingChangeStatus;

use crate::dto::{
    ApprovedPendingChangeResponse, PendingChangeListQuery, PendingChangeResponse,
    RejectPendingChangeRequest, SubmitPendingChangeRequest,
};
use crate::error::ApiResult;
use crate::state::AppState;

fn status_filter(query: PendingChangeListQuery) -> ApiResult<Option<PendingChangeStatus>> {
    Ok(query
        .status
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::parse::<PendingChangeStatus>)
        .transpose()?)
}

pub async fn submit_pending_change_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Json(payload): Json<SubmitPendingChangeRequest>,
) -> ApiResult<(StatusCode, Json<PendingChangeResponse>)> {
    let change = state
        .approval_service
        .submit(
            &user,
            SubmitChangeInput {
                entity_type: payload.entity_type,
                entity_id: payload.entity_id,
                action: payload.action,
                payload: payload.payload,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(PendingChangeResponse::from(change))))
}

pub async fn list_pending_changes_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Query(query): Query<PendingChangeListQuery>,
) -> ApiResult<Json<Vec<PendingChangeResponse>>> {
    let status = status_filter(query)?;
    let changes = state
        .approval_service
        .list(&user, status)
        .await?
        .into_iter()
        .map(PendingChangeResponse::from)
        .collect();

    Ok(Json(changes))
}

pub async fn list_my_pending_changes_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Query(query): Query<PendingChangeListQuery>,
) -> ApiResult<Json<Vec<PendingChangeResponse>>> {
    let status = status_filter(query)?;
    let changes = state
        .approval_service
        .list_mine(&user, status)
        .await?
        .into_iter()
        .map(PendingChangeResponse::from)
        .collect();

    Ok(Json(changes))
}

pub async fn get_pending_change_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(change_id): Path<String>,
) -> ApiResult<Json<PendingChangeResponse>> {
    let change = state
        .approval_service
        .get(&user, change_id.as_str())
        .await?;

    Ok(Json(PendingChangeResponse::from(change)))
}

pub async fn approve_pending_change_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(change_id): Path<String>,
) -> ApiResult<Json<ApprovedPendingChangeResponse>> {
    let approved = state
        .approval_service
        .approve(&user, change_id.as_str())
        .await?;

    Ok(Json(ApprovedPendingChangeResponse::from(approved)))
}

pub async fn reject_pending_change_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(change_id): Path<String>,
    Json(payload): Json<RejectPendingChangeRequest>,
) -> ApiResult<Json<PendingChangeResponse>> {
    let rejected = state
        .approval_service
        .reject(&user, change_id.as_str(), payload.reason.as_str())
        .await?;

    Ok(Json(PendingChangeResponse::from(rejected)))
}

pub async fn delete_pending_change_handler(
    State(state): State<AppState>,
    Extension(user): Extension<UserIdentity>,
    Path(change_id): Path<String>,
) -> ApiResult<StatusCode> {
    state
        .approval_service
        .delete(&user, change_id.as_str())
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
