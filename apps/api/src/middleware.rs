use std::str::FromStr;

use axum::extract::Request;
use axum::http::HeaderMap;
use axum::middleware::Next;
use axum::response::Response;
use inventra_core::{AppError, UserIdentity, WorkspaceId};

use crate::error::ApiResult;

/// Workspace the caller acts in, set by the upstream authentication layer.
pub const WORKSPACE_HEADER: &str = "x-workspace-id";
/// Authenticated subject, set by the upstream authentication layer.
pub const SUBJECT_HEADER: &str = "x-user-subject";

pub async fn require_identity(mut request: Request, next: Next) -> ApiResult<Response> {
    let identity = identity_from_headers(request.headers())?;

    request.extensions_mut().insert(identity);
    Ok(next.run(request).await)
}

fn identity_from_headers(headers: &HeaderMap) -> Result<UserIdentity, AppError> {
    let workspace_id = header_value(headers, WORKSPACE_HEADER)?;
    let workspace_id = WorkspaceId::from_str(workspace_id)
        .map_err(|_| AppError::Unauthorized(format!("{WORKSPACE_HEADER} is not a valid id")))?;
    let subject = header_value(headers, SUBJECT_HEADER)?;

    Ok(UserIdentity::new(subject, subject, None, workspace_id))
}

fn header_value<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, AppError> {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .ok_or_else(|| AppError::Unauthorized("authentication required".to_owned()))
}
