use std::str::FromStr;

use chrono::{DateTime, Utc};
use inventra_core::{AppError, WorkspaceId};
use inventra_domain::{ChangeAction, EntityKind};
use serde::Serialize;
use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use crate::conflict::has_conflict;
use crate::entity_gateway::{EntityGateway, EntityGatewayRegistry, EntitySnapshot, GatewayError};

/// Attempts made for one update when the conditional write keeps losing races.
const MAX_WRITE_ATTEMPTS: usize = 3;

/// One typed mutation submitted through batch synchronization.
///
/// Operation and entity tags stay raw so unknown values are reported per item.
#[derive(Debug, Clone, PartialEq)]
pub struct ChangeRequest {
    /// Position in the submitted batch.
    pub index: usize,
    /// Operation tag: `create`, `update` or `delete`.
    pub operation: String,
    /// Entity kind tag.
    pub entity_type: String,
    /// Target record id.
    pub entity_id: Option<String>,
    /// Opaque payload for the entity gateway.
    pub payload: Option<Value>,
    /// Version the client last saw, if it wants an optimistic check.
    pub expected_updated_at: Option<DateTime<Utc>>,
}

/// Outcome category for one operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    /// Applied.
    Success,
    /// Not applied because of an error.
    Error,
    /// Not applied because the server copy is newer than the client's.
    Conflict,
    /// Not started because the batch was cancelled.
    Skipped,
}

impl OperationStatus {
    /// Returns the transport value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
            Self::Conflict => "conflict",
            Self::Skipped => "skipped",
        }
    }
}

/// Stable per-operation error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OperationErrorCode {
    /// Operation tag is not one of create, update, delete.
    InvalidOperation,
    /// Entity tag is not a supported kind.
    InvalidEntityType,
    /// Operation is valid but not allowed on this path.
    UnsupportedOperation,
    /// Update or delete without a target id.
    MissingEntityId,
    /// Target record does not exist.
    NotFound,
    /// Payload could not be decoded.
    InvalidData,
    /// Update was refused by the entity or storage.
    UpdateFailed,
    /// Delete was refused by storage.
    DeleteFailed,
    /// Batch was cancelled before the operation started.
    Cancelled,
}

impl OperationErrorCode {
    /// Returns the transport value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::InvalidOperation => "INVALID_OPERATION",
            Self::InvalidEntityType => "INVALID_ENTITY_TYPE",
            Self::UnsupportedOperation => "UNSUPPORTED_OPERATION",
            Self::MissingEntityId => "MISSING_ENTITY_ID",
            Self::NotFound => "NOT_FOUND",
            Self::InvalidData => "INVALID_DATA",
            Self::UpdateFailed => "UPDATE_FAILED",
            Self::DeleteFailed => "DELETE_FAILED",
            Self::Cancelled => "CANCELLED",
        }
    }
}

/// Recovered result of one routed operation.
#[derive(Debug, Clone, PartialEq)]
pub struct OperationResult {
    /// Position in the submitted batch.
    pub index: usize,
    /// Outcome category.
    pub status: OperationStatus,
    /// Affected record id, when known.
    pub entity_id: Option<String>,
    /// Human readable failure.
    pub error_message: Option<String>,
    /// Stable failure code.
    pub error_code: Option<OperationErrorCode>,
    /// Whether the operation hit an optimistic concurrency conflict.
    pub has_conflict: bool,
    /// Current server copy, only on conflict.
    pub server_snapshot: Option<Value>,
}

impl OperationResult {
    /// Successful operation.
    #[must_use]
    pub fn success(index: usize, entity_id: String) -> Self {
        Self {
            index,
            status: OperationStatus::Success,
            entity_id: Some(entity_id),
            error_message: None,
            error_code: None,
            has_conflict: false,
            server_snapshot: None,
        }
    }

    /// Failed operation.
    #[must_use]
    pub fn error(
        index: usize,
        entity_id: Option<String>,
        code: OperationErrorCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            index,
            status: OperationStatus::Error,
            entity_id,
            error_message: Some(message.into()),
            error_code: Some(code),
            has_conflict: false,
            server_snapshot: None,
        }
    }

    /// Conflicting operation carrying the server's current copy.
    #[must_use]
    pub fn conflict(index: usize, snapshot: EntitySnapshot) -> Self {
        Self {
            index,
            status: OperationStatus::Conflict,
            error_message: Some(format!(
                "record '{}' was modified at {} after the client's version",
                snapshot.entity_id,
                snapshot.updated_at.to_rfc3339()
            )),
            entity_id: Some(snapshot.entity_id),
            error_code: None,
            has_conflict: true,
            server_snapshot: Some(snapshot.data),
        }
    }

    /// Operation never started because the batch was cancelled.
    #[must_use]
    pub fn skipped(index: usize, entity_id: Option<String>) -> Self {
        Self {
            index,
            status: OperationStatus::Skipped,
            entity_id,
            error_message: Some("batch was cancelled before this operation started".to_owned()),
            error_code: Some(OperationErrorCode::Cancelled),
            has_conflict: false,
            server_snapshot: None,
        }
    }
}

/// Dispatches tagged mutations to the gateway registered for their kind.
#[derive(Clone)]
pub struct ChangeRouter {
    registry: EntityGatewayRegistry,
}

impl ChangeRouter {
    /// Creates a router over a gateway registry.
    #[must_use]
    pub fn new(registry: EntityGatewayRegistry) -> Self {
        Self { registry }
    }

    /// Returns whether a kind can be routed.
    #[must_use]
    pub fn supports(&self, kind: EntityKind) -> bool {
        self.registry.supports(kind)
    }

    /// Routes one batch request. Every failure is recovered into the result.
    pub async fn route(&self, workspace_id: WorkspaceId, request: ChangeRequest) -> OperationResult {
        let ChangeRequest {
            index,
            operation,
            entity_type,
            entity_id,
            payload,
            expected_updated_at,
        } = request;

        let Ok(action) = ChangeAction::from_str(operation.as_str()) else {
            return OperationResult::error(
                index,
                entity_id,
                OperationErrorCode::InvalidOperation,
                format!("unknown operation '{operation}'"),
            );
        };
        let Some(gateway) = EntityKind::from_str(entity_type.as_str())
            .ok()
            .and_then(|kind| self.registry.get(kind))
        else {
            return OperationResult::error(
                index,
                entity_id,
                OperationErrorCode::InvalidEntityType,
                format!("unsupported entity type '{entity_type}'"),
            );
        };

        if action == ChangeAction::Create {
            return OperationResult::error(
                index,
                entity_id,
                OperationErrorCode::UnsupportedOperation,
                "create is not supported in batch sync; submit it for review instead",
            );
        }

        let Some(entity_id) = entity_id.filter(|value| !value.trim().is_empty()) else {
            return OperationResult::error(
                index,
                None,
                OperationErrorCode::MissingEntityId,
                format!("{action} requires an entity_id"),
            );
        };

        match action {
            ChangeAction::Update => {
                self.route_update(
                    workspace_id,
                    gateway.as_ref(),
                    index,
                    entity_id,
                    payload,
                    expected_updated_at,
                )
                .await
            }
            _ => match gateway.apply_delete(workspace_id, entity_id.as_str()).await {
                Ok(()) => OperationResult::success(index, entity_id),
                Err(error) => OperationResult::error(
                    index,
                    Some(entity_id),
                    OperationErrorCode::DeleteFailed,
                    describe(&error),
                ),
            },
        }
    }

    async fn route_update(
        &self,
        workspace_id: WorkspaceId,
        gateway: &dyn EntityGateway,
        index: usize,
        entity_id: String,
        payload: Option<Value>,
        expected_updated_at: Option<DateTime<Utc>>,
    ) -> OperationResult {
        let mut attempts = 0;

        loop {
            attempts += 1;

            let current = match gateway.find(workspace_id, entity_id.as_str()).await {
                Ok(Some(current)) => current,
                Ok(None) => {
                    return OperationResult::error(
                        index,
                        Some(entity_id.clone()),
                        OperationErrorCode::NotFound,
                        format!("{} '{entity_id}' does not exist", gateway.kind()),
                    );
                }
                Err(error) => {
                    return OperationResult::error(
                        index,
                        Some(entity_id),
                        OperationErrorCode::UpdateFailed,
                        error.detail(),
                    );
                }
            };

            if has_conflict(expected_updated_at, current.updated_at) {
                return OperationResult::conflict(index, current);
            }

            let Some(payload) = payload.clone() else {
                return OperationResult::error(
                    index,
                    Some(entity_id),
                    OperationErrorCode::InvalidData,
                    "update requires a data payload",
                );
            };

            match gateway
                .apply_update(workspace_id, entity_id.as_str(), payload, current.updated_at)
                .await
            {
                Ok(updated) => return OperationResult::success(index, updated.entity_id),
                Err(GatewayError::Stale { .. }) if attempts < MAX_WRITE_ATTEMPTS => {
                    warn!(
                        workspace_id = %workspace_id,
                        entity_kind = %gateway.kind(),
                        entity_id = %entity_id,
                        attempts,
                        "conditional update lost a race, re-reading"
                    );
                }
                Err(error @ GatewayError::InvalidData { .. }) => {
                    return OperationResult::error(
                        index,
                        Some(entity_id),
                        OperationErrorCode::InvalidData,
                        describe(&error),
                    );
                }
                Err(GatewayError::NotFound { .. }) => {
                    return OperationResult::error(
                        index,
                        Some(entity_id.clone()),
                        OperationErrorCode::NotFound,
                        format!("{} '{entity_id}' does not exist", gateway.kind()),
                    );
                }
                Err(error) => {
                    return OperationResult::error(
                        index,
                        Some(entity_id),
                        OperationErrorCode::UpdateFailed,
                        describe(&error),
                    );
                }
            }
        }
    }

    /// Applies a reviewed change. Unlike [`ChangeRouter::route`], create is
    /// allowed. A create uses `entity_id` as the new record's id when given,
    /// so applying the same create twice fails as stale instead of inserting
    /// a second record. Without one it gets a fresh server-assigned id.
    ///
    /// Returns the id of the affected record.
    pub async fn apply(
        &self,
        workspace_id: WorkspaceId,
        kind: EntityKind,
        action: ChangeAction,
        entity_id: Option<&str>,
        payload: &Value,
    ) -> Result<String, GatewayError> {
        let gateway = self.registry.get(kind).ok_or_else(|| {
            GatewayError::Rejected(AppError::Validation(format!(
                "unsupported entity type '{kind}'"
            )))
        })?;

        let target = || {
            entity_id.map(str::to_owned).ok_or_else(|| GatewayError::InvalidData {
                kind,
                message: format!("{action} requires an entity_id"),
            })
        };

        match action {
            ChangeAction::Create => {
                let entity_id = entity_id
                    .map_or_else(|| Uuid::new_v4().to_string(), str::to_owned);
                gateway
                    .apply_create(workspace_id, entity_id, payload.clone())
                    .await
                    .map(|created| created.entity_id)
            }
            ChangeAction::Update => {
                let entity_id = target()?;
                let mut attempts = 0;
                loop {
                    attempts += 1;
                    let current = gateway
                        .find(workspace_id, entity_id.as_str())
                        .await
                        .map_err(GatewayError::Rejected)?
                        .ok_or_else(|| GatewayError::NotFound {
                            kind,
                            entity_id: entity_id.clone(),
                        })?;

                    match gateway
                        .apply_update(
                            workspace_id,
                            entity_id.as_str(),
                            payload.clone(),
                            current.updated_at,
                        )
                        .await
                    {
                        Ok(updated) => return Ok(updated.entity_id),
                        Err(GatewayError::Stale { .. }) if attempts < MAX_WRITE_ATTEMPTS => {}
                        Err(error) => return Err(error),
                    }
                }
            }
            ChangeAction::Delete => {
                let entity_id = target()?;
                gateway
                    .apply_delete(workspace_id, entity_id.as_str())
                    .await
                    .map(|()| entity_id)
            }
        }
    }
}

fn describe(error: &GatewayError) -> String {
    match error {
        GatewayError::Rejected(error) => error.detail().to_owned(),
        error => error.to_string(),
    }
}
