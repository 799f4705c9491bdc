use std::fmt::{Display, Formatter};
use std::sync::Arc;

use inventra_core::{AppError, AppResult, NonEmptyString, UserIdentity};
use inventra_domain::{
    AuditAction, ChangeAction, EntityKind, NewPendingChange, PendingChange, PendingChangeStatus,
    Permission,
};
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};
use uuid::Uuid;

use crate::change_ports::{
    AuditEvent, AuditRepository, ChangeEvent, ChangeEventKind, ChangeEventPublisher,
    PendingChangeQuery, PendingChangeRepository,
};
use crate::AuthorizationService;
use crate::change_router::ChangeRouter;
use crate::clock::current_time;
use crate::entity_gateway::GatewayError;

mod queries;
mod review;

/// Proposed mutation as submitted by a lower-privileged actor.
#[derive(Debug, Clone, PartialEq)]
pub struct SubmitChangeInput {
    /// Entity kind tag.
    pub entity_type: String,
    /// Target record, absent for creates.
    pub entity_id: Option<String>,
    /// Action tag: `create`, `update` or `delete`.
    pub action: String,
    /// Proposed payload.
    pub payload: Value,
}

/// Stable error codes returned by approval operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ApprovalErrorCode {
    /// The change does not exist in the actor's workspace.
    NotFound,
    /// The actor lacks the capability for this action.
    Unauthorized,
    /// The change is no longer pending.
    AlreadyReviewed,
    /// Rejection without a reason.
    ReasonRequired,
    /// Unsupported entity kind.
    InvalidEntityType,
    /// Unknown action tag.
    InvalidAction,
    /// Malformed change or payload.
    InvalidData,
    /// The catalog mutation failed; the change stays pending.
    ApplyFailed,
}

impl ApprovalErrorCode {
    /// Returns the transport value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NotFound => "NOT_FOUND",
            Self::Unauthorized => "UNAUTHORIZED",
            Self::AlreadyReviewed => "ALREADY_REVIEWED",
            Self::ReasonRequired => "REASON_REQUIRED",
            Self::InvalidEntityType => "INVALID_ENTITY_TYPE",
            Self::InvalidAction => "INVALID_ACTION",
            Self::InvalidData => "INVALID_DATA",
            Self::ApplyFailed => "APPLY_FAILED",
        }
    }
}

impl Display for ApprovalErrorCode {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

/// Failure of an approval operation.
#[derive(Debug, Error)]
pub enum ApprovalError {
    /// A review rule refused the request.
    #[error("{code}: {message}")]
    Refused {
        /// Stable code.
        code: ApprovalErrorCode,
        /// Human readable detail.
        message: String,
    },

    /// Applying the approved mutation failed.
    #[error("APPLY_FAILED: {0}")]
    ApplyFailed(AppError),

    /// Storage or another collaborator failed.
    #[error(transparent)]
    Storage(#[from] AppError),
}

impl ApprovalError {
    fn refused(code: ApprovalErrorCode, message: impl Into<String>) -> Self {
        Self::Refused {
            code,
            message: message.into(),
        }
    }

    /// Returns the stable code, if the failure has one.
    #[must_use]
    pub fn code(&self) -> Option<ApprovalErrorCode> {
        match self {
            Self::Refused { code, .. } => Some(*code),
            Self::ApplyFailed(_) => Some(ApprovalErrorCode::ApplyFailed),
            Self::Storage(_) => None,
        }
    }
}

impl From<ApprovalError> for AppError {
    fn from(error: ApprovalError) -> Self {
        let message = error.to_string();
        match error {
            ApprovalError::Refused { code, .. } => match code {
                ApprovalErrorCode::NotFound => Self::NotFound(message),
                ApprovalErrorCode::Unauthorized => Self::Forbidden(message),
                ApprovalErrorCode::AlreadyReviewed => Self::Conflict(message),
                ApprovalErrorCode::ReasonRequired
                | ApprovalErrorCode::InvalidEntityType
                | ApprovalErrorCode::InvalidAction
                | ApprovalErrorCode::InvalidData
                | ApprovalErrorCode::ApplyFailed => Self::Validation(message),
            },
            ApprovalError::ApplyFailed(cause) => match cause {
                Self::Validation(_) => Self::Validation(message),
                Self::NotFound(_) => Self::NotFound(message),
                Self::Conflict(_) => Self::Conflict(message),
                Self::Unauthorized(_) | Self::Forbidden(_) | Self::Internal(_) => {
                    Self::Internal(message)
                }
            },
            ApprovalError::Storage(error) => error,
        }
    }
}

impl From<GatewayError> for ApprovalError {
    fn from(error: GatewayError) -> Self {
        match error {
            GatewayError::InvalidData { .. } => {
                Self::refused(ApprovalErrorCode::InvalidData, error.to_string())
            }
            GatewayError::NotFound { .. } => {
                Self::ApplyFailed(AppError::NotFound(error.to_string()))
            }
            GatewayError::Stale { .. } => Self::ApplyFailed(AppError::Conflict(error.to_string())),
            GatewayError::Rejected(cause) => Self::ApplyFailed(cause),
        }
    }
}

/// Result of a successful approval.
#[derive(Debug, Clone, PartialEq)]
pub struct ApprovedChange {
    /// The change in its approved state.
    pub change: PendingChange,
    /// Record that was created, updated or deleted. For a create this is the
    /// change id, also stored as the approved change's `entity_id`.
    pub entity_id: String,
}

/// Review queue for proposed catalog mutations.
#[derive(Clone)]
pub struct ApprovalService {
    authorization_service: AuthorizationService,
    repository: Arc<dyn PendingChangeRepository>,
    router: ChangeRouter,
    event_publisher: Arc<dyn ChangeEventPublisher>,
    audit_repository: Arc<dyn AuditRepository>,
}

impl ApprovalService {
    /// Creates an approval service.
    #[must_use]
    pub fn new(
        authorization_service: AuthorizationService,
        repository: Arc<dyn PendingChangeRepository>,
        router: ChangeRouter,
        event_publisher: Arc<dyn ChangeEventPublisher>,
        audit_repository: Arc<dyn AuditRepository>,
    ) -> Self {
        Self {
            authorization_service,
            repository,
            router,
            event_publisher,
            audit_repository,
        }
    }

    async fn require(
        &self,
        actor: &UserIdentity,
        permission: Permission,
    ) -> Result<(), ApprovalError> {
        if self
            .authorization_service
            .has_permission(actor.workspace_id(), actor.subject(), permission)
            .await?
        {
            return Ok(());
        }

        Err(ApprovalError::refused(
            ApprovalErrorCode::Unauthorized,
            format!(
                "subject '{}' is missing permission '{}' in workspace '{}'",
                actor.subject(),
                permission.as_str(),
                actor.workspace_id()
            ),
        ))
    }

    async fn load(
        &self,
        actor: &UserIdentity,
        change_id: &str,
    ) -> Result<PendingChange, ApprovalError> {
        self.repository
            .find(actor.workspace_id(), change_id)
            .await?
            .ok_or_else(|| {
                ApprovalError::refused(
                    ApprovalErrorCode::NotFound,
                    format!(
                        "pending change '{change_id}' does not exist in workspace '{}'",
                        actor.workspace_id()
                    ),
                )
            })
    }

    /// Publishes in the background; the caller never waits on the publisher.
    fn notify(
        &self,
        kind: ChangeEventKind,
        change: &PendingChange,
        entity_id: Option<String>,
        actor: &UserIdentity,
    ) {
        let event = ChangeEvent {
            kind,
            workspace_id: change.workspace_id(),
            change_id: change.id().to_owned(),
            entity_kind: change.entity_kind(),
            action: change.action(),
            entity_id: entity_id.or_else(|| change.entity_id().map(str::to_owned)),
            actor: actor.subject().to_owned(),
        };

        let publisher = Arc::clone(&self.event_publisher);
        tokio::spawn(async move {
            let change_id = event.change_id.clone();
            if let Err(error) = publisher.publish(event).await {
                warn!(
                    error = %error,
                    event = kind.as_str(),
                    change_id = %change_id,
                    "failed to publish pending change event"
                );
            }
        });
    }

    async fn audit(&self, action: AuditAction, change: &PendingChange, actor: &UserIdentity) {
        let detail = serde_json::json!({
            "entity_type": change.entity_kind().as_str(),
            "action": change.action().as_str(),
            "entity_id": change.entity_id(),
            "status": change.status().as_str(),
        });

        let event = AuditEvent {
            workspace_id: change.workspace_id(),
            subject: actor.subject().to_owned(),
            action,
            resource_type: "pending_change".to_owned(),
            resource_id: change.id().to_owned(),
            detail: Some(detail.to_string()),
        };

        if let Err(error) = self.audit_repository.append_event(event).await {
            warn!(
                error = %error,
                audit_action = action.as_str(),
                change_id = change.id(),
                "failed to append pending change audit event"
            );
        }
    }
}

#[cfg(test)]
mod tests;
