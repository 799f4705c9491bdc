use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use inventra_core::{AppError, AppResult, NonEmptyString, WorkspaceId};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::EntityKind;

/// Mutation requested against one catalog record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    /// Create a new record with a server-assigned id.
    Create,
    /// Update an existing record.
    Update,
    /// Delete an existing record.
    Delete,
}

impl ChangeAction {
    /// Returns the stable transport and storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        }
    }
}

impl Display for ChangeAction {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for ChangeAction {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "create" => Ok(Self::Create),
            "update" => Ok(Self::Update),
            "delete" => Ok(Self::Delete),
            _ => Err(AppError::Validation(format!(
                "unknown change action '{value}'"
            ))),
        }
    }
}

/// Flat review status used for filtering and storage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PendingChangeStatus {
    /// Awaiting review.
    Pending,
    /// Approved and applied.
    Approved,
    /// Rejected with a reason.
    Rejected,
}

impl PendingChangeStatus {
    /// Returns the stable storage value.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }
}

impl Display for PendingChangeStatus {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for PendingChangeStatus {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(Self::Pending),
            "approved" => Ok(Self::Approved),
            "rejected" => Ok(Self::Rejected),
            _ => Err(AppError::Validation(format!(
                "unknown pending change status '{value}'"
            ))),
        }
    }
}

/// Review state of a proposed change. Reviewer data only exists once reviewed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ChangeReview {
    /// Awaiting review.
    Pending,
    /// Approved and applied to the catalog.
    Approved {
        /// Reviewer subject.
        reviewer: String,
        /// Review time.
        reviewed_at: DateTime<Utc>,
    },
    /// Rejected without touching the catalog.
    Rejected {
        /// Reviewer subject.
        reviewer: String,
        /// Review time.
        reviewed_at: DateTime<Utc>,
        /// Reviewer supplied reason.
        reason: NonEmptyString,
    },
}

impl ChangeReview {
    /// Returns the flat status.
    #[must_use]
    pub fn status(&self) -> PendingChangeStatus {
        match self {
            Self::Pending => PendingChangeStatus::Pending,
            Self::Approved { .. } => PendingChangeStatus::Approved,
            Self::Rejected { .. } => PendingChangeStatus::Rejected,
        }
    }
}

/// Returned when a review transition is attempted on a terminal change.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AlreadyReviewed {
    /// Terminal status the change is in.
    pub status: PendingChangeStatus,
}

/// Input used to open a new pending change.
#[derive(Debug, Clone, PartialEq)]
pub struct NewPendingChange {
    /// Server-assigned change id.
    pub id: String,
    /// Workspace scope.
    pub workspace_id: WorkspaceId,
    /// Submitting subject.
    pub requester: String,
    /// Target entity kind.
    pub entity_kind: EntityKind,
    /// Target record, absent for creates.
    pub entity_id: Option<String>,
    /// Requested mutation.
    pub action: ChangeAction,
    /// Proposed payload.
    pub payload: Value,
}

/// Flat persisted representation of a pending change.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredPendingChange {
    /// Change id.
    pub id: String,
    /// Workspace scope.
    pub workspace_id: WorkspaceId,
    /// Submitting subject.
    pub requester: String,
    /// Stored entity kind tag.
    pub entity_kind: String,
    /// Target record.
    pub entity_id: Option<String>,
    /// Stored action tag.
    pub action: String,
    /// Proposed payload.
    pub payload: Value,
    /// Stored status tag.
    pub status: String,
    /// Reviewer subject.
    pub reviewer: Option<String>,
    /// Review time.
    pub reviewed_at: Option<DateTime<Utc>>,
    /// Rejection reason.
    pub rejection_reason: Option<String>,
    /// Creation time.
    pub created_at: DateTime<Utc>,
    /// Last modification time.
    pub updated_at: DateTime<Utc>,
}

/// Proposed catalog mutation queued for review.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingChange {
    id: String,
    workspace_id: WorkspaceId,
    requester: String,
    entity_kind: EntityKind,
    entity_id: Option<String>,
    action: ChangeAction,
    payload: Value,
    review: ChangeReview,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PendingChange {
    /// Opens a change in the pending state.
    pub fn submit(input: NewPendingChange, now: DateTime<Utc>) -> AppResult<Self> {
        let NewPendingChange {
            id,
            workspace_id,
            requester,
            entity_kind,
            entity_id,
            action,
            payload,
        } = input;

        if id.trim().is_empty() {
            return Err(AppError::Validation(
                "pending change id must not be empty".to_owned(),
            ));
        }
        if requester.trim().is_empty() {
            return Err(AppError::Validation(
                "pending change requester must not be empty".to_owned(),
            ));
        }

        let entity_id = entity_id.and_then(|value| {
            let trimmed = value.trim().to_owned();
            (!trimmed.is_empty()).then_some(trimmed)
        });
        match (action, entity_id.is_some()) {
            (ChangeAction::Create, true) => {
                return Err(AppError::Validation(
                    "create changes must not target an existing entity_id".to_owned(),
                ));
            }
            (ChangeAction::Update | ChangeAction::Delete, false) => {
                return Err(AppError::Validation(format!(
                    "{action} changes require an entity_id"
                )));
            }
            _ => {}
        }

        let payload = normalize_payload(action, payload)?;

        Ok(Self {
            id,
            workspace_id,
            requester,
            entity_kind,
            entity_id,
            action,
            payload,
            review: ChangeReview::Pending,
            created_at: now,
            updated_at: now,
        })
    }

    /// Rebuilds a change from storage, checking the review columns agree with the status.
    pub fn restore(stored: StoredPendingChange) -> AppResult<Self> {
        let status = PendingChangeStatus::from_str(stored.status.as_str())?;
        let review = match (
            status,
            stored.reviewer,
            stored.reviewed_at,
            stored.rejection_reason,
        ) {
            (PendingChangeStatus::Pending, None, None, None) => ChangeReview::Pending,
            (PendingChangeStatus::Approved, Some(reviewer), Some(reviewed_at), None) => {
                ChangeReview::Approved {
                    reviewer,
                    reviewed_at,
                }
            }
            (PendingChangeStatus::Rejected, Some(reviewer), Some(reviewed_at), Some(reason)) => {
                ChangeReview::Rejected {
                    reviewer,
                    reviewed_at,
                    reason: NonEmptyString::new(reason)?,
                }
            }
            (status, ..) => {
                return Err(AppError::Internal(format!(
                    "pending change '{}' has review columns inconsistent with status '{status}'",
                    stored.id
                )));
            }
        };

        Ok(Self {
            entity_kind: EntityKind::from_str(stored.entity_kind.as_str())?,
            action: ChangeAction::from_str(stored.action.as_str())?,
            id: stored.id,
            workspace_id: stored.workspace_id,
            requester: stored.requester,
            entity_id: stored.entity_id,
            payload: stored.payload,
            review,
            created_at: stored.created_at,
            updated_at: stored.updated_at,
        })
    }

    /// Returns the approved copy of this change.
    ///
    /// An approved create targets the record it creates, whose id is the
    /// change id.
    pub fn approve(&self, reviewer: &str, now: DateTime<Utc>) -> Result<Self, AlreadyReviewed> {
        let mut approved = self.transition(
            ChangeReview::Approved {
                reviewer: reviewer.to_owned(),
                reviewed_at: now,
            },
            now,
        )?;
        if approved.action == ChangeAction::Create {
            approved.entity_id = Some(approved.id.clone());
        }
        Ok(approved)
    }

    /// Returns the rejected copy of this change.
    pub fn reject(
        &self,
        reviewer: &str,
        reason: NonEmptyString,
        now: DateTime<Utc>,
    ) -> Result<Self, AlreadyReviewed> {
        self.transition(
            ChangeReview::Rejected {
                reviewer: reviewer.to_owned(),
                reviewed_at: now,
                reason,
            },
            now,
        )
    }

    fn transition(&self, review: ChangeReview, now: DateTime<Utc>) -> Result<Self, AlreadyReviewed> {
        if !self.is_pending() {
            return Err(AlreadyReviewed {
                status: self.status(),
            });
        }

        let mut next = self.clone();
        next.review = review;
        next.updated_at = now.max(self.updated_at);
        Ok(next)
    }

    /// Converts into the flat persisted representation.
    #[must_use]
    pub fn to_stored(&self) -> StoredPendingChange {
        StoredPendingChange {
            id: self.id.clone(),
            workspace_id: self.workspace_id,
            requester: self.requester.clone(),
            entity_kind: self.entity_kind.as_str().to_owned(),
            entity_id: self.entity_id.clone(),
            action: self.action.as_str().to_owned(),
            payload: self.payload.clone(),
            status: self.status().as_str().to_owned(),
            reviewer: self.reviewer().map(str::to_owned),
            reviewed_at: self.reviewed_at(),
            rejection_reason: self.rejection_reason().map(str::to_owned),
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Returns the change id.
    #[must_use]
    pub fn id(&self) -> &str {
        self.id.as_str()
    }

    /// Returns the workspace scope.
    #[must_use]
    pub fn workspace_id(&self) -> WorkspaceId {
        self.workspace_id
    }

    /// Returns the submitting subject.
    #[must_use]
    pub fn requester(&self) -> &str {
        self.requester.as_str()
    }

    /// Returns the target entity kind.
    #[must_use]
    pub fn entity_kind(&self) -> EntityKind {
        self.entity_kind
    }

    /// Returns the target record id.
    #[must_use]
    pub fn entity_id(&self) -> Option<&str> {
        self.entity_id.as_deref()
    }

    /// Returns the requested action.
    #[must_use]
    pub fn action(&self) -> ChangeAction {
        self.action
    }

    /// Returns the proposed payload.
    #[must_use]
    pub fn payload(&self) -> &Value {
        &self.payload
    }

    /// Returns the review state.
    #[must_use]
    pub fn review(&self) -> &ChangeReview {
        &self.review
    }

    /// Returns the flat status.
    #[must_use]
    pub fn status(&self) -> PendingChangeStatus {
        self.review.status()
    }

    /// Returns whether the change still awaits review.
    #[must_use]
    pub fn is_pending(&self) -> bool {
        matches!(self.review, ChangeReview::Pending)
    }

    /// Returns the reviewer, once reviewed.
    #[must_use]
    pub fn reviewer(&self) -> Option<&str> {
        match &self.review {
            ChangeReview::Pending => None,
            ChangeReview::Approved { reviewer, .. } | ChangeReview::Rejected { reviewer, .. } => {
                Some(reviewer.as_str())
            }
        }
    }

    /// Returns the review time, once reviewed.
    #[must_use]
    pub fn reviewed_at(&self) -> Option<DateTime<Utc>> {
        match &self.review {
            ChangeReview::Pending => None,
            ChangeReview::Approved { reviewed_at, .. }
            | ChangeReview::Rejected { reviewed_at, .. } => Some(*reviewed_at),
        }
    }

    /// Returns the rejection reason, only for rejected changes.
    #[must_use]
    pub fn rejection_reason(&self) -> Option<&str> {
        match &self.review {
            ChangeReview::Rejected { reason, .. } => Some(reason.as_str()),
            _ => None,
        }
    }

    /// Returns the creation time.
    #[must_use]
    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    /// Returns the last modification time.
    #[must_use]
    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

fn normalize_payload(action: ChangeAction, payload: Value) -> AppResult<Value> {
    match (action, payload) {
        (ChangeAction::Delete, Value::Null) => Ok(Value::Object(Map::new())),
        (ChangeAction::Delete, Value::Object(map)) => Ok(Value::Object(map)),
        (_, Value::Object(map)) if !map.is_empty() => Ok(Value::Object(map)),
        (_, Value::Object(_)) => Err(AppError::Validation(
            "pending change payload must not be empty".to_owned(),
        )),
        _ => Err(AppError::Validation(
            "pending change payload must be a JSON object".to_owned(),
        )),
    }
}
