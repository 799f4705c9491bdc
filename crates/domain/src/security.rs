use std::str::FromStr;

use inventra_core::AppError;
use serde::{Deserialize, Serialize};

/// Permissions enforced by application policy checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Permission {
    /// Allows reading catalog entities.
    CatalogRead,
    /// Allows mutating catalog entities directly, including batch sync.
    CatalogWrite,
    /// Allows proposing catalog changes for review.
    ChangeSubmit,
    /// Allows listing, approving and rejecting proposed changes.
    ChangeReview,
    /// Allows administrative removal of proposed changes.
    ChangeAdminister,
}

impl Permission {
    /// Returns a stable storage value for this permission.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CatalogRead => "catalog.read",
            Self::CatalogWrite => "catalog.write",
            Self::ChangeSubmit => "change.submit",
            Self::ChangeReview => "change.review",
            Self::ChangeAdminister => "change.administer",
        }
    }

    /// Returns all known permissions.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[Permission] = &[
            Permission::CatalogRead,
            Permission::CatalogWrite,
            Permission::ChangeSubmit,
            Permission::ChangeReview,
            Permission::ChangeAdminister,
        ];

        ALL
    }
}

impl FromStr for Permission {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "catalog.read" => Ok(Self::CatalogRead),
            "catalog.write" => Ok(Self::CatalogWrite),
            "change.submit" => Ok(Self::ChangeSubmit),
            "change.review" => Ok(Self::ChangeReview),
            "change.administer" => Ok(Self::ChangeAdminister),
            _ => Err(AppError::Validation(format!(
                "unknown permission value '{value}'"
            ))),
        }
    }
}

/// Membership role of a subject inside one workspace.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkspaceRole {
    /// Workspace owner.
    Owner,
    /// Workspace administrator.
    Admin,
    /// Regular collaborator with direct write access.
    Member,
    /// Read-only collaborator whose mutations go through review.
    Viewer,
}

impl WorkspaceRole {
    /// Returns a stable storage value for this role.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Owner => "owner",
            Self::Admin => "admin",
            Self::Member => "member",
            Self::Viewer => "viewer",
        }
    }

    /// Returns the permissions granted by this role.
    #[must_use]
    pub fn permissions(&self) -> &'static [Permission] {
        match self {
            Self::Owner | Self::Admin => Permission::all(),
            Self::Member => &[
                Permission::CatalogRead,
                Permission::CatalogWrite,
                Permission::ChangeSubmit,
            ],
            Self::Viewer => &[Permission::CatalogRead, Permission::ChangeSubmit],
        }
    }

    /// Returns whether the role carries the "manage" capability needed to review changes.
    #[must_use]
    pub fn can_manage(&self) -> bool {
        self.permissions().contains(&Permission::ChangeReview)
    }
}

impl FromStr for WorkspaceRole {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "owner" => Ok(Self::Owner),
            "admin" => Ok(Self::Admin),
            "member" => Ok(Self::Member),
            "viewer" => Ok(Self::Viewer),
            _ => Err(AppError::Validation(format!(
                "unknown workspace role '{value}'"
            ))),
        }
    }
}

/// Stable audit actions emitted by application use-cases.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Emitted when a change is proposed for review.
    PendingChangeSubmitted,
    /// Emitted when a reviewer approves and applies a change.
    PendingChangeApproved,
    /// Emitted when a reviewer rejects a change.
    PendingChangeRejected,
    /// Emitted when an administrator removes a change record.
    PendingChangeDeleted,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::PendingChangeSubmitted => "pending_change.submitted",
            Self::PendingChangeApproved => "pending_change.approved",
            Self::PendingChangeRejected => "pending_change.rejected",
            Self::PendingChangeDeleted => "pending_change.deleted",
        }
    }
}
