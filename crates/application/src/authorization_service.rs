use std::sync::Arc;

use async_trait::async_trait;
use inventra_core::{AppError, AppResult, WorkspaceId};
use inventra_domain::{Permission, WorkspaceRole};

/// Repository port for workspace membership lookups.
#[async_trait]
pub trait AuthorizationRepository: Send + Sync {
    /// Returns the subject's role in the workspace, if the subject is a member.
    async fn find_member_role(
        &self,
        workspace_id: WorkspaceId,
        subject: &str,
    ) -> AppResult<Option<WorkspaceRole>>;

    /// Creates or replaces the subject's membership role.
    async fn save_member_role(
        &self,
        workspace_id: WorkspaceId,
        subject: &str,
        role: WorkspaceRole,
    ) -> AppResult<()>;
}

/// Application service for workspace-scoped authorization checks.
#[derive(Clone)]
pub struct AuthorizationService {
    repository: Arc<dyn AuthorizationRepository>,
}

impl AuthorizationService {
    /// Creates a new authorization service from a repository implementation.
    #[must_use]
    pub fn new(repository: Arc<dyn AuthorizationRepository>) -> Self {
        Self { repository }
    }

    /// Ensures a subject has the required permission in the workspace scope.
    pub async fn require_permission(
        &self,
        workspace_id: WorkspaceId,
        subject: &str,
        permission: Permission,
    ) -> AppResult<()> {
        if self
            .has_permission(workspace_id, subject, permission)
            .await?
        {
            return Ok(());
        }

        Err(AppError::Forbidden(format!(
            "subject '{subject}' is missing permission '{}' in workspace '{workspace_id}'",
            permission.as_str()
        )))
    }

    /// Returns whether the subject currently has the permission.
    pub async fn has_permission(
        &self,
        workspace_id: WorkspaceId,
        subject: &str,
        permission: Permission,
    ) -> AppResult<bool> {
        let role = self
            .repository
            .find_member_role(workspace_id, subject)
            .await?;

        Ok(role
            .map(|role| role.permissions().contains(&permission))
            .unwrap_or(false))
    }

    /// Answers whether the subject may review proposed changes in the workspace.
    pub async fn can_review_changes(
        &self,
        workspace_id: WorkspaceId,
        subject: &str,
    ) -> AppResult<bool> {
        self.has_permission(workspace_id, subject, Permission::ChangeReview)
            .await
    }
}
