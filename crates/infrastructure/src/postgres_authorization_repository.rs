use std::str::FromStr;

use async_trait::async_trait;
use inventra_application::AuthorizationRepository;
use inventra_core::{AppError, AppResult, WorkspaceId};
use inventra_domain::WorkspaceRole;
use sqlx::PgPool;

/// PostgreSQL-backed workspace membership store.
#[derive(Clone)]
pub struct PostgresAuthorizationRepository {
    pool: PgPool,
}

impl PostgresAuthorizationRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuthorizationRepository for PostgresAuthorizationRepository {
    async fn find_member_role(
        &self,
        workspace_id: WorkspaceId,
        subject: &str,
    ) -> AppResult<Option<WorkspaceRole>> {
        let role = sqlx::query_scalar::<_, String>(
            r#"
            SELECT role
            FROM workspace_members
            WHERE workspace_id = $1 AND subject = $2
            "#,
        )
        .bind(workspace_id.as_uuid())
        .bind(subject)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to load role for subject '{subject}' in workspace '{workspace_id}': {error}"
            ))
        })?;

        role.map(|value| {
            WorkspaceRole::from_str(value.as_str()).map_err(|error| {
                AppError::Internal(format!(
                    "stored role for subject '{subject}' is invalid: {error}"
                ))
            })
        })
        .transpose()
    }

    async fn save_member_role(
        &self,
        workspace_id: WorkspaceId,
        subject: &str,
        role: WorkspaceRole,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO workspace_members (workspace_id, subject, role)
            VALUES ($1, $2, $3)
            ON CONFLICT (workspace_id, subject)
            DO UPDATE SET role = EXCLUDED.role, updated_at = now()
            "#,
        )
        .bind(workspace_id.as_uuid())
        .bind(subject)
        .bind(role.as_str())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to save role for subject '{subject}' in workspace '{workspace_id}': {error}"
            ))
        })?;

        Ok(())
    }
}
