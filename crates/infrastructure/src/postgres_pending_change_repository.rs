use async_trait::async_trait;
use chrono::{DateTime, Utc};
use inventra_application::{PendingChangeQuery, PendingChangeRepository};
use inventra_core::{AppError, AppResult, WorkspaceId};
use inventra_domain::{PendingChange, StoredPendingChange};
use serde_json::Value;
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

/// PostgreSQL-backed repository for proposed changes.
#[derive(Clone)]
pub struct PostgresPendingChangeRepository {
    pool: PgPool,
}

impl PostgresPendingChangeRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct PendingChangeRow {
    id: String,
    workspace_id: Uuid,
    requester: String,
    entity_kind: String,
    entity_id: Option<String>,
    action: String,
    payload: Value,
    status: String,
    reviewer: Option<String>,
    reviewed_at: Option<DateTime<Utc>>,
    rejection_reason: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<PendingChangeRow> for PendingChange {
    type Error = AppError;

    fn try_from(row: PendingChangeRow) -> Result<Self, Self::Error> {
        let change_id = row.id.clone();
        PendingChange::restore(StoredPendingChange {
            id: row.id,
            workspace_id: WorkspaceId::from_uuid(row.workspace_id),
            requester: row.requester,
            entity_kind: row.entity_kind,
            entity_id: row.entity_id,
            action: row.action,
            payload: row.payload,
            status: row.status,
            reviewer: row.reviewer,
            reviewed_at: row.reviewed_at,
            rejection_reason: row.rejection_reason,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to decode pending change '{change_id}': {error}"
            ))
        })
    }
}

#[async_trait]
impl PendingChangeRepository for PostgresPendingChangeRepository {
    async fn insert(&self, change: &PendingChange) -> AppResult<()> {
        let stored = change.to_stored();
        let result = sqlx::query(
            r#"
            INSERT INTO pending_changes (
                id,
                workspace_id,
                requester,
                entity_kind,
                entity_id,
                action,
                payload,
                status,
                reviewer,
                reviewed_at,
                rejection_reason,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            ON CONFLICT (id) DO NOTHING
            "#,
        )
        .bind(stored.id.as_str())
        .bind(stored.workspace_id.as_uuid())
        .bind(stored.requester)
        .bind(stored.entity_kind)
        .bind(stored.entity_id)
        .bind(stored.action)
        .bind(stored.payload)
        .bind(stored.status)
        .bind(stored.reviewer)
        .bind(stored.reviewed_at)
        .bind(stored.rejection_reason)
        .bind(stored.created_at)
        .bind(stored.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to insert pending change: {error}"))
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "pending change '{}' already exists",
                stored.id
            )));
        }

        Ok(())
    }

    async fn find(
        &self,
        workspace_id: WorkspaceId,
        change_id: &str,
    ) -> AppResult<Option<PendingChange>> {
        sqlx::query_as::<_, PendingChangeRow>(
            r#"
            SELECT
                id,
                workspace_id,
                requester,
                entity_kind,
                entity_id,
                action,
                payload,
                status,
                reviewer,
                reviewed_at,
                rejection_reason,
                created_at,
                updated_at
            FROM pending_changes
            WHERE workspace_id = $1 AND id = $2
            "#,
        )
        .bind(workspace_id.as_uuid())
        .bind(change_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Internal(format!("failed to load pending change: {error}")))?
        .map(PendingChange::try_from)
        .transpose()
    }

    async fn list(
        &self,
        workspace_id: WorkspaceId,
        query: PendingChangeQuery,
    ) -> AppResult<Vec<PendingChange>> {
        let rows = sqlx::query_as::<_, PendingChangeRow>(
            r#"
            SELECT
                id,
                workspace_id,
                requester,
                entity_kind,
                entity_id,
                action,
                payload,
                status,
                reviewer,
                reviewed_at,
                rejection_reason,
                created_at,
                updated_at
            FROM pending_changes
            WHERE workspace_id = $1
                AND ($2::TEXT IS NULL OR status = $2)
                AND ($3::TEXT IS NULL OR requester = $3)
            ORDER BY created_at ASC, id ASC
            "#,
        )
        .bind(workspace_id.as_uuid())
        .bind(query.status.map(|status| status.as_str()))
        .bind(query.requester)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to list pending changes: {error}"))
        })?;

        rows.into_iter().map(PendingChange::try_from).collect()
    }

    async fn save_review(&self, change: &PendingChange) -> AppResult<bool> {
        let stored = change.to_stored();
        let result = sqlx::query(
            r#"
            UPDATE pending_changes
            SET status = $3,
                reviewer = $4,
                reviewed_at = $5,
                rejection_reason = $6,
                updated_at = $7,
                entity_id = $8
            WHERE workspace_id = $1
                AND id = $2
                AND status = 'pending'
            "#,
        )
        .bind(stored.workspace_id.as_uuid())
        .bind(stored.id.as_str())
        .bind(stored.status)
        .bind(stored.reviewer)
        .bind(stored.reviewed_at)
        .bind(stored.rejection_reason)
        .bind(stored.updated_at)
        .bind(stored.entity_id)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to save review of pending change '{}': {error}",
                stored.id
            ))
        })?;

        if result.rows_affected() > 0 {
            return Ok(true);
        }

        match self.find(stored.workspace_id, stored.id.as_str()).await? {
            Some(_) => Ok(false),
            None => Err(AppError::NotFound(format!(
                "pending change '{}' does not exist",
                stored.id
            ))),
        }
    }

    async fn delete(&self, workspace_id: WorkspaceId, change_id: &str) -> AppResult<bool> {
        let result = sqlx::query(
            r#"
            DELETE FROM pending_changes
            WHERE workspace_id = $1 AND id = $2
            "#,
        )
        .bind(workspace_id.as_uuid())
        .bind(change_id)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to delete pending change '{change_id}': {error}"
            ))
        })?;

        Ok(result.rows_affected() > 0)
    }
}

#[cfg(test)]
mod tests;
