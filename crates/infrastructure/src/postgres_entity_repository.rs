use std::marker::PhantomData;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use inventra_application::EntityRepository;
use inventra_core::{AppError, AppResult, WorkspaceId};
use inventra_domain::CatalogEntity;
use serde_json::Value;
use sqlx::{FromRow, PgPool};

/// PostgreSQL-backed store for one catalog entity kind.
///
/// Records live as JSONB documents in `catalog_entities`, keyed by workspace,
/// kind and id. `updated_at` is mirrored into its own column so conditional
/// writes are a single `UPDATE ... WHERE updated_at = $version`.
pub struct PostgresEntityRepository<E: CatalogEntity> {
    pool: PgPool,
    entity: PhantomData<fn() -> E>,
}

impl<E: CatalogEntity> Clone for PostgresEntityRepository<E> {
    fn clone(&self) -> Self {
        Self::new(self.pool.clone())
    }
}

impl<E: CatalogEntity> PostgresEntityRepository<E> {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool,
            entity: PhantomData,
        }
    }

    fn encode(entity: &E) -> AppResult<Value> {
        serde_json::to_value(entity).map_err(|error| {
            AppError::Internal(format!(
                "failed to encode {} '{}': {error}",
                E::KIND,
                entity.id()
            ))
        })
    }

    async fn exists(&self, workspace_id: WorkspaceId, entity_id: &str) -> AppResult<bool> {
        sqlx::query_scalar::<_, bool>(
            r#"
            SELECT EXISTS (
                SELECT 1
                FROM catalog_entities
                WHERE workspace_id = $1 AND entity_kind = $2 AND id = $3
            )
            "#,
        )
        .bind(workspace_id.as_uuid())
        .bind(E::KIND.as_str())
        .bind(entity_id)
        .fetch_one(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to check {} '{entity_id}': {error}",
                E::KIND
            ))
        })
    }
}

#[derive(Debug, FromRow)]
struct EntityRow {
    data: Value,
}

#[async_trait]
impl<E: CatalogEntity> EntityRepository<E> for PostgresEntityRepository<E> {
    async fn find(&self, workspace_id: WorkspaceId, entity_id: &str) -> AppResult<Option<E>> {
        let row = sqlx::query_as::<_, EntityRow>(
            r#"
            SELECT data
            FROM catalog_entities
            WHERE workspace_id = $1 AND entity_kind = $2 AND id = $3
            "#,
        )
        .bind(workspace_id.as_uuid())
        .bind(E::KIND.as_str())
        .bind(entity_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!("failed to load {} '{entity_id}': {error}", E::KIND))
        })?;

        row.map(|row| {
            serde_json::from_value::<E>(row.data).map_err(|error| {
                AppError::Internal(format!(
                    "failed to decode {} '{entity_id}' for workspace '{workspace_id}': {error}",
                    E::KIND
                ))
            })
        })
        .transpose()
    }

    async fn insert(&self, entity: E) -> AppResult<()> {
        let data = Self::encode(&entity)?;
        let result = sqlx::query(
            r#"
            INSERT INTO catalog_entities (
                workspace_id,
                entity_kind,
                id,
                data,
                created_at,
                updated_at
            )
            VALUES ($1, $2, $3, $4, $5, $6)
            ON CONFLICT (workspace_id, entity_kind, id) DO NOTHING
            "#,
        )
        .bind(entity.workspace_id().as_uuid())
        .bind(E::KIND.as_str())
        .bind(entity.id())
        .bind(data)
        .bind(entity.created_at())
        .bind(entity.updated_at())
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to insert {} '{}': {error}",
                E::KIND,
                entity.id()
            ))
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::Conflict(format!(
                "{} '{}' already exists in workspace '{}'",
                E::KIND,
                entity.id(),
                entity.workspace_id()
            )));
        }

        Ok(())
    }

    async fn update(&self, entity: E, read_version: DateTime<Utc>) -> AppResult<()> {
        let data = Self::encode(&entity)?;
        let result = sqlx::query(
            r#"
            UPDATE catalog_entities
            SET data = $4, updated_at = $5
            WHERE workspace_id = $1
                AND entity_kind = $2
                AND id = $3
                AND updated_at = $6
            "#,
        )
        .bind(entity.workspace_id().as_uuid())
        .bind(E::KIND.as_str())
        .bind(entity.id())
        .bind(data)
        .bind(entity.updated_at())
        .bind(read_version)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to update {} '{}': {error}",
                E::KIND,
                entity.id()
            ))
        })?;

        if result.rows_affected() > 0 {
            return Ok(());
        }

        if self.exists(entity.workspace_id(), entity.id()).await? {
            Err(AppError::Conflict(format!(
                "{} '{}' changed after {}",
                E::KIND,
                entity.id(),
                read_version.to_rfc3339()
            )))
        } else {
            Err(AppError::NotFound(format!(
                "{} '{}' does not exist in workspace '{}'",
                E::KIND,
                entity.id(),
                entity.workspace_id()
            )))
        }
    }

    async fn delete(&self, workspace_id: WorkspaceId, entity_id: &str) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            DELETE FROM catalog_entities
            WHERE workspace_id = $1 AND entity_kind = $2 AND id = $3
            "#,
        )
        .bind(workspace_id.as_uuid())
        .bind(E::KIND.as_str())
        .bind(entity_id)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            AppError::Internal(format!(
                "failed to delete {} '{entity_id}': {error}",
                E::KIND
            ))
        })?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!(
                "{} '{entity_id}' does not exist in workspace '{workspace_id}'",
                E::KIND
            )));
        }

        Ok(())
    }
}
