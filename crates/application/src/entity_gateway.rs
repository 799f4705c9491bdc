use std::collections::HashMap;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use inventra_core::{AppError, AppResult, WorkspaceId};
use inventra_domain::{CatalogEntity, EntityKind};
use serde_json::Value;
use thiserror::Error;

use crate::catalog_ports::EntityRepository;
use crate::clock::current_time;

/// Serialized copy of a catalog record together with its version.
#[derive(Debug, Clone, PartialEq)]
pub struct EntitySnapshot {
    /// Record id.
    pub entity_id: String,
    /// Modification time used as the optimistic concurrency version.
    pub updated_at: DateTime<Utc>,
    /// JSON representation of the record.
    pub data: Value,
}

/// Failure reported by an entity gateway write.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// The payload could not be decoded into the entity's input type.
    #[error("invalid {kind} payload: {message}")]
    InvalidData {
        /// Target kind.
        kind: EntityKind,
        /// Decoder message.
        message: String,
    },

    /// The target record does not exist.
    #[error("{kind} '{entity_id}' does not exist")]
    NotFound {
        /// Target kind.
        kind: EntityKind,
        /// Target record id.
        entity_id: String,
    },

    /// The record changed between the read and the conditional write.
    #[error("{kind} '{entity_id}' was modified concurrently")]
    Stale {
        /// Target kind.
        kind: EntityKind,
        /// Target record id.
        entity_id: String,
    },

    /// The entity or its storage refused the write.
    #[error(transparent)]
    Rejected(AppError),
}

/// Generic-to-typed adapter for one catalog entity kind.
#[async_trait]
pub trait EntityGateway: Send + Sync {
    /// Kind handled by this gateway.
    fn kind(&self) -> EntityKind;

    /// Reads the current record.
    async fn find(
        &self,
        workspace_id: WorkspaceId,
        entity_id: &str,
    ) -> AppResult<Option<EntitySnapshot>>;

    /// Creates a record with the given server-assigned id.
    async fn apply_create(
        &self,
        workspace_id: WorkspaceId,
        entity_id: String,
        payload: Value,
    ) -> Result<EntitySnapshot, GatewayError>;

    /// Applies a partial update, but only to the version read at `read_version`.
    async fn apply_update(
        &self,
        workspace_id: WorkspaceId,
        entity_id: &str,
        payload: Value,
        read_version: DateTime<Utc>,
    ) -> Result<EntitySnapshot, GatewayError>;

    /// Deletes a record.
    async fn apply_delete(
        &self,
        workspace_id: WorkspaceId,
        entity_id: &str,
    ) -> Result<(), GatewayError>;
}

/// Gateway backed by a typed repository for any [`CatalogEntity`].
pub struct CatalogGateway<E: CatalogEntity> {
    repository: Arc<dyn EntityRepository<E>>,
    entity: PhantomData<fn() -> E>,
}

impl<E: CatalogEntity> CatalogGateway<E> {
    /// Creates a gateway over the entity's repository.
    #[must_use]
    pub fn new(repository: Arc<dyn EntityRepository<E>>) -> Self {
        Self {
            repository,
            entity: PhantomData,
        }
    }

    fn decode<T: serde::de::DeserializeOwned>(payload: Value) -> Result<T, GatewayError> {
        serde_json::from_value(payload).map_err(|error| GatewayError::InvalidData {
            kind: E::KIND,
            message: error.to_string(),
        })
    }

    fn not_found(entity_id: &str) -> GatewayError {
        GatewayError::NotFound {
            kind: E::KIND,
            entity_id: entity_id.to_owned(),
        }
    }

    fn write_error(error: AppError, entity_id: &str) -> GatewayError {
        match error {
            AppError::NotFound(_) => Self::not_found(entity_id),
            AppError::Conflict(_) => GatewayError::Stale {
                kind: E::KIND,
                entity_id: entity_id.to_owned(),
            },
            error => GatewayError::Rejected(error),
        }
    }
}

fn snapshot<E: CatalogEntity>(entity: &E) -> AppResult<EntitySnapshot> {
    let data = serde_json::to_value(entity).map_err(|error| {
        AppError::Internal(format!(
            "failed to serialize {} '{}': {error}",
            E::KIND,
            entity.id()
        ))
    })?;

    Ok(EntitySnapshot {
        entity_id: entity.id().to_owned(),
        updated_at: entity.updated_at(),
        data,
    })
}

#[async_trait]
impl<E: CatalogEntity> EntityGateway for CatalogGateway<E> {
    fn kind(&self) -> EntityKind {
        E::KIND
    }

    async fn find(
        &self,
        workspace_id: WorkspaceId,
        entity_id: &str,
    ) -> AppResult<Option<EntitySnapshot>> {
        self.repository
            .find(workspace_id, entity_id)
            .await?
            .as_ref()
            .map(snapshot)
            .transpose()
    }

    async fn apply_create(
        &self,
        workspace_id: WorkspaceId,
        entity_id: String,
        payload: Value,
    ) -> Result<EntitySnapshot, GatewayError> {
        let input: E::Input = Self::decode(payload)?;
        let entity = E::create(entity_id, workspace_id, input, current_time())
            .map_err(GatewayError::Rejected)?;
        let created = snapshot(&entity).map_err(GatewayError::Rejected)?;

        // A taken id reports as a stale write.
        self.repository
            .insert(entity)
            .await
            .map_err(|error| Self::write_error(error, created.entity_id.as_str()))?;

        Ok(created)
    }

    async fn apply_update(
        &self,
        workspace_id: WorkspaceId,
        entity_id: &str,
        payload: Value,
        read_version: DateTime<Utc>,
    ) -> Result<EntitySnapshot, GatewayError> {
        let patch: E::Patch = Self::decode(payload)?;
        let mut entity = self
            .repository
            .find(workspace_id, entity_id)
            .await
            .map_err(GatewayError::Rejected)?
            .ok_or_else(|| Self::not_found(entity_id))?;

        if entity.updated_at() != read_version {
            return Err(GatewayError::Stale {
                kind: E::KIND,
                entity_id: entity_id.to_owned(),
            });
        }

        entity
            .apply_patch(patch, current_time())
            .map_err(GatewayError::Rejected)?;
        let updated = snapshot(&entity).map_err(GatewayError::Rejected)?;

        self.repository
            .update(entity, read_version)
            .await
            .map_err(|error| Self::write_error(error, entity_id))?;

        Ok(updated)
    }

    async fn apply_delete(
        &self,
        workspace_id: WorkspaceId,
        entity_id: &str,
    ) -> Result<(), GatewayError> {
        self.repository
            .delete(workspace_id, entity_id)
            .await
            .map_err(|error| Self::write_error(error, entity_id))
    }
}

/// Capability table mapping each entity kind to its gateway.
#[derive(Clone, Default)]
pub struct EntityGatewayRegistry {
    gateways: HashMap<EntityKind, Arc<dyn EntityGateway>>,
}

impl EntityGatewayRegistry {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers the repository-backed gateway for `E`.
    #[must_use]
    pub fn register<E: CatalogEntity>(self, repository: Arc<dyn EntityRepository<E>>) -> Self {
        self.with_gateway(Arc::new(CatalogGateway::new(repository)))
    }

    /// Registers a gateway under the kind it reports, replacing any previous one.
    #[must_use]
    pub fn with_gateway(mut self, gateway: Arc<dyn EntityGateway>) -> Self {
        self.gateways.insert(gateway.kind(), gateway);
        self
    }

    /// Returns the gateway for a kind.
    #[must_use]
    pub fn get(&self, kind: EntityKind) -> Option<&Arc<dyn EntityGateway>> {
        self.gateways.get(&kind)
    }

    /// Returns whether a kind has a registered gateway.
    #[must_use]
    pub fn supports(&self, kind: EntityKind) -> bool {
        self.gateways.contains_key(&kind)
    }
}
