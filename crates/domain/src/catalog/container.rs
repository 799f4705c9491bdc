use chrono::{DateTime, Utc};
use inventra_core::{AppResult, NonEmptyString, WorkspaceId};
use serde::{Deserialize, Serialize};

use super::fields::{nullable, optional_text, patch_text, positive};
use super::{CatalogEntity, EntityKind, RecordMeta};

/// Box, bin or drawer holding items, optionally placed in a location.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Container {
    #[serde(flatten)]
    meta: RecordMeta,
    name: NonEmptyString,
    location_id: Option<String>,
    capacity: Option<i64>,
}

/// Payload used to create a container.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContainerInput {
    /// Display name.
    pub name: String,
    /// Optional location reference.
    #[serde(default)]
    pub location_id: Option<String>,
    /// Optional maximum number of items.
    #[serde(default)]
    pub capacity: Option<i64>,
}

/// Partial update for a container.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ContainerPatch {
    /// New display name.
    #[serde(default)]
    pub name: Option<String>,
    /// New location reference.
    #[serde(default, deserialize_with = "nullable")]
    pub location_id: Option<Option<String>>,
    /// New capacity.
    #[serde(default, deserialize_with = "nullable")]
    pub capacity: Option<Option<i64>>,
}

impl Container {
    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }

    /// Returns the capacity limit.
    #[must_use]
    pub fn capacity(&self) -> Option<i64> {
        self.capacity
    }
}

impl CatalogEntity for Container {
    const KIND: EntityKind = EntityKind::Container;
    type Input = ContainerInput;
    type Patch = ContainerPatch;

    fn create(
        id: String,
        workspace_id: WorkspaceId,
        input: ContainerInput,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        Ok(Self {
            meta: RecordMeta::new(id, workspace_id, now)?,
            name: NonEmptyString::new(input.name)?,
            location_id: optional_text(input.location_id),
            capacity: input
                .capacity
                .map(|value| positive("capacity", value))
                .transpose()?,
        })
    }

    fn apply_patch(&mut self, patch: ContainerPatch, now: DateTime<Utc>) -> AppResult<()> {
        let mut next = self.clone();

        if let Some(name) = patch.name {
            next.name = NonEmptyString::new(name)?;
        }
        if let Some(capacity) = patch.capacity {
            next.capacity = capacity
                .map(|value| positive("capacity", value))
                .transpose()?;
        }
        patch_text(&mut next.location_id, patch.location_id);

        next.meta.touch(now);
        *self = next;
        Ok(())
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }
}
