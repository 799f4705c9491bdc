use chrono::{DateTime, Utc};
use inventra_core::{AppResult, NonEmptyString, WorkspaceId};
use serde::{Deserialize, Serialize};

use super::fields::{nullable, optional_text, parent_reference, patch_text};
use super::{CatalogEntity, EntityKind, RecordMeta};

/// Hierarchical item category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Category {
    #[serde(flatten)]
    meta: RecordMeta,
    name: NonEmptyString,
    description: Option<String>,
    parent_id: Option<String>,
}

/// Payload used to create a category.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryInput {
    /// Display name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Optional parent category.
    #[serde(default)]
    pub parent_id: Option<String>,
}

/// Partial update for a category.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CategoryPatch {
    /// New display name.
    #[serde(default)]
    pub name: Option<String>,
    /// New description.
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    /// New parent category.
    #[serde(default, deserialize_with = "nullable")]
    pub parent_id: Option<Option<String>>,
}

impl Category {
    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }
}

impl CatalogEntity for Category {
    const KIND: EntityKind = EntityKind::Category;
    type Input = CategoryInput;
    type Patch = CategoryPatch;

    fn create(
        id: String,
        workspace_id: WorkspaceId,
        input: CategoryInput,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        let parent_id = parent_reference(id.as_str(), input.parent_id)?;

        Ok(Self {
            meta: RecordMeta::new(id, workspace_id, now)?,
            name: NonEmptyString::new(input.name)?,
            description: optional_text(input.description),
            parent_id,
        })
    }

    fn apply_patch(&mut self, patch: CategoryPatch, now: DateTime<Utc>) -> AppResult<()> {
        let mut next = self.clone();

        if let Some(name) = patch.name {
            next.name = NonEmptyString::new(name)?;
        }
        if let Some(parent_id) = patch.parent_id {
            next.parent_id = parent_reference(self.id(), parent_id)?;
        }
        patch_text(&mut next.description, patch.description);

        next.meta.touch(now);
        *self = next;
        Ok(())
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }
}
