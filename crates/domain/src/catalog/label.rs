use chrono::{DateTime, Utc};
use inventra_core::{AppResult, NonEmptyString, WorkspaceId};
use serde::{Deserialize, Serialize};

use super::fields::{nullable, optional_color};
use super::{CatalogEntity, EntityKind, RecordMeta};

/// Free-form tag attachable to items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Label {
    #[serde(flatten)]
    meta: RecordMeta,
    name: NonEmptyString,
    color: Option<String>,
}

/// Payload used to create a label.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LabelInput {
    /// Display name.
    pub name: String,
    /// Optional `#rrggbb` color.
    #[serde(default)]
    pub color: Option<String>,
}

/// Partial update for a label.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LabelPatch {
    /// New display name.
    #[serde(default)]
    pub name: Option<String>,
    /// New color.
    #[serde(default, deserialize_with = "nullable")]
    pub color: Option<Option<String>>,
}

impl Label {
    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }

    /// Returns the normalized color.
    #[must_use]
    pub fn color(&self) -> Option<&str> {
        self.color.as_deref()
    }
}

impl CatalogEntity for Label {
    const KIND: EntityKind = EntityKind::Label;
    type Input = LabelInput;
    type Patch = LabelPatch;

    fn create(
        id: String,
        workspace_id: WorkspaceId,
        input: LabelInput,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        Ok(Self {
            meta: RecordMeta::new(id, workspace_id, now)?,
            name: NonEmptyString::new(input.name)?,
            color: optional_color(input.color)?,
        })
    }

    fn apply_patch(&mut self, patch: LabelPatch, now: DateTime<Utc>) -> AppResult<()> {
        let mut next = self.clone();

        if let Some(name) = patch.name {
            next.name = NonEmptyString::new(name)?;
        }
        if let Some(color) = patch.color {
            next.color = optional_color(color)?;
        }

        next.meta.touch(now);
        *self = next;
        Ok(())
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }
}
