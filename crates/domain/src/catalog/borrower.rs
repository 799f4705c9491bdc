use chrono::{DateTime, Utc};
use inventra_core::{AppResult, NonEmptyString, WorkspaceId};
use serde::{Deserialize, Serialize};

use super::fields::{nullable, optional_email, optional_text, patch_text};
use super::{CatalogEntity, EntityKind, RecordMeta};

/// Person or group that borrows items.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Borrower {
    #[serde(flatten)]
    meta: RecordMeta,
    name: NonEmptyString,
    email: Option<String>,
    phone: Option<String>,
}

/// Payload used to create a borrower.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BorrowerInput {
    /// Display name.
    pub name: String,
    /// Optional contact email.
    #[serde(default)]
    pub email: Option<String>,
    /// Optional phone number.
    #[serde(default)]
    pub phone: Option<String>,
}

/// Partial update for a borrower.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BorrowerPatch {
    /// New display name.
    #[serde(default)]
    pub name: Option<String>,
    /// New contact email.
    #[serde(default, deserialize_with = "nullable")]
    pub email: Option<Option<String>>,
    /// New phone number.
    #[serde(default, deserialize_with = "nullable")]
    pub phone: Option<Option<String>>,
}

impl Borrower {
    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }
}

impl CatalogEntity for Borrower {
    const KIND: EntityKind = EntityKind::Borrower;
    type Input = BorrowerInput;
    type Patch = BorrowerPatch;

    fn create(
        id: String,
        workspace_id: WorkspaceId,
        input: BorrowerInput,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        Ok(Self {
            meta: RecordMeta::new(id, workspace_id, now)?,
            name: NonEmptyString::new(input.name)?,
            email: optional_email("email", input.email)?,
            phone: optional_text(input.phone),
        })
    }

    fn apply_patch(&mut self, patch: BorrowerPatch, now: DateTime<Utc>) -> AppResult<()> {
        let mut next = self.clone();

        if let Some(name) = patch.name {
            next.name = NonEmptyString::new(name)?;
        }
        if let Some(email) = patch.email {
            next.email = optional_email("email", email)?;
        }
        patch_text(&mut next.phone, patch.phone);

        next.meta.touch(now);
        *self = next;
        Ok(())
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }
}
