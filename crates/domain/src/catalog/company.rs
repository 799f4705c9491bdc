use chrono::{DateTime, Utc};
use inventra_core::{AppResult, NonEmptyString, WorkspaceId};
use serde::{Deserialize, Serialize};

use super::fields::{nullable, optional_email, optional_text, patch_text};
use super::{CatalogEntity, EntityKind, RecordMeta};

/// Manufacturer, vendor or service provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Company {
    #[serde(flatten)]
    meta: RecordMeta,
    name: NonEmptyString,
    website: Option<String>,
    email: Option<String>,
}

/// Payload used to create a company.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompanyInput {
    /// Display name.
    pub name: String,
    /// Optional website.
    #[serde(default)]
    pub website: Option<String>,
    /// Optional contact email.
    #[serde(default)]
    pub email: Option<String>,
}

/// Partial update for a company.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct CompanyPatch {
    /// New display name.
    #[serde(default)]
    pub name: Option<String>,
    /// New website.
    #[serde(default, deserialize_with = "nullable")]
    pub website: Option<Option<String>>,
    /// New contact email.
    #[serde(default, deserialize_with = "nullable")]
    pub email: Option<Option<String>>,
}

impl Company {
    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }

    /// Returns the contact email.
    #[must_use]
    pub fn email(&self) -> Option<&str> {
        self.email.as_deref()
    }
}

impl CatalogEntity for Company {
    const KIND: EntityKind = EntityKind::Company;
    type Input = CompanyInput;
    type Patch = CompanyPatch;

    fn create(
        id: String,
        workspace_id: WorkspaceId,
        input: CompanyInput,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        Ok(Self {
            meta: RecordMeta::new(id, workspace_id, now)?,
            name: NonEmptyString::new(input.name)?,
            website: optional_text(input.website),
            email: optional_email("email", input.email)?,
        })
    }

    fn apply_patch(&mut self, patch: CompanyPatch, now: DateTime<Utc>) -> AppResult<()> {
        let mut next = self.clone();

        if let Some(name) = patch.name {
            next.name = NonEmptyString::new(name)?;
        }
        if let Some(email) = patch.email {
            next.email = optional_email("email", email)?;
        }
        patch_text(&mut next.website, patch.website);

        next.meta.touch(now);
        *self = next;
        Ok(())
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }
}
