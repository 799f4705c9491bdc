use std::fmt::{Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Duration, Utc};
use inventra_core::{AppError, AppResult, WorkspaceId};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

mod borrower;
mod category;
mod company;
mod container;
mod fields;
mod item;
mod label;
mod loan;
mod location;

pub use borrower::{Borrower, BorrowerInput, BorrowerPatch};
pub use category::{Category, CategoryInput, CategoryPatch};
pub use company::{Company, CompanyInput, CompanyPatch};
pub use container::{Container, ContainerInput, ContainerPatch};
pub use item::{Item, ItemInput, ItemPatch};
pub use label::{Label, LabelInput, LabelPatch};
pub use loan::{Loan, LoanInput, LoanPatch};
pub use location::{Location, LocationInput, LocationPatch};

/// Closed set of catalog entity kinds targetable by generic change handling.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    /// Inventory item.
    Item,
    /// Physical location.
    Location,
    /// Container holding items.
    Container,
    /// Item category.
    Category,
    /// Free-form label.
    Label,
    /// Manufacturer or vendor.
    Company,
    /// Person or group borrowing items.
    Borrower,
    /// Loan of an item to a borrower.
    Loan,
}

impl EntityKind {
    /// Returns the stable transport and storage tag.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Item => "item",
            Self::Location => "location",
            Self::Container => "container",
            Self::Category => "category",
            Self::Label => "label",
            Self::Company => "company",
            Self::Borrower => "borrower",
            Self::Loan => "loan",
        }
    }

    /// Returns all supported kinds.
    #[must_use]
    pub fn all() -> &'static [Self] {
        const ALL: &[EntityKind] = &[
            EntityKind::Item,
            EntityKind::Location,
            EntityKind::Container,
            EntityKind::Category,
            EntityKind::Label,
            EntityKind::Company,
            EntityKind::Borrower,
            EntityKind::Loan,
        ];

        ALL
    }
}

impl Display for EntityKind {
    fn fmt(&self, formatter: &mut Formatter<'_>) -> std::fmt::Result {
        formatter.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        Self::all()
            .iter()
            .copied()
            .find(|kind| kind.as_str() == value)
            .ok_or_else(|| AppError::Validation(format!("unsupported entity type '{value}'")))
    }
}

/// Identity and timestamps shared by every catalog record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecordMeta {
    id: String,
    workspace_id: WorkspaceId,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl RecordMeta {
    /// Creates metadata for a record created at `now`.
    pub fn new(
        id: impl Into<String>,
        workspace_id: WorkspaceId,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        let id = id.into();
        if id.trim().is_empty() {
            return Err(AppError::Validation(
                "record id must not be empty".to_owned(),
            ));
        }

        Ok(Self {
            id,
            workspace_id,
            created_at: now,
            updated_at: now,
        })
    }

    /// Marks the record as modified at `now`.
    ///
    /// The modification time always moves forward, even when `now` does not,
    /// so every accepted write yields a new version.
    pub fn touch(&mut self, now: DateTime<Utc>) {
        self.updated_at = if now > self.updated_at {
            now
        } else {
            self.updated_at + Duration::microseconds(1)
        };
    }
}

/// Behaviour every catalog entity exposes to the generic change machinery.
///
/// `create` and `apply_patch` own the entity's field invariants; callers never
/// validate fields themselves and surface the returned validation errors as-is.
pub trait CatalogEntity:
    Clone + std::fmt::Debug + Serialize + DeserializeOwned + Send + Sync + 'static
{
    /// Kind tag for this entity.
    const KIND: EntityKind;

    /// Payload accepted when creating the entity.
    type Input: DeserializeOwned + Send;

    /// Partial payload accepted when updating the entity.
    type Patch: DeserializeOwned + Send;

    /// Builds a validated entity.
    fn create(
        id: String,
        workspace_id: WorkspaceId,
        input: Self::Input,
        now: DateTime<Utc>,
    ) -> AppResult<Self>;

    /// Applies a validated partial update and bumps the modification time.
    fn apply_patch(&mut self, patch: Self::Patch, now: DateTime<Utc>) -> AppResult<()>;

    /// Returns the shared record metadata.
    fn meta(&self) -> &RecordMeta;

    /// Returns the stable record identifier.
    fn id(&self) -> &str {
        self.meta().id.as_str()
    }

    /// Returns the owning workspace.
    fn workspace_id(&self) -> WorkspaceId {
        self.meta().workspace_id
    }

    /// Returns the creation time.
    fn created_at(&self) -> DateTime<Utc> {
        self.meta().created_at
    }

    /// Returns the last modification time used for optimistic concurrency.
    fn updated_at(&self) -> DateTime<Utc> {
        self.meta().updated_at
    }
}
