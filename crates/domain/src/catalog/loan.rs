use chrono::{DateTime, Utc};
use inventra_core::{AppError, AppResult, NonEmptyString, WorkspaceId};
use serde::{Deserialize, Serialize};

use super::fields::{nullable, optional_text, patch_text, positive};
use super::{CatalogEntity, EntityKind, RecordMeta};

/// Loan of some quantity of an item to a borrower.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Loan {
    #[serde(flatten)]
    meta: RecordMeta,
    item_id: NonEmptyString,
    borrower_id: NonEmptyString,
    quantity: i64,
    loaned_at: DateTime<Utc>,
    due_at: Option<DateTime<Utc>>,
    returned_at: Option<DateTime<Utc>>,
    notes: Option<String>,
}

/// Payload used to create a loan.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoanInput {
    /// Borrowed item reference.
    pub item_id: String,
    /// Borrower reference.
    pub borrower_id: String,
    /// Borrowed units, defaults to one.
    #[serde(default)]
    pub quantity: Option<i64>,
    /// Loan start, defaults to the creation time.
    #[serde(default)]
    pub loaned_at: Option<DateTime<Utc>>,
    /// Optional due date.
    #[serde(default)]
    pub due_at: Option<DateTime<Utc>>,
    /// Optional free-form notes.
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial update for a loan. Item and borrower are fixed once the loan exists.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoanPatch {
    /// New borrowed quantity.
    #[serde(default)]
    pub quantity: Option<i64>,
    /// New due date.
    #[serde(default, deserialize_with = "nullable")]
    pub due_at: Option<Option<DateTime<Utc>>>,
    /// Return time; `null` reopens the loan.
    #[serde(default, deserialize_with = "nullable")]
    pub returned_at: Option<Option<DateTime<Utc>>>,
    /// New notes.
    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
}

impl Loan {
    /// Returns the borrowed item reference.
    #[must_use]
    pub fn item_id(&self) -> &str {
        self.item_id.as_str()
    }

    /// Returns the borrower reference.
    #[must_use]
    pub fn borrower_id(&self) -> &str {
        self.borrower_id.as_str()
    }

    /// Returns the borrowed units.
    #[must_use]
    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    /// Returns whether the loan has been returned.
    #[must_use]
    pub fn is_returned(&self) -> bool {
        self.returned_at.is_some()
    }

    fn validate_dates(&self) -> AppResult<()> {
        if let Some(due_at) = self.due_at
            && due_at <= self.loaned_at
        {
            return Err(AppError::Validation(
                "due_at must be after loaned_at".to_owned(),
            ));
        }

        if let Some(returned_at) = self.returned_at
            && returned_at < self.loaned_at
        {
            return Err(AppError::Validation(
                "returned_at must not be before loaned_at".to_owned(),
            ));
        }

        Ok(())
    }
}

impl CatalogEntity for Loan {
    const KIND: EntityKind = EntityKind::Loan;
    type Input = LoanInput;
    type Patch = LoanPatch;

    fn create(
        id: String,
        workspace_id: WorkspaceId,
        input: LoanInput,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        let loan = Self {
            meta: RecordMeta::new(id, workspace_id, now)?,
            item_id: NonEmptyString::new(input.item_id)?,
            borrower_id: NonEmptyString::new(input.borrower_id)?,
            quantity: positive("quantity", input.quantity.unwrap_or(1))?,
            loaned_at: input.loaned_at.unwrap_or(now),
            due_at: input.due_at,
            returned_at: None,
            notes: optional_text(input.notes),
        };
        loan.validate_dates()?;

        Ok(loan)
    }

    fn apply_patch(&mut self, patch: LoanPatch, now: DateTime<Utc>) -> AppResult<()> {
        let mut next = self.clone();

        if let Some(quantity) = patch.quantity {
            next.quantity = positive("quantity", quantity)?;
        }
        if let Some(due_at) = patch.due_at {
            next.due_at = due_at;
        }
        if let Some(returned_at) = patch.returned_at {
            next.returned_at = returned_at;
        }
        patch_text(&mut next.notes, patch.notes);
        next.validate_dates()?;

        next.meta.touch(now);
        *self = next;
        Ok(())
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }
}
