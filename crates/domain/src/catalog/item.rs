use chrono::{DateTime, Utc};
use inventra_core::{AppError, AppResult, NonEmptyString, WorkspaceId};
use serde::{Deserialize, Serialize};

use super::fields::{non_negative, nullable, optional_text, patch_text};
use super::{CatalogEntity, EntityKind, RecordMeta};

/// Inventory item tracked in a workspace catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Item {
    #[serde(flatten)]
    meta: RecordMeta,
    name: NonEmptyString,
    description: Option<String>,
    quantity: i64,
    serial_number: Option<String>,
    location_id: Option<String>,
    container_id: Option<String>,
    category_id: Option<String>,
    #[serde(default)]
    label_ids: Vec<String>,
    purchase_price_cents: Option<i64>,
    company_id: Option<String>,
    notes: Option<String>,
}

/// Payload used to create an item.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ItemInput {
    /// Display name.
    pub name: String,
    /// Optional description.
    #[serde(default)]
    pub description: Option<String>,
    /// Units on hand, defaults to one.
    #[serde(default)]
    pub quantity: Option<i64>,
    /// Optional manufacturer serial number.
    #[serde(default)]
    pub serial_number: Option<String>,
    /// Optional location reference.
    #[serde(default)]
    pub location_id: Option<String>,
    /// Optional container reference.
    #[serde(default)]
    pub container_id: Option<String>,
    /// Optional category reference.
    #[serde(default)]
    pub category_id: Option<String>,
    /// Attached label references.
    #[serde(default)]
    pub label_ids: Vec<String>,
    /// Optional purchase price in minor currency units.
    #[serde(default)]
    pub purchase_price_cents: Option<i64>,
    /// Optional manufacturer or vendor reference.
    #[serde(default)]
    pub company_id: Option<String>,
    /// Optional free-form notes.
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial update for an item. Absent keys are left unchanged; `null` clears
/// optional fields.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ItemPatch {
    /// New display name.
    #[serde(default)]
    pub name: Option<String>,
    /// New description.
    #[serde(default, deserialize_with = "nullable")]
    pub description: Option<Option<String>>,
    /// New quantity.
    #[serde(default)]
    pub quantity: Option<i64>,
    /// New serial number.
    #[serde(default, deserialize_with = "nullable")]
    pub serial_number: Option<Option<String>>,
    /// New location reference.
    #[serde(default, deserialize_with = "nullable")]
    pub location_id: Option<Option<String>>,
    /// New container reference.
    #[serde(default, deserialize_with = "nullable")]
    pub container_id: Option<Option<String>>,
    /// New category reference.
    #[serde(default, deserialize_with = "nullable")]
    pub category_id: Option<Option<String>>,
    /// Replacement label set.
    #[serde(default)]
    pub label_ids: Option<Vec<String>>,
    /// New purchase price.
    #[serde(default, deserialize_with = "nullable")]
    pub purchase_price_cents: Option<Option<i64>>,
    /// New manufacturer or vendor reference.
    #[serde(default, deserialize_with = "nullable")]
    pub company_id: Option<Option<String>>,
    /// New notes.
    #[serde(default, deserialize_with = "nullable")]
    pub notes: Option<Option<String>>,
}

impl Item {
    /// Returns the display name.
    #[must_use]
    pub fn name(&self) -> &NonEmptyString {
        &self.name
    }

    /// Returns the units on hand.
    #[must_use]
    pub fn quantity(&self) -> i64 {
        self.quantity
    }

    /// Returns the location reference.
    #[must_use]
    pub fn location_id(&self) -> Option<&str> {
        self.location_id.as_deref()
    }

    /// Returns attached label references.
    #[must_use]
    pub fn label_ids(&self) -> &[String] {
        self.label_ids.as_slice()
    }

    /// Returns the optional description.
    #[must_use]
    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }
}

impl CatalogEntity for Item {
    const KIND: EntityKind = EntityKind::Item;
    type Input = ItemInput;
    type Patch = ItemPatch;

    fn create(
        id: String,
        workspace_id: WorkspaceId,
        input: ItemInput,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        let purchase_price_cents = input
            .purchase_price_cents
            .map(|value| non_negative("purchase_price_cents", value))
            .transpose()?;

        Ok(Self {
            meta: RecordMeta::new(id, workspace_id, now)?,
            name: NonEmptyString::new(input.name)?,
            description: optional_text(input.description),
            quantity: non_negative("quantity", input.quantity.unwrap_or(1))?,
            serial_number: optional_text(input.serial_number),
            location_id: optional_text(input.location_id),
            container_id: optional_text(input.container_id),
            category_id: optional_text(input.category_id),
            label_ids: normalize_label_ids(input.label_ids)?,
            purchase_price_cents,
            company_id: optional_text(input.company_id),
            notes: optional_text(input.notes),
        })
    }

    fn apply_patch(&mut self, patch: ItemPatch, now: DateTime<Utc>) -> AppResult<()> {
        let mut next = self.clone();

        if let Some(name) = patch.name {
            next.name = NonEmptyString::new(name)?;
        }
        if let Some(quantity) = patch.quantity {
            next.quantity = non_negative("quantity", quantity)?;
        }
        if let Some(label_ids) = patch.label_ids {
            next.label_ids = normalize_label_ids(label_ids)?;
        }
        if let Some(price) = patch.purchase_price_cents {
            next.purchase_price_cents = price
                .map(|value| non_negative("purchase_price_cents", value))
                .transpose()?;
        }
        patch_text(&mut next.description, patch.description);
        patch_text(&mut next.serial_number, patch.serial_number);
        patch_text(&mut next.location_id, patch.location_id);
        patch_text(&mut next.container_id, patch.container_id);
        patch_text(&mut next.category_id, patch.category_id);
        patch_text(&mut next.company_id, patch.company_id);
        patch_text(&mut next.notes, patch.notes);

        next.meta.touch(now);
        *self = next;
        Ok(())
    }

    fn meta(&self) -> &RecordMeta {
        &self.meta
    }
}

fn normalize_label_ids(label_ids: Vec<String>) -> AppResult<Vec<String>> {
    let mut normalized: Vec<String> = Vec::with_capacity(label_ids.len());
    for label_id in label_ids {
        let label_id = label_id.trim().to_owned();
        if label_id.is_empty() {
            return Err(AppError::Validation(
                "label_ids must not contain blank values".to_owned(),
            ));
        }
        if !normalized.contains(&label_id) {
            normalized.push(label_id);
        }
    }

    Ok(normalized)
}
