//! Entry - quantity recorded on a sheet for one BoQ item

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::identity::EntityId;
use crate::core::quantity::{amount, Price, Quantity};

/// A stored sheet line. `(sheet, boq_item)` is unique.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Entry {
    pub sheet_id: EntityId,
    pub boq_item_id: EntityId,
    /// Progress this period; zero records "no progress" explicitly
    pub quantity: Quantity,
    #[serde(default)]
    pub note: String,
}

impl Entry {
    /// Whether applying `other` over this entry would change anything
    pub fn differs_from(&self, other: &Entry) -> bool {
        self.quantity != other.quantity || self.note != other.note
    }
}

/// An entry joined with the BoQ item it measures, for display
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryLine {
    pub boq_code: String,
    pub boq_title: String,
    pub uom: String,
    pub unit_price: Price,
    #[serde(flatten)]
    pub entry: Entry,
}

impl EntryLine {
    pub fn quantity(&self) -> Quantity {
        self.entry.quantity
    }

    /// Quantity times unit price, two decimals
    pub fn amount(&self) -> Decimal {
        amount(self.entry.quantity, self.unit_price)
    }
}

/// One desired line in a batch edit; the quantity is raw user input
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntryInput {
    pub boq_item: EntityId,
    pub quantity: String,
    #[serde(default)]
    pub note: String,
}

impl EntryInput {
    pub fn new(boq_item: &EntityId, quantity: impl Into<String>) -> Self {
        Self {
            boq_item: boq_item.clone(),
            quantity: quantity.into(),
            note: String::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = note.into();
        self
    }
}
