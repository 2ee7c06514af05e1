//! BoQ item - one contracted position of a bill of quantities

use serde::{Deserialize, Serialize};

use crate::core::error::{ensure_valid, require_text, GkError, Result, ValidationError};
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::quantity::{amount, Price, Quantity};

/// Longest position code
pub const CODE_MAX: usize = 50;
/// Longest description
pub const TITLE_MAX: usize = 255;
/// Longest unit of measure
pub const UOM_MAX: usize = 20;

/// A bill-of-quantities position. `(project, code)` is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BoqItem {
    pub id: EntityId,
    pub project_id: EntityId,
    /// Position code, e.g. "01.02.003"
    pub code: String,
    pub title: String,
    /// Unit of measure (m, m2, m3, kg, kom, ...)
    pub uom: String,
    pub contracted_quantity: Quantity,
    pub unit_price: Price,
}

impl BoqItem {
    /// Contracted value of the position
    pub fn contract_value(&self) -> rust_decimal::Decimal {
        amount(self.contracted_quantity, self.unit_price)
    }

    /// Whether any attribute other than identity differs
    pub fn differs_from(&self, other: &BoqItem) -> bool {
        self.title != other.title
            || self.uom != other.uom
            || self.contracted_quantity != other.contracted_quantity
            || self.unit_price != other.unit_price
    }
}

/// Input for creating a BoQ item; numbers arrive as text
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NewBoqItem {
    pub code: String,
    pub title: String,
    pub uom: String,
    pub contracted_quantity: String,
    pub unit_price: String,
}

impl NewBoqItem {
    /// Validate every field and build the record for `project_id`
    pub fn into_item(self, project_id: &EntityId) -> Result<BoqItem> {
        let mut errors = Vec::new();
        require_text(&mut errors, "code", &self.code, CODE_MAX);
        require_text(&mut errors, "title", &self.title, TITLE_MAX);
        require_text(&mut errors, "uom", &self.uom, UOM_MAX);

        let quantity = Quantity::parse(&self.contracted_quantity).map_err(|e| {
            ValidationError::InvalidField {
                field: "contracted_quantity",
                message: e.to_string(),
            }
        });
        let price = Price::parse(&self.unit_price).map_err(|e| ValidationError::InvalidField {
            field: "unit_price",
            message: e.to_string(),
        });

        match (quantity, price) {
            (Ok(contracted_quantity), Ok(unit_price)) if errors.is_empty() => Ok(BoqItem {
                id: EntityId::new(EntityPrefix::Boq),
                project_id: project_id.clone(),
                code: self.code.trim().to_string(),
                title: self.title.trim().to_string(),
                uom: self.uom.trim().to_string(),
                contracted_quantity,
                unit_price,
            }),
            (quantity, price) => {
                errors.extend(quantity.err());
                errors.extend(price.err());
                Err(GkError::Validation { errors })
            }
        }
    }
}

/// Attribute changes for an existing item; `None` keeps the current value
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BoqItemChanges {
    pub title: Option<String>,
    pub uom: Option<String>,
    pub contracted_quantity: Option<String>,
    pub unit_price: Option<String>,
}

impl BoqItemChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.uom.is_none()
            && self.contracted_quantity.is_none()
            && self.unit_price.is_none()
    }

    /// Validate the given fields and return `item` with them applied
    pub fn apply(self, item: &BoqItem) -> Result<BoqItem> {
        let mut errors = Vec::new();
        let mut updated = item.clone();

        if let Some(title) = &self.title {
            require_text(&mut errors, "title", title, TITLE_MAX);
            updated.title = title.trim().to_string();
        }
        if let Some(uom) = &self.uom {
            require_text(&mut errors, "uom", uom, UOM_MAX);
            updated.uom = uom.trim().to_string();
        }
        if let Some(quantity) = &self.contracted_quantity {
            match Quantity::parse(quantity) {
                Ok(value) => updated.contracted_quantity = value,
                Err(e) => errors.push(ValidationError::InvalidField {
                    field: "contracted_quantity",
                    message: e.to_string(),
                }),
            }
        }
        if let Some(price) = &self.unit_price {
            match Price::parse(price) {
                Ok(value) => updated.unit_price = value,
                Err(e) => errors.push(ValidationError::InvalidField {
                    field: "unit_price",
                    message: e.to_string(),
                }),
            }
        }

        ensure_valid(errors)?;
        Ok(updated)
    }
}
