//! Sheet - one periodic page of the construction book

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::core::error::{GkError, Result, ValidationError};
use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::team::Actor;
use crate::core::workflow::{self, SheetStatus};
use crate::entities::{EntryLine, Project};

/// A construction book sheet. `(project, number)` is unique.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sheet {
    pub id: EntityId,
    pub project_id: EntityId,
    /// Sequential sheet number within the project
    pub number: u32,
    pub period_from: NaiveDate,
    pub period_to: NaiveDate,
    pub status: SheetStatus,
    #[serde(default)]
    pub note: String,
    /// Username of the owning contractor
    pub created_by: String,
    pub created_at: DateTime<Utc>,
    pub submitted_at: Option<DateTime<Utc>>,
    pub approved_at: Option<DateTime<Utc>>,
}

impl Sheet {
    /// Build a new draft sheet owned by `creator`
    ///
    /// Any requested status other than draft fails with
    /// [`GkError::InvalidInitialStatus`] before field validation runs.
    pub fn create(
        project: &Project,
        creator: &Actor,
        new: NewSheet,
        now: DateTime<Utc>,
    ) -> Result<Sheet> {
        workflow::ensure_initial(new.status.unwrap_or_default())?;

        let mut errors = Vec::new();
        if new.number == 0 {
            errors.push(ValidationError::InvalidField {
                field: "number",
                message: "must be at least 1".to_string(),
            });
        }
        if new.period_from > new.period_to {
            errors.push(ValidationError::InvalidPeriod {
                from: new.period_from,
                to: new.period_to,
            });
        }
        if !errors.is_empty() {
            return Err(GkError::Validation { errors });
        }

        Ok(Sheet {
            id: EntityId::new(EntityPrefix::Sht),
            project_id: project.id.clone(),
            number: new.number,
            period_from: new.period_from,
            period_to: new.period_to,
            status: SheetStatus::Draft,
            note: new.note.trim().to_string(),
            created_by: creator.username.clone(),
            created_at: now,
            submitted_at: None,
            approved_at: None,
        })
    }
}

/// Input for creating a sheet
#[derive(Debug, Clone, Deserialize)]
pub struct NewSheet {
    pub number: u32,
    pub period_from: NaiveDate,
    pub period_to: NaiveDate,
    #[serde(default)]
    pub note: String,
    /// Requested initial status; only draft is accepted
    #[serde(default)]
    pub status: Option<SheetStatus>,
}

impl NewSheet {
    pub fn new(number: u32, period_from: NaiveDate, period_to: NaiveDate) -> Self {
        Self {
            number,
            period_from,
            period_to,
            note: String::new(),
            status: None,
        }
    }
}

/// A row of the sheet list
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SheetSummary {
    pub id: EntityId,
    pub number: u32,
    pub period_from: NaiveDate,
    pub period_to: NaiveDate,
    pub status: SheetStatus,
    pub created_by: String,
    pub entry_count: usize,
    pub total: Decimal,
}

/// Sheet list filter
#[derive(Debug, Clone, Default)]
pub struct SheetFilter {
    pub status: Option<SheetStatus>,
    /// Keep only sheets with an entry for this BoQ item
    pub boq_item: Option<EntityId>,
}

/// A sheet with its entries, as seen by one actor
#[derive(Debug, Clone, Serialize)]
pub struct SheetDetail {
    pub sheet: Sheet,
    /// Ordered by BoQ item code
    pub entries: Vec<EntryLine>,
    pub can_edit: bool,
}

impl SheetDetail {
    /// Sum of the entry amounts
    pub fn total(&self) -> Decimal {
        self.entries.iter().map(EntryLine::amount).sum()
    }
}
