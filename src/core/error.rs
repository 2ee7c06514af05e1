//! Error taxonomy for the sheet core
//!
//! Every failure the core can produce is a typed, recoverable value. The
//! presentation layer decides how to render it; nothing here is fatal to
//! the host process.

use chrono::NaiveDate;
use miette::Diagnostic;
use thiserror::Error;

use crate::core::identity::EntityId;
use crate::core::quantity::QuantityError;
use crate::core::team::Role;
use crate::core::workflow::SheetStatus;

pub type Result<T, E = GkError> = std::result::Result<T, E>;

/// Errors returned by the sheet core
#[derive(Debug, Error, Diagnostic)]
pub enum GkError {
    #[error("{actor} ({role}) is not allowed to {action}")]
    #[diagnostic(
        code(gk::authorization),
        help("ask an administrator or the sheet's owner to perform this action")
    )]
    Authorization {
        actor: String,
        role: Role,
        action: String,
    },

    #[error("sheet {sheet} is {status}; entries can only change while it is draft or rejected")]
    #[diagnostic(code(gk::lifecycle::locked))]
    SheetLocked { sheet: EntityId, status: SheetStatus },

    #[error("a new sheet must start as draft, not {0}")]
    #[diagnostic(code(gk::lifecycle::initial_status))]
    InvalidInitialStatus(SheetStatus),

    #[error("invalid status transition: {from} -> {to}")]
    #[diagnostic(code(gk::lifecycle::transition))]
    InvalidTransition { from: SheetStatus, to: SheetStatus },

    #[error("BoQ item {code} is referenced by {entries} sheet entries and can no longer change")]
    #[diagnostic(
        code(gk::boq::locked),
        help("remove the item from every sheet before changing it")
    )]
    BoqItemLocked { code: String, entries: usize },

    #[error("{} validation error(s); nothing was saved", .errors.len())]
    #[diagnostic(code(gk::validation))]
    Validation {
        #[related]
        errors: Vec<ValidationError>,
    },

    #[error("{entity} not found: {id}")]
    #[diagnostic(code(gk::not_found))]
    NotFound { entity: &'static str, id: String },

    #[error("database schema version {found} does not match the expected version {expected}")]
    #[diagnostic(
        code(gk::storage::schema),
        help("this database was written by a different version of gk")
    )]
    SchemaMismatch { found: i32, expected: i32 },

    #[error("storage error: {0}")]
    #[diagnostic(code(gk::storage))]
    Storage(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    #[diagnostic(code(gk::csv))]
    Csv(#[from] csv::Error),
}

impl GkError {
    /// Wrap a single validation failure
    pub fn invalid(error: ValidationError) -> Self {
        GkError::Validation {
            errors: vec![error],
        }
    }

    pub fn not_found(entity: &'static str, id: impl ToString) -> Self {
        GkError::NotFound {
            entity,
            id: id.to_string(),
        }
    }

    /// Whether the action was refused because of the sheet's status
    pub fn is_lifecycle_violation(&self) -> bool {
        matches!(
            self,
            GkError::SheetLocked { .. }
                | GkError::InvalidInitialStatus(_)
                | GkError::InvalidTransition { .. }
        )
    }

    /// Validation errors carried by this error, if any
    pub fn validation_errors(&self) -> &[ValidationError] {
        match self {
            GkError::Validation { errors } => errors,
            _ => &[],
        }
    }
}

/// Field-level validation failures, reported together
#[derive(Debug, Clone, PartialEq, Eq, Error, Diagnostic)]
pub enum ValidationError {
    #[error("row {row}: BoQ item {boq_item} appears more than once")]
    #[diagnostic(code(gk::validation::duplicate_entry))]
    DuplicateEntry { row: usize, boq_item: EntityId },

    #[error("row {row}: BoQ item {boq_item} does not belong to the sheet's project")]
    #[diagnostic(code(gk::validation::foreign_scope))]
    ForeignScopeViolation { row: usize, boq_item: EntityId },

    #[error("row {row}: invalid quantity: {reason}")]
    #[diagnostic(
        code(gk::validation::quantity),
        help("use a non-negative number with at most 3 decimal places, e.g. 12.500")
    )]
    InvalidQuantity { row: usize, reason: QuantityError },

    #[error("{field} '{value}' is already in use")]
    #[diagnostic(code(gk::validation::unique))]
    UniquenessViolation { field: &'static str, value: String },

    #[error("period start {from} is after period end {to}")]
    #[diagnostic(code(gk::validation::period))]
    InvalidPeriod { from: NaiveDate, to: NaiveDate },

    #[error("{field}: {message}")]
    #[diagnostic(code(gk::validation::field))]
    InvalidField { field: &'static str, message: String },
}

impl ValidationError {
    /// The form field the error belongs to
    pub fn field(&self) -> &'static str {
        match self {
            ValidationError::DuplicateEntry { .. }
            | ValidationError::ForeignScopeViolation { .. } => "boq_item",
            ValidationError::InvalidQuantity { .. } => "quantity",
            ValidationError::UniquenessViolation { field, .. } => field,
            ValidationError::InvalidPeriod { .. } => "period_from",
            ValidationError::InvalidField { field, .. } => field,
        }
    }

    /// 1-based entry row for batch errors
    pub fn row(&self) -> Option<usize> {
        match self {
            ValidationError::DuplicateEntry { row, .. }
            | ValidationError::ForeignScopeViolation { row, .. }
            | ValidationError::InvalidQuantity { row, .. } => Some(*row),
            _ => None,
        }
    }
}

/// Require a non-blank text field no longer than `max` characters
pub fn require_text(
    errors: &mut Vec<ValidationError>,
    field: &'static str,
    value: &str,
    max: usize,
) {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        errors.push(ValidationError::InvalidField {
            field,
            message: "must not be empty".to_string(),
        });
    } else if trimmed.chars().count() > max {
        errors.push(ValidationError::InvalidField {
            field,
            message: format!("must be at most {} characters", max),
        });
    }
}

/// `Ok` when no errors were collected, otherwise all of them together
pub fn ensure_valid(errors: Vec<ValidationError>) -> Result<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(GkError::Validation { errors })
    }
}
