//! Sheet lifecycle: status set, transition table, and timestamp bookkeeping
//!
//! Sheets are created as `draft`. The full transition table is modeled here
//! so that review steps can be wired to it without changing the status
//! set:
//!
//! ```text
//! draft ──> submitted ──> approved
//!              │  ^
//!              v  │
//!            rejected
//! ```
//!
//! Entries may only change while a sheet is `draft` or `rejected`.

use chrono::{DateTime, Utc};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::core::error::{GkError, Result};
use crate::entities::Sheet;

/// Sheet status
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    Serialize,
    Deserialize,
    ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum SheetStatus {
    #[default]
    Draft,
    Submitted,
    Approved,
    Rejected,
}

/// Every permitted status change
const TRANSITIONS: &[(SheetStatus, SheetStatus)] = &[
    (SheetStatus::Draft, SheetStatus::Submitted),
    (SheetStatus::Submitted, SheetStatus::Approved),
    (SheetStatus::Submitted, SheetStatus::Rejected),
    // Resubmission after rework
    (SheetStatus::Rejected, SheetStatus::Submitted),
];

impl SheetStatus {
    pub fn all() -> &'static [SheetStatus] {
        &[
            SheetStatus::Draft,
            SheetStatus::Submitted,
            SheetStatus::Approved,
            SheetStatus::Rejected,
        ]
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SheetStatus::Draft => "draft",
            SheetStatus::Submitted => "submitted",
            SheetStatus::Approved => "approved",
            SheetStatus::Rejected => "rejected",
        }
    }

    /// Whether entries of a sheet in this status may be mutated
    pub fn is_editable(&self) -> bool {
        matches!(self, SheetStatus::Draft | SheetStatus::Rejected)
    }

    /// Check if a status transition is valid
    pub fn can_transition_to(&self, to: SheetStatus) -> bool {
        TRANSITIONS.contains(&(*self, to))
    }

    /// Get allowed transitions from this status
    pub fn allowed_transitions(&self) -> Vec<SheetStatus> {
        TRANSITIONS
            .iter()
            .filter(|(from, _)| from == self)
            .map(|(_, to)| *to)
            .collect()
    }

    /// No outgoing edges
    pub fn is_terminal(&self) -> bool {
        self.allowed_transitions().is_empty()
    }
}

impl std::fmt::Display for SheetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for SheetStatus {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "draft" => Ok(SheetStatus::Draft),
            "submitted" => Ok(SheetStatus::Submitted),
            "approved" => Ok(SheetStatus::Approved),
            "rejected" => Ok(SheetStatus::Rejected),
            _ => Err(format!("Unknown status: {}", s)),
        }
    }
}

/// Refuse any initial status other than draft
pub fn ensure_initial(status: SheetStatus) -> Result<()> {
    if status != SheetStatus::Draft {
        return Err(GkError::InvalidInitialStatus(status));
    }
    Ok(())
}

/// Refuse entry mutation unless the sheet is draft or rejected
pub fn ensure_editable(sheet: &Sheet) -> Result<()> {
    if !sheet.status.is_editable() {
        return Err(GkError::SheetLocked {
            sheet: sheet.id.clone(),
            status: sheet.status,
        });
    }
    Ok(())
}

/// Move a sheet along one edge of the transition table, stamping the
/// submission and approval times
pub fn transition(sheet: &mut Sheet, to: SheetStatus, at: DateTime<Utc>) -> Result<()> {
    if !sheet.status.can_transition_to(to) {
        return Err(GkError::InvalidTransition {
            from: sheet.status,
            to,
        });
    }

    match to {
        SheetStatus::Submitted => sheet.submitted_at = Some(at),
        SheetStatus::Approved => sheet.approved_at = Some(at),
        SheetStatus::Draft | SheetStatus::Rejected => {}
    }
    sheet.status = to;
    Ok(())
}

/// `submitted_at` is set iff the sheet has left draft;
/// `approved_at` is set iff the sheet is approved.
pub fn timestamps_consistent(sheet: &Sheet) -> bool {
    let left_draft = sheet.status != SheetStatus::Draft;
    let approved = sheet.status == SheetStatus::Approved;
    sheet.submitted_at.is_some() == left_draft && sheet.approved_at.is_some() == approved
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::{EntityId, EntityPrefix};
    use chrono::NaiveDate;

    fn draft_sheet() -> Sheet {
        Sheet {
            id: EntityId::new(EntityPrefix::Sht),
            project_id: EntityId::new(EntityPrefix::Prj),
            number: 1,
            period_from: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            period_to: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            status: SheetStatus::Draft,
            note: String::new(),
            created_by: "jsmith".to_string(),
            created_at: Utc::now(),
            submitted_at: None,
            approved_at: None,
        }
    }

    #[test]
    fn test_valid_transitions() {
        assert!(SheetStatus::Draft.can_transition_to(SheetStatus::Submitted));
        assert!(SheetStatus::Submitted.can_transition_to(SheetStatus::Approved));
        assert!(SheetStatus::Submitted.can_transition_to(SheetStatus::Rejected));
        assert!(SheetStatus::Rejected.can_transition_to(SheetStatus::Submitted));

        assert!(!SheetStatus::Draft.can_transition_to(SheetStatus::Approved));
        assert!(!SheetStatus::Rejected.can_transition_to(SheetStatus::Draft));
        assert!(!SheetStatus::Submitted.can_transition_to(SheetStatus::Draft));
        for to in SheetStatus::all() {
            assert!(!SheetStatus::Approved.can_transition_to(*to));
        }
    }

    #[test]
    fn test_allowed_transitions() {
        assert_eq!(
            SheetStatus::Draft.allowed_transitions(),
            vec![SheetStatus::Submitted]
        );
        assert_eq!(
            SheetStatus::Submitted.allowed_transitions(),
            vec![SheetStatus::Approved, SheetStatus::Rejected]
        );
        assert_eq!(
            SheetStatus::Rejected.allowed_transitions(),
            vec![SheetStatus::Submitted]
        );
        assert!(SheetStatus::Approved.is_terminal());
        assert!(!SheetStatus::Draft.is_terminal());
    }

    #[test]
    fn test_editable_states() {
        assert!(SheetStatus::Draft.is_editable());
        assert!(SheetStatus::Rejected.is_editable());
        assert!(!SheetStatus::Submitted.is_editable());
        assert!(!SheetStatus::Approved.is_editable());
    }

    #[test]
    fn test_ensure_initial() {
        assert!(ensure_initial(SheetStatus::Draft).is_ok());
        for status in [SheetStatus::Submitted, SheetStatus::Approved, SheetStatus::Rejected] {
            let err = ensure_initial(status).unwrap_err();
            assert!(matches!(err, GkError::InvalidInitialStatus(s) if s == status));
        }
    }

    #[test]
    fn test_transition_stamps_timestamps() {
        let mut sheet = draft_sheet();
        assert!(timestamps_consistent(&sheet));

        let t1 = Utc::now();
        transition(&mut sheet, SheetStatus::Submitted, t1).unwrap();
        assert_eq!(sheet.submitted_at, Some(t1));
        assert!(timestamps_consistent(&sheet));

        transition(&mut sheet, SheetStatus::Rejected, Utc::now()).unwrap();
        assert!(sheet.status.is_editable());
        assert!(sheet.approved_at.is_none());
        assert!(timestamps_consistent(&sheet));

        let t2 = Utc::now();
        transition(&mut sheet, SheetStatus::Submitted, t2).unwrap();
        transition(&mut sheet, SheetStatus::Approved, t2).unwrap();
        assert_eq!(sheet.approved_at, Some(t2));
        assert!(timestamps_consistent(&sheet));
        assert!(ensure_editable(&sheet).is_err());
    }

    #[test]
    fn test_invalid_transition_leaves_sheet_untouched() {
        let mut sheet = draft_sheet();
        let err = transition(&mut sheet, SheetStatus::Approved, Utc::now()).unwrap_err();
        assert!(matches!(
            err,
            GkError::InvalidTransition {
                from: SheetStatus::Draft,
                to: SheetStatus::Approved
            }
        ));
        assert_eq!(sheet.status, SheetStatus::Draft);
        assert!(sheet.approved_at.is_none());
    }
}
