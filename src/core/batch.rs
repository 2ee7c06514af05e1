//! Batch entry editor
//!
//! Computes the diff between a sheet's stored entries and the desired set
//! submitted by the user. The desired set replaces the stored one: items
//! left out are deleted, new ones inserted, changed ones updated.
//!
//! Planning is pure. Executing the plan atomically is the store's job.

use std::collections::{HashMap, HashSet};

use crate::core::error::{GkError, Result, ValidationError};
use crate::core::identity::EntityId;
use crate::core::quantity::Quantity;
use crate::core::workflow;
use crate::entities::{Entry, EntryInput, Sheet};

/// Changes needed to turn the stored entries into the desired set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchPlan {
    pub sheet_id: EntityId,
    pub inserts: Vec<Entry>,
    pub updates: Vec<Entry>,
    /// BoQ item ids whose entries are removed
    pub deletes: Vec<EntityId>,
    pub unchanged: usize,
}

impl BatchPlan {
    pub fn is_noop(&self) -> bool {
        self.inserts.is_empty() && self.updates.is_empty() && self.deletes.is_empty()
    }

    pub fn change_count(&self) -> usize {
        self.inserts.len() + self.updates.len() + self.deletes.len()
    }
}

/// Plan a batch edit of `sheet`
///
/// `scope` holds the ids of every BoQ item in the sheet's project. An
/// item outside it, including one that does not exist at all, is a
/// [`ValidationError::ForeignScopeViolation`].
///
/// The sheet's status is checked first; a locked sheet fails with
/// [`GkError::SheetLocked`] before any row is looked at. Row validation
/// then collects every problem and reports them together, rows numbered
/// from 1. A repeated item is reported once as
/// [`ValidationError::DuplicateEntry`]; the repeat's quantity and scope
/// are not checked.
pub fn plan_batch(
    sheet: &Sheet,
    current: &[Entry],
    scope: &HashSet<EntityId>,
    desired: &[EntryInput],
) -> Result<BatchPlan> {
    workflow::ensure_editable(sheet)?;

    let mut errors = Vec::new();
    let mut seen = HashSet::new();
    let mut wanted: Vec<Entry> = Vec::with_capacity(desired.len());

    for (index, input) in desired.iter().enumerate() {
        let row = index + 1;

        if !seen.insert(&input.boq_item) {
            errors.push(ValidationError::DuplicateEntry {
                row,
                boq_item: input.boq_item.clone(),
            });
            continue;
        }

        if !scope.contains(&input.boq_item) {
            errors.push(ValidationError::ForeignScopeViolation {
                row,
                boq_item: input.boq_item.clone(),
            });
        }

        match Quantity::parse(&input.quantity) {
            Ok(quantity) => wanted.push(Entry {
                sheet_id: sheet.id.clone(),
                boq_item_id: input.boq_item.clone(),
                quantity,
                note: input.note.trim().to_string(),
            }),
            Err(reason) => errors.push(ValidationError::InvalidQuantity { row, reason }),
        }
    }

    if !errors.is_empty() {
        return Err(GkError::Validation { errors });
    }

    let stored: HashMap<&EntityId, &Entry> =
        current.iter().map(|e| (&e.boq_item_id, e)).collect();

    let mut plan = BatchPlan {
        sheet_id: sheet.id.clone(),
        inserts: Vec::new(),
        updates: Vec::new(),
        deletes: Vec::new(),
        unchanged: 0,
    };

    for entry in wanted {
        match stored.get(&entry.boq_item_id) {
            None => plan.inserts.push(entry),
            Some(existing) if existing.differs_from(&entry) => plan.updates.push(entry),
            Some(_) => plan.unchanged += 1,
        }
    }

    plan.deletes = current
        .iter()
        .filter(|e| !seen.contains(&e.boq_item_id))
        .map(|e| e.boq_item_id.clone())
        .collect();

    tracing::debug!(
        sheet = %sheet.id,
        inserts = plan.inserts.len(),
        updates = plan.updates.len(),
        deletes = plan.deletes.len(),
        unchanged = plan.unchanged,
        "planned batch"
    );

    Ok(plan)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::identity::EntityPrefix;
    use crate::core::workflow::SheetStatus;
    use chrono::{NaiveDate, Utc};

    fn sheet(status: SheetStatus) -> Sheet {
        Sheet {
            id: EntityId::new(EntityPrefix::Sht),
            project_id: EntityId::new(EntityPrefix::Prj),
            number: 1,
            period_from: NaiveDate::from_ymd_opt(2024, 3, 1).unwrap(),
            period_to: NaiveDate::from_ymd_opt(2024, 3, 31).unwrap(),
            status,
            note: String::new(),
            created_by: "jsmith".to_string(),
            created_at: Utc::now(),
            submitted_at: (status != SheetStatus::Draft).then(Utc::now),
            approved_at: None,
        }
    }

    fn items(n: usize) -> Vec<EntityId> {
        (0..n).map(|_| EntityId::new(EntityPrefix::Boq)).collect()
    }

    fn entry(sheet: &Sheet, item: &EntityId, qty: &str) -> Entry {
        Entry {
            sheet_id: sheet.id.clone(),
            boq_item_id: item.clone(),
            quantity: Quantity::parse(qty).unwrap(),
            note: String::new(),
        }
    }

    #[test]
    fn test_replace_set_diff() {
        let s = sheet(SheetStatus::Draft);
        let ids = items(3);
        let scope: HashSet<_> = ids.iter().cloned().collect();
        let current = vec![entry(&s, &ids[0], "5"), entry(&s, &ids[1], "1")];

        let desired = vec![
            EntryInput::new(&ids[0], "7.25"),
            EntryInput::new(&ids[1], "1.000"),
            EntryInput::new(&ids[2], "0"),
        ];
        let plan = plan_batch(&s, &current, &scope, &desired).unwrap();

        assert_eq!(plan.inserts.len(), 1);
        assert_eq!(plan.inserts[0].boq_item_id, ids[2]);
        assert!(plan.inserts[0].quantity.is_zero());
        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].quantity.to_string(), "7.250");
        assert_eq!(plan.unchanged, 1);
        assert!(plan.deletes.is_empty());
    }

    #[test]
    fn test_omitted_items_are_deleted() {
        let s = sheet(SheetStatus::Rejected);
        let ids = items(2);
        let scope: HashSet<_> = ids.iter().cloned().collect();
        let current = vec![entry(&s, &ids[0], "5"), entry(&s, &ids[1], "1")];

        let plan = plan_batch(&s, &current, &scope, &[]).unwrap();
        assert_eq!(plan.deletes.len(), 2);
        assert_eq!(plan.change_count(), 2);
    }

    #[test]
    fn test_note_change_is_an_update() {
        let s = sheet(SheetStatus::Draft);
        let ids = items(1);
        let scope: HashSet<_> = ids.iter().cloned().collect();
        let current = vec![entry(&s, &ids[0], "5")];

        let desired = vec![EntryInput::new(&ids[0], "5.000").with_note("  north wing ")];
        let plan = plan_batch(&s, &current, &scope, &desired).unwrap();
        assert_eq!(plan.updates.len(), 1);
        assert_eq!(plan.updates[0].note, "north wing");
    }

    #[test]
    fn test_same_set_is_noop() {
        let s = sheet(SheetStatus::Draft);
        let ids = items(2);
        let scope: HashSet<_> = ids.iter().cloned().collect();
        let current = vec![entry(&s, &ids[0], "12.5"), entry(&s, &ids[1], "0")];
        let desired = vec![EntryInput::new(&ids[1], "0"), EntryInput::new(&ids[0], "12.500")];

        let plan = plan_batch(&s, &current, &scope, &desired).unwrap();
        assert!(plan.is_noop());
        assert_eq!(plan.unchanged, 2);
    }

    #[test]
    fn test_all_row_errors_reported_together() {
        let s = sheet(SheetStatus::Draft);
        let ids = items(2);
        let scope: HashSet<_> = ids.iter().cloned().collect();
        let stranger = EntityId::new(EntityPrefix::Boq);

        let desired = vec![
            EntryInput::new(&ids[0], "1"),
            EntryInput::new(&ids[0], "2"),
            EntryInput::new(&stranger, "3"),
            EntryInput::new(&ids[1], "-4"),
            EntryInput::new(&ids[1], "1"),
        ];
        let err = plan_batch(&s, &[], &scope, &desired).unwrap_err();
        let errors = err.validation_errors();
        assert_eq!(errors.len(), 4);
        assert!(matches!(errors[0], ValidationError::DuplicateEntry { row: 2, .. }));
        assert!(matches!(errors[1], ValidationError::ForeignScopeViolation { row: 3, .. }));
        assert!(matches!(errors[2], ValidationError::InvalidQuantity { row: 4, .. }));
        assert!(matches!(errors[3], ValidationError::DuplicateEntry { row: 5, .. }));
    }

    #[test]
    fn test_repeated_row_reports_only_duplicate() {
        let s = sheet(SheetStatus::Draft);
        let ids = items(1);
        let scope: HashSet<_> = ids.iter().cloned().collect();
        let desired = vec![
            EntryInput::new(&ids[0], "1"),
            EntryInput::new(&ids[0], "not a number"),
        ];
        let err = plan_batch(&s, &[], &scope, &desired).unwrap_err();
        let errors = err.validation_errors();
        assert_eq!(errors.len(), 1);
        assert!(matches!(errors[0], ValidationError::DuplicateEntry { row: 2, .. }));
    }

    #[test]
    fn test_too_precise_quantity_rejected() {
        let s = sheet(SheetStatus::Draft);
        let ids = items(1);
        let scope: HashSet<_> = ids.iter().cloned().collect();
        let err = plan_batch(&s, &[], &scope, &[EntryInput::new(&ids[0], "1.2345")]).unwrap_err();
        assert_eq!(err.validation_errors()[0].field(), "quantity");
    }

    #[test]
    fn test_locked_sheet_checked_before_rows() {
        let ids = items(1);
        let scope: HashSet<_> = ids.iter().cloned().collect();
        for status in [SheetStatus::Submitted, SheetStatus::Approved] {
            let s = sheet(status);
            let bad = vec![EntryInput::new(&ids[0], "garbage")];
            let err = plan_batch(&s, &[], &scope, &bad).unwrap_err();
            assert!(matches!(err, GkError::SheetLocked { .. }));
        }
    }
}
