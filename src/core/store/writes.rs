//! Write operations
//!
//! Multi-statement writes run inside an `IMMEDIATE` transaction. Sheet
//! state is re-read after the lock is taken, so checks and writes see
//! the same rows.

use rusqlite::{params, Connection};

use super::queries::{
    boq_item_by_id, boq_scope, entries_referencing, entry_lines, get_sheet, sheet_by_number,
    sheet_entries,
};
use super::{unique_violation, Store};
use crate::core::batch::{plan_batch, BatchPlan};
use crate::core::error::{ensure_valid, require_text, GkError, Result, ValidationError};
use crate::core::identity::EntityId;
use crate::core::team::{Actor, Role};
use crate::entities::boq_item::CODE_MAX;
use crate::entities::{BoqItem, EntryInput, EntryLine, Project, Sheet};

/// Longest username or display name
pub const USERNAME_MAX: usize = 150;

impl Store {
    /// Insert any of the four roles that are missing; returns how many
    /// were created
    pub fn ensure_roles(&mut self) -> Result<usize> {
        let tx = self.begin()?;
        let mut created = 0;
        for role in Role::all() {
            created += tx.execute(
                "INSERT OR IGNORE INTO roles (name) VALUES (?1)",
                params![role],
            )?;
        }
        tx.commit()?;

        if created > 0 {
            tracing::info!(created, "bootstrapped roles");
        }
        Ok(created)
    }

    pub fn add_user(&self, actor: &Actor) -> Result<()> {
        let mut errors = Vec::new();
        require_text(&mut errors, "username", &actor.username, USERNAME_MAX);
        require_text(&mut errors, "name", &actor.name, USERNAME_MAX);
        ensure_valid(errors)?;

        let role_known: bool = self.conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM roles WHERE name = ?1)",
            params![actor.role],
            |row| row.get(0),
        )?;
        if !role_known {
            return Err(GkError::not_found("role", actor.role));
        }

        self.conn
            .execute(
                "INSERT INTO users (username, name, email, role, active) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![actor.username, actor.name, actor.email, actor.role, actor.active],
            )
            .map_err(|e| unique_violation(e, "username", &actor.username))?;
        Ok(())
    }

    pub fn insert_project(&self, project: &Project) -> Result<()> {
        self.conn
            .execute(
                "INSERT INTO projects (id, code, name, description, created) VALUES (?1, ?2, ?3, ?4, ?5)",
                params![
                    project.id,
                    project.code,
                    project.name,
                    project.description,
                    project.created
                ],
            )
            .map_err(|e| unique_violation(e, "code", &project.code))?;
        Ok(())
    }

    /// Change a BoQ item's code while nothing references it
    pub fn rename_boq_item(&mut self, id: &EntityId, new_code: &str) -> Result<BoqItem> {
        let mut errors = Vec::new();
        require_text(&mut errors, "code", new_code, CODE_MAX);
        ensure_valid(errors)?;

        let tx = self.begin()?;
        let mut item = boq_item_by_id(&tx, id)?.ok_or_else(|| GkError::not_found("BoQ item", id))?;

        let entries = entries_referencing(&tx, id)?;
        if entries > 0 {
            return Err(GkError::BoqItemLocked {
                code: item.code,
                entries,
            });
        }

        let new_code = new_code.trim();
        tx.execute(
            "UPDATE boq_items SET code = ?2 WHERE id = ?1",
            params![id, new_code],
        )
        .map_err(|e| unique_violation(e, "code", new_code))?;
        tx.commit()?;

        tracing::info!(item = %id, from = %item.code, to = %new_code, "renamed BoQ item");
        item.code = new_code.to_string();
        Ok(item)
    }

    /// Overwrite an item's attributes while nothing references it
    pub fn edit_boq_item(&mut self, item: &BoqItem) -> Result<()> {
        let tx = self.begin()?;
        update_boq_item(&tx, item)?;
        tx.commit()?;
        tracing::info!(item = %item.id, code = %item.code, "updated BoQ item");
        Ok(())
    }

    /// Persist a new sheet
    ///
    /// A taken `(project, number)` fails with a uniqueness violation
    /// before anything is written.
    pub fn insert_sheet(&mut self, sheet: &Sheet) -> Result<()> {
        let tx = self.begin()?;
        let number = sheet.number.to_string();

        if sheet_by_number(&tx, &sheet.project_id, sheet.number)?.is_some() {
            return Err(GkError::invalid(ValidationError::UniquenessViolation {
                field: "number",
                value: number,
            }));
        }

        tx.execute(
            "INSERT INTO sheets (id, project_id, number, period_from, period_to, status, note,
                                 created_by, created_at, submitted_at, approved_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
            params![
                sheet.id,
                sheet.project_id,
                sheet.number,
                sheet.period_from,
                sheet.period_to,
                sheet.status,
                sheet.note,
                sheet.created_by,
                sheet.created_at,
                sheet.submitted_at,
                sheet.approved_at,
            ],
        )
        .map_err(|e| unique_violation(e, "number", &number))?;
        tx.commit()?;
        Ok(())
    }

    /// Replace a sheet's entry set with `desired`, atomically
    ///
    /// `guard` is called with the sheet as re-read under the write lock
    /// and may veto the edit. Nothing is written unless the guard, the
    /// lifecycle check and every row pass. Returns the new entry set
    /// ordered by BoQ code.
    pub fn apply_batch<F>(
        &mut self,
        sheet_id: &EntityId,
        desired: &[EntryInput],
        guard: F,
    ) -> Result<Vec<EntryLine>>
    where
        F: FnOnce(&Sheet) -> Result<()>,
    {
        let tx = self.begin()?;

        let sheet = get_sheet(&tx, sheet_id)?.ok_or_else(|| GkError::not_found("sheet", sheet_id))?;
        guard(&sheet)?;

        let current = sheet_entries(&tx, sheet_id)?;
        let scope = boq_scope(&tx, &sheet.project_id)?;
        let plan = plan_batch(&sheet, &current, &scope, desired)?;

        execute_plan(&tx, &plan)?;
        let lines = entry_lines(&tx, sheet_id)?;
        tx.commit()?;

        tracing::info!(
            sheet = %sheet_id,
            inserted = plan.inserts.len(),
            updated = plan.updates.len(),
            deleted = plan.deletes.len(),
            unchanged = plan.unchanged,
            "applied entry batch"
        );
        Ok(lines)
    }
}

fn execute_plan(conn: &Connection, plan: &BatchPlan) -> Result<()> {
    for boq_item in &plan.deletes {
        conn.execute(
            "DELETE FROM entries WHERE sheet_id = ?1 AND boq_item_id = ?2",
            params![plan.sheet_id, boq_item],
        )?;
    }
    for entry in &plan.updates {
        conn.execute(
            "UPDATE entries SET quantity = ?3, note = ?4 WHERE sheet_id = ?1 AND boq_item_id = ?2",
            params![entry.sheet_id, entry.boq_item_id, entry.quantity, entry.note],
        )?;
    }
    for entry in &plan.inserts {
        conn.execute(
            "INSERT INTO entries (sheet_id, boq_item_id, quantity, note) VALUES (?1, ?2, ?3, ?4)",
            params![entry.sheet_id, entry.boq_item_id, entry.quantity, entry.note],
        )?;
    }
    Ok(())
}

/// Insert a BoQ item; a taken `(project, code)` is a uniqueness violation
pub fn insert_boq_item(conn: &Connection, item: &BoqItem) -> Result<()> {
    conn.execute(
        "INSERT INTO boq_items (id, project_id, code, title, uom, contracted_quantity, unit_price)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
        params![
            item.id,
            item.project_id,
            item.code,
            item.title,
            item.uom,
            item.contracted_quantity,
            item.unit_price
        ],
    )
    .map_err(|e| unique_violation(e, "code", &item.code))?;
    Ok(())
}

/// Overwrite a BoQ item's attributes; referenced items are locked
pub fn update_boq_item(conn: &Connection, item: &BoqItem) -> Result<()> {
    let entries = entries_referencing(conn, &item.id)?;
    if entries > 0 {
        return Err(GkError::BoqItemLocked {
            code: item.code.clone(),
            entries,
        });
    }
    conn.execute(
        "UPDATE boq_items SET title = ?2, uom = ?3, contracted_quantity = ?4, unit_price = ?5
         WHERE id = ?1",
        params![
            item.id,
            item.title,
            item.uom,
            item.contracted_quantity,
            item.unit_price
        ],
    )?;
    Ok(())
}
