//! Read queries
//!
//! Every query takes a `&Connection` so it can run inside a write
//! transaction as well as on its own.

use std::collections::{HashMap, HashSet};

use rusqlite::{params, Connection, OptionalExtension, Row};
use rust_decimal::Decimal;

use crate::core::error::Result;
use crate::core::identity::EntityId;
use crate::core::quantity::{amount, Price, Quantity};
use crate::core::team::{normalize_username, Actor, Role};
use crate::entities::{BoqItem, Entry, EntryLine, Project, Sheet, SheetFilter, SheetSummary};

const SHEET_COLUMNS: &str = "id, project_id, number, period_from, period_to, status, note, \
     created_by, created_at, submitted_at, approved_at";

const BOQ_COLUMNS: &str = "id, project_id, code, title, uom, contracted_quantity, unit_price";

// =========================================================================
// Row mapping
// =========================================================================

fn actor_from_row(row: &Row<'_>) -> rusqlite::Result<Actor> {
    Ok(Actor {
        username: row.get(0)?,
        name: row.get(1)?,
        email: row.get(2)?,
        role: row.get(3)?,
        active: row.get(4)?,
    })
}

fn project_from_row(row: &Row<'_>) -> rusqlite::Result<Project> {
    Ok(Project {
        id: row.get(0)?,
        code: row.get(1)?,
        name: row.get(2)?,
        description: row.get(3)?,
        created: row.get(4)?,
    })
}

fn boq_item_from_row(row: &Row<'_>) -> rusqlite::Result<BoqItem> {
    Ok(BoqItem {
        id: row.get(0)?,
        project_id: row.get(1)?,
        code: row.get(2)?,
        title: row.get(3)?,
        uom: row.get(4)?,
        contracted_quantity: row.get(5)?,
        unit_price: row.get(6)?,
    })
}

fn sheet_from_row(row: &Row<'_>) -> rusqlite::Result<Sheet> {
    Ok(Sheet {
        id: row.get(0)?,
        project_id: row.get(1)?,
        number: row.get(2)?,
        period_from: row.get(3)?,
        period_to: row.get(4)?,
        status: row.get(5)?,
        note: row.get(6)?,
        created_by: row.get(7)?,
        created_at: row.get(8)?,
        submitted_at: row.get(9)?,
        approved_at: row.get(10)?,
    })
}

// =========================================================================
// Identity
// =========================================================================

/// Role names present in the identity store
pub fn list_roles(conn: &Connection) -> Result<Vec<Role>> {
    let mut stmt = conn.prepare("SELECT name FROM roles ORDER BY name")?;
    let roles = stmt
        .query_map([], |row| row.get(0))?
        .collect::<rusqlite::Result<Vec<Role>>>()?;
    Ok(roles)
}

/// Resolve an active user; inactive and unknown users both yield `None`
pub fn find_actor(conn: &Connection, username: &str) -> Result<Option<Actor>> {
    let actor = conn
        .query_row(
            "SELECT username, name, email, role, active FROM users
             WHERE username = ?1 AND active = 1",
            params![normalize_username(username)],
            actor_from_row,
        )
        .optional()?;
    Ok(actor)
}

/// Users ordered by username, optionally restricted to one role
pub fn list_users(conn: &Connection, role: Option<Role>) -> Result<Vec<Actor>> {
    let mut stmt = conn.prepare(
        "SELECT username, name, email, role, active FROM users
         WHERE ?1 IS NULL OR role = ?1
         ORDER BY username",
    )?;
    let users = stmt
        .query_map(params![role], actor_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(users)
}

// =========================================================================
// Projects
// =========================================================================

pub fn list_projects(conn: &Connection) -> Result<Vec<Project>> {
    let mut stmt =
        conn.prepare("SELECT id, code, name, description, created FROM projects ORDER BY code")?;
    let projects = stmt
        .query_map([], project_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(projects)
}

pub fn project_by_code(conn: &Connection, code: &str) -> Result<Option<Project>> {
    let project = conn
        .query_row(
            "SELECT id, code, name, description, created FROM projects WHERE code = ?1",
            params![code.trim()],
            project_from_row,
        )
        .optional()?;
    Ok(project)
}

/// The earliest-created project
pub fn first_project(conn: &Connection) -> Result<Option<Project>> {
    let project = conn
        .query_row(
            "SELECT id, code, name, description, created FROM projects
             ORDER BY created, code LIMIT 1",
            [],
            project_from_row,
        )
        .optional()?;
    Ok(project)
}

// =========================================================================
// BoQ items
// =========================================================================

/// A project's BoQ ordered by code
pub fn list_boq_items(conn: &Connection, project_id: &EntityId) -> Result<Vec<BoqItem>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM boq_items WHERE project_id = ?1 ORDER BY code",
        BOQ_COLUMNS
    ))?;
    let items = stmt
        .query_map(params![project_id], boq_item_from_row)?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(items)
}

pub fn boq_item_by_id(conn: &Connection, id: &EntityId) -> Result<Option<BoqItem>> {
    let item = conn
        .query_row(
            &format!("SELECT {} FROM boq_items WHERE id = ?1", BOQ_COLUMNS),
            params![id],
            boq_item_from_row,
        )
        .optional()?;
    Ok(item)
}

pub fn boq_item_by_code(
    conn: &Connection,
    project_id: &EntityId,
    code: &str,
) -> Result<Option<BoqItem>> {
    let item = conn
        .query_row(
            &format!(
                "SELECT {} FROM boq_items WHERE project_id = ?1 AND code = ?2",
                BOQ_COLUMNS
            ),
            params![project_id, code.trim()],
            boq_item_from_row,
        )
        .optional()?;
    Ok(item)
}

/// Ids of every BoQ item in a project
pub fn boq_scope(conn: &Connection, project_id: &EntityId) -> Result<HashSet<EntityId>> {
    let mut stmt = conn.prepare("SELECT id FROM boq_items WHERE project_id = ?1")?;
    let ids = stmt
        .query_map(params![project_id], |row| row.get(0))?
        .collect::<rusqlite::Result<HashSet<EntityId>>>()?;
    Ok(ids)
}

/// Number of sheet entries referencing a BoQ item
pub fn entries_referencing(conn: &Connection, boq_item_id: &EntityId) -> Result<usize> {
    let count: i64 = conn.query_row(
        "SELECT COUNT(*) FROM entries WHERE boq_item_id = ?1",
        params![boq_item_id],
        |row| row.get(0),
    )?;
    Ok(count as usize)
}

// =========================================================================
// Sheets and entries
// =========================================================================

pub fn get_sheet(conn: &Connection, id: &EntityId) -> Result<Option<Sheet>> {
    let sheet = conn
        .query_row(
            &format!("SELECT {} FROM sheets WHERE id = ?1", SHEET_COLUMNS),
            params![id],
            sheet_from_row,
        )
        .optional()?;
    Ok(sheet)
}

pub fn sheet_by_number(
    conn: &Connection,
    project_id: &EntityId,
    number: u32,
) -> Result<Option<Sheet>> {
    let sheet = conn
        .query_row(
            &format!(
                "SELECT {} FROM sheets WHERE project_id = ?1 AND number = ?2",
                SHEET_COLUMNS
            ),
            params![project_id, number],
            sheet_from_row,
        )
        .optional()?;
    Ok(sheet)
}

/// Sheet summaries, newest period first
pub fn list_sheets(
    conn: &Connection,
    project_id: &EntityId,
    filter: &SheetFilter,
) -> Result<Vec<SheetSummary>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM sheets s
         WHERE s.project_id = ?1
           AND (?2 IS NULL OR s.status = ?2)
           AND (?3 IS NULL OR EXISTS (
                SELECT 1 FROM entries x WHERE x.sheet_id = s.id AND x.boq_item_id = ?3))
         ORDER BY s.period_from DESC, s.number DESC",
        SHEET_COLUMNS
    ))?;
    let sheets = stmt
        .query_map(
            params![project_id, filter.status, filter.boq_item],
            sheet_from_row,
        )?
        .collect::<rusqlite::Result<Vec<_>>>()?;

    let totals = sheet_totals(conn, project_id)?;
    Ok(sheets
        .into_iter()
        .map(|s| {
            let (entry_count, total) = totals
                .get(&s.id)
                .copied()
                .unwrap_or((0, Decimal::ZERO));
            SheetSummary {
                id: s.id,
                number: s.number,
                period_from: s.period_from,
                period_to: s.period_to,
                status: s.status,
                created_by: s.created_by,
                entry_count,
                total,
            }
        })
        .collect())
}

/// Entry count and value per sheet of a project
fn sheet_totals(
    conn: &Connection,
    project_id: &EntityId,
) -> Result<HashMap<EntityId, (usize, Decimal)>> {
    let mut stmt = conn.prepare(
        "SELECT e.sheet_id, e.quantity, b.unit_price
         FROM entries e
         JOIN sheets s ON s.id = e.sheet_id
         JOIN boq_items b ON b.id = e.boq_item_id
         WHERE s.project_id = ?1",
    )?;
    let mut rows = stmt.query(params![project_id])?;

    let mut totals: HashMap<EntityId, (usize, Decimal)> = HashMap::new();
    while let Some(row) = rows.next()? {
        let sheet_id: EntityId = row.get(0)?;
        let quantity: Quantity = row.get(1)?;
        let price: Price = row.get(2)?;
        let slot = totals.entry(sheet_id).or_insert((0, Decimal::ZERO));
        slot.0 += 1;
        slot.1 += amount(quantity, price);
    }
    Ok(totals)
}

/// Stored entries of a sheet, unordered
pub fn sheet_entries(conn: &Connection, sheet_id: &EntityId) -> Result<Vec<Entry>> {
    let mut stmt = conn.prepare(
        "SELECT sheet_id, boq_item_id, quantity, note FROM entries WHERE sheet_id = ?1",
    )?;
    let entries = stmt
        .query_map(params![sheet_id], |row| {
            Ok(Entry {
                sheet_id: row.get(0)?,
                boq_item_id: row.get(1)?,
                quantity: row.get(2)?,
                note: row.get(3)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(entries)
}

/// Entries of a sheet joined with their BoQ items, ordered by BoQ code
pub fn entry_lines(conn: &Connection, sheet_id: &EntityId) -> Result<Vec<EntryLine>> {
    let mut stmt = conn.prepare(
        "SELECT e.sheet_id, e.boq_item_id, e.quantity, e.note,
                b.code, b.title, b.uom, b.unit_price
         FROM entries e
         JOIN boq_items b ON b.id = e.boq_item_id
         WHERE e.sheet_id = ?1
         ORDER BY b.code",
    )?;
    let lines = stmt
        .query_map(params![sheet_id], |row| {
            Ok(EntryLine {
                entry: Entry {
                    sheet_id: row.get(0)?,
                    boq_item_id: row.get(1)?,
                    quantity: row.get(2)?,
                    note: row.get(3)?,
                },
                boq_code: row.get(4)?,
                boq_title: row.get(5)?,
                uom: row.get(6)?,
                unit_price: row.get(7)?,
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(lines)
}
