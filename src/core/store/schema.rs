//! Database schema initialization

use rusqlite::params;

use super::{Store, SCHEMA_VERSION};
use crate::core::error::Result;

impl Store {
    /// Create every table on a fresh database
    pub(super) fn init_schema(&mut self) -> Result<()> {
        let tx = self.begin()?;
        tx.execute_batch(
            r#"
            -- Schema version tracking
            CREATE TABLE schema_version (
                version INTEGER PRIMARY KEY
            );

            -- Identity store
            CREATE TABLE roles (
                name TEXT PRIMARY KEY
            );

            CREATE TABLE users (
                username TEXT PRIMARY KEY,
                name TEXT NOT NULL,
                email TEXT NOT NULL DEFAULT '',
                role TEXT NOT NULL REFERENCES roles(name),
                active INTEGER NOT NULL DEFAULT 1
            );

            -- Contract scope
            CREATE TABLE projects (
                id TEXT PRIMARY KEY,
                code TEXT NOT NULL UNIQUE,
                name TEXT NOT NULL,
                description TEXT NOT NULL DEFAULT '',
                created TEXT NOT NULL
            );

            -- Bill of quantities; decimals are canonical text
            CREATE TABLE boq_items (
                id TEXT PRIMARY KEY,
                project_id TEXT NOT NULL REFERENCES projects(id),
                code TEXT NOT NULL,
                title TEXT NOT NULL,
                uom TEXT NOT NULL,
                contracted_quantity TEXT NOT NULL,
                unit_price TEXT NOT NULL,
                UNIQUE (project_id, code)
            );

            -- Construction book sheets
            CREATE TABLE sheets (
                id TEXT PRIMARY KEY,
                project_id TEXT NOT NULL REFERENCES projects(id),
                number INTEGER NOT NULL CHECK (number >= 1),
                period_from TEXT NOT NULL,
                period_to TEXT NOT NULL,
                status TEXT NOT NULL
                    CHECK (status IN ('draft', 'submitted', 'approved', 'rejected')),
                note TEXT NOT NULL DEFAULT '',
                created_by TEXT NOT NULL,
                created_at TEXT NOT NULL,
                submitted_at TEXT,
                approved_at TEXT,
                UNIQUE (project_id, number),
                CHECK (period_from <= period_to)
            );
            CREATE INDEX idx_sheets_period ON sheets(project_id, period_from);

            -- Sheet lines, one per BoQ item
            CREATE TABLE entries (
                sheet_id TEXT NOT NULL REFERENCES sheets(id) ON DELETE CASCADE,
                boq_item_id TEXT NOT NULL REFERENCES boq_items(id) ON DELETE RESTRICT,
                quantity TEXT NOT NULL,
                note TEXT NOT NULL DEFAULT '',
                PRIMARY KEY (sheet_id, boq_item_id)
            );
            CREATE INDEX idx_entries_boq_item ON entries(boq_item_id);
            "#,
        )?;
        tx.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            params![SCHEMA_VERSION],
        )?;
        tx.commit()?;

        tracing::debug!(version = SCHEMA_VERSION, "initialized database schema");
        Ok(())
    }
}
