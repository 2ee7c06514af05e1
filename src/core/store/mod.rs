//! SQLite-backed store for projects, BoQ items, sheets and entries
//!
//! The store is the single source of truth. It enforces the relational
//! invariants (unique sheet numbers and BoQ codes per project, entries
//! scoped to their sheet) and runs every multi-row write in an
//! `IMMEDIATE` transaction so the database write lock is held from the
//! first read to the commit.
//!
//! Reads are free functions over `&Connection` so they work the same on
//! the bare connection and inside a [`Transaction`].

mod queries;
mod schema;
mod writes;

pub use queries::*;
pub use writes::{insert_boq_item, update_boq_item};

use std::path::Path;
use std::time::Duration;

use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{ffi, Connection, OptionalExtension, Transaction, TransactionBehavior};

use crate::core::error::{GkError, Result, ValidationError};
use crate::core::identity::EntityId;
use crate::core::team::Role;
use crate::core::workflow::SheetStatus;

/// Current schema version. A database written with any other version is
/// refused; there are no migrations.
pub const SCHEMA_VERSION: i32 = 1;

/// How long a writer waits for a competing write lock
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Handle to the book database
pub struct Store {
    conn: Connection,
}

impl Store {
    /// Open (creating if needed) the database at `path`
    pub fn open(path: &Path) -> Result<Self> {
        let conn = Connection::open(path)?;
        // WAL lets readers proceed while a batch edit holds the write lock
        conn.execute_batch("PRAGMA journal_mode=WAL;")?;
        Self::prepare(conn)
    }

    /// Open a private in-memory database
    pub fn open_in_memory() -> Result<Self> {
        Self::prepare(Connection::open_in_memory()?)
    }

    fn prepare(conn: Connection) -> Result<Self> {
        conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        conn.busy_timeout(BUSY_TIMEOUT)?;

        let mut store = Self { conn };
        match store.schema_version()? {
            None => store.init_schema()?,
            Some(found) if found != SCHEMA_VERSION => {
                return Err(GkError::SchemaMismatch {
                    found,
                    expected: SCHEMA_VERSION,
                })
            }
            Some(_) => {}
        }
        Ok(store)
    }

    /// Version recorded in the database, or `None` for a fresh file
    fn schema_version(&self) -> Result<Option<i32>> {
        let has_table: bool = self.conn.query_row(
            "SELECT EXISTS (SELECT 1 FROM sqlite_master WHERE type = 'table' AND name = 'schema_version')",
            [],
            |row| row.get(0),
        )?;
        if !has_table {
            return Ok(None);
        }
        let version = self
            .conn
            .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(Some(version.unwrap_or(0)))
    }

    /// Read-only access for queries
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Start a write transaction that takes the database lock immediately
    pub fn begin(&mut self) -> Result<Transaction<'_>> {
        Ok(self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?)
    }
}

/// Map a UNIQUE / PRIMARY KEY failure to a field-level validation error
pub(crate) fn unique_violation(err: rusqlite::Error, field: &'static str, value: &str) -> GkError {
    if let rusqlite::Error::SqliteFailure(e, _) = &err {
        if e.extended_code == ffi::SQLITE_CONSTRAINT_UNIQUE
            || e.extended_code == ffi::SQLITE_CONSTRAINT_PRIMARYKEY
        {
            return GkError::invalid(ValidationError::UniquenessViolation {
                field,
                value: value.to_string(),
            });
        }
    }
    GkError::Storage(err)
}

// =========================================================================
// Column conversions
// =========================================================================

impl ToSql for EntityId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.to_string()))
    }
}

impl FromSql for EntityId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e| FromSqlError::Other(Box::new(e)))
    }
}

impl ToSql for SheetStatus {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for SheetStatus {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}

impl ToSql for Role {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for Role {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value
            .as_str()?
            .parse()
            .map_err(|e: String| FromSqlError::Other(e.into()))
    }
}
