//! SQLite index store.
//!
//! One table, `attr_index`, with the uniqueness the engine relies on
//! enforced by the database:
//!
//! - `UNIQUE (type_key, column_name, value, object_id)`
//! - `UNIQUE (type_key, object_id, column_name)` (one row per column)
//!
//! Each reconciliation runs inside its own transaction with the connection
//! mutex held, so the read of the current value and the write that follows
//! cannot interleave with another writer.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, OptionalExtension, params};

use super::{IndexStore, RowChange};
use crate::model::{IndexRow, ObjectId};
use crate::{Error, Result};

const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS attr_index (
    id          INTEGER PRIMARY KEY,
    type_key    TEXT NOT NULL,
    column_name TEXT NOT NULL,
    value       TEXT NOT NULL,
    object_id   NOT NULL,
    UNIQUE (type_key, column_name, value, object_id)
);
CREATE UNIQUE INDEX IF NOT EXISTS idx_attr_index_object
    ON attr_index (type_key, object_id, column_name);
";

/// SQLite-backed index table.
#[derive(Clone)]
pub struct SqliteIndexStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteIndexStore {
    /// Open (or create) a database file.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Self::with_connection(Connection::open(path)?)
    }

    /// Private in-memory database (for testing).
    pub fn in_memory() -> Result<Self> {
        Self::with_connection(Connection::open_in_memory()?)
    }

    fn with_connection(conn: Connection) -> Result<Self> {
        conn.execute_batch(SCHEMA)?;
        Ok(Self { conn: Arc::new(Mutex::new(conn)) })
    }

    fn reconcile_sync(
        &self,
        type_key: &str,
        object_id: &ObjectId,
        column: &str,
        value: Option<&str>,
    ) -> Result<RowChange> {
        let conn = self.conn.lock();
        let tx = conn.unchecked_transaction()?;

        let previous: Option<String> = tx
            .query_row(
                "SELECT value FROM attr_index
                 WHERE type_key = ?1 AND object_id = ?2 AND column_name = ?3",
                params![type_key, object_id, column],
                |row| row.get(0),
            )
            .optional()?;

        let change = match (previous, value) {
            (None, None) => RowChange::Unchanged,
            (Some(prev), Some(new)) if prev == new => RowChange::Unchanged,
            (None, Some(new)) => {
                tx.execute(
                    "INSERT INTO attr_index (type_key, column_name, value, object_id)
                     VALUES (?1, ?2, ?3, ?4)",
                    params![type_key, column, new, object_id],
                )?;
                RowChange::Inserted
            }
            (Some(prev), Some(new)) => {
                tx.execute(
                    "UPDATE attr_index SET value = ?4
                     WHERE type_key = ?1 AND object_id = ?2 AND column_name = ?3",
                    params![type_key, object_id, column, new],
                )?;
                RowChange::Updated { previous: prev }
            }
            (Some(prev), None) => {
                tx.execute(
                    "DELETE FROM attr_index
                     WHERE type_key = ?1 AND object_id = ?2 AND column_name = ?3",
                    params![type_key, object_id, column],
                )?;
                RowChange::Removed { previous: prev }
            }
        };

        tx.commit()?;
        Ok(change)
    }

    fn delete_object_sync(&self, type_key: &str, object_id: &ObjectId) -> Result<Vec<IndexRow>> {
        let conn = self.conn.lock();
        let tx = conn.unchecked_transaction()?;
        let rows = select_object_rows(&tx, type_key, object_id)?;
        tx.execute(
            "DELETE FROM attr_index WHERE type_key = ?1 AND object_id = ?2",
            params![type_key, object_id],
        )?;
        tx.commit()?;
        Ok(rows)
    }

    fn delete_column_sync(&self, type_key: &str, column: &str) -> Result<Vec<String>> {
        let conn = self.conn.lock();
        let tx = conn.unchecked_transaction()?;
        let values = {
            let mut stmt = tx.prepare(
                "SELECT DISTINCT value FROM attr_index
                 WHERE type_key = ?1 AND column_name = ?2 ORDER BY value",
            )?;
            stmt.query_map(params![type_key, column], |row| row.get::<_, String>(0))?
                .collect::<rusqlite::Result<Vec<_>>>()?
        };
        tx.execute(
            "DELETE FROM attr_index WHERE type_key = ?1 AND column_name = ?2",
            params![type_key, column],
        )?;
        tx.commit()?;
        Ok(values)
    }

    fn object_ids_sync(&self, type_key: &str, column: &str, value: &str) -> Result<Vec<ObjectId>> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare_cached(
            "SELECT object_id FROM attr_index
             WHERE type_key = ?1 AND column_name = ?2 AND value = ?3",
        )?;
        let mut ids = stmt
            .query_map(params![type_key, column, value], |row| row.get::<_, ObjectId>(0))?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        ids.sort();
        Ok(ids)
    }

    fn rows_for_object_sync(&self, type_key: &str, object_id: &ObjectId) -> Result<Vec<IndexRow>> {
        let conn = self.conn.lock();
        select_object_rows(&conn, type_key, object_id)
    }

    fn row_count_sync(&self, type_key: &str) -> Result<u64> {
        let conn = self.conn.lock();
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM attr_index WHERE type_key = ?1",
            params![type_key],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }
}

fn select_object_rows(conn: &Connection, type_key: &str, object_id: &ObjectId) -> Result<Vec<IndexRow>> {
    let mut stmt = conn.prepare_cached(
        "SELECT column_name, value FROM attr_index
         WHERE type_key = ?1 AND object_id = ?2 ORDER BY column_name",
    )?;
    let rows = stmt
        .query_map(params![type_key, object_id], |row| {
            Ok(IndexRow {
                type_key: type_key.to_owned(),
                column: row.get(0)?,
                value: row.get(1)?,
                object_id: object_id.clone(),
            })
        })?
        .collect::<rusqlite::Result<Vec<_>>>()?;
    Ok(rows)
}

// ============================================================================
// IndexStore impl
// ============================================================================

#[async_trait]
impl IndexStore for SqliteIndexStore {
    async fn reconcile_row(
        &self,
        type_key: &str,
        object_id: &ObjectId,
        column: &str,
        value: Option<&str>,
    ) -> Result<RowChange> {
        self.reconcile_sync(type_key, object_id, column, value)
    }

    async fn delete_object_rows(&self, type_key: &str, object_id: &ObjectId) -> Result<Vec<IndexRow>> {
        self.delete_object_sync(type_key, object_id)
    }

    async fn delete_column_rows(&self, type_key: &str, column: &str) -> Result<Vec<String>> {
        self.delete_column_sync(type_key, column)
    }

    async fn object_ids(&self, type_key: &str, column: &str, value: &str) -> Result<Vec<ObjectId>> {
        self.object_ids_sync(type_key, column, value)
    }

    async fn rows_for_object(&self, type_key: &str, object_id: &ObjectId) -> Result<Vec<IndexRow>> {
        self.rows_for_object_sync(type_key, object_id)
    }

    async fn row_count(&self, type_key: &str) -> Result<u64> {
        self.row_count_sync(type_key)
    }
}

// ============================================================================
// ObjectId <-> SQL
// ============================================================================

impl ToSql for ObjectId {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        match self {
            ObjectId::Int(i) => {
                let i = i64::try_from(*i)
                    .map_err(|e| rusqlite::Error::ToSqlConversionFailure(Box::new(e)))?;
                Ok(ToSqlOutput::from(i))
            }
            ObjectId::Str(s) => Ok(ToSqlOutput::from(s.as_str())),
        }
    }
}

impl FromSql for ObjectId {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        match value {
            ValueRef::Integer(i) => u64::try_from(i)
                .map(ObjectId::Int)
                .map_err(|_| FromSqlError::OutOfRange(i)),
            ValueRef::Text(t) => std::str::from_utf8(t)
                .map(|s| ObjectId::Str(s.to_owned()))
                .map_err(|e| FromSqlError::Other(Box::new(e))),
            _ => Err(FromSqlError::InvalidType),
        }
    }
}

impl From<rusqlite::Error> for Error {
    fn from(err: rusqlite::Error) -> Self {
        match err {
            rusqlite::Error::SqliteFailure(code, msg)
                if code.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Error::ConstraintViolation(msg.unwrap_or_else(|| code.to_string()))
            }
            other => Error::Storage(format!("SQLite error: {other}")),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
