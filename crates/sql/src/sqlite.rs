//! Default `SQLite` executor.
//!
//! This is a lightweight implementation for development and test use. A single
//! connection is shared behind a mutex; there is no pooling.

#![allow(clippy::significant_drop_tightening)]

use std::sync::Arc;

use anyhow::{Context, Result};
use fromenv::FromEnv;
use rusqlite::Connection;
use rusqlite::types::ValueRef;
use tracing::instrument;

use crate::traits::{Backend, Executor};
use crate::types::{DataType, Field, Row};

/// Options used to open the `SQLite` database.
///
/// Loaded from environment variables by [`Backend::connect`].
#[derive(Debug, Clone, FromEnv)]
pub struct ConnectOptions {
    /// Database path, or `:memory:` for a private in-memory database.
    #[env(from = "SQL_DATABASE", default = ":memory:")]
    pub database: String,
}

impl crate::FromEnv for ConnectOptions {
    fn from_env() -> Result<Self> {
        Self::from_env().finalize().context("issue loading connection options")
    }
}

/// [`Executor`] backed by a single `SQLite` connection.
#[derive(Debug, Clone)]
pub struct SqliteExecutor {
    // rusqlite::Connection isn't `Sync`
    conn: Arc<parking_lot::Mutex<Connection>>,
}

impl Backend for SqliteExecutor {
    type ConnectOptions = ConnectOptions;

    #[instrument]
    fn connect_with(options: Self::ConnectOptions) -> Result<Self> {
        tracing::debug!("opening SQLite database: {}", options.database);

        let conn = Connection::open(&options.database).context("failed to open SQLite database")?;
        Ok(Self {
            conn: Arc::new(parking_lot::Mutex::new(conn)),
        })
    }
}

impl Executor for SqliteExecutor {
    fn query(&self, sql: &str) -> Result<Vec<Row>> {
        tracing::debug!(sql = %sql, "executing query");

        let conn = self.conn.lock();
        let mut stmt = conn.prepare(sql).context("failed to prepare statement")?;
        let column_names: Vec<String> =
            stmt.column_names().iter().map(ToString::to_string).collect();

        let mut rows = stmt.query([]).context("failed to execute query")?;
        let mut result = Vec::new();

        while let Some(row) = rows.next().context("failed to fetch row")? {
            let mut fields = Vec::with_capacity(column_names.len());
            for (i, name) in column_names.iter().enumerate() {
                let value = row.get_ref(i).context("failed to get column value")?;
                fields.push(Field {
                    name: name.clone(),
                    value: into_datatype(value)?,
                });
            }
            result.push(Row { fields });
        }

        Ok(result)
    }

    fn execute(&self, sql: &str) -> Result<()> {
        tracing::debug!(sql = %sql, "executing statement batch");
        self.conn.lock().execute_batch(sql).context("failed to execute statement batch")
    }
}

fn into_datatype(value: ValueRef) -> Result<DataType> {
    match value {
        ValueRef::Null => Ok(DataType::Str(None)),
        ValueRef::Integer(i) => Ok(DataType::Int64(Some(i))),
        ValueRef::Real(f) => Ok(DataType::Double(Some(f))),
        ValueRef::Text(t) => {
            let s = std::str::from_utf8(t).context("invalid UTF-8 in text value")?;
            Ok(DataType::Str(Some(s.to_string())))
        }
        ValueRef::Blob(b) => Ok(DataType::Binary(Some(b.to_vec()))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn memory() -> SqliteExecutor {
        SqliteExecutor::connect_with(ConnectOptions {
            database: ":memory:".to_string(),
        })
        .expect("connect")
    }

    #[test]
    fn batch_then_query() {
        let executor = memory();

        executor
            .execute(
                "CREATE TABLE users (id INTEGER PRIMARY KEY, name TEXT, age INTEGER); \
                 INSERT INTO users (name, age) VALUES ('Alice', 30); \
                 INSERT INTO users (name, age) VALUES ('Bob', NULL)",
            )
            .expect("batch");

        let rows = executor.query("SELECT id, name, age FROM users ORDER BY name").expect("query");
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("name"), Some(&DataType::Str(Some("Alice".to_string()))));
        assert_eq!(rows[0].get("age"), Some(&DataType::Int64(Some(30))));
        assert!(rows[1].get("age").is_some_and(DataType::is_null));
    }

    #[test]
    fn returning_clause_yields_key() {
        let executor = memory();
        executor.execute("CREATE TABLE tags (id INTEGER PRIMARY KEY, label TEXT)").expect("create");

        let rows = executor
            .query("INSERT INTO tags (label) VALUES ('rust') RETURNING id")
            .expect("insert");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("id"), Some(&DataType::Int64(Some(1))));
    }

    #[test]
    fn failures_are_errors_not_empty_results() {
        let executor = memory();

        let err = executor.query("SELECT * FROM missing").expect_err("no such table");
        assert!(err.to_string().contains("prepare"));

        executor.execute("DELETE FROM missing").expect_err("no such table");
    }
}
