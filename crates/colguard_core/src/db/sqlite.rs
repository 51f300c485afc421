//! SQLite-backed connection handle.
//!
//! # Responsibility
//! - Open file or in-memory SQLite connections on first use.
//! - Execute `SelectQuery` plans with bound parameters.
//!
//! # Invariants
//! - `initialize` is idempotent; an open connection is never reopened.
//! - Opened connections have the configured `foreign_keys` and busy timeout.

use crate::db::query::SelectQuery;
use crate::db::{Accessor, ConnectionHandle, Row};
use crate::error::BoxError;
use crate::model::target::Target;
use crate::model::value::FieldValue;
use log::{debug, error, info};
use rusqlite::types::{ToSql, ToSqlOutput, Value, ValueRef};
use rusqlite::{params_from_iter, Connection};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};
use std::path::PathBuf;
use std::sync::{Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

const DEFAULT_BUSY_TIMEOUT_MS: u64 = 5_000;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug)]
pub enum DbError {
    Sqlite(rusqlite::Error),
    NotInitialized,
}

impl Display for DbError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sqlite(err) => write!(f, "{err}"),
            Self::NotInitialized => write!(f, "sqlite connection is not initialized"),
        }
    }
}

impl Error for DbError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Sqlite(err) => Some(err),
            Self::NotInitialized => None,
        }
    }
}

impl From<rusqlite::Error> for DbError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Sqlite(value)
    }
}

/// Settings for lazily opened SQLite connections.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionOptions {
    /// Database file; `None` opens an in-memory database.
    pub path: Option<PathBuf>,
    pub busy_timeout_ms: u64,
    pub foreign_keys: bool,
}

impl Default for ConnectionOptions {
    fn default() -> Self {
        Self {
            path: None,
            busy_timeout_ms: DEFAULT_BUSY_TIMEOUT_MS,
            foreign_keys: true,
        }
    }
}

impl ConnectionOptions {
    pub fn in_memory() -> Self {
        Self::default()
    }

    pub fn file(path: impl Into<PathBuf>) -> Self {
        Self {
            path: Some(path.into()),
            ..Self::default()
        }
    }

    fn mode(&self) -> &'static str {
        if self.path.is_some() {
            "file"
        } else {
            "memory"
        }
    }
}

/// `ConnectionHandle` over one `rusqlite::Connection`.
pub struct SqliteConnection {
    options: ConnectionOptions,
    conn: Mutex<Option<Connection>>,
}

impl SqliteConnection {
    /// Creates a handle that opens its database on `initialize`.
    pub fn lazy(options: ConnectionOptions) -> Self {
        Self {
            options,
            conn: Mutex::new(None),
        }
    }

    /// Wraps an already open connection; the handle is ready immediately.
    pub fn from_connection(conn: Connection) -> Self {
        Self {
            options: ConnectionOptions::default(),
            conn: Mutex::new(Some(conn)),
        }
    }

    /// Runs `f` against the open connection.
    ///
    /// # Errors
    /// - `NotInitialized` before `initialize` succeeded.
    pub fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> DbResult<T> {
        let guard = self.lock();
        let conn = guard.as_ref().ok_or(DbError::NotInitialized)?;
        Ok(f(conn)?)
    }

    fn lock(&self) -> MutexGuard<'_, Option<Connection>> {
        self.conn.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn open(&self) -> DbResult<Connection> {
        let conn = match &self.options.path {
            Some(path) => Connection::open(path)?,
            None => Connection::open_in_memory()?,
        };
        let foreign_keys = if self.options.foreign_keys { "ON" } else { "OFF" };
        conn.execute_batch(&format!("PRAGMA foreign_keys = {foreign_keys};"))?;
        conn.busy_timeout(Duration::from_millis(self.options.busy_timeout_ms))?;
        Ok(conn)
    }
}

impl ConnectionHandle for SqliteConnection {
    fn is_ready(&self) -> bool {
        self.lock().is_some()
    }

    fn initialize(&self) -> Result<(), BoxError> {
        let mut guard = self.lock();
        if guard.is_some() {
            return Ok(());
        }

        let started_at = Instant::now();
        info!(
            "event=db_open module=sqlite status=start mode={}",
            self.options.mode()
        );
        match self.open() {
            Ok(conn) => {
                *guard = Some(conn);
                info!(
                    "event=db_open module=sqlite status=ok mode={} duration_ms={}",
                    self.options.mode(),
                    started_at.elapsed().as_millis()
                );
                Ok(())
            }
            Err(err) => {
                error!(
                    "event=db_open module=sqlite status=error mode={} duration_ms={} error={}",
                    self.options.mode(),
                    started_at.elapsed().as_millis(),
                    err
                );
                Err(Box::new(err))
            }
        }
    }

    fn accessor<'a>(&'a self, target: &Target) -> Result<Box<dyn Accessor + 'a>, BoxError> {
        Ok(Box::new(SqliteAccessor {
            handle: self,
            table: target.table().to_string(),
        }))
    }
}

/// Accessor bound to one table of a `SqliteConnection`.
pub struct SqliteAccessor<'conn> {
    handle: &'conn SqliteConnection,
    table: String,
}

impl Accessor for SqliteAccessor<'_> {
    fn table(&self) -> &str {
        &self.table
    }

    fn fetch_one(&self, query: &SelectQuery) -> Result<Option<Row>, BoxError> {
        let (sql, bind_values) = query.to_sql();
        debug!(
            "event=sqlite_query module=sqlite status=start table={} binds={}",
            query.table(),
            bind_values.len()
        );

        let row = self.handle.with_connection(|conn| {
            let mut stmt = conn.prepare(&sql)?;
            let names: Vec<String> = stmt
                .column_names()
                .into_iter()
                .map(str::to_string)
                .collect();
            let mut rows = stmt.query(params_from_iter(bind_values.iter()))?;
            match rows.next()? {
                Some(raw) => {
                    let mut row = Row::new();
                    for (index, name) in names.iter().enumerate() {
                        row.insert(name.as_str(), value_from_sql(raw.get_ref(index)?));
                    }
                    Ok(Some(row))
                }
                None => Ok(None),
            }
        })?;
        Ok(row)
    }
}

impl ToSql for FieldValue {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(match self {
            Self::Null => ToSqlOutput::Owned(Value::Null),
            Self::Bool(value) => ToSqlOutput::Owned(Value::Integer(bool_to_int(*value))),
            Self::Integer(value) => ToSqlOutput::Owned(Value::Integer(*value)),
            Self::Real(value) => ToSqlOutput::Owned(Value::Real(*value)),
            Self::Text(value) => ToSqlOutput::Borrowed(ValueRef::Text(value.as_bytes())),
            // Lists compare as their comma-joined form.
            Self::List(_) => ToSqlOutput::Owned(Value::Text(self.to_string())),
        })
    }
}

fn value_from_sql(value: ValueRef<'_>) -> FieldValue {
    match value {
        ValueRef::Null => FieldValue::Null,
        ValueRef::Integer(value) => FieldValue::Integer(value),
        ValueRef::Real(value) => FieldValue::Real(value),
        ValueRef::Text(bytes) | ValueRef::Blob(bytes) => {
            FieldValue::Text(String::from_utf8_lossy(bytes).into_owned())
        }
    }
}

fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

#[cfg(test)]
mod tests {
    use super::{ConnectionOptions, DbError, SqliteConnection};
    use crate::db::query::{SelectQuery, COUNT_ALIAS};
    use crate::db::{Accessor, ConnectionHandle};
    use crate::model::target::Target;
    use crate::model::value::FieldValue;

    #[test]
    fn lazy_handle_is_not_ready_until_initialized() {
        let handle = SqliteConnection::lazy(ConnectionOptions::in_memory());
        assert!(!handle.is_ready());
        let err = handle
            .with_connection(|conn| conn.execute_batch("SELECT 1;"))
            .expect_err("queries before initialize should fail");
        assert!(matches!(err, DbError::NotInitialized));

        handle.initialize().expect("in-memory open should succeed");
        handle.initialize().expect("second initialize should be a no-op");
        assert!(handle.is_ready());
    }

    #[test]
    fn foreign_keys_pragma_follows_options() {
        let handle = SqliteConnection::lazy(ConnectionOptions {
            foreign_keys: false,
            ..ConnectionOptions::in_memory()
        });
        handle.initialize().expect("open should succeed");
        let enabled: i64 = handle
            .with_connection(|conn| conn.query_row("PRAGMA foreign_keys;", [], |row| row.get(0)))
            .expect("pragma should be readable");
        assert_eq!(enabled, 0);
    }

    #[test]
    fn accessor_counts_distinct_matches() {
        let conn = rusqlite::Connection::open_in_memory().expect("open should succeed");
        conn.execute_batch(
            "CREATE TABLE tags (slug TEXT NOT NULL);
             INSERT INTO tags (slug) VALUES ('rust'), ('rust'), ('sqlite');",
        )
        .expect("fixture should load");
        let handle = SqliteConnection::from_connection(conn);

        let target = Target::from("tags");
        let accessor = handle.accessor(&target).expect("accessor should build");
        let query = accessor
            .select()
            .select_count_distinct("slug", COUNT_ALIAS)
            .where_in("slug", vec!["rust".into(), "go".into(), "sqlite".into()]);
        let row = accessor
            .fetch_one(&query)
            .expect("query should run")
            .expect("aggregate always yields a row");
        assert_eq!(row.get(COUNT_ALIAS), Some(&FieldValue::Integer(2)));
    }

    #[test]
    fn bool_values_bind_as_integers() {
        let conn = rusqlite::Connection::open_in_memory().expect("open should succeed");
        conn.execute_batch(
            "CREATE TABLE flags (enabled INTEGER NOT NULL);
             INSERT INTO flags (enabled) VALUES (1);",
        )
        .expect("fixture should load");
        let handle = SqliteConnection::from_connection(conn);
        let target = Target::from("flags");
        let accessor = handle.accessor(&target).expect("accessor should build");

        let query = SelectQuery::new("flags").where_eq("enabled", true.into()).limit(1);
        assert!(accessor.fetch_one(&query).expect("query should run").is_some());
    }

    #[test]
    fn list_values_bind_as_joined_text() {
        let conn = rusqlite::Connection::open_in_memory().expect("open should succeed");
        conn.execute_batch(
            "CREATE TABLE pairs (label TEXT NOT NULL);
             INSERT INTO pairs (label) VALUES ('a,b');",
        )
        .expect("fixture should load");
        let handle = SqliteConnection::from_connection(conn);
        let target = Target::from("pairs");
        let accessor = handle.accessor(&target).expect("accessor should build");

        let query = accessor
            .select()
            .where_eq("label", FieldValue::from(vec!["a", "b"]))
            .limit(1);
        assert!(accessor.fetch_one(&query).expect("query should run").is_some());
    }

    #[test]
    fn options_deserialize_with_defaults() {
        let options: ConnectionOptions =
            serde_json::from_str(r#"{"path":"/tmp/app.db"}"#).expect("options should parse");
        assert_eq!(options.busy_timeout_ms, 5_000);
        assert!(options.foreign_keys);
        assert_eq!(options.mode(), "file");
    }
}
