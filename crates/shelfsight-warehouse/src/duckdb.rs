//! Local `DuckDB` executor.
//!
//! The database is opened once; every statement runs on its own cloned
//! connection, which is dropped before the call returns.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use ::duckdb::types::{TimeUnit, Value as DuckValue};
use ::duckdb::{params_from_iter, Config, Connection};
use async_trait::async_trait;
use serde_json::{Number, Value};
use time::{Date, Duration, OffsetDateTime};

use crate::{number_from_f64, ParamStyle, QueryExecutor, QueryResult, Statement, WarehouseError};

/// Julian day number of 1970-01-01.
const UNIX_EPOCH_JULIAN_DAY: i32 = 2_440_588;

/// Access mode for database connections.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessMode {
    /// Read-only access.
    ReadOnly,
    /// Read-write access.
    ReadWrite,
}

/// Executes statements against a `DuckDB` database file.
#[derive(Clone)]
pub struct DuckDbExecutor {
    db_path: PathBuf,
    mode: AccessMode,
    database: Arc<Mutex<Connection>>,
}

impl std::fmt::Debug for DuckDbExecutor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DuckDbExecutor")
            .field("db_path", &self.db_path)
            .field("mode", &self.mode)
            .finish()
    }
}

impl DuckDbExecutor {
    /// Open (or create) the database file for read-write access.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, WarehouseError> {
        Self::open_with_mode(path, AccessMode::ReadWrite)
    }

    /// Open the database file with the given access mode.
    ///
    /// # Errors
    /// Returns an error if the file cannot be opened.
    pub fn open_with_mode(
        path: impl Into<PathBuf>,
        mode: AccessMode,
    ) -> Result<Self, WarehouseError> {
        let db_path = path.into();
        let access = match mode {
            AccessMode::ReadOnly => ::duckdb::AccessMode::ReadOnly,
            AccessMode::ReadWrite => ::duckdb::AccessMode::ReadWrite,
        };
        let config = Config::default().access_mode(access)?;
        let connection = Connection::open_with_flags(&db_path, config)?;
        Ok(Self {
            db_path,
            mode,
            database: Arc::new(Mutex::new(connection)),
        })
    }

    /// Get the path to the database file.
    #[must_use]
    pub fn db_path(&self) -> &Path {
        self.db_path.as_path()
    }

    #[must_use]
    pub fn mode(&self) -> AccessMode {
        self.mode
    }

    /// Run a statement on the calling thread.
    ///
    /// # Errors
    /// Returns an error if a connection cannot be opened or the statement fails.
    pub fn execute_blocking(&self, statement: &Statement) -> Result<QueryResult, WarehouseError> {
        let connection = self.connect()?;
        let result = run_statement(&connection, statement);
        drop(connection);
        result
    }

    /// Run a batch of statements without parameters, e.g. to create and seed tables.
    ///
    /// # Errors
    /// Returns an error if a connection cannot be opened or any statement fails.
    pub fn execute_batch(&self, sql: &str) -> Result<(), WarehouseError> {
        let connection = self.connect()?;
        connection.execute_batch(sql)?;
        Ok(())
    }

    /// Open a new connection to the shared database instance.
    fn connect(&self) -> Result<Connection, WarehouseError> {
        let database = self
            .database
            .lock()
            .map_err(|_| WarehouseError::Connection(String::from("database handle poisoned")))?;
        Ok(database.try_clone()?)
    }
}

#[async_trait]
impl QueryExecutor for DuckDbExecutor {
    fn param_style(&self) -> ParamStyle {
        ParamStyle::Positional
    }

    async fn execute(&self, statement: &Statement) -> Result<QueryResult, WarehouseError> {
        let executor = self.clone();
        let statement = statement.clone();
        tokio::task::spawn_blocking(move || executor.execute_blocking(&statement))
            .await
            .map_err(|error| WarehouseError::Task(error.to_string()))?
    }

    fn name(&self) -> &'static str {
        "duckdb"
    }
}

fn run_statement(
    connection: &Connection,
    statement: &Statement,
) -> Result<QueryResult, WarehouseError> {
    tracing::debug!(
        backend = "duckdb",
        params = statement.params().len(),
        "executing statement"
    );

    let mut prepared = connection.prepare(statement.sql())?;
    let mut cursor = prepared.query(params_from_iter(statement.values()))?;

    // Column metadata is only available once the statement has run.
    let columns = cursor
        .as_ref()
        .map(|executed| executed.column_names())
        .unwrap_or_default();
    let column_count = columns.len();

    let mut arrays = Vec::new();
    while let Some(row) = cursor.next()? {
        arrays.push(read_row(row, column_count)?);
    }

    Ok(QueryResult::from_arrays(columns, arrays))
}

/// Read a single row from the result set.
fn read_row(row: &::duckdb::Row<'_>, column_count: usize) -> Result<Vec<Value>, ::duckdb::Error> {
    let mut output = Vec::with_capacity(column_count);
    for index in 0..column_count {
        let value: DuckValue = row.get(index)?;
        output.push(to_json_value(value));
    }
    Ok(output)
}

/// Convert a `DuckDB` value to a JSON value.
fn to_json_value(value: DuckValue) -> Value {
    match value {
        DuckValue::Null => Value::Null,
        DuckValue::Boolean(value) => Value::Bool(value),
        DuckValue::TinyInt(value) => Value::Number(Number::from(value)),
        DuckValue::SmallInt(value) => Value::Number(Number::from(value)),
        DuckValue::Int(value) => Value::Number(Number::from(value)),
        DuckValue::BigInt(value) => Value::Number(Number::from(value)),
        DuckValue::HugeInt(value) => match i64::try_from(value) {
            Ok(value) => Value::Number(Number::from(value)),
            Err(_) => Value::String(value.to_string()),
        },
        DuckValue::UTinyInt(value) => Value::Number(Number::from(value)),
        DuckValue::USmallInt(value) => Value::Number(Number::from(value)),
        DuckValue::UInt(value) => Value::Number(Number::from(value)),
        DuckValue::UBigInt(value) => Value::Number(Number::from(value)),
        DuckValue::Float(value) => number_from_f64(f64::from(value)),
        DuckValue::Double(value) => number_from_f64(value),
        DuckValue::Text(value) => Value::String(value),
        DuckValue::Blob(value) => Value::String(hex::encode(value)),
        DuckValue::Date32(days) => date_from_days(days)
            .map(|date| Value::String(date.to_string()))
            .unwrap_or(Value::Null),
        DuckValue::Timestamp(unit, raw) => timestamp_from_raw(unit, raw)
            .map(Value::String)
            .unwrap_or(Value::Null),
        other => Value::String(format!("{other:?}")),
    }
}

fn date_from_days(days: i32) -> Option<Date> {
    Date::from_julian_day(UNIX_EPOCH_JULIAN_DAY.checked_add(days)?).ok()
}

fn timestamp_from_raw(unit: TimeUnit, raw: i64) -> Option<String> {
    let offset = match unit {
        TimeUnit::Second => Duration::seconds(raw),
        TimeUnit::Millisecond => Duration::milliseconds(raw),
        TimeUnit::Microsecond => Duration::microseconds(raw),
        TimeUnit::Nanosecond => Duration::nanoseconds(raw),
    };
    let instant = OffsetDateTime::UNIX_EPOCH.checked_add(offset)?;
    instant
        .format(&time::format_description::well_known::Rfc3339)
        .ok()
}
