//! # Shelfsight Warehouse
//!
//! Statement model and query executors for shelfsight.
//!
//! ## Overview
//!
//! Every SQL round-trip in shelfsight goes through the [`QueryExecutor`]
//! trait. An executor takes a [`Statement`] (SQL text plus bound parameters),
//! opens whatever connection and session it needs, runs the statement, and
//! releases everything before returning, on success and on failure alike.
//!
//! - **Bound parameters**: [`StatementBuilder`] renders placeholders in the
//!   executor's [`ParamStyle`] so request values never end up in SQL text
//! - **Uniform results**: every backend returns a [`QueryResult`] with ordered
//!   column names and rows keyed by column
//! - **Local backend**: [`DuckDbExecutor`] runs the same statements against a
//!   DuckDB file for offline development and tests
//!
//! The Databricks executor lives in `shelfsight-core`, next to the HTTP client
//! it is built on.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use shelfsight_warehouse::{DuckDbExecutor, QueryExecutor, Statement};
//!
//! # async fn run() -> Result<(), shelfsight_warehouse::WarehouseError> {
//! let executor = DuckDbExecutor::open("/tmp/shelfsight.duckdb")?;
//! let result = executor.execute(&Statement::raw("SELECT 42 AS answer")).await?;
//! assert_eq!(result.row_count, 1);
//! # Ok(())
//! # }
//! ```

pub mod duckdb;
pub mod statement;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Number, Value};
use thiserror::Error;

pub use duckdb::{AccessMode, DuckDbExecutor};
pub use statement::{
    escape_literal, validate_identifier, ParamStyle, ParamType, SqlParam, Statement,
    StatementBuilder,
};

/// A result row keyed by column name.
pub type Row = Map<String, Value>;

/// Errors that can occur while executing a statement.
#[derive(Debug, Error)]
pub enum WarehouseError {
    /// `DuckDB` database error.
    #[error(transparent)]
    DuckDb(#[from] ::duckdb::Error),

    /// Required credentials or settings are absent; no connection was attempted.
    #[error("warehouse is not configured, missing: {}", missing.join(", "))]
    NotConfigured { missing: Vec<String> },

    /// Statement was rejected before it reached the warehouse.
    #[error("query rejected: {0}")]
    QueryRejected(String),

    /// Connection or session could not be opened.
    #[error("connection failed: {0}")]
    Connection(String),

    /// The warehouse accepted the statement but reported a failure.
    #[error("statement failed: {message}")]
    Statement {
        message: String,
        details: Option<String>,
    },

    /// A blocking worker panicked or was cancelled.
    #[error("executor task failed: {0}")]
    Task(String),
}

impl WarehouseError {
    /// Remote error detail, when the warehouse supplied one.
    pub fn details(&self) -> Option<&str> {
        match self {
            Self::Statement { details, .. } => details.as_deref(),
            _ => None,
        }
    }
}

/// Result of a SQL statement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    /// Column names in result order.
    pub columns: Vec<String>,
    /// Rows keyed by column name.
    pub rows: Vec<Row>,
    /// Number of rows returned. Always equals `rows.len()`.
    pub row_count: usize,
}

impl QueryResult {
    /// Build a result from keyed rows.
    ///
    /// Column names come from `schema` when the backend reported one, otherwise
    /// from the keys of the first row.
    pub fn new(schema: Option<Vec<String>>, rows: Vec<Row>) -> Self {
        let columns = match schema {
            Some(columns) if !columns.is_empty() => columns,
            _ => rows
                .first()
                .map(|row| row.keys().cloned().collect())
                .unwrap_or_default(),
        };
        Self {
            columns,
            row_count: rows.len(),
            rows,
        }
    }

    /// Build a result from positional rows and their column names.
    pub fn from_arrays(columns: Vec<String>, arrays: Vec<Vec<Value>>) -> Self {
        let rows = arrays
            .into_iter()
            .map(|values| {
                columns
                    .iter()
                    .cloned()
                    .zip(values)
                    .collect::<Row>()
            })
            .collect();
        Self::new(Some(columns), rows)
    }

    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Executes statements against a SQL warehouse.
///
/// Implementations open a fresh connection per call and release it before
/// returning. No retries are performed.
#[async_trait]
pub trait QueryExecutor: Send + Sync {
    /// Placeholder syntax expected in [`Statement`]s passed to this executor.
    fn param_style(&self) -> ParamStyle;

    /// Execute one statement and collect every row.
    async fn execute(&self, statement: &Statement) -> Result<QueryResult, WarehouseError>;

    /// Backend name for logging.
    fn name(&self) -> &'static str;
}

/// Trim a user-submitted statement and reject empty input.
pub fn normalize_sql(sql: &str) -> Result<&str, WarehouseError> {
    let normalized = sql.trim();
    if normalized.is_empty() {
        return Err(WarehouseError::QueryRejected(String::from(
            "query must not be empty",
        )));
    }
    Ok(normalized)
}

/// Convert an f64 to a JSON number, returning Null for NaN/Inf.
pub fn number_from_f64(value: f64) -> Value {
    Number::from_f64(value)
        .map(Value::Number)
        .unwrap_or(Value::Null)
}

/// Read a numeric cell, accepting JSON numbers and numeric strings.
pub fn value_as_f64(value: &Value) -> Option<f64> {
    match value {
        Value::Number(number) => number.as_f64(),
        Value::String(text) => text.trim().parse::<f64>().ok(),
        _ => None,
    }
}

/// Read a cell as text; numbers are stringified, null stays absent.
pub fn value_as_string(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(text) => Some(text.clone()),
        other => Some(other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn row_count_tracks_rows() {
        let result = QueryResult::from_arrays(
            vec![String::from("a"), String::from("b")],
            vec![vec![json!(1), json!("x")], vec![json!(2), json!("y")]],
        );
        assert_eq!(result.row_count, result.rows.len());
        assert_eq!(result.columns, vec!["a", "b"]);
        assert_eq!(result.rows[1]["b"], json!("y"));
    }

    #[test]
    fn columns_fall_back_to_first_row_keys() {
        let mut row = Row::new();
        row.insert(String::from("retailer"), json!("A"));
        let result = QueryResult::new(None, vec![row]);
        assert_eq!(result.columns, vec!["retailer"]);
    }

    #[test]
    fn columns_empty_without_schema_or_rows() {
        let result = QueryResult::new(None, Vec::new());
        assert!(result.columns.is_empty());
        assert_eq!(result.row_count, 0);
    }

    #[test]
    fn serializes_row_count_in_camel_case() {
        let value = serde_json::to_value(QueryResult::empty()).expect("serialize");
        assert_eq!(value, json!({"columns": [], "rows": [], "rowCount": 0}));
    }

    #[test]
    fn normalize_rejects_blank_queries() {
        assert!(matches!(
            normalize_sql("   "),
            Err(WarehouseError::QueryRejected(_))
        ));
        assert_eq!(normalize_sql(" SELECT 1; ").expect("valid"), "SELECT 1;");
        assert_eq!(
            normalize_sql("\n SELECT 'a ;' AS x;\n").expect("valid"),
            "SELECT 'a ;' AS x;"
        );
    }

    #[test]
    fn numeric_cells_parse_from_strings() {
        assert_eq!(value_as_f64(&json!("12.5")), Some(12.5));
        assert_eq!(value_as_f64(&json!(3)), Some(3.0));
        assert_eq!(value_as_f64(&Value::Null), None);
        assert_eq!(value_as_string(&json!(42)), Some(String::from("42")));
    }
}
