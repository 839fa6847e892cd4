//! SQL statements with bound parameters.
//!
//! Every value that originates from a request is bound through
//! [`StatementBuilder::bind`] instead of being spliced into the SQL text. The
//! placeholder syntax depends on the executor:
//!
//! | Style | Placeholder | Used by |
//! |-------|-------------|---------|
//! | [`ParamStyle::Named`] | `:p0`, `:p1`, ... | Databricks statement API |
//! | [`ParamStyle::Positional`] | `?` | DuckDB |
//! | [`ParamStyle::Inline`] | escaped literal | drivers without bind support, debug output |
//!
//! Identifiers (table names) cannot be bound; they go through
//! [`validate_identifier`] once, when configuration is loaded.

use std::fmt::{Display, Formatter};

use serde::Serialize;

use crate::WarehouseError;

/// Placeholder syntax understood by an executor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParamStyle {
    /// `:name` markers with a separate parameter list.
    Named,
    /// `?` markers bound in order.
    Positional,
    /// Values rendered as quote-escaped literals.
    Inline,
}

/// Declared type of a bound parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum ParamType {
    String,
    Date,
}

impl ParamType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::String => "STRING",
            Self::Date => "DATE",
        }
    }
}

/// A single bound parameter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SqlParam {
    pub name: String,
    pub value: String,
    #[serde(rename = "type")]
    pub param_type: ParamType,
}

/// SQL text plus the parameters bound into it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Statement {
    sql: String,
    params: Vec<SqlParam>,
}

impl Statement {
    /// A statement without parameters, e.g. user-submitted SQL.
    pub fn raw(sql: impl Into<String>) -> Self {
        Self {
            sql: sql.into(),
            params: Vec::new(),
        }
    }

    pub fn sql(&self) -> &str {
        &self.sql
    }

    pub fn params(&self) -> &[SqlParam] {
        &self.params
    }

    /// Parameter values in binding order.
    pub fn values(&self) -> impl Iterator<Item = &str> {
        self.params.iter().map(|param| param.value.as_str())
    }
}

impl Display for Statement {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.sql)
    }
}

/// Incremental builder for [`Statement`].
#[derive(Debug)]
pub struct StatementBuilder {
    style: ParamStyle,
    sql: String,
    params: Vec<SqlParam>,
}

impl StatementBuilder {
    pub fn new(style: ParamStyle) -> Self {
        Self {
            style,
            sql: String::new(),
            params: Vec::new(),
        }
    }

    pub fn style(&self) -> ParamStyle {
        self.style
    }

    /// Append raw SQL text. Never pass request values here.
    pub fn push(&mut self, fragment: &str) -> &mut Self {
        self.sql.push_str(fragment);
        self
    }

    /// Register a value and return the SQL expression that refers to it.
    ///
    /// Date parameters are wrapped in `CAST(... AS DATE)` so every backend
    /// compares them as dates rather than strings.
    pub fn bind(&mut self, value: impl Into<String>, param_type: ParamType) -> String {
        let value = value.into();
        let marker = match self.style {
            ParamStyle::Named => {
                let name = format!("p{}", self.params.len());
                let marker = format!(":{name}");
                self.params.push(SqlParam {
                    name,
                    value,
                    param_type,
                });
                marker
            }
            ParamStyle::Positional => {
                let name = format!("p{}", self.params.len());
                self.params.push(SqlParam {
                    name,
                    value,
                    param_type,
                });
                String::from("?")
            }
            ParamStyle::Inline => escape_literal(&value),
        };

        match param_type {
            ParamType::String => marker,
            ParamType::Date => format!("CAST({marker} AS DATE)"),
        }
    }

    /// Bind a value and append its placeholder.
    pub fn push_bind(&mut self, value: impl Into<String>, param_type: ParamType) -> &mut Self {
        let marker = self.bind(value, param_type);
        self.sql.push_str(&marker);
        self
    }

    /// Render `expr IN (...)` with one bound parameter per value.
    ///
    /// An empty value list renders a predicate that matches nothing.
    pub fn in_list(&mut self, expr: &str, values: &[String], param_type: ParamType) -> String {
        if values.is_empty() {
            return String::from("1 = 0");
        }
        let markers = values
            .iter()
            .map(|value| self.bind(value.as_str(), param_type))
            .collect::<Vec<_>>();
        format!("{expr} IN ({})", markers.join(", "))
    }

    pub fn build(self) -> Statement {
        Statement {
            sql: self.sql,
            params: self.params,
        }
    }
}

/// Render a string as a single-quoted SQL literal.
///
/// This is the only place in the workspace that embeds a value into SQL text:
/// every `'` is doubled so the literal cannot terminate early.
pub fn escape_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

/// Check that a configured table reference is a plain dotted identifier.
///
/// Accepts `table`, `schema.table` and `catalog.schema.table`, where each part
/// is ASCII alphanumerics or `_` and does not start with a digit.
pub fn validate_identifier(identifier: &str) -> Result<&str, WarehouseError> {
    let parts = identifier.split('.').collect::<Vec<_>>();
    if parts.len() > 3 {
        return Err(WarehouseError::QueryRejected(format!(
            "identifier '{identifier}' has more than three parts"
        )));
    }

    for part in parts {
        let mut chars = part.chars();
        let valid_start = chars
            .next()
            .is_some_and(|ch| ch.is_ascii_alphabetic() || ch == '_');
        if !valid_start || !chars.all(|ch| ch.is_ascii_alphanumeric() || ch == '_') {
            return Err(WarehouseError::QueryRejected(format!(
                "identifier '{identifier}' is not a plain table reference"
            )));
        }
    }

    Ok(identifier)
}
