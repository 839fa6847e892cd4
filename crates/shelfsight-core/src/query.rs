//! Ad-hoc SQL pass-through.

use shelfsight_warehouse::{normalize_sql, QueryExecutor, QueryResult, Statement};

use crate::error::{CoreError, ValidationError};

/// Forward user SQL to the warehouse unchanged, apart from trimming.
///
/// The statement runs with whatever privileges the configured credentials
/// carry; there is no allow-list.
pub async fn run_query(executor: &dyn QueryExecutor, sql: &str) -> Result<QueryResult, CoreError> {
    let sql = normalize_sql(sql).map_err(|_| ValidationError::EmptyQuery)?;
    tracing::info!(
        backend = executor.name(),
        chars = sql.len(),
        "running ad-hoc query"
    );
    let result = executor.execute(&Statement::raw(sql)).await?;
    tracing::debug!(rows = result.row_count, "ad-hoc query finished");
    Ok(result)
}
