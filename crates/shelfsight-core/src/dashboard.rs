//! Weekly totals for the dashboard chart.

use shelfsight_warehouse::{QueryExecutor, QueryResult, Statement, StatementBuilder};

use crate::config::TableNames;
use crate::error::CoreError;
use crate::selection::{week_expr, where_clause, FilterSelection};

/// One row per week, oldest first, honouring every pinned facet.
pub fn series_statement(
    mut builder: StatementBuilder,
    tables: &TableNames,
    selection: &FilterSelection,
) -> Result<Statement, CoreError> {
    builder.push(&format!(
        "SELECT CAST({week} AS STRING) AS week, \
         CAST(SUM(impressions) AS BIGINT) AS impressions, \
         CAST(SUM(clicks) AS BIGINT) AS clicks, \
         CAST(SUM(conversions) AS BIGINT) AS conversions, \
         CAST(SUM(cost) AS DOUBLE) AS spend, \
         CAST(SUM(revenue) AS DOUBLE) AS sales_rev \
         FROM {fact}",
        week = week_expr(""),
        fact = tables.fact
    ));
    let mut predicates = vec![String::from("date IS NOT NULL")];
    predicates.extend(selection.predicates(&mut builder, "", None)?);
    builder.push(&where_clause(&predicates));
    builder.push(" GROUP BY 1 ORDER BY 1");
    Ok(builder.build())
}

pub async fn weekly_series(
    executor: &dyn QueryExecutor,
    tables: &TableNames,
    selection: &FilterSelection,
) -> Result<QueryResult, CoreError> {
    let statement = series_statement(
        StatementBuilder::new(executor.param_style()),
        tables,
        selection,
    )?;
    Ok(executor.execute(&statement).await?)
}
