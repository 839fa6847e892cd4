//! Filter-cascade options.
//!
//! For a partial selection, list the values of one facet that are still
//! reachable given every other pinned facet. A facet never filters its own
//! option list, so the user can widen a selection as well as narrow it.

use serde::Serialize;
use shelfsight_warehouse::{value_as_string, QueryExecutor, Statement, StatementBuilder};

use crate::config::TableNames;
use crate::error::CoreError;
use crate::selection::{week_expr, where_clause, Facet, FilterSelection};
use crate::week::Week;

/// One selectable value of a facet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FacetOption {
    pub id: String,
    pub name: String,
}

/// Build the options statement for `facet`.
pub fn options_statement(
    builder: StatementBuilder,
    tables: &TableNames,
    facet: Facet,
    selection: &FilterSelection,
) -> Result<Statement, CoreError> {
    let mut builder = builder;
    let limit = facet.page_size();

    match facet {
        Facet::Retailers => {
            builder.push("SELECT DISTINCT retailer AS id FROM ");
            builder.push(&tables.fact);
            let mut predicates = vec![String::from("retailer IS NOT NULL")];
            predicates.extend(selection.predicates(&mut builder, "", Some(facet))?);
            builder.push(&where_clause(&predicates));
            builder.push(&format!(" ORDER BY id LIMIT {limit}"));
        }
        Facet::Campaigns | Facet::Keywords => {
            let (id, name) = match facet {
                Facet::Campaigns => ("campaign_id", "campaign_name"),
                _ => ("keyword_id", "keyword_name"),
            };
            builder.push(&format!(
                "SELECT CAST(f.{id} AS STRING) AS id, \
                 COALESCE(MAX(d.{name}), CAST(f.{id} AS STRING)) AS name \
                 FROM (SELECT DISTINCT retailer, {id} FROM {fact}",
                fact = tables.fact
            ));
            let mut predicates = vec![format!("{id} IS NOT NULL")];
            predicates.extend(selection.predicates(&mut builder, "", Some(facet))?);
            builder.push(&where_clause(&predicates));
            builder.push(&format!(
                ") f LEFT JOIN {dimension} d \
                 ON CAST(d.{id} AS STRING) = CAST(f.{id} AS STRING) AND d.retailer = f.retailer \
                 GROUP BY f.{id} ORDER BY name, id LIMIT {limit}",
                dimension = tables.dimension
            ));
        }
        Facet::Weeks => {
            builder.push(&format!(
                "SELECT DISTINCT CAST({week} AS STRING) AS id FROM {fact}",
                week = week_expr(""),
                fact = tables.fact
            ));
            let mut predicates = vec![String::from("date IS NOT NULL")];
            predicates.extend(selection.predicates(&mut builder, "", Some(facet))?);
            builder.push(&where_clause(&predicates));
            builder.push(&format!(" ORDER BY id DESC LIMIT {limit}"));
        }
    }

    Ok(builder.build())
}

/// Valid next options for `facet` under `selection`.
pub async fn list_options(
    executor: &dyn QueryExecutor,
    tables: &TableNames,
    facet: Facet,
    selection: &FilterSelection,
) -> Result<Vec<FacetOption>, CoreError> {
    let statement = options_statement(
        StatementBuilder::new(executor.param_style()),
        tables,
        facet,
        selection,
    )?;
    let result = executor.execute(&statement).await?;

    let options = result
        .rows
        .iter()
        .filter_map(|row| {
            let id = row.get("id").and_then(value_as_string)?;
            let name = match facet {
                Facet::Weeks => Week::parse(&id)
                    .map(Week::label)
                    .unwrap_or_else(|_| id.clone()),
                _ => row
                    .get("name")
                    .and_then(value_as_string)
                    .unwrap_or_else(|| id.clone()),
            };
            if matches!(facet, Facet::Campaigns | Facet::Keywords) && id == name {
                tracing::debug!(facet = %facet, id = %id, "no dimension name, showing id");
            }
            Some(FacetOption { id, name })
        })
        .collect::<Vec<_>>();

    tracing::debug!(facet = %facet, options = options.len(), "listed facet options");
    Ok(options)
}
