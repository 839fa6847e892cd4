//! Dashboard routes
//!
//! Every endpoint takes the same facet parameters:
//! `retailers`, `campaigns`, `keywords`, `weeks` (each `all` or a
//! comma-separated list).

use axum::{
    extract::{Path, Query, State},
    routing::get,
    Json, Router,
};
use shelfsight_core::dashboard::weekly_series;
use shelfsight_core::{
    list_options, performance_delta, CoreError, Facet, FacetOption, FilterSelection,
    PerformanceRow, QueryResult, SelectionParams,
};

use crate::error::Result;
use crate::state::AppState;
use crate::types::ApiResponse;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/dashboard/filters/:facet", get(facet_options))
        .route("/api/dashboard/data", get(dashboard_data))
        .route("/api/performance-data", get(performance_data))
}

/// GET /api/dashboard/filters/{retailers,campaigns,keywords,weeks}
async fn facet_options(
    State(state): State<AppState>,
    Path(facet): Path<String>,
    Query(params): Query<SelectionParams>,
) -> Result<Json<ApiResponse<Vec<FacetOption>>>> {
    let facet = facet.parse::<Facet>().map_err(CoreError::from)?;
    let selection = FilterSelection::from(&params);
    let options = list_options(
        state.executor.as_ref(),
        &state.settings.tables,
        facet,
        &selection,
    )
    .await?;
    Ok(Json(ApiResponse::ok(options)))
}

/// GET /api/dashboard/data
async fn dashboard_data(
    State(state): State<AppState>,
    Query(params): Query<SelectionParams>,
) -> Result<Json<ApiResponse<QueryResult>>> {
    let selection = FilterSelection::from(&params);
    let series = weekly_series(state.executor.as_ref(), &state.settings.tables, &selection).await?;
    Ok(Json(ApiResponse::ok(series)))
}

/// GET /api/performance-data
async fn performance_data(
    State(state): State<AppState>,
    Query(params): Query<SelectionParams>,
) -> Result<Json<ApiResponse<Vec<PerformanceRow>>>> {
    let selection = FilterSelection::from(&params);
    let rows =
        performance_delta(state.executor.as_ref(), &state.settings.tables, &selection).await?;
    Ok(Json(ApiResponse::ok(rows)))
}
