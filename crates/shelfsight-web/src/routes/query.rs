//! Ad-hoc SQL endpoint

use axum::extract::rejection::JsonRejection;
use axum::{extract::State, routing::post, Json, Router};
use serde::Deserialize;
use shelfsight_core::{run_query, QueryResult};

use crate::error::{ApiError, Result};
use crate::state::AppState;
use crate::types::ApiResponse;

#[derive(Debug, Deserialize)]
pub struct QueryRequest {
    #[serde(default)]
    pub query: String,
}

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/query", post(execute_query))
}

/// POST /api/query
///
/// Runs the submitted SQL with the configured warehouse credentials.
async fn execute_query(
    State(state): State<AppState>,
    payload: std::result::Result<Json<QueryRequest>, JsonRejection>,
) -> Result<Json<ApiResponse<QueryResult>>> {
    let Json(request) = payload.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let result = run_query(state.executor.as_ref(), &request.query).await?;
    Ok(Json(ApiResponse::ok(result)))
}
