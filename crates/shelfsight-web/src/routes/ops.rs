//! Health checks
//!
//! Liveness plus configuration completeness. Never touches the warehouse.

use axum::{extract::State, routing::get, Json, Router};
use shelfsight_core::ConfigStatus;

use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health))
        .route("/api/health", get(health))
}

/// GET /health, GET /api/health
async fn health(State(state): State<AppState>) -> Json<ConfigStatus> {
    Json(state.settings.status())
}
