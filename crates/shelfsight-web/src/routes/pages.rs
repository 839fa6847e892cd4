//! Static HTML pages

use std::path::Path;

use axum::Router;
use tower_http::services::{ServeDir, ServeFile};

use crate::state::AppState;

pub fn routes(static_dir: &Path) -> Router<AppState> {
    Router::new()
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .route_service("/dashboard", ServeFile::new(static_dir.join("dashboard.html")))
        .route_service(
            "/performance-data",
            ServeFile::new(static_dir.join("performance.html")),
        )
        .nest_service("/static", ServeDir::new(static_dir))
}
