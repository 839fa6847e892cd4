//! Shelfsight web
//!
//! HTTP API and static pages for the shelfsight retail-media dashboard.
//!
//! # Usage
//!
//! ```ignore
//! use std::sync::Arc;
//! use shelfsight_core::{ReqwestHttpClient, Settings};
//! use shelfsight_web::{build_router, AppState};
//!
//! let settings = Settings::from_env()?;
//! let state = AppState::from_settings(settings, Arc::new(ReqwestHttpClient::new()))?;
//! let app = build_router(state);
//!
//! let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//! axum::serve(listener, app).await?;
//! ```
//!
//! # Endpoints
//!
//! - `GET /health`, `GET /api/health` - configuration status
//! - `POST /api/query` - run ad-hoc SQL
//! - `POST /api/upload` - upload a CSV to the configured volume
//! - `GET /api/dashboard/filters/{facet}` - cascading filter options
//! - `GET /api/dashboard/data` - weekly totals
//! - `GET /api/performance-data` - week-over-week deltas
//! - `GET /`, `/dashboard`, `/performance-data` - HTML pages

pub mod error;
pub mod routes;
pub mod state;
pub mod types;

pub use error::{ApiError, Result};
pub use routes::{build_router, build_router_with_options, RouterOptions};
pub use state::AppState;
pub use types::{ApiResponse, UploadResponse};

/// Pages shipped with the crate.
pub const DEFAULT_STATIC_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/static");
