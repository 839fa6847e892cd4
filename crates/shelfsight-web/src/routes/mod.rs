//! API routes

pub mod dashboard;
pub mod ops;
pub mod pages;
pub mod query;
pub mod upload;

use std::path::PathBuf;

use axum::body::Body;
use axum::http::Request;
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use uuid::Uuid;

use crate::state::AppState;

/// Options for building the router
#[derive(Debug, Clone, Default)]
pub struct RouterOptions {
    /// Directory holding the HTML pages. Pages are not served when unset.
    pub static_dir: Option<PathBuf>,
    /// Allow cross-origin requests from anywhere.
    pub cors: bool,
}

/// Build the API router without static pages
pub fn build_router(state: AppState) -> Router {
    build_router_with_options(state, RouterOptions::default())
}

/// Build the complete router
pub fn build_router_with_options(state: AppState, options: RouterOptions) -> Router {
    let mut router = Router::new()
        .merge(ops::routes())
        .merge(query::routes())
        .merge(upload::routes())
        .merge(dashboard::routes());

    if let Some(static_dir) = &options.static_dir {
        router = router.merge(pages::routes(static_dir));
    }

    let mut router = router
        .with_state(state)
        .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
            tracing::info_span!(
                "request",
                method = %request.method(),
                path = %request.uri().path(),
                request_id = %Uuid::new_v4(),
            )
        }));

    if options.cors {
        router = router.layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );
    }
    router
}
