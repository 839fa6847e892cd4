//! # Shelfsight Core
//!
//! Configuration, Databricks clients and the dashboard query logic behind the
//! shelfsight web front end.
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`config`] | Immutable settings read once from the environment, health status |
//! | [`http_client`] | HTTP transport abstraction (reqwest, stub) |
//! | [`databricks`] | Statement execution and volume uploads over REST |
//! | [`query`] | Ad-hoc SQL pass-through |
//! | [`selection`] | Facet filters parsed from query parameters |
//! | [`facets`] | Filter-cascade option lists |
//! | [`dashboard`] | Weekly totals |
//! | [`performance`] | Week-over-week deltas per campaign and keyword |
//! | [`upload`] | CSV validation and forwarding |
//! | [`week`] | Week labels and ISO dates |
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │  HTTP handlers  │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ facets/dashboard│────▶│ StatementBuilder │
//! │ performance     │     │ (bound params)   │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ QueryExecutor   │────▶│ HTTP Client      │
//! │ (Databricks /   │     │ (reqwest/stub)   │
//! │  DuckDB)        │     └──────────────────┘
//! └─────────────────┘
//! ```

pub mod config;
pub mod dashboard;
pub mod databricks;
pub mod error;
pub mod facets;
pub mod http_client;
pub mod performance;
pub mod query;
pub mod selection;
pub mod upload;
pub mod week;

use std::sync::Arc;

pub use config::{
    Backend, ConfigStatus, ConnectionCredentials, Settings, TableNames, WarehouseAuth,
};
pub use databricks::{DatabricksExecutor, VolumeFileStore};
pub use error::{ConfigurationError, CoreError, ValidationError};
pub use facets::{list_options, FacetOption};
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient,
    StubHttpClient,
};
pub use performance::{delta, performance_delta, Metric, MetricSet, PerformanceRow, RowKey};
pub use query::run_query;
pub use selection::{Facet, FacetFilter, FilterSelection, SelectionParams};
pub use shelfsight_warehouse::{
    value_as_f64, value_as_string, DuckDbExecutor, ParamStyle, QueryExecutor, QueryResult, Statement,
    WarehouseError,
};
pub use upload::{upload, FileStore, StorageError, UploadReceipt, UploadedFile};
pub use week::Week;

/// Executor for the configured backend.
///
/// # Errors
/// Returns an error if the local database file cannot be opened. The
/// Databricks executor never fails here; missing credentials surface per call.
pub fn build_executor(
    settings: &Settings,
    http: Arc<dyn HttpClient>,
) -> Result<Arc<dyn QueryExecutor>, WarehouseError> {
    Ok(match &settings.backend {
        Backend::Databricks => Arc::new(DatabricksExecutor::new(settings, http)),
        Backend::DuckDb(path) => Arc::new(DuckDbExecutor::open(path.clone())?),
    })
}

/// File store for uploads. Uploads always target the Databricks volume.
pub fn build_file_store(settings: &Settings, http: Arc<dyn HttpClient>) -> Arc<dyn FileStore> {
    Arc::new(VolumeFileStore::new(settings, http))
}
