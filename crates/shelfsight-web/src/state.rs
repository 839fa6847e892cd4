//! Application state
//!
//! Built once at startup and cloned into every handler.

use std::sync::Arc;

use shelfsight_core::{
    build_executor, build_file_store, FileStore, HttpClient, QueryExecutor, Settings,
    WarehouseError,
};

#[derive(Clone)]
pub struct AppState {
    pub settings: Arc<Settings>,
    pub executor: Arc<dyn QueryExecutor>,
    pub files: Arc<dyn FileStore>,
}

impl AppState {
    pub fn new(
        settings: Settings,
        executor: Arc<dyn QueryExecutor>,
        files: Arc<dyn FileStore>,
    ) -> Self {
        Self {
            settings: Arc::new(settings),
            executor,
            files,
        }
    }

    /// Wire the executor and file store for the configured backend.
    ///
    /// # Errors
    /// Returns an error if the local database file cannot be opened.
    pub fn from_settings(
        settings: Settings,
        http: Arc<dyn HttpClient>,
    ) -> Result<Self, WarehouseError> {
        let executor = build_executor(&settings, Arc::clone(&http))?;
        let files = build_file_store(&settings, http);
        Ok(Self::new(settings, executor, files))
    }
}
