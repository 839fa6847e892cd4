use std::path::PathBuf;
use std::sync::Arc;

use shelfsight_core::{Backend, CoreError, HttpClient, Settings};
use shelfsight_web::{build_router_with_options, AppState, RouterOptions, DEFAULT_STATIC_DIR};
use tokio::net::TcpListener;

use crate::cli::ServeArgs;
use crate::error::CliError;

pub async fn run(
    args: &ServeArgs,
    settings: Settings,
    http: Arc<dyn HttpClient>,
) -> Result<(), CliError> {
    let status = settings.status();
    if status.databricks_configured {
        tracing::info!(auth_mode = ?status.auth_mode, "Databricks configuration complete");
    } else {
        tracing::warn!(
            missing = ?status.missing_variables,
            "Databricks configuration incomplete; warehouse requests will fail"
        );
    }
    let backend = match &settings.backend {
        Backend::Databricks => String::from("databricks"),
        Backend::DuckDb(path) => format!("duckdb:{}", path.display()),
    };

    let static_dir = args
        .static_dir
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_STATIC_DIR));
    let app = build_router_with_options(
        AppState::from_settings(settings, http).map_err(CoreError::from)?,
        RouterOptions {
            static_dir: Some(static_dir),
            cors: args.cors,
        },
    );

    let listener = TcpListener::bind(args.bind).await?;
    tracing::info!(address = %args.bind, backend = %backend, "shelfsight listening");

    axum::serve(listener, app).await.map_err(CliError::Server)?;
    Ok(())
}
