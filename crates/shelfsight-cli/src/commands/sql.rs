use std::sync::Arc;

use shelfsight_core::{build_executor, run_query, CoreError, HttpClient, Settings};

use crate::cli::{OutputFormat, SqlArgs};
use crate::error::CliError;
use crate::output::render_result;

pub async fn run(
    args: &SqlArgs,
    settings: &Settings,
    http: Arc<dyn HttpClient>,
    format: OutputFormat,
    pretty: bool,
) -> Result<(), CliError> {
    let executor = build_executor(settings, http).map_err(CoreError::from)?;
    let result = run_query(executor.as_ref(), &args.query).await?;
    render_result(&result, format, pretty)
}
