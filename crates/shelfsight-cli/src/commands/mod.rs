mod health;
mod serve;
mod sql;

use std::sync::Arc;

use shelfsight_core::{HttpClient, ReqwestHttpClient, Settings};

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub async fn run(cli: &Cli) -> Result<(), CliError> {
    let settings = Settings::from_env()?;
    tracing::debug!(settings = ?settings, "loaded settings");
    let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());

    match &cli.command {
        Command::Serve(args) => serve::run(args, settings, http).await,
        Command::Health => health::run(&settings, cli.pretty),
        Command::Sql(args) => sql::run(args, &settings, http, cli.format, cli.pretty).await,
    }
}
