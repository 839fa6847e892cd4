//! CLI argument definitions for shelfsight.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `serve` | Run the HTTP API and dashboard pages |
//! | `health` | Print the configuration status |
//! | `sql` | Run one SQL statement against the configured backend |
//!
//! Warehouse settings come from the environment (`DATABRICKS_*`,
//! `SHELFSIGHT_*`); see `shelfsight_core::config`.
//!
//! # Examples
//!
//! ```bash
//! shelfsight serve --bind 127.0.0.1:8080
//! shelfsight health --pretty
//! SHELFSIGHT_BACKEND=duckdb shelfsight sql "SELECT COUNT(*) FROM fact" --format table
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Shelfsight - retail media reporting over a Databricks SQL warehouse
#[derive(Debug, Parser)]
#[command(name = "shelfsight", author, version, about)]
pub struct Cli {
    /// Output format for command results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// Output format
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Single JSON document.
    Json,
    /// Aligned text columns for terminal display.
    Table,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the HTTP server.
    Serve(ServeArgs),
    /// Report which settings are present, without contacting the warehouse.
    Health,
    /// Execute a SQL statement and print the result.
    Sql(SqlArgs),
}

/// Arguments for the `serve` command.
#[derive(Debug, Args)]
pub struct ServeArgs {
    /// Address to listen on.
    #[arg(long, env = "SHELFSIGHT_BIND", default_value = "0.0.0.0:3000")]
    pub bind: SocketAddr,

    /// Directory with the HTML pages; defaults to the pages bundled with the build.
    #[arg(long, env = "SHELFSIGHT_STATIC_DIR")]
    pub static_dir: Option<PathBuf>,

    /// Allow cross-origin requests from any origin.
    #[arg(long, default_value_t = false)]
    pub cors: bool,
}

/// Arguments for the `sql` command.
#[derive(Debug, Args)]
pub struct SqlArgs {
    /// SQL statement to execute.
    pub query: String,
}
