//! Process configuration.
//!
//! Settings are read once at startup into an immutable [`Settings`] value that
//! is handed to every component. Nothing reads the environment after that.
//!
//! | Variable | Required | Default |
//! |----------|----------|---------|
//! | `DATABRICKS_SERVER_HOSTNAME` | yes | |
//! | `DATABRICKS_HTTP_PATH` | yes | |
//! | `DATABRICKS_TOKEN` | one auth mode | |
//! | `DATABRICKS_CLIENT_ID` / `DATABRICKS_CLIENT_SECRET` | one auth mode | |
//! | `DATABRICKS_VOLUME_PATH` | no | `/Volumes/main/default/uploads` |
//! | `SHELFSIGHT_FACT_TABLE` | no | `retail_media.keyword_performance` |
//! | `SHELFSIGHT_DIMENSION_TABLE` | no | `retail_media.campaign_keywords` |
//! | `SHELFSIGHT_BACKEND` | no | `databricks` |
//! | `SHELFSIGHT_DUCKDB_PATH` | with `duckdb` backend | `shelfsight.duckdb` |

use std::collections::BTreeMap;
use std::fmt::{Debug, Formatter};
use std::path::PathBuf;

use serde::Serialize;
use shelfsight_warehouse::validate_identifier;

use crate::error::ConfigurationError;

pub const HOSTNAME_VAR: &str = "DATABRICKS_SERVER_HOSTNAME";
pub const HTTP_PATH_VAR: &str = "DATABRICKS_HTTP_PATH";
pub const TOKEN_VAR: &str = "DATABRICKS_TOKEN";
pub const CLIENT_ID_VAR: &str = "DATABRICKS_CLIENT_ID";
pub const CLIENT_SECRET_VAR: &str = "DATABRICKS_CLIENT_SECRET";
pub const VOLUME_PATH_VAR: &str = "DATABRICKS_VOLUME_PATH";
pub const FACT_TABLE_VAR: &str = "SHELFSIGHT_FACT_TABLE";
pub const DIMENSION_TABLE_VAR: &str = "SHELFSIGHT_DIMENSION_TABLE";
pub const BACKEND_VAR: &str = "SHELFSIGHT_BACKEND";
pub const DUCKDB_PATH_VAR: &str = "SHELFSIGHT_DUCKDB_PATH";

const DEFAULT_VOLUME_PATH: &str = "/Volumes/main/default/uploads";
const DEFAULT_FACT_TABLE: &str = "retail_media.keyword_performance";
const DEFAULT_DIMENSION_TABLE: &str = "retail_media.campaign_keywords";
const DEFAULT_DUCKDB_PATH: &str = "shelfsight.duckdb";

/// Which executor serves SQL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Backend {
    /// Databricks SQL warehouse over the statement execution API.
    Databricks,
    /// Local `DuckDB` file, for development without a warehouse.
    DuckDb(PathBuf),
}

/// Fact and dimension table references, validated as plain identifiers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableNames {
    pub fact: String,
    pub dimension: String,
}

impl TableNames {
    pub fn new(
        fact: impl Into<String>,
        dimension: impl Into<String>,
    ) -> Result<Self, ConfigurationError> {
        let fact = fact.into();
        let dimension = dimension.into();
        validate_identifier(&fact).map_err(|error| ConfigurationError::Invalid {
            name: FACT_TABLE_VAR,
            reason: error.to_string(),
        })?;
        validate_identifier(&dimension).map_err(|error| ConfigurationError::Invalid {
            name: DIMENSION_TABLE_VAR,
            reason: error.to_string(),
        })?;
        Ok(Self { fact, dimension })
    }
}

impl Default for TableNames {
    fn default() -> Self {
        Self {
            fact: String::from(DEFAULT_FACT_TABLE),
            dimension: String::from(DEFAULT_DIMENSION_TABLE),
        }
    }
}

/// Authentication mode used against the warehouse and the Files API.
#[derive(Clone, PartialEq, Eq)]
pub enum WarehouseAuth {
    /// OAuth machine-to-machine client credentials.
    OAuth {
        client_id: String,
        client_secret: String,
    },
    /// Personal access token.
    AccessToken(String),
}

impl WarehouseAuth {
    pub const fn mode(&self) -> &'static str {
        match self {
            Self::OAuth { .. } => "oauth",
            Self::AccessToken(_) => "token",
        }
    }
}

impl Debug for WarehouseAuth {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::OAuth { client_id, .. } => f
                .debug_struct("OAuth")
                .field("client_id", client_id)
                .field("client_secret", &"<redacted>")
                .finish(),
            Self::AccessToken(_) => f.write_str("AccessToken(<redacted>)"),
        }
    }
}

/// Complete credentials for one warehouse connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionCredentials {
    pub hostname: String,
    pub http_path: String,
    pub auth: WarehouseAuth,
}

impl ConnectionCredentials {
    /// `https://` base URL of the workspace.
    pub fn base_url(&self) -> String {
        let host = self
            .hostname
            .trim()
            .trim_start_matches("https://")
            .trim_start_matches("http://")
            .trim_end_matches('/');
        format!("https://{host}")
    }

    /// Warehouse id taken from the last segment of the HTTP path
    /// (`/sql/1.0/warehouses/<id>`).
    pub fn warehouse_id(&self) -> Result<&str, ConfigurationError> {
        self.http_path
            .trim_end_matches('/')
            .rsplit('/')
            .next()
            .filter(|segment| !segment.is_empty())
            .ok_or_else(|| ConfigurationError::Invalid {
                name: HTTP_PATH_VAR,
                reason: String::from("expected /sql/1.0/warehouses/<id>"),
            })
    }
}

/// Immutable process configuration.
#[derive(Clone)]
pub struct Settings {
    hostname: Option<String>,
    http_path: Option<String>,
    access_token: Option<String>,
    client_id: Option<String>,
    client_secret: Option<String>,
    pub volume_root: String,
    pub tables: TableNames,
    pub backend: Backend,
}

impl Debug for Settings {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("hostname", &self.hostname)
            .field("http_path", &self.http_path)
            .field("access_token", &self.access_token.is_some())
            .field("client_id", &self.client_id.is_some())
            .field("client_secret", &self.client_secret.is_some())
            .field("volume_root", &self.volume_root)
            .field("tables", &self.tables)
            .field("backend", &self.backend)
            .finish()
    }
}

impl Settings {
    /// Read settings from the process environment.
    ///
    /// Missing credentials are not an error here; they are reported by
    /// [`Settings::status`] and surface as [`ConfigurationError`] when a
    /// connection is attempted.
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build settings from an arbitrary variable lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigurationError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let read = |name: &str| {
            lookup(name)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };

        let tables = TableNames::new(
            read(FACT_TABLE_VAR).unwrap_or_else(|| String::from(DEFAULT_FACT_TABLE)),
            read(DIMENSION_TABLE_VAR).unwrap_or_else(|| String::from(DEFAULT_DIMENSION_TABLE)),
        )?;

        let backend = match read(BACKEND_VAR).as_deref().map(str::to_ascii_lowercase) {
            None => Backend::Databricks,
            Some(kind) if kind == "databricks" => Backend::Databricks,
            Some(kind) if kind == "duckdb" => Backend::DuckDb(PathBuf::from(
                read(DUCKDB_PATH_VAR).unwrap_or_else(|| String::from(DEFAULT_DUCKDB_PATH)),
            )),
            Some(other) => {
                return Err(ConfigurationError::Invalid {
                    name: BACKEND_VAR,
                    reason: format!("unknown backend '{other}', expected databricks or duckdb"),
                })
            }
        };

        Ok(Self {
            hostname: read(HOSTNAME_VAR),
            http_path: read(HTTP_PATH_VAR),
            access_token: read(TOKEN_VAR),
            client_id: read(CLIENT_ID_VAR),
            client_secret: read(CLIENT_SECRET_VAR),
            volume_root: read(VOLUME_PATH_VAR).unwrap_or_else(|| String::from(DEFAULT_VOLUME_PATH)),
            tables,
            backend,
        })
    }

    #[must_use]
    pub fn with_backend(mut self, backend: Backend) -> Self {
        self.backend = backend;
        self
    }

    #[must_use]
    pub fn with_tables(mut self, tables: TableNames) -> Self {
        self.tables = tables;
        self
    }

    /// Names of required settings that are absent, in reporting order.
    ///
    /// Auth precedence: a complete client-id/secret pair wins, then an access
    /// token. With neither, all three auth variables are reported; with half a
    /// client pair and no token, only the missing half is reported.
    pub fn missing_variables(&self) -> Vec<String> {
        let mut missing = Vec::new();
        if self.hostname.is_none() {
            missing.push(HOSTNAME_VAR);
        }
        if self.http_path.is_none() {
            missing.push(HTTP_PATH_VAR);
        }

        match (
            self.client_id.is_some(),
            self.client_secret.is_some(),
            self.access_token.is_some(),
        ) {
            (true, true, _) | (_, _, true) => {}
            (true, false, false) => missing.push(CLIENT_SECRET_VAR),
            (false, true, false) => missing.push(CLIENT_ID_VAR),
            (false, false, false) => {
                missing.extend([TOKEN_VAR, CLIENT_ID_VAR, CLIENT_SECRET_VAR]);
            }
        }

        missing.into_iter().map(String::from).collect()
    }

    /// Resolve complete credentials or name exactly what is missing.
    pub fn credentials(&self) -> Result<ConnectionCredentials, ConfigurationError> {
        let missing = self.missing_variables();
        if !missing.is_empty() {
            return Err(ConfigurationError::Missing { missing });
        }

        let auth = match (&self.client_id, &self.client_secret, &self.access_token) {
            (Some(client_id), Some(client_secret), _) => WarehouseAuth::OAuth {
                client_id: client_id.clone(),
                client_secret: client_secret.clone(),
            },
            (_, _, Some(token)) => WarehouseAuth::AccessToken(token.clone()),
            _ => {
                return Err(ConfigurationError::Missing {
                    missing: vec![String::from(TOKEN_VAR)],
                })
            }
        };

        Ok(ConnectionCredentials {
            hostname: self.hostname.clone().unwrap_or_default(),
            http_path: self.http_path.clone().unwrap_or_default(),
            auth,
        })
    }

    /// Side-effect-free configuration report; never touches the network.
    pub fn status(&self) -> ConfigStatus {
        let missing = self.missing_variables();
        let configured = missing.is_empty();

        let variables = BTreeMap::from([
            (HOSTNAME_VAR, self.hostname.is_some()),
            (HTTP_PATH_VAR, self.http_path.is_some()),
            (TOKEN_VAR, self.access_token.is_some()),
            (CLIENT_ID_VAR, self.client_id.is_some()),
            (CLIENT_SECRET_VAR, self.client_secret.is_some()),
        ]);

        let auth_mode = if !configured {
            None
        } else if self.client_id.is_some() && self.client_secret.is_some() {
            Some("oauth")
        } else {
            Some("token")
        };

        ConfigStatus {
            status: "ok",
            databricks_configured: configured,
            config_status: if configured {
                "ok"
            } else {
                "configuration_incomplete"
            },
            missing_variables: missing,
            auth_mode,
            variables,
        }
    }
}

/// Health payload: liveness plus configuration completeness.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigStatus {
    pub status: &'static str,
    pub databricks_configured: bool,
    pub config_status: &'static str,
    pub missing_variables: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auth_mode: Option<&'static str>,
    pub variables: BTreeMap<&'static str, bool>,
}
