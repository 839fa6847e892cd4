use shelfsight_warehouse::WarehouseError;
use thiserror::Error;

/// Input rejected before any warehouse or storage call.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("query must not be empty")]
    EmptyQuery,
    #[error("no file uploaded")]
    MissingFile,
    #[error("only .csv files are accepted: '{file_name}'")]
    NotCsv { file_name: String },
    #[error("CSV header must include a 'retailer' column")]
    MissingRetailerColumn,
    #[error("CSV header could not be read: {0}")]
    UnreadableCsv(String),
    #[error("invalid week '{value}', expected 'Wo Mon DD YYYY' or YYYY-MM-DD")]
    InvalidWeek { value: String },
    #[error("unknown filter '{value}', expected one of retailers, campaigns, keywords, weeks")]
    UnknownFacet { value: String },
    #[error("{0}")]
    Rejected(String),
}

/// Required settings are absent or unusable. Raised before any network I/O.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigurationError {
    #[error("Databricks configuration incomplete, missing: {}", missing.join(", "))]
    Missing { missing: Vec<String> },
    #[error("invalid value for {name}: {reason}")]
    Invalid { name: &'static str, reason: String },
}

/// Top-level error type for core operations.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error(transparent)]
    Validation(#[from] ValidationError),

    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error("query execution failed: {0}")]
    Execution(WarehouseError),

    #[error("upload failed: {message}")]
    Upload {
        message: String,
        details: Option<String>,
    },
}

impl CoreError {
    /// Remote error detail carried alongside the message, if any.
    pub fn details(&self) -> Option<String> {
        match self {
            Self::Execution(error) => error.details().map(str::to_string),
            Self::Upload { details, .. } => details.clone(),
            Self::Configuration(ConfigurationError::Missing { missing }) => {
                Some(missing.join(", "))
            }
            _ => None,
        }
    }
}

impl From<WarehouseError> for CoreError {
    fn from(error: WarehouseError) -> Self {
        match error {
            WarehouseError::NotConfigured { missing } => {
                Self::Configuration(ConfigurationError::Missing { missing })
            }
            WarehouseError::QueryRejected(message) => {
                Self::Validation(ValidationError::Rejected(message))
            }
            other => Self::Execution(other),
        }
    }
}
