use shelfsight_core::{ConfigurationError, CoreError};
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Configuration(#[from] ConfigurationError),

    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error("server error: {0}")]
    Server(std::io::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Core(CoreError::Validation(_)) => 2,
            Self::Configuration(_) | Self::Core(CoreError::Configuration(_)) => 3,
            Self::Core(_) => 4,
            Self::Serialization(_) => 4,
            Self::Server(_) => 6,
            Self::Io(_) => 10,
        }
    }
}
