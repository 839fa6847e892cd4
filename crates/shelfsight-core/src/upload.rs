//! CSV upload validation and forwarding.
//!
//! Checks run in a fixed order and the first failure wins: a file is present,
//! its name ends in `.csv`, and its header row has a `retailer` column. Only
//! then are the bytes handed to a [`FileStore`].

use async_trait::async_trait;
use serde::Serialize;
use thiserror::Error;

use crate::error::{ConfigurationError, CoreError, ValidationError};

/// Column every uploaded file must carry.
pub const REQUIRED_COLUMN: &str = "retailer";

/// An uploaded file, held in memory for the duration of one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadedFile {
    pub original_name: String,
    pub bytes: Vec<u8>,
}

impl UploadedFile {
    pub fn new(original_name: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            original_name: original_name.into(),
            bytes: bytes.into(),
        }
    }
}

/// Successful upload outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UploadReceipt {
    pub path: String,
}

/// Failure reported by a [`FileStore`].
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("file storage is not configured, missing: {}", missing.join(", "))]
    NotConfigured { missing: Vec<String> },
    #[error("file storage unreachable: {0}")]
    Transport(String),
    #[error("{message}")]
    Remote {
        status: u16,
        message: String,
        details: Option<String>,
    },
}

impl From<StorageError> for CoreError {
    fn from(error: StorageError) -> Self {
        match error {
            StorageError::NotConfigured { missing } => {
                Self::Configuration(ConfigurationError::Missing { missing })
            }
            StorageError::Transport(message) => Self::Upload {
                message,
                details: None,
            },
            StorageError::Remote {
                message, details, ..
            } => Self::Upload { message, details },
        }
    }
}

/// Remote object storage that accepts whole files.
#[async_trait]
pub trait FileStore: Send + Sync {
    /// Write `bytes` to `path`, replacing any existing file.
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<(), StorageError>;
}

/// Validate an upload without touching storage.
pub fn validate(file: Option<&UploadedFile>) -> Result<&UploadedFile, ValidationError> {
    let file = file.ok_or(ValidationError::MissingFile)?;
    if file.original_name.trim().is_empty() {
        return Err(ValidationError::MissingFile);
    }

    let is_csv = file
        .original_name
        .rsplit_once('.')
        .is_some_and(|(_, extension)| extension.eq_ignore_ascii_case("csv"));
    if !is_csv {
        return Err(ValidationError::NotCsv {
            file_name: file.original_name.clone(),
        });
    }

    if !header_has_column(&file.bytes, REQUIRED_COLUMN)? {
        return Err(ValidationError::MissingRetailerColumn);
    }
    Ok(file)
}

/// Read only the header record and look for `column` (whitespace-trimmed).
fn header_has_column(bytes: &[u8], column: &str) -> Result<bool, ValidationError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);
    let headers = reader
        .headers()
        .map_err(|error| ValidationError::UnreadableCsv(error.to_string()))?;
    Ok(headers
        .iter()
        .any(|header| header.trim_start_matches('\u{feff}').trim() == column))
}

/// Target path for an uploaded file under the volume root.
pub fn target_path(volume_root: &str, original_name: &str) -> String {
    format!("{}/{}", volume_root.trim_end_matches('/'), original_name)
}

/// Validate `file` and forward it to `{volume_root}/{original_name}`.
pub async fn upload(
    store: &dyn FileStore,
    volume_root: &str,
    file: Option<UploadedFile>,
) -> Result<UploadReceipt, CoreError> {
    let file = validate(file.as_ref())?;
    let path = target_path(volume_root, &file.original_name);

    tracing::info!(path = %path, bytes = file.bytes.len(), "forwarding upload");
    store.put(&path, file.bytes.clone()).await.map_err(|error| {
        tracing::warn!(path = %path, error = %error, "upload rejected by storage");
        CoreError::from(error)
    })?;

    Ok(UploadReceipt { path })
}
