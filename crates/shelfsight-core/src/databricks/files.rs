//! Unity Catalog volume uploads through the Files API.

use std::sync::Arc;

use async_trait::async_trait;

use crate::config::{ConnectionCredentials, Settings};
use crate::error::ConfigurationError;
use crate::http_client::{HttpAuth, HttpClient, HttpRequest};
use crate::upload::{FileStore, StorageError};

use super::{bearer_token, failure_message};

const FILES_PATH: &str = "/api/2.0/fs/files";

/// [`FileStore`] backed by a Databricks volume.
#[derive(Clone)]
pub struct VolumeFileStore {
    credentials: Result<ConnectionCredentials, ConfigurationError>,
    http: Arc<dyn HttpClient>,
}

impl VolumeFileStore {
    pub fn new(settings: &Settings, http: Arc<dyn HttpClient>) -> Self {
        Self {
            credentials: settings.credentials(),
            http,
        }
    }
}

/// Files API URL for a volume path, each segment percent-encoded.
pub fn files_url(base_url: &str, path: &str) -> String {
    let encoded = path
        .split('/')
        .filter(|segment| !segment.is_empty())
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/");
    format!("{base_url}{FILES_PATH}/{encoded}?overwrite=true")
}

#[async_trait]
impl FileStore for VolumeFileStore {
    async fn put(&self, path: &str, bytes: Vec<u8>) -> Result<(), StorageError> {
        let credentials = self.credentials.as_ref().map_err(|error| match error {
            ConfigurationError::Missing { missing } => StorageError::NotConfigured {
                missing: missing.clone(),
            },
            other => StorageError::Transport(other.to_string()),
        })?;
        let token = bearer_token(self.http.as_ref(), credentials)
            .await
            .map_err(|error| StorageError::Transport(error.to_string()))?;

        let request = HttpRequest::put(files_url(&credentials.base_url(), path))
            .with_auth(&HttpAuth::BearerToken(token))
            .with_header("content-type", "application/octet-stream")
            .with_body(bytes);
        let response = self
            .http
            .execute(request)
            .await
            .map_err(|error| StorageError::Transport(error.to_string()))?;

        if response.is_success() {
            return Ok(());
        }
        Err(StorageError::Remote {
            status: response.status,
            message: failure_message(response.status, &response.body),
            details: (!response.body.is_empty()).then(|| response.body.clone()),
        })
    }
}
