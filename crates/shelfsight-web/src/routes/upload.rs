//! CSV upload endpoint

use axum::extract::multipart::MultipartRejection;
use axum::extract::{DefaultBodyLimit, Multipart, State};
use axum::{routing::post, Json, Router};
use shelfsight_core::{upload, UploadedFile};

use crate::error::{ApiError, Result};
use crate::state::AppState;
use crate::types::UploadResponse;

/// Multipart field carrying the file.
const FILE_FIELD: &str = "file";
const MAX_UPLOAD_BYTES: usize = 64 * 1024 * 1024;

pub fn routes() -> Router<AppState> {
    Router::new().route(
        "/api/upload",
        post(upload_file).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
    )
}

/// POST /api/upload
async fn upload_file(
    State(state): State<AppState>,
    multipart: std::result::Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>> {
    let mut multipart =
        multipart.map_err(|rejection| ApiError::BadRequest(rejection.body_text()))?;
    let mut file = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|error| ApiError::BadRequest(error.body_text()))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }
        let Some(name) = field.file_name().map(str::to_string) else {
            continue;
        };
        let bytes = field
            .bytes()
            .await
            .map_err(|error| ApiError::BadRequest(error.body_text()))?;
        file = Some(UploadedFile::new(name, bytes.to_vec()));
        break;
    }

    let receipt = upload(state.files.as_ref(), &state.settings.volume_root, file).await?;
    Ok(Json(UploadResponse {
        success: true,
        message: String::from("File uploaded successfully"),
        path: receipt.path,
    }))
}
