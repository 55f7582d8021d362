use axum::{
    extract::{multipart::MultipartError, Multipart, State},
    http::StatusCode,
    Json,
};
use serde::Serialize;
use tracing::{info, instrument, warn};

use super::services::{is_image, store_images, UploadItem, MAX_FILES, MAX_FILE_BYTES};
use crate::{error::ApiError, response::Envelope, state::AppState};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Uploaded {
    pub image_url: String,
    pub filename: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UploadedMany {
    pub image_urls: Vec<String>,
    pub filenames: Vec<String>,
}

fn multipart_error(e: MultipartError) -> ApiError {
    if e.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(e.body_text())
    } else {
        ApiError::Validation(e.body_text())
    }
}

/// Collects the files sent under `field`. Other fields are ignored.
async fn collect_images(
    mp: &mut Multipart,
    field_name: &str,
    max_files: usize,
) -> Result<Vec<UploadItem>, ApiError> {
    let mut files = Vec::new();
    while let Some(field) = mp.next_field().await.map_err(multipart_error)? {
        if field.name() != Some(field_name) {
            continue;
        }
        let content_type = field
            .content_type()
            .map(|s| s.to_string())
            .unwrap_or_else(|| "application/octet-stream".into());
        if !is_image(&content_type) {
            warn!(%content_type, "non-image upload refused");
            return Err(ApiError::Validation("only image files are allowed".into()));
        }
        if files.len() == max_files {
            return Err(ApiError::Validation(format!(
                "at most {max_files} files per upload"
            )));
        }
        let body = field.bytes().await.map_err(multipart_error)?;
        if body.len() > MAX_FILE_BYTES {
            return Err(ApiError::PayloadTooLarge(format!(
                "file exceeds {} MiB",
                MAX_FILE_BYTES / (1024 * 1024)
            )));
        }
        files.push(UploadItem { body, content_type });
    }
    if files.is_empty() {
        return Err(ApiError::Validation(format!("{field_name} is required")));
    }
    Ok(files)
}

#[instrument(skip(state, mp))]
pub async fn upload(
    State(state): State<AppState>,
    mut mp: Multipart,
) -> Result<Json<Envelope<Uploaded>>, ApiError> {
    let files = collect_images(&mut mp, "image", 1).await?;
    let img = store_images(state.storage.as_ref(), files)
        .await?
        .into_iter()
        .next()
        .ok_or_else(|| anyhow::anyhow!("no image stored"))?;
    info!(filename = %img.filename, "image uploaded");
    Ok(Json(Envelope::ok(
        "image uploaded",
        Uploaded {
            image_url: img.url,
            filename: img.filename,
        },
    )))
}

#[instrument(skip(state, mp))]
pub async fn upload_multiple(
    State(state): State<AppState>,
    mut mp: Multipart,
) -> Result<Json<Envelope<UploadedMany>>, ApiError> {
    let files = collect_images(&mut mp, "images", MAX_FILES).await?;
    let stored = store_images(state.storage.as_ref(), files).await?;
    info!(count = stored.len(), "images uploaded");
    let (image_urls, filenames) = stored.into_iter().map(|s| (s.url, s.filename)).unzip();
    Ok(Json(Envelope::ok(
        "images uploaded",
        UploadedMany {
            image_urls,
            filenames,
        },
    )))
}
