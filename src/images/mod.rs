use axum::{extract::DefaultBodyLimit, routing::post, Router};

use crate::state::AppState;

pub mod handlers;
pub mod services;

use services::{MAX_FILES, MAX_FILE_BYTES};

// Multipart framing on top of the file bytes.
const ENVELOPE_SLACK: usize = 1024 * 1024;

pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/upload",
            post(handlers::upload).layer(DefaultBodyLimit::max(MAX_FILE_BYTES + ENVELOPE_SLACK)),
        )
        .route(
            "/upload-multiple",
            post(handlers::upload_multiple)
                .layer(DefaultBodyLimit::max(MAX_FILES * MAX_FILE_BYTES + ENVELOPE_SLACK)),
        )
}
