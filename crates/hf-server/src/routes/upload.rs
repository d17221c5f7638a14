//! Multipart upload route.

use std::io;

use axum::extract::{Multipart, State};
use axum::http::StatusCode;
use axum::Json;
use futures::TryStreamExt;
use serde::Serialize;
use tokio_util::io::StreamReader;

use hf_core::Error;

use crate::context::AppContext;
use crate::error::AppError;

/// Name of the multipart field carrying the video.
const FILE_FIELD: &str = "file";

#[derive(Debug, Serialize)]
pub struct UploadResponse {
    pub success: bool,
    pub filename: String,
    pub playlist: String,
}

/// POST /api/upload
///
/// Streams the `file` field to the raw store and converts it before
/// responding.
pub async fn upload_video(
    State(ctx): State<AppContext>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<UploadResponse>), AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| Error::Validation(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let filename = field.file_name().unwrap_or_default().to_string();
        let reader = StreamReader::new(field.map_err(io::Error::other));
        futures::pin_mut!(reader);

        let receipt = ctx.services.ingest.ingest(&filename, reader).await?;
        return Ok((
            StatusCode::CREATED,
            Json(UploadResponse {
                success: true,
                filename: receipt.filename,
                playlist: receipt.playlist,
            }),
        ));
    }

    Err(Error::Validation("No file part".into()).into())
}
