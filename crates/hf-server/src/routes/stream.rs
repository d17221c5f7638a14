//! Stream route: make a video playable and return its playlist URL.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;

use hf_core::VideoName;

use crate::context::AppContext;
use crate::error::AppError;

#[derive(Debug, Serialize)]
pub struct StreamResponse {
    pub playlist: String,
}

/// GET /api/stream/{name}
///
/// Converts the raw source on first request; later requests return at once.
pub async fn stream_video(
    State(ctx): State<AppContext>,
    Path(name): Path<String>,
) -> Result<Json<StreamResponse>, AppError> {
    let name = VideoName::new(name)?;
    let playlist = ctx.services.engine.convert(&name).await?;
    Ok(Json(StreamResponse { playlist }))
}
