//! Catalog routes.

use axum::extract::{Path, State};
use axum::Json;

use hf_core::{Video, VideoName};

use crate::context::AppContext;
use crate::error::AppError;

/// GET /api/videos
///
/// Names of all ready videos.
pub async fn list_videos(State(ctx): State<AppContext>) -> Result<Json<Vec<String>>, AppError> {
    let names = ctx
        .services
        .engine
        .list_ready()
        .await?
        .into_iter()
        .map(|n| n.as_str().to_string())
        .collect();
    Ok(Json(names))
}

/// GET /api/videos/{name}
///
/// Lifecycle status of one video, including unknown names.
pub async fn get_video(
    State(ctx): State<AppContext>,
    Path(name): Path<String>,
) -> Result<Json<Video>, AppError> {
    let name = VideoName::new(name)?;
    Ok(Json(ctx.services.engine.status(&name)))
}
