//! Batch delete route.

use axum::extract::State;
use axum::Json;
use serde::{Deserialize, Serialize};

use hf_assets::DeleteFailure;

use crate::context::AppContext;
use crate::error::AppError;

#[derive(Debug, Deserialize)]
pub struct DeleteRequest {
    #[serde(default)]
    pub videos: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct DeleteResponse {
    /// False when any name could not be deleted.
    pub success: bool,
    pub deleted: Vec<String>,
    pub failed: Vec<DeleteFailure>,
}

/// POST /api/delete
pub async fn delete_videos(
    State(ctx): State<AppContext>,
    Json(req): Json<DeleteRequest>,
) -> Result<Json<DeleteResponse>, AppError> {
    let report = ctx.services.lifecycle.delete_all(&req.videos).await?;
    Ok(Json(DeleteResponse {
        success: report.is_complete(),
        deleted: report.deleted,
        failed: report.failed,
    }))
}
