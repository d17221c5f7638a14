//! Axum router construction.
//!
//! Builds the application router with the API routes, the HLS file tree,
//! middleware layers, and optional static UI serving.

use axum::body::Body;
use axum::extract::DefaultBodyLimit;
use axum::handler::HandlerWithoutStateExt;
use axum::http::{HeaderName, Request, StatusCode};
use axum::response::IntoResponse;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::json;
use tower::ServiceBuilder;
use tower_http::cors::{Any, CorsLayer};
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::trace::TraceLayer;

use hf_core::HLS_ROUTE_PREFIX;

use crate::context::AppContext;
use crate::routes;

/// Header carrying the per-request identifier, generated when absent.
pub static X_REQUEST_ID: HeaderName = HeaderName::from_static("x-request-id");

/// Build the complete axum router.
pub fn build_router(ctx: AppContext) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let upload_limit = usize::try_from(ctx.config.server.max_upload_bytes).unwrap_or(usize::MAX);

    let api = Router::new()
        .route("/videos", get(routes::videos::list_videos))
        .route("/videos/{name}", get(routes::videos::get_video))
        .route("/stream/{name}", get(routes::stream::stream_video))
        .route(
            "/upload",
            post(routes::upload::upload_video).layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/delete", post(routes::delete::delete_videos));

    // Segment and playlist files straight from the derived root.
    let hls = ServeDir::new(&ctx.config.storage.derived_dir)
        .not_found_service(hls_not_found.into_service());

    let static_dir = ctx.config.server.static_dir.clone();

    let mut app = Router::new()
        .route("/health", get(routes::health::health_check))
        .nest("/api", api)
        .nest_service(HLS_ROUTE_PREFIX, hls)
        .layer(cors)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(X_REQUEST_ID.clone(), MakeRequestUuid))
                .layer(TraceLayer::new_for_http().make_span_with(request_span))
                .layer(PropagateRequestIdLayer::new(X_REQUEST_ID.clone())),
        )
        .with_state(ctx);

    // Static file serving for the UI.
    if let Some(dir) = static_dir {
        if dir.exists() {
            tracing::info!("Serving static files from {}", dir.display());
            let index_path = dir.join("index.html");
            app = app.fallback_service(
                ServeDir::new(&dir)
                    .append_index_html_on_directories(true)
                    .not_found_service(ServeFile::new(index_path)),
            );
        } else {
            tracing::warn!("Static directory {} does not exist", dir.display());
        }
    }

    app
}

fn request_span(request: &Request<Body>) -> tracing::Span {
    let request_id = request
        .headers()
        .get(&X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("-");
    tracing::info_span!(
        "request",
        method = %request.method(),
        uri = %request.uri(),
        request_id = %request_id,
    )
}

async fn hls_not_found() -> impl IntoResponse {
    (
        StatusCode::NOT_FOUND,
        Json(json!({ "error": "HLS file not found", "code": "not_found" })),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use hf_assets::testing::{storage_config, FakeEncoder};
    use hf_assets::{AssetStore, FsAssetStore};
    use hf_av::ToolRegistry;
    use hf_core::config::Config;
    use tower::ServiceExt;

    fn app(root: &std::path::Path) -> Router {
        let mut config = Config::default();
        config.storage = storage_config(root);
        let store = FsAssetStore::new(&config.storage);
        store.init().unwrap();
        let ctx = AppContext::new(
            config,
            Arc::new(store) as Arc<dyn AssetStore>,
            Arc::new(FakeEncoder::new()),
            Arc::new(ToolRegistry::default()),
        );
        build_router(ctx)
    }

    #[tokio::test]
    async fn health_is_ok() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path())
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn client_request_id_is_echoed() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path())
            .oneshot(
                Request::get("/health")
                    .header("x-request-id", "req-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.headers()["x-request-id"], "req-123");
    }

    #[tokio::test]
    async fn missing_hls_file_is_json_404() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path())
            .oneshot(
                Request::get("/hls/nothing/index.m3u8")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            response.headers()["content-type"],
            "application/json"
        );
    }

    #[tokio::test]
    async fn invalid_stream_name_is_400() {
        let dir = tempfile::tempdir().unwrap();
        let response = app(dir.path())
            .oneshot(Request::get("/api/stream/.hidden").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    }
}
