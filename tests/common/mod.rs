//! Shared test harness for integration tests.
//!
//! Provides [`TestHarness`], which builds an [`AppContext`] over temporary
//! storage and a [`FakeEncoder`], and can start axum on a random port for
//! HTTP-level testing.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use hf_assets::testing::{storage_config, FakeEncoder};
use hf_assets::{AssetStore, FsAssetStore};
use hf_av::ToolRegistry;
use hf_core::config::Config;
use hf_server::context::AppContext;
use hf_server::router::build_router;

/// Test harness wrapping an [`AppContext`] over temporary directories.
pub struct TestHarness {
    pub ctx: AppContext,
    pub encoder: Arc<FakeEncoder>,
    pub store: Arc<FsAssetStore>,
    _dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn new() -> Self {
        Self::with_encoder(FakeEncoder::new())
    }

    pub fn with_encoder(encoder: FakeEncoder) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let mut config = Config::default();
        config.storage = storage_config(dir.path());

        let store = Arc::new(FsAssetStore::new(&config.storage));
        store.init().expect("failed to create storage roots");
        let encoder = Arc::new(encoder);

        let ctx = AppContext::new(
            config,
            Arc::clone(&store) as Arc<dyn AssetStore>,
            Arc::clone(&encoder) as Arc<dyn hf_av::Encoder>,
            Arc::new(ToolRegistry::default()),
        );

        Self {
            ctx,
            encoder,
            store,
            _dir: dir,
        }
    }

    /// Start an axum server on a random port and return the harness together
    /// with the bound socket address.
    pub async fn with_server() -> (Self, SocketAddr) {
        Self::new().serve().await
    }

    /// Start an axum server for this harness on a random port.
    pub async fn serve(self) -> (Self, SocketAddr) {
        let app = build_router(self.ctx.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("failed to bind random port");
        let addr = listener.local_addr().expect("failed to get local addr");

        tokio::spawn(async move {
            axum::serve(listener, app).await.ok();
        });

        (self, addr)
    }

    /// Drop a raw `<name>.mkv` straight into the raw root.
    pub fn put_raw(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.store.raw_root().join(format!("{name}.mkv"));
        std::fs::write(&path, bytes).expect("failed to write raw fixture");
        path
    }
}

/// Multipart form with `bytes` in the `file` field under `filename`.
pub fn upload_form(filename: &str, bytes: &[u8]) -> reqwest::multipart::Form {
    let part = reqwest::multipart::Part::bytes(bytes.to_vec()).file_name(filename.to_string());
    reqwest::multipart::Form::new().part("file", part)
}
