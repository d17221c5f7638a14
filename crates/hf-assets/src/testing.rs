//! Test doubles: a scriptable [`FakeEncoder`] and temp-directory storage.
//!
//! Compiled for this crate's unit tests and, with the `testing` feature, for
//! downstream integration tests.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use hf_av::{Encoder, SubtitleOutcome};
use hf_core::config::StorageConfig;
use hf_core::Error;

use crate::engine::TranscodeEngine;
use crate::services::AssetServices;
use crate::store::{AssetStore, FsAssetStore};

const SEGMENT_COUNT: usize = 2;

/// [`Encoder`] that writes a small, valid-looking HLS playlist and segments
/// without running any external tool.
#[derive(Debug, Default)]
pub struct FakeEncoder {
    transcode_calls: AtomicUsize,
    subtitle_calls: AtomicUsize,
    failing: AtomicBool,
    failing_subtitles: bool,
    with_subtitles: bool,
    delay: Duration,
}

impl FakeEncoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every `transcode_av` call.
    pub fn failing(self) -> Self {
        self.failing.store(true, Ordering::SeqCst);
        self
    }

    /// Fail every `extract_subtitle` call.
    pub fn failing_subtitles(mut self) -> Self {
        self.failing_subtitles = true;
        self
    }

    /// Report a subtitle track and write a WebVTT file.
    pub fn with_subtitles(mut self) -> Self {
        self.with_subtitles = true;
        self
    }

    /// Sleep this long inside `transcode_av`.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    pub fn transcode_calls(&self) -> usize {
        self.transcode_calls.load(Ordering::SeqCst)
    }

    pub fn subtitle_calls(&self) -> usize {
        self.subtitle_calls.load(Ordering::SeqCst)
    }
}

fn playlist_body() -> String {
    let mut body = String::from(
        "#EXTM3U\n#EXT-X-VERSION:3\n#EXT-X-TARGETDURATION:6\n#EXT-X-PLAYLIST-TYPE:VOD\n",
    );
    for i in 0..SEGMENT_COUNT {
        body.push_str(&format!("#EXTINF:6.000000,\nseg{i:05}.ts\n"));
    }
    body.push_str("#EXT-X-ENDLIST\n");
    body
}

#[async_trait]
impl Encoder for FakeEncoder {
    async fn transcode_av(&self, raw: &Path, playlist: &Path) -> hf_core::Result<()> {
        self.transcode_calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(Error::tool("fake-encoder", "simulated encode failure"));
        }
        if !raw.is_file() {
            return Err(Error::tool(
                "fake-encoder",
                format!("{} does not exist", raw.display()),
            ));
        }

        let dir = playlist.parent().unwrap_or_else(|| Path::new("."));
        for i in 0..SEGMENT_COUNT {
            tokio::fs::write(dir.join(format!("seg{i:05}.ts")), vec![0x47u8; 188]).await?;
        }
        tokio::fs::write(playlist, playlist_body()).await?;
        Ok(())
    }

    async fn extract_subtitle(
        &self,
        _raw: &Path,
        subtitle: &Path,
    ) -> hf_core::Result<SubtitleOutcome> {
        self.subtitle_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing_subtitles {
            return Err(Error::tool("fake-encoder", "simulated subtitle failure"));
        }
        if self.with_subtitles {
            tokio::fs::write(subtitle, "WEBVTT\n\n00:00.000 --> 00:01.000\nhello\n").await?;
            return Ok(SubtitleOutcome::Extracted);
        }
        Ok(SubtitleOutcome::NoSubtitle)
    }
}

/// Storage config rooted at `root`: raw files in `root/raw`, HLS in `root/hls`.
pub fn storage_config(root: &Path) -> StorageConfig {
    StorageConfig {
        raw_dir: root.join("raw"),
        derived_dir: root.join("hls"),
        ..StorageConfig::default()
    }
}

/// A temp-directory store wired to a [`FakeEncoder`].
pub struct TestAssets {
    pub services: AssetServices,
    pub engine: Arc<TranscodeEngine>,
    pub encoder: Arc<FakeEncoder>,
    pub store: Arc<FsAssetStore>,
    _dir: tempfile::TempDir,
}

impl TestAssets {
    pub fn new(encoder: FakeEncoder) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let config = storage_config(dir.path());
        let store = Arc::new(FsAssetStore::new(&config));
        store.init().expect("failed to create storage roots");
        let encoder = Arc::new(encoder);

        let services = AssetServices::new(
            Arc::clone(&store) as Arc<dyn AssetStore>,
            Arc::clone(&encoder) as Arc<dyn hf_av::Encoder>,
            config.normalized_extensions(),
        );

        Self {
            engine: Arc::clone(&services.engine),
            services,
            encoder,
            store,
            _dir: dir,
        }
    }

    /// Drop a raw `<name>.mkv` into the raw root, bypassing ingestion.
    pub fn put_raw(&self, name: &str, bytes: &[u8]) -> PathBuf {
        let path = self.store.raw_root().join(format!("{name}.mkv"));
        std::fs::write(&path, bytes).expect("failed to write raw fixture");
        path
    }

    /// Create a committed HLS directory for `name`, bypassing the engine.
    pub fn put_ready(&self, name: &str) -> PathBuf {
        let dir = self.store.derived_root().join(name);
        std::fs::create_dir_all(&dir).expect("failed to create derived fixture");
        std::fs::write(dir.join(hf_core::PLAYLIST_FILE), playlist_body())
            .expect("failed to write playlist fixture");
        dir
    }
}
