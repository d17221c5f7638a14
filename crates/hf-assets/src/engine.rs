//! Idempotent raw → ready conversion.

use std::path::Path;
use std::sync::Arc;

use hf_av::{Encoder, SubtitleOutcome};
use hf_core::{AssetState, Error, Result, Video, VideoName};

use crate::registry::AssetRegistry;
use crate::store::AssetStore;

/// Produces ready-to-stream assets from raw sources.
///
/// A conversion runs at most once per name at a time: callers that arrive
/// while one is in flight wait for it and then take the ready fast path.
pub struct TranscodeEngine {
    store: Arc<dyn AssetStore>,
    encoder: Arc<dyn Encoder>,
    registry: Arc<AssetRegistry>,
}

impl TranscodeEngine {
    pub fn new(
        store: Arc<dyn AssetStore>,
        encoder: Arc<dyn Encoder>,
        registry: Arc<AssetRegistry>,
    ) -> Self {
        Self {
            store,
            encoder,
            registry,
        }
    }

    pub fn store(&self) -> &Arc<dyn AssetStore> {
        &self.store
    }

    pub fn registry(&self) -> &Arc<AssetRegistry> {
        &self.registry
    }

    /// Names of all ready videos.
    pub async fn list_ready(&self) -> Result<Vec<VideoName>> {
        self.store.list_ready().await
    }

    /// Make `name` streamable and return its playlist URL.
    ///
    /// # Errors
    ///
    /// - [`Error::NotFound`] when there is neither a ready asset nor a raw
    ///   source.
    /// - [`Error::Conversion`] when encoding fails now or failed earlier in
    ///   this process. The raw source is kept in both cases.
    pub async fn convert(&self, name: &VideoName) -> Result<String> {
        // Unlocked: a delete may be running, so the registry is left alone.
        if self.store.ready_exists(name) {
            return Ok(name.stream_path());
        }

        let _guard = self.registry.lock(name).await;
        self.convert_locked(name).await
    }

    /// [`convert`](Self::convert) for a caller that already holds the name's lock.
    pub(crate) async fn convert_locked(&self, name: &VideoName) -> Result<String> {
        // Another caller may have finished the conversion while we waited.
        if self.store.ready_exists(name) {
            self.note_ready(name);
            return Ok(name.stream_path());
        }

        if let Some(entry) = self.registry.get(name) {
            if entry.state == AssetState::Failed {
                let message = entry
                    .last_error
                    .unwrap_or_else(|| "previous conversion failed".into());
                return Err(Error::conversion(name, message));
            }
        }

        let Some(raw) = self.store.raw_path(name) else {
            return Err(Error::not_found("video", name));
        };

        self.registry.set(name, AssetState::Converting);
        tracing::info!(name = %name, raw = %raw.display(), "Converting raw source to HLS");

        match self.produce(name, &raw).await {
            Ok(()) => {
                // The playlist is committed, so the source is no longer needed.
                if let Err(e) = self.store.remove_raw(name) {
                    tracing::warn!(name = %name, error = %e, "Failed to remove converted raw source");
                }
                self.registry.set(name, AssetState::Ready);
                tracing::info!(name = %name, "Conversion complete");
                Ok(name.stream_path())
            }
            Err(e) => {
                if let Err(cleanup) = self.store.remove_derived(name).await {
                    tracing::warn!(name = %name, error = %cleanup, "Failed to remove partial output");
                }
                let message = e.to_string();
                tracing::error!(name = %name, error = %message, "Conversion failed; raw source kept");
                self.registry.fail(name, message.clone());
                Err(Error::conversion(name, message))
            }
        }
    }

    /// Encode into a fresh derived directory and commit the playlist last.
    async fn produce(&self, name: &VideoName, raw: &Path) -> Result<()> {
        self.store.remove_derived(name).await?;
        self.store.ensure_derived_dir(name)?;

        let staging = self.store.staging_playlist_path(name);
        self.encoder.transcode_av(raw, &staging).await?;

        let subtitle = self.store.subtitle_path(name);
        match self.encoder.extract_subtitle(raw, &subtitle).await {
            Ok(SubtitleOutcome::Extracted) => {
                tracing::debug!(name = %name, "Subtitle track extracted");
            }
            Ok(SubtitleOutcome::NoSubtitle) => {
                tracing::debug!(name = %name, "No subtitle track");
            }
            Err(e) => {
                tracing::warn!(name = %name, error = %e, "Subtitle extraction failed; continuing without subtitles");
            }
        }

        self.store.commit_playlist(name)
    }

    fn note_ready(&self, name: &VideoName) {
        if self.registry.state(name) != Some(AssetState::Ready) {
            self.registry.set(name, AssetState::Ready);
        }
    }

    /// Current view of `name`, merging disk state with the registry.
    pub fn status(&self, name: &VideoName) -> Video {
        let entry = self.registry.get(name);
        let raw_path = self.store.raw_path(name);
        let ready = self.store.ready_exists(name);

        let state = if ready {
            AssetState::Ready
        } else {
            match entry.as_ref().map(|e| e.state) {
                Some(AssetState::Converting) => AssetState::Converting,
                Some(AssetState::Failed) => AssetState::Failed,
                _ if raw_path.is_some() => AssetState::Raw,
                _ => AssetState::Unknown,
            }
        };

        Video {
            name: name.clone(),
            state,
            raw_path,
            derived_dir: self.store.derived_dir(name),
            playlist: ready.then(|| name.stream_path()),
            last_error: entry.as_ref().and_then(|e| e.last_error.clone()),
            updated_at: entry.map(|e| e.updated_at),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{FakeEncoder, TestAssets};
    use std::time::Duration;

    fn name(s: &str) -> VideoName {
        VideoName::new(s).unwrap()
    }

    #[tokio::test]
    async fn convert_twice_encodes_once() {
        let assets = TestAssets::new(FakeEncoder::new());
        assets.put_raw("sample", b"video");

        let first = assets.engine.convert(&name("sample")).await.unwrap();
        let second = assets.engine.convert(&name("sample")).await.unwrap();

        assert_eq!(first, "/hls/sample/index.m3u8");
        assert_eq!(first, second);
        assert_eq!(assets.encoder.transcode_calls(), 1);
    }

    #[tokio::test]
    async fn success_commits_playlist_and_removes_raw() {
        let assets = TestAssets::new(FakeEncoder::new().with_subtitles());
        assets.put_raw("sample", b"video");
        let x = name("sample");

        assets.engine.convert(&x).await.unwrap();

        let store = assets.engine.store();
        assert!(store.ready_exists(&x));
        assert!(!store.raw_exists(&x));
        assert!(store.subtitle_path(&x).is_file());
        assert!(!store.staging_playlist_path(&x).exists());
        assert_eq!(assets.engine.status(&x).state, AssetState::Ready);
        assert_eq!(store.list_ready().await.unwrap(), vec![x]);
    }

    #[tokio::test]
    async fn missing_source_is_not_found() {
        let assets = TestAssets::new(FakeEncoder::new());
        let err = assets.engine.convert(&name("ghost")).await.unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }), "{err}");
        assert_eq!(assets.encoder.transcode_calls(), 0);
        assert_eq!(assets.engine.status(&name("ghost")).state, AssetState::Unknown);
    }

    #[tokio::test]
    async fn failed_encode_keeps_raw_and_marks_failed() {
        let assets = TestAssets::new(FakeEncoder::new().failing());
        assets.put_raw("broken", b"garbage");
        let x = name("broken");

        let err = assets.engine.convert(&x).await.unwrap_err();
        assert!(matches!(err, Error::Conversion { .. }), "{err}");

        let store = assets.engine.store();
        assert!(store.raw_exists(&x));
        assert!(!store.ready_exists(&x));
        assert!(!store.derived_dir(&x).exists());

        let status = assets.engine.status(&x);
        assert_eq!(status.state, AssetState::Failed);
        assert!(status.last_error.unwrap().contains("simulated"));
    }

    #[tokio::test]
    async fn failed_state_is_sticky_until_reset() {
        let assets = TestAssets::new(FakeEncoder::new().failing());
        assets.put_raw("broken", b"garbage");
        let x = name("broken");

        assert!(assets.engine.convert(&x).await.is_err());
        assert!(assets.engine.convert(&x).await.is_err());
        assert_eq!(assets.encoder.transcode_calls(), 1);

        // A new raw source (upload or restart) clears the failure.
        assets.encoder.set_failing(false);
        assets.engine.registry().set(&x, AssetState::Raw);
        assets.engine.convert(&x).await.unwrap();
        assert_eq!(assets.encoder.transcode_calls(), 2);
    }

    #[tokio::test]
    async fn subtitle_failure_does_not_abort() {
        let assets = TestAssets::new(FakeEncoder::new().failing_subtitles());
        assets.put_raw("nosubs", b"video");
        let x = name("nosubs");

        let path = assets.engine.convert(&x).await.unwrap();
        assert_eq!(path, "/hls/nosubs/index.m3u8");
        assert!(!assets.engine.store().subtitle_path(&x).exists());
        assert_eq!(assets.encoder.subtitle_calls(), 1);
    }

    #[tokio::test]
    async fn stale_partial_output_is_replaced() {
        let assets = TestAssets::new(FakeEncoder::new());
        assets.put_raw("x", b"video");
        let x = name("x");
        let dir = assets.engine.store().ensure_derived_dir(&x).unwrap();
        std::fs::write(dir.join("seg09999.ts"), b"stale").unwrap();

        assets.engine.convert(&x).await.unwrap();
        assert!(!dir.join("seg09999.ts").exists());
    }

    #[tokio::test]
    async fn ready_fast_path_leaves_registry_alone() {
        let assets = TestAssets::new(FakeEncoder::new());
        assets.put_ready("x");
        let x = name("x");

        assert_eq!(assets.engine.convert(&x).await.unwrap(), "/hls/x/index.m3u8");
        assert!(assets.engine.registry().get(&x).is_none());

        // A stale record is not overwritten without the lock either.
        assets.engine.registry().set(&x, AssetState::Raw);
        assets.engine.convert(&x).await.unwrap();
        assert_eq!(assets.engine.registry().state(&x), Some(AssetState::Raw));
        assert_eq!(assets.encoder.transcode_calls(), 0);
    }

    #[tokio::test]
    async fn waiter_records_ready_under_lock() {
        let assets = TestAssets::new(FakeEncoder::new());
        assets.put_ready("x");
        let x = name("x");

        let _guard = assets.engine.registry().lock(&x).await;
        assets.engine.convert_locked(&x).await.unwrap();
        assert_eq!(assets.engine.registry().state(&x), Some(AssetState::Ready));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_converts_share_one_encode() {
        let assets = TestAssets::new(FakeEncoder::new().with_delay(Duration::from_millis(100)));
        assets.put_raw("x", b"video");
        let x = name("x");

        let (a, b) = tokio::join!(assets.engine.convert(&x), assets.engine.convert(&x));

        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(assets.encoder.transcode_calls(), 1);
        assert_eq!(assets.engine.registry().active_locks(), 0);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn many_spawned_converts_share_one_encode() {
        let assets = TestAssets::new(FakeEncoder::new().with_delay(Duration::from_millis(50)));
        assets.put_raw("x", b"video");
        let engine = Arc::clone(&assets.engine);

        let handles: Vec<_> = (0..6)
            .map(|_| {
                let engine = Arc::clone(&engine);
                tokio::spawn(async move { engine.convert(&VideoName::new("x").unwrap()).await })
            })
            .collect();
        let results = futures::future::join_all(handles).await;

        for result in results {
            assert_eq!(result.unwrap().unwrap(), "/hls/x/index.m3u8");
        }
        assert_eq!(assets.encoder.transcode_calls(), 1);
    }
}
