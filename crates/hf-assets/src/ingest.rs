//! Upload ingestion: validate, persist as a raw source, convert.

use std::sync::Arc;

use serde::Serialize;
use tokio::io::AsyncRead;

use hf_core::{AssetState, Error, Result, UploadName, VideoName};

use crate::engine::TranscodeEngine;

/// What a successful upload produced.
#[derive(Debug, Clone, Serialize)]
pub struct IngestReceipt {
    /// Sanitized filename as received.
    pub filename: String,
    pub name: VideoName,
    /// Bytes persisted to the raw store.
    pub bytes: u64,
    /// Playlist URL of the converted video.
    pub playlist: String,
}

/// Accepts uploaded container files.
pub struct IngestionPipeline {
    engine: Arc<TranscodeEngine>,
    extensions: Vec<String>,
}

impl IngestionPipeline {
    pub fn new(engine: Arc<TranscodeEngine>, extensions: Vec<String>) -> Self {
        Self { engine, extensions }
    }

    pub fn accepted_extensions(&self) -> &[String] {
        &self.extensions
    }

    /// Persist `body` under the name derived from `filename`, then convert it.
    ///
    /// The body is staged without holding the name's lock, so a slow client
    /// never blocks conversion or deletion of the same name. An upload for a
    /// name that already exists replaces it: the previous raw source and
    /// derived output are removed once the new bytes are on disk.
    ///
    /// # Errors
    ///
    /// - [`Error::Validation`] / [`Error::InvalidExtension`] before anything
    ///   is written.
    /// - [`Error::Io`] if the bytes cannot be persisted.
    /// - [`Error::Conversion`] if conversion fails; the raw source stays in
    ///   the raw store.
    pub async fn ingest<R>(&self, filename: &str, mut body: R) -> Result<IngestReceipt>
    where
        R: AsyncRead + Unpin + Send,
    {
        let upload = UploadName::parse(filename, &self.extensions)?;
        let name = upload.name.clone();
        let store = self.engine.store();

        let staged = store.stage_upload(&upload.extension, &mut body).await?;
        let bytes = staged.bytes();
        {
            let _guard = self.engine.registry().lock(&name).await;
            store.install_raw(&name, staged)?;
            if store.remove_derived(&name).await? {
                tracing::info!(name = %name, "Replacing existing HLS output");
            }
            self.engine.registry().set(&name, AssetState::Raw);
        }
        tracing::info!(name = %name, filename = %upload.filename, bytes, "Upload stored");

        let playlist = self.engine.convert(&name).await.map_err(|e| match e {
            Error::Conversion { .. } => e,
            other => Error::conversion(&name, other.to_string()),
        })?;

        Ok(IngestReceipt {
            filename: upload.filename,
            name,
            bytes,
            playlist,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::AssetStore;
    use crate::testing::{FakeEncoder, TestAssets};
    use std::io;
    use std::pin::Pin;
    use std::task::{Context, Poll};
    use std::time::Duration;
    use tokio::io::{AsyncReadExt, AsyncWriteExt, ReadBuf};

    /// A client that disconnects mid-body.
    struct BrokenBody;

    impl AsyncRead for BrokenBody {
        fn poll_read(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            _buf: &mut ReadBuf<'_>,
        ) -> Poll<io::Result<()>> {
            Poll::Ready(Err(io::Error::new(
                io::ErrorKind::ConnectionReset,
                "client went away",
            )))
        }
    }

    fn name(s: &str) -> VideoName {
        VideoName::new(s).unwrap()
    }

    #[tokio::test]
    async fn ingest_persists_and_converts() {
        let assets = TestAssets::new(FakeEncoder::new());
        let receipt = assets
            .services
            .ingest
            .ingest("sample.mkv", &b"matroska"[..])
            .await
            .unwrap();

        assert_eq!(receipt.filename, "sample.mkv");
        assert_eq!(receipt.name.as_str(), "sample");
        assert_eq!(receipt.bytes, 8);
        assert_eq!(receipt.playlist, "/hls/sample/index.m3u8");
        assert!(assets.store.ready_exists(&name("sample")));
        assert!(!assets.store.raw_exists(&name("sample")));
    }

    #[tokio::test]
    async fn wrong_extension_is_rejected_before_writing() {
        let assets = TestAssets::new(FakeEncoder::new());
        for body in [&b""[..], &b"anything"[..]] {
            let err = assets
                .services
                .ingest
                .ingest("movie.mp4", body)
                .await
                .unwrap_err();
            assert!(matches!(err, Error::InvalidExtension { .. }), "{err}");
        }
        assert!(assets.store.list_raw().await.unwrap().is_empty());
        assert_eq!(assets.encoder.transcode_calls(), 0);
    }

    #[tokio::test]
    async fn empty_filename_is_validation_error() {
        let assets = TestAssets::new(FakeEncoder::new());
        let err = assets.services.ingest.ingest("", &b"x"[..]).await.unwrap_err();
        assert!(matches!(err, Error::Validation(_)), "{err}");
    }

    #[tokio::test]
    async fn upper_case_extension_is_accepted() {
        let assets = TestAssets::new(FakeEncoder::new());
        let receipt = assets
            .services
            .ingest
            .ingest("Holiday.MKV", &b"x"[..])
            .await
            .unwrap();
        assert_eq!(receipt.playlist, "/hls/Holiday/index.m3u8");
    }

    #[tokio::test]
    async fn conversion_failure_keeps_raw_bytes() {
        let assets = TestAssets::new(FakeEncoder::new().failing());
        let err = assets
            .services
            .ingest
            .ingest("broken.mkv", &b"garbage"[..])
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Conversion { .. }), "{err}");
        let raw = assets.store.raw_path(&name("broken")).unwrap();
        assert_eq!(std::fs::read(raw).unwrap(), b"garbage");
    }

    #[tokio::test]
    async fn reupload_replaces_ready_asset_and_clears_failure() {
        let assets = TestAssets::new(FakeEncoder::new().failing());
        let ingest = &assets.services.ingest;
        assert!(ingest.ingest("clip.mkv", &b"v1"[..]).await.is_err());

        assets.encoder.set_failing(false);
        ingest.ingest("clip.mkv", &b"v2"[..]).await.unwrap();
        ingest.ingest("clip.mkv", &b"v3"[..]).await.unwrap();

        assert_eq!(assets.encoder.transcode_calls(), 3);
        assert!(assets.store.ready_exists(&name("clip")));
        assert!(!assets.store.raw_exists(&name("clip")));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn stalled_upload_does_not_block_delete() {
        let assets = TestAssets::new(FakeEncoder::new());
        assets.put_ready("clip");
        let ingest = Arc::clone(&assets.services.ingest);

        let (mut client, body) = tokio::io::duplex(64);
        client.write_all(b"partial").await.unwrap();
        let upload = tokio::spawn(async move { ingest.ingest("clip.mkv", body).await });
        tokio::time::sleep(Duration::from_millis(20)).await;

        let report = tokio::time::timeout(
            Duration::from_secs(2),
            assets.services.lifecycle.delete_all(&["clip"]),
        )
        .await
        .expect("delete blocked by an unfinished upload")
        .unwrap();
        assert!(report.is_complete());
        assert!(!assets.store.ready_exists(&name("clip")));
        assert!(assets.store.list_raw().await.unwrap().is_empty());

        client.write_all(b" rest").await.unwrap();
        drop(client);
        let receipt = upload.await.unwrap().unwrap();
        assert_eq!(receipt.bytes, 12);
        assert!(assets.store.ready_exists(&name("clip")));
    }

    #[tokio::test]
    async fn failed_body_leaves_no_staging_file() {
        let assets = TestAssets::new(FakeEncoder::new());
        let body = (&b"partial"[..]).chain(BrokenBody);
        let err = assets
            .services
            .ingest
            .ingest("clip.mkv", body)
            .await
            .unwrap_err();

        assert!(matches!(err, Error::Io { .. }), "{err}");
        let leftovers = std::fs::read_dir(assets.store.raw_root()).unwrap().count();
        assert_eq!(leftovers, 0);
        assert_eq!(assets.encoder.transcode_calls(), 0);
    }
}
