//! The encoder capability used by the transcode engine.
//!
//! [`Encoder`] is the seam between asset orchestration and the external
//! transcoding tool. [`FfmpegEncoder`] shells out to ffmpeg; tests substitute
//! an implementation that writes deterministic files instead.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

use hf_core::config::EncoderConfig;

use crate::actions;
use crate::tools::{Tool, ToolRegistry};

/// Result of a subtitle extraction attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SubtitleOutcome {
    /// A WebVTT track was written.
    Extracted,
    /// The source has no subtitle stream. Not an error.
    NoSubtitle,
}

/// Turns a raw container into streamable output.
#[async_trait]
pub trait Encoder: Send + Sync {
    /// Remux `raw` into a segmented playlist at `playlist`, with segment
    /// files in the same directory.
    async fn transcode_av(&self, raw: &Path, playlist: &Path) -> hf_core::Result<()>;

    /// Extract the first subtitle track of `raw` to `subtitle`.
    async fn extract_subtitle(&self, raw: &Path, subtitle: &Path)
        -> hf_core::Result<SubtitleOutcome>;
}

/// [`Encoder`] backed by the ffmpeg CLI.
#[derive(Debug, Clone)]
pub struct FfmpegEncoder {
    ffmpeg: PathBuf,
    segment_duration: u32,
    transcode_timeout: Duration,
    subtitle_timeout: Duration,
}

impl FfmpegEncoder {
    /// Build an encoder from an explicit ffmpeg path.
    pub fn new(ffmpeg: PathBuf, config: &EncoderConfig) -> Self {
        Self {
            ffmpeg,
            segment_duration: config.segment_duration_secs,
            transcode_timeout: config.transcode_timeout(),
            subtitle_timeout: config.subtitle_timeout(),
        }
    }

    /// Build an encoder using the ffmpeg found by `tools`.
    ///
    /// Fails with [`hf_core::Error::Tool`] when ffmpeg was not discovered.
    pub fn from_registry(tools: &ToolRegistry, config: &EncoderConfig) -> hf_core::Result<Self> {
        let ffmpeg = tools.require(Tool::Ffmpeg)?;
        Ok(Self::new(ffmpeg.path.clone(), config))
    }

    pub fn ffmpeg_path(&self) -> &Path {
        &self.ffmpeg
    }
}

#[async_trait]
impl Encoder for FfmpegEncoder {
    async fn transcode_av(&self, raw: &Path, playlist: &Path) -> hf_core::Result<()> {
        actions::segment_to_hls(
            &self.ffmpeg,
            raw,
            playlist,
            self.segment_duration,
            self.transcode_timeout,
        )
        .await
    }

    async fn extract_subtitle(
        &self,
        raw: &Path,
        subtitle: &Path,
    ) -> hf_core::Result<SubtitleOutcome> {
        actions::extract_webvtt(&self.ffmpeg, raw, subtitle, self.subtitle_timeout).await
    }
}
