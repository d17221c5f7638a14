//! # hf-av
//!
//! External tool management and the encoder capability for hlsforge.
//!
//! This crate provides:
//!
//! - **Tool discovery** ([`ToolRegistry`]) -- find and cache the path to ffmpeg.
//! - **Command execution** ([`ToolCommand`]) -- async builder with timeout
//!   support for running external processes.
//! - **Encoder capability** ([`Encoder`]) -- the two operations the transcode
//!   engine needs, with [`FfmpegEncoder`] as the production implementation.
//! - **Action functions** ([`actions`]) -- HLS segmentation and subtitle
//!   extraction as plain ffmpeg invocations.

pub mod actions;
pub mod command;
pub mod encoder;
pub mod tools;

// ---- Re-exports for convenience ----

pub use command::{ToolCommand, ToolOutput};
pub use encoder::{Encoder, FfmpegEncoder, SubtitleOutcome};
pub use tools::{Tool, ToolConfig, ToolInfo, ToolRegistry, ToolSource};

pub use actions::{extract_webvtt, segment_to_hls};
