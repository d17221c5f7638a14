//! Media processing actions: HLS segmentation and subtitle extraction.

mod hls_segment;
mod subtitle;

pub use hls_segment::{hls_segment_args, segment_to_hls};
pub use subtitle::{extract_webvtt, subtitle_args};
