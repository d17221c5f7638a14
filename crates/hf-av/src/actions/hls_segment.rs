//! HLS segment generation using ffmpeg `-c copy`.

use std::path::Path;
use std::time::Duration;

use crate::command::ToolCommand;

/// Segment filename pattern, relative to the playlist's directory.
const SEGMENT_PATTERN: &str = "seg%05d.ts";

/// Build the ffmpeg arguments that remux `input` into an HLS VOD playlist.
///
/// Video and audio streams are copied, not re-encoded. Audio is optional so
/// silent sources still convert. Segments land next to the playlist.
pub fn hls_segment_args(input: &Path, playlist: &Path, segment_duration: u32) -> Vec<String> {
    let output_dir = playlist.parent().unwrap_or_else(|| Path::new("."));
    let seg_pattern = output_dir.join(SEGMENT_PATTERN);

    let mut args: Vec<String> = vec!["-hide_banner".into(), "-y".into(), "-i".into()];
    args.push(input.to_string_lossy().to_string());
    args.extend(["-map", "0:v", "-map", "0:a?"].map(String::from));
    args.extend(["-c:v", "copy", "-c:a", "copy", "-f", "hls"].map(String::from));
    if segment_duration > 0 {
        args.push("-hls_time".into());
        args.push(segment_duration.to_string());
    }
    args.extend(["-hls_playlist_type", "vod"].map(String::from));
    args.push("-hls_segment_filename".into());
    args.push(seg_pattern.to_string_lossy().to_string());
    args.push(playlist.to_string_lossy().to_string());
    args
}

/// Remux `input` into HLS segments plus a playlist written at `playlist`.
///
/// Produces:
/// - `playlist`: the VOD playlist
/// - `seg00000.ts`, `seg00001.ts`, ...: media segments beside it
pub async fn segment_to_hls(
    ffmpeg: &Path,
    input: &Path,
    playlist: &Path,
    segment_duration: u32,
    timeout: Duration,
) -> hf_core::Result<()> {
    tracing::info!(
        "HLS segment: {:?} -> {:?} (segment_duration={}s)",
        input,
        playlist,
        segment_duration
    );

    let mut cmd = ToolCommand::new(ffmpeg.to_path_buf());
    cmd.timeout(timeout);
    cmd.args(hls_segment_args(input, playlist, segment_duration));
    cmd.execute().await?;

    if !playlist.is_file() {
        return Err(hf_core::Error::tool(
            "ffmpeg",
            format!("finished without writing {}", playlist.display()),
        ));
    }

    Ok(())
}
