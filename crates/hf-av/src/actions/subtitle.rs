//! Best-effort extraction of the first subtitle track as WebVTT.

use std::path::Path;
use std::time::Duration;

use crate::command::ToolCommand;
use crate::encoder::SubtitleOutcome;

/// ffmpeg stderr fragments that mean "there was nothing to extract".
const NO_STREAM_MARKERS: &[&str] = &[
    "does not contain any stream",
    "Output file is empty",
];

/// Build the ffmpeg arguments that convert the first subtitle stream to WebVTT.
pub fn subtitle_args(input: &Path, output: &Path) -> Vec<String> {
    let mut args: Vec<String> = vec!["-hide_banner".into(), "-y".into(), "-i".into()];
    args.push(input.to_string_lossy().to_string());
    args.extend(["-map", "0:s:0?", "-c:s", "webvtt"].map(String::from));
    args.push(output.to_string_lossy().to_string());
    args
}

fn classify(success: bool, stderr: &str, produced: bool) -> Option<SubtitleOutcome> {
    match (success, produced) {
        (true, true) => Some(SubtitleOutcome::Extracted),
        (true, false) => Some(SubtitleOutcome::NoSubtitle),
        (false, _) if NO_STREAM_MARKERS.iter().any(|m| stderr.contains(m)) => {
            Some(SubtitleOutcome::NoSubtitle)
        }
        (false, _) => None,
    }
}

/// Extract the first subtitle track of `input` into `output`.
///
/// A source without subtitle streams yields [`SubtitleOutcome::NoSubtitle`];
/// only real failures (spawn, timeout, unexpected exit) are errors. An empty
/// or partial `output` is removed in both of those cases.
pub async fn extract_webvtt(
    ffmpeg: &Path,
    input: &Path,
    output: &Path,
    timeout: Duration,
) -> hf_core::Result<SubtitleOutcome> {
    let mut cmd = ToolCommand::new(ffmpeg.to_path_buf());
    cmd.timeout(timeout);
    cmd.args(subtitle_args(input, output));
    let run = cmd.output().await?;

    let produced = std::fs::metadata(output)
        .map(|m| m.is_file() && m.len() > 0)
        .unwrap_or(false);

    match classify(run.status.success(), &run.stderr, produced) {
        Some(SubtitleOutcome::Extracted) => Ok(SubtitleOutcome::Extracted),
        Some(SubtitleOutcome::NoSubtitle) => {
            let _ = std::fs::remove_file(output);
            Ok(SubtitleOutcome::NoSubtitle)
        }
        None => {
            let _ = std::fs::remove_file(output);
            tracing::debug!(stderr = %run.stderr_tail(), "Subtitle extraction stderr");
            Err(hf_core::Error::tool(
                "ffmpeg",
                format!("subtitle extraction exited with status {}", run.status),
            ))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn args_select_first_subtitle_optionally() {
        let args = subtitle_args(Path::new("a.mkv"), Path::new("out/subtitles.vtt"));
        let joined = args.join(" ");
        assert!(joined.contains("-map 0:s:0? -c:s webvtt"));
        assert_eq!(args.last().unwrap(), "out/subtitles.vtt");
    }

    #[test]
    fn classification() {
        assert_eq!(classify(true, "", true), Some(SubtitleOutcome::Extracted));
        assert_eq!(classify(true, "", false), Some(SubtitleOutcome::NoSubtitle));
        assert_eq!(
            classify(
                false,
                "Output file #0 does not contain any stream\n",
                false
            ),
            Some(SubtitleOutcome::NoSubtitle)
        );
        assert_eq!(classify(false, "Invalid data found", false), None);
    }
}
