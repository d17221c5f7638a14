//! Asset domain types: video names, lifecycle states, and the on-disk layout.

use std::fmt;
use std::path::PathBuf;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Playlist file inside a derived directory. Its presence means "ready".
pub const PLAYLIST_FILE: &str = "index.m3u8";

/// Playlist name the encoder writes to before the engine commits it.
pub const STAGING_PLAYLIST_FILE: &str = "index.m3u8.part";

/// Optional WebVTT track extracted next to the playlist.
pub const SUBTITLE_FILE: &str = "subtitles.vtt";

/// URL prefix under which derived directories are served.
pub const HLS_ROUTE_PREFIX: &str = "/hls";

const MAX_NAME_LEN: usize = 255;

// ---------------------------------------------------------------------------
// VideoName
// ---------------------------------------------------------------------------

/// A validated video identifier, safe to use as a single path component.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct VideoName(String);

impl VideoName {
    /// Validate `name` as a video identifier.
    ///
    /// Rejects empty names, names starting with `.`, names longer than 255
    /// bytes, and names containing path separators or control characters.
    pub fn new(name: impl Into<String>) -> Result<Self> {
        let name = name.into();
        if name.is_empty() {
            return Err(Error::Validation("video name is empty".into()));
        }
        if name.len() > MAX_NAME_LEN {
            return Err(Error::Validation(format!(
                "video name exceeds {MAX_NAME_LEN} bytes"
            )));
        }
        if name.starts_with('.') {
            return Err(Error::Validation(format!(
                "video name {name:?} must not start with '.'"
            )));
        }
        if name
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_control())
        {
            return Err(Error::Validation(format!(
                "video name {name:?} contains a path separator or control character"
            )));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The public URL of this video's playlist, e.g. `/hls/sample/index.m3u8`.
    pub fn stream_path(&self) -> String {
        format!("{HLS_ROUTE_PREFIX}/{}/{PLAYLIST_FILE}", self.0)
    }
}

impl fmt::Display for VideoName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for VideoName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::str::FromStr for VideoName {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl<'de> Deserialize<'de> for VideoName {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        VideoName::new(raw).map_err(serde::de::Error::custom)
    }
}

// ---------------------------------------------------------------------------
// UploadName
// ---------------------------------------------------------------------------

/// A client-supplied upload filename, split into a video name and extension.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UploadName {
    /// The filename as displayed back to the client (last path component).
    pub filename: String,
    /// The video identifier (filename without extension).
    pub name: VideoName,
    /// The accepted extension, lowercased.
    pub extension: String,
}

impl UploadName {
    /// Sanitize `filename` and check it against the accepted extensions.
    ///
    /// Directory components (either separator style) are stripped. An empty
    /// result is a [`Error::Validation`]; a non-matching extension is an
    /// [`Error::InvalidExtension`].
    pub fn parse(filename: &str, accepted: &[String]) -> Result<Self> {
        let base = filename
            .rsplit(['/', '\\'])
            .next()
            .unwrap_or_default()
            .trim();
        if base.is_empty() {
            return Err(Error::Validation("No selected file".into()));
        }

        let invalid = || Error::InvalidExtension {
            filename: base.to_string(),
            accepted: accepted.join(", "),
        };

        let (stem, ext) = base.rsplit_once('.').ok_or_else(invalid)?;
        let extension = ext.to_ascii_lowercase();
        if !accepted.iter().any(|a| a.eq_ignore_ascii_case(&extension)) {
            return Err(invalid());
        }

        Ok(Self {
            filename: base.to_string(),
            name: VideoName::new(stem)?,
            extension,
        })
    }
}

// ---------------------------------------------------------------------------
// AssetState / Video
// ---------------------------------------------------------------------------

/// Lifecycle state of a video asset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AssetState {
    /// Neither a raw source nor a derived directory exists.
    Unknown,
    /// A raw source exists and has no playlist yet.
    Raw,
    /// A conversion is running under the name's lock.
    Converting,
    /// The playlist exists in the derived directory.
    Ready,
    /// The last conversion failed; the raw source was kept.
    Failed,
    /// Removed by a delete request. Terminal: the registry keeps no record
    /// of deleted names, so they read as `Unknown` afterwards.
    Deleted,
}

impl fmt::Display for AssetState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AssetState::Unknown => "unknown",
            AssetState::Raw => "raw",
            AssetState::Converting => "converting",
            AssetState::Ready => "ready",
            AssetState::Failed => "failed",
            AssetState::Deleted => "deleted",
        };
        f.write_str(s)
    }
}

/// Point-in-time view of one video.
///
/// Storage paths are for in-process callers and never serialized.
#[derive(Debug, Clone, Serialize)]
pub struct Video {
    pub name: VideoName,
    pub state: AssetState,
    #[serde(skip)]
    pub raw_path: Option<PathBuf>,
    #[serde(skip)]
    pub derived_dir: PathBuf,
    /// Playlist URL, present only when ready.
    pub playlist: Option<String>,
    pub last_error: Option<String>,
    pub updated_at: Option<DateTime<Utc>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mkv() -> Vec<String> {
        vec!["mkv".to_string()]
    }

    #[test]
    fn valid_names() {
        for name in ["sample", "My Movie (2019)", "a.b.c", "ünïcødé"] {
            assert!(VideoName::new(name).is_ok(), "{name} should be valid");
        }
    }

    #[test]
    fn invalid_names() {
        for name in ["", ".", "..", ".hidden", "a/b", "a\\b", "tab\there"] {
            assert!(VideoName::new(name).is_err(), "{name:?} should be invalid");
        }
        assert!(VideoName::new("x".repeat(256)).is_err());
    }

    #[test]
    fn stream_path_format() {
        let name = VideoName::new("sample").unwrap();
        assert_eq!(name.stream_path(), "/hls/sample/index.m3u8");
    }

    #[test]
    fn deserialize_rejects_traversal() {
        let ok: VideoName = serde_json::from_str("\"sample\"").unwrap();
        assert_eq!(ok.as_str(), "sample");
        assert!(serde_json::from_str::<VideoName>("\"../etc\"").is_err());
    }

    #[test]
    fn upload_name_accepts_case_insensitive_extension() {
        let upload = UploadName::parse("Sample.MKV", &mkv()).unwrap();
        assert_eq!(upload.name.as_str(), "Sample");
        assert_eq!(upload.extension, "mkv");
        assert_eq!(upload.filename, "Sample.MKV");
    }

    #[test]
    fn upload_name_strips_directories() {
        let upload = UploadName::parse("C:\\Users\\me\\clip.mkv", &mkv()).unwrap();
        assert_eq!(upload.name.as_str(), "clip");

        let upload = UploadName::parse("../../clip.mkv", &mkv()).unwrap();
        assert_eq!(upload.name.as_str(), "clip");
    }

    #[test]
    fn upload_name_rejects_wrong_extension() {
        for filename in ["movie.mp4", "movie", "movie.mkv.exe"] {
            let err = UploadName::parse(filename, &mkv()).unwrap_err();
            assert!(
                matches!(err, Error::InvalidExtension { .. }),
                "{filename}: {err}"
            );
        }
    }

    #[test]
    fn upload_name_rejects_empty() {
        assert!(matches!(
            UploadName::parse("", &mkv()),
            Err(Error::Validation(_))
        ));
        assert!(matches!(
            UploadName::parse(".mkv", &mkv()),
            Err(Error::Validation(_))
        ));
    }

    #[test]
    fn state_serializes_lowercase() {
        let json = serde_json::to_string(&AssetState::Converting).unwrap();
        assert_eq!(json, "\"converting\"");
        assert_eq!(AssetState::Failed.to_string(), "failed");
    }

    #[test]
    fn video_json_omits_storage_paths() {
        let video = Video {
            name: VideoName::new("sample").unwrap(),
            state: AssetState::Raw,
            raw_path: Some(PathBuf::from("/srv/raw/sample.mkv")),
            derived_dir: PathBuf::from("/srv/hls/sample"),
            playlist: None,
            last_error: None,
            updated_at: None,
        };
        let json = serde_json::to_value(&video).unwrap();

        assert_eq!(json["name"], "sample");
        assert_eq!(json["state"], "raw");
        assert!(json.get("raw_path").is_none());
        assert!(json.get("derived_dir").is_none());
        assert!(!json.to_string().contains("/srv/"));
    }
}
