//! Application configuration types.
//!
//! The top-level [`Config`] struct is deserialized from JSON and carries the
//! server, storage, tool, and encoder settings. Every section defaults
//! sensibly so a completely empty `{}` file is valid.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::Result;
use crate::Error;

/// Environment variable that overrides `server.port`.
pub const PORT_ENV: &str = "PORT";

// ---------------------------------------------------------------------------
// Top-level Config
// ---------------------------------------------------------------------------

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub tools: ToolsConfig,
    pub encoder: EncoderConfig,
}

impl Config {
    /// Deserialize a `Config` from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self> {
        serde_json::from_str(json_str)
            .map_err(|e| Error::Validation(format!("config parse error: {e}")))
    }

    /// Load configuration from a file path, falling back to defaults if the
    /// path is `None` or the file does not exist.
    pub fn load_or_default(path: Option<&Path>) -> Self {
        let Some(path) = path else {
            return Self::default();
        };

        match std::fs::read_to_string(path) {
            Ok(contents) => Self::from_json(&contents).unwrap_or_else(|e| {
                tracing::warn!("Failed to parse config file {}: {e}", path.display());
                Self::default()
            }),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!("No config file at {}; using defaults", path.display());
                Self::default()
            }
            Err(e) => {
                tracing::warn!("Failed to read config file {}: {e}", path.display());
                Self::default()
            }
        }
    }

    /// Apply overrides from the process environment (`PORT`).
    pub fn apply_env(&mut self) {
        self.apply_port_override(std::env::var(PORT_ENV).ok().as_deref());
    }

    fn apply_port_override(&mut self, value: Option<&str>) {
        let Some(raw) = value else {
            return;
        };
        match raw.trim().parse::<u16>() {
            Ok(port) => self.server.port = port,
            Err(_) => tracing::warn!("Ignoring invalid {PORT_ENV} value {raw:?}"),
        }
    }

    /// Return a list of validation warnings (non-fatal issues).
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();

        if self.server.port == 0 {
            warnings.push("server.port is 0; a random port will be assigned".into());
        }

        if self.storage.extensions.is_empty() {
            warnings.push("storage.extensions is empty; every upload will be rejected".into());
        }

        for ext in &self.storage.extensions {
            if ext.is_empty() || ext.contains('.') {
                warnings.push(format!(
                    "storage.extensions entry {ext:?} should be a bare extension like \"mkv\""
                ));
            }
        }

        if self.storage.raw_dir == self.storage.derived_dir {
            warnings.push("storage.raw_dir and storage.derived_dir are the same directory".into());
        }

        if self.encoder.segment_duration_secs == 0 {
            warnings.push("encoder.segment_duration_secs is 0; ffmpeg will pick its own".into());
        }

        warnings
    }
}

// ---------------------------------------------------------------------------
// Sub-configs
// ---------------------------------------------------------------------------

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Optional directory of UI assets served as the router fallback.
    pub static_dir: Option<PathBuf>,
    /// Upper bound for a single upload request body.
    pub max_upload_bytes: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".into(),
            port: 8080,
            static_dir: None,
            max_upload_bytes: 20 * 1024 * 1024 * 1024,
        }
    }
}

/// Where raw uploads and derived HLS output live.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Directory holding one `<name>.<ext>` container file per unconverted video.
    pub raw_dir: PathBuf,
    /// Directory holding one `<name>/` HLS directory per converted video.
    pub derived_dir: PathBuf,
    /// Accepted container extensions, without the leading dot.
    pub extensions: Vec<String>,
    /// Convert leftover raw files before the server starts listening.
    pub sweep_on_start: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("static/assets/videos"),
            derived_dir: PathBuf::from("static/assets/videos/hls"),
            extensions: vec!["mkv".into()],
            sweep_on_start: true,
        }
    }
}

impl StorageConfig {
    /// Accepted extensions, lowercased.
    pub fn normalized_extensions(&self) -> Vec<String> {
        self.extensions
            .iter()
            .map(|e| e.trim_start_matches('.').to_ascii_lowercase())
            .filter(|e| !e.is_empty())
            .collect()
    }
}

/// Paths to external CLI tools.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ToolsConfig {
    pub ffmpeg_path: Option<PathBuf>,
}

/// Encoder invocation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderConfig {
    /// Target HLS segment length (`-hls_time`).
    pub segment_duration_secs: u32,
    /// Upper bound for the audio/video mux.
    pub transcode_timeout_secs: u64,
    /// Upper bound for subtitle extraction.
    pub subtitle_timeout_secs: u64,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            segment_duration_secs: 6,
            transcode_timeout_secs: 3600,
            subtitle_timeout_secs: 600,
        }
    }
}

impl EncoderConfig {
    pub fn transcode_timeout(&self) -> Duration {
        Duration::from_secs(self.transcode_timeout_secs)
    }

    pub fn subtitle_timeout(&self) -> Duration {
        Duration::from_secs(self.subtitle_timeout_secs)
    }
}
