//! Locating the external encoder.
//!
//! [`ToolRegistry::discover`] resolves every [`Tool`] once at startup, from
//! the configured override or from `PATH`, and remembers where each path
//! came from so `check-tools` can report it.

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;

use hf_core::config::ToolsConfig;

/// External programs hlsforge drives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Tool {
    Ffmpeg,
}

impl Tool {
    pub const ALL: &'static [Tool] = &[Tool::Ffmpeg];

    /// Executable name looked up on `PATH`.
    pub fn binary(self) -> &'static str {
        match self {
            Tool::Ffmpeg => "ffmpeg",
        }
    }

    fn override_path(self, config: &ToolsConfig) -> Option<&Path> {
        match self {
            Tool::Ffmpeg => config.ffmpeg_path.as_deref(),
        }
    }
}

impl fmt::Display for Tool {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.binary())
    }
}

/// Where a tool's path came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ToolSource {
    /// `tools.<name>_path` in the config file.
    Configured,
    /// Found on `PATH`.
    SearchPath,
    /// Registered in code with [`ToolRegistry::with_tool`].
    Explicit,
}

/// A resolved external tool.
#[derive(Debug, Clone, Serialize)]
pub struct ToolConfig {
    pub tool: Tool,
    pub path: PathBuf,
    pub source: ToolSource,
}

/// Availability report for one tool, from [`ToolRegistry::check_all`].
#[derive(Debug, Clone, Serialize)]
pub struct ToolInfo {
    pub name: String,
    pub available: bool,
    /// Version banner, e.g. `ffmpeg version 6.1.1`.
    pub version: Option<String>,
    pub path: Option<PathBuf>,
    pub source: Option<ToolSource>,
}

/// Resolved tool locations.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<Tool, ToolConfig>,
}

impl ToolRegistry {
    /// Resolve every known tool.
    ///
    /// A configured path wins when it exists; a configured path that does
    /// not exist is reported and `PATH` is searched instead. Tools that
    /// cannot be found are left out.
    pub fn discover(config: &ToolsConfig) -> Self {
        let tools = Tool::ALL
            .iter()
            .filter_map(|&tool| resolve(tool, config).map(|found| (tool, found)))
            .collect();
        Self { tools }
    }

    /// Use `path` for `tool`, bypassing discovery.
    pub fn with_tool(mut self, tool: Tool, path: PathBuf) -> Self {
        self.tools.insert(
            tool,
            ToolConfig {
                tool,
                path,
                source: ToolSource::Explicit,
            },
        );
        self
    }

    pub fn get(&self, tool: Tool) -> Option<&ToolConfig> {
        self.tools.get(&tool)
    }

    /// The resolved `tool`, or [`hf_core::Error::Tool`] if it was not found.
    pub fn require(&self, tool: Tool) -> hf_core::Result<&ToolConfig> {
        self.get(tool).ok_or_else(|| {
            hf_core::Error::tool(
                tool.binary(),
                format!("{tool} not found; install it or set tools.{tool}_path"),
            )
        })
    }

    /// Availability of every known tool, running each found binary once to
    /// read its version.
    pub fn check_all(&self) -> Vec<ToolInfo> {
        Tool::ALL
            .iter()
            .map(|&tool| {
                let found = self.get(tool);
                ToolInfo {
                    name: tool.binary().to_string(),
                    available: found.is_some(),
                    version: found.and_then(|t| detect_version(&t.path)),
                    path: found.map(|t| t.path.clone()),
                    source: found.map(|t| t.source),
                }
            })
            .collect()
    }
}

fn resolve(tool: Tool, config: &ToolsConfig) -> Option<ToolConfig> {
    if let Some(path) = tool.override_path(config) {
        if path.exists() {
            return Some(ToolConfig {
                tool,
                path: path.to_path_buf(),
                source: ToolSource::Configured,
            });
        }
        tracing::warn!(
            "Configured {tool} path {} does not exist; searching PATH",
            path.display()
        );
    }

    which::which(tool.binary()).ok().map(|path| ToolConfig {
        tool,
        path,
        source: ToolSource::SearchPath,
    })
}

/// Run `<tool> -version` and return its banner without the copyright tail.
fn detect_version(path: &Path) -> Option<String> {
    let output = std::process::Command::new(path)
        .arg("-version")
        .output()
        .ok()?;
    if !output.status.success() {
        return None;
    }
    let stdout = String::from_utf8_lossy(&output.stdout);
    version_banner(&stdout)
}

fn version_banner(stdout: &str) -> Option<String> {
    let first = stdout.lines().next()?.trim();
    let banner = first
        .split_once(" Copyright")
        .map_or(first, |(head, _)| head)
        .trim();
    (!banner.is_empty()).then(|| banner.to_string())
}
