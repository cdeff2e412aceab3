//! External tool detection and management.
//!
//! The [`ToolRegistry`] discovers and caches the locations of `ffmpeg` and
//! `ffprobe` and provides lookup methods for the rest of the workspace.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Name of the encoder binary.
pub const FFMPEG: &str = "ffmpeg";
/// Name of the duration probe binary.
pub const FFPROBE: &str = "ffprobe";

/// Known tool names that the registry manages.
const KNOWN_TOOLS: &[&str] = &[FFMPEG, FFPROBE];

/// A discovered external tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Tool name (e.g. "ffmpeg").
    pub name: String,
    /// Resolved path to the executable.
    pub path: PathBuf,
}

/// Availability information for a tool, returned by [`ToolRegistry::check_all`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name.
    pub name: String,
    /// Whether the tool was found.
    pub available: bool,
    /// Version string (first line of `-version` output), if available.
    pub version: Option<String>,
    /// Resolved path to the executable.
    pub path: Option<PathBuf>,
}

/// Registry holding discovered tool configurations.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: HashMap<String, ToolConfig>,
}

impl ToolRegistry {
    /// Discover tools by searching `PATH` (or using overrides from config).
    ///
    /// For each known tool, if the [`a2v_core::config::ToolsConfig`] supplies
    /// a custom path **and** that path exists, it is used directly. Otherwise
    /// [`which::which`] is used to locate the tool in `PATH`. Tools that are
    /// not found are omitted from the registry.
    pub fn discover(tools_config: &a2v_core::config::ToolsConfig) -> Self {
        let mut tools = HashMap::new();

        for &name in KNOWN_TOOLS {
            let custom_path = match name {
                FFMPEG => tools_config.ffmpeg_path.as_deref(),
                FFPROBE => tools_config.ffprobe_path.as_deref(),
                _ => None,
            };

            let resolved = match custom_path {
                Some(p) if p.exists() => Some(p.to_path_buf()),
                Some(p) => {
                    tracing::warn!(
                        tool = name,
                        path = %p.display(),
                        "Configured tool path does not exist; searching PATH"
                    );
                    which::which(name).ok()
                }
                None => which::which(name).ok(),
            };

            if let Some(path) = resolved {
                tracing::debug!(tool = name, path = %path.display(), "Tool discovered");
                tools.insert(
                    name.to_string(),
                    ToolConfig {
                        name: name.to_string(),
                        path,
                    },
                );
            }
        }

        Self { tools }
    }

    /// Build a registry from explicit paths without touching the filesystem.
    pub fn from_paths<'a>(paths: impl IntoIterator<Item = (&'a str, PathBuf)>) -> Self {
        let tools = paths
            .into_iter()
            .map(|(name, path)| {
                (
                    name.to_string(),
                    ToolConfig {
                        name: name.to_string(),
                        path,
                    },
                )
            })
            .collect();
        Self { tools }
    }

    /// Return a reference to the [`ToolConfig`] for the given tool, or an
    /// [`a2v_core::Error::Tool`] if the tool was not found during discovery.
    pub fn require(&self, name: &str) -> a2v_core::Result<&ToolConfig> {
        self.tools.get(name).ok_or_else(|| {
            a2v_core::Error::tool(name, format!("{name} not found; is it installed and in PATH?"))
        })
    }

    /// Path of the encoder.
    pub fn ffmpeg(&self) -> a2v_core::Result<&Path> {
        self.require(FFMPEG).map(|t| t.path.as_path())
    }

    /// Path of the duration probe.
    pub fn ffprobe(&self) -> a2v_core::Result<&Path> {
        self.require(FFPROBE).map(|t| t.path.as_path())
    }

    /// Names of known tools that were not discovered.
    pub fn missing(&self) -> Vec<&'static str> {
        KNOWN_TOOLS
            .iter()
            .copied()
            .filter(|name| !self.tools.contains_key(*name))
            .collect()
    }

    /// Check all known tools and return availability information.
    pub fn check_all(&self) -> Vec<ToolInfo> {
        KNOWN_TOOLS
            .iter()
            .map(|&name| {
                if let Some(cfg) = self.tools.get(name) {
                    ToolInfo {
                        name: name.to_string(),
                        available: true,
                        version: detect_version(&cfg.path),
                        path: Some(cfg.path.clone()),
                    }
                } else {
                    ToolInfo {
                        name: name.to_string(),
                        available: false,
                        version: None,
                        path: None,
                    }
                }
            })
            .collect()
    }
}

/// Run `<tool> -version` and return the first line of stdout.
fn detect_version(path: &Path) -> Option<String> {
    let output = std::process::Command::new(path)
        .arg("-version")
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|s| s.to_string())
}
