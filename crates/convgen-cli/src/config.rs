//! Configuration management for the CLI
//!
//! This module handles loading configuration from:
//! - Default values
//! - Configuration files (TOML/YAML/JSON)
//! - Environment variables
//!
//! Command-line flags are applied on top by the handlers.

use crate::cli::OutputFormat;
use crate::error::{Error, Result};
use crate::logging::LogFormat;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Project configuration file name
pub const PROJECT_CONFIG_FILE: &str = ".convgen.toml";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Generation settings
    pub generation: GenerationConfig,

    /// Output settings
    pub output: OutputConfig,

    /// Logging settings
    pub logging: LoggingSettings,
}

/// Generation configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct GenerationConfig {
    /// Package assumed for types declared without a module
    pub package_prefix: Option<String>,

    /// Directory reports are written to instead of next to the declaration
    pub output_dir: Option<PathBuf>,

    /// Suffix appended to the snake-cased interface name
    pub file_suffix: String,
}

/// Output configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OutputConfig {
    /// Default output format
    pub format: OutputFormat,

    /// Use colored output by default
    pub color: bool,
}

/// Logging configuration as stored in files
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingSettings {
    /// Log level (trace, debug, info, warn, error)
    pub level: Option<String>,

    /// Log format (compact, full, json)
    pub format: Option<LogFormat>,

    /// Log file path
    pub file: Option<PathBuf>,

    /// Per-module levels, e.g. `convgen_core = "trace"`
    pub modules: BTreeMap<String, String>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            package_prefix: None,
            output_dir: None,
            file_suffix: "_gen".to_string(),
        }
    }
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            format: OutputFormat::Human,
            color: true,
        }
    }
}

impl Config {
    /// Load configuration from a file, choosing the format by extension
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(Error::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;

        let config = match extension(path) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            Some("json") => serde_json::from_str(&content)?,
            _ => toml::from_str(&content)?,
        };

        Ok(config)
    }

    /// Load configuration from the first existing default location
    pub fn load() -> Result<Self> {
        for path in Self::default_config_paths() {
            if path.exists() {
                tracing::debug!(path = %path.display(), "Loading configuration file");
                return Self::from_file(&path);
            }
        }

        Ok(Self::default())
    }

    /// Load configuration from a specific file or default locations, then
    /// apply environment overrides
    pub fn load_with_file(file: Option<&Path>) -> Result<Self> {
        let mut config = match file {
            Some(path) => Self::from_file(path)?,
            None => Self::load()?,
        };
        config.apply_env()?;
        config.validate()?;
        Ok(config)
    }

    /// Project configuration path in the current directory
    pub fn project_config_path() -> PathBuf {
        PathBuf::from(PROJECT_CONFIG_FILE)
    }

    /// User configuration path, e.g. `~/.config/convgen/config.toml`
    pub fn user_config_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("convgen").join("config.toml"))
    }

    fn default_config_paths() -> Vec<PathBuf> {
        let mut paths = vec![Self::project_config_path()];
        if let Some(user) = Self::user_config_path() {
            paths.push(user);
        }
        paths
    }

    /// Apply `CONVGEN_*` environment overrides
    pub fn apply_env(&mut self) -> Result<()> {
        self.apply_env_with(|key| std::env::var(key).ok())
    }

    pub fn apply_env_with(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<()> {
        if let Some(prefix) = lookup("CONVGEN_PACKAGE_PREFIX") {
            self.generation.package_prefix = Some(prefix);
        }
        if let Some(format) = lookup("CONVGEN_OUTPUT_FORMAT") {
            self.output.format = format.parse().map_err(|_| {
                Error::config(format!("CONVGEN_OUTPUT_FORMAT: unknown format '{}'", format))
            })?;
        }
        Ok(())
    }

    /// Reject values no command could use
    pub fn validate(&self) -> Result<()> {
        if let Some(prefix) = &self.generation.package_prefix {
            if prefix.trim().is_empty() {
                return Err(Error::config("generation.package_prefix must not be empty"));
            }
        }
        if self.generation.file_suffix.contains(['/', '\\']) {
            return Err(Error::config(
                "generation.file_suffix must not contain path separators",
            ));
        }
        Ok(())
    }

    /// Save configuration to a file, choosing the format by extension
    pub fn save(&self, path: &Path) -> Result<()> {
        let content = match extension(path) {
            Some("yaml") | Some("yml") => serde_yaml::to_string(self)?,
            Some("json") => serde_json::to_string_pretty(self)?,
            _ => toml::to_string_pretty(self)
                .map_err(|e| Error::config(format!("Failed to serialize as TOML: {}", e)))?,
        };

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        std::fs::write(path, content)?;
        Ok(())
    }
}

fn extension(path: &Path) -> Option<&str> {
    path.extension().and_then(|s| s.to_str())
}
