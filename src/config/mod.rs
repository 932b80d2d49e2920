//! Configuration module for relay-hierarchy
//!
//! Nodes need no configuration to work: [`Node::new`](crate::Node::new) uses
//! [`RelayConfig::default`]. A config only tunes the threads nodes spawn and
//! the demo binary's producer.
//!
//! # Files
//!
//! Config files are JSON (primary) or TOML, chosen by file extension. The
//! default location is the platform config directory:
//!
//! - **Linux**: `~/.config/relay-hierarchy/relay.toml`
//! - **macOS**: `~/Library/Application Support/relay-hierarchy/relay.toml`
//! - **Windows**: `%APPDATA%\relay-hierarchy\relay.toml`

pub mod settings;

pub use settings::*;

use crate::error::{RelayError, Result, ResultExt};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Application identifier for config directories
pub const APP_ID: &str = "relay-hierarchy";

/// Default config filename
pub const CONFIG_FILE: &str = "relay.toml";

/// Default config file path in the platform config directory
pub fn default_config_path() -> Option<PathBuf> {
    dirs_next::config_dir().map(|p| p.join(APP_ID).join(CONFIG_FILE))
}

/// Serialization format of a config file
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Format {
    Json,
    Toml,
}

impl Format {
    fn from_path(path: &Path) -> Self {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("toml") => Format::Toml,
            _ => Format::Json,
        }
    }
}

/// Top-level configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    /// Thread naming and stack sizes
    pub threads: ThreadSettings,

    /// Demo producer pacing
    pub demo: DemoSettings,
}

impl RelayConfig {
    /// Load a config file, picking the format from its extension
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {:?}", path))?;

        match Format::from_path(path) {
            Format::Toml => toml::from_str(&content).map_err(|e| {
                RelayError::Config(format!("Failed to parse config file {:?}: {}", path, e))
            }),
            Format::Json => serde_json::from_str(&content).map_err(|e| {
                RelayError::Config(format!("Failed to parse config file {:?}: {}", path, e))
            }),
        }
    }

    /// Load a config file, returning defaults on any error
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            tracing::warn!("Failed to load config, using defaults: {}", e);
            Self::default()
        })
    }

    /// Save the config, picking the format from the file extension
    pub fn save(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create config directory {:?}", parent))?;
        }

        let content = match Format::from_path(path) {
            Format::Toml => toml::to_string_pretty(self)
                .map_err(|e| RelayError::Config(format!("Failed to serialize config: {}", e)))?,
            Format::Json => serde_json::to_string_pretty(self)
                .map_err(|e| RelayError::Config(format!("Failed to serialize config: {}", e)))?,
        };

        std::fs::write(path, content)
            .with_context(|| format!("Failed to write config file {:?}", path))
    }
}
