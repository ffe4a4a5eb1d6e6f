use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json;
#[cfg(feature = "yaml-config")]
use serde_yaml;
#[cfg(feature = "toml-config")]
use toml;

use crate::event::error::{EventSystemError, Result};

/// Supported configuration file formats
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigFormat {
    /// JSON format (.json)
    Json,
    /// YAML format (.yaml, .yml) - requires "yaml-config" feature
    #[cfg(feature = "yaml-config")]
    Yaml,
    /// TOML format (.toml) - requires "toml-config" feature
    #[cfg(feature = "toml-config")]
    Toml,
}

impl ConfigFormat {
    /// Get the file extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            ConfigFormat::Json => "json",
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => "yaml",
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => "toml",
        }
    }

    /// Determine format from file extension
    pub fn from_path(path: &Path) -> Option<Self> {
        path.extension()
            .and_then(|ext| ext.to_str())
            .and_then(|ext| match ext.to_lowercase().as_str() {
                "json" => Some(ConfigFormat::Json),
                #[cfg(feature = "yaml-config")]
                "yaml" | "yml" => Some(ConfigFormat::Yaml),
                #[cfg(feature = "toml-config")]
                "toml" => Some(ConfigFormat::Toml),
                _ => None,
            })
    }
}

/// What the bus does when a subscriber callback returns an error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailurePolicy {
    /// Stop the pass and return the error; later subscribers are not invoked
    #[default]
    Abort,
    /// Log the error and continue with the next subscriber
    Isolate,
}

/// Per-bus settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventBusConfig {
    /// Label used in log output
    pub name: String,
    pub failure_policy: FailurePolicy,
    /// Log a warning when a single callback runs longer than this.
    /// Slow callbacks are never interrupted.
    pub slow_subscriber_warn_ms: Option<u64>,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            failure_policy: FailurePolicy::Abort,
            slow_subscriber_warn_ms: None,
        }
    }
}

impl EventBusConfig {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    pub fn with_slow_subscriber_warning(mut self, threshold_ms: u64) -> Self {
        self.slow_subscriber_warn_ms = Some(threshold_ms);
        self
    }

    /// Parse configuration text in the given format
    pub fn parse(content: &str, format: ConfigFormat) -> Result<Self> {
        let parse_err = |reason: String| EventSystemError::ConfigParse {
            format: format.extension().to_string(),
            reason,
        };
        match format {
            ConfigFormat::Json => serde_json::from_str(content).map_err(|e| parse_err(e.to_string())),
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::from_str(content).map_err(|e| parse_err(e.to_string())),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::from_str(content).map_err(|e| parse_err(e.to_string())),
        }
    }

    /// Serialize to string based on format
    pub fn serialize(&self, format: ConfigFormat) -> Result<String> {
        let ser_err = |reason: String| EventSystemError::ConfigSerialize {
            format: format.extension().to_string(),
            reason,
        };
        match format {
            ConfigFormat::Json => serde_json::to_string_pretty(self).map_err(|e| ser_err(e.to_string())),
            #[cfg(feature = "yaml-config")]
            ConfigFormat::Yaml => serde_yaml::to_string(self).map_err(|e| ser_err(e.to_string())),
            #[cfg(feature = "toml-config")]
            ConfigFormat::Toml => toml::to_string_pretty(self).map_err(|e| ser_err(e.to_string())),
        }
    }

    /// Load from a file, picking the format from its extension
    pub fn load(path: &Path) -> Result<Self> {
        let format = ConfigFormat::from_path(path).ok_or_else(|| EventSystemError::UnsupportedConfigFormat {
            path: path.to_path_buf(),
        })?;
        let content = fs::read_to_string(path).map_err(|source| EventSystemError::Io {
            operation: "read_config".to_string(),
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::parse(&content, format)?;
        log::debug!("Loaded event bus config '{}' from {}", config.name, path.display());
        Ok(config)
    }
}
