//! # Catalog Configuration
//!
//! Key markers and event bus sizing for an [`AudioCatalog`](crate::AudioCatalog).

use crate::error::{CatalogError, Result};
use core_runtime::events::DEFAULT_EVENT_BUFFER_SIZE;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Catalog configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CatalogConfig {
    /// Substring that marks a key as background music.
    ///
    /// Default: `"bgm."`.
    #[serde(default = "default_bgm_marker")]
    pub bgm_marker: String,

    /// Substring that marks a key as a sound effect.
    ///
    /// Default: `"sfx."`.
    #[serde(default = "default_sfx_marker")]
    pub sfx_marker: String,

    /// Capacity of the event bus channel.
    ///
    /// Default: 100 events.
    #[serde(default = "default_event_buffer_size")]
    pub event_buffer_size: usize,
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            bgm_marker: default_bgm_marker(),
            sfx_marker: default_sfx_marker(),
            event_buffer_size: default_event_buffer_size(),
        }
    }
}

impl CatalogConfig {
    /// Parse a configuration from JSON. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| CatalogError::Config(format!("failed to parse catalog config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a JSON configuration file.
    pub fn from_json_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn with_markers(mut self, bgm: impl Into<String>, sfx: impl Into<String>) -> Self {
        self.bgm_marker = bgm.into();
        self.sfx_marker = sfx.into();
        self
    }

    pub fn with_event_buffer_size(mut self, size: usize) -> Self {
        self.event_buffer_size = size;
        self
    }

    /// Validate configuration values.
    pub fn validate(&self) -> Result<()> {
        if self.bgm_marker.is_empty() || self.sfx_marker.is_empty() {
            return Err(CatalogError::Config("key markers must not be empty".to_string()));
        }

        if self.bgm_marker == self.sfx_marker {
            return Err(CatalogError::Config(
                "bgm_marker and sfx_marker must differ".to_string(),
            ));
        }

        if self.event_buffer_size == 0 {
            return Err(CatalogError::Config(
                "event_buffer_size must be > 0".to_string(),
            ));
        }

        Ok(())
    }
}

// Default value functions for serde
fn default_bgm_marker() -> String {
    "bgm.".to_string()
}

fn default_sfx_marker() -> String {
    "sfx.".to_string()
}

fn default_event_buffer_size() -> usize {
    DEFAULT_EVENT_BUFFER_SIZE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CatalogConfig::default();
        assert_eq!(config.bgm_marker, "bgm.");
        assert_eq!(config.sfx_marker, "sfx.");
        assert_eq!(config.event_buffer_size, 100);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config = CatalogConfig::from_json_str(r#"{ "sfx_marker": "se_" }"#).unwrap();
        assert_eq!(config.bgm_marker, "bgm.");
        assert_eq!(config.sfx_marker, "se_");
    }

    #[test]
    fn test_validation() {
        let config = CatalogConfig::default().with_markers("", "sfx.");
        assert!(matches!(config.validate(), Err(CatalogError::Config(_))));

        let config = CatalogConfig::default().with_markers("a.", "a.");
        assert!(config.validate().is_err());

        let config = CatalogConfig::default().with_event_buffer_size(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_malformed_json() {
        let result = CatalogConfig::from_json_str("{ not json");
        assert!(matches!(result, Err(CatalogError::Config(_))));

        let result = CatalogConfig::from_json_str(r#"{ "bgm_marker": "x", "sfx_marker": "x" }"#);
        assert!(matches!(result, Err(CatalogError::Config(_))));
    }
}
