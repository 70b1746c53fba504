//! # Key Routing
//!
//! A resource's kind is encoded in its key: a key containing the BGM marker
//! is background music, one containing the SFX marker is a sound effect.
//! Markers match anywhere in the key, and a key containing both is routed to
//! BGM.

use crate::config::CatalogConfig;
use crate::error::{CatalogError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Kind of resource a key routes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceKind {
    /// Background music: one instance per key, restarted on play
    Bgm,
    /// Sound effect: any number of overlapping instances per key
    Sfx,
}

impl ResourceKind {
    /// Classify `key` using the configured markers.
    pub fn classify(key: &str, config: &CatalogConfig) -> Result<Self> {
        if key.contains(config.bgm_marker.as_str()) {
            Ok(ResourceKind::Bgm)
        } else if key.contains(config.sfx_marker.as_str()) {
            Ok(ResourceKind::Sfx)
        } else {
            Err(CatalogError::InvalidKeyPrefix(key.to_string()))
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ResourceKind::Bgm => "bgm",
            ResourceKind::Sfx => "sfx",
        }
    }
}

impl fmt::Display for ResourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marker_anywhere_in_key() {
        let config = CatalogConfig::default();
        assert_eq!(ResourceKind::classify("bgm.theme", &config).unwrap(), ResourceKind::Bgm);
        assert_eq!(ResourceKind::classify("stage1.bgm.boss", &config).unwrap(), ResourceKind::Bgm);
        assert_eq!(ResourceKind::classify("sfx.jump", &config).unwrap(), ResourceKind::Sfx);
        assert_eq!(ResourceKind::classify("ui/sfx.click", &config).unwrap(), ResourceKind::Sfx);
    }

    #[test]
    fn test_both_markers_route_to_bgm() {
        let config = CatalogConfig::default();
        assert_eq!(ResourceKind::classify("sfx.bgm.mix", &config).unwrap(), ResourceKind::Bgm);
    }

    #[test]
    fn test_no_marker_is_rejected() {
        let config = CatalogConfig::default();
        for key in ["theme", "", "bgm", "SFX.jump"] {
            assert!(matches!(
                ResourceKind::classify(key, &config),
                Err(CatalogError::InvalidKeyPrefix(_))
            ));
        }
    }

    #[test]
    fn test_custom_markers() {
        let config = CatalogConfig::default().with_markers("music:", "se:");
        assert_eq!(ResourceKind::classify("music:title", &config).unwrap(), ResourceKind::Bgm);
        assert_eq!(ResourceKind::classify("se:coin", &config).unwrap(), ResourceKind::Sfx);
        assert!(ResourceKind::classify("bgm.title", &config).is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(ResourceKind::Bgm.to_string(), "bgm");
        assert_eq!(ResourceKind::Sfx.to_string(), "sfx");
    }
}
