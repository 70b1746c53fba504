//! # Catalog Error Types

use core_playback::PlaybackError;
use thiserror::Error;

/// Errors returned by catalog operations.
#[derive(Error, Debug)]
pub enum CatalogError {
    /// Key contains neither the BGM nor the SFX marker.
    #[error("Resource key '{0}' has no BGM or SFX marker")]
    InvalidKeyPrefix(String),

    /// A resource with this key is already registered.
    #[error("Resource key '{0}' is already registered")]
    DuplicateKey(String),

    /// No resource with this key is registered.
    #[error("Unknown resource key '{0}'")]
    UnknownKey(String),

    /// Player instance, decoder or device failure.
    #[error(transparent)]
    Playback(#[from] PlaybackError),

    /// Invalid catalog configuration.
    #[error("Invalid catalog configuration: {0}")]
    Config(String),

    /// I/O error while loading resources or configuration.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl CatalogError {
    /// Returns `true` for a seek past the end of the resource.
    pub fn is_seek_out_of_range(&self) -> bool {
        matches!(
            self,
            CatalogError::Playback(PlaybackError::SeekOutOfRange { .. })
        )
    }

    /// Returns `true` if the key was rejected or not found.
    pub fn is_key_error(&self) -> bool {
        matches!(
            self,
            CatalogError::InvalidKeyPrefix(_)
                | CatalogError::DuplicateKey(_)
                | CatalogError::UnknownKey(_)
        )
    }
}

/// Result type for catalog operations.
pub type Result<T> = std::result::Result<T, CatalogError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[test]
    fn classification() {
        assert!(CatalogError::UnknownKey("sfx.x".into()).is_key_error());
        assert!(CatalogError::InvalidKeyPrefix("x".into()).is_key_error());
        assert!(!CatalogError::Config("bad".into()).is_key_error());

        let seek: CatalogError = PlaybackError::SeekOutOfRange {
            requested: Duration::from_secs(5),
            duration: Duration::from_secs(3),
        }
        .into();
        assert!(seek.is_seek_out_of_range());
        assert!(!seek.is_key_error());
    }

    #[test]
    fn playback_errors_display_transparently() {
        let err: CatalogError = PlaybackError::AudioDeviceError("gone".into()).into();
        assert_eq!(err.to_string(), "Audio device error: gone");
    }
}
