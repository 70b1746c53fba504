//! # Playback Error Types
//!
//! Error types for player instances and their decoder/device collaborators.

use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during playback operations.
#[derive(Error, Debug)]
pub enum PlaybackError {
    // ========================================================================
    // Playback Control Errors
    // ========================================================================
    /// Seek position lies beyond the end of the resource.
    #[error("Seek position {requested:?} exceeds resource duration {duration:?}")]
    SeekOutOfRange {
        /// Position that was asked for
        requested: Duration,
        /// Total duration of the resource
        duration: Duration,
    },

    /// The instance has released its decoder and device.
    #[error("Player instance {0} has been disposed")]
    InstanceDisposed(String),

    // ========================================================================
    // Collaborator Errors
    // ========================================================================
    /// Audio format is not recognized or cannot be parsed.
    #[error("Unsupported or invalid audio format: {0}")]
    InvalidFormat(String),

    /// Decoder encountered an error.
    #[error("Decoder error: {0}")]
    DecoderError(String),

    /// Platform audio device encountered an error.
    #[error("Audio device error: {0}")]
    AudioDeviceError(String),

    // ========================================================================
    // Generic Errors
    // ========================================================================
    /// I/O error occurred.
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

impl PlaybackError {
    /// Returns `true` if the error was raised by the decoder or device rather
    /// than by a rejected request.
    pub fn is_collaborator_error(&self) -> bool {
        matches!(
            self,
            PlaybackError::DecoderError(_)
                | PlaybackError::AudioDeviceError(_)
                | PlaybackError::InvalidFormat(_)
        )
    }

    /// Returns `true` if the request was rejected and nothing changed.
    pub fn is_rejected_request(&self) -> bool {
        matches!(
            self,
            PlaybackError::SeekOutOfRange { .. } | PlaybackError::InstanceDisposed(_)
        )
    }
}

/// Result type for playback operations.
pub type Result<T> = std::result::Result<T, PlaybackError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_classification() {
        let seek = PlaybackError::SeekOutOfRange {
            requested: Duration::from_secs(5),
            duration: Duration::from_secs(3),
        };
        assert!(seek.is_rejected_request());
        assert!(!seek.is_collaborator_error());

        let device = PlaybackError::AudioDeviceError("unplugged".into());
        assert!(device.is_collaborator_error());
        assert!(!device.is_rejected_request());
    }

    #[test]
    fn error_messages() {
        let err = PlaybackError::InstanceDisposed("1234".into());
        assert_eq!(err.to_string(), "Player instance 1234 has been disposed");
    }
}
