//! # Audio Buffers
//!
//! An [`AudioBuffer`] is one encoded audio resource held in memory. It is
//! immutable and cheap to clone: every player instance created from the same
//! resource shares the same bytes.

use crate::error::Result;
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use tracing::debug;

/// Container/codec detected from the leading bytes of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    /// MPEG-1 Audio Layer 3
    Mp3,
    /// Free Lossless Audio Codec
    Flac,
    /// Ogg Vorbis
    Vorbis,
    /// Waveform Audio File Format
    Wav,
    /// Codec not recognized
    Unknown,
}

impl AudioCodec {
    /// Detect the codec from magic bytes.
    pub fn sniff(bytes: &[u8]) -> Self {
        if bytes.len() < 4 {
            return AudioCodec::Unknown;
        }

        match &bytes[0..4] {
            b"RIFF" => AudioCodec::Wav,
            b"OggS" => AudioCodec::Vorbis,
            b"fLaC" => AudioCodec::Flac,
            // ID3 tag or a bare MPEG frame sync
            [b'I', b'D', b'3', _] | [0xFF, 0xFB, _, _] | [0xFF, 0xFA, _, _] | [0xFF, 0xF3, _, _] => {
                AudioCodec::Mp3
            }
            _ => AudioCodec::Unknown,
        }
    }

    /// Get the common file extension for a codec.
    pub fn extension(&self) -> &'static str {
        match self {
            AudioCodec::Mp3 => "mp3",
            AudioCodec::Flac => "flac",
            AudioCodec::Vorbis => "ogg",
            AudioCodec::Wav => "wav",
            AudioCodec::Unknown => "bin",
        }
    }

    /// Get the MIME type for a codec.
    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioCodec::Mp3 => "audio/mpeg",
            AudioCodec::Flac => "audio/flac",
            AudioCodec::Vorbis => "audio/ogg",
            AudioCodec::Wav => "audio/wav",
            AudioCodec::Unknown => "application/octet-stream",
        }
    }
}

/// Immutable encoded audio resource.
#[derive(Clone, PartialEq, Eq)]
pub struct AudioBuffer {
    data: Bytes,
}

impl AudioBuffer {
    /// Wrap encoded bytes.
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Wrap a static byte slice without copying.
    pub fn from_static(data: &'static [u8]) -> Self {
        Self {
            data: Bytes::from_static(data),
        }
    }

    /// Read an entire file into a buffer.
    pub fn from_file(path: &Path) -> Result<Self> {
        let data = std::fs::read(path)?;
        debug!(bytes = data.len(), "Read audio buffer from file");
        Ok(Self::new(data))
    }

    /// The encoded bytes.
    pub fn bytes(&self) -> &Bytes {
        &self.data
    }

    /// Length of the encoded data in bytes.
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Returns `true` if the buffer holds no data.
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Codec sniffed from the leading bytes.
    ///
    /// Informational only; decoders make the final call.
    pub fn codec(&self) -> AudioCodec {
        AudioCodec::sniff(&self.data)
    }
}

impl fmt::Debug for AudioBuffer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioBuffer")
            .field("len", &self.data.len())
            .field("codec", &self.codec())
            .finish()
    }
}

impl From<Vec<u8>> for AudioBuffer {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl From<Bytes> for AudioBuffer {
    fn from(data: Bytes) -> Self {
        Self { data }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_codec_sniffing() {
        assert_eq!(AudioCodec::sniff(b"RIFF....WAVE"), AudioCodec::Wav);
        assert_eq!(AudioCodec::sniff(b"OggS...."), AudioCodec::Vorbis);
        assert_eq!(AudioCodec::sniff(b"fLaC...."), AudioCodec::Flac);
        assert_eq!(AudioCodec::sniff(b"ID3\x04...."), AudioCodec::Mp3);
        assert_eq!(AudioCodec::sniff(&[0xFF, 0xFB, 0x90, 0x00]), AudioCodec::Mp3);
        assert_eq!(AudioCodec::sniff(b"ABCD"), AudioCodec::Unknown);
        assert_eq!(AudioCodec::sniff(b"RI"), AudioCodec::Unknown);
    }

    #[test]
    fn test_codec_extension_and_mime() {
        assert_eq!(AudioCodec::Vorbis.extension(), "ogg");
        assert_eq!(AudioCodec::Mp3.mime_type(), "audio/mpeg");
        assert_eq!(AudioCodec::Unknown.mime_type(), "application/octet-stream");
    }

    #[test]
    fn test_clones_share_bytes() {
        let buffer = AudioBuffer::new(vec![1u8, 2, 3, 4]);
        let clone = buffer.clone();
        assert_eq!(buffer.bytes().as_ptr(), clone.bytes().as_ptr());
        assert_eq!(clone.len(), 4);
        assert!(!clone.is_empty());
    }

    #[test]
    fn test_unknown_codec_is_still_accepted() {
        let buffer = AudioBuffer::from_static(b"not audio at all");
        assert_eq!(buffer.codec(), AudioCodec::Unknown);
        assert_eq!(buffer.len(), 16);
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let result = AudioBuffer::from_file(Path::new("/definitely/not/here.ogg"));
        assert!(matches!(result, Err(crate::PlaybackError::IoError(_))));
    }
}
