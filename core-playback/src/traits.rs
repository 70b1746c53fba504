//! # Core Playback Traits
//!
//! Abstractions over the two collaborators a player instance drives: a
//! decoder that turns an [`AudioBuffer`] into samples and a playback device
//! that renders them.
//!
//! ## Architecture
//!
//! The playback system uses a **producer-consumer model**:
//!
//! - **Producer ([`Decoder`])**: decodes the encoded buffer into interleaved
//!   `f32` samples on demand. It is wrapped in a [`DecoderHandle`] so the
//!   device can pull samples while the owning instance seeks.
//! - **Consumer ([`PlaybackDevice`])**: pulls from the handle on its own
//!   execution context (an audio thread or host callback) and reports the end
//!   of every playback through a [`StopNotifier`].
//!
//! ## Threading Model
//!
//! Decoders and devices must be `Send`: they are created on the caller's
//! thread and then touched from device threads. The backend factory is
//! shared by the catalog and must be `Send + Sync`.
//!
//! ## Notification Contract
//!
//! A device delivers exactly one `playback_stopped()` per playback that ends,
//! whether it ended because `stop()` was called or because the stream ran
//! out. The call is made from the device's own context, never synchronously
//! from inside `play`, `pause`, or `stop`. Calling `stop()` on an idle device
//! is a no-op. A device must tolerate being stopped and closed from within
//! its own notification context.

use crate::buffer::AudioBuffer;
use crate::error::Result;
use crate::player::StopNotifier;
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

/// Trait for decoders that convert an encoded buffer into PCM samples.
pub trait Decoder: Send {
    /// Total duration of the resource.
    fn duration(&self) -> Duration;

    /// Current read position.
    fn position(&self) -> Duration;

    /// Move the read position.
    ///
    /// Callers validate `position` against [`Decoder::duration`] first.
    fn seek(&mut self, position: Duration) -> Result<()>;

    /// Fill `out` with interleaved samples in `[-1.0, 1.0]`.
    ///
    /// Returns the number of samples written; `0` means end of stream.
    fn read_samples(&mut self, out: &mut [f32]) -> Result<usize>;
}

/// Shared, lock-protected handle to one decoder.
///
/// Cloned into the device as its sample stream; the owning player instance
/// keeps another clone for seeking. No other owner exists.
#[derive(Clone)]
pub struct DecoderHandle {
    inner: Arc<Mutex<Box<dyn Decoder>>>,
}

impl DecoderHandle {
    /// Wrap a decoder.
    pub fn new(decoder: Box<dyn Decoder>) -> Self {
        Self {
            inner: Arc::new(Mutex::new(decoder)),
        }
    }

    /// Pull the next samples from the stream.
    pub fn read_samples(&self, out: &mut [f32]) -> Result<usize> {
        self.inner.lock().read_samples(out)
    }

    /// Total duration of the resource.
    pub fn duration(&self) -> Duration {
        self.inner.lock().duration()
    }

    /// Current read position.
    pub fn position(&self) -> Duration {
        self.inner.lock().position()
    }

    pub(crate) fn seek(&self, position: Duration) -> Result<()> {
        self.inner.lock().seek(position)
    }
}

impl fmt::Debug for DecoderHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let decoder = self.inner.lock();
        f.debug_struct("DecoderHandle")
            .field("position", &decoder.position())
            .field("duration", &decoder.duration())
            .finish()
    }
}

/// Trait for platform playback devices.
///
/// See the module documentation for the notification contract.
pub trait PlaybackDevice: Send {
    /// Start or resume rendering from the decoder's current position.
    ///
    /// `notifier` replaces any previously supplied notifier; the end of this
    /// playback is reported through it.
    fn play(&mut self, notifier: StopNotifier) -> Result<()>;

    /// Pause rendering without ending the playback.
    fn pause(&mut self) -> Result<()>;

    /// End the current playback.
    fn stop(&mut self) -> Result<()>;

    /// Release the underlying hardware handle. No calls follow.
    fn close(&mut self) -> Result<()>;
}

/// Factory for decoder/device pairs.
///
/// One backend serves the whole catalog; every player instance asks it for
/// its own decoder and device.
pub trait AudioBackend: Send + Sync {
    /// Create a decoder reading from `buffer`.
    fn open_decoder(&self, buffer: &AudioBuffer) -> Result<Box<dyn Decoder>>;

    /// Create a device that renders samples pulled from `stream`.
    fn open_device(&self, stream: DecoderHandle) -> Result<Box<dyn PlaybackDevice>>;
}
