//! # Simulated Backend
//!
//! A deterministic [`AudioBackend`] with no hardware behind it. Decoders
//! produce silence and devices only record what they were asked to do;
//! the test drives completion explicitly through a [`SimDeviceHandle`]:
//!
//! - [`SimDeviceHandle::finish`] ends the current playback as if the stream
//!   ran out, delivering the notification from the calling thread.
//! - `stop()` queues its notification instead of delivering it, the same way
//!   a real device reports from its own context later.
//!   [`SimDeviceHandle::deliver_pending`] flushes that queue.
//! - [`SimDeviceHandle::render`] pulls samples like an audio callback and
//!   finishes once the decoder reports end of stream.
//!
//! Durations are derived from the buffer length: by default one byte is one
//! millisecond of audio.
//!
//! Closing a device drops its decoder, and the backend forgets closed devices
//! the next time it opens one, so a long-running host does not accumulate them.

use crate::buffer::AudioBuffer;
use crate::error::{PlaybackError, Result};
use crate::player::StopNotifier;
use crate::traits::{AudioBackend, Decoder, DecoderHandle, PlaybackDevice};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::trace;

/// Samples per second produced by [`SimDecoder`] (mono).
pub const SIM_SAMPLE_RATE: u32 = 1_000;

/// Default number of buffer bytes per second of audio.
pub const DEFAULT_BYTE_RATE: u32 = 1_000;

/// Decoder producing silence for a fixed duration.
#[derive(Debug)]
pub struct SimDecoder {
    duration: Duration,
    position: Duration,
}

impl SimDecoder {
    pub fn new(duration: Duration) -> Self {
        Self {
            duration,
            position: Duration::ZERO,
        }
    }
}

impl Decoder for SimDecoder {
    fn duration(&self) -> Duration {
        self.duration
    }

    fn position(&self) -> Duration {
        self.position
    }

    fn seek(&mut self, position: Duration) -> Result<()> {
        if position > self.duration {
            return Err(PlaybackError::DecoderError(format!(
                "seek to {:?} past end {:?}",
                position, self.duration
            )));
        }
        self.position = position;
        Ok(())
    }

    fn read_samples(&mut self, out: &mut [f32]) -> Result<usize> {
        let sample = Duration::from_secs(1) / SIM_SAMPLE_RATE;
        let remaining = self.duration.saturating_sub(self.position);
        let available = (remaining.as_nanos() / sample.as_nanos()) as usize;
        let count = available.min(out.len());

        out[..count].fill(0.0);
        self.position += sample * count as u32;
        Ok(count)
    }
}

#[derive(Debug, Default)]
struct SimDeviceState {
    stream: Option<DecoderHandle>,
    playing: bool,
    paused: bool,
    closed: bool,
    notifier: Option<StopNotifier>,
    pending: Vec<StopNotifier>,
    play_calls: usize,
    stop_calls: usize,
    close_calls: usize,
}

/// Device that records calls and defers notifications.
pub struct SimDevice {
    state: Arc<Mutex<SimDeviceState>>,
}

impl PlaybackDevice for SimDevice {
    fn play(&mut self, notifier: StopNotifier) -> Result<()> {
        let mut state = self.state.lock();
        if state.closed {
            return Err(PlaybackError::AudioDeviceError("device closed".to_string()));
        }
        trace!(session = notifier.session(), "Sim device play");
        state.playing = true;
        state.paused = false;
        state.notifier = Some(notifier);
        state.play_calls += 1;
        Ok(())
    }

    fn pause(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        if state.playing {
            state.paused = true;
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.stop_calls += 1;
        if !state.playing {
            return Ok(());
        }
        state.playing = false;
        state.paused = false;
        if let Some(notifier) = state.notifier.take() {
            state.pending.push(notifier);
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        let mut state = self.state.lock();
        state.playing = false;
        state.paused = false;
        state.closed = true;
        state.close_calls += 1;
        state.notifier = None;
        state.stream = None;
        Ok(())
    }
}

/// Test-side view of a [`SimDevice`].
#[derive(Clone)]
pub struct SimDeviceHandle {
    state: Arc<Mutex<SimDeviceState>>,
}

impl SimDeviceHandle {
    /// End the current playback naturally.
    ///
    /// Returns `false` if nothing was playing.
    pub fn finish(&self) -> bool {
        let notifier = {
            let mut state = self.state.lock();
            if !state.playing {
                return false;
            }
            state.playing = false;
            state.paused = false;
            state.notifier.take()
        };

        if let Some(notifier) = notifier {
            notifier.playback_stopped();
        }
        true
    }

    /// Deliver notifications queued by `stop()`. Returns how many were sent.
    pub fn deliver_pending(&self) -> usize {
        let pending = std::mem::take(&mut self.state.lock().pending);
        let count = pending.len();
        for notifier in pending {
            notifier.playback_stopped();
        }
        count
    }

    /// Pull up to `max_samples` like an audio callback would.
    ///
    /// Finishes the playback once the stream is exhausted.
    pub fn render(&self, max_samples: usize) -> Result<usize> {
        let stream = {
            let state = self.state.lock();
            match &state.stream {
                Some(stream) if state.playing && !state.paused => stream.clone(),
                _ => return Ok(0),
            }
        };

        let mut out = vec![0.0f32; max_samples];
        let read = stream.read_samples(&mut out)?;
        if read == 0 {
            self.finish();
        }
        Ok(read)
    }

    pub fn is_playing(&self) -> bool {
        let state = self.state.lock();
        state.playing && !state.paused
    }

    pub fn is_paused(&self) -> bool {
        let state = self.state.lock();
        state.playing && state.paused
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Session of the notifier supplied by the latest `play()`, while playing.
    pub fn session(&self) -> Option<u64> {
        self.state.lock().notifier.as_ref().map(StopNotifier::session)
    }

    /// Notifier supplied by the latest `play()`, while playing.
    pub fn notifier(&self) -> Option<StopNotifier> {
        self.state.lock().notifier.clone()
    }

    pub fn pending_notifications(&self) -> usize {
        self.state.lock().pending.len()
    }

    pub fn play_calls(&self) -> usize {
        self.state.lock().play_calls
    }

    pub fn stop_calls(&self) -> usize {
        self.state.lock().stop_calls
    }

    pub fn close_calls(&self) -> usize {
        self.state.lock().close_calls
    }

    /// Position of the decoder the device renders from. Zero once closed.
    pub fn position(&self) -> Duration {
        let stream = self.state.lock().stream.clone();
        stream.map(|stream| stream.position()).unwrap_or(Duration::ZERO)
    }
}

/// Backend handing out [`SimDecoder`]s and [`SimDevice`]s.
pub struct SimBackend {
    byte_rate: u32,
    reject_devices: AtomicBool,
    opened: AtomicUsize,
    devices: Mutex<Vec<SimDeviceHandle>>,
}

impl SimBackend {
    pub fn new() -> Self {
        Self::with_byte_rate(DEFAULT_BYTE_RATE)
    }

    /// Backend where `byte_rate` buffer bytes make one second of audio.
    pub fn with_byte_rate(byte_rate: u32) -> Self {
        Self {
            byte_rate: byte_rate.max(1),
            reject_devices: AtomicBool::new(false),
            opened: AtomicUsize::new(0),
            devices: Mutex::new(Vec::new()),
        }
    }

    /// Buffer length that decodes to `duration`.
    pub fn bytes_for(&self, duration: Duration) -> usize {
        (duration.as_millis() * self.byte_rate as u128 / 1_000) as usize
    }

    /// Make subsequent `open_device` calls fail.
    pub fn set_reject_devices(&self, reject: bool) {
        self.reject_devices.store(reject, Ordering::SeqCst);
    }

    /// Devices still tracked, oldest first.
    ///
    /// Holds every open device plus any closed since the last `open_device`.
    pub fn devices(&self) -> Vec<SimDeviceHandle> {
        self.devices.lock().clone()
    }

    pub fn last_device(&self) -> Option<SimDeviceHandle> {
        self.devices.lock().last().cloned()
    }

    /// Number of devices opened over the backend's lifetime.
    pub fn device_count(&self) -> usize {
        self.opened.load(Ordering::SeqCst)
    }

    /// Number of device handles the backend currently holds.
    pub fn tracked_devices(&self) -> usize {
        self.devices.lock().len()
    }

    /// Devices not yet closed.
    pub fn open_devices(&self) -> usize {
        self.devices
            .lock()
            .iter()
            .filter(|device| !device.is_closed())
            .count()
    }
}

impl Default for SimBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl AudioBackend for SimBackend {
    fn open_decoder(&self, buffer: &AudioBuffer) -> Result<Box<dyn Decoder>> {
        if buffer.is_empty() {
            return Err(PlaybackError::InvalidFormat("empty audio buffer".to_string()));
        }
        let millis = buffer.len() as u64 * 1_000 / self.byte_rate as u64;
        Ok(Box::new(SimDecoder::new(Duration::from_millis(millis))))
    }

    fn open_device(&self, stream: DecoderHandle) -> Result<Box<dyn PlaybackDevice>> {
        if self.reject_devices.load(Ordering::SeqCst) {
            return Err(PlaybackError::AudioDeviceError(
                "no output device available".to_string(),
            ));
        }

        let state = Arc::new(Mutex::new(SimDeviceState {
            stream: Some(stream),
            ..SimDeviceState::default()
        }));

        let mut devices = self.devices.lock();
        devices.retain(|device| !device.is_closed());
        devices.push(SimDeviceHandle {
            state: Arc::clone(&state),
        });
        self.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SimDevice { state }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decoder_produces_silence_until_end() {
        let mut decoder = SimDecoder::new(Duration::from_millis(5));
        let mut out = [1.0f32; 4];

        assert_eq!(decoder.read_samples(&mut out).unwrap(), 4);
        assert!(out.iter().all(|s| *s == 0.0));
        assert_eq!(decoder.read_samples(&mut out).unwrap(), 1);
        assert_eq!(decoder.read_samples(&mut out).unwrap(), 0);
        assert_eq!(decoder.position(), Duration::from_millis(5));
    }

    #[test]
    fn backend_derives_duration_from_length() {
        let backend = SimBackend::with_byte_rate(2_000);
        let buffer = AudioBuffer::new(vec![0u8; backend.bytes_for(Duration::from_secs(2))]);
        let decoder = backend.open_decoder(&buffer).unwrap();
        assert_eq!(decoder.duration(), Duration::from_secs(2));
    }

    #[test]
    fn empty_buffer_is_rejected() {
        let backend = SimBackend::new();
        let result = backend.open_decoder(&AudioBuffer::new(Vec::new()));
        assert!(matches!(result, Err(PlaybackError::InvalidFormat(_))));
    }

    #[test]
    fn rejected_devices_report_device_error() {
        let backend = SimBackend::new();
        backend.set_reject_devices(true);
        let decoder = DecoderHandle::new(Box::new(SimDecoder::new(Duration::from_secs(1))));
        let result = backend.open_device(decoder);
        assert!(matches!(result, Err(PlaybackError::AudioDeviceError(_))));
        assert_eq!(backend.device_count(), 0);
    }

    #[test]
    fn stop_on_idle_device_is_noop() {
        let backend = SimBackend::new();
        let decoder = DecoderHandle::new(Box::new(SimDecoder::new(Duration::from_secs(1))));
        let mut device = backend.open_device(decoder).unwrap();
        device.stop().unwrap();

        let handle = backend.last_device().unwrap();
        assert_eq!(handle.pending_notifications(), 0);
        assert!(!handle.finish());
    }

    #[test]
    fn closed_devices_release_decoder_and_are_pruned() {
        let backend = SimBackend::new();
        let buffer = AudioBuffer::new(vec![0u8; 100]);

        for _ in 0..50 {
            let decoder = DecoderHandle::new(backend.open_decoder(&buffer).unwrap());
            let mut device = backend.open_device(decoder).unwrap();
            let handle = backend.last_device().unwrap();
            device.close().unwrap();
            assert_eq!(handle.position(), Duration::ZERO);
            assert_eq!(handle.render(16).unwrap(), 0);
        }

        assert_eq!(backend.device_count(), 50);
        assert_eq!(backend.tracked_devices(), 1);
        assert_eq!(backend.open_devices(), 0);
    }
}
