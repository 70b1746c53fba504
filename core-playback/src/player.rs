//! # Player Instances
//!
//! A [`PlayerInstance`] binds one decoder and one playback device to a
//! resource and runs the playback state machine:
//!
//! ```text
//! Idle ──play──> Playing <──play/pause──> Paused
//!                  │  ▲                     │
//!            stop/ │  │ play                │ stop
//!       completion ▼  │                     ▼
//!                 Stopped <─────────────────┘
//!
//! any state ──dispose──> Disposed
//! ```
//!
//! ## Looping
//!
//! When the device reports that a playback ended and the instance is still
//! `Playing` with `looping` set, the instance rewinds the decoder and replays
//! while holding its own lock. `stop()` clears `looping` under the same lock
//! before halting the device, so a completion that races a stop can never
//! restart playback.
//!
//! A playback that ends while the instance is paused is not lost: a one-shot
//! completes right away, and a looping instance replays from the start when
//! it is resumed.
//!
//! ## Sessions
//!
//! Devices do not say why a playback ended. Every fresh start bumps a session
//! counter and hands the device a [`StopNotifier`] carrying it; a notification
//! for an older session (for example the one produced by the `stop()` inside
//! a restart) is recognised as stale and ignored.
//!
//! ## Disposal
//!
//! `dispose()` takes the decoder, device and buffer out of the instance under
//! the lock, so exactly one caller performs the release no matter how many
//! paths race to it. Device errors during release are logged and swallowed.
//! Dropping the last handle disposes as well.

use crate::buffer::AudioBuffer;
use crate::error::{PlaybackError, Result};
use crate::traits::{AudioBackend, DecoderHandle, PlaybackDevice};
use core_runtime::events::{CoreEvent, EventBus, PlaybackEvent};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, trace, warn};
use uuid::Uuid;

/// Unique identifier of a player instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct InstanceId(Uuid);

impl InstanceId {
    fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for InstanceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Playback state of an instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PlayerState {
    /// Created, never played
    Idle,
    /// Device is rendering
    Playing,
    /// Rendering suspended, position kept
    Paused,
    /// Stopped explicitly or finished naturally
    Stopped,
    /// Decoder and device released; terminal
    Disposed,
}

impl PlayerState {
    /// Returns `true` while the device holds an unfinished playback.
    pub fn is_active(&self) -> bool {
        matches!(self, PlayerState::Playing | PlayerState::Paused)
    }
}

/// Receives the ends of an instance's playbacks.
///
/// Invoked after the instance lock has been released, so implementations may
/// dispose the instance.
pub trait CompletionObserver: Send + Sync {
    /// Non-looping playback ran to its natural end. Called from the device's
    /// execution context.
    fn on_completed(&self, instance: &PlayerInstance);

    /// An explicit `stop()` halted an active playback. Called from the thread
    /// that stopped it.
    fn on_stopped(&self, _instance: &PlayerInstance) {}
}

impl<F> CompletionObserver for F
where
    F: Fn(&PlayerInstance) + Send + Sync,
{
    fn on_completed(&self, instance: &PlayerInstance) {
        self(instance)
    }
}

/// Message channel from a device back into the instance that owns it.
///
/// Holds only a weak reference: a notifier kept by a device never keeps a
/// disposed instance alive.
#[derive(Clone)]
pub struct StopNotifier {
    target: Weak<PlayerShared>,
    session: u64,
}

impl StopNotifier {
    fn new(target: &Arc<PlayerShared>, session: u64) -> Self {
        Self {
            target: Arc::downgrade(target),
            session,
        }
    }

    /// Report that the playback this notifier was issued for has ended.
    pub fn playback_stopped(&self) {
        match self.target.upgrade() {
            Some(shared) => PlayerShared::handle_playback_stopped(&shared, self.session),
            None => trace!(session = self.session, "Stop notification for dropped instance"),
        }
    }

    /// Session the notifier was issued for.
    pub fn session(&self) -> u64 {
        self.session
    }
}

impl fmt::Debug for StopNotifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StopNotifier")
            .field("session", &self.session)
            .field("attached", &(self.target.strong_count() > 0))
            .finish()
    }
}

struct PlaybackResources {
    decoder: DecoderHandle,
    device: Box<dyn PlaybackDevice>,
    // Keeps the shared bytes alive for exactly as long as the decoder
    _buffer: AudioBuffer,
}

impl PlaybackResources {
    fn release(mut self, key: &str, id: InstanceId, was_active: bool) {
        if was_active {
            if let Err(e) = self.device.stop() {
                warn!(key, instance = %id, error = %e, "Device stop failed during dispose");
            }
        }
        if let Err(e) = self.device.close() {
            warn!(key, instance = %id, error = %e, "Device close failed during dispose");
        }
    }
}

struct PlayerInner {
    state: PlayerState,
    looping: bool,
    // Looping playback ended while paused; the next resume starts over
    restart_on_resume: bool,
    session: u64,
    duration: Duration,
    resources: Option<PlaybackResources>,
    observer: Option<Arc<dyn CompletionObserver>>,
}

impl PlayerInner {
    fn live(&mut self, id: InstanceId) -> Result<&mut PlaybackResources> {
        self.resources
            .as_mut()
            .ok_or_else(|| PlaybackError::InstanceDisposed(id.to_string()))
    }
}

struct PlayerShared {
    id: InstanceId,
    key: String,
    events: Option<EventBus>,
    inner: Mutex<PlayerInner>,
}

impl PlayerShared {
    fn emit(&self, make: impl FnOnce(String, String) -> PlaybackEvent) {
        if let Some(bus) = &self.events {
            bus.publish(CoreEvent::Playback(make(self.key.clone(), self.id.to_string())));
        }
    }

    fn handle_playback_stopped(shared: &Arc<PlayerShared>, session: u64) {
        let mut inner = shared.inner.lock();

        if inner.resources.is_none() || !inner.state.is_active() || inner.session != session {
            trace!(
                key = %shared.key,
                instance = %shared.id,
                session,
                current = inner.session,
                state = ?inner.state,
                "Ignoring stale stop notification"
            );
            return;
        }

        if inner.state == PlayerState::Paused && inner.looping {
            inner.restart_on_resume = true;
            debug!(key = %shared.key, instance = %shared.id, "Playback ended while paused");
            return;
        }

        if inner.looping {
            inner.session += 1;
            let notifier = StopNotifier::new(shared, inner.session);
            let restarted = match inner.resources.as_mut() {
                Some(res) => res
                    .decoder
                    .seek(Duration::ZERO)
                    .and_then(|_| res.device.play(notifier)),
                None => Ok(()),
            };

            match restarted {
                Ok(()) => {
                    debug!(key = %shared.key, instance = %shared.id, "Looping playback");
                    shared.emit(|key, instance_id| PlaybackEvent::Looped { key, instance_id });
                    return;
                }
                Err(e) => {
                    warn!(key = %shared.key, instance = %shared.id, error = %e, "Loop restart failed");
                }
            }
        }

        inner.state = PlayerState::Stopped;
        if let Some(res) = inner.resources.as_ref() {
            if let Err(e) = res.decoder.seek(Duration::ZERO) {
                warn!(key = %shared.key, instance = %shared.id, error = %e, "Rewind after completion failed");
            }
        }
        debug!(key = %shared.key, instance = %shared.id, "Playback completed");
        shared.emit(|key, instance_id| PlaybackEvent::Completed { key, instance_id });

        let observer = inner.observer.clone();
        drop(inner);

        if let Some(observer) = observer {
            observer.on_completed(&PlayerInstance {
                shared: Arc::clone(shared),
            });
        }
    }
}

impl Drop for PlayerShared {
    fn drop(&mut self) {
        let inner = self.inner.get_mut();
        if let Some(resources) = inner.resources.take() {
            let was_active = inner.state.is_active();
            inner.state = PlayerState::Disposed;
            inner.observer = None;
            trace!(key = %self.key, instance = %self.id, "Releasing dropped instance");
            resources.release(&self.key, self.id, was_active);
            self.emit(|key, instance_id| PlaybackEvent::Disposed { key, instance_id });
        }
    }
}

/// Handle to one decoder+device binding.
///
/// Handles are cheap to clone and all refer to the same instance.
#[derive(Clone)]
pub struct PlayerInstance {
    shared: Arc<PlayerShared>,
}

impl PlayerInstance {
    /// Open a decoder and device for `buffer` and bind them to a new instance.
    ///
    /// The instance starts `Idle` and does not loop.
    pub fn open(
        key: impl Into<String>,
        buffer: AudioBuffer,
        backend: &dyn AudioBackend,
        events: Option<EventBus>,
    ) -> Result<Self> {
        let key = key.into();
        let decoder = DecoderHandle::new(backend.open_decoder(&buffer)?);
        let device = backend.open_device(decoder.clone())?;
        let duration = decoder.duration();
        let id = InstanceId::new();

        debug!(key = %key, instance = %id, duration_ms = duration.as_millis() as u64, "Opened player instance");

        Ok(Self {
            shared: Arc::new(PlayerShared {
                id,
                key,
                events,
                inner: Mutex::new(PlayerInner {
                    state: PlayerState::Idle,
                    looping: false,
                    restart_on_resume: false,
                    session: 0,
                    duration,
                    resources: Some(PlaybackResources {
                        decoder,
                        device,
                        _buffer: buffer,
                    }),
                    observer: None,
                }),
            }),
        })
    }

    pub fn id(&self) -> InstanceId {
        self.shared.id
    }

    pub fn key(&self) -> &str {
        &self.shared.key
    }

    pub fn state(&self) -> PlayerState {
        self.shared.inner.lock().state
    }

    pub fn is_looping(&self) -> bool {
        self.shared.inner.lock().looping
    }

    pub fn is_disposed(&self) -> bool {
        self.shared.inner.lock().resources.is_none()
    }

    /// Total duration of the resource.
    pub fn duration(&self) -> Duration {
        self.shared.inner.lock().duration
    }

    /// Current decoder position. Zero once disposed.
    pub fn position(&self) -> Duration {
        let inner = self.shared.inner.lock();
        inner
            .resources
            .as_ref()
            .map(|res| res.decoder.position())
            .unwrap_or(Duration::ZERO)
    }

    /// Set whether natural completion restarts playback.
    pub fn set_looping(&self, looping: bool) -> Result<()> {
        let mut inner = self.shared.inner.lock();
        inner.live(self.shared.id)?;
        inner.looping = looping;
        Ok(())
    }

    /// Register the observer told about natural completion of non-looping playback.
    pub fn set_completion_observer(&self, observer: Arc<dyn CompletionObserver>) -> Result<()> {
        let mut inner = self.shared.inner.lock();
        inner.live(self.shared.id)?;
        inner.observer = Some(observer);
        Ok(())
    }

    /// Start playback, or resume it when paused.
    ///
    /// Playing instances are left alone: there is never more than one play
    /// request outstanding on a device.
    pub fn play(&self) -> Result<()> {
        let mut inner = self.shared.inner.lock();
        inner.live(self.shared.id)?;

        let resuming = match inner.state {
            PlayerState::Playing => return Ok(()),
            PlayerState::Paused => true,
            _ => false,
        };
        let fresh = !resuming || inner.restart_on_resume;
        if fresh {
            inner.session += 1;
        }

        let notifier = StopNotifier::new(&self.shared, inner.session);
        let res = inner.live(self.shared.id)?;
        if resuming && fresh {
            res.decoder.seek(Duration::ZERO)?;
        }
        res.device.play(notifier)?;
        inner.state = PlayerState::Playing;
        inner.restart_on_resume = false;

        debug!(key = %self.shared.key, instance = %self.shared.id, resuming, looping = inner.looping, "Playback started");
        self.shared
            .emit(|key, instance_id| PlaybackEvent::Started { key, instance_id });
        Ok(())
    }

    /// Pause playback, keeping the position. Only affects a playing instance.
    pub fn pause(&self) -> Result<()> {
        let mut inner = self.shared.inner.lock();
        inner.live(self.shared.id)?;

        if inner.state != PlayerState::Playing {
            return Ok(());
        }

        inner.live(self.shared.id)?.device.pause()?;
        inner.state = PlayerState::Paused;

        debug!(key = %self.shared.key, instance = %self.shared.id, "Playback paused");
        self.shared
            .emit(|key, instance_id| PlaybackEvent::Paused { key, instance_id });
        Ok(())
    }

    /// Stop playback and rewind to the start.
    ///
    /// `looping` is cleared before the device is halted, under the same lock
    /// the loop restart takes, so an in-flight completion cannot restart.
    /// When an active playback was halted the observer's `on_stopped` runs
    /// after the lock is released.
    pub fn stop(&self) -> Result<()> {
        let mut inner = self.shared.inner.lock();
        inner.live(self.shared.id)?;

        inner.looping = false;
        inner.restart_on_resume = false;
        let was_active = inner.state.is_active();
        if was_active {
            inner.state = PlayerState::Stopped;
        }

        let res = inner.live(self.shared.id)?;
        let halted = if was_active { res.device.stop() } else { Ok(()) };
        if let Err(e) = res.decoder.seek(Duration::ZERO) {
            warn!(key = %self.shared.key, instance = %self.shared.id, error = %e, "Rewind after stop failed");
        }

        let observer = if was_active {
            debug!(key = %self.shared.key, instance = %self.shared.id, "Playback stopped");
            self.shared
                .emit(|key, instance_id| PlaybackEvent::Stopped { key, instance_id });
            inner.observer.clone()
        } else {
            None
        };
        drop(inner);

        if let Some(observer) = observer {
            observer.on_stopped(self);
        }
        halted
    }

    /// Stop if needed, rewind to zero and play from the start.
    ///
    /// If the device refuses to halt, the running playback and its looping
    /// flag are left untouched. If it halts but cannot start again, the
    /// instance is left `Stopped`.
    pub fn restart(&self, looping: bool) -> Result<()> {
        let mut inner = self.shared.inner.lock();
        let was_active = inner.state.is_active();

        inner.live(self.shared.id)?;
        if was_active {
            inner.live(self.shared.id)?.device.stop()?;
            inner.state = PlayerState::Stopped;
            inner.restart_on_resume = false;
        }

        inner.session += 1;
        let notifier = StopNotifier::new(&self.shared, inner.session);
        let res = inner.live(self.shared.id)?;
        res.decoder.seek(Duration::ZERO)?;
        res.device.play(notifier)?;

        inner.state = PlayerState::Playing;
        inner.looping = looping;

        debug!(key = %self.shared.key, instance = %self.shared.id, looping, "Playback restarted");
        self.shared
            .emit(|key, instance_id| PlaybackEvent::Started { key, instance_id });
        Ok(())
    }

    /// Move the decoder to `position` without changing the playback state.
    pub fn seek(&self, position: Duration) -> Result<()> {
        let mut inner = self.shared.inner.lock();
        let duration = inner.duration;
        let res = inner.live(self.shared.id)?;

        if position > duration {
            return Err(PlaybackError::SeekOutOfRange {
                requested: position,
                duration,
            });
        }

        res.decoder.seek(position)?;

        trace!(key = %self.shared.key, instance = %self.shared.id, position_ms = position.as_millis() as u64, "Seeked");
        self.shared.emit(|key, instance_id| PlaybackEvent::SeekChanged {
            key,
            instance_id,
            position_ms: position.as_millis() as u64,
        });
        Ok(())
    }

    /// Stop and release decoder, device and buffer.
    ///
    /// Idempotent: later calls are no-ops. Device errors are logged, never
    /// returned.
    pub fn dispose(&self) {
        let mut inner = self.shared.inner.lock();
        let Some(resources) = inner.resources.take() else {
            return;
        };

        let was_active = inner.state.is_active();
        inner.looping = false;
        inner.restart_on_resume = false;
        inner.state = PlayerState::Disposed;
        inner.observer = None;
        debug!(key = %self.shared.key, instance = %self.shared.id, "Disposing player instance");
        self.shared
            .emit(|key, instance_id| PlaybackEvent::Disposed { key, instance_id });
        drop(inner);

        // Closing may join a device thread that is waiting on this lock
        resources.release(&self.shared.key, self.shared.id, was_active);
    }
}

impl PartialEq for PlayerInstance {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.shared, &other.shared)
    }
}

impl Eq for PlayerInstance {}

impl fmt::Debug for PlayerInstance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let inner = self.shared.inner.lock();
        f.debug_struct("PlayerInstance")
            .field("id", &self.shared.id)
            .field("key", &self.shared.key)
            .field("state", &inner.state)
            .field("looping", &inner.looping)
            .finish()
    }
}
