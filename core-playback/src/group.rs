//! # Sound Effect Groups
//!
//! An [`SfxGroup`] owns every live [`PlayerInstance`] created from one SFX
//! resource. Each `play_one_shot` opens a fresh instance so the same effect
//! can overlap itself.
//!
//! Non-looping instances remove themselves from the group and dispose when
//! the device reports natural completion. Looping instances restart instead
//! and stay until they are stopped. Any member halted through its own
//! handle's `stop()` leaves the group and is disposed the same way.
//!
//! Membership changes happen under the group lock; disposal always happens
//! after the lock is released, on instances already taken out of the list.
//! Whichever path takes an instance out of the list first (a sweep or its own
//! completion) is the one that disposes it, and `dispose()` itself is
//! idempotent.

use crate::buffer::AudioBuffer;
use crate::error::{PlaybackError, Result};
use crate::player::{CompletionObserver, InstanceId, PlayerInstance};
use crate::traits::AudioBackend;
use core_runtime::events::EventBus;
use parking_lot::Mutex;
use std::fmt;
use std::sync::{Arc, Weak};
use std::time::Duration;
use tracing::{debug, trace};

#[derive(Default)]
struct GroupMembers {
    members: Mutex<Vec<PlayerInstance>>,
}

impl GroupMembers {
    fn take(&self, id: InstanceId) -> Option<PlayerInstance> {
        let mut members = self.members.lock();
        let index = members.iter().position(|member| member.id() == id)?;
        Some(members.remove(index))
    }
}

/// Takes a finished or stopped member out of its group and disposes it.
struct SelfRemoval {
    group: Weak<GroupMembers>,
}

impl SelfRemoval {
    fn remove(&self, instance: &PlayerInstance, reason: &'static str) {
        let owned = self
            .group
            .upgrade()
            .and_then(|group| group.take(instance.id()))
            .is_some();
        trace!(key = instance.key(), instance = %instance.id(), owned, reason, "Leaving group");
        if owned {
            instance.dispose();
        }
    }
}

impl CompletionObserver for SelfRemoval {
    fn on_completed(&self, instance: &PlayerInstance) {
        self.remove(instance, "completed");
    }

    fn on_stopped(&self, instance: &PlayerInstance) {
        self.remove(instance, "stopped");
    }
}

/// Live instances of one SFX resource, in creation order.
pub struct SfxGroup {
    key: String,
    buffer: AudioBuffer,
    backend: Arc<dyn AudioBackend>,
    events: Option<EventBus>,
    inner: Arc<GroupMembers>,
}

impl SfxGroup {
    pub fn new(
        key: impl Into<String>,
        buffer: AudioBuffer,
        backend: Arc<dyn AudioBackend>,
        events: Option<EventBus>,
    ) -> Self {
        Self {
            key: key.into(),
            buffer,
            backend,
            events,
            inner: Arc::new(GroupMembers::default()),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn buffer(&self) -> &AudioBuffer {
        &self.buffer
    }

    /// Start a new instance of the effect.
    ///
    /// The instance is started and appended under the group lock, so a
    /// completion arriving from the device always finds it in the list.
    pub fn play_one_shot(&self, looping: bool) -> Result<PlayerInstance> {
        let instance = PlayerInstance::open(
            self.key.clone(),
            self.buffer.clone(),
            self.backend.as_ref(),
            self.events.clone(),
        )?;
        instance.set_looping(looping)?;
        instance.set_completion_observer(Arc::new(SelfRemoval {
            group: Arc::downgrade(&self.inner),
        }))?;

        let mut members = self.inner.members.lock();
        instance.play()?;
        members.push(instance.clone());

        debug!(key = %self.key, instance = %instance.id(), looping, live = members.len(), "Started sound effect");
        Ok(instance)
    }

    /// Stop and dispose every member.
    pub fn stop_all(&self) -> usize {
        let taken = std::mem::take(&mut *self.inner.members.lock());
        Self::dispose_all(&self.key, taken)
    }

    /// Stop and dispose the members whose looping flag equals `looping`.
    ///
    /// Members with the other flag keep playing.
    pub fn stop_filtered(&self, looping: bool) -> usize {
        let taken = {
            let mut members = self.inner.members.lock();
            let (taken, kept): (Vec<_>, Vec<_>) = members
                .drain(..)
                .partition(|member| member.is_looping() == looping);
            *members = kept;
            taken
        };
        Self::dispose_all(&self.key, taken)
    }

    fn dispose_all(key: &str, taken: Vec<PlayerInstance>) -> usize {
        let count = taken.len();
        for instance in taken {
            instance.dispose();
        }
        if count > 0 {
            debug!(key, count, "Stopped sound effect instances");
        }
        count
    }

    /// Pause every playing member.
    pub fn pause_all(&self) -> Result<()> {
        for member in self.instances() {
            tolerate_disposed(member.pause())?;
        }
        Ok(())
    }

    /// Resume every paused member.
    pub fn resume_all(&self) -> Result<()> {
        for member in self.instances() {
            if member.state() == crate::player::PlayerState::Paused {
                tolerate_disposed(member.play())?;
            }
        }
        Ok(())
    }

    /// Seek every member to `position`.
    ///
    /// All members share one resource, so the target is checked once against
    /// its duration before any member moves.
    pub fn seek_all(&self, position: Duration) -> Result<()> {
        let members = self.instances();
        if let Some(duration) = members.first().map(PlayerInstance::duration) {
            if position > duration {
                return Err(PlaybackError::SeekOutOfRange {
                    requested: position,
                    duration,
                });
            }
        }
        for member in members {
            tolerate_disposed(member.seek(position))?;
        }
        Ok(())
    }

    /// Snapshot of the current members, oldest first.
    pub fn instances(&self) -> Vec<PlayerInstance> {
        self.inner.members.lock().clone()
    }

    pub fn len(&self) -> usize {
        self.inner.members.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.members.lock().is_empty()
    }
}

/// A member disposed through another handle between snapshot and call.
fn tolerate_disposed(result: Result<()>) -> Result<()> {
    match result {
        Err(PlaybackError::InstanceDisposed(_)) => Ok(()),
        other => other,
    }
}

impl fmt::Debug for SfxGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SfxGroup")
            .field("key", &self.key)
            .field("buffer", &self.buffer)
            .field("members", &self.len())
            .finish()
    }
}

#[cfg(all(test, feature = "sim"))]
mod tests {
    use super::*;
    use crate::player::PlayerState;
    use crate::sim::SimBackend;

    fn group(backend: &Arc<SimBackend>) -> SfxGroup {
        let buffer = AudioBuffer::new(vec![0u8; backend.bytes_for(Duration::from_secs(1))]);
        SfxGroup::new("sfx.coin", buffer, backend.clone(), None)
    }

    #[test]
    fn one_shots_overlap() {
        let backend = Arc::new(SimBackend::new());
        let group = group(&backend);

        let first = group.play_one_shot(false).unwrap();
        let second = group.play_one_shot(false).unwrap();

        assert_ne!(first.id(), second.id());
        assert_eq!(group.len(), 2);
        assert_eq!(backend.device_count(), 2);
        assert_eq!(group.instances(), vec![first, second]);
    }

    #[test]
    fn one_shot_removes_itself_on_completion() {
        let backend = Arc::new(SimBackend::new());
        let group = group(&backend);

        let instance = group.play_one_shot(false).unwrap();
        backend.last_device().unwrap().finish();

        assert!(group.is_empty());
        assert!(instance.is_disposed());
        assert_eq!(backend.open_devices(), 0);
    }

    #[test]
    fn looping_member_survives_completion() {
        let backend = Arc::new(SimBackend::new());
        let group = group(&backend);

        let instance = group.play_one_shot(true).unwrap();
        backend.last_device().unwrap().finish();

        assert_eq!(group.len(), 1);
        assert_eq!(instance.state(), PlayerState::Playing);
    }

    #[test]
    fn stop_filtered_leaves_other_members() {
        let backend = Arc::new(SimBackend::new());
        let group = group(&backend);

        let looping = group.play_one_shot(true).unwrap();
        let one_shot = group.play_one_shot(false).unwrap();

        assert_eq!(group.stop_filtered(true), 1);
        assert!(looping.is_disposed());
        assert_eq!(group.instances(), vec![one_shot.clone()]);

        assert_eq!(group.stop_filtered(true), 0);
        assert_eq!(group.stop_filtered(false), 1);
        assert!(one_shot.is_disposed());
        assert!(group.is_empty());
    }

    #[test]
    fn completion_after_sweep_disposes_once() {
        let backend = Arc::new(SimBackend::new());
        let group = group(&backend);

        group.play_one_shot(false).unwrap();
        let device = backend.last_device().unwrap();
        let notifier = device.notifier().unwrap();

        assert_eq!(group.stop_all(), 1);
        // Late notification for the swept instance
        notifier.playback_stopped();
        device.deliver_pending();

        assert_eq!(device.close_calls(), 1);
        assert!(group.is_empty());
    }

    #[test]
    fn stopping_member_through_handle_removes_it() {
        let backend = Arc::new(SimBackend::new());
        let group = group(&backend);

        let members: Vec<_> = (0..5)
            .map(|i| group.play_one_shot(i % 2 == 0).unwrap())
            .collect();
        let devices = backend.devices();

        for member in &members {
            member.stop().unwrap();
        }
        for device in &devices {
            device.deliver_pending();
            device.finish();
        }

        assert!(group.is_empty());
        assert!(members.iter().all(PlayerInstance::is_disposed));
        assert!(devices.iter().all(|device| device.close_calls() == 1));
        assert_eq!(backend.open_devices(), 0);
    }

    #[test]
    fn stop_then_sweep_disposes_once() {
        let backend = Arc::new(SimBackend::new());
        let group = group(&backend);

        let stopped = group.play_one_shot(true).unwrap();
        let other = group.play_one_shot(true).unwrap();
        let device = backend.devices()[0].clone();

        stopped.stop().unwrap();
        assert_eq!(group.instances(), vec![other]);
        assert_eq!(group.stop_all(), 1);
        assert_eq!(device.close_calls(), 1);
    }

    #[test]
    fn one_shot_ending_while_paused_still_leaves() {
        let backend = Arc::new(SimBackend::new());
        let group = group(&backend);

        let instance = group.play_one_shot(false).unwrap();
        let device = backend.last_device().unwrap();
        instance.pause().unwrap();
        device.finish();

        assert!(group.is_empty());
        assert!(instance.is_disposed());
    }

    #[test]
    fn seek_all_validates_before_moving() {
        let backend = Arc::new(SimBackend::new());
        let group = group(&backend);
        let first = group.play_one_shot(true).unwrap();
        let second = group.play_one_shot(true).unwrap();

        let err = group.seek_all(Duration::from_secs(2)).unwrap_err();
        assert!(matches!(err, PlaybackError::SeekOutOfRange { .. }));

        group.seek_all(Duration::from_millis(500)).unwrap();
        assert_eq!(first.position(), Duration::from_millis(500));
        assert_eq!(second.position(), Duration::from_millis(500));
    }

    #[test]
    fn failed_start_leaves_group_unchanged() {
        let backend = Arc::new(SimBackend::new());
        let group = group(&backend);
        backend.set_reject_devices(true);

        let result = group.play_one_shot(false);
        assert!(matches!(result, Err(PlaybackError::AudioDeviceError(_))));
        assert!(group.is_empty());
    }
}
