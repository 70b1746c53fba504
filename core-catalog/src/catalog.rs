//! # Audio Catalog
//!
//! Registry of audio resources keyed by string, routing playback to the
//! right container by key.
//!
//! ## Overview
//!
//! The `AudioCatalog` maps every registered key to either a [`BgmSlot`]
//! (background music, one reusable instance) or an [`SfxGroup`] (sound
//! effects, one instance per concurrent playback). The key's marker decides
//! which: see [`ResourceKind::classify`].
//!
//! ## Features
//!
//! - Single key namespace shared by BGM and SFX resources
//! - Bulk loading from a [`ResourceManifest`] or any key/buffer iterator
//! - Bulk and filtered stops across all resources of a kind
//! - Deterministic disposal of every instance on remove, shutdown and drop
//! - Resource and playback events on the catalog's event bus
//!
//! ## Locking
//!
//! The key map sits behind a read-write lock. Playback calls hold the read
//! lock while they reach into a slot or group, so a resource cannot be
//! removed underneath them. Removal takes the entry out under the write lock
//! and disposes its instances after releasing it. Device completions never
//! touch the key map.
//!
//! ## Usage
//!
//! ```
//! use core_catalog::{AudioCatalog, CatalogConfig, StopFilter};
//! use core_playback::sim::SimBackend;
//! use core_playback::AudioBuffer;
//! use std::sync::Arc;
//!
//! # fn main() -> core_catalog::Result<()> {
//! let catalog = AudioCatalog::new(Arc::new(SimBackend::new()), CatalogConfig::default())?;
//!
//! catalog.add_resource("bgm.title", AudioBuffer::new(vec![0u8; 4_000]))?;
//! catalog.add_resource("sfx.coin", AudioBuffer::new(vec![0u8; 300]))?;
//!
//! catalog.play("bgm.title", true)?;
//! catalog.play("sfx.coin", false)?;
//! catalog.play("sfx.coin", false)?;
//! assert_eq!(catalog.instances("sfx.coin")?.len(), 2);
//!
//! catalog.stop_sfx_key("sfx.coin", StopFilter::All)?;
//! catalog.stop_bgm()?;
//! # Ok(())
//! # }
//! ```

use crate::config::CatalogConfig;
use crate::error::{CatalogError, Result};
use crate::key::ResourceKind;
use crate::manifest::ResourceManifest;
use core_playback::{AudioBackend, AudioBuffer, BgmSlot, PlayerInstance, SfxGroup};
use core_runtime::events::{CatalogEvent, CoreEvent, EventBus, EventStream};
use parking_lot::RwLock;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

/// Which members of a sound effect group a filtered stop affects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StopFilter {
    /// Every member
    #[default]
    All,
    /// Only members started with looping enabled
    LoopingOnly,
    /// Only one-shot members
    OneShotOnly,
}

impl StopFilter {
    /// Build a filter from the pair of restriction flags.
    ///
    /// `only_looping` takes precedence when both are set.
    pub fn from_flags(only_looping: bool, only_not_looping: bool) -> Self {
        match (only_looping, only_not_looping) {
            (true, _) => StopFilter::LoopingOnly,
            (false, true) => StopFilter::OneShotOnly,
            (false, false) => StopFilter::All,
        }
    }
}

enum CatalogEntry {
    Bgm(BgmSlot),
    Sfx(SfxGroup),
}

impl CatalogEntry {
    fn kind(&self) -> ResourceKind {
        match self {
            CatalogEntry::Bgm(_) => ResourceKind::Bgm,
            CatalogEntry::Sfx(_) => ResourceKind::Sfx,
        }
    }

    fn instances(&self) -> Vec<PlayerInstance> {
        match self {
            CatalogEntry::Bgm(slot) => vec![slot.instance().clone()],
            CatalogEntry::Sfx(group) => group.instances(),
        }
    }

    fn dispose(self) {
        match self {
            CatalogEntry::Bgm(slot) => slot.dispose(),
            CatalogEntry::Sfx(group) => {
                group.stop_all();
            }
        }
    }
}

/// Registry of BGM and SFX resources.
///
/// Construct one per process and share it as `Arc<AudioCatalog>`.
pub struct AudioCatalog {
    /// Factory for every instance's decoder and device
    backend: Arc<dyn AudioBackend>,
    /// Key markers and bus sizing
    config: CatalogConfig,
    /// Bus for resource and playback events
    events: EventBus,
    /// Registered resources by key
    entries: RwLock<HashMap<String, CatalogEntry>>,
}

impl AudioCatalog {
    /// Create an empty catalog.
    pub fn new(backend: Arc<dyn AudioBackend>, config: CatalogConfig) -> Result<Self> {
        config.validate()?;
        let events = EventBus::new(config.event_buffer_size);

        info!(
            bgm_marker = %config.bgm_marker,
            sfx_marker = %config.sfx_marker,
            "Audio catalog created"
        );

        Ok(Self {
            backend,
            config,
            events,
            entries: RwLock::new(HashMap::new()),
        })
    }

    /// Create a catalog and register every entry as if by [`add_resource`].
    ///
    /// The first entry that fails aborts construction; instances opened for
    /// earlier entries are disposed.
    ///
    /// [`add_resource`]: AudioCatalog::add_resource
    pub fn with_resources<K, I>(
        backend: Arc<dyn AudioBackend>,
        config: CatalogConfig,
        entries: I,
    ) -> Result<Self>
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, AudioBuffer)>,
    {
        let catalog = Self::new(backend, config)?;
        for (key, buffer) in entries {
            catalog.add_resource(key, buffer)?;
        }
        info!(resources = catalog.len(), "Audio catalog loaded");
        Ok(catalog)
    }

    /// Create a catalog from a resource manifest.
    pub fn from_manifest(
        backend: Arc<dyn AudioBackend>,
        config: CatalogConfig,
        manifest: ResourceManifest,
    ) -> Result<Self> {
        Self::with_resources(backend, config, manifest.into_entries())
    }

    pub fn config(&self) -> &CatalogConfig {
        &self.config
    }

    /// The catalog's event bus.
    pub fn event_bus(&self) -> &EventBus {
        &self.events
    }

    /// Subscribe to resource and playback events.
    pub fn subscribe(&self) -> EventStream {
        EventStream::new(self.events.subscribe())
    }

    /// Classify a key with this catalog's markers.
    pub fn kind_of(&self, key: &str) -> Result<ResourceKind> {
        ResourceKind::classify(key, &self.config)
    }

    // ========================================================================
    // Registration
    // ========================================================================

    /// Register `buffer` under `key`.
    ///
    /// BGM keys get a slot whose instance is opened immediately; SFX keys get
    /// an empty group.
    #[instrument(skip_all, fields(key = tracing::field::Empty, bytes = buffer.len()))]
    pub fn add_resource(&self, key: impl Into<String>, buffer: AudioBuffer) -> Result<()> {
        let key = key.into();
        tracing::Span::current().record("key", key.as_str());
        let kind = self.kind_of(&key)?;

        let mut entries = self.entries.write();
        if entries.contains_key(&key) {
            return Err(CatalogError::DuplicateKey(key));
        }

        let entry = match kind {
            ResourceKind::Bgm => CatalogEntry::Bgm(BgmSlot::open(
                key.clone(),
                buffer,
                self.backend.as_ref(),
                Some(self.events.clone()),
            )?),
            ResourceKind::Sfx => CatalogEntry::Sfx(SfxGroup::new(
                key.clone(),
                buffer,
                Arc::clone(&self.backend),
                Some(self.events.clone()),
            )),
        };
        entries.insert(key.clone(), entry);
        drop(entries);

        debug!(%kind, "Resource added");
        self.events.publish(CoreEvent::Catalog(CatalogEvent::ResourceAdded {
            key,
            kind: kind.to_string(),
        }));
        Ok(())
    }

    /// Remove `key`, stopping and disposing every instance it owns.
    #[instrument(skip(self))]
    pub fn remove_resource(&self, key: &str) -> Result<()> {
        self.kind_of(key)?;

        let entry = self
            .entries
            .write()
            .remove(key)
            .ok_or_else(|| CatalogError::UnknownKey(key.to_string()))?;
        entry.dispose();

        debug!("Resource removed");
        self.events
            .publish(CoreEvent::Catalog(CatalogEvent::ResourceRemoved {
                key: key.to_string(),
            }));
        Ok(())
    }

    // ========================================================================
    // Playback
    // ========================================================================

    /// Play the resource under `key`.
    ///
    /// BGM restarts the key's single instance from the beginning with the
    /// given looping flag. SFX starts a new overlapping instance; non-looping
    /// ones remove themselves when they finish.
    #[instrument(skip(self))]
    pub fn play(&self, key: &str, looping: bool) -> Result<()> {
        self.with_entry(key, |entry| match entry {
            CatalogEntry::Bgm(slot) => slot.play(looping).map_err(CatalogError::from),
            CatalogEntry::Sfx(group) => group
                .play_one_shot(looping)
                .map(|_| ())
                .map_err(CatalogError::from),
        })
    }

    /// Pause the BGM instance, or every SFX instance, under `key`.
    #[instrument(skip(self))]
    pub fn pause(&self, key: &str) -> Result<()> {
        self.with_entry(key, |entry| match entry {
            CatalogEntry::Bgm(slot) => slot.pause().map_err(CatalogError::from),
            CatalogEntry::Sfx(group) => group.pause_all().map_err(CatalogError::from),
        })
    }

    /// Resume paused instances under `key`.
    #[instrument(skip(self))]
    pub fn resume(&self, key: &str) -> Result<()> {
        self.with_entry(key, |entry| match entry {
            CatalogEntry::Bgm(slot) => slot.resume().map_err(CatalogError::from),
            CatalogEntry::Sfx(group) => group.resume_all().map_err(CatalogError::from),
        })
    }

    /// Seek the instances under `key` to `position`.
    ///
    /// For SFX keys every current member moves; none moves if `position` is
    /// past the end.
    #[instrument(skip(self))]
    pub fn seek(&self, key: &str, position: Duration) -> Result<()> {
        self.with_entry(key, |entry| match entry {
            CatalogEntry::Bgm(slot) => slot.seek(position).map_err(CatalogError::from),
            CatalogEntry::Sfx(group) => group.seek_all(position).map_err(CatalogError::from),
        })
    }

    /// Seek one instance obtained from [`instances`](AudioCatalog::instances).
    pub fn seek_instance(&self, instance: &PlayerInstance, position: Duration) -> Result<()> {
        instance.seek(position)?;
        Ok(())
    }

    // ========================================================================
    // Stopping
    // ========================================================================

    /// Stop every BGM resource.
    ///
    /// All slots are stopped even if one fails; the first failure is returned.
    #[instrument(skip(self))]
    pub fn stop_bgm(&self) -> Result<()> {
        let entries = self.entries.read();
        let mut first_error = None;

        for (key, entry) in entries.iter() {
            if let CatalogEntry::Bgm(slot) = entry {
                if let Err(e) = slot.stop() {
                    warn!(key = %key, error = %e, "Failed to stop background music");
                    first_error.get_or_insert(e);
                }
            }
        }

        match first_error {
            Some(e) => Err(e.into()),
            None => Ok(()),
        }
    }

    /// Stop the BGM resource under `key`.
    #[instrument(skip(self))]
    pub fn stop_bgm_key(&self, key: &str) -> Result<()> {
        self.with_entry(key, |entry| match entry {
            CatalogEntry::Bgm(slot) => slot.stop().map_err(CatalogError::from),
            CatalogEntry::Sfx(_) => Err(CatalogError::UnknownKey(key.to_string())),
        })
    }

    /// Stop and dispose every SFX instance. Returns how many were stopped.
    #[instrument(skip(self))]
    pub fn stop_sfx(&self) -> usize {
        let entries = self.entries.read();
        let stopped = entries
            .values()
            .map(|entry| match entry {
                CatalogEntry::Sfx(group) => group.stop_all(),
                CatalogEntry::Bgm(_) => 0,
            })
            .sum();
        debug!(stopped, "Stopped all sound effects");
        stopped
    }

    /// Stop and dispose the SFX instances under `key` selected by `filter`.
    #[instrument(skip(self))]
    pub fn stop_sfx_key(&self, key: &str, filter: StopFilter) -> Result<usize> {
        self.with_entry(key, |entry| match entry {
            CatalogEntry::Sfx(group) => Ok(match filter {
                StopFilter::All => group.stop_all(),
                StopFilter::LoopingOnly => group.stop_filtered(true),
                StopFilter::OneShotOnly => group.stop_filtered(false),
            }),
            CatalogEntry::Bgm(_) => Err(CatalogError::UnknownKey(key.to_string())),
        })
    }

    // ========================================================================
    // Queries
    // ========================================================================

    /// Registered keys of `kind`, sorted.
    pub fn keys(&self, kind: ResourceKind) -> Vec<String> {
        let entries = self.entries.read();
        let mut keys: Vec<String> = entries
            .iter()
            .filter(|(_, entry)| entry.kind() == kind)
            .map(|(key, _)| key.clone())
            .collect();
        keys.sort();
        keys
    }

    /// Live instances under `key`.
    ///
    /// BGM keys always have exactly one; SFX keys have one per playback still
    /// running or held.
    pub fn instances(&self, key: &str) -> Result<Vec<PlayerInstance>> {
        self.with_entry(key, |entry| Ok(entry.instances()))
    }

    pub fn contains(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    /// Number of registered resources.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Dispose every instance and unregister every resource.
    #[instrument(skip(self))]
    pub fn shutdown(&self) {
        let drained: Vec<(String, CatalogEntry)> = self.entries.write().drain().collect();
        if drained.is_empty() {
            return;
        }

        info!(resources = drained.len(), "Shutting down audio catalog");
        for (key, entry) in drained {
            entry.dispose();
            self.events
                .publish(CoreEvent::Catalog(CatalogEvent::ResourceRemoved { key }));
        }
    }

    /// Validate `key`, then run `f` on its entry under the read lock.
    fn with_entry<T>(&self, key: &str, f: impl FnOnce(&CatalogEntry) -> Result<T>) -> Result<T> {
        self.kind_of(key)?;
        let entries = self.entries.read();
        let entry = entries
            .get(key)
            .ok_or_else(|| CatalogError::UnknownKey(key.to_string()))?;
        f(entry)
    }
}

impl Drop for AudioCatalog {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl fmt::Debug for AudioCatalog {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AudioCatalog")
            .field("config", &self.config)
            .field("resources", &self.len())
            .finish()
    }
}
