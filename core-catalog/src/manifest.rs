//! # Resource Manifests
//!
//! A [`ResourceManifest`] collects the key/buffer pairs a catalog is bulk
//! loaded from. Manifests can be assembled by hand, from an in-memory map,
//! or by scanning a directory where each file's stem is its key
//! (`bgm.theme.ogg` registers as `bgm.theme`).

use crate::config::CatalogConfig;
use crate::error::{CatalogError, Result};
use crate::key::ResourceKind;
use core_playback::AudioBuffer;
use core_runtime::logging::strip_path;
use std::collections::BTreeMap;
use std::path::Path;
use tracing::{debug, warn};

/// Ordered set of resources to register.
#[derive(Debug, Clone, Default)]
pub struct ResourceManifest {
    entries: BTreeMap<String, AudioBuffer>,
}

impl ResourceManifest {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a manifest from raw encoded buffers.
    pub fn from_map<K, B, I>(map: I) -> Self
    where
        K: Into<String>,
        B: Into<AudioBuffer>,
        I: IntoIterator<Item = (K, B)>,
    {
        Self {
            entries: map
                .into_iter()
                .map(|(key, buffer)| (key.into(), buffer.into()))
                .collect(),
        }
    }

    /// Scan `dir` (not recursively) for audio files.
    ///
    /// Files whose stem carries neither marker are skipped with a warning.
    /// Two files with the same stem are a [`CatalogError::DuplicateKey`].
    pub fn from_dir(dir: &Path, config: &CatalogConfig) -> Result<Self> {
        let mut paths = std::fs::read_dir(dir)?
            .map(|entry| entry.map(|entry| entry.path()))
            .collect::<std::io::Result<Vec<_>>>()?;
        paths.sort();

        let mut manifest = Self::new();
        for path in paths.iter().filter(|path| path.is_file()) {
            match manifest.add_file(path, config) {
                Ok(()) => {}
                Err(CatalogError::InvalidKeyPrefix(key)) => {
                    let path_str = path.to_string_lossy();
                    warn!(file = strip_path(&path_str), key = %key, "Skipping file without BGM or SFX marker");
                }
                Err(e) => return Err(e),
            }
        }

        debug!(resources = manifest.len(), "Scanned resource directory");
        Ok(manifest)
    }

    /// Read one file and add it under its stem.
    ///
    /// Unlike a directory scan, a stem without a marker is an error here.
    pub fn add_file(&mut self, path: &Path, config: &CatalogConfig) -> Result<()> {
        let key = path
            .file_stem()
            .and_then(|stem| stem.to_str())
            .ok_or_else(|| CatalogError::InvalidKeyPrefix(path.to_string_lossy().into_owned()))?
            .to_string();
        ResourceKind::classify(&key, config)?;

        let buffer = AudioBuffer::from_file(path)?;
        let path_str = path.to_string_lossy();
        debug!(file = strip_path(&path_str), key = %key, codec = ?buffer.codec(), "Loaded resource file");
        self.insert(key, buffer)
    }

    /// Add a resource. Keys are validated when the catalog registers them.
    pub fn insert(&mut self, key: impl Into<String>, buffer: AudioBuffer) -> Result<()> {
        let key = key.into();
        if self.entries.contains_key(&key) {
            return Err(CatalogError::DuplicateKey(key));
        }
        self.entries.insert(key, buffer);
        Ok(())
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Consume the manifest, yielding entries in key order.
    pub fn into_entries(self) -> impl Iterator<Item = (String, AudioBuffer)> {
        self.entries.into_iter()
    }
}
