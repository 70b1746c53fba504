//! Workspace facade crate.
//!
//! Host applications can depend on `audio-catalog-workspace` and enable the
//! documented features instead of wiring `core-catalog`, `core-playback` and
//! `core-runtime` individually.

#[cfg(feature = "catalog")]
pub use core_catalog as catalog;
#[cfg(feature = "catalog")]
pub use core_playback as playback;
#[cfg(feature = "catalog")]
pub use core_runtime as runtime;

#[cfg(feature = "catalog")]
pub use core_catalog::{AudioCatalog, CatalogConfig, CatalogError, ResourceKind, StopFilter};

/// Silent software backend for headless hosts and tests.
#[cfg(feature = "sim")]
pub use core_playback::sim::SimBackend;
