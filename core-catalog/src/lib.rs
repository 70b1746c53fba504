//! # Audio Catalog Module
//!
//! Keyed registry of background music and sound effect resources.
//!
//! ## Overview
//!
//! This module handles:
//! - Routing keys to BGM slots or SFX groups by marker (`bgm.` / `sfx.`)
//! - Registering, removing and bulk loading resources
//! - Play, pause, seek and filtered stop requests per key or per kind
//! - Catalog configuration loaded from JSON

pub mod catalog;
pub mod config;
pub mod error;
pub mod key;
pub mod manifest;

pub use catalog::{AudioCatalog, StopFilter};
pub use config::CatalogConfig;
pub use error::{CatalogError, Result};
pub use key::ResourceKind;
pub use manifest::ResourceManifest;
