//! # Core Runtime Module
//!
//! Provides foundational runtime infrastructure for the audio catalog:
//! - Logging and tracing infrastructure
//! - Event bus system
//!
//! ## Overview
//!
//! This crate contains the runtime utilities that the playback and catalog
//! crates depend on. It establishes the logging conventions and the event
//! broadcasting mechanism used throughout the workspace.

pub mod error;
pub mod events;
pub mod logging;

pub use error::{Error, Result};
