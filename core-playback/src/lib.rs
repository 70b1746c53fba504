//! # Playback Module
//!
//! Player instances and the containers the catalog keeps them in.
//!
//! ## Overview
//!
//! This module handles:
//! - Immutable, shareable encoded buffers ([`AudioBuffer`])
//! - Decoder and device abstractions supplied by the host ([`traits`])
//! - The per-instance playback and loop state machine ([`PlayerInstance`])
//! - Single-instance background music slots ([`BgmSlot`])
//! - Multi-instance sound effect groups with self-removing one-shots ([`SfxGroup`])
//! - A silent software backend for headless hosts and tests (`sim` feature)

pub mod buffer;
pub mod error;
pub mod group;
pub mod player;
pub mod slot;
pub mod traits;

#[cfg(feature = "sim")]
pub mod sim;

pub use buffer::{AudioBuffer, AudioCodec};
pub use error::{PlaybackError, Result};
pub use group::SfxGroup;
pub use player::{CompletionObserver, InstanceId, PlayerInstance, PlayerState, StopNotifier};
pub use slot::BgmSlot;
pub use traits::{AudioBackend, Decoder, DecoderHandle, PlaybackDevice};
