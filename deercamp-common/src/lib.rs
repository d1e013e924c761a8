//! # DeerCamp Common Library
//!
//! Shared code for the DeerCamp voice-note playback crates:
//! - Error type
//! - Configuration loading (TOML, priority-ordered resolution)
//! - Playback phase and event types (PlaybackEvent enum, EventBus)
//! - Time helpers and clip duration formatting

pub mod config;
pub mod error;
pub mod events;
pub mod time;

pub use error::{Error, Result};
