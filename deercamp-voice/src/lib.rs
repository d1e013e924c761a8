//! # DeerCamp Voice Playback (deercamp-voice)
//!
//! Single-owner playback of short voice notes attached to journal entries.
//!
//! **Purpose:** Play at most one clip at a time across a listing, with toggle
//! semantics on repeated taps, forced teardown when the hosting screen goes
//! away, and recovery from load and transport failures.
//!
//! **Architecture:** `PlaybackSessionManager` drives a `PlaybackBackend`
//! trait object. The bundled `SymphoniaBackend` decodes clips with symphonia
//! and paces them with a real-time renderer (optionally on a cpal device).

pub mod audio;
pub mod error;
pub mod playback;
pub mod state;
pub mod view;

pub use audio::SymphoniaBackend;
pub use error::{Error, PlaybackError, Result};
pub use playback::{ClipRef, PlaybackBackend, PlaybackHandle, PlaybackSessionManager};
pub use state::{PlaybackState, Subscription};
pub use view::ClipView;

pub use deercamp_common::config::{AudioMode, VoiceConfig};
pub use deercamp_common::events::{PlaybackEvent, PlaybackPhase};
