//! Playback-related type definitions
//!
//! Supporting types for the voice playback session state machine.

use serde::{Deserialize, Serialize};

/// Playback phase of a voice-note session
///
/// Only `Loading`, `Playing`, `Paused` and `Stopped` may hold a live
/// playback resource.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum PlaybackPhase {
    /// No clip associated
    #[default]
    Idle,
    /// Clip is being acquired by the backend
    Loading,
    /// Clip is audible
    Playing,
    /// Clip is paused; resource kept allocated
    Paused,
    /// Clip reached its natural end; replay restarts from zero
    Stopped,
    /// Acquisition or transport failed; no resource held
    Failed,
}

impl PlaybackPhase {
    /// Whether the phase is one in which a session may hold a backend resource
    pub fn may_hold_resource(&self) -> bool {
        matches!(
            self,
            PlaybackPhase::Loading
                | PlaybackPhase::Playing
                | PlaybackPhase::Paused
                | PlaybackPhase::Stopped
        )
    }
}

impl std::fmt::Display for PlaybackPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PlaybackPhase::Idle => write!(f, "idle"),
            PlaybackPhase::Loading => write!(f, "loading"),
            PlaybackPhase::Playing => write!(f, "playing"),
            PlaybackPhase::Paused => write!(f, "paused"),
            PlaybackPhase::Stopped => write!(f, "stopped"),
            PlaybackPhase::Failed => write!(f, "failed"),
        }
    }
}
