//! Error types for deercamp-voice
//!
//! `Error` covers backend, decode and output failures inside the crate.
//! `PlaybackError` is the user-facing taxonomy a session manager records in
//! its state; it never crosses the manager boundary as a returned error.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Main error type for deercamp-voice
#[derive(Error, Debug)]
pub enum Error {
    /// Clip source could not be resolved or read
    #[error("Source error: {0}")]
    Source(String),

    /// URI scheme the backend cannot load
    #[error("Unsupported source: {0}")]
    UnsupportedSource(String),

    /// Remote clip download errors
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Audio decoding errors
    #[error("Audio decode error: {0}")]
    Decode(String),

    /// Audio output device errors
    #[error("Audio output error: {0}")]
    AudioOutput(String),

    /// Transport call on a playback handle failed
    #[error("Playback error: {0}")]
    Playback(String),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

/// Convenience Result type using deercamp-voice Error
pub type Result<T> = std::result::Result<T, Error>;

/// Playback failure as observed through `PlaybackState::last_error`
#[derive(Error, Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PlaybackError {
    /// Clip could not be loaded (network, format, permissions). Retry with `toggle`.
    #[error("Couldn't load clip {clip_id}: {reason}")]
    AcquireFailed { clip_id: String, reason: String },

    /// play/pause/seek/stop failed on a live resource; the session was torn down
    #[error("Playback {operation} failed for clip {clip_id}: {reason}")]
    TransportFailed {
        clip_id: String,
        operation: String,
        reason: String,
    },

    /// In-flight request replaced by a newer one. Logged, never stored in state.
    #[error("Request for clip {clip_id} was superseded")]
    Superseded { clip_id: String },
}

impl PlaybackError {
    /// Clip the failure belongs to
    pub fn clip_id(&self) -> &str {
        match self {
            PlaybackError::AcquireFailed { clip_id, .. }
            | PlaybackError::TransportFailed { clip_id, .. }
            | PlaybackError::Superseded { clip_id } => clip_id,
        }
    }
}
