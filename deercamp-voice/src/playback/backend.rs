//! Playback backend seam
//!
//! A backend turns a `ClipRef` into a live `PlaybackHandle`. The session
//! manager is the only owner of handles; backends report asynchronous
//! progress and end-of-clip through the `BackendEvents` sender they are given
//! at acquisition.

use crate::error::Result;
use crate::playback::clip::ClipRef;
use crate::playback::events::BackendEvents;
use async_trait::async_trait;
use deercamp_common::config::AudioMode;

/// Source of playable handles
#[async_trait]
pub trait PlaybackBackend: Send + Sync {
    /// Apply session-wide audio settings. Called once, before the first acquisition.
    async fn configure(&self, _mode: &AudioMode) -> Result<()> {
        Ok(())
    }

    /// Load `clip` into a handle positioned at zero, not yet playing.
    async fn acquire(&self, clip: &ClipRef, events: BackendEvents) -> Result<Box<dyn PlaybackHandle>>;
}

/// A loaded clip. Dropping a handle without `release` must still silence it.
#[async_trait]
pub trait PlaybackHandle: Send {
    /// Duration reported by the resource, if known
    fn duration_ms(&self) -> Option<u64>;

    async fn play(&mut self) -> Result<()>;

    async fn pause(&mut self) -> Result<()>;

    async fn seek(&mut self, position_ms: u64) -> Result<()>;

    async fn stop(&mut self) -> Result<()>;

    /// Unload the resource
    async fn release(self: Box<Self>) -> Result<()>;
}
