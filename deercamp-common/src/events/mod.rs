//! Event types for the DeerCamp event system
//!
//! Provides shared playback event definitions and the EventBus that carries them.

mod playback_types;

pub use playback_types::PlaybackPhase;

use serde::{Deserialize, Serialize};
use tokio::sync::broadcast;

/// Playback events published by a session manager
///
/// Only discrete transitions are published. Backend progress ticks update the
/// state snapshot but never appear here.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum PlaybackEvent {
    /// Phase changed (e.g. Playing ↔ Paused)
    ///
    /// Triggers:
    /// - UI: Update play/pause button labels
    PhaseChanged {
        /// Clip associated with the session after the change (None when idle)
        clip_id: Option<String>,
        /// Phase before change
        old_phase: PlaybackPhase,
        /// Phase after change
        new_phase: PlaybackPhase,
        /// When phase changed
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Clip reached its natural end
    ClipCompleted {
        clip_id: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },

    /// Acquisition or transport failed
    ///
    /// Triggers:
    /// - UI: Show a neutral "tap to retry" affordance
    PlaybackFailed {
        /// Clip that failed, if one was associated
        clip_id: Option<String>,
        /// Human-readable error
        error: String,
        timestamp: chrono::DateTime<chrono::Utc>,
    },
}

impl PlaybackEvent {
    /// Short event name for logging
    pub fn event_type(&self) -> &'static str {
        match self {
            PlaybackEvent::PhaseChanged { .. } => "PhaseChanged",
            PlaybackEvent::ClipCompleted { .. } => "ClipCompleted",
            PlaybackEvent::PlaybackFailed { .. } => "PlaybackFailed",
        }
    }
}

// ========================================
// EventBus Implementation
// ========================================

/// Event distribution bus for playback events
///
/// Uses tokio::broadcast internally:
/// - Non-blocking publish (slow subscribers don't block producers)
/// - Multiple concurrent subscribers
/// - Lagged message detection for slow subscribers
///
/// # Examples
///
/// ```
/// use deercamp_common::events::{EventBus, PlaybackEvent, PlaybackPhase};
///
/// let event_bus = EventBus::new(64);
/// let mut rx = event_bus.subscribe();
///
/// event_bus.emit_lossy(PlaybackEvent::PhaseChanged {
///     clip_id: Some("e1".to_string()),
///     old_phase: PlaybackPhase::Idle,
///     new_phase: PlaybackPhase::Loading,
///     timestamp: chrono::Utc::now(),
/// });
///
/// assert!(matches!(rx.try_recv(), Ok(PlaybackEvent::PhaseChanged { .. })));
/// ```
#[derive(Clone)]
pub struct EventBus {
    tx: broadcast::Sender<PlaybackEvent>,
}

impl EventBus {
    /// Creates a new EventBus buffering up to `capacity` events per subscriber
    pub fn new(capacity: usize) -> Self {
        let (tx, _) = broadcast::channel(capacity);
        Self { tx }
    }

    /// Subscribe to all future events
    ///
    /// Events emitted before subscription are not received.
    pub fn subscribe(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.tx.subscribe()
    }

    /// Emit an event, ignoring if no subscribers are listening
    pub fn emit_lossy(&self, event: PlaybackEvent) {
        let _ = self.tx.send(event);
    }
}
