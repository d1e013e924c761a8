//! Internal backend events (not exposed on the event bus)
//!
//! Handles report progress and end-of-clip to the session manager through
//! these types. The manager folds them into `PlaybackState`; only discrete
//! transitions derived from them reach `deercamp_common::events::PlaybackEvent`.

use tokio::sync::mpsc;

/// Notification from a live handle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendEvent {
    /// Position update; `duration_ms` once the resource knows it
    Progress {
        position_ms: u64,
        duration_ms: Option<u64>,
    },
    /// Clip reached its natural end
    Finished,
}

/// Generation-tagged event sender handed to a backend at acquisition
///
/// The tag lets the manager drop events from sessions it already released.
#[derive(Debug, Clone)]
pub struct BackendEvents {
    generation: u64,
    tx: mpsc::UnboundedSender<(u64, BackendEvent)>,
}

impl BackendEvents {
    /// Create a sender/receiver pair for sessions tagged `generation`
    pub fn channel(generation: u64) -> (Self, mpsc::UnboundedReceiver<(u64, BackendEvent)>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { generation, tx }, rx)
    }

    pub(crate) fn from_sender(generation: u64, tx: mpsc::UnboundedSender<(u64, BackendEvent)>) -> Self {
        Self { generation, tx }
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn progress(&self, position_ms: u64, duration_ms: Option<u64>) {
        self.send(BackendEvent::Progress {
            position_ms,
            duration_ms,
        });
    }

    pub fn finished(&self) {
        self.send(BackendEvent::Finished);
    }

    fn send(&self, event: BackendEvent) {
        // Receiver gone means the manager was dropped
        let _ = self.tx.send((self.generation, event));
    }
}
