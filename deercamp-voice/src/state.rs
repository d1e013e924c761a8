//! Shared playback state
//!
//! Holds the manager's single `PlaybackState`, the synchronous listener
//! registry and the event bus. Listeners run after the state lock is
//! released, so they may read the state again without deadlocking.

use crate::error::PlaybackError;
use deercamp_common::events::{EventBus, PlaybackEvent, PlaybackPhase};
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, RwLock, Weak};
use tokio::sync::broadcast;

/// Snapshot of the manager's playback state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlaybackState {
    /// Clip bound to the current session, if any
    pub active_clip_id: Option<String>,
    pub phase: PlaybackPhase,
    /// Best-effort progress; 0 when unknown
    pub position_ms: u64,
    pub duration_ms: u64,
    /// Present only while `phase == Failed`
    pub last_error: Option<PlaybackError>,
}

impl PlaybackState {
    /// Whether `clip_id` is the clip bound to the current session
    pub fn is_active(&self, clip_id: &str) -> bool {
        self.active_clip_id.as_deref() == Some(clip_id)
    }
}

/// Callback invoked with a snapshot after every transition
pub type Listener = Arc<dyn Fn(&PlaybackState) + Send + Sync>;

#[derive(Default)]
struct ListenerRegistry {
    next_id: AtomicU64,
    listeners: Mutex<Vec<(u64, Listener)>>,
}

impl ListenerRegistry {
    fn add(&self, listener: Listener) -> u64 {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push((id, listener));
        id
    }

    fn remove(&self, id: u64) {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .retain(|(existing, _)| *existing != id);
    }

    fn snapshot(&self) -> Vec<Listener> {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect()
    }

    fn len(&self) -> usize {
        self.listeners
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

/// Cancels its listener when dropped or on `unsubscribe()`
#[must_use = "dropping a Subscription cancels it"]
pub struct Subscription {
    id: u64,
    registry: Weak<ListenerRegistry>,
}

impl Subscription {
    pub fn unsubscribe(self) {
        // Drop does the work
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(registry) = self.registry.upgrade() {
            registry.remove(self.id);
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

/// State cell shared by the manager and its event pump
pub struct SharedState {
    current: RwLock<PlaybackState>,
    listeners: Arc<ListenerRegistry>,
    event_bus: EventBus,
}

impl SharedState {
    pub fn new(event_capacity: usize) -> Self {
        Self {
            current: RwLock::new(PlaybackState::default()),
            listeners: Arc::new(ListenerRegistry::default()),
            event_bus: EventBus::new(event_capacity),
        }
    }

    pub fn snapshot(&self) -> PlaybackState {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Apply a transition and notify listeners when the phase or the active
    /// clip changed. Returns whether a notification went out.
    pub fn transition(&self, apply: impl FnOnce(&mut PlaybackState)) -> bool {
        let (old, new) = {
            let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
            let old = current.clone();
            apply(&mut *current);
            if current.phase != PlaybackPhase::Failed {
                current.last_error = None;
            }
            (old, current.clone())
        };

        if old.phase == new.phase && old.active_clip_id == new.active_clip_id {
            return false;
        }

        self.event_bus.emit_lossy(PlaybackEvent::PhaseChanged {
            clip_id: new.active_clip_id.clone(),
            old_phase: old.phase,
            new_phase: new.phase,
            timestamp: deercamp_common::time::now(),
        });
        for listener in self.listeners.snapshot() {
            listener(&new);
        }
        true
    }

    /// Update progress fields without notifying anyone
    pub fn update_progress(&self, position_ms: u64, duration_ms: Option<u64>) {
        let mut current = self.current.write().unwrap_or_else(PoisonError::into_inner);
        current.position_ms = position_ms;
        if let Some(duration_ms) = duration_ms.filter(|d| *d > 0) {
            current.duration_ms = duration_ms;
        }
    }

    pub fn subscribe(&self, listener: Listener) -> Subscription {
        let id = self.listeners.add(listener);
        Subscription {
            id,
            registry: Arc::downgrade(&self.listeners),
        }
    }

    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Broadcast an event to all event-stream subscribers
    pub fn broadcast_event(&self, event: PlaybackEvent) {
        self.event_bus.emit_lossy(event);
    }

    pub fn subscribe_events(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.event_bus.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn recording_listener() -> (Listener, Arc<Mutex<Vec<PlaybackPhase>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let listener: Listener = Arc::new(move |state: &PlaybackState| {
            sink.lock().unwrap().push(state.phase);
        });
        (listener, seen)
    }

    #[test]
    fn test_default_state_is_idle() {
        let state = SharedState::new(16);
        let snapshot = state.snapshot();
        assert_eq!(snapshot.phase, PlaybackPhase::Idle);
        assert!(snapshot.active_clip_id.is_none());
    }

    #[test]
    fn test_transition_notifies_only_on_change() {
        let state = SharedState::new(16);
        let (listener, seen) = recording_listener();
        let _sub = state.subscribe(listener);

        assert!(state.transition(|s| s.phase = PlaybackPhase::Loading));
        assert!(!state.transition(|s| s.position_ms = 10));
        assert!(state.transition(|s| s.phase = PlaybackPhase::Playing));

        assert_eq!(
            *seen.lock().unwrap(),
            vec![PlaybackPhase::Loading, PlaybackPhase::Playing]
        );
    }

    #[test]
    fn test_last_error_cleared_outside_failed() {
        let state = SharedState::new(16);
        state.transition(|s| {
            s.phase = PlaybackPhase::Failed;
            s.last_error = Some(PlaybackError::AcquireFailed {
                clip_id: "e1".to_string(),
                reason: "gone".to_string(),
            });
        });
        assert!(state.snapshot().last_error.is_some());

        state.transition(|s| s.phase = PlaybackPhase::Loading);
        assert!(state.snapshot().last_error.is_none());
    }

    #[test]
    fn test_progress_is_silent() {
        let state = SharedState::new(16);
        let (listener, seen) = recording_listener();
        let _sub = state.subscribe(listener);

        state.update_progress(1500, Some(4200));
        state.update_progress(1750, None);

        let snapshot = state.snapshot();
        assert_eq!(snapshot.position_ms, 1750);
        assert_eq!(snapshot.duration_ms, 4200);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[test]
    fn test_dropping_subscription_cancels_it() {
        let state = SharedState::new(16);
        let (listener, seen) = recording_listener();
        let sub = state.subscribe(listener);
        assert_eq!(state.listener_count(), 1);

        drop(sub);
        assert_eq!(state.listener_count(), 0);

        state.transition(|s| s.phase = PlaybackPhase::Loading);
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_phase_change_is_broadcast() {
        let state = SharedState::new(16);
        let mut rx = state.subscribe_events();

        state.transition(|s| {
            s.active_clip_id = Some("e1".to_string());
            s.phase = PlaybackPhase::Loading;
        });

        match rx.recv().await.unwrap() {
            PlaybackEvent::PhaseChanged {
                clip_id,
                old_phase,
                new_phase,
                ..
            } => {
                assert_eq!(clip_id.as_deref(), Some("e1"));
                assert_eq!(old_phase, PlaybackPhase::Idle);
                assert_eq!(new_phase, PlaybackPhase::Loading);
            }
            other => panic!("Expected PhaseChanged, got {:?}", other),
        }
    }
}
