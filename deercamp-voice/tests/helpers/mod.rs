//! Shared test infrastructure for deercamp-voice integration tests
//!
//! - FakeBackend: scripted in-memory backend with gates and fault injection
//! - audio_generator: WAV fixtures for the symphonia backend

#![allow(dead_code)]

pub mod audio_generator;
pub mod fake_backend;

pub use audio_generator::generate_voice_wav;
pub use fake_backend::{FakeBackend, FAKE_DURATION_MS};

use deercamp_voice::{PlaybackPhase, PlaybackSessionManager, PlaybackState};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// Let spawned tasks and the event pump run to their next suspension point
pub async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

/// Poll until `predicate` holds or `timeout` elapses
pub async fn wait_for<F>(manager: &PlaybackSessionManager, timeout: Duration, predicate: F) -> PlaybackState
where
    F: Fn(&PlaybackState) -> bool,
{
    let deadline = tokio::time::Instant::now() + timeout;
    loop {
        let state = manager.get_state();
        if predicate(&state) {
            return state;
        }
        if tokio::time::Instant::now() >= deadline {
            panic!("Timed out waiting for state; last state: {:?}", state);
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
}

/// Collects the phase of every notification a listener receives
#[derive(Clone, Default)]
pub struct PhaseRecorder {
    phases: Arc<Mutex<Vec<(Option<String>, PlaybackPhase)>>>,
}

impl PhaseRecorder {
    pub fn listener(&self) -> impl Fn(&PlaybackState) + Send + Sync + 'static {
        let phases = Arc::clone(&self.phases);
        move |state: &PlaybackState| {
            phases
                .lock()
                .unwrap()
                .push((state.active_clip_id.clone(), state.phase));
        }
    }

    pub fn phases(&self) -> Vec<PlaybackPhase> {
        self.phases.lock().unwrap().iter().map(|(_, p)| *p).collect()
    }

    pub fn entries(&self) -> Vec<(Option<String>, PlaybackPhase)> {
        self.phases.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        self.phases.lock().unwrap().clear();
    }
}
