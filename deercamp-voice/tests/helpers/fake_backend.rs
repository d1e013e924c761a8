//! Scripted in-memory playback backend
//!
//! Records every backend call in order and lets a test:
//! - hold an acquisition until `open()` (to interleave requests)
//! - fail acquisitions or transport operations for chosen clips
//! - drive progress and end-of-clip through the session's `BackendEvents`
//! - check that no two handles are ever live at once

use async_trait::async_trait;
use deercamp_voice::error::{Error, Result};
use deercamp_voice::playback::{BackendEvents, ClipRef, PlaybackBackend, PlaybackHandle};
use deercamp_voice::AudioMode;
use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::Notify;

pub const FAKE_DURATION_MS: u64 = 4200;

#[derive(Default)]
struct Script {
    gates: HashMap<String, Arc<Notify>>,
    failing_acquires: HashSet<String>,
    failing_ops: HashSet<(String, &'static str)>,
    events: HashMap<String, BackendEvents>,
    configured: Vec<AudioMode>,
    log: Vec<String>,
}

#[derive(Default)]
struct Counters {
    acquired: AtomicUsize,
    released: AtomicUsize,
    live: AtomicUsize,
    max_live: AtomicUsize,
}

#[derive(Clone, Default)]
pub struct FakeBackend {
    script: Arc<Mutex<Script>>,
    counters: Arc<Counters>,
}

impl FakeBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Block the next acquisition of `clip_id` until `open(clip_id)`
    pub fn hold_acquire(&self, clip_id: &str) {
        self.script
            .lock()
            .unwrap()
            .gates
            .insert(clip_id.to_string(), Arc::new(Notify::new()));
    }

    /// Release a held acquisition (works before or after it starts waiting)
    pub fn open(&self, clip_id: &str) {
        if let Some(gate) = self.script.lock().unwrap().gates.remove(clip_id) {
            gate.notify_one();
        }
    }

    pub fn fail_acquire(&self, clip_id: &str) {
        self.script
            .lock()
            .unwrap()
            .failing_acquires
            .insert(clip_id.to_string());
    }

    pub fn heal_acquire(&self, clip_id: &str) {
        self.script.lock().unwrap().failing_acquires.remove(clip_id);
    }

    /// Make `op` (`"play"`, `"pause"`, `"seek"`, `"stop"`) fail for `clip_id`
    pub fn fail_op(&self, clip_id: &str, op: &'static str) {
        self.script
            .lock()
            .unwrap()
            .failing_ops
            .insert((clip_id.to_string(), op));
    }

    /// Event sender of the most recent acquisition of `clip_id`
    pub fn events_for(&self, clip_id: &str) -> BackendEvents {
        self.script
            .lock()
            .unwrap()
            .events
            .get(clip_id)
            .cloned()
            .unwrap_or_else(|| panic!("clip {} was never acquired", clip_id))
    }

    /// Simulate natural end of `clip_id`
    pub fn finish(&self, clip_id: &str) {
        self.events_for(clip_id).finished();
    }

    pub fn progress(&self, clip_id: &str, position_ms: u64) {
        self.events_for(clip_id)
            .progress(position_ms, Some(FAKE_DURATION_MS));
    }

    /// Ordered call log, e.g. `["configure", "acquire e1", "play e1"]`
    pub fn log(&self) -> Vec<String> {
        self.script.lock().unwrap().log.clone()
    }

    pub fn configured(&self) -> Vec<AudioMode> {
        self.script.lock().unwrap().configured.clone()
    }

    /// Clips whose acquisition produced a handle
    pub fn acquired(&self) -> usize {
        self.counters.acquired.load(Ordering::SeqCst)
    }

    pub fn released(&self) -> usize {
        self.counters.released.load(Ordering::SeqCst)
    }

    pub fn live(&self) -> usize {
        self.counters.live.load(Ordering::SeqCst)
    }

    pub fn max_live(&self) -> usize {
        self.counters.max_live.load(Ordering::SeqCst)
    }

    fn record(&self, entry: String) {
        self.script.lock().unwrap().log.push(entry);
    }

    fn op_fails(&self, clip_id: &str, op: &'static str) -> bool {
        self.script
            .lock()
            .unwrap()
            .failing_ops
            .contains(&(clip_id.to_string(), op))
    }
}

#[async_trait]
impl PlaybackBackend for FakeBackend {
    async fn configure(&self, mode: &AudioMode) -> Result<()> {
        let mut script = self.script.lock().unwrap();
        script.configured.push(mode.clone());
        script.log.push("configure".to_string());
        Ok(())
    }

    async fn acquire(
        &self,
        clip: &ClipRef,
        events: BackendEvents,
    ) -> Result<Box<dyn PlaybackHandle>> {
        self.record(format!("acquire {}", clip.id));

        let gate = self.script.lock().unwrap().gates.get(&clip.id).cloned();
        if let Some(gate) = gate {
            gate.notified().await;
        }

        if self
            .script
            .lock()
            .unwrap()
            .failing_acquires
            .contains(&clip.id)
        {
            return Err(Error::Source(format!("injected failure for {}", clip.id)));
        }

        self.script
            .lock()
            .unwrap()
            .events
            .insert(clip.id.clone(), events);

        self.counters.acquired.fetch_add(1, Ordering::SeqCst);
        let live = self.counters.live.fetch_add(1, Ordering::SeqCst) + 1;
        self.counters.max_live.fetch_max(live, Ordering::SeqCst);

        Ok(Box::new(FakeHandle {
            clip_id: clip.id.clone(),
            backend: self.clone(),
        }))
    }
}

struct FakeHandle {
    clip_id: String,
    backend: FakeBackend,
}

impl FakeHandle {
    fn op(&self, op: &'static str) -> Result<()> {
        self.backend.record(format!("{} {}", op, self.clip_id));
        if self.backend.op_fails(&self.clip_id, op) {
            return Err(Error::Playback(format!("injected {} failure", op)));
        }
        Ok(())
    }
}

#[async_trait]
impl PlaybackHandle for FakeHandle {
    fn duration_ms(&self) -> Option<u64> {
        Some(FAKE_DURATION_MS)
    }

    async fn play(&mut self) -> Result<()> {
        self.op("play")
    }

    async fn pause(&mut self) -> Result<()> {
        self.op("pause")
    }

    async fn seek(&mut self, position_ms: u64) -> Result<()> {
        self.backend
            .record(format!("seek {} {}", self.clip_id, position_ms));
        if self.backend.op_fails(&self.clip_id, "seek") {
            return Err(Error::Playback("injected seek failure".to_string()));
        }
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.op("stop")
    }

    async fn release(self: Box<Self>) -> Result<()> {
        self.backend.record(format!("release {}", self.clip_id));
        self.backend.counters.released.fetch_add(1, Ordering::SeqCst);
        self.backend.counters.live.fetch_sub(1, Ordering::SeqCst);
        Ok(())
    }
}
