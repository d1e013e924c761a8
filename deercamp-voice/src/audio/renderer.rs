//! Real-time clip renderer
//!
//! A `PlayCursor` tracks the playhead of one decoded clip. By default the
//! cursor follows the wall clock; when a device output is attached, the
//! device callback advances it instead. A tick task reports progress through
//! `BackendEvents` and signals `Finished` when the playhead reaches the end.

use crate::audio::decoder::{frames_to_ms, ms_to_frames, DecodedClip};
use crate::playback::events::BackendEvents;
use std::ops::Range;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::debug;

/// Playhead shared between the renderer, its tick task and a device callback
#[derive(Debug)]
pub struct PlayCursor {
    total_frames: u64,
    sample_rate: u32,
    position: AtomicU64,
    playing: AtomicBool,
    /// Device callback owns the clock
    device_clock: bool,
    last_advance: Mutex<Instant>,
}

impl PlayCursor {
    /// Cursor paced by the wall clock
    pub fn new(total_frames: u64, sample_rate: u32) -> Self {
        Self::build(total_frames, sample_rate, false)
    }

    /// Cursor advanced by an audio device through [`take_frames`](Self::take_frames)
    pub fn device_clocked(total_frames: u64, sample_rate: u32) -> Self {
        Self::build(total_frames, sample_rate, true)
    }

    fn build(total_frames: u64, sample_rate: u32, device_clock: bool) -> Self {
        Self {
            total_frames,
            sample_rate,
            position: AtomicU64::new(0),
            playing: AtomicBool::new(false),
            device_clock,
            last_advance: Mutex::new(Instant::now()),
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn total_frames(&self) -> u64 {
        self.total_frames
    }

    pub fn position_frames(&self) -> u64 {
        self.position.load(Ordering::SeqCst)
    }

    pub fn position_ms(&self) -> u64 {
        frames_to_ms(self.position_frames(), self.sample_rate)
    }

    pub fn duration_ms(&self) -> u64 {
        frames_to_ms(self.total_frames, self.sample_rate)
    }

    pub fn is_playing(&self) -> bool {
        self.playing.load(Ordering::SeqCst)
    }

    pub fn at_end(&self) -> bool {
        self.position_frames() >= self.total_frames
    }

    pub fn play(&self) {
        self.reset_clock();
        self.playing.store(true, Ordering::SeqCst);
    }

    pub fn pause(&self) {
        self.advance();
        self.playing.store(false, Ordering::SeqCst);
    }

    /// Move the playhead; positions past the end clamp to the end
    pub fn seek(&self, position_ms: u64) {
        let frames = ms_to_frames(position_ms, self.sample_rate).min(self.total_frames);
        self.reset_clock();
        self.position.store(frames, Ordering::SeqCst);
    }

    /// Bring a wall-clock cursor up to date. No-op for device-clocked cursors.
    pub fn advance(&self) {
        if self.device_clock {
            return;
        }
        let mut last = self.last_advance.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();
        if self.playing.load(Ordering::SeqCst) {
            let elapsed = now.duration_since(*last);
            let frames = (elapsed.as_secs_f64() * self.sample_rate as f64) as u64;
            if frames == 0 {
                // Keep the remainder for the next call
                return;
            }
            let next = (self.position_frames() + frames).min(self.total_frames);
            self.position.store(next, Ordering::SeqCst);
            // Advance by exactly the frames consumed so rounding does not drift
            *last += Duration::from_secs_f64(frames as f64 / self.sample_rate as f64);
        } else {
            *last = now;
        }
    }

    /// Claim up to `max_frames` frames for a device buffer. Returns `None`
    /// while paused.
    pub fn take_frames(&self, max_frames: usize) -> Option<Range<usize>> {
        if !self.is_playing() {
            return None;
        }
        let start = self.position_frames();
        let end = (start + max_frames as u64).min(self.total_frames);
        self.position.store(end, Ordering::SeqCst);
        Some(start as usize..end as usize)
    }

    /// Stop playing if the playhead reached the end. Returns true exactly
    /// once per run to the end.
    fn finish_if_done(&self) -> bool {
        self.at_end() && self.playing.swap(false, Ordering::SeqCst)
    }

    fn reset_clock(&self) {
        *self.last_advance.lock().unwrap_or_else(PoisonError::into_inner) = Instant::now();
    }
}

/// Renders one decoded clip and reports its progress
pub struct ClipRenderer {
    cursor: Arc<PlayCursor>,
    ticker: JoinHandle<()>,
    #[cfg(feature = "device-output")]
    _output: Option<crate::audio::output::DeviceOutput>,
}

impl ClipRenderer {
    /// Start a wall-clock renderer for `clip`. Must be called inside a Tokio runtime.
    pub fn start(clip: &DecodedClip, tick: Duration, events: BackendEvents) -> Self {
        let cursor = Arc::new(PlayCursor::new(clip.frames(), clip.sample_rate));
        Self::with_cursor(cursor, tick, events)
    }

    /// Start a renderer on the default audio device, falling back to the
    /// wall clock when no device can be opened.
    #[cfg(feature = "device-output")]
    pub async fn start_on_device(clip: DecodedClip, tick: Duration, events: BackendEvents) -> Self {
        let fallback = PlayCursor::new(clip.frames(), clip.sample_rate);
        let opened =
            tokio::task::spawn_blocking(move || crate::audio::output::DeviceOutput::open(clip))
                .await;
        match opened {
            Ok(Ok((output, cursor))) => {
                let mut renderer = Self::with_cursor(cursor, tick, events);
                renderer._output = Some(output);
                renderer
            }
            Ok(Err(e)) => {
                tracing::warn!("Audio device unavailable, rendering silently: {}", e);
                Self::with_cursor(Arc::new(fallback), tick, events)
            }
            Err(e) => {
                tracing::warn!("Audio device setup panicked, rendering silently: {}", e);
                Self::with_cursor(Arc::new(fallback), tick, events)
            }
        }
    }

    fn with_cursor(cursor: Arc<PlayCursor>, tick: Duration, events: BackendEvents) -> Self {
        let ticker = tokio::spawn(run_ticker(Arc::clone(&cursor), tick, events));
        Self {
            cursor,
            ticker,
            #[cfg(feature = "device-output")]
            _output: None,
        }
    }

    pub fn cursor(&self) -> &Arc<PlayCursor> {
        &self.cursor
    }

    pub fn duration_ms(&self) -> u64 {
        self.cursor.duration_ms()
    }

    pub fn play(&self) {
        if self.cursor.at_end() {
            self.cursor.seek(0);
        }
        self.cursor.play();
    }

    pub fn pause(&self) {
        self.cursor.pause();
    }

    pub fn seek(&self, position_ms: u64) {
        self.cursor.seek(position_ms);
    }

    /// Halt and rewind
    pub fn stop(&self) {
        self.cursor.pause();
        self.cursor.seek(0);
    }
}

impl Drop for ClipRenderer {
    fn drop(&mut self) {
        self.ticker.abort();
    }
}

async fn run_ticker(cursor: Arc<PlayCursor>, tick: Duration, events: BackendEvents) {
    let mut interval = tokio::time::interval(tick);
    interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
    let duration_ms = Some(cursor.duration_ms());

    loop {
        interval.tick().await;
        cursor.advance();

        if cursor.finish_if_done() {
            debug!("Renderer reached end of clip (session {})", events.generation());
            events.progress(cursor.duration_ms(), duration_ms);
            events.finished();
            continue;
        }

        if cursor.is_playing() {
            events.progress(cursor.position_ms(), duration_ms);
        }
    }
}
