//! Single-owner voice-note playback session manager
//!
//! **Responsibilities:**
//! - Own at most one backend playback resource at a time
//! - Toggle semantics keyed by clip id (play / pause / resume / replay)
//! - Serialize overlapping `toggle`/`stop` calls across backend suspension points
//! - Discard acquisitions superseded by a newer request
//! - Fold backend progress and end-of-clip into `PlaybackState`
//!
//! Every request that changes the target clip bumps the intent generation
//! synchronously, before waiting for the operation lock. Work started under an
//! older generation is abandoned at the next check: queued toggles are
//! dropped, and acquisitions that resolve late are released instead of
//! adopted.
//!
//! The work behind each claim runs on its own task, so dropping a `toggle` or
//! `stop` future midway does not cancel it and the latest request is always
//! carried through. A stop whose claim was overtaken by a newer toggle leaves
//! the outcome to that toggle.

use crate::error::PlaybackError;
use crate::playback::backend::{PlaybackBackend, PlaybackHandle};
use crate::playback::clip::ClipRef;
use crate::playback::events::{BackendEvent, BackendEvents};
use crate::state::{PlaybackState, SharedState, Subscription};
use deercamp_common::config::AudioMode;
use deercamp_common::events::{PlaybackEvent, PlaybackPhase};
use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, PoisonError, Weak};
use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Events buffered per event-stream subscriber
const EVENT_CAPACITY: usize = 64;

/// The live resource and the clip it is bound to
struct Session {
    clip: ClipRef,
    /// Tag carried by this handle's backend events
    session_id: u64,
    handle: Box<dyn PlaybackHandle>,
}

/// Latest requested target and its generation
#[derive(Debug, Default)]
struct Intent {
    generation: u64,
    target: Option<String>,
}

impl Intent {
    /// Record a request for `target`; bumps the generation when the target changes.
    /// `None` (stop) always bumps.
    fn claim(&mut self, target: Option<&str>) -> u64 {
        let changes_target = match target {
            None => true,
            Some(id) => self.target.as_deref() != Some(id),
        };
        if changes_target {
            self.generation += 1;
            self.target = target.map(str::to_string);
        }
        self.generation
    }
}

struct Inner {
    backend: Arc<dyn PlaybackBackend>,
    audio_mode: AudioMode,
    audio_mode_applied: AtomicBool,
    state: SharedState,
    intent: Mutex<Intent>,
    next_session_id: AtomicU64,
    /// Operation lock; held across backend suspension points
    session: tokio::sync::Mutex<Option<Session>>,
    disposed: AtomicBool,
    event_tx: mpsc::UnboundedSender<(u64, BackendEvent)>,
}

/// Voice-note playback session manager
///
/// One instance per screen or list scope. Must be created inside a Tokio
/// runtime. Share it behind an `Arc` when several callbacks drive it.
///
/// No method returns an error: failures are recorded as
/// `PlaybackPhase::Failed` plus `last_error` and observed through
/// [`get_state`](Self::get_state), [`subscribe`](Self::subscribe) or
/// [`events`](Self::events).
pub struct PlaybackSessionManager {
    inner: Arc<Inner>,
    pump: JoinHandle<()>,
}

impl PlaybackSessionManager {
    pub fn new(backend: Arc<dyn PlaybackBackend>) -> Self {
        Self::with_audio_mode(backend, AudioMode::default())
    }

    /// Create a manager that applies `audio_mode` before its first acquisition
    pub fn with_audio_mode(backend: Arc<dyn PlaybackBackend>, audio_mode: AudioMode) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();
        let inner = Arc::new(Inner {
            backend,
            audio_mode,
            audio_mode_applied: AtomicBool::new(false),
            state: SharedState::new(EVENT_CAPACITY),
            intent: Mutex::new(Intent::default()),
            next_session_id: AtomicU64::new(0),
            session: tokio::sync::Mutex::new(None),
            disposed: AtomicBool::new(false),
            event_tx,
        });
        let pump = tokio::spawn(run_event_pump(Arc::downgrade(&inner), event_rx));
        Self { inner, pump }
    }

    /// Play, pause, resume or replay `clip` depending on the current session
    ///
    /// - same clip, Playing → Paused
    /// - same clip, Paused → Playing
    /// - same clip, Stopped → Playing from zero
    /// - anything else → release the current resource, Loading, then Playing or Failed
    pub async fn toggle(&self, clip: &ClipRef) {
        if self.inner.is_disposed() {
            warn!("Ignoring toggle({}) on disposed playback manager", clip.id);
            return;
        }

        let generation = self.inner.claim(Some(&clip.id));
        let inner = Arc::clone(&self.inner);
        let clip = clip.clone();
        run_to_completion("toggle", async move {
            inner.toggle_claimed(&clip, generation).await;
        })
        .await;
    }

    /// Stop and release any session. Ends Idle unless a newer toggle overtakes
    /// it; a no-op when already Idle.
    ///
    /// Waits for an in-flight acquisition to settle first. For a remote clip
    /// that can take up to the configured HTTP timeout.
    pub async fn stop(&self) {
        let generation = self.inner.claim(None);
        let inner = Arc::clone(&self.inner);
        run_to_completion("stop", async move {
            inner.stop_claimed(generation).await;
        })
        .await;
    }

    /// Stop, then refuse further toggles. Call when the hosting screen
    /// loses focus, unmounts or navigates away.
    ///
    /// New toggles are refused at once. The returned future resolves after
    /// the resource is released, which may wait behind a pending acquisition
    /// (see [`stop`](Self::stop)).
    pub async fn dispose(&self) {
        if self.inner.disposed.swap(true, Ordering::SeqCst) {
            debug!("Playback manager already disposed");
        } else {
            info!("Disposing playback manager");
        }
        self.stop().await;
    }

    pub fn is_disposed(&self) -> bool {
        self.inner.is_disposed()
    }

    /// Synchronous snapshot of the current state
    pub fn get_state(&self) -> PlaybackState {
        self.inner.state.snapshot()
    }

    /// Register a callback invoked after every phase or active-clip change.
    /// The listener stays registered until the returned guard is dropped.
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn(&PlaybackState) + Send + Sync + 'static,
    {
        self.inner.state.subscribe(Arc::new(listener))
    }

    /// Stream of discrete playback events
    pub fn events(&self) -> broadcast::Receiver<PlaybackEvent> {
        self.inner.state.subscribe_events()
    }
}

impl Drop for PlaybackSessionManager {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

impl Inner {
    fn is_disposed(&self) -> bool {
        self.disposed.load(Ordering::SeqCst)
    }

    fn claim(&self, target: Option<&str>) -> u64 {
        self.intent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .claim(target)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.intent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .generation
            == generation
    }

    async fn toggle_claimed(&self, clip: &ClipRef, generation: u64) {
        let mut session = self.session.lock().await;

        if self.is_disposed() {
            debug!("Playback manager disposed while toggle({}) waited", clip.id);
            return;
        }
        if !self.is_current(generation) {
            debug!(
                "{}",
                PlaybackError::Superseded {
                    clip_id: clip.id.clone()
                }
            );
            return;
        }

        info!("Toggle command received for clip {}", clip.id);
        self.toggle_locked(&mut *session, clip, generation).await;
    }

    async fn stop_claimed(&self, generation: u64) {
        let mut session = self.session.lock().await;
        // A newer toggle decides the outcome, unless the manager is being disposed
        if !self.is_current(generation) && !self.is_disposed() {
            debug!("Stop superseded by a newer request");
            return;
        }
        self.stop_locked(&mut *session).await;
    }

    async fn toggle_locked(&self, slot: &mut Option<Session>, clip: &ClipRef, generation: u64) {
        let same_clip = slot.as_ref().is_some_and(|s| s.clip.id == clip.id);
        if same_clip {
            match self.state.snapshot().phase {
                PlaybackPhase::Playing => return self.pause_locked(slot).await,
                PlaybackPhase::Paused => return self.resume_locked(slot, false).await,
                PlaybackPhase::Stopped => return self.resume_locked(slot, true).await,
                _ => {}
            }
        }
        self.switch_locked(slot, clip, generation).await;
    }

    async fn pause_locked(&self, slot: &mut Option<Session>) {
        let Some(session) = slot.as_mut() else {
            return;
        };
        match session.handle.pause().await {
            Ok(()) => {
                info!("Playback state changed: Playing -> Paused ({})", session.clip.id);
                self.state.transition(|s| s.phase = PlaybackPhase::Paused);
            }
            Err(e) => self.fail_transport(slot, "pause", e).await,
        }
    }

    /// Resume a paused session, or replay a finished one from zero
    async fn resume_locked(&self, slot: &mut Option<Session>, restart: bool) {
        let Some(session) = slot.as_mut() else {
            return;
        };
        let result = if restart {
            match session.handle.seek(0).await {
                Ok(()) => session.handle.play().await,
                Err(e) => Err(e),
            }
        } else {
            session.handle.play().await
        };

        match result {
            Ok(()) => {
                info!(
                    "Playback state changed: {} -> Playing ({})",
                    if restart { "Stopped" } else { "Paused" },
                    session.clip.id
                );
                self.state.transition(|s| {
                    s.phase = PlaybackPhase::Playing;
                    if restart {
                        s.position_ms = 0;
                    }
                });
            }
            Err(e) => {
                let operation = if restart { "restart" } else { "resume" };
                self.fail_transport(slot, operation, e).await;
            }
        }
    }

    /// Release whatever is live, then acquire and start `clip`
    async fn switch_locked(&self, slot: &mut Option<Session>, clip: &ClipRef, generation: u64) {
        self.release_locked(slot).await;
        self.ensure_audio_mode().await;

        let session_id = self.next_session_id.fetch_add(1, Ordering::SeqCst) + 1;
        self.state.transition(|s| {
            s.active_clip_id = Some(clip.id.clone());
            s.phase = PlaybackPhase::Loading;
            s.position_ms = 0;
            s.duration_ms = clip.duration_hint_ms.unwrap_or(0);
        });
        info!("Loading clip {} from {}", clip.id, clip.source_uri);

        let events = BackendEvents::from_sender(session_id, self.event_tx.clone());
        let acquired = self.backend.acquire(clip, events).await;

        if !self.is_current(generation) {
            debug!(
                "{}",
                PlaybackError::Superseded {
                    clip_id: clip.id.clone()
                }
            );
            if let Ok(handle) = acquired {
                if let Err(e) = handle.release().await {
                    debug!("Release of superseded clip {} failed: {}", clip.id, e);
                }
            }
            // Leave no Loading state behind for a clip that will never start
            self.state.transition(|s| {
                if s.phase == PlaybackPhase::Loading
                    && s.active_clip_id.as_deref() == Some(clip.id.as_str())
                {
                    *s = PlaybackState::default();
                }
            });
            return;
        }

        let mut handle = match acquired {
            Ok(handle) => handle,
            Err(e) => {
                self.record_failure(PlaybackError::AcquireFailed {
                    clip_id: clip.id.clone(),
                    reason: e.to_string(),
                });
                return;
            }
        };

        if let Err(e) = handle.play().await {
            if let Err(release_err) = handle.release().await {
                error!("Release after failed start of clip {} failed: {}", clip.id, release_err);
            }
            self.record_failure(PlaybackError::TransportFailed {
                clip_id: clip.id.clone(),
                operation: "play".to_string(),
                reason: e.to_string(),
            });
            return;
        }

        let duration_ms = handle.duration_ms();
        *slot = Some(Session {
            clip: clip.clone(),
            session_id,
            handle,
        });
        self.state.transition(|s| {
            s.phase = PlaybackPhase::Playing;
            if let Some(duration_ms) = duration_ms.filter(|d| *d > 0) {
                s.duration_ms = duration_ms;
            }
        });
        info!("Playback state changed: Loading -> Playing ({})", clip.id);
    }

    async fn stop_locked(&self, slot: &mut Option<Session>) {
        let had_session = slot.is_some();
        self.release_locked(slot).await;
        let changed = self.state.transition(|s| *s = PlaybackState::default());
        if had_session || changed {
            info!("Playback stopped");
        }
    }

    /// Stop and unload the live resource without touching state.
    /// Failures are logged; the resource is considered gone either way.
    async fn release_locked(&self, slot: &mut Option<Session>) {
        let Some(mut session) = slot.take() else {
            return;
        };
        debug_assert!(
            self.state.snapshot().phase.may_hold_resource(),
            "live session for clip {} outside a resource-holding phase",
            session.clip.id
        );
        debug!(
            "Releasing clip {} (session {})",
            session.clip.id, session.session_id
        );
        if let Err(e) = session.handle.stop().await {
            error!("Stop failed while releasing clip {}: {}", session.clip.id, e);
        }
        if let Err(e) = session.handle.release().await {
            error!("Unload failed for clip {}: {}", session.clip.id, e);
        }
    }

    /// Tear the session down after a failed transport call and record the failure
    async fn fail_transport(
        &self,
        slot: &mut Option<Session>,
        operation: &str,
        error: crate::error::Error,
    ) {
        let clip_id = slot
            .as_ref()
            .map(|s| s.clip.id.clone())
            .unwrap_or_default();
        self.release_locked(slot).await;
        self.record_failure(PlaybackError::TransportFailed {
            clip_id,
            operation: operation.to_string(),
            reason: error.to_string(),
        });
    }

    fn record_failure(&self, error: PlaybackError) {
        warn!("{}", error);
        let clip_id = error.clip_id().to_string();
        let message = error.to_string();
        self.state.transition(|s| {
            s.active_clip_id = None;
            s.phase = PlaybackPhase::Failed;
            s.position_ms = 0;
            s.last_error = Some(error);
        });
        self.state.broadcast_event(PlaybackEvent::PlaybackFailed {
            clip_id: Some(clip_id),
            error: message,
            timestamp: deercamp_common::time::now(),
        });
    }

    async fn ensure_audio_mode(&self) {
        if self.audio_mode_applied.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("Applying audio mode {:?}", self.audio_mode);
        if let Err(e) = self.backend.configure(&self.audio_mode).await {
            warn!("Failed to apply audio mode: {}", e);
        }
    }

    async fn handle_backend_event(&self, session_id: u64, event: BackendEvent) {
        let session = self.session.lock().await;
        let Some(active) = session.as_ref().filter(|s| s.session_id == session_id) else {
            debug!("Ignoring {:?} from released session {}", event, session_id);
            return;
        };

        match event {
            BackendEvent::Progress {
                position_ms,
                duration_ms,
            } => {
                let phase = self.state.snapshot().phase;
                if matches!(phase, PlaybackPhase::Playing | PlaybackPhase::Paused) {
                    self.state.update_progress(position_ms, duration_ms);
                }
            }
            BackendEvent::Finished => {
                let finished = self.state.transition(|s| {
                    if s.phase == PlaybackPhase::Playing {
                        s.phase = PlaybackPhase::Stopped;
                        s.position_ms = 0;
                    }
                });
                if finished {
                    info!("Clip {} finished", active.clip.id);
                    self.state.broadcast_event(PlaybackEvent::ClipCompleted {
                        clip_id: active.clip.id.clone(),
                        timestamp: deercamp_common::time::now(),
                    });
                }
            }
        }
    }
}

/// Run the work behind a claimed generation on its own task and wait for it.
/// Dropping the returned future leaves the work running.
async fn run_to_completion<F>(operation: &'static str, work: F)
where
    F: Future<Output = ()> + Send + 'static,
{
    if let Err(e) = tokio::spawn(work).await {
        error!("Playback {} task failed: {}", operation, e);
    }
}

/// Forward backend events to the manager until it is dropped
async fn run_event_pump(
    inner: Weak<Inner>,
    mut event_rx: mpsc::UnboundedReceiver<(u64, BackendEvent)>,
) {
    while let Some((session_id, event)) = event_rx.recv().await {
        let Some(inner) = inner.upgrade() else {
            break;
        };
        inner.handle_backend_event(session_id, event).await;
    }
}
