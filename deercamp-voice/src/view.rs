//! Per-clip presentation derived from `PlaybackState`

use crate::playback::clip::ClipRef;
use crate::state::PlaybackState;
use deercamp_common::events::PlaybackPhase;
use deercamp_common::time::{format_clip_duration, format_progress};
use serde::Serialize;

pub const LABEL_PLAY: &str = "Play Voice";
pub const LABEL_PAUSE: &str = "Pause Voice";
pub const LABEL_LOADING: &str = "Loading…";
pub const LABEL_RETRY: &str = "Retry Voice";

/// What a list row or detail header shows for one clip
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ClipView {
    pub clip_id: String,
    pub label: &'static str,
    /// This clip is bound to the current session
    pub is_active: bool,
    /// `m:ss`, empty when the duration is unknown
    pub duration_text: String,
    /// `m:ss / m:ss` while the clip is playing or paused
    pub progress_text: Option<String>,
}

impl ClipView {
    pub fn for_clip(state: &PlaybackState, clip: &ClipRef) -> Self {
        let is_active = state.is_active(&clip.id);
        let failed_here = state.phase == PlaybackPhase::Failed
            && state
                .last_error
                .as_ref()
                .is_some_and(|e| e.clip_id() == clip.id);

        let label = if failed_here {
            LABEL_RETRY
        } else if is_active {
            match state.phase {
                PlaybackPhase::Loading => LABEL_LOADING,
                PlaybackPhase::Playing => LABEL_PAUSE,
                _ => LABEL_PLAY,
            }
        } else {
            LABEL_PLAY
        };

        // The live resource knows better than the listing's hint
        let duration_ms = if is_active && state.duration_ms > 0 {
            state.duration_ms
        } else {
            clip.duration_hint_ms.unwrap_or(0)
        };

        let in_progress =
            is_active && matches!(state.phase, PlaybackPhase::Playing | PlaybackPhase::Paused);
        let progress_text = in_progress.then(|| format_progress(state.position_ms, duration_ms));

        Self {
            clip_id: clip.id.clone(),
            label,
            is_active,
            duration_text: format_clip_duration(duration_ms),
            progress_text,
        }
    }

    /// Single-line rendering: `"Pause Voice • 0:04"`
    pub fn caption(&self) -> String {
        if self.duration_text.is_empty() {
            self.label.to_string()
        } else {
            format!("{} • {}", self.label, self.duration_text)
        }
    }
}
