//! Symphonia-based playback backend
//!
//! Fetches a clip (disk or HTTP), decodes it on a blocking thread and wraps
//! it in a `ClipRenderer`.

use crate::audio::decoder::{ClipDecoder, DecodedClip};
use crate::audio::renderer::ClipRenderer;
use crate::audio::source::ClipSource;
use crate::error::{Error, Result};
use crate::playback::backend::{PlaybackBackend, PlaybackHandle};
use crate::playback::clip::ClipRef;
use crate::playback::events::BackendEvents;
use async_trait::async_trait;
use deercamp_common::config::{AudioMode, VoiceConfig};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{debug, info};

/// Backend decoding clips with symphonia
pub struct SymphoniaBackend {
    http: reqwest::Client,
    progress_interval: Duration,
    audio_mode: Mutex<Option<AudioMode>>,
}

impl SymphoniaBackend {
    pub fn new(config: &VoiceConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.http_timeout())
            .build()?;
        Ok(Self {
            http,
            progress_interval: config.progress_interval(),
            audio_mode: Mutex::new(None),
        })
    }

    /// Audio mode applied by the last `configure` call
    pub fn audio_mode(&self) -> Option<AudioMode> {
        self.audio_mode
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    #[cfg(feature = "device-output")]
    async fn start_renderer(&self, clip: DecodedClip, events: BackendEvents) -> ClipRenderer {
        ClipRenderer::start_on_device(clip, self.progress_interval, events).await
    }

    #[cfg(not(feature = "device-output"))]
    async fn start_renderer(&self, clip: DecodedClip, events: BackendEvents) -> ClipRenderer {
        ClipRenderer::start(&clip, self.progress_interval, events)
    }
}

#[async_trait]
impl PlaybackBackend for SymphoniaBackend {
    async fn configure(&self, mode: &AudioMode) -> Result<()> {
        // Desktop hosts have no silent switch or ducking; the mode is only recorded
        info!(
            "Audio mode: silent_mode={}, duck_others={}, background={}",
            mode.plays_in_silent_mode, mode.duck_others, mode.stays_active_in_background
        );
        *self.audio_mode.lock().unwrap_or_else(PoisonError::into_inner) = Some(mode.clone());
        Ok(())
    }

    async fn acquire(
        &self,
        clip: &ClipRef,
        events: BackendEvents,
    ) -> Result<Box<dyn PlaybackHandle>> {
        let source = ClipSource::parse(&clip.source_uri)?;
        let bytes = source.fetch(&self.http).await?;
        let hint = source.extension_hint();

        let decoded =
            tokio::task::spawn_blocking(move || ClipDecoder::decode_bytes(bytes, hint.as_deref()))
                .await
                .map_err(|e| Error::Internal(format!("Decode task failed: {}", e)))??;

        debug!(
            "Clip {} decoded: {}ms at {}Hz",
            clip.id,
            decoded.duration_ms(),
            decoded.sample_rate
        );

        let renderer = self.start_renderer(decoded, events).await;
        Ok(Box::new(SymphoniaHandle {
            clip_id: clip.id.clone(),
            renderer,
        }))
    }
}

/// Loaded clip backed by a `ClipRenderer`
pub struct SymphoniaHandle {
    clip_id: String,
    renderer: ClipRenderer,
}

#[async_trait]
impl PlaybackHandle for SymphoniaHandle {
    fn duration_ms(&self) -> Option<u64> {
        Some(self.renderer.duration_ms())
    }

    async fn play(&mut self) -> Result<()> {
        self.renderer.play();
        Ok(())
    }

    async fn pause(&mut self) -> Result<()> {
        self.renderer.pause();
        Ok(())
    }

    async fn seek(&mut self, position_ms: u64) -> Result<()> {
        self.renderer.seek(position_ms);
        Ok(())
    }

    async fn stop(&mut self) -> Result<()> {
        self.renderer.stop();
        Ok(())
    }

    async fn release(self: Box<Self>) -> Result<()> {
        debug!("Releasing renderer for clip {}", self.clip_id);
        Ok(())
    }
}
