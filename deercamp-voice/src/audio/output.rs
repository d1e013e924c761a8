//! Audio device output using cpal
//!
//! The cpal stream lives on its own thread for its whole life, since streams
//! are not `Send` on every host. Dropping the `DeviceOutput` ends the thread
//! and closes the stream.

use crate::audio::decoder::DecodedClip;
use crate::audio::renderer::PlayCursor;
use crate::audio::resampler::Resampler;
use crate::error::{Error, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, Stream, StreamConfig};
use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use tracing::{debug, error, info};

/// Open stream on the default output device
pub struct DeviceOutput {
    shutdown: Option<mpsc::Sender<()>>,
}

impl DeviceOutput {
    /// Convert `clip` to the default device's format and start a paused
    /// stream for it. Blocks until the device is ready; call off the runtime.
    pub fn open(clip: DecodedClip) -> Result<(Self, Arc<PlayCursor>)> {
        let (ready_tx, ready_rx) = mpsc::channel::<Result<Arc<PlayCursor>>>();
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        thread::Builder::new()
            .name("deercamp-voice-output".to_string())
            .spawn(move || {
                let stream = match Self::build(clip) {
                    Ok((stream, cursor)) => {
                        let _ = ready_tx.send(Ok(cursor));
                        stream
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e));
                        return;
                    }
                };
                // Returns once the sender is dropped
                let _ = shutdown_rx.recv();
                drop(stream);
                debug!("Audio output stream closed");
            })
            .map_err(|e| Error::AudioOutput(format!("Failed to spawn output thread: {}", e)))?;

        let cursor = ready_rx
            .recv()
            .map_err(|_| Error::AudioOutput("Output thread exited during setup".to_string()))??;

        Ok((
            Self {
                shutdown: Some(shutdown_tx),
            },
            cursor,
        ))
    }

    fn build(clip: DecodedClip) -> Result<(Stream, Arc<PlayCursor>)> {
        let host = cpal::default_host();
        let device = host
            .default_output_device()
            .ok_or_else(|| Error::AudioOutput("No default output device found".to_string()))?;
        let name = device.name().unwrap_or_else(|_| "Unknown".to_string());

        let supported = device
            .default_output_config()
            .map_err(|e| Error::AudioOutput(format!("Failed to get default config: {}", e)))?;
        let sample_format = supported.sample_format();
        let config: StreamConfig = supported.config();

        let resampled = Resampler::resample(
            &clip.samples,
            clip.sample_rate,
            config.sample_rate.0,
            clip.channels,
        )?;
        let samples: Arc<[f32]> =
            Resampler::remix(&resampled, clip.channels, config.channels).into();
        let frames = (samples.len() / config.channels.max(1) as usize) as u64;
        let cursor = Arc::new(PlayCursor::device_clocked(frames, config.sample_rate.0));

        debug!(
            "Output config: device={}, sample_rate={}, channels={}, format={:?}",
            name, config.sample_rate.0, config.channels, sample_format
        );

        let stream = match sample_format {
            SampleFormat::F32 => Self::build_stream(&device, &config, samples, Arc::clone(&cursor), |s| s)?,
            SampleFormat::I16 => Self::build_stream(&device, &config, samples, Arc::clone(&cursor), |s| {
                (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16
            })?,
            other => {
                return Err(Error::AudioOutput(format!(
                    "Unsupported sample format: {:?}",
                    other
                )))
            }
        };

        stream
            .play()
            .map_err(|e| Error::AudioOutput(format!("Failed to start stream: {}", e)))?;
        info!("Audio output started on {}", name);

        Ok((stream, cursor))
    }

    fn build_stream<T, F>(
        device: &Device,
        config: &StreamConfig,
        samples: Arc<[f32]>,
        cursor: Arc<PlayCursor>,
        convert: F,
    ) -> Result<Stream>
    where
        T: cpal::SizedSample + Default + Send + 'static,
        F: Fn(f32) -> T + Send + 'static,
    {
        let channels = config.channels.max(1) as usize;

        device
            .build_output_stream(
                config,
                move |data: &mut [T], _: &cpal::OutputCallbackInfo| {
                    let requested = data.len() / channels;
                    let range = cursor.take_frames(requested).unwrap_or(0..0);
                    let source = &samples[range.start * channels..range.end * channels];
                    let (head, tail) = data.split_at_mut(source.len());
                    for (out, sample) in head.iter_mut().zip(source) {
                        *out = convert(*sample);
                    }
                    tail.fill(T::default());
                },
                move |err| {
                    error!("Audio stream error: {}", err);
                },
                None,
            )
            .map_err(|e| Error::AudioOutput(format!("Failed to build stream: {}", e)))
    }
}

impl Drop for DeviceOutput {
    fn drop(&mut self) {
        self.shutdown.take();
    }
}
