//! Sample rate conversion using rubato
//!
//! Used only when a decoded clip is sent to an audio device whose rate
//! differs from the clip's.

use crate::error::{Error, Result};
use rubato::{FastFixedIn, PolynomialDegree, Resampler as RubatoResampler};
use tracing::debug;

pub struct Resampler;

impl Resampler {
    /// Resample interleaved `input` from `input_rate` to `output_rate`.
    /// Returns a copy when the rates already match.
    pub fn resample(
        input: &[f32],
        input_rate: u32,
        output_rate: u32,
        channels: u16,
    ) -> Result<Vec<f32>> {
        if input_rate == output_rate || input.is_empty() {
            return Ok(input.to_vec());
        }
        if channels == 0 {
            return Err(Error::Decode("Cannot resample zero channels".to_string()));
        }

        debug!(
            "Resampling from {}Hz to {}Hz ({} channels)",
            input_rate, output_rate, channels
        );

        let planar_input = Self::deinterleave(input, channels);
        let input_frames = planar_input[0].len();

        let mut resampler = FastFixedIn::<f32>::new(
            output_rate as f64 / input_rate as f64,
            1.0,
            PolynomialDegree::Cubic,
            input_frames,
            channels as usize,
        )
        .map_err(|e| Error::Decode(format!("Failed to create resampler: {}", e)))?;

        let planar_output = resampler
            .process(&planar_input, None)
            .map_err(|e| Error::Decode(format!("Resampling failed: {}", e)))?;

        Ok(Self::interleave(planar_output))
    }

    /// Map interleaved frames from `from` channels to `to` channels.
    /// Mono fans out to every output channel; otherwise extra input
    /// channels are dropped and missing ones repeat the last input channel.
    pub fn remix(input: &[f32], from: u16, to: u16) -> Vec<f32> {
        if from == to || from == 0 || to == 0 {
            return input.to_vec();
        }
        let from = from as usize;
        let to = to as usize;
        let mut output = Vec::with_capacity(input.len() / from * to);
        for frame in input.chunks_exact(from) {
            for ch in 0..to {
                output.push(frame[ch.min(from - 1)]);
            }
        }
        output
    }

    fn deinterleave(samples: &[f32], channels: u16) -> Vec<Vec<f32>> {
        let num_channels = channels as usize;
        let num_frames = samples.len() / num_channels;
        let mut planar = vec![Vec::with_capacity(num_frames); num_channels];
        for frame in samples.chunks_exact(num_channels) {
            for (ch, sample) in frame.iter().enumerate() {
                planar[ch].push(*sample);
            }
        }
        planar
    }

    fn interleave(planar: Vec<Vec<f32>>) -> Vec<f32> {
        let num_frames = planar.first().map_or(0, Vec::len);
        let mut interleaved = Vec::with_capacity(num_frames * planar.len());
        for frame in 0..num_frames {
            for channel in &planar {
                interleaved.push(channel[frame]);
            }
        }
        interleaved
    }
}
