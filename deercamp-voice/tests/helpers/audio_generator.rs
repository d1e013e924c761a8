//! WAV fixture generation

use hound::{WavSpec, WavWriter};
use std::f32::consts::PI;
use std::path::Path;

/// Write a mono 16-bit sine WAV of `duration_ms` at `sample_rate`
pub fn generate_voice_wav<P: AsRef<Path>>(
    path: P,
    sample_rate: u32,
    duration_ms: u64,
) -> Result<(), hound::Error> {
    let spec = WavSpec {
        channels: 1,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut writer = WavWriter::create(path, spec)?;

    let total_frames = sample_rate as u64 * duration_ms / 1000;
    for n in 0..total_frames {
        let t = n as f32 / sample_rate as f32;
        // Speech-band tone at half scale
        let sample = (2.0 * PI * 220.0 * t).sin() * 0.5;
        writer.write_sample((sample * i16::MAX as f32) as i16)?;
    }

    writer.finalize()
}
