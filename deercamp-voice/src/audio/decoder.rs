//! Clip decoding using symphonia
//!
//! Voice notes are short, so the whole clip is decoded up front into
//! interleaved `f32` samples at the source rate.

use crate::error::{Error, Result};
use std::io::Cursor;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use tracing::{debug, warn};

/// Fully decoded clip
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedClip {
    /// Interleaved samples
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub channels: u16,
}

impl DecodedClip {
    pub fn frames(&self) -> u64 {
        if self.channels == 0 {
            return 0;
        }
        (self.samples.len() / self.channels as usize) as u64
    }

    pub fn duration_ms(&self) -> u64 {
        frames_to_ms(self.frames(), self.sample_rate)
    }
}

/// Convert a frame count at `sample_rate` to whole milliseconds (floor)
pub fn frames_to_ms(frames: u64, sample_rate: u32) -> u64 {
    if sample_rate == 0 {
        return 0;
    }
    frames * 1000 / sample_rate as u64
}

/// Convert milliseconds to a frame count at `sample_rate` (floor)
pub fn ms_to_frames(ms: u64, sample_rate: u32) -> u64 {
    ms * sample_rate as u64 / 1000
}

pub struct ClipDecoder;

impl ClipDecoder {
    /// Decode an in-memory clip.
    ///
    /// `extension` is a format hint (`"m4a"`, `"mp3"`, ...); probing still
    /// works without it for formats with magic bytes.
    ///
    /// # Errors
    /// - Unrecognized container or codec
    /// - No audio track
    /// - No samples decoded
    pub fn decode_bytes(bytes: Vec<u8>, extension: Option<&str>) -> Result<DecodedClip> {
        debug!("Decoding clip ({} bytes, hint={:?})", bytes.len(), extension);

        let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes)), Default::default());

        let mut hint = Hint::new();
        if let Some(ext) = extension {
            hint.with_extension(ext);
        }

        let probed = symphonia::default::get_probe()
            .format(
                &hint,
                mss,
                &FormatOptions::default(),
                &MetadataOptions::default(),
            )
            .map_err(|e| Error::Decode(format!("Failed to probe format: {}", e)))?;

        let mut format = probed.format;

        let track = format
            .tracks()
            .iter()
            .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
            .ok_or_else(|| Error::Decode("No audio track found".to_string()))?;
        let track_id = track.id;

        let mut sample_rate = track.codec_params.sample_rate;
        let mut channels = track.codec_params.channels.map(|c| c.count() as u16);

        let mut decoder = symphonia::default::get_codecs()
            .make(&track.codec_params, &DecoderOptions::default())
            .map_err(|e| Error::Decode(format!("Failed to create decoder: {}", e)))?;

        let mut samples = Vec::new();
        let mut sample_buf: Option<SampleBuffer<f32>> = None;

        loop {
            let packet = match format.next_packet() {
                Ok(packet) => packet,
                Err(SymphoniaError::IoError(ref e))
                    if e.kind() == std::io::ErrorKind::UnexpectedEof =>
                {
                    break;
                }
                Err(SymphoniaError::ResetRequired) => {
                    warn!("Stream reset required mid-clip; stopping decode");
                    break;
                }
                Err(e) => {
                    warn!("Error reading packet: {}", e);
                    break;
                }
            };

            if packet.track_id() != track_id {
                continue;
            }

            match decoder.decode(&packet) {
                Ok(decoded) => {
                    let spec = *decoded.spec();
                    sample_rate.get_or_insert(spec.rate);
                    channels.get_or_insert(spec.channels.count() as u16);

                    // Reallocate only when a packet outgrows the buffer
                    let needed = decoded.capacity() as u64;
                    let needed_samples = needed as usize * spec.channels.count();
                    if sample_buf
                        .as_ref()
                        .map_or(true, |buf| buf.capacity() < needed_samples)
                    {
                        sample_buf = Some(SampleBuffer::new(needed, spec));
                    }
                    if let Some(buf) = sample_buf.as_mut() {
                        buf.copy_interleaved_ref(decoded);
                        samples.extend_from_slice(buf.samples());
                    }
                }
                Err(SymphoniaError::DecodeError(e)) => {
                    warn!("Skipping corrupt packet: {}", e);
                }
                Err(e) => {
                    return Err(Error::Decode(format!("Decoder failed: {}", e)));
                }
            }
        }

        let sample_rate = sample_rate
            .filter(|rate| *rate > 0)
            .ok_or_else(|| Error::Decode("Sample rate not found".to_string()))?;
        let channels = channels
            .filter(|count| *count > 0)
            .ok_or_else(|| Error::Decode("Channel count not found".to_string()))?;

        if samples.is_empty() {
            return Err(Error::Decode("Clip contains no audio".to_string()));
        }

        let clip = DecodedClip {
            samples,
            sample_rate,
            channels,
        };
        debug!(
            "Decoded {} frames at {}Hz x{} ({}ms)",
            clip.frames(),
            clip.sample_rate,
            clip.channels,
            clip.duration_ms()
        );
        Ok(clip)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wav_bytes(sample_rate: u32, channels: u16, frames: u32) -> Vec<u8> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
            for i in 0..frames {
                let t = i as f32 / sample_rate as f32;
                let value = ((t * 440.0 * 2.0 * std::f32::consts::PI).sin() * 8000.0) as i16;
                for _ in 0..channels {
                    writer.write_sample(value).unwrap();
                }
            }
            writer.finalize().unwrap();
        }
        cursor.into_inner()
    }

    #[test]
    fn test_decode_wav() {
        let clip = ClipDecoder::decode_bytes(wav_bytes(8000, 1, 4000), Some("wav")).unwrap();
        assert_eq!(clip.sample_rate, 8000);
        assert_eq!(clip.channels, 1);
        assert_eq!(clip.frames(), 4000);
        assert_eq!(clip.duration_ms(), 500);
    }

    #[test]
    fn test_decode_stereo_without_hint() {
        let clip = ClipDecoder::decode_bytes(wav_bytes(16000, 2, 1600), None).unwrap();
        assert_eq!(clip.channels, 2);
        assert_eq!(clip.samples.len(), 3200);
        assert_eq!(clip.duration_ms(), 100);
    }

    #[test]
    fn test_garbage_is_decode_error() {
        let err = ClipDecoder::decode_bytes(b"definitely not audio".to_vec(), Some("m4a"))
            .unwrap_err();
        assert!(matches!(err, Error::Decode(_)));
    }

    #[test]
    fn test_frame_conversions() {
        assert_eq!(frames_to_ms(44100, 44100), 1000);
        assert_eq!(frames_to_ms(100, 0), 0);
        assert_eq!(ms_to_frames(250, 8000), 2000);
    }
}
