//! WAV decoding into 16 kHz mono PCM.

use crate::defaults::SAMPLE_RATE;
use crate::error::{Result, VoicebotError};
use std::io::{Cursor, Read};

/// Decoded WAV content, normalized for recognition.
#[derive(Debug, Clone)]
pub struct DecodedWav {
    /// 16 kHz mono samples.
    pub samples: Vec<i16>,
    /// Sample rate of the file before resampling.
    pub source_rate: u32,
    /// Channel count of the file before down-mixing.
    pub source_channels: u16,
}

/// Decode WAV data from any reader.
/// Supports integer and float formats, arbitrary sample rates and channels.
pub fn decode_wav<R: Read>(reader: R) -> Result<DecodedWav> {
    let mut wav_reader = hound::WavReader::new(reader).map_err(|e| VoicebotError::AudioDecode {
        message: format!("Failed to parse WAV file: {}", e),
    })?;

    let spec = wav_reader.spec();
    let source_rate = spec.sample_rate;
    let source_channels = spec.channels;

    if source_rate == 0 || source_channels == 0 {
        return Err(VoicebotError::AudioDecode {
            message: format!(
                "Invalid WAV header: {} Hz, {} channels",
                source_rate, source_channels
            ),
        });
    }

    let read_error = |e: hound::Error| VoicebotError::AudioDecode {
        message: format!("Failed to read WAV samples: {}", e),
    };

    let raw_samples: Vec<i16> = match (spec.sample_format, spec.bits_per_sample) {
        (hound::SampleFormat::Int, bits) if bits <= 16 => wav_reader
            .samples::<i16>()
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(read_error)?,
        (hound::SampleFormat::Int, bits) => {
            let shift = bits.saturating_sub(16) as u32;
            wav_reader
                .samples::<i32>()
                .map(|s| s.map(|v| (v >> shift) as i16))
                .collect::<std::result::Result<Vec<_>, _>>()
                .map_err(read_error)?
        }
        (hound::SampleFormat::Float, _) => wav_reader
            .samples::<f32>()
            .map(|s| s.map(float_to_i16))
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(read_error)?,
    };

    let mono_samples = downmix(raw_samples, source_channels);

    let samples = if source_rate != SAMPLE_RATE {
        resample(&mono_samples, source_rate, SAMPLE_RATE)
    } else {
        mono_samples
    };

    Ok(DecodedWav {
        samples,
        source_rate,
        source_channels,
    })
}

/// Decode an in-memory WAV buffer.
pub fn decode_wav_bytes(bytes: &[u8]) -> Result<DecodedWav> {
    decode_wav(Cursor::new(bytes))
}

/// Encode 16 kHz mono samples as a 16-bit PCM WAV buffer.
pub fn encode_wav(samples: &[i16]) -> Result<Vec<u8>> {
    let spec = hound::WavSpec {
        channels: 1,
        sample_rate: SAMPLE_RATE,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let encode_error = |e: hound::Error| VoicebotError::AudioDecode {
        message: format!("Failed to encode WAV: {}", e),
    };

    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).map_err(encode_error)?;
        for &sample in samples {
            writer.write_sample(sample).map_err(encode_error)?;
        }
        writer.finalize().map_err(encode_error)?;
    }
    Ok(cursor.into_inner())
}

fn float_to_i16(sample: f32) -> i16 {
    let clamped = if sample.is_finite() {
        sample.clamp(-1.0, 1.0)
    } else {
        0.0
    };
    (clamped * i16::MAX as f32) as i16
}

/// Average interleaved channels into one.
fn downmix(samples: Vec<i16>, channels: u16) -> Vec<i16> {
    if channels <= 1 {
        return samples;
    }
    samples
        .chunks_exact(channels as usize)
        .map(|frame| {
            let sum: i32 = frame.iter().map(|&s| s as i32).sum();
            (sum / channels as i32) as i16
        })
        .collect()
}

/// Simple linear interpolation resampling.
fn resample(samples: &[i16], from_rate: u32, to_rate: u32) -> Vec<i16> {
    if from_rate == to_rate || samples.is_empty() {
        return samples.to_vec();
    }

    let ratio = from_rate as f64 / to_rate as f64;
    let output_len = (samples.len() as f64 / ratio).ceil() as usize;

    (0..output_len)
        .map(|i| {
            let source_pos = i as f64 * ratio;
            let source_idx = (source_pos.floor() as usize).min(samples.len() - 1);
            let fraction = source_pos - source_idx as f64;

            if source_idx + 1 >= samples.len() {
                samples[source_idx]
            } else {
                let left = samples[source_idx] as f64;
                let right = samples[source_idx + 1] as f64;
                (left + (right - left) * fraction) as i16
            }
        })
        .collect()
}
