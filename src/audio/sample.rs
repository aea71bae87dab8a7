//! Recorded speech handed to the pipeline, one per turn.

use crate::audio::wav::decode_wav;
use crate::defaults::{MIN_SPEECH_ENERGY, SAMPLE_RATE};
use crate::error::{Result, VoicebotError};
use std::fs::File;
use std::io::{BufReader, Cursor};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone)]
enum SampleSource {
    File(PathBuf),
    Memory(Vec<u8>),
}

/// Handle to a recorded speech sample (a WAV file on disk or in memory).
///
/// The handle is cheap; the audio is only opened and decoded by [`AudioSample::record`].
#[derive(Debug, Clone)]
pub struct AudioSample {
    source: SampleSource,
}

impl AudioSample {
    pub fn from_path(path: impl Into<PathBuf>) -> Self {
        Self {
            source: SampleSource::File(path.into()),
        }
    }

    pub fn from_wav_bytes(bytes: Vec<u8>) -> Self {
        Self {
            source: SampleSource::Memory(bytes),
        }
    }

    /// Path of the sample if it lives on disk.
    pub fn path(&self) -> Option<&Path> {
        match &self.source {
            SampleSource::File(path) => Some(path),
            SampleSource::Memory(_) => None,
        }
    }

    /// Short description for logs.
    pub fn describe(&self) -> String {
        match &self.source {
            SampleSource::File(path) => path.display().to_string(),
            SampleSource::Memory(bytes) => format!("<{} bytes in memory>", bytes.len()),
        }
    }

    /// Load the whole sample into memory.
    ///
    /// The file is opened, read to the end and closed before this returns,
    /// whether decoding succeeds or not.
    pub fn record(&self) -> Result<Recording> {
        let decoded = match &self.source {
            SampleSource::File(path) => {
                let file = File::open(path).map_err(|e| VoicebotError::AudioDecode {
                    message: format!("Failed to open {}: {}", path.display(), e),
                })?;
                decode_wav(BufReader::new(file))?
            }
            SampleSource::Memory(bytes) => decode_wav(Cursor::new(bytes.as_slice()))?,
        };

        Ok(Recording {
            samples: decoded.samples,
            source_rate: decoded.source_rate,
            source_channels: decoded.source_channels,
        })
    }
}

/// In-memory recording buffer: 16-bit PCM at 16 kHz mono.
#[derive(Debug, Clone, PartialEq)]
pub struct Recording {
    samples: Vec<i16>,
    source_rate: u32,
    source_channels: u16,
}

impl Recording {
    /// Wrap samples that are already 16 kHz mono.
    pub fn from_samples(samples: Vec<i16>) -> Self {
        Self {
            samples,
            source_rate: SAMPLE_RATE,
            source_channels: 1,
        }
    }

    pub fn samples(&self) -> &[i16] {
        &self.samples
    }

    pub fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    pub fn source_rate(&self) -> u32 {
        self.source_rate
    }

    pub fn source_channels(&self) -> u16 {
        self.source_channels
    }

    pub fn duration(&self) -> Duration {
        Duration::from_secs_f64(self.samples.len() as f64 / SAMPLE_RATE as f64)
    }

    /// Normalized RMS energy (0.0 silence, ~0.707 full-scale sine).
    pub fn rms(&self) -> f32 {
        calculate_rms(&self.samples)
    }

    /// True when there is nothing worth sending to a recognizer.
    pub fn is_silent(&self) -> bool {
        self.samples.is_empty() || self.rms() < MIN_SPEECH_ENERGY
    }

    /// Samples as normalized `f32` in `[-1.0, 1.0]`.
    pub fn to_f32(&self) -> Vec<f32> {
        self.samples
            .iter()
            .map(|&sample| sample as f32 / 32768.0)
            .collect()
    }

    /// Raw big-endian 16-bit PCM, the `audio/l16` wire format.
    pub fn to_l16_bytes(&self) -> Vec<u8> {
        self.samples
            .iter()
            .flat_map(|sample| sample.to_be_bytes())
            .collect()
    }
}

/// Root mean square of 16-bit samples, normalized to 0.0..=1.0.
pub fn calculate_rms(samples: &[i16]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }

    let sum_squares: f64 = samples
        .iter()
        .map(|&sample| {
            let normalized = sample as f64 / i16::MAX as f64;
            normalized * normalized
        })
        .sum();

    (sum_squares / samples.len() as f64).sqrt() as f32
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::wav::encode_wav;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn tone(len: usize, amplitude: i16) -> Vec<i16> {
        (0..len)
            .map(|i| if i % 2 == 0 { amplitude } else { -amplitude })
            .collect()
    }

    #[test]
    fn record_from_file() {
        let samples = tone(1600, 8000);
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(&encode_wav(&samples).unwrap()).unwrap();

        let sample = AudioSample::from_path(file.path());
        assert_eq!(sample.path(), Some(file.path()));

        let recording = sample.record().unwrap();
        assert_eq!(recording.samples(), samples.as_slice());
        assert_eq!(recording.sample_rate(), 16000);
        assert_eq!(recording.duration(), Duration::from_millis(100));
    }

    #[test]
    fn record_from_memory() {
        let samples = tone(320, 1000);
        let sample = AudioSample::from_wav_bytes(encode_wav(&samples).unwrap());
        assert!(sample.path().is_none());
        assert!(sample.describe().contains("bytes in memory"));
        assert_eq!(sample.record().unwrap().samples(), samples.as_slice());
    }

    #[test]
    fn record_missing_file_is_decode_error() {
        let sample = AudioSample::from_path("/nonexistent/speech.wav");
        match sample.record() {
            Err(VoicebotError::AudioDecode { message }) => {
                assert!(message.contains("/nonexistent/speech.wav"));
            }
            other => panic!("Expected AudioDecode error, got {:?}", other),
        }
    }

    #[test]
    fn record_can_be_repeated() {
        let sample = AudioSample::from_wav_bytes(encode_wav(&tone(100, 500)).unwrap());
        assert_eq!(sample.record().unwrap(), sample.record().unwrap());
    }

    #[test]
    fn silence_detection() {
        assert!(Recording::from_samples(vec![]).is_silent());
        assert!(Recording::from_samples(vec![0; 1600]).is_silent());
        assert!(!Recording::from_samples(tone(1600, 8000)).is_silent());
    }

    #[test]
    fn rms_of_full_scale_square_wave_is_one() {
        let rms = calculate_rms(&tone(100, i16::MAX));
        assert!((rms - 1.0).abs() < 1e-6);
    }

    #[test]
    fn l16_bytes_are_big_endian() {
        let recording = Recording::from_samples(vec![0x0102, -2]);
        assert_eq!(recording.to_l16_bytes(), vec![0x01, 0x02, 0xFF, 0xFE]);
    }

    #[test]
    fn to_f32_normalizes() {
        let converted = Recording::from_samples(vec![0, 16384, -32768]).to_f32();
        assert_eq!(converted[0], 0.0);
        assert!((converted[1] - 0.5).abs() < 0.01);
        assert_eq!(converted[2], -1.0);
    }
}
