//! Container formats produced by speech synthesizers.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Audio container format, identified from the leading bytes of a buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioFormat {
    Wav,
    #[serde(alias = "mp3")]
    Mpeg,
    Ogg,
    Flac,
}

impl AudioFormat {
    /// MIME type used in data URIs and `<source type>`.
    pub fn mime_type(self) -> &'static str {
        match self {
            AudioFormat::Wav => "audio/wav",
            AudioFormat::Mpeg => "audio/mpeg",
            AudioFormat::Ogg => "audio/ogg",
            AudioFormat::Flac => "audio/flac",
        }
    }

    pub fn extension(self) -> &'static str {
        match self {
            AudioFormat::Wav => "wav",
            AudioFormat::Mpeg => "mp3",
            AudioFormat::Ogg => "ogg",
            AudioFormat::Flac => "flac",
        }
    }

    /// Identify the container from magic bytes.
    ///
    /// Returns `None` when the buffer matches none of the known formats.
    pub fn sniff(bytes: &[u8]) -> Option<Self> {
        if bytes.len() >= 12 && &bytes[0..4] == b"RIFF" && &bytes[8..12] == b"WAVE" {
            return Some(AudioFormat::Wav);
        }
        if bytes.starts_with(b"OggS") {
            return Some(AudioFormat::Ogg);
        }
        if bytes.starts_with(b"fLaC") {
            return Some(AudioFormat::Flac);
        }
        if bytes.starts_with(b"ID3") {
            return Some(AudioFormat::Mpeg);
        }
        // MPEG audio frame sync: 11 set bits
        if bytes.len() >= 2 && bytes[0] == 0xFF && (bytes[1] & 0xE0) == 0xE0 {
            return Some(AudioFormat::Mpeg);
        }
        None
    }
}

impl fmt::Display for AudioFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}
