use crate::audio::AudioFormat;
use crate::audio::wav::encode_wav;
use crate::error::{Result, VoicebotError};
use crate::language::Language;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Languages the Google TTS voice set covers.
pub const SPEECH_LANGUAGES: &[&str] = &[
    "af", "ar", "bg", "bn", "bs", "ca", "cs", "cy", "da", "de", "el", "en", "eo", "es", "et",
    "fi", "fr", "gu", "hi", "hr", "hu", "hy", "id", "is", "it", "iw", "he", "ja", "jw", "km",
    "kn", "ko", "la", "lv", "mk", "ml", "mr", "ms", "my", "ne", "nl", "no", "pl", "pt", "ro",
    "ru", "si", "sk", "sq", "sr", "su", "sv", "sw", "ta", "te", "th", "tl", "tr", "uk", "ur",
    "vi", "zh", "zh-CN", "zh-TW",
];

/// Whether a voice exists for `language` (exact code or its primary subtag).
pub fn is_speech_language(language: &Language) -> bool {
    SPEECH_LANGUAGES.contains(&language.as_str()) || SPEECH_LANGUAGES.contains(&language.primary())
}

/// A complete synthesized waveform and the container it is in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SynthesizedAudio {
    pub bytes: Vec<u8>,
    pub format: AudioFormat,
}

impl SynthesizedAudio {
    /// Wrap bytes, identifying the format from their magic bytes.
    ///
    /// # Errors
    /// Returns `VoicebotError::SynthesisFailure` for empty or unrecognized data.
    pub fn from_bytes(bytes: Vec<u8>) -> Result<Self> {
        if bytes.is_empty() {
            return Err(VoicebotError::synthesis("Synthesizer returned no audio"));
        }
        let format = AudioFormat::sniff(&bytes).ok_or_else(|| {
            VoicebotError::synthesis(format!(
                "Synthesizer returned unrecognized data ({} bytes)",
                bytes.len()
            ))
        })?;
        Ok(Self { bytes, format })
    }
}

/// Trait for text-to-speech synthesis.
#[async_trait]
pub trait SpeechSynthesizer: Send + Sync {
    /// Synthesize `text` spoken in `language` into one complete waveform.
    ///
    /// # Errors
    /// Returns `VoicebotError::SynthesisFailure` on empty text, an
    /// unsupported language, or a backend failure.
    async fn synthesize(&self, text: &str, language: &Language) -> Result<SynthesizedAudio>;

    /// Backend name for logs.
    fn name(&self) -> &str;
}

#[async_trait]
impl<T: SpeechSynthesizer + ?Sized> SpeechSynthesizer for Arc<T> {
    async fn synthesize(&self, text: &str, language: &Language) -> Result<SynthesizedAudio> {
        (**self).synthesize(text, language).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Input checks shared by all synthesizers.
pub fn check_synthesis_input(text: &str, language: &Language) -> Result<()> {
    if text.trim().is_empty() {
        return Err(VoicebotError::synthesis("No text to speak"));
    }
    if !is_speech_language(language) {
        return Err(VoicebotError::synthesis(format!(
            "Unsupported language: {language}"
        )));
    }
    Ok(())
}

/// Mock synthesizer for testing. Produces a short silent WAV by default.
#[derive(Debug, Default)]
pub struct MockSynthesizer {
    bytes: Option<Vec<u8>>,
    should_fail: bool,
    calls: AtomicUsize,
}

impl MockSynthesizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return these bytes instead of the default WAV.
    pub fn with_bytes(mut self, bytes: Vec<u8>) -> Self {
        self.bytes = Some(bytes);
        self
    }

    /// Configure the mock to fail on synthesize
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl SpeechSynthesizer for MockSynthesizer {
    async fn synthesize(&self, text: &str, language: &Language) -> Result<SynthesizedAudio> {
        check_synthesis_input(text, language)?;
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            return Err(VoicebotError::synthesis("mock synthesis failure"));
        }
        let bytes = match &self.bytes {
            Some(bytes) => bytes.clone(),
            None => encode_wav(&[0i16; 160]).map_err(|e| VoicebotError::synthesis(e.to_string()))?,
        };
        SynthesizedAudio::from_bytes(bytes)
    }

    fn name(&self) -> &str {
        "mock"
    }
}
