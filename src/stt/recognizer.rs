use crate::audio::{AudioSample, Recording};
use crate::error::{Result, VoicebotError};
use crate::language::Language;
use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

/// Trait for speech-to-text recognition.
///
/// This trait allows swapping backends (Google web speech, local Whisper, mock).
/// Implementations are stateless per call and safe to share between turns.
#[async_trait]
pub trait Recognizer: Send + Sync {
    /// Recognize the speech in `sample`, biased towards `language`.
    ///
    /// # Errors
    /// Returns `VoicebotError::RecognitionFailure` when the audio cannot be
    /// decoded, contains no speech, or the backend fails.
    async fn recognize(&self, sample: &AudioSample, language: &Language) -> Result<String>;

    /// Backend name for logs.
    fn name(&self) -> &str;
}

/// Implement Recognizer for Arc<T> to allow sharing across turns.
#[async_trait]
impl<T: Recognizer + ?Sized> Recognizer for Arc<T> {
    async fn recognize(&self, sample: &AudioSample, language: &Language) -> Result<String> {
        (**self).recognize(sample, language).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Read a sample into a recording buffer off the async runtime.
///
/// Decode errors and silent recordings become `RecognitionFailure`.
pub async fn load_recording(sample: &AudioSample) -> Result<Recording> {
    let sample = sample.clone();
    let recording = tokio::task::spawn_blocking(move || sample.record())
        .await
        .map_err(|e| VoicebotError::recognition(format!("Audio loading task failed: {e}")))?
        .map_err(|e| VoicebotError::recognition(e.to_string()))?;

    if recording.is_silent() {
        return Err(VoicebotError::recognition(format!(
            "No speech detected ({:.1}s of silence)",
            recording.duration().as_secs_f32()
        )));
    }

    Ok(recording)
}

/// Mock recognizer for testing
#[derive(Debug, Default)]
pub struct MockRecognizer {
    response: String,
    should_fail: bool,
    calls: AtomicUsize,
    last_language: Mutex<Option<Language>>,
}

impl MockRecognizer {
    pub fn new() -> Self {
        Self {
            response: "mock transcript".to_string(),
            ..Default::default()
        }
    }

    /// Configure the mock to return a specific transcript
    pub fn with_response(mut self, response: &str) -> Self {
        self.response = response.to_string();
        self
    }

    /// Configure the mock to fail on recognize
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Number of recognize calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Language passed to the most recent call.
    pub fn last_language(&self) -> Option<Language> {
        self.last_language.lock().ok().and_then(|guard| guard.clone())
    }
}

#[async_trait]
impl Recognizer for MockRecognizer {
    async fn recognize(&self, _sample: &AudioSample, language: &Language) -> Result<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last_language.lock() {
            *last = Some(language.clone());
        }
        if self.should_fail {
            Err(VoicebotError::recognition("mock recognition failure"))
        } else {
            Ok(self.response.clone())
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}
