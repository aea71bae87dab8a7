//! Whisper-based speech recognition.
//!
//! Local alternative to the Google backend, using whisper-rs.
//!
//! # Feature Gate
//!
//! Real inference requires the `whisper` feature (and cmake to build it):
//!
//! ```bash
//! cargo build --features whisper
//! ```

use crate::audio::AudioSample;
use crate::error::{Result, VoicebotError};
use crate::language::Language;
use crate::stt::recognizer::Recognizer;
#[cfg(feature = "whisper")]
use crate::stt::recognizer::load_recording;
use async_trait::async_trait;
use std::path::PathBuf;

#[cfg(feature = "whisper")]
use std::sync::{Arc, Mutex, Once};
#[cfg(feature = "whisper")]
use whisper_rs::{
    FullParams, SamplingStrategy, WhisperContext, WhisperContextParameters, install_logging_hooks,
};

#[cfg(feature = "whisper")]
static LOGGING_HOOKS_INSTALLED: Once = Once::new();

/// Configuration for the Whisper recognizer.
#[derive(Debug, Clone)]
pub struct WhisperConfig {
    /// Path to the ggml model file
    pub model_path: PathBuf,
    /// Number of threads for inference (None = whisper.cpp default)
    pub threads: Option<usize>,
}

impl Default for WhisperConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("models/ggml-base.bin"),
            threads: None,
        }
    }
}

fn model_name_from_path(path: &std::path::Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("unknown")
        .to_string()
}

#[cfg(feature = "whisper")]
struct WhisperInner {
    context: Mutex<WhisperContext>,
    threads: Option<usize>,
}

/// Whisper-based recognizer.
///
/// The WhisperContext sits behind a Mutex; inference runs on the blocking pool.
#[cfg(feature = "whisper")]
pub struct WhisperRecognizer {
    inner: Arc<WhisperInner>,
    config: WhisperConfig,
    model_name: String,
}

#[cfg(feature = "whisper")]
impl std::fmt::Debug for WhisperRecognizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WhisperRecognizer")
            .field("config", &self.config)
            .field("model_name", &self.model_name)
            .field("context", &"<WhisperContext>")
            .finish()
    }
}

/// Whisper recognizer placeholder (without whisper feature).
///
/// Construction only checks the model file; recognition always fails.
#[cfg(not(feature = "whisper"))]
#[derive(Debug)]
pub struct WhisperRecognizer {
    config: WhisperConfig,
    model_name: String,
}

#[cfg(feature = "whisper")]
impl WhisperRecognizer {
    /// Load a Whisper model.
    ///
    /// # Errors
    /// Returns `VoicebotError::ModelNotFound` if the model file doesn't exist,
    /// `VoicebotError::RecognitionFailure` if loading fails.
    pub fn new(config: WhisperConfig) -> Result<Self> {
        // Silence whisper.cpp's own stderr logging (only once)
        LOGGING_HOOKS_INSTALLED.call_once(|| {
            install_logging_hooks();
        });

        if !config.model_path.exists() {
            return Err(VoicebotError::ModelNotFound {
                name: config.model_path.to_string_lossy().to_string(),
            });
        }

        let model_name = model_name_from_path(&config.model_path);

        let context = WhisperContext::new_with_params(
            config
                .model_path
                .to_str()
                .ok_or_else(|| VoicebotError::recognition("Invalid UTF-8 in model path"))?,
            WhisperContextParameters::default(),
        )
        .map_err(|e| VoicebotError::recognition(format!("Failed to load Whisper model: {}", e)))?;

        Ok(Self {
            inner: Arc::new(WhisperInner {
                context: Mutex::new(context),
                threads: config.threads,
            }),
            config,
            model_name,
        })
    }

    pub fn config(&self) -> &WhisperConfig {
        &self.config
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(feature = "whisper")]
impl WhisperInner {
    fn transcribe(&self, audio: &[f32], language: &str) -> Result<String> {
        let context = self
            .context
            .lock()
            .map_err(|e| VoicebotError::recognition(format!("Failed to acquire context lock: {}", e)))?;

        let mut state = context
            .create_state()
            .map_err(|e| VoicebotError::recognition(format!("Failed to create Whisper state: {}", e)))?;

        let mut params = FullParams::new(SamplingStrategy::Greedy { best_of: 1 });
        params.set_language(Some(language));
        if let Some(threads) = self.threads {
            params.set_n_threads(threads as i32);
        }
        params.set_print_special(false);
        params.set_print_progress(false);
        params.set_print_realtime(false);
        params.set_print_timestamps(false);

        state
            .full(params, audio)
            .map_err(|e| VoicebotError::recognition(format!("Whisper inference failed: {}", e)))?;

        let mut transcription = String::new();
        for segment in state.as_iter() {
            transcription.push_str(&segment.to_string());
        }

        Ok(transcription.trim().to_string())
    }
}

#[cfg(not(feature = "whisper"))]
impl WhisperRecognizer {
    /// Create a Whisper recognizer (stub implementation).
    pub fn new(config: WhisperConfig) -> Result<Self> {
        if !config.model_path.exists() {
            return Err(VoicebotError::ModelNotFound {
                name: config.model_path.to_string_lossy().to_string(),
            });
        }

        let model_name = model_name_from_path(&config.model_path);
        Ok(Self { config, model_name })
    }

    pub fn config(&self) -> &WhisperConfig {
        &self.config
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }
}

#[cfg(feature = "whisper")]
#[async_trait]
impl Recognizer for WhisperRecognizer {
    async fn recognize(&self, sample: &AudioSample, language: &Language) -> Result<String> {
        let audio = load_recording(sample).await?.to_f32();
        let inner = Arc::clone(&self.inner);
        let language = language.primary().to_string();

        let text = tokio::task::spawn_blocking(move || inner.transcribe(&audio, &language))
            .await
            .map_err(|e| VoicebotError::recognition(format!("Whisper task failed: {e}")))??;

        if text.is_empty() {
            return Err(VoicebotError::recognition("Whisper produced no transcript"));
        }
        Ok(text)
    }

    fn name(&self) -> &str {
        "whisper"
    }
}

#[cfg(not(feature = "whisper"))]
#[async_trait]
impl Recognizer for WhisperRecognizer {
    async fn recognize(&self, _sample: &AudioSample, _language: &Language) -> Result<String> {
        Err(VoicebotError::recognition(concat!(
            "Whisper feature not enabled. This binary was built without local speech recognition.\n",
            "To fix: cargo build --release --features whisper (needs cmake)"
        )))
    }

    fn name(&self) -> &str {
        "whisper"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_whisper_config_default() {
        let config = WhisperConfig::default();
        assert_eq!(config.model_path, PathBuf::from("models/ggml-base.bin"));
        assert_eq!(config.threads, None);
    }

    #[test]
    fn test_whisper_recognizer_new_fails_for_missing_model() {
        let config = WhisperConfig {
            model_path: PathBuf::from("/nonexistent/model.bin"),
            threads: None,
        };

        match WhisperRecognizer::new(config) {
            Err(VoicebotError::ModelNotFound { name }) => {
                assert_eq!(name, "/nonexistent/model.bin");
            }
            _ => panic!("Expected ModelNotFound error"),
        }
    }

    #[test]
    fn test_model_name_from_path() {
        assert_eq!(
            model_name_from_path(std::path::Path::new("/models/ggml-base.bin")),
            "ggml-base"
        );
    }

    #[cfg(not(feature = "whisper"))]
    #[tokio::test]
    async fn test_stub_recognizer_fails_with_hint() {
        let dir = tempfile::tempdir().unwrap();
        let model_path = dir.path().join("ggml-base.bin");
        std::fs::write(&model_path, b"fake model data").unwrap();

        let recognizer = WhisperRecognizer::new(WhisperConfig {
            model_path,
            threads: None,
        })
        .unwrap();
        assert_eq!(recognizer.model_name(), "ggml-base");

        let sample = AudioSample::from_wav_bytes(Vec::new());
        let result = recognizer.recognize(&sample, &Language::default()).await;
        match result {
            Err(VoicebotError::RecognitionFailure { message }) => {
                assert!(message.contains("--features whisper"));
            }
            other => panic!("Expected RecognitionFailure, got {:?}", other),
        }
    }
}
