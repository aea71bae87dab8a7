//! voicebot - Multilingual voice chatbot
//!
//! One turn: recognize speech, translate to the pivot language, generate a
//! reply, translate it back, synthesize it and wrap it in playback markup.

#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::let_underscore_must_use)]

pub mod audio;
#[cfg(feature = "cli")]
pub mod cli;
pub mod config;
pub mod defaults;
pub mod error;
pub mod generate;
pub mod language;
pub mod models;
pub mod pipeline;
pub mod playback;
pub mod stt;
pub mod translate;
pub mod tts;

// Composition root - needs the CLI presentation and model downloads
#[cfg(all(feature = "model-download", feature = "cli"))]
pub mod app;

// Stage traits
pub use generate::ResponseGenerator;
pub use stt::Recognizer;
pub use translate::Translator;
pub use tts::SpeechSynthesizer;

// Pipeline
pub use pipeline::{Pipeline, PipelineConfig, TurnOutcome};

// Error handling
pub use error::{Result, VoicebotError};

pub use audio::{AudioFormat, AudioSample};
pub use config::Config;
pub use generate::GenerationConfig;
pub use language::Language;
pub use playback::encode_for_playback;

/// Build version string with optional git commit hash.
///
/// Returns `"0.1.0+abc1234"` when git hash is available, `"0.1.0"` otherwise.
pub fn version_string() -> String {
    let version = env!("CARGO_PKG_VERSION");
    match option_env!("GIT_HASH") {
        Some(hash) if !hash.is_empty() => format!("{}+{}", version, hash),
        _ => version.to_string(),
    }
}
