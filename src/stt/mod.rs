//! Speech recognition stage.

pub mod google;
pub mod recognizer;
pub mod whisper;

pub use google::GoogleSpeechRecognizer;
pub use recognizer::{MockRecognizer, Recognizer, load_recording};
pub use whisper::{WhisperConfig, WhisperRecognizer};
