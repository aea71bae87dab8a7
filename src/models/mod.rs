//! Whisper model management.

pub mod catalog;
#[cfg(feature = "model-download")]
pub mod download;

pub use catalog::{ModelInfo, get_model, list_models};
