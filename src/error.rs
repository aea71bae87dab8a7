//! Error types for voicebot.

use thiserror::Error;

#[derive(Error, Debug)]
pub enum VoicebotError {
    // Configuration errors
    #[error("Configuration file not found at {path}")]
    ConfigFileNotFound { path: String },

    #[error("Failed to parse configuration: {message}")]
    ConfigParse { message: String },

    #[error("Invalid configuration value for {key}: {message}")]
    ConfigInvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Config(#[from] toml::de::Error),

    // Audio input errors
    #[error("Failed to decode audio: {message}")]
    AudioDecode { message: String },

    // Pipeline stage failures, one per stage
    #[error("Speech recognition failed: {message}")]
    RecognitionFailure { message: String },

    #[error("Translation failed: {message}")]
    TranslationFailure { message: String },

    #[error("Response generation failed: {message}")]
    GenerationFailure { message: String },

    #[error("Speech synthesis failed: {message}")]
    SynthesisFailure { message: String },

    // Model management errors
    #[error("Model not found: {name}")]
    ModelNotFound { name: String },

    #[error("Model download failed: {message}")]
    ModelDownload { message: String },

    // General I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

impl VoicebotError {
    pub fn recognition(message: impl Into<String>) -> Self {
        Self::RecognitionFailure {
            message: message.into(),
        }
    }

    pub fn translation(message: impl Into<String>) -> Self {
        Self::TranslationFailure {
            message: message.into(),
        }
    }

    pub fn generation(message: impl Into<String>) -> Self {
        Self::GenerationFailure {
            message: message.into(),
        }
    }

    pub fn synthesis(message: impl Into<String>) -> Self {
        Self::SynthesisFailure {
            message: message.into(),
        }
    }

    /// True for the four per-stage failures a turn can abort with.
    pub fn is_stage_failure(&self) -> bool {
        matches!(
            self,
            Self::RecognitionFailure { .. }
                | Self::TranslationFailure { .. }
                | Self::GenerationFailure { .. }
                | Self::SynthesisFailure { .. }
        )
    }
}

pub type Result<T> = std::result::Result<T, VoicebotError>;

#[cfg(test)]
mod tests {
    use super::*;
    use std::io;

    #[test]
    fn test_config_file_not_found_display() {
        let error = VoicebotError::ConfigFileNotFound {
            path: "/path/to/config.toml".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Configuration file not found at /path/to/config.toml"
        );
    }

    #[test]
    fn test_config_invalid_value_display() {
        let error = VoicebotError::ConfigInvalidValue {
            key: "generator.max_length".to_string(),
            message: "must be positive".to_string(),
        };
        assert_eq!(
            error.to_string(),
            "Invalid configuration value for generator.max_length: must be positive"
        );
    }

    #[test]
    fn test_stage_failure_display() {
        assert_eq!(
            VoicebotError::recognition("no speech detected").to_string(),
            "Speech recognition failed: no speech detected"
        );
        assert_eq!(
            VoicebotError::translation("empty input").to_string(),
            "Translation failed: empty input"
        );
        assert_eq!(
            VoicebotError::generation("input too long").to_string(),
            "Response generation failed: input too long"
        );
        assert_eq!(
            VoicebotError::synthesis("unsupported language: xx").to_string(),
            "Speech synthesis failed: unsupported language: xx"
        );
    }

    #[test]
    fn test_is_stage_failure() {
        assert!(VoicebotError::recognition("x").is_stage_failure());
        assert!(VoicebotError::translation("x").is_stage_failure());
        assert!(VoicebotError::generation("x").is_stage_failure());
        assert!(VoicebotError::synthesis("x").is_stage_failure());
        assert!(!VoicebotError::Other("x".to_string()).is_stage_failure());
        assert!(
            !VoicebotError::AudioDecode {
                message: "x".to_string()
            }
            .is_stage_failure()
        );
    }

    #[test]
    fn test_from_io_error() {
        let io_error = io::Error::new(io::ErrorKind::NotFound, "file not found");
        let error: VoicebotError = io_error.into();
        assert!(error.to_string().contains("file not found"));
    }

    #[test]
    fn test_from_toml_error() {
        let toml_error = toml::from_str::<toml::Value>("invalid = toml = syntax").unwrap_err();
        let error: VoicebotError = toml_error.into();
        assert!(error.to_string().contains("Configuration error"));

        let error_trait: &dyn std::error::Error = &error;
        assert!(error_trait.source().is_some());
    }

    #[test]
    fn test_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<VoicebotError>();
        assert_sync::<VoicebotError>();
    }
}
