//! Generation options for the response generator.
//!
//! Only the options listed here are accepted; a misspelled key in the
//! `[generation]` table is a configuration error rather than silently ignored.

use crate::defaults;
use crate::error::{Result, VoicebotError};
use serde::{Deserialize, Serialize};

/// Decoding options, fixed when the generator is constructed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct GenerationConfig {
    /// Upper bound on generated tokens per response.
    pub max_length: usize,
    /// Longest accepted input, in tokens.
    pub max_input_tokens: usize,
    /// Sample from the distribution instead of greedy argmax.
    pub do_sample: bool,
    /// Softmax temperature when sampling.
    pub temperature: f64,
    /// Keep only the k most likely tokens when sampling.
    pub top_k: Option<usize>,
    /// Nucleus sampling threshold.
    pub top_p: Option<f64>,
    /// Penalty applied to tokens already generated (1.0 = off).
    pub repetition_penalty: f32,
    /// Fixed RNG seed for reproducible sampling.
    pub seed: Option<u64>,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            max_length: defaults::MAX_LENGTH,
            max_input_tokens: defaults::MAX_INPUT_TOKENS,
            do_sample: false,
            temperature: 1.0,
            top_k: None,
            top_p: None,
            repetition_penalty: 1.0,
            seed: None,
        }
    }
}

impl GenerationConfig {
    /// Default options with a different length cap.
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            max_length,
            ..Self::default()
        }
    }

    /// Check every option against its allowed range.
    pub fn validate(&self) -> Result<()> {
        let invalid = |key: &str, message: String| {
            Err(VoicebotError::ConfigInvalidValue {
                key: format!("generation.{key}"),
                message,
            })
        };

        if self.max_length == 0 {
            return invalid("max_length", "must be at least 1".to_string());
        }
        if self.max_input_tokens == 0 {
            return invalid("max_input_tokens", "must be at least 1".to_string());
        }
        if !self.temperature.is_finite() || self.temperature <= 0.0 {
            return invalid(
                "temperature",
                format!("must be a positive number, got {}", self.temperature),
            );
        }
        if self.top_k == Some(0) {
            return invalid("top_k", "must be at least 1".to_string());
        }
        if let Some(p) = self.top_p
            && !(p > 0.0 && p <= 1.0)
        {
            return invalid("top_p", format!("must be in (0, 1], got {p}"));
        }
        if !self.repetition_penalty.is_finite() || self.repetition_penalty <= 0.0 {
            return invalid(
                "repetition_penalty",
                format!("must be a positive number, got {}", self.repetition_penalty),
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid_and_greedy() {
        let config = GenerationConfig::default();
        assert_eq!(config.max_length, 100);
        assert_eq!(config.max_input_tokens, 512);
        assert!(!config.do_sample);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn with_max_length_keeps_other_defaults() {
        let config = GenerationConfig::with_max_length(20);
        assert_eq!(config.max_length, 20);
        assert_eq!(config.temperature, 1.0);
    }

    #[test]
    fn validate_rejects_out_of_range_values() {
        let cases = [
            (
                GenerationConfig {
                    max_length: 0,
                    ..Default::default()
                },
                "generation.max_length",
            ),
            (
                GenerationConfig {
                    max_input_tokens: 0,
                    ..Default::default()
                },
                "generation.max_input_tokens",
            ),
            (
                GenerationConfig {
                    temperature: 0.0,
                    ..Default::default()
                },
                "generation.temperature",
            ),
            (
                GenerationConfig {
                    temperature: f64::NAN,
                    ..Default::default()
                },
                "generation.temperature",
            ),
            (
                GenerationConfig {
                    top_k: Some(0),
                    ..Default::default()
                },
                "generation.top_k",
            ),
            (
                GenerationConfig {
                    top_p: Some(1.5),
                    ..Default::default()
                },
                "generation.top_p",
            ),
            (
                GenerationConfig {
                    repetition_penalty: -1.0,
                    ..Default::default()
                },
                "generation.repetition_penalty",
            ),
        ];

        for (config, expected_key) in cases {
            match config.validate() {
                Err(VoicebotError::ConfigInvalidValue { key, .. }) => {
                    assert_eq!(key, expected_key);
                }
                other => panic!("Expected {expected_key} to be rejected, got {:?}", other),
            }
        }
    }

    #[test]
    fn parses_partial_table() {
        let config: GenerationConfig = toml::from_str(
            r#"
            max_length = 40
            do_sample = true
            top_p = 0.9
            "#,
        )
        .unwrap();
        assert_eq!(config.max_length, 40);
        assert!(config.do_sample);
        assert_eq!(config.top_p, Some(0.9));
        assert_eq!(config.max_input_tokens, 512);
    }

    #[test]
    fn rejects_unknown_option() {
        let result = toml::from_str::<GenerationConfig>("max_lenght = 40");
        let message = result.unwrap_err().to_string();
        assert!(message.contains("max_lenght"), "got: {message}");
    }
}
