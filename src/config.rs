use crate::audio::AudioFormat;
use crate::defaults;
use crate::error::{Result, VoicebotError};
use crate::generate::GenerationConfig;
use crate::language::Language;
use crate::pipeline::StageTimeouts;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    pub conversation: ConversationConfig,
    pub recognizer: RecognizerConfig,
    pub translator: TranslatorConfig,
    pub generator: GeneratorConfig,
    pub generation: GenerationConfig,
    pub synthesizer: SynthesizerConfig,
    pub playback: PlaybackConfig,
    pub timeouts: TimeoutsConfig,
}

/// Languages of the conversation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct ConversationConfig {
    /// Language the user speaks and hears
    pub language: Language,
    /// Language the generator works in
    pub pivot_language: Language,
}

/// Speech recognition configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct RecognizerConfig {
    pub backend: RecognizerBackend,
    /// Override for the Google speech endpoint
    pub endpoint: Option<String>,
    pub api_key: Option<String>,
    /// Whisper model name from the catalog (whisper backend only)
    pub whisper_model: String,
    /// Whisper inference threads (None = whisper.cpp default)
    pub threads: Option<usize>,
}

/// Recognition backend selection
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecognizerBackend {
    #[default]
    Google,
    Whisper,
}

impl FromStr for RecognizerBackend {
    type Err = VoicebotError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "google" => Ok(RecognizerBackend::Google),
            "whisper" => Ok(RecognizerBackend::Whisper),
            other => Err(VoicebotError::ConfigInvalidValue {
                key: "recognizer.backend".to_string(),
                message: format!("unknown backend '{other}' (expected google or whisper)"),
            }),
        }
    }
}

impl fmt::Display for RecognizerBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RecognizerBackend::Google => f.write_str("google"),
            RecognizerBackend::Whisper => f.write_str("whisper"),
        }
    }
}

/// Translation backend configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct TranslatorConfig {
    pub endpoint: Option<String>,
}

/// Which generator model to load
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct GeneratorConfig {
    pub model: String,
}

/// Speech synthesis configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct SynthesizerConfig {
    /// Full endpoint URL; overrides `tld`
    pub endpoint: Option<String>,
    /// Top-level domain of the TTS host
    pub tld: String,
    pub slow: bool,
}

/// Playback markup configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
#[serde(default, deny_unknown_fields)]
pub struct PlaybackConfig {
    /// MIME label override; unset follows the synthesized format
    pub format: Option<AudioFormat>,
}

/// Per-stage timeouts in humantime syntax ("30s", "2m"); "off" disables one
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default, deny_unknown_fields)]
pub struct TimeoutsConfig {
    pub recognition: String,
    pub translation: String,
    pub generation: String,
    pub synthesis: String,
}

impl Default for ConversationConfig {
    fn default() -> Self {
        Self {
            language: Language::default(),
            pivot_language: Language::pivot(),
        }
    }
}

impl Default for RecognizerConfig {
    fn default() -> Self {
        Self {
            backend: RecognizerBackend::Google,
            endpoint: None,
            api_key: None,
            whisper_model: defaults::DEFAULT_WHISPER_MODEL.to_string(),
            threads: None,
        }
    }
}

impl Default for GeneratorConfig {
    fn default() -> Self {
        Self {
            model: defaults::DEFAULT_GENERATOR_MODEL.to_string(),
        }
    }
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            tld: defaults::GOOGLE_TTS_TLD.to_string(),
            slow: false,
        }
    }
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        let network = format!("{}s", defaults::NETWORK_TIMEOUT_SECS);
        Self {
            recognition: network.clone(),
            translation: network.clone(),
            generation: format!("{}s", defaults::GENERATION_TIMEOUT_SECS),
            synthesis: network,
        }
    }
}

impl TimeoutsConfig {
    /// Parse into per-stage limits.
    pub fn to_stage_timeouts(&self) -> Result<StageTimeouts> {
        Ok(StageTimeouts {
            recognition: parse_timeout("timeouts.recognition", &self.recognition)?,
            translation: parse_timeout("timeouts.translation", &self.translation)?,
            generation: parse_timeout("timeouts.generation", &self.generation)?,
            synthesis: parse_timeout("timeouts.synthesis", &self.synthesis)?,
        })
    }
}

fn parse_timeout(key: &str, value: &str) -> Result<Option<Duration>> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("off") || value.eq_ignore_ascii_case("none") {
        return Ok(None);
    }
    let duration = humantime::parse_duration(value).map_err(|e| VoicebotError::ConfigInvalidValue {
        key: key.to_string(),
        message: format!("'{value}': {e}"),
    })?;
    if duration.is_zero() {
        return Err(VoicebotError::ConfigInvalidValue {
            key: key.to_string(),
            message: "must be greater than zero (use \"off\" to disable)".to_string(),
        });
    }
    Ok(Some(duration))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// Missing fields use default values; unknown tables and keys are rejected.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                VoicebotError::ConfigFileNotFound {
                    path: path.display().to_string(),
                }
            } else {
                VoicebotError::Io(e)
            }
        })?;
        let config: Config = toml::from_str(&contents)?;
        Ok(config)
    }

    /// Load configuration from a file or return defaults if file doesn't exist
    ///
    /// Invalid TOML is still an error.
    pub fn load_or_default(path: &Path) -> Result<Self> {
        match Self::load(path) {
            Err(VoicebotError::ConfigFileNotFound { .. }) => Ok(Self::default()),
            other => other,
        }
    }

    /// Apply environment variable overrides
    ///
    /// Supported environment variables:
    /// - VOICEBOT_LANGUAGE → conversation.language
    /// - VOICEBOT_MAX_LENGTH → generation.max_length
    /// - VOICEBOT_RECOGNIZER → recognizer.backend
    /// - VOICEBOT_GENERATOR_MODEL → generator.model
    pub fn with_env_overrides(mut self) -> Result<Self> {
        if let Ok(language) = std::env::var("VOICEBOT_LANGUAGE")
            && !language.is_empty()
        {
            self.conversation.language = Language::parse(&language)?;
        }

        if let Ok(max_length) = std::env::var("VOICEBOT_MAX_LENGTH")
            && !max_length.is_empty()
        {
            self.generation.max_length =
                max_length
                    .trim()
                    .parse()
                    .map_err(|e| VoicebotError::ConfigInvalidValue {
                        key: "VOICEBOT_MAX_LENGTH".to_string(),
                        message: format!("'{max_length}': {e}"),
                    })?;
        }

        if let Ok(backend) = std::env::var("VOICEBOT_RECOGNIZER")
            && !backend.is_empty()
        {
            self.recognizer.backend = backend.parse()?;
        }

        if let Ok(model) = std::env::var("VOICEBOT_GENERATOR_MODEL")
            && !model.is_empty()
        {
            self.generator.model = model;
        }

        Ok(self)
    }

    /// Check cross-field constraints serde cannot express.
    pub fn validate(&self) -> Result<()> {
        self.generation.validate()?;
        self.timeouts.to_stage_timeouts()?;

        let pivot = &self.conversation.pivot_language;
        if !pivot.same_language(&Language::pivot()) {
            return Err(VoicebotError::ConfigInvalidValue {
                key: "conversation.pivot_language".to_string(),
                message: format!("generator models only speak en, got '{pivot}'"),
            });
        }

        if crate::generate::get_generator_model(&self.generator.model).is_none() {
            return Err(VoicebotError::ConfigInvalidValue {
                key: "generator.model".to_string(),
                message: format!("unknown model '{}'", self.generator.model),
            });
        }

        if self.recognizer.backend == RecognizerBackend::Whisper {
            let name = &self.recognizer.whisper_model;
            let model = crate::models::get_model(name).ok_or_else(|| {
                VoicebotError::ConfigInvalidValue {
                    key: "recognizer.whisper_model".to_string(),
                    message: format!("unknown model '{name}'"),
                }
            })?;
            let language = self.conversation.language.primary();
            if !model.supports_language(language) {
                return Err(VoicebotError::ConfigInvalidValue {
                    key: "recognizer.whisper_model".to_string(),
                    message: format!("'{name}' is English-only but the conversation language is {language}"),
                });
            }
        }

        if self.recognizer.threads == Some(0) {
            return Err(VoicebotError::ConfigInvalidValue {
                key: "recognizer.threads".to_string(),
                message: "must be at least 1".to_string(),
            });
        }

        let tld = &self.synthesizer.tld;
        if tld.is_empty()
            || !tld
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '.')
        {
            return Err(VoicebotError::ConfigInvalidValue {
                key: "synthesizer.tld".to_string(),
                message: format!("'{tld}' is not a domain suffix"),
            });
        }

        Ok(())
    }

    /// Render as TOML, for `config show`.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(|e| VoicebotError::Other(format!("Failed to render config: {e}")))
    }

    /// Get the default configuration file path
    ///
    /// Returns ~/.config/voicebot/config.toml on Linux
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("voicebot")
            .join("config.toml")
    }
}
