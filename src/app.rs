//! Application entry points behind the CLI commands.
//!
//! Builds every stage backend once from the configuration, then runs a turn
//! or a single stage.

use crate::audio::AudioSample;
use crate::config::{Config, RecognizerBackend};
use crate::error::{Result, VoicebotError};
use crate::generate::{CandleT5Generator, ResponseGenerator, get_generator_model};
use crate::language::Language;
use crate::models::download::ensure_model;
use crate::pipeline::{Pipeline, PipelineConfig, TurnOutcome};
use crate::playback::encode_for_playback;
use crate::stt::{GoogleSpeechRecognizer, Recognizer, WhisperConfig, WhisperRecognizer};
use crate::translate::{GoogleTranslator, Translator};
use crate::tts::{GoogleTts, SpeechSynthesizer};
use owo_colors::OwoColorize;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Apply command-line overrides on top of file and environment settings, then validate.
pub fn resolve_config(mut config: Config, language: Option<&str>, max_length: Option<usize>) -> Result<Config> {
    if let Some(language) = language {
        config.conversation.language = Language::parse(language)?;
    }
    if let Some(max_length) = max_length {
        config.generation.max_length = max_length;
    }
    config.validate()?;
    Ok(config)
}

/// Pipeline settings derived from a validated configuration.
pub fn pipeline_config(config: &Config) -> Result<PipelineConfig> {
    Ok(PipelineConfig {
        language: config.conversation.language.clone(),
        pivot_language: config.conversation.pivot_language.clone(),
        playback_format: config.playback.format,
        timeouts: config.timeouts.to_stage_timeouts()?,
    })
}

pub async fn build_recognizer(config: &Config, no_download: bool) -> Result<Arc<dyn Recognizer>> {
    let settings = &config.recognizer;
    match settings.backend {
        RecognizerBackend::Google => Ok(Arc::new(GoogleSpeechRecognizer::new(
            settings.endpoint.as_deref(),
            settings.api_key.as_deref(),
        )?)),
        RecognizerBackend::Whisper => {
            let model_path = ensure_model(&settings.whisper_model, !no_download, true).await?;
            let whisper_config = WhisperConfig {
                model_path,
                threads: settings.threads,
            };
            let recognizer = tokio::task::spawn_blocking(move || WhisperRecognizer::new(whisper_config))
                .await
                .map_err(|e| VoicebotError::Other(format!("Whisper loading task failed: {e}")))??;
            Ok(Arc::new(recognizer))
        }
    }
}

pub fn build_translator(config: &Config) -> Result<Arc<dyn Translator>> {
    Ok(Arc::new(GoogleTranslator::new(
        config.translator.endpoint.as_deref(),
    )?))
}

/// Load the generator model. Slow on first use: weights may be downloaded.
pub async fn build_generator(config: &Config, no_download: bool) -> Result<Arc<dyn ResponseGenerator>> {
    let info = get_generator_model(&config.generator.model).ok_or_else(|| VoicebotError::ModelNotFound {
        name: config.generator.model.clone(),
    })?;
    let generation = config.generation.clone();

    let generator =
        tokio::task::spawn_blocking(move || CandleT5Generator::load(info, generation, !no_download))
            .await
            .map_err(|e| VoicebotError::Other(format!("Generator loading task failed: {e}")))??;
    Ok(Arc::new(generator))
}

pub fn build_synthesizer(config: &Config) -> Result<Arc<dyn SpeechSynthesizer>> {
    let settings = &config.synthesizer;
    let synthesizer = match &settings.endpoint {
        Some(endpoint) => GoogleTts::with_endpoint(endpoint, settings.slow)?,
        None => GoogleTts::new(&settings.tld, settings.slow)?,
    };
    Ok(Arc::new(synthesizer))
}

/// Build the full pipeline. Every backend is constructed exactly once here.
pub async fn build_pipeline(config: &Config, quiet: bool, no_download: bool) -> Result<Pipeline> {
    let pipeline_config = pipeline_config(config)?;

    let recognizer = build_recognizer(config, no_download).await?;
    let translator = build_translator(config)?;
    let synthesizer = build_synthesizer(config)?;

    if !quiet {
        eprintln!("Loading generator '{}'...", config.generator.model);
    }
    let started = Instant::now();
    let generator = build_generator(config, no_download).await?;
    info!(
        model = %config.generator.model,
        elapsed_ms = started.elapsed().as_millis() as u64,
        "generator ready"
    );

    let pipeline = Pipeline::new(recognizer, translator, generator, synthesizer, pipeline_config);
    info!(backends = %pipeline.describe(), language = %config.conversation.language, "pipeline ready");
    Ok(pipeline)
}

/// Run one turn on a WAV file and present the outcome.
pub async fn run_turn_command(
    config: Config,
    audio: PathBuf,
    html_out: Option<PathBuf>,
    json: bool,
    quiet: bool,
    no_download: bool,
) -> Result<()> {
    if !audio.exists() {
        return Err(VoicebotError::Other(format!(
            "Audio file not found: {}",
            audio.display()
        )));
    }

    let pipeline = build_pipeline(&config, quiet, no_download).await?;
    let outcome = pipeline.handle_turn(&AudioSample::from_path(audio)).await?;

    if json {
        let rendered = serde_json::to_string_pretty(&outcome)
            .map_err(|e| VoicebotError::Other(format!("Failed to render outcome: {e}")))?;
        println!("{rendered}");
        return Ok(());
    }

    print_outcome(&outcome, &config);
    match html_out {
        Some(path) => {
            write_file(&path, outcome.markup.as_bytes())?;
            if !quiet {
                eprintln!("Playback markup written to {}", path.display());
            }
        }
        None => println!("{}", outcome.markup),
    }
    Ok(())
}

fn print_outcome(outcome: &TurnOutcome, config: &Config) {
    let language = &config.conversation.language;
    let pivot = &config.conversation.pivot_language;
    println!("{} {}", format!("you  ({language}):").dimmed(), outcome.transcript);
    println!("{} {}", format!("bot  ({pivot}):").dimmed(), outcome.pivot_response.dimmed());
    println!("{} {}", format!("bot  ({language}):").green(), outcome.localized_response);
}

/// Translate text with the configured backend.
pub async fn run_translate_command(
    config: Config,
    text: String,
    from: Option<String>,
    to: Option<String>,
) -> Result<()> {
    let source = match from {
        Some(code) => Language::parse(&code)?,
        None => config.conversation.language.clone(),
    };
    let target = match to {
        Some(code) => Language::parse(&code)?,
        None => config.conversation.pivot_language.clone(),
    };

    let translator = build_translator(&config)?;
    let translated = translator.translate(&text, &source, &target).await?;
    println!("{translated}");
    Ok(())
}

/// Synthesize text in the conversation language.
///
/// Writes raw audio to `out` when given, otherwise prints the playback markup.
pub async fn run_say_command(config: Config, text: String, out: Option<PathBuf>, quiet: bool) -> Result<()> {
    let synthesizer = build_synthesizer(&config)?;
    let audio = synthesizer
        .synthesize(&text, &config.conversation.language)
        .await?;

    match out {
        Some(path) => {
            write_file(&path, &audio.bytes)?;
            if !quiet {
                eprintln!(
                    "{} ({}, {} bytes) written to {}",
                    "Audio".green(),
                    audio.format,
                    audio.bytes.len(),
                    path.display()
                );
            }
        }
        None => println!("{}", encode_for_playback(&audio, config.playback.format)),
    }
    Ok(())
}

fn write_file(path: &Path, contents: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(path, contents)?;
    Ok(())
}
