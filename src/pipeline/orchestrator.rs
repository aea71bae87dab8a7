//! One conversational turn: speech in, spoken reply out.
//!
//! recognize → translate (to pivot) → generate → translate (back) → synthesize → encode

use crate::audio::{AudioFormat, AudioSample};
use crate::error::Result;
use crate::generate::ResponseGenerator;
use crate::language::Language;
use crate::pipeline::stage::{Stage, StageTimeouts, TurnTiming, run_stage};
use crate::playback::encode_for_playback;
use crate::stt::Recognizer;
use crate::translate::Translator;
use crate::tts::SpeechSynthesizer;
use serde::Serialize;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info};

/// Settings fixed for the lifetime of a pipeline.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Language the user speaks and hears.
    pub language: Language,
    /// Language the generator works in.
    pub pivot_language: Language,
    /// MIME label for the playback markup; `None` follows the synthesized format.
    pub playback_format: Option<AudioFormat>,
    pub timeouts: StageTimeouts,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            language: Language::default(),
            pivot_language: Language::pivot(),
            playback_format: None,
            timeouts: StageTimeouts::default(),
        }
    }
}

/// Everything a successful turn produces.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TurnOutcome {
    /// What the user said, in the conversation language.
    pub transcript: String,
    /// The reply, in the conversation language.
    pub localized_response: String,
    /// The reply as generated, in the pivot language.
    pub pivot_response: String,
    /// Autoplaying `<audio>` element with the spoken reply.
    pub markup: String,
}

impl TurnOutcome {
    pub fn into_tuple(self) -> (String, String, String, String) {
        (
            self.transcript,
            self.localized_response,
            self.pivot_response,
            self.markup,
        )
    }
}

impl From<TurnOutcome> for (String, String, String, String) {
    fn from(outcome: TurnOutcome) -> Self {
        outcome.into_tuple()
    }
}

/// The conversational pipeline.
///
/// Holds one instance of each stage backend, built once at startup. Turns
/// share nothing but these backends, so concurrent turns are independent.
pub struct Pipeline {
    recognizer: Arc<dyn Recognizer>,
    translator: Arc<dyn Translator>,
    generator: Arc<dyn ResponseGenerator>,
    synthesizer: Arc<dyn SpeechSynthesizer>,
    config: PipelineConfig,
}

impl Pipeline {
    pub fn new(
        recognizer: Arc<dyn Recognizer>,
        translator: Arc<dyn Translator>,
        generator: Arc<dyn ResponseGenerator>,
        synthesizer: Arc<dyn SpeechSynthesizer>,
        config: PipelineConfig,
    ) -> Self {
        Self {
            recognizer,
            translator,
            generator,
            synthesizer,
            config,
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn language(&self) -> &Language {
        &self.config.language
    }

    /// Names of the backends, for startup logs.
    pub fn describe(&self) -> String {
        format!(
            "recognizer={} translator={} generator={} synthesizer={}",
            self.recognizer.name(),
            self.translator.name(),
            self.generator.model_name(),
            self.synthesizer.name()
        )
    }

    /// Run one full turn.
    ///
    /// # Errors
    /// The first stage failure aborts the turn and is returned unchanged;
    /// later stages are not invoked.
    pub async fn handle_turn(&self, sample: &AudioSample) -> Result<TurnOutcome> {
        self.handle_turn_timed(sample).await.map(|(outcome, _)| outcome)
    }

    /// Like [`Pipeline::handle_turn`], also returning per-stage wall time.
    pub async fn handle_turn_timed(&self, sample: &AudioSample) -> Result<(TurnOutcome, TurnTiming)> {
        let language = &self.config.language;
        let pivot = &self.config.pivot_language;
        let timeouts = &self.config.timeouts;
        let mut timing = TurnTiming::default();
        let started = Instant::now();

        debug!(sample = %sample.describe(), %language, %pivot, "turn started");

        let stage = Stage::Recognition;
        let (transcript, elapsed) = run_stage(
            stage,
            timeouts.for_stage(stage),
            self.recognizer.recognize(sample, language),
        )
        .await?;
        timing.record(stage, elapsed);
        debug!(%transcript, "recognized");

        let stage = Stage::ForwardTranslation;
        let (pivot_input, elapsed) = run_stage(
            stage,
            timeouts.for_stage(stage),
            self.translator.translate(&transcript, language, pivot),
        )
        .await?;
        timing.record(stage, elapsed);
        debug!(text = %pivot_input, "translated to pivot");

        let stage = Stage::Generation;
        let (pivot_response, elapsed) = run_stage(
            stage,
            timeouts.for_stage(stage),
            self.generator.generate(&pivot_input),
        )
        .await?;
        timing.record(stage, elapsed);
        debug!(text = %pivot_response, "generated");

        let stage = Stage::BackwardTranslation;
        let (localized_response, elapsed) = run_stage(
            stage,
            timeouts.for_stage(stage),
            self.translator.translate(&pivot_response, pivot, language),
        )
        .await?;
        timing.record(stage, elapsed);

        let stage = Stage::Synthesis;
        let (audio, elapsed) = run_stage(
            stage,
            timeouts.for_stage(stage),
            self.synthesizer.synthesize(&localized_response, language),
        )
        .await?;
        timing.record(stage, elapsed);

        let markup = encode_for_playback(&audio, self.config.playback_format);

        info!(
            total_ms = started.elapsed().as_millis() as u64,
            slowest = timing.slowest().name(),
            audio_bytes = audio.bytes.len(),
            format = %audio.format,
            "turn complete"
        );

        Ok((
            TurnOutcome {
                transcript,
                localized_response,
                pivot_response,
                markup,
            },
            timing,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::wav::encode_wav;
    use crate::error::VoicebotError;
    use crate::generate::{GenerationConfig, MockGenerator};
    use crate::playback::decode_playback_payload;
    use crate::stt::MockRecognizer;
    use crate::translate::MockTranslator;
    use crate::tts::MockSynthesizer;

    struct Mocks {
        recognizer: Arc<MockRecognizer>,
        translator: Arc<MockTranslator>,
        generator: Arc<MockGenerator>,
        synthesizer: Arc<MockSynthesizer>,
    }

    impl Mocks {
        fn happy() -> Self {
            Self {
                recognizer: Arc::new(MockRecognizer::new().with_response("Wie geht es dir?")),
                translator: Arc::new(
                    MockTranslator::new()
                        .with_response("Wie geht es dir?", "How are you?")
                        .with_response("I am fine.", "Mir geht es gut."),
                ),
                generator: Arc::new(MockGenerator::default().with_response("I am fine.")),
                synthesizer: Arc::new(MockSynthesizer::new()),
            }
        }

        fn pipeline(&self) -> Pipeline {
            Pipeline::new(
                self.recognizer.clone(),
                self.translator.clone(),
                self.generator.clone(),
                self.synthesizer.clone(),
                PipelineConfig::default(),
            )
        }
    }

    fn sample() -> AudioSample {
        AudioSample::from_wav_bytes(encode_wav(&[0i16; 16]).unwrap())
    }

    #[tokio::test]
    async fn full_turn_produces_all_outputs() {
        let mocks = Mocks::happy();
        let outcome = mocks.pipeline().handle_turn(&sample()).await.unwrap();

        assert_eq!(outcome.transcript, "Wie geht es dir?");
        assert_eq!(outcome.pivot_response, "I am fine.");
        assert_eq!(outcome.localized_response, "Mir geht es gut.");
        assert!(outcome.markup.starts_with("<audio controls autoplay>"));
        assert!(decode_playback_payload(&outcome.markup).is_some());

        assert_eq!(mocks.recognizer.calls(), 1);
        assert_eq!(mocks.translator.calls(), 2);
        assert_eq!(mocks.generator.calls(), 1);
        assert_eq!(mocks.synthesizer.calls(), 1);
    }

    #[tokio::test]
    async fn recognizer_uses_conversation_language() {
        let mocks = Mocks::happy();
        mocks.pipeline().handle_turn(&sample()).await.unwrap();
        assert_eq!(
            mocks.recognizer.last_language(),
            Some(Language::parse("de").unwrap())
        );
    }

    #[tokio::test]
    async fn recognition_failure_stops_turn() {
        let mocks = Mocks {
            recognizer: Arc::new(MockRecognizer::new().with_failure()),
            ..Mocks::happy()
        };
        let result = mocks.pipeline().handle_turn(&sample()).await;

        assert!(matches!(
            result,
            Err(VoicebotError::RecognitionFailure { .. })
        ));
        assert_eq!(mocks.translator.calls(), 0);
        assert_eq!(mocks.generator.calls(), 0);
        assert_eq!(mocks.synthesizer.calls(), 0);
    }

    #[tokio::test]
    async fn generation_failure_skips_backward_translation_and_synthesis() {
        let mocks = Mocks {
            generator: Arc::new(MockGenerator::default().with_failure()),
            ..Mocks::happy()
        };
        let result = mocks.pipeline().handle_turn(&sample()).await;

        assert!(matches!(
            result,
            Err(VoicebotError::GenerationFailure { .. })
        ));
        assert_eq!(mocks.translator.calls(), 1);
        assert_eq!(mocks.synthesizer.calls(), 0);
    }

    #[tokio::test]
    async fn empty_reply_is_generation_failure() {
        let mocks = Mocks {
            generator: Arc::new(MockGenerator::default().with_response("")),
            ..Mocks::happy()
        };
        let result = mocks.pipeline().handle_turn(&sample()).await;

        assert!(matches!(
            result,
            Err(VoicebotError::GenerationFailure { .. })
        ));
        assert_eq!(mocks.translator.calls(), 1);
        assert_eq!(mocks.synthesizer.calls(), 0);
    }

    #[tokio::test]
    async fn synthesis_failure_yields_no_outcome() {
        let mocks = Mocks {
            synthesizer: Arc::new(MockSynthesizer::new().with_failure()),
            ..Mocks::happy()
        };
        let result = mocks.pipeline().handle_turn(&sample()).await;
        assert!(matches!(result, Err(VoicebotError::SynthesisFailure { .. })));
    }

    #[tokio::test]
    async fn empty_transcript_is_translation_failure() {
        let mocks = Mocks {
            recognizer: Arc::new(MockRecognizer::new().with_response("")),
            ..Mocks::happy()
        };
        let result = mocks.pipeline().handle_turn(&sample()).await;
        assert!(matches!(
            result,
            Err(VoicebotError::TranslationFailure { .. })
        ));
        assert_eq!(mocks.generator.calls(), 0);
    }

    #[tokio::test]
    async fn pivot_language_conversation_skips_translation_backend() {
        let mocks = Mocks::happy();
        let pipeline = Pipeline::new(
            mocks.recognizer.clone(),
            mocks.translator.clone(),
            mocks.generator.clone(),
            mocks.synthesizer.clone(),
            PipelineConfig {
                language: Language::pivot(),
                ..PipelineConfig::default()
            },
        );
        let outcome = pipeline.handle_turn(&sample()).await.unwrap();

        assert_eq!(outcome.pivot_response, outcome.localized_response);
        assert_eq!(mocks.translator.calls(), 0);
    }

    #[tokio::test]
    async fn playback_label_override_applies() {
        let mocks = Mocks {
            synthesizer: Arc::new(
                MockSynthesizer::new().with_bytes(vec![0xFF, 0xFB, 0x90, 0x64]),
            ),
            ..Mocks::happy()
        };
        let pipeline = Pipeline::new(
            mocks.recognizer.clone(),
            mocks.translator.clone(),
            mocks.generator.clone(),
            mocks.synthesizer.clone(),
            PipelineConfig {
                playback_format: Some(AudioFormat::Wav),
                ..PipelineConfig::default()
            },
        );
        let outcome = pipeline.handle_turn(&sample()).await.unwrap();
        assert!(outcome.markup.contains("data:audio/wav;base64,"));
    }

    #[tokio::test]
    async fn concurrent_turns_are_independent() {
        let mocks = Mocks::happy();
        let pipeline = Arc::new(mocks.pipeline());
        let (first, second) = (sample(), sample());
        let (a, b) = tokio::join!(pipeline.handle_turn(&first), pipeline.handle_turn(&second));
        assert_eq!(a.unwrap(), b.unwrap());
        assert_eq!(mocks.generator.calls(), 2);
    }

    #[tokio::test]
    async fn timed_turn_records_every_stage() {
        let mocks = Mocks::happy();
        let (_, timing) = mocks.pipeline().handle_turn_timed(&sample()).await.unwrap();
        assert!(timing.total() >= timing.get(Stage::Generation));
    }

    #[test]
    fn outcome_converts_into_tuple() {
        let outcome = TurnOutcome {
            transcript: "a".into(),
            localized_response: "b".into(),
            pivot_response: "c".into(),
            markup: "d".into(),
        };
        let tuple: (String, String, String, String) = outcome.into();
        assert_eq!(
            tuple,
            ("a".into(), "b".into(), "c".into(), "d".into())
        );
    }

    #[test]
    fn outcome_serializes_with_field_names() {
        let outcome = TurnOutcome {
            transcript: "Wie geht es dir?".into(),
            localized_response: "Gut.".into(),
            pivot_response: "Fine.".into(),
            markup: "<audio></audio>".into(),
        };
        let json = serde_json::to_value(&outcome).unwrap();
        assert_eq!(json["transcript"], "Wie geht es dir?");
        assert_eq!(json["pivot_response"], "Fine.");
    }
}
