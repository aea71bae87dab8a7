//! End-to-end turns through the public API.
//!
//! The first group wires mock backends; the second points the real Google
//! backends at a local mock server so the HTTP wiring is covered too.

use std::f32::consts::PI;
use std::path::Path;
use std::sync::Arc;
use voicebot::audio::wav::encode_wav;
use voicebot::generate::MockGenerator;
use voicebot::playback::decode_playback_payload;
use voicebot::stt::{GoogleSpeechRecognizer, MockRecognizer};
use voicebot::translate::{GoogleTranslator, MockTranslator};
use voicebot::tts::{GoogleTts, MockSynthesizer};
use voicebot::{AudioSample, GenerationConfig, Language, Pipeline, PipelineConfig, VoicebotError};
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// One second of a 220 Hz tone at 16 kHz, loud enough to count as speech.
fn voiced_samples() -> Vec<i16> {
    (0..16000)
        .map(|i| ((2.0 * PI * 220.0 * i as f32 / 16000.0).sin() * 8000.0) as i16)
        .collect()
}

fn write_wav(dir: &Path, name: &str, samples: &[i16]) -> AudioSample {
    let path = dir.join(name);
    std::fs::write(&path, encode_wav(samples).unwrap()).unwrap();
    AudioSample::from_path(path)
}

#[tokio::test]
async fn wie_geht_es_dir_round_trip_with_mocks() {
    let dir = tempfile::tempdir().unwrap();
    let sample = write_wav(dir.path(), "question.wav", &voiced_samples());

    let generator = Arc::new(
        MockGenerator::new(GenerationConfig::with_max_length(100))
            .with_response("I am doing well, thank you."),
    );
    let pipeline = Pipeline::new(
        Arc::new(MockRecognizer::new().with_response("Wie geht es dir?")),
        Arc::new(
            MockTranslator::new()
                .with_response("Wie geht es dir?", "How are you?")
                .with_response("I am doing well, thank you.", "Mir geht es gut, danke."),
        ),
        generator.clone(),
        Arc::new(MockSynthesizer::new()),
        PipelineConfig::default(),
    );

    let (transcript, localized, pivot, markup) =
        pipeline.handle_turn(&sample).await.unwrap().into_tuple();

    assert_eq!(transcript, "Wie geht es dir?");
    assert!(!pivot.is_empty());
    assert_eq!(localized, "Mir geht es gut, danke.");
    let payload = decode_playback_payload(&markup).expect("markup carries base64 audio");
    assert!(payload.starts_with(b"RIFF"));
    assert_eq!(generator.calls(), 1);
}

#[tokio::test]
async fn missing_audio_file_is_recognition_failure() {
    let dir = tempfile::tempdir().unwrap();
    let server = MockServer::start().await;
    let pipeline = Pipeline::new(
        Arc::new(GoogleSpeechRecognizer::with_base_url(&server.uri()).unwrap()),
        Arc::new(MockTranslator::new()),
        Arc::new(MockGenerator::default()),
        Arc::new(MockSynthesizer::new()),
        PipelineConfig::default(),
    );

    let result = pipeline
        .handle_turn(&AudioSample::from_path(dir.path().join("nope.wav")))
        .await;
    assert!(matches!(
        result,
        Err(VoicebotError::RecognitionFailure { .. })
    ));
}

#[tokio::test]
async fn every_stage_failure_surfaces_unchanged() {
    let dir = tempfile::tempdir().unwrap();
    let sample = write_wav(dir.path(), "q.wav", &voiced_samples());

    let translator_down = Pipeline::new(
        Arc::new(MockRecognizer::new()),
        Arc::new(MockTranslator::new().with_failure()),
        Arc::new(MockGenerator::default()),
        Arc::new(MockSynthesizer::new()),
        PipelineConfig::default(),
    );
    assert!(matches!(
        translator_down.handle_turn(&sample).await,
        Err(VoicebotError::TranslationFailure { .. })
    ));

    let synthesizer_down = Pipeline::new(
        Arc::new(MockRecognizer::new()),
        Arc::new(MockTranslator::new()),
        Arc::new(MockGenerator::default()),
        Arc::new(MockSynthesizer::new().with_failure()),
        PipelineConfig::default(),
    );
    let err = synthesizer_down.handle_turn(&sample).await.unwrap_err();
    assert!(err.is_stage_failure());
    assert!(matches!(err, VoicebotError::SynthesisFailure { .. }));
}

async fn mount_google(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/speech-api/v2/recognize"))
        .and(query_param("lang", "de"))
        .and(header("content-type", "audio/l16; rate=16000"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            "{\"result\":[]}\n\
             {\"result\":[{\"alternative\":[{\"transcript\":\"Wie geht es dir?\",\"confidence\":0.93}],\"final\":true}],\"result_index\":0}\n",
        ))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/translate_a/single"))
        .and(query_param("sl", "de"))
        .and(query_param("tl", "en"))
        .and(query_param("q", "Wie geht es dir?"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(r#"[[["How are you?","Wie geht es dir?",null,null,10]],null,"de"]"#),
        )
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/translate_a/single"))
        .and(query_param("sl", "en"))
        .and(query_param("tl", "de"))
        .respond_with(ResponseTemplate::new(200).set_body_string(
            r#"[[["Mir geht es gut. ","I am fine. ",null,null,10],["Danke!","Thank you!",null,null,10]],null,"en"]"#,
        ))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/translate_tts"))
        .and(query_param("tl", "de"))
        .and(query_param("client", "tw-ob"))
        .respond_with(
            ResponseTemplate::new(200).set_body_bytes(vec![0xFF, 0xF3, 0x44, 0xC4, 0x00, 0x00]),
        )
        .expect(1)
        .mount(server)
        .await;
}

#[tokio::test]
async fn full_turn_against_google_wire_formats() {
    let server = MockServer::start().await;
    mount_google(&server).await;

    let dir = tempfile::tempdir().unwrap();
    let sample = write_wav(dir.path(), "question.wav", &voiced_samples());

    let generator = Arc::new(MockGenerator::default().with_response("I am fine. Thank you!"));
    let pipeline = Pipeline::new(
        Arc::new(GoogleSpeechRecognizer::with_base_url(&server.uri()).unwrap()),
        Arc::new(GoogleTranslator::with_base_url(&server.uri()).unwrap()),
        generator,
        Arc::new(GoogleTts::with_base_url(&server.uri()).unwrap()),
        PipelineConfig {
            language: Language::parse("de").unwrap(),
            ..PipelineConfig::default()
        },
    );

    let outcome = pipeline.handle_turn(&sample).await.unwrap();

    assert_eq!(outcome.transcript, "Wie geht es dir?");
    assert_eq!(outcome.pivot_response, "I am fine. Thank you!");
    assert_eq!(outcome.localized_response, "Mir geht es gut. Danke!");
    assert!(outcome.markup.contains("data:audio/mpeg;base64,"));
    assert_eq!(
        decode_playback_payload(&outcome.markup).unwrap(),
        vec![0xFF, 0xF3, 0x44, 0xC4, 0x00, 0x00]
    );
}

#[tokio::test]
async fn silent_recording_never_reaches_the_network() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let sample = write_wav(dir.path(), "silence.wav", &vec![0i16; 16000]);

    let translator = Arc::new(MockTranslator::new());
    let pipeline = Pipeline::new(
        Arc::new(GoogleSpeechRecognizer::with_base_url(&server.uri()).unwrap()),
        translator.clone(),
        Arc::new(MockGenerator::default()),
        Arc::new(MockSynthesizer::new()),
        PipelineConfig::default(),
    );

    let result = pipeline.handle_turn(&sample).await;
    assert!(matches!(
        result,
        Err(VoicebotError::RecognitionFailure { .. })
    ));
    assert_eq!(translator.calls(), 0);
}
