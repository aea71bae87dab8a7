//! Google web speech API recognizer.
//!
//! Uploads the recording as raw 16-bit PCM and reads back the
//! newline-delimited JSON results the endpoint streams.

use crate::audio::AudioSample;
use crate::defaults;
use crate::error::{Result, VoicebotError};
use crate::language::Language;
use crate::stt::recognizer::{Recognizer, load_recording};
use async_trait::async_trait;
use reqwest::Url;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use tracing::debug;

/// Recognizer backed by the Google web speech API.
#[derive(Debug, Clone)]
pub struct GoogleSpeechRecognizer {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct SpeechResponse {
    #[serde(default)]
    result: Vec<SpeechResult>,
}

#[derive(Debug, Deserialize)]
struct SpeechResult {
    #[serde(default)]
    alternative: Vec<SpeechAlternative>,
}

#[derive(Debug, Deserialize)]
struct SpeechAlternative {
    transcript: String,
    #[serde(default)]
    confidence: Option<f32>,
}

impl GoogleSpeechRecognizer {
    pub fn new(endpoint: Option<&str>, api_key: Option<&str>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(defaults::USER_AGENT)
            .build()
            .map_err(|e| VoicebotError::Other(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint
                .unwrap_or(defaults::GOOGLE_SPEECH_ENDPOINT)
                .to_string(),
            api_key: api_key.unwrap_or(defaults::GOOGLE_SPEECH_KEY).to_string(),
        })
    }

    /// Point the recognizer at another host (used by tests).
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let endpoint = format!("{}/speech-api/v2/recognize", base_url.trim_end_matches('/'));
        Self::new(Some(&endpoint), None)
    }

    fn request_url(&self, language: &Language) -> Result<Url> {
        Url::parse_with_params(
            &self.endpoint,
            &[
                ("client", "chromium"),
                ("lang", language.as_str()),
                ("key", self.api_key.as_str()),
                ("pFilter", "0"),
            ],
        )
        .map_err(|e| VoicebotError::recognition(format!("Invalid endpoint {}: {e}", self.endpoint)))
    }
}

#[async_trait]
impl Recognizer for GoogleSpeechRecognizer {
    async fn recognize(&self, sample: &AudioSample, language: &Language) -> Result<String> {
        let recording = load_recording(sample).await?;
        let url = self.request_url(language)?;

        debug!(
            seconds = recording.duration().as_secs_f32(),
            %language,
            "uploading recording to Google speech"
        );

        let response = self
            .client
            .post(url)
            .header(
                CONTENT_TYPE,
                format!("audio/l16; rate={}", recording.sample_rate()),
            )
            .body(recording.to_l16_bytes())
            .send()
            .await
            .map_err(|e| VoicebotError::recognition(format!("Speech request failed: {e}")))?;

        if !response.status().is_success() {
            return Err(VoicebotError::recognition(format!(
                "Speech API returned status {}",
                response.status()
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| VoicebotError::recognition(format!("Failed to read speech response: {e}")))?;

        parse_speech_response(&body)
    }

    fn name(&self) -> &str {
        "google"
    }
}

/// Pick the best transcript out of the endpoint's JSON lines.
///
/// The first line is usually an empty `{"result":[]}`; the first non-empty
/// result wins, and within it the alternative that carries a confidence score.
fn parse_speech_response(body: &str) -> Result<String> {
    for line in body.lines().map(str::trim).filter(|l| !l.is_empty()) {
        let response: SpeechResponse = serde_json::from_str(line).map_err(|e| {
            VoicebotError::recognition(format!("Failed to parse speech response: {e}"))
        })?;

        let Some(result) = response.result.into_iter().next() else {
            continue;
        };

        let best = result
            .alternative
            .iter()
            .find(|alt| alt.confidence.is_some())
            .or_else(|| result.alternative.first());

        if let Some(alt) = best {
            let transcript = alt.transcript.trim();
            if !transcript.is_empty() {
                return Ok(transcript.to_string());
            }
        }
    }

    Err(VoicebotError::recognition(
        "Speech could not be understood",
    ))
}
