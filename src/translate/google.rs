//! Google translate web endpoint (`client=gtx`).

use crate::defaults;
use crate::error::{Result, VoicebotError};
use crate::language::Language;
use crate::translate::translator::{Translator, precheck};
use async_trait::async_trait;
use reqwest::Url;
use tracing::debug;

/// Translator backed by Google's public translate endpoint.
#[derive(Debug, Clone)]
pub struct GoogleTranslator {
    client: reqwest::Client,
    endpoint: String,
}

impl GoogleTranslator {
    pub fn new(endpoint: Option<&str>) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(defaults::USER_AGENT)
            .build()
            .map_err(|e| VoicebotError::Other(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint
                .unwrap_or(defaults::GOOGLE_TRANSLATE_ENDPOINT)
                .to_string(),
        })
    }

    /// Point the translator at another host (used by tests).
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let endpoint = format!("{}/translate_a/single", base_url.trim_end_matches('/'));
        Self::new(Some(&endpoint))
    }

    fn request_url(&self, text: &str, source: &Language, target: &Language) -> Result<Url> {
        Url::parse_with_params(
            &self.endpoint,
            &[
                ("client", "gtx"),
                ("sl", source.as_str()),
                ("tl", target.as_str()),
                ("dt", "t"),
                ("ie", "UTF-8"),
                ("oe", "UTF-8"),
                ("q", text),
            ],
        )
        .map_err(|e| VoicebotError::translation(format!("Invalid endpoint {}: {e}", self.endpoint)))
    }
}

#[async_trait]
impl Translator for GoogleTranslator {
    async fn translate(&self, text: &str, source: &Language, target: &Language) -> Result<String> {
        if let Some(unchanged) = precheck(text, source, target)? {
            return Ok(unchanged);
        }

        debug!(%source, %target, chars = text.chars().count(), "translating");

        let response = self
            .client
            .get(self.request_url(text, source, target)?)
            .send()
            .await
            .map_err(|e| VoicebotError::translation(format!("Translate request failed: {e}")))?;

        let status = response.status();
        if !status.is_success() {
            return Err(VoicebotError::translation(format!(
                "Translate API returned status {status} for {source} -> {target}"
            )));
        }

        let body = response
            .text()
            .await
            .map_err(|e| VoicebotError::translation(format!("Failed to read translate response: {e}")))?;

        let translated = parse_translate_response(&body)?;
        if translated.trim().is_empty() {
            return Err(VoicebotError::translation(format!(
                "Empty translation for {source} -> {target}"
            )));
        }
        Ok(translated)
    }

    fn name(&self) -> &str {
        "google"
    }
}

/// Join the translated segments of a `dt=t` response.
///
/// Shape: `[[["translated","original",...], ...], null, "detected-lang", ...]`.
fn parse_translate_response(body: &str) -> Result<String> {
    let value: serde_json::Value = serde_json::from_str(body)
        .map_err(|e| VoicebotError::translation(format!("Failed to parse translate response: {e}")))?;

    let segments = value
        .get(0)
        .and_then(|v| v.as_array())
        .ok_or_else(|| VoicebotError::translation("Unexpected translate response format"))?;

    Ok(segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(|v| v.as_str()))
        .collect::<String>())
}
