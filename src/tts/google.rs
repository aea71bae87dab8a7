//! Google translate text-to-speech.
//!
//! The endpoint only accepts short strings, so text is split into chunks
//! that are fetched in order and concatenated into one MP3 stream.

use crate::defaults;
use crate::error::{Result, VoicebotError};
use crate::language::Language;
use crate::tts::synthesizer::{SpeechSynthesizer, SynthesizedAudio, check_synthesis_input};
use async_trait::async_trait;
use reqwest::Url;
use std::io::{Cursor, Read, Write};
use tracing::debug;

/// Characters after which a chunk may end.
const BREAK_AFTER: &[char] = &[
    '.', '!', '?', ';', ':', ',', '\n', '。', '！', '？', '；', '：', '，', '、', '…',
];

/// Synthesizer backed by the Google translate TTS endpoint.
#[derive(Debug, Clone)]
pub struct GoogleTts {
    client: reqwest::Client,
    endpoint: String,
    slow: bool,
}

impl GoogleTts {
    /// Create a synthesizer for `https://translate.google.{tld}`.
    pub fn new(tld: &str, slow: bool) -> Result<Self> {
        let endpoint = defaults::GOOGLE_TTS_ENDPOINT.replace("{tld}", tld);
        Self::with_endpoint(&endpoint, slow)
    }

    pub fn with_endpoint(endpoint: &str, slow: bool) -> Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent(defaults::USER_AGENT)
            .build()
            .map_err(|e| VoicebotError::Other(format!("Failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: endpoint.to_string(),
            slow,
        })
    }

    /// Point the synthesizer at another host (used by tests).
    pub fn with_base_url(base_url: &str) -> Result<Self> {
        let endpoint = format!("{}/translate_tts", base_url.trim_end_matches('/'));
        Self::with_endpoint(&endpoint, false)
    }

    fn chunk_url(&self, chunk: &str, language: &Language, idx: usize, total: usize) -> Result<Url> {
        let idx = idx.to_string();
        let total = total.to_string();
        let textlen = chunk.chars().count().to_string();
        Url::parse_with_params(
            &self.endpoint,
            &[
                ("ie", "UTF-8"),
                ("client", "tw-ob"),
                ("tl", language.as_str()),
                ("q", chunk),
                ("ttsspeed", if self.slow { "0.24" } else { "1" }),
                ("total", total.as_str()),
                ("idx", idx.as_str()),
                ("textlen", textlen.as_str()),
            ],
        )
        .map_err(|e| VoicebotError::synthesis(format!("Invalid endpoint {}: {e}", self.endpoint)))
    }

    /// Synthesize `text` and write the audio of every chunk to `out`, in order.
    pub async fn write_to<W: Write + Send>(&self, text: &str, language: &Language, out: &mut W) -> Result<usize> {
        check_synthesis_input(text, language)?;

        let chunks = split_for_synthesis(text, defaults::TTS_MAX_CHUNK_CHARS);
        let total = chunks.len();
        let mut written = 0;

        for (idx, chunk) in chunks.iter().enumerate() {
            debug!(idx, total, chars = chunk.chars().count(), "synthesizing chunk");

            let response = self
                .client
                .get(self.chunk_url(chunk, language, idx, total)?)
                .send()
                .await
                .map_err(|e| VoicebotError::synthesis(format!("TTS request failed: {e}")))?;

            let status = response.status();
            if !status.is_success() {
                return Err(VoicebotError::synthesis(format!(
                    "TTS API returned status {status} for chunk {}/{total}",
                    idx + 1
                )));
            }

            let bytes = response
                .bytes()
                .await
                .map_err(|e| VoicebotError::synthesis(format!("Failed to read TTS audio: {e}")))?;

            out.write_all(&bytes)
                .map_err(|e| VoicebotError::synthesis(format!("Failed to buffer TTS audio: {e}")))?;
            written += bytes.len();
        }

        Ok(written)
    }
}

#[async_trait]
impl SpeechSynthesizer for GoogleTts {
    async fn synthesize(&self, text: &str, language: &Language) -> Result<SynthesizedAudio> {
        let mut buffer = Cursor::new(Vec::new());
        self.write_to(text, language, &mut buffer).await?;

        buffer.set_position(0);
        let mut bytes = Vec::with_capacity(buffer.get_ref().len());
        buffer
            .read_to_end(&mut bytes)
            .map_err(|e| VoicebotError::synthesis(format!("Failed to read TTS buffer: {e}")))?;

        SynthesizedAudio::from_bytes(bytes)
    }

    fn name(&self) -> &str {
        "google"
    }
}

/// Split text into chunks of at most `max_chars` characters.
///
/// Prefers to break after punctuation, then at whitespace, and only cuts
/// inside a word when a single word is longer than `max_chars`. Adjacent
/// short pieces are merged so fewer requests are made.
pub fn split_for_synthesis(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut pieces = Vec::new();

    for sentence in text.split_inclusive(BREAK_AFTER) {
        let sentence = sentence.trim();
        if sentence.is_empty() {
            continue;
        }
        if sentence.chars().count() <= max_chars {
            pieces.push(sentence.to_string());
        } else {
            pieces.extend(split_at_whitespace(sentence, max_chars));
        }
    }

    merge_short(pieces, max_chars)
}

fn split_at_whitespace(sentence: &str, max_chars: usize) -> Vec<String> {
    let mut out = Vec::new();
    let mut current = String::new();

    for word in sentence.split_whitespace() {
        let word_len = word.chars().count();
        let current_len = current.chars().count();

        if word_len > max_chars {
            if !current.is_empty() {
                out.push(std::mem::take(&mut current));
            }
            let chars: Vec<char> = word.chars().collect();
            for part in chars.chunks(max_chars) {
                out.push(part.iter().collect());
            }
            continue;
        }

        if current.is_empty() {
            current.push_str(word);
        } else if current_len + 1 + word_len <= max_chars {
            current.push(' ');
            current.push_str(word);
        } else {
            out.push(std::mem::replace(&mut current, word.to_string()));
        }
    }

    if !current.is_empty() {
        out.push(current);
    }
    out
}

fn merge_short(pieces: Vec<String>, max_chars: usize) -> Vec<String> {
    let mut merged: Vec<String> = Vec::new();
    for piece in pieces {
        if let Some(last) = merged.last_mut()
            && last.chars().count() + 1 + piece.chars().count() <= max_chars
        {
            last.push(' ');
            last.push_str(&piece);
            continue;
        }
        merged.push(piece);
    }
    merged
}
