//! Response generator trait and the shared decoding loop.

use crate::error::{Result, VoicebotError};
use crate::generate::config::GenerationConfig;
use async_trait::async_trait;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Trait for pivot-language response generation.
///
/// One instance is built at startup and shared by every turn, so
/// implementations must tolerate concurrent calls.
#[async_trait]
pub trait ResponseGenerator: Send + Sync {
    /// Generate a reply to `text`, at most `config().max_length` tokens long.
    ///
    /// # Errors
    /// Returns `VoicebotError::GenerationFailure` on empty or overlong input
    /// or a model error.
    async fn generate(&self, text: &str) -> Result<String>;

    /// Name of the loaded model for logging.
    fn model_name(&self) -> &str;

    /// Options fixed at construction.
    fn config(&self) -> &GenerationConfig;
}

#[async_trait]
impl<T: ResponseGenerator + ?Sized> ResponseGenerator for Arc<T> {
    async fn generate(&self, text: &str) -> Result<String> {
        (**self).generate(text).await
    }

    fn model_name(&self) -> &str {
        (**self).model_name()
    }

    fn config(&self) -> &GenerationConfig {
        (**self).config()
    }
}

/// Reject input no generator can answer.
pub fn check_input(text: &str) -> Result<&str> {
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Err(VoicebotError::generation("Empty input"));
    }
    Ok(trimmed)
}

/// Reject a reply with nothing to say.
pub fn check_reply(reply: String) -> Result<String> {
    let trimmed = reply.trim();
    if trimmed.is_empty() {
        return Err(VoicebotError::generation("Model produced an empty reply"));
    }
    if trimmed.len() == reply.len() {
        return Ok(reply);
    }
    Ok(trimmed.to_string())
}

/// Incremental decoding loop.
///
/// `step` receives every token so far (starting with `start_token`) and
/// returns the next one. Stops at `eos_token` or after `max_length` new
/// tokens; the returned tokens exclude both the start and EOS tokens.
pub fn decode_tokens<F>(start_token: u32, eos_token: u32, max_length: usize, mut step: F) -> Result<Vec<u32>>
where
    F: FnMut(&[u32]) -> Result<u32>,
{
    let mut tokens = Vec::with_capacity(max_length + 1);
    tokens.push(start_token);

    for _ in 0..max_length {
        let next = step(&tokens)?;
        if next == eos_token {
            break;
        }
        tokens.push(next);
    }

    tokens.remove(0);
    Ok(tokens)
}

/// Mock generator for testing.
///
/// Replies with a fixed response, truncated to `max_length` whitespace-separated words.
#[derive(Debug)]
pub struct MockGenerator {
    response: String,
    should_fail: bool,
    config: GenerationConfig,
    calls: AtomicUsize,
}

impl MockGenerator {
    pub fn new(config: GenerationConfig) -> Self {
        Self {
            response: "I am doing well, thank you.".to_string(),
            should_fail: false,
            config,
            calls: AtomicUsize::new(0),
        }
    }

    /// Configure the mock to return a specific response
    pub fn with_response(mut self, response: &str) -> Self {
        self.response = response.to_string();
        self
    }

    /// Configure the mock to fail on generate
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl Default for MockGenerator {
    fn default() -> Self {
        Self::new(GenerationConfig::default())
    }
}

#[async_trait]
impl ResponseGenerator for MockGenerator {
    async fn generate(&self, text: &str) -> Result<String> {
        check_input(text)?;
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            return Err(VoicebotError::generation("mock generation failure"));
        }
        check_reply(
            self.response
                .split_whitespace()
                .take(self.config.max_length)
                .collect::<Vec<_>>()
                .join(" "),
        )
    }

    fn model_name(&self) -> &str {
        "mock"
    }

    fn config(&self) -> &GenerationConfig {
        &self.config
    }
}
