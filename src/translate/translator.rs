use crate::error::{Result, VoicebotError};
use crate::language::Language;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// Trait for machine translation between two languages.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Translate `text` from `source` into `target`.
    ///
    /// # Errors
    /// Returns `VoicebotError::TranslationFailure` on empty input, an
    /// unsupported pair, or a backend failure.
    async fn translate(&self, text: &str, source: &Language, target: &Language) -> Result<String>;

    /// Backend name for logs.
    fn name(&self) -> &str;
}

#[async_trait]
impl<T: Translator + ?Sized> Translator for Arc<T> {
    async fn translate(&self, text: &str, source: &Language, target: &Language) -> Result<String> {
        (**self).translate(text, source, target).await
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Checks every translator applies before calling its backend.
///
/// Returns `Some(text)` when no backend call is needed (same language on both sides).
pub fn precheck(text: &str, source: &Language, target: &Language) -> Result<Option<String>> {
    if text.trim().is_empty() {
        return Err(VoicebotError::translation(format!(
            "Empty input for {source} -> {target}"
        )));
    }
    if source.same_language(target) {
        return Ok(Some(text.to_string()));
    }
    Ok(None)
}

/// Mock translator for testing.
///
/// Looks up canned translations by input text and falls back to
/// `"[source->target] text"` so round trips stay non-empty.
#[derive(Debug, Default)]
pub struct MockTranslator {
    responses: HashMap<String, String>,
    should_fail: bool,
    calls: AtomicUsize,
}

impl MockTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return `output` whenever `input` is translated.
    pub fn with_response(mut self, input: &str, output: &str) -> Self {
        self.responses.insert(input.to_string(), output.to_string());
        self
    }

    /// Configure the mock to fail on translate
    pub fn with_failure(mut self) -> Self {
        self.should_fail = true;
        self
    }

    /// Number of backend calls so far (prechecked calls are not counted).
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Translator for MockTranslator {
    async fn translate(&self, text: &str, source: &Language, target: &Language) -> Result<String> {
        if let Some(unchanged) = precheck(text, source, target)? {
            return Ok(unchanged);
        }
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.should_fail {
            return Err(VoicebotError::translation("mock translation failure"));
        }
        Ok(self
            .responses
            .get(text)
            .cloned()
            .unwrap_or_else(|| format!("[{source}->{target}] {text}")))
    }

    fn name(&self) -> &str {
        "mock"
    }
}
