//! Language codes shared by every pipeline stage.

use crate::defaults;
use crate::error::{Result, VoicebotError};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A BCP-47-style language code such as `de`, `en` or `zh-CN`.
///
/// The primary subtag is normalized to lowercase; a region subtag keeps the
/// case it was given because the Google backends distinguish `zh-CN` from `zh-cn`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Language(String);

impl Language {
    /// Parse and normalize a language code.
    ///
    /// # Errors
    /// Returns `VoicebotError::ConfigInvalidValue` for anything that is not
    /// 2-3 ASCII letters, optionally followed by `-` and a 2-4 character region.
    pub fn parse(code: &str) -> Result<Self> {
        let code = code.trim();
        let invalid = |message: &str| VoicebotError::ConfigInvalidValue {
            key: "language".to_string(),
            message: format!("{message}: '{code}'"),
        };

        let (primary, region) = match code.split_once(['-', '_']) {
            Some((p, r)) => (p, Some(r)),
            None => (code, None),
        };

        if !(2..=3).contains(&primary.len()) || !primary.chars().all(|c| c.is_ascii_alphabetic()) {
            return Err(invalid("expected a 2-3 letter language code"));
        }

        let mut normalized = primary.to_ascii_lowercase();
        if let Some(region) = region {
            if !(2..=4).contains(&region.len())
                || !region.chars().all(|c| c.is_ascii_alphanumeric())
            {
                return Err(invalid("invalid region subtag"));
            }
            normalized.push('-');
            normalized.push_str(region);
        }

        Ok(Self(normalized))
    }

    /// The pivot language the response generator works in.
    pub fn pivot() -> Self {
        Self(defaults::PIVOT_LANGUAGE.to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Primary subtag without region (`zh-CN` → `zh`).
    pub fn primary(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }

    /// Whether two codes name the same language, ignoring region.
    pub fn same_language(&self, other: &Language) -> bool {
        self.primary() == other.primary()
    }
}

impl Default for Language {
    fn default() -> Self {
        Self(defaults::DEFAULT_LANGUAGE.to_string())
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for Language {
    type Err = VoicebotError;

    fn from_str(s: &str) -> Result<Self> {
        Self::parse(s)
    }
}

impl TryFrom<String> for Language {
    type Error = VoicebotError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Language> for String {
    fn from(language: Language) -> Self {
        language.0
    }
}
