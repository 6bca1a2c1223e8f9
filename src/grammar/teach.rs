//! The teach instruction: `teach <word_type> "<word>" as "<expression>"`.
//!
//! `reteach` has the same shape and replaces an existing meaning.

use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;

use crate::lexicon::WordType;

use super::error::{GrammarError, GrammarResult};

static RE_TEACH: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)^\s*(re)?teach\s+([a-z_]+)\s+"?([^"\s]+)"?\s+as\s+"(.*)"\s*$"#).unwrap()
});

static RE_TEACH_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^\s*(re)?teach\b").unwrap());

/// A parsed teach instruction, not yet applied to the lexicon.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeachRequest {
    pub word_type: WordType,
    pub word: String,
    pub expression: String,
    /// `reteach`: replace an existing meaning.
    pub replace: bool,
}

/// `None` when `text` is not a teach instruction at all; an error when it
/// starts like one but is malformed.
pub fn parse_teach(text: &str) -> Option<GrammarResult<TeachRequest>> {
    if !RE_TEACH_PREFIX.is_match(text) {
        return None;
    }
    let Some(caps) = RE_TEACH.captures(text) else {
        return Some(Err(GrammarError::MalformedTeach {
            input: text.trim().to_string(),
        }));
    };
    let request = WordType::from_str(&caps[2])
        .map_err(GrammarError::from)
        .map(|word_type| TeachRequest {
            word_type,
            word: caps[3].to_string(),
            expression: caps[4].trim().to_string(),
            replace: caps.get(1).is_some(),
        });
    Some(request)
}
