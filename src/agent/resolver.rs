//! Concept resolvers: advisory, external sources of word meanings.
//!
//! A resolver is consulted when input contains unknown words. Whatever it
//! returns is still taught through the lexicon, so a bad answer is rejected
//! by the expression compiler like any other teach.

use std::collections::BTreeMap;
use std::time::Duration;

use miette::Diagnostic;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::lexicon::{WordType, normalize_word};

#[derive(Debug, Error, Diagnostic)]
pub enum ResolveError {
    #[error("no resolver knows \"{word}\"")]
    #[diagnostic(
        code(lexagent::resolver::unknown),
        help("Teach the word yourself: teach <word_type> \"{word}\" as \"<expression>\".")
    )]
    Unknown { word: String },

    #[error("resolver request for \"{word}\" failed: {message}")]
    #[diagnostic(
        code(lexagent::resolver::transport),
        help("Check the resolver url and that the service is reachable. Timeouts count as failures.")
    )]
    Transport { word: String, message: String },

    #[error("resolver returned an unusable answer for \"{word}\": {message}")]
    #[diagnostic(
        code(lexagent::resolver::bad_response),
        help("The service must answer with JSON: {{\"word_type\": \"noun\", \"expression\": \"...\"}}.")
    )]
    BadResponse { word: String, message: String },
}

pub type ResolveResult<T> = std::result::Result<T, ResolveError>;

/// A meaning proposed by a resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedConcept {
    pub word_type: WordType,
    pub expression: String,
}

pub trait ConceptResolver {
    /// Must return or fail within the calling step.
    fn resolve(&self, word: &str) -> ResolveResult<ResolvedConcept>;

    fn name(&self) -> &'static str;
}

/// Knows nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoResolver;

impl ConceptResolver for NoResolver {
    fn resolve(&self, word: &str) -> ResolveResult<ResolvedConcept> {
        Err(ResolveError::Unknown {
            word: word.to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "none"
    }
}

/// A fixed table of meanings, usually from the config file.
#[derive(Debug, Clone, Default)]
pub struct StaticResolver {
    entries: BTreeMap<String, ResolvedConcept>,
}

impl StaticResolver {
    pub fn new(entries: impl IntoIterator<Item = (String, ResolvedConcept)>) -> Self {
        Self {
            entries: entries
                .into_iter()
                .map(|(word, concept)| (normalize_word(&word), concept))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl ConceptResolver for StaticResolver {
    fn resolve(&self, word: &str) -> ResolveResult<ResolvedConcept> {
        self.entries
            .get(&normalize_word(word))
            .cloned()
            .ok_or_else(|| ResolveError::Unknown {
                word: word.to_string(),
            })
    }

    fn name(&self) -> &'static str {
        "static"
    }
}

/// Looks words up with `GET <base_url>/<word>`.
#[derive(Debug, Clone)]
pub struct HttpResolver {
    base_url: String,
    timeout: Duration,
}

impl HttpResolver {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            timeout,
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

impl ConceptResolver for HttpResolver {
    fn resolve(&self, word: &str) -> ResolveResult<ResolvedConcept> {
        let url = format!("{}/{}", self.base_url, normalize_word(word));
        let agent = ureq::AgentBuilder::new().timeout(self.timeout).build();

        let transport = |message: String| ResolveError::Transport {
            word: word.to_string(),
            message,
        };
        let body = match agent.get(&url).call() {
            Ok(response) => response.into_string().map_err(|e| transport(e.to_string()))?,
            Err(ureq::Error::Status(404, _)) => {
                return Err(ResolveError::Unknown {
                    word: word.to_string(),
                });
            }
            Err(ureq::Error::Status(code, _)) => return Err(transport(format!("HTTP {code}"))),
            Err(ureq::Error::Transport(t)) => return Err(transport(t.to_string())),
        };

        serde_json::from_str(&body).map_err(|e| ResolveError::BadResponse {
            word: word.to_string(),
            message: e.to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
