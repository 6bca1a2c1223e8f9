//! The lexicon: the agent's runtime-mutable vocabulary.
//!
//! Every word maps to a [`WordEntry`] carrying the taught meaning
//! expression and its compiled [`Meaning`]. Compilation happens inside
//! [`Lexicon::add_entry`]; an entry whose meaning does not compile is never
//! stored. Persistence lives in [`store`] and only runs when asked.

pub mod error;
pub mod expr;
pub mod store;

use std::collections::BTreeMap;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use unicode_normalization::UnicodeNormalization;

use crate::world::Owner;

pub use error::{TeachError, TeachResult};
pub use expr::{Arity, ExprError, Predicate};

/// Grammar words the command parser handles itself. They can never be taught.
pub const RESERVED_WORDS: &[&str] = &[
    "a", "an", "the", "is", "are", "as", "to", "in", "into", "from", "do", "does", "has",
    "have", "there", "exists", "exist", "happened", "event", "events", "know", "about", "all",
];

// ---------------------------------------------------------------------------
// Word types and meanings
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WordType {
    Noun,
    Property,
    Action,
    Relation,
    Inquiry,
    Social,
    Operator,
    Conditional,
    Pronoun,
    Temporal,
}

impl WordType {
    pub const ALL: [WordType; 10] = [
        WordType::Noun,
        WordType::Property,
        WordType::Action,
        WordType::Relation,
        WordType::Inquiry,
        WordType::Social,
        WordType::Operator,
        WordType::Conditional,
        WordType::Pronoun,
        WordType::Temporal,
    ];

    pub fn as_label(self) -> &'static str {
        match self {
            Self::Noun => "noun",
            Self::Property => "property",
            Self::Action => "action",
            Self::Relation => "relation",
            Self::Inquiry => "inquiry",
            Self::Social => "social",
            Self::Operator => "operator",
            Self::Conditional => "conditional",
            Self::Pronoun => "pronoun",
            Self::Temporal => "temporal",
        }
    }

    /// Predicate arity for word types whose meaning is an object condition.
    pub fn arity(self) -> Option<Arity> {
        match self {
            Self::Noun | Self::Property => Some(Arity::Unary),
            Self::Relation => Some(Arity::Binary),
            _ => None,
        }
    }
}

impl WordType {
    /// Parse a type label or its plural, as in `list all properties`.
    pub fn from_name(name: &str) -> Option<Self> {
        let name = name.trim().to_lowercase();
        let singular = match name.strip_suffix("ies") {
            Some(stem) => format!("{stem}y"),
            None => name.strip_suffix('s').unwrap_or(&name).to_string(),
        };
        Self::ALL
            .into_iter()
            .find(|t| t.as_label() == name || t.as_label() == singular)
    }
}

impl std::fmt::Display for WordType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_label())
    }
}

impl FromStr for WordType {
    type Err = TeachError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|t| t.as_label() == wanted)
            .ok_or_else(|| TeachError::UnknownWordType {
                word_type: s.trim().to_string(),
            })
    }
}

/// The built-in behaviours an action word can name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionVerb {
    Create,
    Take,
    Give,
    Destroy,
    Put,
}

impl ActionVerb {
    fn from_label(label: &str) -> Option<Self> {
        match label {
            "create" | "make" | "build" => Some(Self::Create),
            "take" | "get" | "grab" | "pick" => Some(Self::Take),
            "give" | "hand" => Some(Self::Give),
            "destroy" | "remove" | "delete" => Some(Self::Destroy),
            "put" | "place" => Some(Self::Put),
            _ => None,
        }
    }
}

/// Question words.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InquiryKind {
    What,
    Where,
    Who,
    /// `list events`, `list all nouns`.
    List,
}

impl InquiryKind {
    fn from_label(label: &str) -> Option<Self> {
        match label {
            "what" | "which" => Some(Self::What),
            "where" => Some(Self::Where),
            "who" => Some(Self::Who),
            "list" | "show" => Some(Self::List),
            _ => None,
        }
    }
}

/// Logical connectives used inside object descriptions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Connective {
    And,
    Or,
    Not,
}

impl Connective {
    fn from_label(label: &str) -> Option<Self> {
        match label {
            "and" | "&&" => Some(Self::And),
            "or" | "||" => Some(Self::Or),
            "not" | "!" => Some(Self::Not),
            _ => None,
        }
    }
}

/// Clause markers of a conditional command: `if <check> then <command>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConditionMarker {
    If,
    Unless,
    Then,
}

impl ConditionMarker {
    fn from_label(label: &str) -> Option<Self> {
        match label {
            "if" | "when" => Some(Self::If),
            "unless" => Some(Self::Unless),
            "then" => Some(Self::Then),
            _ => None,
        }
    }
}

/// Ordering words for questions about the event log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TemporalRelation {
    Before,
    After,
}

impl TemporalRelation {
    fn from_label(label: &str) -> Option<Self> {
        match label {
            "before" | "earlier" | "prior" => Some(Self::Before),
            "after" | "later" | "since" => Some(Self::After),
            _ => None,
        }
    }

    pub fn as_label(self) -> &'static str {
        match self {
            Self::Before => "before",
            Self::After => "after",
        }
    }
}

/// The compiled form of a word's meaning expression.
#[derive(Debug, Clone)]
pub enum Meaning {
    /// Noun or property: a condition on one object.
    Predicate(Arc<Predicate>),
    /// Relation: a condition on two objects.
    Relation(Arc<Predicate>),
    Action(ActionVerb),
    Inquiry(InquiryKind),
    Operator(Connective),
    Pronoun(Owner),
    /// A conditional word whose text names a clause marker.
    Condition(ConditionMarker),
    /// A temporal word whose text names an ordering.
    Temporal(TemporalRelation),
    /// Social words, and conditional or temporal words with free text.
    Text(String),
}

impl Meaning {
    pub fn compile(word: &str, word_type: WordType, expression: &str) -> TeachResult<Self> {
        let expression = expression.trim();
        let label = expression.to_lowercase();
        let bad = |expected: &'static str| TeachError::BadMeaning {
            word: word.to_string(),
            word_type: word_type.to_string(),
            expression: expression.to_string(),
            expected,
        };

        if let Some(arity) = word_type.arity() {
            let predicate = Predicate::compile(expression, arity).map_err(|source| TeachError::Compile {
                word: word.to_string(),
                source,
            })?;
            let predicate = Arc::new(predicate);
            return Ok(match arity {
                Arity::Unary => Self::Predicate(predicate),
                Arity::Binary => Self::Relation(predicate),
            });
        }

        match word_type {
            WordType::Action => ActionVerb::from_label(&label)
                .map(Self::Action)
                .ok_or_else(|| bad("one of: create, take, give, destroy, put")),
            WordType::Inquiry => InquiryKind::from_label(&label)
                .map(Self::Inquiry)
                .ok_or_else(|| bad("one of: what, which, where, who, list")),
            WordType::Operator => Connective::from_label(&label)
                .map(Self::Operator)
                .ok_or_else(|| bad("one of: and, or, not")),
            WordType::Pronoun => Owner::from_label(&label)
                .map(Self::Pronoun)
                .ok_or_else(|| bad("an owner: agent, user or world")),
            _ if expression.is_empty() => Err(bad("non-empty text")),
            WordType::Conditional => Ok(ConditionMarker::from_label(&label)
                .map_or_else(|| Self::Text(expression.to_string()), Self::Condition)),
            WordType::Temporal => Ok(TemporalRelation::from_label(&label)
                .map_or_else(|| Self::Text(expression.to_string()), Self::Temporal)),
            _ => Ok(Self::Text(expression.to_string())),
        }
    }

    /// The unary predicate of a noun or property.
    pub fn predicate(&self) -> Option<&Arc<Predicate>> {
        match self {
            Self::Predicate(p) => Some(p),
            _ => None,
        }
    }

    pub fn relation(&self) -> Option<&Arc<Predicate>> {
        match self {
            Self::Relation(p) => Some(p),
            _ => None,
        }
    }
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

/// A taught word.
#[derive(Debug, Clone)]
pub struct WordEntry {
    /// Normalized key: NFC, lowercase.
    pub word: String,
    pub word_type: WordType,
    pub meaning_expression: String,
    pub meaning: Meaning,
}

/// What `add_entry` did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TeachOutcome {
    Learned,
    /// Same type and expression as the existing entry; nothing changed.
    Unchanged,
    Replaced { previous: String },
}

/// Normalize a surface word into a lexicon key.
pub fn normalize_word(word: &str) -> String {
    word.trim().nfc().collect::<String>().to_lowercase()
}

fn valid_word(word: &str) -> bool {
    !word.is_empty()
        && word
            .chars()
            .all(|c| c.is_alphanumeric() || matches!(c, '_' | '-' | '\''))
}

// ---------------------------------------------------------------------------
// Lexicon
// ---------------------------------------------------------------------------

/// Word → meaning store. Keys are unique and case-insensitive.
#[derive(Debug, Clone, Default)]
pub struct Lexicon {
    entries: BTreeMap<String, WordEntry>,
}

impl Lexicon {
    pub fn new() -> Self {
        Self::default()
    }

    /// Teach a word. Rejects a conflicting redefinition.
    pub fn add_entry(
        &mut self,
        word: &str,
        word_type: WordType,
        expression: &str,
    ) -> TeachResult<TeachOutcome> {
        self.add_entry_with(word, word_type, expression, false)
    }

    /// Teach a word, optionally replacing an existing meaning.
    pub fn add_entry_with(
        &mut self,
        word: &str,
        word_type: WordType,
        expression: &str,
        replace: bool,
    ) -> TeachResult<TeachOutcome> {
        let key = normalize_word(word);
        if !valid_word(&key) {
            return Err(TeachError::InvalidWord {
                word: word.to_string(),
            });
        }
        if RESERVED_WORDS.contains(&key.as_str()) {
            return Err(TeachError::Reserved { word: key });
        }

        let expression = expression.trim();
        let previous = match self.entries.get(&key) {
            Some(existing)
                if existing.word_type == word_type && existing.meaning_expression == expression =>
            {
                return Ok(TeachOutcome::Unchanged);
            }
            Some(existing) if !replace => {
                return Err(TeachError::Duplicate {
                    word: key,
                    existing: format!("{} \"{}\"", existing.word_type, existing.meaning_expression),
                });
            }
            Some(existing) => Some(existing.meaning_expression.clone()),
            None => None,
        };

        let meaning = Meaning::compile(&key, word_type, expression)?;
        tracing::info!(word = %key, %word_type, expression, "learned word");
        self.entries.insert(
            key.clone(),
            WordEntry {
                word: key,
                word_type,
                meaning_expression: expression.to_string(),
                meaning,
            },
        );
        Ok(match previous {
            Some(previous) => TeachOutcome::Replaced { previous },
            None => TeachOutcome::Learned,
        })
    }

    /// Case-insensitive lookup.
    pub fn get_entry(&self, word: &str) -> Option<&WordEntry> {
        self.entries.get(&normalize_word(word))
    }

    pub fn contains(&self, word: &str) -> bool {
        self.get_entry(word).is_some()
    }

    pub fn word_count(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries of one type, sorted by word.
    pub fn entries_of_type(&self, word_type: WordType) -> Vec<&WordEntry> {
        self.entries
            .values()
            .filter(|e| e.word_type == word_type)
            .collect()
    }

    /// All entries, sorted by word.
    pub fn iter(&self) -> impl Iterator<Item = &WordEntry> {
        self.entries.values()
    }

    /// Words starting with `prefix`, sorted.
    pub fn words_with_prefix(&self, prefix: &str) -> Vec<&WordEntry> {
        let prefix = normalize_word(prefix);
        self.entries
            .range(prefix.clone()..)
            .take_while(|(k, _)| k.starts_with(&prefix))
            .map(|(_, e)| e)
            .collect()
    }
}
