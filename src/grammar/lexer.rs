//! Lexer: tokenization and word classification.
//!
//! Two passes over the input:
//! 1. **Tokenize**: whitespace split, surrounding punctuation stripped, span tracking
//! 2. **Classify**: binding slot → word-type name after `all` → lexicon entry
//!    → structural word → object name → number → unknown

use crate::lexicon::{Lexicon, RESERVED_WORDS, WordType, normalize_word};
use crate::world::World;

/// Words the grammar itself understands. They never reach the lexicon and
/// are never reported as unknown.
pub const STRUCTURAL_WORDS: &[&str] = RESERVED_WORDS;

pub const ARTICLES: &[&str] = &["a", "an", "the"];

/// Byte-level source span.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

/// What a token turned out to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Structural,
    Entry(WordType),
    /// Name of an existing world object.
    ObjectName,
    /// The name after `as`, bound by a create command.
    Binding,
    Number,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token {
    /// The surface text as typed.
    pub surface: String,
    /// NFC, lowercase.
    pub normalized: String,
    pub span: Span,
    pub role: Role,
}

impl Token {
    pub fn is(&self, word: &str) -> bool {
        self.role == Role::Structural && self.normalized == word
    }

    pub fn is_article(&self) -> bool {
        self.role == Role::Structural && ARTICLES.contains(&self.normalized.as_str())
    }

    pub fn word_type(&self) -> Option<WordType> {
        match self.role {
            Role::Entry(t) => Some(t),
            _ => None,
        }
    }
}

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '_' | '-' | '\'')
}

/// Split text into `(surface, span)` pieces, dropping punctuation.
pub fn split_words(text: &str) -> Vec<(String, Span)> {
    let mut words = Vec::new();
    let mut offset = 0;
    for piece in text.split_whitespace() {
        let start = text[offset..].find(piece).map_or(offset, |i| offset + i);
        offset = start + piece.len();

        let trimmed_start = piece.len() - piece.trim_start_matches(|c| !is_word_char(c)).len();
        let core = piece.trim_matches(|c| !is_word_char(c));
        if core.is_empty() {
            continue;
        }
        let s = start + trimmed_start;
        words.push((
            core.to_string(),
            Span {
                start: s,
                end: s + core.len(),
            },
        ));
    }
    words
}

/// Tokenize and classify `text` against the lexicon and the world.
pub fn tokenize(text: &str, lexicon: &Lexicon, world: &dyn World) -> Vec<Token> {
    let mut tokens: Vec<Token> = Vec::new();
    for (surface, span) in split_words(text) {
        let normalized = normalize_word(&surface);
        let previous = tokens.last();
        let role = if previous.is_some_and(|t| t.is("all")) && names_word_types(&normalized) {
            Role::Structural
        } else {
            classify(&surface, &normalized, previous.is_some_and(|t| t.is("as")), lexicon, world)
        };
        tokens.push(Token {
            surface,
            normalized,
            span,
            role,
        });
    }
    tokens
}

/// `words`, or a word-type label in either number.
pub fn names_word_types(normalized: &str) -> bool {
    normalized == "words" || WordType::from_name(normalized).is_some()
}

fn classify(surface: &str, normalized: &str, after_as: bool, lexicon: &Lexicon, world: &dyn World) -> Role {
    if after_as {
        return Role::Binding;
    }
    if let Some(entry) = lexicon.get_entry(normalized) {
        return Role::Entry(entry.word_type);
    }
    let object = world.object_by_name(surface).and_then(|id| world.object(id));
    if STRUCTURAL_WORDS.contains(&normalized) {
        // An object literally named "A" still wins over the article.
        return match object {
            Some(o) if o.name == surface => Role::ObjectName,
            _ => Role::Structural,
        };
    }
    if object.is_some() {
        return Role::ObjectName;
    }
    if normalized.parse::<i64>().is_ok() {
        return Role::Number;
    }
    Role::Unknown
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::world::{MemoryWorld, ObjectSpec};

    #[test]
    fn punctuation_stripped_with_spans() {
        let words = split_words("  what is red?  ");
        let surfaces: Vec<&str> = words.iter().map(|(w, _)| w.as_str()).collect();
        assert_eq!(surfaces, vec!["what", "is", "red"]);
        assert_eq!(words[2].1, Span { start: 10, end: 13 });
        assert!(split_words("?! ...").is_empty());
    }

    #[test]
    fn classification_order() {
        let mut lexicon = Lexicon::new();
        lexicon.add_entry("red", WordType::Property, "obj.color == 'red'").unwrap();
        let mut world = MemoryWorld::default();
        world.create_object(ObjectSpec::default().named("A")).unwrap();
        world.create_object(ObjectSpec::default().named("crate7")).unwrap();

        let tokens = tokenize("Is A red as Z, a crate7 42 blorp", &lexicon, &world);
        let roles: Vec<Role> = tokens.iter().map(|t| t.role).collect();
        assert_eq!(
            roles,
            vec![
                Role::Structural,
                Role::ObjectName,
                Role::Entry(WordType::Property),
                Role::Structural,
                Role::Binding,
                Role::Structural,
                Role::ObjectName,
                Role::Number,
                Role::Unknown,
            ]
        );
        assert_eq!(tokens[0].normalized, "is");
    }

    #[test]
    fn word_type_names_after_all() {
        let mut lexicon = Lexicon::new();
        lexicon.add_entry("red", WordType::Property, "obj.color == 'red'").unwrap();
        let world = MemoryWorld::default();
        let roles = |text: &str| -> Vec<Role> { tokenize(text, &lexicon, &world).iter().map(|t| t.role).collect() };

        assert_eq!(roles("all properties"), vec![Role::Structural, Role::Structural]);
        assert_eq!(roles("all words"), vec![Role::Structural, Role::Structural]);
        assert_eq!(roles("all red"), vec![Role::Structural, Role::Entry(WordType::Property)]);
        assert_eq!(roles("properties"), vec![Role::Unknown]);
    }
}
