//! Lexicon error types with rich miette diagnostics.

use miette::Diagnostic;
use thiserror::Error;

use super::expr::ExprError;

/// A teach instruction was rejected. The lexicon is never partially updated.
#[derive(Debug, Error, Diagnostic)]
pub enum TeachError {
    #[error("\"{word}\" is not a valid word")]
    #[diagnostic(
        code(lexagent::teach::invalid_word),
        help("Words are a single token of letters, digits, '_', '-' or '\\''.")
    )]
    InvalidWord { word: String },

    #[error("\"{word}\" is a grammar word and cannot be taught")]
    #[diagnostic(
        code(lexagent::teach::reserved),
        help("Articles, copulas and connectors like 'as', 'to', 'in' are built in. Choose another word.")
    )]
    Reserved { word: String },

    #[error("unknown word type \"{word_type}\"")]
    #[diagnostic(
        code(lexagent::teach::unknown_type),
        help(
            "Word types: noun, property, action, relation, inquiry, social, operator, \
             conditional, pronoun, temporal."
        )
    )]
    UnknownWordType { word_type: String },

    #[error("\"{word}\" is already known as {existing}")]
    #[diagnostic(
        code(lexagent::teach::duplicate),
        help("Use `reteach` (or the --replace flag) to overwrite an existing meaning.")
    )]
    Duplicate { word: String, existing: String },

    #[error("cannot compile the meaning of \"{word}\": {source}")]
    #[diagnostic(
        code(lexagent::teach::compile),
        help("Meanings are predicates over obj (or obj1/obj2 for relations), e.g. obj.color == 'red'.")
    )]
    Compile {
        word: String,
        #[source]
        source: ExprError,
    },

    #[error("\"{expression}\" is not a valid {word_type} meaning for \"{word}\"")]
    #[diagnostic(code(lexagent::teach::bad_meaning), help("Expected {expected}."))]
    BadMeaning {
        word: String,
        word_type: String,
        expression: String,
        expected: &'static str,
    },
}

pub type TeachResult<T> = std::result::Result<T, TeachError>;
