//! Rich diagnostic error types for the command grammar.

use miette::Diagnostic;
use thiserror::Error;

use crate::lexicon::TeachError;

#[derive(Debug, Error, Diagnostic)]
pub enum GrammarError {
    #[error("malformed teach instruction: \"{input}\"")]
    #[diagnostic(
        code(lexagent::grammar::malformed_teach),
        help(
            "Use: teach <word_type> \"<word>\" as \"<expression>\", for example \
             teach property \"red\" as \"obj.color == 'red'\". \
             Start with `reteach` to replace an existing meaning."
        )
    )]
    MalformedTeach { input: String },

    #[error("not a goal: \"{input}\"")]
    #[diagnostic(
        code(lexagent::grammar::not_a_goal),
        help(
            "Goals look like \"I have a red ball\", \"there is a blue box\", \
             \"A is bigger_than B\" or any question about the world."
        )
    )]
    NotAGoal { input: String },

    #[error(transparent)]
    #[diagnostic(transparent)]
    Teach(#[from] TeachError),
}

pub type GrammarResult<T> = std::result::Result<T, GrammarError>;
