//! Rich diagnostic error types for lexagent.
//!
//! Each subsystem defines its own error type with miette `#[diagnostic]`
//! derives. [`AgentError`] wraps them so the full diagnostic chain (codes,
//! help text, sources) reaches the user unchanged.

use miette::Diagnostic;
use thiserror::Error;

use crate::agent::error::PlanningError;
use crate::agent::goal::GoalId;
use crate::agent::resolver::ResolveError;
use crate::config::ConfigError;
use crate::grammar::GrammarError;
use crate::lexicon::store::StoreError;
use crate::lexicon::{ExprError, TeachError};
use crate::seeds::SeedError;
use crate::world::WorldError;

/// Top-level error type.
#[derive(Debug, Error, Diagnostic)]
pub enum AgentError {
    #[error(transparent)]
    #[diagnostic(transparent)]
    Expr(#[from] ExprError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Teach(#[from] TeachError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    World(#[from] WorldError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Grammar(#[from] GrammarError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Planning(#[from] PlanningError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Resolve(#[from] ResolveError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    #[diagnostic(transparent)]
    Seed(#[from] SeedError),

    #[error("goal not found: {goal_id}")]
    #[diagnostic(
        code(lexagent::agent::goal_not_found),
        help("List goals with `:goals` in chat, or check the id returned when the goal was set.")
    )]
    GoalNotFound { goal_id: GoalId },

    #[error("no memory path configured")]
    #[diagnostic(
        code(lexagent::agent::no_memory),
        help("Pass `--memory <file>` or set `memory_path` in the config file to persist the lexicon.")
    )]
    NoMemoryPath,
}

pub type AgentResult<T> = std::result::Result<T, AgentError>;
