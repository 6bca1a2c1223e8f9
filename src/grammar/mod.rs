//! Command grammar: turns utterances into typed plans.
//!
//! The parser never mutates anything. Fully known input becomes a
//! [`Plan`](crate::agent::plan::Plan); input with unknown words becomes an
//! [`UnknownWordSignal`] so the caller can open learning goals; teach
//! instructions become a [`TeachRequest`].

pub mod error;
pub mod goal;
pub mod lexer;
pub mod parser;
pub mod teach;

pub use error::{GrammarError, GrammarResult};
pub use goal::{GoalOutcome, GoalRequest};
pub use parser::{CommandParser, ParseOutcome, UnknownWordSignal};
pub use teach::{TeachRequest, parse_teach};
