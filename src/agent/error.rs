//! Planning error types with rich miette diagnostics.

use miette::Diagnostic;
use thiserror::Error;

use super::goal::GoalId;

/// The planner could not produce a plan for a goal.
#[derive(Debug, Clone, Error, Diagnostic, PartialEq, Eq)]
pub enum PlanningError {
    #[error("cannot plan for {goal_id} yet: {reason}")]
    #[diagnostic(
        code(lexagent::planner::gap),
        help("The goal stays active. Teach the missing words or meanings and it will be retried.")
    )]
    Gap { goal_id: GoalId, reason: String },

    #[error("{goal_id} can never be satisfied: {reason}")]
    #[diagnostic(
        code(lexagent::planner::contradiction),
        help("The description contradicts itself. Set a new goal with a consistent description.")
    )]
    Contradiction { goal_id: GoalId, reason: String },
}

impl PlanningError {
    pub fn is_contradiction(&self) -> bool {
        matches!(self, Self::Contradiction { .. })
    }

    pub fn reason(&self) -> &str {
        match self {
            Self::Gap { reason, .. } | Self::Contradiction { reason, .. } => reason,
        }
    }
}

pub type PlanningResult<T> = std::result::Result<T, PlanningError>;
