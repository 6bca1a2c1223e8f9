//! Agent layer: goals, planning, execution and the tick loop.
//!
//! - **Goals** live in an append-only [`GoalStore`]; only the scheduler
//!   moves them to a terminal state
//! - **Planner** turns a goal into steps, container-aware for possession
//! - **ExecutionEngine** runs one step against the world
//! - **TickScheduler** advances each active goal by one step per tick
//! - **Agent** ties them to the lexicon, the parser and a concept resolver

pub mod agent;
pub mod error;
pub mod exec;
pub mod goal;
pub mod plan;
pub mod planner;
pub mod resolver;
pub mod scheduler;
pub mod synthesize;

pub use agent::{Agent, Response};
pub use error::{PlanningError, PlanningResult};
pub use exec::{ExecResult, ExecutionEngine, ExecutionMiss, StepOutcome};
pub use goal::{Goal, GoalId, GoalStatus, GoalStore, GoalType};
pub use plan::{Action, ActionType, Description, Plan, PlanSequence, PlanTable, Target, Term};
pub use planner::Planner;
pub use resolver::{ConceptResolver, HttpResolver, NoResolver, ResolveError, ResolvedConcept, StaticResolver};
pub use scheduler::{TickEvent, TickReport, TickScheduler};
pub use synthesize::Unsatisfiable;
