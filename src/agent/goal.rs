//! Goal system: an append-only log of goals and their lifecycle.
//!
//! Goals move from `Active` to exactly one terminal state, `Completed` or
//! `Failed`, and are never removed. Plans for goals live in
//! [`PlanTable`](super::plan::PlanTable), not here.

use crate::lexicon::normalize_word;

use super::plan::{Action, Plan};

/// Unique, monotonically increasing goal identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GoalId(pub u64);

impl GoalId {
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for GoalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "goal-{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GoalType {
    /// Learn the meaning of an unknown word.
    Understand,
    AchievePossession,
    AchieveExistence,
    VerifyState,
}

impl GoalType {
    pub fn as_label(self) -> &'static str {
        match self {
            Self::Understand => "UNDERSTAND",
            Self::AchievePossession => "ACHIEVE_POSSESSION",
            Self::AchieveExistence => "ACHIEVE_EXISTENCE",
            Self::VerifyState => "VERIFY_STATE",
        }
    }
}

impl std::fmt::Display for GoalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_label())
    }
}

/// Status of a goal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GoalStatus {
    Active,
    Completed,
    Failed { reason: String },
}

impl GoalStatus {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }
}

impl std::fmt::Display for GoalStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Active => write!(f, "active"),
            Self::Completed => write!(f, "completed"),
            Self::Failed { reason } => write!(f, "failed: {reason}"),
        }
    }
}

/// A pursued objective.
#[derive(Debug, Clone)]
pub struct Goal {
    pub id: GoalId,
    pub description: String,
    pub goal_type: GoalType,
    /// The word under inquiry, for `Understand` goals.
    pub target_concept: Option<String>,
    /// Question text, computed once when the goal is opened.
    pub inquiry_question: Option<String>,
    /// Read-only plan whose truthy result means the goal is satisfied.
    pub completion_condition: Plan,
    pub status: GoalStatus,
    /// Scheduler tick at which the goal was opened.
    pub created_tick: u64,
}

impl Goal {
    pub fn is_active(&self) -> bool {
        self.status == GoalStatus::Active
    }
}

/// The question asked for an unknown word.
pub fn understand_question(word: &str) -> String {
    format!("What is a '{word}'? Please describe it so I can understand.")
}

/// Owner of every goal. Only this type changes goal status.
#[derive(Debug, Default)]
pub struct GoalStore {
    goals: Vec<Goal>,
    next_id: u64,
}

impl GoalStore {
    pub fn new() -> Self {
        Self {
            goals: Vec::new(),
            next_id: 1,
        }
    }

    /// Open a new active goal.
    pub fn open(
        &mut self,
        goal_type: GoalType,
        description: impl Into<String>,
        completion_condition: Plan,
        created_tick: u64,
    ) -> GoalId {
        let id = GoalId(self.next_id.max(1));
        self.next_id = id.0 + 1;
        let goal = Goal {
            id,
            description: description.into(),
            goal_type,
            target_concept: None,
            inquiry_question: None,
            completion_condition,
            status: GoalStatus::Active,
            created_tick,
        };
        tracing::info!(goal = %id, kind = %goal_type, description = %goal.description, "goal opened");
        self.goals.push(goal);
        id
    }

    /// Open an `Understand` goal for `word` unless an active one exists.
    /// Returns the goal id and whether it was newly created.
    pub fn open_understand(&mut self, word: &str, created_tick: u64) -> (GoalId, bool) {
        let word = normalize_word(word);
        let word = word.as_str();
        if let Some(existing) = self.active_understand_for(word) {
            tracing::debug!(goal = %existing, word, "understand goal already active");
            return (existing, false);
        }
        let question = understand_question(word);
        let id = self.open(
            GoalType::Understand,
            format!("understand '{word}'"),
            Plan::new(Action::VerifyUnderstanding {
                word: word.to_string(),
            }),
            created_tick,
        );
        if let Some(goal) = self.get_mut(id) {
            goal.target_concept = Some(word.to_string());
            goal.inquiry_question = Some(question);
        }
        (id, true)
    }

    pub fn get(&self, id: GoalId) -> Option<&Goal> {
        // Ids are dense and start at 1.
        usize::try_from(id.0)
            .ok()
            .and_then(|i| i.checked_sub(1))
            .and_then(|i| self.goals.get(i))
            .filter(|g| g.id == id)
            .or_else(|| self.goals.iter().find(|g| g.id == id))
    }

    fn get_mut(&mut self, id: GoalId) -> Option<&mut Goal> {
        self.goals.iter_mut().find(|g| g.id == id)
    }

    /// All goals in creation order.
    pub fn all(&self) -> &[Goal] {
        &self.goals
    }

    /// Ids of active goals in creation order.
    pub fn active_ids(&self) -> Vec<GoalId> {
        self.goals
            .iter()
            .filter(|g| g.is_active())
            .map(|g| g.id)
            .collect()
    }

    pub fn active(&self) -> impl Iterator<Item = &Goal> {
        self.goals.iter().filter(|g| g.is_active())
    }

    pub fn active_understand_for(&self, word: &str) -> Option<GoalId> {
        let word = normalize_word(word);
        self.goals
            .iter()
            .find(|g| {
                g.is_active()
                    && g.goal_type == GoalType::Understand
                    && g.target_concept.as_deref() == Some(word.as_str())
            })
            .map(|g| g.id)
    }

    /// Mark a goal completed. No-op (returns false) unless it is active.
    pub fn complete(&mut self, id: GoalId) -> bool {
        self.transition(id, GoalStatus::Completed)
    }

    /// Mark a goal failed. No-op (returns false) unless it is active.
    pub fn fail(&mut self, id: GoalId, reason: impl Into<String>) -> bool {
        self.transition(
            id,
            GoalStatus::Failed {
                reason: reason.into(),
            },
        )
    }

    /// External cancellation. Idempotent.
    pub fn cancel(&mut self, id: GoalId) -> bool {
        self.fail(id, "cancelled")
    }

    fn transition(&mut self, id: GoalId, to: GoalStatus) -> bool {
        let Some(goal) = self.get_mut(id) else {
            return false;
        };
        if goal.status.is_terminal() {
            return false;
        }
        tracing::info!(goal = %id, status = %to, "goal status changed");
        goal.status = to;
        true
    }

    pub fn len(&self) -> usize {
        self.goals.len()
    }

    pub fn is_empty(&self) -> bool {
        self.goals.is_empty()
    }
}
