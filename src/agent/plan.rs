//! Plans: typed actions with pre-computed feedback, and per-goal step
//! sequences kept in a side table keyed by goal id.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::lexicon::{Lexicon, Predicate, TemporalRelation, WordType};
use crate::world::{Owner, WorldObject};

use super::goal::GoalId;

// ---------------------------------------------------------------------------
// Descriptions
// ---------------------------------------------------------------------------

/// One description word, possibly negated.
#[derive(Debug, Clone)]
pub struct Term {
    pub word: String,
    pub negated: bool,
    pub predicate: Arc<Predicate>,
}

impl Term {
    pub fn new(word: impl Into<String>, predicate: Arc<Predicate>) -> Self {
        Self {
            word: word.into(),
            negated: false,
            predicate,
        }
    }

    pub fn negate(mut self) -> Self {
        self.negated = !self.negated;
        self
    }

    pub fn matches(&self, obj: &WorldObject) -> bool {
        self.predicate.test(obj) != self.negated
    }

    fn with_current_meaning(&self, lexicon: &Lexicon) -> Self {
        match lexicon.get_entry(&self.word).and_then(|e| e.meaning.predicate()) {
            Some(predicate) => Self {
                predicate: predicate.clone(),
                ..self.clone()
            },
            None => self.clone(),
        }
    }
}

impl PartialEq for Term {
    fn eq(&self, other: &Self) -> bool {
        self.word == other.word && self.negated == other.negated
    }
}

/// An object description in disjunctive normal form: a list of alternatives,
/// each a conjunction of terms. `red box` is one alternative with two terms;
/// `red box or blue ball` is two alternatives.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Description {
    alternatives: Vec<Vec<Term>>,
}

impl Description {
    pub fn conjunction(terms: Vec<Term>) -> Self {
        Self {
            alternatives: vec![terms],
        }
    }

    pub fn from_alternatives(alternatives: Vec<Vec<Term>>) -> Self {
        Self {
            alternatives: alternatives.into_iter().filter(|a| !a.is_empty()).collect(),
        }
    }

    pub fn alternatives(&self) -> &[Vec<Term>] {
        &self.alternatives
    }

    pub fn is_empty(&self) -> bool {
        self.alternatives.is_empty()
    }

    /// An empty description matches every object.
    pub fn matches(&self, obj: &WorldObject) -> bool {
        self.alternatives.is_empty()
            || self
                .alternatives
                .iter()
                .any(|alt| alt.iter().all(|t| t.matches(obj)))
    }

    /// The same description with every word's predicate looked up again, so
    /// meanings retaught since parsing take effect. Words that are no longer
    /// predicates keep the meaning they were parsed with.
    pub fn with_current_meanings(&self, lexicon: &Lexicon) -> Self {
        Self {
            alternatives: self
                .alternatives
                .iter()
                .map(|alt| alt.iter().map(|t| t.with_current_meaning(lexicon)).collect())
                .collect(),
        }
    }

    /// Surface words, in order, without connectives.
    pub fn words(&self) -> Vec<&str> {
        self.alternatives
            .iter()
            .flatten()
            .map(|t| t.word.as_str())
            .collect()
    }

    /// Human-readable phrase, e.g. `red box or not blue ball`.
    pub fn phrase(&self) -> String {
        if self.alternatives.is_empty() {
            return "anything".into();
        }
        self.alternatives
            .iter()
            .map(|alt| {
                alt.iter()
                    .map(|t| {
                        if t.negated {
                            format!("not {}", t.word)
                        } else {
                            t.word.clone()
                        }
                    })
                    .collect::<Vec<_>>()
                    .join(" ")
            })
            .collect::<Vec<_>>()
            .join(" or ")
    }
}

/// What a knowledge query reports on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KnowledgeSubject {
    Word(String),
    Type(WordType),
    Everything,
}

/// How an action picks its object.
#[derive(Debug, Clone, PartialEq)]
pub enum Target {
    Named(String),
    Matching(Description),
}

impl Target {
    pub fn phrase(&self) -> String {
        match self {
            Self::Named(name) => name.clone(),
            Self::Matching(desc) => format!("the {}", desc.phrase()),
        }
    }
}

// ---------------------------------------------------------------------------
// Actions
// ---------------------------------------------------------------------------

/// Tag of an action, as shown in logs and listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionType {
    Create,
    Take,
    Give,
    Destroy,
    Put,
    RetrieveFromContainer,
    Query,
    Identify,
    Locate,
    QueryOwner,
    QueryInventory,
    EvaluateRelation,
    VerifyProperty,
    OutputQuestion,
    SocialRespond,
    VerifyUnderstanding,
    VerifyPossession,
    VerifyExistence,
    ConditionalExecution,
    HypotheticalQuery,
    ListEvents,
    QueryEvents,
    KnowledgeQuery,
    NotUnderstood,
}

impl ActionType {
    pub fn as_label(self) -> &'static str {
        match self {
            Self::Create => "CREATE",
            Self::Take => "TAKE",
            Self::Give => "GIVE",
            Self::Destroy => "DESTROY",
            Self::Put => "PUT",
            Self::RetrieveFromContainer => "RETRIEVE_FROM_CONTAINER",
            Self::Query => "QUERY",
            Self::Identify => "IDENTIFY",
            Self::Locate => "LOCATE",
            Self::QueryOwner => "QUERY_OWNER",
            Self::QueryInventory => "QUERY_INVENTORY",
            Self::EvaluateRelation => "EVALUATE_RELATION",
            Self::VerifyProperty => "VERIFY_PROPERTY",
            Self::OutputQuestion => "OUTPUT_QUESTION",
            Self::SocialRespond => "SOCIAL_RESPOND",
            Self::VerifyUnderstanding => "VERIFY_UNDERSTANDING",
            Self::VerifyPossession => "VERIFY_POSSESSION",
            Self::VerifyExistence => "VERIFY_EXISTENCE",
            Self::ConditionalExecution => "CONDITIONAL_EXECUTION",
            Self::HypotheticalQuery => "HYPOTHETICAL_QUERY",
            Self::ListEvents => "LIST_EVENTS",
            Self::QueryEvents => "QUERY_EVENTS",
            Self::KnowledgeQuery => "KNOWLEDGE_QUERY",
            Self::NotUnderstood => "NOT_UNDERSTOOD",
        }
    }

    /// Whether executing this action can change the world. A conditional
    /// counts because its command may.
    pub fn mutates_world(self) -> bool {
        matches!(
            self,
            Self::Create
                | Self::Take
                | Self::Give
                | Self::Destroy
                | Self::Put
                | Self::RetrieveFromContainer
                | Self::ConditionalExecution
        )
    }
}

impl std::fmt::Display for ActionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_label())
    }
}

/// What the execution engine must do, with its parameters.
#[derive(Debug, Clone, PartialEq)]
pub enum Action {
    Create {
        description: Description,
        name: Option<String>,
    },
    Take {
        target: Target,
    },
    Give {
        target: Target,
        recipient: Owner,
    },
    Destroy {
        target: Target,
    },
    Put {
        target: Target,
        container: Target,
    },
    RetrieveFromContainer {
        target: String,
        container: String,
    },
    Query {
        description: Description,
        /// Set when the query is a single word, so its meaning is reported.
        definition: Option<String>,
    },
    Identify {
        name: String,
    },
    Locate {
        target: Target,
    },
    QueryOwner {
        target: Target,
    },
    QueryInventory {
        owner: Owner,
    },
    EvaluateRelation {
        relation: String,
        predicate: Arc<Predicate>,
        left: String,
        right: String,
    },
    VerifyProperty {
        name: String,
        description: Description,
    },
    OutputQuestion {
        word: String,
        question: String,
    },
    SocialRespond {
        word: String,
    },
    VerifyUnderstanding {
        word: String,
    },
    VerifyPossession {
        owner: Owner,
        description: Description,
    },
    VerifyExistence {
        description: Description,
    },
    /// Run `command` when the read-only `check` holds, or when it does not
    /// if `negated`.
    ConditionalExecution {
        check: Box<Plan>,
        negated: bool,
        command: Box<Plan>,
    },
    /// Evaluate a read-only `check` and report it, changing nothing.
    HypotheticalQuery {
        check: Box<Plan>,
        supposition: String,
    },
    ListEvents,
    /// Events logged strictly before or after event number `event`.
    QueryEvents {
        relation: TemporalRelation,
        event: u64,
    },
    KnowledgeQuery {
        subject: KnowledgeSubject,
    },
    NotUnderstood {
        input: String,
    },
}

impl Action {
    pub fn action_type(&self) -> ActionType {
        match self {
            Self::Create { .. } => ActionType::Create,
            Self::Take { .. } => ActionType::Take,
            Self::Give { .. } => ActionType::Give,
            Self::Destroy { .. } => ActionType::Destroy,
            Self::Put { .. } => ActionType::Put,
            Self::RetrieveFromContainer { .. } => ActionType::RetrieveFromContainer,
            Self::Query { .. } => ActionType::Query,
            Self::Identify { .. } => ActionType::Identify,
            Self::Locate { .. } => ActionType::Locate,
            Self::QueryOwner { .. } => ActionType::QueryOwner,
            Self::QueryInventory { .. } => ActionType::QueryInventory,
            Self::EvaluateRelation { .. } => ActionType::EvaluateRelation,
            Self::VerifyProperty { .. } => ActionType::VerifyProperty,
            Self::OutputQuestion { .. } => ActionType::OutputQuestion,
            Self::SocialRespond { .. } => ActionType::SocialRespond,
            Self::VerifyUnderstanding { .. } => ActionType::VerifyUnderstanding,
            Self::VerifyPossession { .. } => ActionType::VerifyPossession,
            Self::VerifyExistence { .. } => ActionType::VerifyExistence,
            Self::ConditionalExecution { .. } => ActionType::ConditionalExecution,
            Self::HypotheticalQuery { .. } => ActionType::HypotheticalQuery,
            Self::ListEvents => ActionType::ListEvents,
            Self::QueryEvents { .. } => ActionType::QueryEvents,
            Self::KnowledgeQuery { .. } => ActionType::KnowledgeQuery,
            Self::NotUnderstood { .. } => ActionType::NotUnderstood,
        }
    }

    /// Intent text, derived from the action alone.
    pub fn describe(&self) -> String {
        match self {
            Self::Create { description, name } => match name {
                Some(name) => format!("I will create a {} named {name}.", description.phrase()),
                None => format!("I will create a {}.", description.phrase()),
            },
            Self::Take { target } => format!("I will take {}.", target.phrase()),
            Self::Give { target, recipient } => {
                let to = match recipient {
                    Owner::User => "you".to_string(),
                    Owner::Agent => "myself".to_string(),
                    Owner::World => "the world".to_string(),
                };
                format!("I will give {} to {to}.", target.phrase())
            }
            Self::Destroy { target } => format!("I will destroy {}.", target.phrase()),
            Self::Put { target, container } => {
                format!("I will put {} in {}.", target.phrase(), container.phrase())
            }
            Self::RetrieveFromContainer { target, container } => {
                format!("I will get {target} out of {container}.")
            }
            Self::Query {
                description,
                definition: Some(_),
            } => format!("I will explain \"{}\" and look for matching objects.", description.phrase()),
            Self::Query { description, .. } => {
                format!("I will look for {} objects.", description.phrase())
            }
            Self::Identify { name } => format!("I will describe {name}."),
            Self::Locate { target } => format!("I will find where {} is.", target.phrase()),
            Self::QueryOwner { target } => format!("I will check who has {}.", target.phrase()),
            Self::QueryInventory { owner } => match owner {
                Owner::Agent => "I will list what I have.".into(),
                Owner::User => "I will list what you have.".into(),
                Owner::World => "I will list what nobody holds.".into(),
            },
            Self::EvaluateRelation {
                relation,
                left,
                right,
                ..
            } => format!("I will check whether {left} is {relation} {right}."),
            Self::VerifyProperty { name, description } => {
                format!("I will check whether {name} is {}.", description.phrase())
            }
            Self::OutputQuestion { word, .. } => format!("I will ask about \"{word}\"."),
            Self::SocialRespond { word } => format!("I will respond to \"{word}\"."),
            Self::VerifyUnderstanding { word } => format!("I will check whether I know \"{word}\"."),
            Self::VerifyPossession { owner, description } => format!(
                "I will check whether {} {} a {}.",
                owner.subject_phrase(),
                if *owner == Owner::Agent || *owner == Owner::User { "have" } else { "has" },
                description.phrase()
            ),
            Self::VerifyExistence { description } => {
                format!("I will check whether a {} exists.", description.phrase())
            }
            Self::ConditionalExecution {
                check,
                negated,
                command,
            } => {
                let when = if *negated { "unless it holds" } else { "if it holds" };
                format!("{} Then, {when}: {}", check.feedback, command.feedback)
            }
            Self::HypotheticalQuery { supposition, .. } => {
                format!("I will work out whether \"{supposition}\" would be true, without changing anything.")
            }
            Self::ListEvents => "I will list everything that has happened.".into(),
            Self::QueryEvents { relation, event } => {
                format!("I will list what happened {} event {event}.", relation.as_label())
            }
            Self::KnowledgeQuery { subject } => match subject {
                KnowledgeSubject::Word(word) => format!("I will tell you what I know about \"{word}\"."),
                KnowledgeSubject::Type(word_type) => format!("I will list the {word_type} words I know."),
                KnowledgeSubject::Everything => "I will list the words I know.".into(),
            },
            Self::NotUnderstood { input } => {
                format!("I know all the words in \"{input}\" but not what you want me to do.")
            }
        }
    }
}

/// An executable step: the action plus its intent feedback, fixed at
/// construction time.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub action: Action,
    pub feedback: String,
}

impl Plan {
    pub fn new(action: Action) -> Self {
        let feedback = action.describe();
        Self { action, feedback }
    }

    pub fn action_type(&self) -> ActionType {
        self.action.action_type()
    }

    pub fn mutates_world(&self) -> bool {
        self.action_type().mutates_world()
    }

    /// Re-resolve the meanings a check depends on against the lexicon.
    /// Only the read-only checks used as completion conditions are touched.
    pub fn with_current_meanings(&self, lexicon: &Lexicon) -> Self {
        let action = match &self.action {
            Action::VerifyPossession { owner, description } => Action::VerifyPossession {
                owner: *owner,
                description: description.with_current_meanings(lexicon),
            },
            Action::VerifyExistence { description } => Action::VerifyExistence {
                description: description.with_current_meanings(lexicon),
            },
            Action::VerifyProperty { name, description } => Action::VerifyProperty {
                name: name.clone(),
                description: description.with_current_meanings(lexicon),
            },
            Action::Query {
                description,
                definition,
            } => Action::Query {
                description: description.with_current_meanings(lexicon),
                definition: definition.clone(),
            },
            Action::EvaluateRelation {
                relation,
                predicate,
                left,
                right,
            } => Action::EvaluateRelation {
                relation: relation.clone(),
                predicate: lexicon
                    .get_entry(relation)
                    .and_then(|e| e.meaning.relation())
                    .unwrap_or(predicate)
                    .clone(),
                left: left.clone(),
                right: right.clone(),
            },
            other => other.clone(),
        };
        Self {
            action,
            feedback: self.feedback.clone(),
        }
    }
}

// ---------------------------------------------------------------------------
// Plan sequences
// ---------------------------------------------------------------------------

/// An ordered list of steps for one goal, with a cursor at the next
/// unexecuted step.
#[derive(Debug, Clone)]
pub struct PlanSequence {
    pub goal_id: GoalId,
    pub steps: Vec<Plan>,
    pub cursor: usize,
    /// Rewind instead of replanning when exhausted.
    pub repeatable: bool,
    /// Short summary of the strategy, for logs.
    pub strategy: String,
}

impl PlanSequence {
    pub fn new(goal_id: GoalId, steps: Vec<Plan>, strategy: impl Into<String>) -> Self {
        Self {
            goal_id,
            steps,
            cursor: 0,
            repeatable: false,
            strategy: strategy.into(),
        }
    }

    pub fn repeatable(mut self) -> Self {
        self.repeatable = true;
        self
    }

    pub fn next_step(&self) -> Option<&Plan> {
        self.steps.get(self.cursor)
    }

    pub fn advance(&mut self) {
        if self.cursor < self.steps.len() {
            self.cursor += 1;
        }
    }

    pub fn is_exhausted(&self) -> bool {
        self.cursor >= self.steps.len()
    }

    pub fn rewind(&mut self) {
        self.cursor = 0;
    }

    pub fn remaining(&self) -> usize {
        self.steps.len().saturating_sub(self.cursor)
    }

    pub fn action_types(&self) -> Vec<ActionType> {
        self.steps.iter().map(Plan::action_type).collect()
    }
}

/// Side table of cached plans, keyed by goal id.
#[derive(Debug, Default)]
pub struct PlanTable {
    plans: BTreeMap<GoalId, PlanSequence>,
}

impl PlanTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, goal: GoalId) -> Option<&PlanSequence> {
        self.plans.get(&goal)
    }

    pub fn get_mut(&mut self, goal: GoalId) -> Option<&mut PlanSequence> {
        self.plans.get_mut(&goal)
    }

    pub fn insert(&mut self, plan: PlanSequence) {
        self.plans.insert(plan.goal_id, plan);
    }

    pub fn remove(&mut self, goal: GoalId) -> Option<PlanSequence> {
        self.plans.remove(&goal)
    }

    pub fn contains(&self, goal: GoalId) -> bool {
        self.plans.contains_key(&goal)
    }

    pub fn retain(&mut self, mut keep: impl FnMut(GoalId) -> bool) {
        self.plans.retain(|id, _| keep(*id));
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }
}
