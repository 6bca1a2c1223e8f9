//! The agent: one conversation surface over lexicon, world and goals.
//!
//! Utterances are parsed and, when fully understood, executed immediately.
//! Unknown words are first offered to the concept resolver; whatever it
//! cannot explain becomes an `UNDERSTAND` goal. Goals make progress only
//! inside [`Agent::tick`].

use std::path::{Path, PathBuf};

use crate::config::AgentConfig;
use crate::error::{AgentError, AgentResult};
use crate::grammar::{CommandParser, GoalOutcome, ParseOutcome, TeachRequest, UnknownWordSignal};
use crate::lexicon::store::{self, CurriculumReport};
use crate::lexicon::{Lexicon, TeachOutcome, WordType, normalize_word};
use crate::world::{MemoryWorld, World};

use super::exec::ExecResult;
use super::goal::{Goal, GoalId, GoalStore};
use super::plan::ActionType;
use super::resolver::{ConceptResolver, NoResolver};
use super::scheduler::{TickReport, TickScheduler};

/// What the agent said and did in reply to one utterance.
#[derive(Debug, Clone, PartialEq)]
pub struct Response {
    /// Text for the user.
    pub feedback: String,
    /// The plan's intent text, fixed before execution.
    pub intent: Option<String>,
    pub action: Option<ActionType>,
    pub result: ExecResult,
    /// Goals opened by this utterance.
    pub opened_goals: Vec<GoalId>,
    /// Words taught by this utterance, directly or through the resolver.
    pub learned: Vec<String>,
}

impl Response {
    fn say(feedback: impl Into<String>) -> Self {
        Self {
            feedback: feedback.into(),
            intent: None,
            action: None,
            result: ExecResult::Unit,
            opened_goals: Vec::new(),
            learned: Vec::new(),
        }
    }
}

pub struct Agent {
    config: AgentConfig,
    lexicon: Lexicon,
    world: Box<dyn World>,
    goals: GoalStore,
    scheduler: TickScheduler,
    parser: CommandParser,
    resolver: Box<dyn ConceptResolver>,
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("name", &self.config.name)
            .field("words", &self.lexicon.word_count())
            .field("objects", &self.world.objects().len())
            .field("goals", &self.goals.len())
            .field("tick", &self.scheduler.current_tick())
            .field("resolver", &self.resolver.name())
            .finish()
    }
}

impl Agent {
    /// Build an agent from config: load the lexicon, apply seed packs, teach
    /// curricula.
    pub fn new(config: AgentConfig) -> AgentResult<Self> {
        let world = MemoryWorld::new(config.world_width, config.world_height);
        Self::with_world(config, Box::new(world))
    }

    pub fn with_world(config: AgentConfig, world: Box<dyn World>) -> AgentResult<Self> {
        let resolver = config.resolver.build()?;

        let mut lexicon = match &config.memory_path {
            Some(path) => {
                let report = store::load(path)?;
                if !report.skipped.is_empty() {
                    tracing::warn!(
                        path = %path.display(),
                        skipped = report.skipped.len(),
                        "some stored words no longer compile"
                    );
                }
                report.lexicon
            }
            None => Lexicon::new(),
        };

        if !config.seed_packs.is_empty() {
            config.seed_registry().apply_all(&config.seed_packs, &mut lexicon)?;
        }
        for path in &config.curricula {
            let report = store::learn_curriculum(&mut lexicon, path)?;
            for (line, reason) in &report.failed {
                tracing::warn!(path = %path.display(), line, %reason, "curriculum line rejected");
            }
        }

        tracing::info!(
            agent = %config.name,
            words = lexicon.word_count(),
            resolver = resolver.name(),
            "agent ready"
        );
        Ok(Self {
            config,
            lexicon,
            world,
            goals: GoalStore::new(),
            scheduler: TickScheduler::new(),
            parser: CommandParser::new(),
            resolver,
        })
    }

    pub fn set_resolver(&mut self, resolver: Box<dyn ConceptResolver>) {
        self.resolver = resolver;
    }

    // ── Conversation ───────────────────────────────────────────────────

    /// Handle one utterance. Never fails: every problem becomes feedback.
    pub fn process(&mut self, text: &str) -> Response {
        self.process_with(text, true)
    }

    fn process_with(&mut self, text: &str, consult_resolver: bool) -> Response {
        let parsed = self.parser.parse(text, &self.lexicon, self.world.as_ref());
        match parsed {
            Err(e) => Response::say(e.to_string()),
            Ok(ParseOutcome::Teach(request)) => self.apply_teach(request),
            Ok(ParseOutcome::Unknown(signal)) => {
                if consult_resolver {
                    let learned = self.resolve_words(&signal.words);
                    if !learned.is_empty() {
                        let mut response = self.process_with(text, false);
                        let mut all = learned;
                        all.append(&mut response.learned);
                        response.learned = all;
                        return response;
                    }
                }
                self.fork_to_learning(&signal)
            }
            Ok(ParseOutcome::Plan(plan)) => {
                let outcome = self
                    .scheduler
                    .engine()
                    .execute(&plan, &self.lexicon, self.world.as_mut());
                Response {
                    feedback: outcome.feedback,
                    intent: Some(plan.feedback.clone()),
                    action: Some(plan.action_type()),
                    result: outcome.result,
                    opened_goals: Vec::new(),
                    learned: Vec::new(),
                }
            }
        }
    }

    fn apply_teach(&mut self, request: TeachRequest) -> Response {
        let TeachRequest {
            word_type,
            word,
            expression,
            replace,
        } = request;
        match self
            .lexicon
            .add_entry_with(&word, word_type, &expression, replace)
        {
            Ok(TeachOutcome::Learned) => Response {
                learned: vec![normalize_word(&word)],
                ..Response::say(format!("Learned {word_type} \"{word}\"."))
            },
            Ok(TeachOutcome::Unchanged) => Response::say(format!("I already know \"{word}\" that way.")),
            Ok(TeachOutcome::Replaced { previous }) => Response {
                learned: vec![normalize_word(&word)],
                ..Response::say(format!("\"{word}\" now means {expression} (was {previous})."))
            },
            Err(e) => Response::say(e.to_string()),
        }
    }

    /// Ask the resolver about each word; teach what it answers.
    fn resolve_words(&mut self, words: &[String]) -> Vec<String> {
        let mut learned = Vec::new();
        for word in words {
            let concept = match self.resolver.resolve(word) {
                Ok(concept) => concept,
                Err(e) => {
                    tracing::debug!(word = %word, resolver = self.resolver.name(), "not resolved: {e}");
                    continue;
                }
            };
            match self
                .lexicon
                .add_entry(word, concept.word_type, &concept.expression)
            {
                Ok(_) => {
                    tracing::info!(word = %word, resolver = self.resolver.name(), "resolved unknown word");
                    learned.push(word.clone());
                }
                Err(e) => tracing::warn!(word = %word, "resolver meaning rejected: {e}"),
            }
        }
        learned
    }

    fn fork_to_learning(&mut self, signal: &UnknownWordSignal) -> Response {
        let tick = self.scheduler.current_tick();
        let mut opened = Vec::new();
        let mut questions = Vec::new();
        for word in &signal.words {
            let (id, created) = self.goals.open_understand(word, tick);
            if created {
                opened.push(id);
            }
            if let Some(q) = self.goals.get(id).and_then(|g| g.inquiry_question.clone()) {
                questions.push(q);
            }
        }
        let unknown = signal
            .words
            .iter()
            .map(|w| format!("\"{w}\""))
            .collect::<Vec<_>>()
            .join(", ");
        Response {
            opened_goals: opened,
            ..Response::say(format!("I don't know {unknown} yet. {}", questions.join(" ")))
        }
    }

    /// Teach a word directly.
    pub fn teach(&mut self, word: &str, word_type: WordType, expression: &str) -> AgentResult<TeachOutcome> {
        Ok(self.lexicon.add_entry(word, word_type, expression)?)
    }

    /// Teach a word, replacing any existing meaning.
    pub fn reteach(&mut self, word: &str, word_type: WordType, expression: &str) -> AgentResult<TeachOutcome> {
        Ok(self.lexicon.add_entry_with(word, word_type, expression, true)?)
    }

    pub fn learn_curriculum(&mut self, path: &Path) -> AgentResult<CurriculumReport> {
        Ok(store::learn_curriculum(&mut self.lexicon, path)?)
    }

    // ── Goals ──────────────────────────────────────────────────────────

    /// Open a goal from a statement such as `I have a red ball`. Unknown
    /// words open `UNDERSTAND` goals instead.
    pub fn set_goal(&mut self, text: &str) -> AgentResult<Response> {
        let outcome = self.parser.parse_goal(text, &self.lexicon, self.world.as_ref())?;
        match outcome {
            GoalOutcome::Unknown(signal) => Ok(self.fork_to_learning(&signal)),
            GoalOutcome::Goal(request) => {
                let id = self.goals.open(
                    request.goal_type,
                    request.description,
                    request.completion_condition,
                    self.scheduler.current_tick(),
                );
                Ok(Response {
                    opened_goals: vec![id],
                    ..Response::say(format!("New goal {id}: {text}."))
                })
            }
        }
    }

    /// Advance every active goal by one step.
    pub fn tick(&mut self) -> TickReport {
        self.scheduler
            .tick(&mut self.goals, &self.lexicon, self.world.as_mut())
    }

    /// Run `ticks` ticks, stopping early once no goal is active.
    pub fn run(&mut self, ticks: usize) -> Vec<TickReport> {
        let mut reports = Vec::new();
        for _ in 0..ticks {
            if self.goals.active_ids().is_empty() {
                break;
            }
            reports.push(self.tick());
        }
        reports
    }

    /// Mark a goal failed from outside. Returns false if it was already terminal.
    pub fn cancel_goal(&mut self, id: GoalId) -> AgentResult<bool> {
        if self.goals.get(id).is_none() {
            return Err(AgentError::GoalNotFound { goal_id: id });
        }
        Ok(self.goals.cancel(id))
    }

    // ── Persistence ────────────────────────────────────────────────────

    /// Save the lexicon to the configured memory path.
    pub fn checkpoint(&self) -> AgentResult<usize> {
        let path = self.config.memory_path.as_ref().ok_or(AgentError::NoMemoryPath)?;
        self.save_to(path)
    }

    pub fn save_to(&self, path: &Path) -> AgentResult<usize> {
        Ok(store::save(&self.lexicon, path)?)
    }

    /// Checkpoint if a memory path is configured.
    pub fn shutdown(self) -> AgentResult<Option<PathBuf>> {
        match &self.config.memory_path {
            Some(path) => {
                self.save_to(path)?;
                Ok(Some(path.clone()))
            }
            None => Ok(None),
        }
    }

    // ── Accessors ──────────────────────────────────────────────────────

    pub fn config(&self) -> &AgentConfig {
        &self.config
    }

    pub fn lexicon(&self) -> &Lexicon {
        &self.lexicon
    }

    pub fn world(&self) -> &dyn World {
        self.world.as_ref()
    }

    pub fn world_mut(&mut self) -> &mut dyn World {
        self.world.as_mut()
    }

    pub fn goals(&self) -> &[Goal] {
        self.goals.all()
    }

    pub fn goal(&self, id: GoalId) -> Option<&Goal> {
        self.goals.get(id)
    }

    pub fn active_goals(&self) -> Vec<&Goal> {
        self.goals.active().collect()
    }

    pub fn current_tick(&self) -> u64 {
        self.scheduler.current_tick()
    }
}

impl Default for Agent {
    /// A memory-only agent with no vocabulary.
    fn default() -> Self {
        Self {
            config: AgentConfig::blank(),
            lexicon: Lexicon::new(),
            world: Box::new(MemoryWorld::default()),
            goals: GoalStore::new(),
            scheduler: TickScheduler::new(),
            parser: CommandParser::new(),
            resolver: Box::new(NoResolver),
        }
    }
}
