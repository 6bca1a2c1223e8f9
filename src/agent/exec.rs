//! Execution engine: run one plan step against the world.
//!
//! Every step yields feedback text and a structured [`ExecResult`]. Target
//! lookups that find nothing, or more than one object, are soft misses: the
//! world is left unchanged and the caller decides what to do next.

use crate::lexicon::{Lexicon, Meaning, TemporalRelation, WordType};
use crate::world::{ObjectId, Owner, World, WorldEvent, WorldObject};

use super::plan::{Action, Description, KnowledgeSubject, Plan, Target};
use super::synthesize::Unsatisfiable;

/// Why a step did not take effect.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecutionMiss {
    NoMatch { what: String },
    Ambiguous { what: String, count: usize },
    /// The object exists but the action cannot apply to it right now.
    Unavailable { name: String, reason: String },
    /// The world store refused the change.
    Refused { message: String },
}

impl std::fmt::Display for ExecutionMiss {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NoMatch { what } => write!(f, "I can't find {what}."),
            Self::Ambiguous { what, count } => {
                write!(f, "{count} objects match {what}; please be more specific.")
            }
            Self::Unavailable { name, reason } => write!(f, "I can't use {name}: {reason}."),
            Self::Refused { message } => write!(f, "That didn't work: {message}."),
        }
    }
}

/// Structured outcome of a step.
#[derive(Debug, Clone, PartialEq)]
pub enum ExecResult {
    Unit,
    Created(ObjectId),
    Object(ObjectId),
    Objects(Vec<ObjectId>),
    Truth(bool),
    Text(String),
    Question(String),
    Reply(String),
    Events(Vec<WorldEvent>),
    Miss(ExecutionMiss),
}

impl ExecResult {
    /// Whether the result counts as "found" or "true" for completion checks.
    pub fn is_truthy(&self) -> bool {
        match self {
            Self::Created(_) | Self::Object(_) => true,
            Self::Objects(ids) => !ids.is_empty(),
            Self::Truth(b) => *b,
            Self::Text(t) | Self::Question(t) | Self::Reply(t) => !t.is_empty(),
            Self::Events(events) => !events.is_empty(),
            Self::Unit | Self::Miss(_) => false,
        }
    }

    pub fn miss(&self) -> Option<&ExecutionMiss> {
        match self {
            Self::Miss(m) => Some(m),
            _ => None,
        }
    }

    pub fn objects(&self) -> &[ObjectId] {
        match self {
            Self::Objects(ids) => ids,
            Self::Created(id) | Self::Object(id) => std::slice::from_ref(id),
            _ => &[],
        }
    }
}

/// Feedback plus result of one executed step.
#[derive(Debug, Clone, PartialEq)]
pub struct StepOutcome {
    pub feedback: String,
    pub result: ExecResult,
}

impl StepOutcome {
    fn new(feedback: impl Into<String>, result: ExecResult) -> Self {
        Self {
            feedback: feedback.into(),
            result,
        }
    }

    fn miss(miss: ExecutionMiss) -> Self {
        Self::new(miss.to_string(), ExecResult::Miss(miss))
    }
}

#[derive(Debug, Clone, Default)]
pub struct ExecutionEngine;

impl ExecutionEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn execute(&self, plan: &Plan, lexicon: &Lexicon, world: &mut dyn World) -> StepOutcome {
        let outcome = self.run(&plan.action, lexicon, world);
        tracing::debug!(
            action = %plan.action_type(),
            truthy = outcome.result.is_truthy(),
            feedback = %outcome.feedback,
            "step executed"
        );
        outcome
    }

    fn run(&self, action: &Action, lexicon: &Lexicon, world: &mut dyn World) -> StepOutcome {
        match action {
            Action::Create { description, name } => create(description, name.as_deref(), world),
            Action::Take { target } => take(target, world),
            Action::Give { target, recipient } => give(target, *recipient, world),
            Action::Destroy { target } => destroy(target, world),
            Action::Put { target, container } => put(target, container, world),
            Action::RetrieveFromContainer { target, container } => retrieve(target, container, world),
            Action::Query {
                description,
                definition,
            } => query(description, definition.as_deref(), world),
            Action::Identify { name } => match resolve_named(name, world) {
                Ok(id) => match world.object(id) {
                    Some(obj) => StepOutcome::new(format!("{}.", obj.describe()), ExecResult::Object(id)),
                    None => StepOutcome::miss(ExecutionMiss::NoMatch { what: name.clone() }),
                },
                Err(miss) => StepOutcome::miss(miss),
            },
            Action::Locate { target } => locate(target, world),
            Action::QueryOwner { target } => query_owner(target, world),
            Action::QueryInventory { owner } => inventory(*owner, world),
            Action::EvaluateRelation {
                relation,
                predicate,
                left,
                right,
            } => {
                let (l, r) = match (resolve_named(left, world), resolve_named(right, world)) {
                    (Ok(l), Ok(r)) => (l, r),
                    (Err(miss), _) | (_, Err(miss)) => return StepOutcome::miss(miss),
                };
                let (Some(lo), Some(ro)) = (world.object(l), world.object(r)) else {
                    return StepOutcome::miss(ExecutionMiss::NoMatch {
                        what: format!("{left} and {right}"),
                    });
                };
                let truth = predicate.test_pair(lo, ro);
                let verdict = if truth { "Yes" } else { "No" };
                let neg = if truth { "" } else { "not " };
                StepOutcome::new(
                    format!("{verdict}, {left} is {neg}{relation} {right}."),
                    ExecResult::Truth(truth),
                )
            }
            Action::VerifyProperty { name, description } => match resolve_named(name, world) {
                Ok(id) => {
                    let truth = world.object(id).is_some_and(|o| description.matches(o));
                    let verdict = if truth { "Yes" } else { "No" };
                    let neg = if truth { "" } else { "not " };
                    StepOutcome::new(
                        format!("{verdict}, {name} is {neg}{}.", description.phrase()),
                        ExecResult::Truth(truth),
                    )
                }
                Err(miss) => StepOutcome::miss(miss),
            },
            Action::OutputQuestion { question, .. } => {
                StepOutcome::new(question.clone(), ExecResult::Question(question.clone()))
            }
            Action::SocialRespond { word } => social(word, lexicon),
            Action::VerifyUnderstanding { word } => {
                let known = lexicon.contains(word);
                let text = if known {
                    format!("I know \"{word}\".")
                } else {
                    format!("I still don't know \"{word}\".")
                };
                StepOutcome::new(text, ExecResult::Truth(known))
            }
            Action::VerifyPossession { owner, description } => {
                let owner = *owner;
                let held = world.find_objects(&|o: &WorldObject| o.owner == owner && description.matches(o));
                let text = if held.is_empty() {
                    format!("{} no {}.", possess_phrase(owner), description.phrase())
                } else {
                    format!("{} {}.", possess_phrase(owner), names(&held, world))
                };
                StepOutcome::new(text, ExecResult::Objects(held))
            }
            Action::VerifyExistence { description } => {
                let found = world.find_objects(&|o: &WorldObject| description.matches(o));
                let text = if found.is_empty() {
                    format!("There is no {}.", description.phrase())
                } else {
                    format!("Found {}.", names(&found, world))
                };
                StepOutcome::new(text, ExecResult::Objects(found))
            }
            Action::ConditionalExecution {
                check,
                negated,
                command,
            } => {
                let checked = self.run(&check.action, lexicon, world);
                if let Some(miss) = checked.result.miss() {
                    return StepOutcome::miss(miss.clone());
                }
                if checked.result.is_truthy() == *negated {
                    return StepOutcome::new(
                        format!("{} So I did nothing.", checked.feedback),
                        ExecResult::Truth(false),
                    );
                }
                let done = self.run(&command.action, lexicon, world);
                StepOutcome::new(format!("{} {}", checked.feedback, done.feedback), done.result)
            }
            Action::HypotheticalQuery { check, supposition } => {
                let checked = self.run(&check.action, lexicon, world);
                if let Some(miss) = checked.result.miss() {
                    return StepOutcome::miss(miss.clone());
                }
                let truth = checked.result.is_truthy();
                StepOutcome::new(
                    format!("If {supposition}: that would be {truth} right now."),
                    ExecResult::Truth(truth),
                )
            }
            Action::ListEvents => {
                let events = world.events().to_vec();
                let text = if events.is_empty() {
                    "Nothing has happened yet.".to_string()
                } else {
                    format!("Event log:\n{}", event_lines(&events))
                };
                StepOutcome::new(text, ExecResult::Events(events))
            }
            Action::QueryEvents { relation, event } => query_events(*relation, *event, world),
            Action::KnowledgeQuery { subject } => knowledge(subject, lexicon, world),
            Action::NotUnderstood { input } => StepOutcome::new(
                format!("I know all the words in \"{input}\" but not what you want me to do."),
                ExecResult::Unit,
            ),
        }
    }
}

// ── Target resolution ──────────────────────────────────────────────────

fn resolve_named(name: &str, world: &dyn World) -> Result<ObjectId, ExecutionMiss> {
    world
        .object_by_name(name)
        .ok_or_else(|| ExecutionMiss::NoMatch {
            what: name.to_string(),
        })
}

fn resolve(target: &Target, world: &dyn World) -> Result<ObjectId, ExecutionMiss> {
    match target {
        Target::Named(name) => resolve_named(name, world),
        Target::Matching(description) => {
            let found = world.find_objects(&|o: &WorldObject| description.matches(o));
            match found.as_slice() {
                [id] => Ok(*id),
                [] => Err(ExecutionMiss::NoMatch {
                    what: target.phrase(),
                }),
                many => Err(ExecutionMiss::Ambiguous {
                    what: target.phrase(),
                    count: many.len(),
                }),
            }
        }
    }
}

fn name_of(id: ObjectId, world: &dyn World) -> String {
    world
        .object(id)
        .map(|o| o.name.clone())
        .unwrap_or_else(|| id.to_string())
}

fn names(ids: &[ObjectId], world: &dyn World) -> String {
    ids.iter()
        .map(|&id| name_of(id, world))
        .collect::<Vec<_>>()
        .join(", ")
}

fn possess_phrase(owner: Owner) -> &'static str {
    match owner {
        Owner::Agent => "I have",
        Owner::User => "You have",
        Owner::World => "Nobody holds",
    }
}

// ── Mutating steps ─────────────────────────────────────────────────────

fn create(description: &Description, name: Option<&str>, world: &mut dyn World) -> StepOutcome {
    let spec = match description.synthesize(name) {
        Ok(spec) => spec,
        Err(u) => {
            let reason = match u {
                Unsatisfiable::Gap(r) | Unsatisfiable::Contradiction(r) => r,
            };
            return StepOutcome::miss(ExecutionMiss::Refused { message: reason });
        }
    };
    match world.create_object(spec) {
        Ok(id) => StepOutcome::new(
            format!("Created {} ({}).", name_of(id, world), description.phrase()),
            ExecResult::Created(id),
        ),
        Err(e) => StepOutcome::miss(ExecutionMiss::Refused {
            message: e.to_string(),
        }),
    }
}

fn take(target: &Target, world: &mut dyn World) -> StepOutcome {
    let id = match resolve(target, world) {
        Ok(id) => id,
        Err(miss) => return StepOutcome::miss(miss),
    };
    let name = name_of(id, world);
    let owner = world.object(id).map(|o| o.owner);
    if owner == Some(Owner::Agent) {
        return StepOutcome::new(format!("I already have {name}."), ExecResult::Object(id));
    }
    if owner == Some(Owner::User) {
        return StepOutcome::miss(ExecutionMiss::Unavailable {
            name,
            reason: "it belongs to you".into(),
        });
    }
    if let Some(container) = world.container_of(id) {
        return StepOutcome::miss(ExecutionMiss::Unavailable {
            name,
            reason: format!("it is inside {}", name_of(container, world)),
        });
    }
    match world.set_owner(id, Owner::Agent) {
        Ok(()) => StepOutcome::new(format!("I took {name}."), ExecResult::Object(id)),
        Err(e) => StepOutcome::miss(ExecutionMiss::Refused {
            message: e.to_string(),
        }),
    }
}

fn give(target: &Target, recipient: Owner, world: &mut dyn World) -> StepOutcome {
    let id = match resolve(target, world) {
        Ok(id) => id,
        Err(miss) => return StepOutcome::miss(miss),
    };
    let name = name_of(id, world);
    if world.object(id).map(|o| o.owner) != Some(Owner::Agent) {
        return StepOutcome::miss(ExecutionMiss::Unavailable {
            name,
            reason: "I don't have it".into(),
        });
    }
    match world.set_owner(id, recipient) {
        Ok(()) => {
            let to = match recipient {
                Owner::User => "you",
                Owner::Agent => "myself",
                Owner::World => "the world",
            };
            StepOutcome::new(format!("I gave {name} to {to}."), ExecResult::Object(id))
        }
        Err(e) => StepOutcome::miss(ExecutionMiss::Refused {
            message: e.to_string(),
        }),
    }
}

fn destroy(target: &Target, world: &mut dyn World) -> StepOutcome {
    let id = match resolve(target, world) {
        Ok(id) => id,
        Err(miss) => return StepOutcome::miss(miss),
    };
    match world.remove_object(id) {
        Ok(obj) => StepOutcome::new(format!("Destroyed {}.", obj.name), ExecResult::Object(id)),
        Err(e) => StepOutcome::miss(ExecutionMiss::Refused {
            message: e.to_string(),
        }),
    }
}

fn put(target: &Target, container: &Target, world: &mut dyn World) -> StepOutcome {
    let (id, into) = match (resolve(target, world), resolve(container, world)) {
        (Ok(a), Ok(b)) => (a, b),
        (Err(miss), _) | (_, Err(miss)) => return StepOutcome::miss(miss),
    };
    let (name, container_name) = (name_of(id, world), name_of(into, world));
    if world.object(id).map(|o| o.owner) == Some(Owner::User) {
        return StepOutcome::miss(ExecutionMiss::Unavailable {
            name,
            reason: "it belongs to you".into(),
        });
    }
    match world.put_into(id, into) {
        Ok(()) => StepOutcome::new(
            format!("I put {name} in {container_name}."),
            ExecResult::Object(id),
        ),
        Err(e) => StepOutcome::miss(ExecutionMiss::Refused {
            message: e.to_string(),
        }),
    }
}

fn retrieve(target: &str, container: &str, world: &mut dyn World) -> StepOutcome {
    let id = match resolve_named(target, world) {
        Ok(id) => id,
        Err(miss) => return StepOutcome::miss(miss),
    };
    let Some(current) = world.container_of(id) else {
        return StepOutcome::new(
            format!("{target} is not inside anything."),
            ExecResult::Object(id),
        );
    };
    let current_name = name_of(current, world);
    if !current_name.eq_ignore_ascii_case(container) {
        tracing::debug!(object = target, expected = container, actual = %current_name, "container changed since planning");
    }
    match world.take_out_of_container(id) {
        Ok(_) => StepOutcome::new(
            format!("I got {target} out of {current_name}."),
            ExecResult::Object(id),
        ),
        Err(e) => StepOutcome::miss(ExecutionMiss::Refused {
            message: e.to_string(),
        }),
    }
}

// ── Read-only steps ────────────────────────────────────────────────────

fn query(description: &Description, definition: Option<&str>, world: &dyn World) -> StepOutcome {
    let found = world.find_objects(&|o: &WorldObject| description.matches(o));
    let listing = if found.is_empty() {
        format!("I see no {} objects.", description.phrase())
    } else {
        format!("{} matches: {}.", description.phrase(), names(&found, world))
    };
    let feedback = match definition {
        Some(def) => format!("\"{}\" means {def}. {listing}", description.phrase()),
        None => listing,
    };
    StepOutcome::new(feedback, ExecResult::Objects(found))
}

fn locate(target: &Target, world: &dyn World) -> StepOutcome {
    let id = match resolve(target, world) {
        Ok(id) => id,
        Err(miss) => return StepOutcome::miss(miss),
    };
    let Some(obj) = world.object(id) else {
        return StepOutcome::miss(ExecutionMiss::NoMatch {
            what: target.phrase(),
        });
    };
    let place = match (world.container_of(id), obj.position) {
        (Some(c), _) => format!("inside {}", name_of(c, world)),
        (None, Some((x, y))) => format!("at ({x}, {y})"),
        (None, None) => "nowhere I can see".into(),
    };
    let text = match obj.owner {
        Owner::World => format!("{} is {place}.", obj.name),
        Owner::Agent => format!("{} is {place}, and I have it.", obj.name),
        Owner::User => format!("{} is {place}, and you have it.", obj.name),
    };
    StepOutcome::new(text.clone(), ExecResult::Text(text))
}

fn query_owner(target: &Target, world: &dyn World) -> StepOutcome {
    let ids = match target {
        Target::Named(name) => match resolve_named(name, world) {
            Ok(id) => vec![id],
            Err(miss) => return StepOutcome::miss(miss),
        },
        Target::Matching(description) => world.find_objects(&|o: &WorldObject| description.matches(o)),
    };
    if ids.is_empty() {
        return StepOutcome::miss(ExecutionMiss::NoMatch {
            what: target.phrase(),
        });
    }
    let lines: Vec<String> = ids
        .iter()
        .filter_map(|&id| world.object(id))
        .map(|o| match o.owner {
            Owner::World => format!("nobody has {}", o.name),
            Owner::Agent => format!("I have {}", o.name),
            Owner::User => format!("you have {}", o.name),
        })
        .collect();
    let text = format!("{}.", lines.join("; "));
    StepOutcome::new(text.clone(), ExecResult::Text(text))
}

fn inventory(owner: Owner, world: &dyn World) -> StepOutcome {
    let held = world.find_objects(&|o: &WorldObject| o.owner == owner);
    let who = possess_phrase(owner);
    let text = if held.is_empty() {
        format!("{who} nothing.")
    } else {
        format!("{who}: {}.", names(&held, world))
    };
    StepOutcome::new(text, ExecResult::Objects(held))
}

fn event_lines(events: &[WorldEvent]) -> String {
    events
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("\n")
}

fn query_events(relation: TemporalRelation, event: u64, world: &dyn World) -> StepOutcome {
    let log = world.events();
    if !log.iter().any(|e| e.id == event) {
        return StepOutcome::miss(ExecutionMiss::NoMatch {
            what: format!("event {event}"),
        });
    }
    let picked: Vec<WorldEvent> = log
        .iter()
        .filter(|e| match relation {
            TemporalRelation::Before => e.id < event,
            TemporalRelation::After => e.id > event,
        })
        .cloned()
        .collect();
    let when = format!("{} event {event}", relation.as_label());
    let text = if picked.is_empty() {
        format!("Nothing happened {when}.")
    } else {
        format!("What happened {when}:\n{}", event_lines(&picked))
    };
    StepOutcome::new(text, ExecResult::Events(picked))
}

/// Report taught words: one word with its meaning, or a listing by type.
fn knowledge(subject: &KnowledgeSubject, lexicon: &Lexicon, world: &dyn World) -> StepOutcome {
    let text = match subject {
        KnowledgeSubject::Word(word) => {
            let Some(entry) = lexicon.get_entry(word) else {
                return StepOutcome::miss(ExecutionMiss::NoMatch {
                    what: format!("the word \"{word}\""),
                });
            };
            let article = match entry.word_type {
                WordType::Action | WordType::Inquiry | WordType::Operator => "an",
                _ => "a",
            };
            let mut text = format!(
                "\"{}\" is {article} {} word meaning {}.",
                entry.word, entry.word_type, entry.meaning_expression
            );
            if let Meaning::Predicate(predicate) = &entry.meaning {
                let fits = world.find_objects(&|o: &WorldObject| predicate.test(o));
                if fits.is_empty() {
                    text.push_str(" Nothing fits it right now.");
                } else {
                    text.push_str(&format!(" It fits {}.", names(&fits, world)));
                }
            }
            text
        }
        KnowledgeSubject::Type(word_type) => {
            let words: Vec<&str> = lexicon
                .entries_of_type(*word_type)
                .into_iter()
                .map(|e| e.word.as_str())
                .collect();
            if words.is_empty() {
                format!("I know no {word_type} words.")
            } else {
                format!("The {word_type} words I know: {}.", words.join(", "))
            }
        }
        KnowledgeSubject::Everything => {
            let groups: Vec<String> = WordType::ALL
                .into_iter()
                .filter_map(|t| {
                    let words: Vec<&str> = lexicon
                        .entries_of_type(t)
                        .into_iter()
                        .map(|e| e.word.as_str())
                        .collect();
                    (!words.is_empty()).then(|| format!("{t}: {}", words.join(", ")))
                })
                .collect();
            if groups.is_empty() {
                "I don't know any words yet.".to_string()
            } else {
                format!("I know {} words.\n{}", lexicon.word_count(), groups.join("\n"))
            }
        }
    };
    StepOutcome::new(text.clone(), ExecResult::Text(text))
}

/// Compose a reply from taught `response_to_<word>` social entries.
fn social(word: &str, lexicon: &Lexicon) -> StepOutcome {
    let prefix = format!("response_to_{word}");
    let parts: Vec<&str> = lexicon
        .words_with_prefix(&prefix)
        .into_iter()
        .filter(|e| e.word_type == WordType::Social)
        .filter(|e| e.word == prefix || e.word[prefix.len()..].starts_with('_'))
        .map(|e| e.meaning_expression.as_str())
        .collect();
    if parts.is_empty() {
        return StepOutcome::new(
            format!("I recognize \"{word}\", but nobody has taught me how to answer it."),
            ExecResult::Unit,
        );
    }
    let reply = parts.join(" ");
    StepOutcome::new(reply.clone(), ExecResult::Reply(reply))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::agent::plan::Term;
    use crate::lexicon::{Arity, Predicate};
    use crate::world::{MemoryWorld, ObjectSpec};

    fn term(word: &str, expr: &str) -> Term {
        Term::new(word, Arc::new(Predicate::compile(expr, Arity::Unary).unwrap()))
    }

    fn red_box() -> Description {
        Description::conjunction(vec![
            term("red", "obj.color == 'red'"),
            term("box", "obj.shape == 'box'"),
        ])
    }

    fn run(action: Action, lexicon: &Lexicon, world: &mut MemoryWorld) -> StepOutcome {
        ExecutionEngine::new().execute(&Plan::new(action), lexicon, world)
    }

    #[test]
    fn create_uses_synthesized_attributes() {
        let mut world = MemoryWorld::default();
        let out = run(
            Action::Create {
                description: red_box(),
                name: Some("A".into()),
            },
            &Lexicon::new(),
            &mut world,
        );
        let ExecResult::Created(id) = out.result else {
            panic!("expected creation, got {out:?}");
        };
        let obj = world.object(id).unwrap();
        assert_eq!((obj.color.as_str(), obj.shape.as_str()), ("red", "box"));
        assert_eq!(obj.name, "A");
    }

    #[test]
    fn take_misses_softly_on_ambiguity() {
        let mut world = MemoryWorld::default();
        world.create_object(ObjectSpec::default().color("red").shape("box")).unwrap();
        world.create_object(ObjectSpec::default().color("red").shape("box")).unwrap();
        let out = run(
            Action::Take {
                target: Target::Matching(red_box()),
            },
            &Lexicon::new(),
            &mut world,
        );
        assert!(matches!(
            out.result,
            ExecResult::Miss(ExecutionMiss::Ambiguous { count: 2, .. })
        ));
        assert!(world.find_objects(&|o: &WorldObject| o.owner == Owner::Agent).is_empty());
    }

    #[test]
    fn take_refuses_contained_object() {
        let mut world = MemoryWorld::default();
        let chest = world.create_object(ObjectSpec::default().named("chest")).unwrap();
        let gem = world.create_object(ObjectSpec::default().named("gem")).unwrap();
        world.put_into(gem, chest).unwrap();
        let out = run(
            Action::Take {
                target: Target::Named("gem".into()),
            },
            &Lexicon::new(),
            &mut world,
        );
        assert!(matches!(out.result, ExecResult::Miss(ExecutionMiss::Unavailable { .. })));

        run(
            Action::RetrieveFromContainer {
                target: "gem".into(),
                container: "chest".into(),
            },
            &Lexicon::new(),
            &mut world,
        );
        let out = run(
            Action::Take {
                target: Target::Named("gem".into()),
            },
            &Lexicon::new(),
            &mut world,
        );
        assert_eq!(out.result, ExecResult::Object(gem));
        assert_eq!(world.object(gem).unwrap().owner, Owner::Agent);
    }

    #[test]
    fn give_requires_possession() {
        let mut world = MemoryWorld::default();
        let gem = world.create_object(ObjectSpec::default().named("gem")).unwrap();
        let give = Action::Give {
            target: Target::Named("gem".into()),
            recipient: Owner::User,
        };
        assert!(run(give.clone(), &Lexicon::new(), &mut world).result.miss().is_some());
        world.set_owner(gem, Owner::Agent).unwrap();
        assert!(run(give, &Lexicon::new(), &mut world).result.is_truthy());
        assert_eq!(world.object(gem).unwrap().owner, Owner::User);
    }

    #[test]
    fn query_returns_empty_list_not_error() {
        let mut world = MemoryWorld::default();
        let out = run(
            Action::Query {
                description: red_box(),
                definition: None,
            },
            &Lexicon::new(),
            &mut world,
        );
        assert_eq!(out.result, ExecResult::Objects(vec![]));
        assert!(!out.result.is_truthy());
    }

    #[test]
    fn relation_evaluation() {
        let mut world = MemoryWorld::default();
        world.create_object(ObjectSpec::default().named("A").size(8)).unwrap();
        world.create_object(ObjectSpec::default().named("B").size(3)).unwrap();
        let predicate = Arc::new(Predicate::compile("obj1.size > obj2.size", Arity::Binary).unwrap());
        let eval = |left: &str, right: &str, world: &mut MemoryWorld| {
            run(
                Action::EvaluateRelation {
                    relation: "bigger_than".into(),
                    predicate: predicate.clone(),
                    left: left.into(),
                    right: right.into(),
                },
                &Lexicon::new(),
                world,
            )
            .result
        };
        assert_eq!(eval("A", "B", &mut world), ExecResult::Truth(true));
        assert_eq!(eval("B", "A", &mut world), ExecResult::Truth(false));
        assert!(matches!(
            eval("A", "Z", &mut world),
            ExecResult::Miss(ExecutionMiss::NoMatch { .. })
        ));
    }

    #[test]
    fn social_composes_taught_responses() {
        let mut lexicon = Lexicon::new();
        lexicon.add_entry("hello", WordType::Social, "greeting").unwrap();
        let mut world = MemoryWorld::default();
        let bare = run(
            Action::SocialRespond { word: "hello".into() },
            &lexicon,
            &mut world,
        );
        assert_eq!(bare.result, ExecResult::Unit);
        assert!(bare.feedback.contains("recognize"));

        lexicon
            .add_entry("response_to_hello", WordType::Social, "Hello there!")
            .unwrap();
        lexicon
            .add_entry("response_to_hello_2", WordType::Social, "Nice to see you.")
            .unwrap();
        lexicon
            .add_entry("response_to_helloween", WordType::Social, "Boo!")
            .unwrap();
        let out = run(
            Action::SocialRespond { word: "hello".into() },
            &lexicon,
            &mut world,
        );
        assert_eq!(out.result, ExecResult::Reply("Hello there! Nice to see you.".into()));
    }

    #[test]
    fn output_question_is_side_effect_free() {
        let mut world = MemoryWorld::default();
        let action = Action::OutputQuestion {
            word: "zork".into(),
            question: "What is a 'zork'?".into(),
        };
        let first = run(action.clone(), &Lexicon::new(), &mut world);
        let second = run(action, &Lexicon::new(), &mut world);
        assert_eq!(first, second);
        assert!(world.events().is_empty());
    }

    #[test]
    fn put_and_locate() {
        let mut world = MemoryWorld::default();
        world.create_object(ObjectSpec::default().named("chest")).unwrap();
        world.create_object(ObjectSpec::default().named("gem")).unwrap();
        run(
            Action::Put {
                target: Target::Named("gem".into()),
                container: Target::Named("chest".into()),
            },
            &Lexicon::new(),
            &mut world,
        );
        let out = run(
            Action::Locate {
                target: Target::Named("gem".into()),
            },
            &Lexicon::new(),
            &mut world,
        );
        assert_eq!(out.feedback, "gem is inside chest.");
    }

    #[test]
    fn refused_put_leaves_containment_alone() {
        let mut world = MemoryWorld::default();
        let chest = world.create_object(ObjectSpec::default().named("chest")).unwrap();
        let bag = world.create_object(ObjectSpec::default().named("bag")).unwrap();
        let gem = world.create_object(ObjectSpec::default().named("gem")).unwrap();
        world.put_into(gem, chest).unwrap();
        world.put_into(chest, bag).unwrap();
        let put = |what: &str, into: &str| Action::Put {
            target: Target::Named(what.into()),
            container: Target::Named(into.into()),
        };

        let out = run(put("gem", "gem"), &Lexicon::new(), &mut world);
        assert!(matches!(out.result, ExecResult::Miss(ExecutionMiss::Refused { .. })));
        assert_eq!(world.container_of(gem), Some(chest));

        let out = run(put("bag", "gem"), &Lexicon::new(), &mut world);
        assert!(out.result.miss().is_some());
        assert_eq!(world.container_of(bag), None);
        assert_eq!(world.container_of(chest), Some(bag));

        // A direct move between containers.
        assert!(run(put("gem", "bag"), &Lexicon::new(), &mut world).result.is_truthy());
        assert_eq!(world.container_of(gem), Some(bag));
    }

    #[test]
    fn conditional_runs_command_only_when_check_holds() {
        let mut world = MemoryWorld::default();
        let lexicon = Lexicon::new();
        let conditional = |negated: bool, name: &str| Action::ConditionalExecution {
            check: Box::new(Plan::new(Action::VerifyExistence {
                description: red_box(),
            })),
            negated,
            command: Box::new(Plan::new(Action::Create {
                description: Description::conjunction(vec![term("blue", "obj.color == 'blue'")]),
                name: Some(name.into()),
            })),
        };

        let out = run(conditional(false, "B"), &lexicon, &mut world);
        assert_eq!(out.result, ExecResult::Truth(false));
        assert!(out.feedback.ends_with("So I did nothing."), "{}", out.feedback);
        assert!(world.is_empty());

        let out = run(conditional(true, "B"), &lexicon, &mut world);
        assert!(matches!(out.result, ExecResult::Created(_)));
        assert!(out.feedback.starts_with("There is no red box."), "{}", out.feedback);

        world
            .create_object(ObjectSpec::default().named("A").color("red").shape("box"))
            .unwrap();
        let out = run(conditional(false, "C"), &lexicon, &mut world);
        assert!(matches!(out.result, ExecResult::Created(_)));
        assert_eq!(world.object(world.object_by_name("C").unwrap()).unwrap().color, "blue");
    }

    #[test]
    fn conditional_on_missing_object_is_a_soft_miss() {
        let mut world = MemoryWorld::default();
        let out = run(
            Action::ConditionalExecution {
                check: Box::new(Plan::new(Action::VerifyProperty {
                    name: "ghost".into(),
                    description: red_box(),
                })),
                negated: false,
                command: Box::new(Plan::new(Action::Create {
                    description: red_box(),
                    name: None,
                })),
            },
            &Lexicon::new(),
            &mut world,
        );
        assert!(matches!(out.result, ExecResult::Miss(ExecutionMiss::NoMatch { .. })));
        assert!(world.is_empty());
    }

    #[test]
    fn hypothetical_changes_nothing() {
        let mut world = MemoryWorld::default();
        let hypothetical = Action::HypotheticalQuery {
            check: Box::new(Plan::new(Action::VerifyExistence {
                description: red_box(),
            })),
            supposition: "a red box exists".into(),
        };
        let out = run(hypothetical.clone(), &Lexicon::new(), &mut world);
        assert_eq!(out.result, ExecResult::Truth(false));
        assert_eq!(out.feedback, "If a red box exists: that would be false right now.");
        assert!(world.events().is_empty());

        world
            .create_object(ObjectSpec::default().color("red").shape("box"))
            .unwrap();
        let out = run(hypothetical, &Lexicon::new(), &mut world);
        assert_eq!(out.result, ExecResult::Truth(true));
        assert_eq!(world.events().len(), 1);
    }

    #[test]
    fn event_listing_and_windows() {
        let mut world = MemoryWorld::default();
        let lexicon = Lexicon::new();
        let empty = run(Action::ListEvents, &lexicon, &mut world);
        assert_eq!(empty.feedback, "Nothing has happened yet.");
        assert!(!empty.result.is_truthy());

        let a = world.create_object(ObjectSpec::default().named("A")).unwrap();
        world.create_object(ObjectSpec::default().named("B")).unwrap();
        world.set_owner(a, Owner::Agent).unwrap();

        let all = run(Action::ListEvents, &lexicon, &mut world);
        let ExecResult::Events(events) = &all.result else {
            panic!("expected events, got {:?}", all.result);
        };
        assert_eq!(events.len(), 3);
        assert!(all.feedback.contains("#3 (t0) A passed from world to agent"), "{}", all.feedback);

        let window = |relation, event| Action::QueryEvents { relation, event };
        let ids = |out: StepOutcome| match out.result {
            ExecResult::Events(events) => events.iter().map(|e| e.id).collect::<Vec<_>>(),
            other => panic!("expected events, got {other:?}"),
        };
        assert_eq!(ids(run(window(TemporalRelation::Before, 2), &lexicon, &mut world)), vec![1]);
        assert_eq!(ids(run(window(TemporalRelation::After, 2), &lexicon, &mut world)), vec![3]);
        assert_eq!(ids(run(window(TemporalRelation::Before, 1), &lexicon, &mut world)), Vec::<u64>::new());

        let missing = run(window(TemporalRelation::After, 9), &lexicon, &mut world);
        assert_eq!(
            missing.result,
            ExecResult::Miss(ExecutionMiss::NoMatch {
                what: "event 9".into()
            })
        );
    }

    #[test]
    fn knowledge_reports_definitions_and_listings() {
        let mut lexicon = Lexicon::new();
        lexicon.add_entry("red", WordType::Property, "obj.color == 'red'").unwrap();
        lexicon.add_entry("box", WordType::Noun, "obj.shape == 'box'").unwrap();
        lexicon
            .add_entry("bigger_than", WordType::Relation, "obj1.size > obj2.size")
            .unwrap();
        lexicon.add_entry("take", WordType::Action, "take").unwrap();
        let mut world = MemoryWorld::default();
        world
            .create_object(ObjectSpec::default().named("A").color("red"))
            .unwrap();
        let ask = |subject| Action::KnowledgeQuery { subject };

        let out = run(ask(KnowledgeSubject::Word("bigger_than".into())), &lexicon, &mut world);
        assert_eq!(
            out.result,
            ExecResult::Text("\"bigger_than\" is a relation word meaning obj1.size > obj2.size.".into())
        );
        let out = run(ask(KnowledgeSubject::Word("red".into())), &lexicon, &mut world);
        assert!(out.feedback.ends_with("It fits A."), "{}", out.feedback);
        let out = run(ask(KnowledgeSubject::Word("box".into())), &lexicon, &mut world);
        assert!(out.feedback.ends_with("Nothing fits it right now."), "{}", out.feedback);

        let out = run(ask(KnowledgeSubject::Type(WordType::Property)), &lexicon, &mut world);
        assert_eq!(out.feedback, "The property words I know: red.");
        let out = run(ask(KnowledgeSubject::Type(WordType::Pronoun)), &lexicon, &mut world);
        assert_eq!(out.feedback, "I know no pronoun words.");

        let out = run(ask(KnowledgeSubject::Everything), &lexicon, &mut world);
        assert!(out.feedback.starts_with("I know 4 words."), "{}", out.feedback);
        assert!(out.feedback.contains("\nrelation: bigger_than"), "{}", out.feedback);
        assert!(out.feedback.contains("\naction: take"), "{}", out.feedback);
        assert_eq!(world.events().len(), 1);
    }
}
