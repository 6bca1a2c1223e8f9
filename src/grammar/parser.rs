//! Command parser: classified tokens → a typed plan, or a request to learn.
//!
//! Shapes are tried in a fixed order and the first match wins:
//! social word, conditional, action, inquiry, relation, property check,
//! bare description. Fully known input that fits none of them becomes a
//! `NOT_UNDERSTOOD` plan.

use crate::agent::plan::{Action, Description, KnowledgeSubject, Plan, Target, Term};
use crate::lexicon::{
    ActionVerb, ConditionMarker, Connective, InquiryKind, Lexicon, Meaning, TemporalRelation, WordType,
};
use crate::world::{Owner, World};

use super::error::GrammarResult;
use super::lexer::{Role, Token, names_word_types, tokenize};
use super::teach::{TeachRequest, parse_teach};

/// Input contained words the lexicon does not know. Not an error: the
/// caller opens learning goals for them instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownWordSignal {
    /// Normalized, deduplicated, in first-occurrence order.
    pub words: Vec<String>,
    pub input: String,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseOutcome {
    Plan(Plan),
    Teach(TeachRequest),
    Unknown(UnknownWordSignal),
}

#[derive(Debug, Clone, Default)]
pub struct CommandParser;

impl CommandParser {
    pub fn new() -> Self {
        Self
    }

    /// Parse one utterance. Only a malformed teach instruction is an error.
    pub fn parse(&self, text: &str, lexicon: &Lexicon, world: &dyn World) -> GrammarResult<ParseOutcome> {
        if let Some(teach) = parse_teach(text) {
            return teach.map(ParseOutcome::Teach);
        }
        let tokens = tokenize(text, lexicon, world);
        if let Some(signal) = unknown_words(&tokens, text) {
            tracing::info!(words = ?signal.words, "input has unknown words");
            return Ok(ParseOutcome::Unknown(signal));
        }
        let action = shape(&tokens, lexicon).unwrap_or_else(|| Action::NotUnderstood {
            input: text.trim().to_string(),
        });
        tracing::debug!(action = %action.action_type(), "parsed command");
        Ok(ParseOutcome::Plan(Plan::new(action)))
    }
}

pub(super) fn unknown_words(tokens: &[Token], input: &str) -> Option<UnknownWordSignal> {
    let mut words: Vec<String> = Vec::new();
    for t in tokens.iter().filter(|t| t.role == Role::Unknown) {
        if !words.contains(&t.normalized) {
            words.push(t.normalized.clone());
        }
    }
    if words.is_empty() {
        return None;
    }
    Some(UnknownWordSignal {
        words,
        input: input.trim().to_string(),
    })
}

/// Tokens without articles.
pub(super) fn content(tokens: &[Token]) -> Vec<&Token> {
    tokens.iter().filter(|t| !t.is_article()).collect()
}

// ---------------------------------------------------------------------------
// Shapes
// ---------------------------------------------------------------------------

pub(super) fn shape(tokens: &[Token], lexicon: &Lexicon) -> Option<Action> {
    shape_words(&content(tokens), lexicon)
}

fn shape_words(content: &[&Token], lexicon: &Lexicon) -> Option<Action> {
    let first = *content.first()?;

    if content.len() == 1 && first.word_type() == Some(WordType::Social) {
        return Some(Action::SocialRespond {
            word: first.normalized.clone(),
        });
    }

    match meaning(first, lexicon) {
        Some(Meaning::Condition(ConditionMarker::If)) => return conditional(false, &content[1..], lexicon),
        Some(Meaning::Condition(ConditionMarker::Unless)) => return conditional(true, &content[1..], lexicon),
        Some(Meaning::Action(verb)) => return action(*verb, &content[1..], lexicon),
        Some(Meaning::Inquiry(kind)) => return inquiry(*kind, &content[1..], lexicon),
        _ => {}
    }

    state_check(content, lexicon)
}

/// Relation, property check, or bare description query.
fn state_check(content: &[&Token], lexicon: &Lexicon) -> Option<Action> {
    let body = strip_leading(content, &["is", "are"]);
    if let Some(i) = body.iter().position(|t| t.word_type() == Some(WordType::Relation)) {
        return relation(body, i, lexicon);
    }

    if let Some(action) = property_check(content, lexicon) {
        return Some(action);
    }

    description(content, lexicon).map(|description| Action::Query {
        description,
        definition: None,
    })
}

/// A read-only check usable after `if`, `unless` or `what if`:
/// `<pronoun> has <description>`, `there is <description>`,
/// `<description> exists`, or a state check.
pub(super) fn condition(words: &[&Token], lexicon: &Lexicon) -> Option<Action> {
    let words: Vec<&Token> = words.iter().copied().filter(|t| !t.is_article()).collect();
    match words.as_slice() {
        [who, verb, rest @ ..] if verb.is("have") || verb.is("has") => match meaning(who, lexicon)? {
            Meaning::Pronoun(owner) => Some(Action::VerifyPossession {
                owner: *owner,
                description: description(rest, lexicon)?,
            }),
            _ => None,
        },
        [there, verb, rest @ ..] if there.is("there") && (verb.is("is") || verb.is("are") || verb.is("exists")) => {
            Some(Action::VerifyExistence {
                description: description(rest, lexicon)?,
            })
        }
        [rest @ .., last] if last.is("exists") || last.is("exist") => Some(Action::VerifyExistence {
            description: description(rest, lexicon)?,
        }),
        _ => state_check(&words, lexicon),
    }
}

/// `if <check> then <command>`; `unless` runs the command when the check
/// fails. Conditionals do not nest.
fn conditional(negated: bool, rest: &[&Token], lexicon: &Lexicon) -> Option<Action> {
    let at = rest
        .iter()
        .position(|t| matches!(meaning(t, lexicon), Some(Meaning::Condition(ConditionMarker::Then))))?;
    let (check, command) = (&rest[..at], &rest[at + 1..]);
    if command
        .first()
        .is_some_and(|t| matches!(meaning(t, lexicon), Some(Meaning::Condition(_))))
    {
        return None;
    }
    let check = condition(check, lexicon)?;
    let command = match shape_words(command, lexicon)? {
        Action::HypotheticalQuery { .. } => return None,
        command => command,
    };
    Some(Action::ConditionalExecution {
        check: Box::new(Plan::new(check)),
        negated,
        command: Box::new(Plan::new(command)),
    })
}

fn temporal(token: &Token, lexicon: &Lexicon) -> Option<TemporalRelation> {
    match meaning(token, lexicon)? {
        Meaning::Temporal(relation) => Some(*relation),
        _ => None,
    }
}

/// `<before|after> event <n>`.
fn event_window(words: &[&Token], lexicon: &Lexicon) -> Option<Action> {
    match words {
        [when, event, n] if event.is("event") && n.role == Role::Number => Some(Action::QueryEvents {
            relation: temporal(when, lexicon)?,
            event: n.normalized.parse().ok()?,
        }),
        _ => None,
    }
}

/// `<word>` or an object name, after `what do you know about`.
fn knowledge_of(words: &[&Token]) -> Option<Action> {
    match words {
        [name] if name.role == Role::ObjectName => Some(Action::Identify {
            name: name.surface.clone(),
        }),
        [word] if word.word_type().is_some() => Some(Action::KnowledgeQuery {
            subject: KnowledgeSubject::Word(word.normalized.clone()),
        }),
        _ => None,
    }
}

fn action(verb: ActionVerb, rest: &[&Token], lexicon: &Lexicon) -> Option<Action> {
    match verb {
        ActionVerb::Create => {
            let (words, name) = match rest.iter().position(|t| t.is("as")) {
                Some(i) => match &rest[i + 1..] {
                    [name] if name.role == Role::Binding => (&rest[..i], Some(name.surface.clone())),
                    _ => return None,
                },
                None => (rest, None),
            };
            Some(Action::Create {
                description: description(words, lexicon)?,
                name,
            })
        }
        ActionVerb::Take => Some(Action::Take {
            target: target(rest, lexicon)?,
        }),
        ActionVerb::Destroy => Some(Action::Destroy {
            target: target(rest, lexicon)?,
        }),
        ActionVerb::Give => {
            let (what, to) = split_at(rest, &["to"]).unwrap_or((rest, &[]));
            let recipient = match to {
                [] => Owner::User,
                [who] => match meaning(who, lexicon)? {
                    Meaning::Pronoun(owner) => *owner,
                    _ => return None,
                },
                _ => return None,
            };
            Some(Action::Give {
                target: target(what, lexicon)?,
                recipient,
            })
        }
        ActionVerb::Put => {
            let (what, into) = split_at(rest, &["in", "into"])?;
            Some(Action::Put {
                target: target(what, lexicon)?,
                container: target(into, lexicon)?,
            })
        }
    }
}

fn inquiry(kind: InquiryKind, rest: &[&Token], lexicon: &Lexicon) -> Option<Action> {
    match kind {
        InquiryKind::What => {
            if let [aux, who, verb] = rest {
                if (aux.is("do") || aux.is("does")) && (verb.is("have") || verb.is("has")) {
                    return match meaning(who, lexicon)? {
                        Meaning::Pronoun(owner) => Some(Action::QueryInventory { owner: *owner }),
                        _ => None,
                    };
                }
            }
            if let [aux, _, know, about, subject @ ..] = rest {
                if (aux.is("do") || aux.is("does")) && know.is("know") && about.is("about") {
                    return knowledge_of(subject);
                }
            }
            match rest {
                [marker, supposition @ ..]
                    if matches!(meaning(marker, lexicon), Some(Meaning::Condition(ConditionMarker::If))) =>
                {
                    return Some(Action::HypotheticalQuery {
                        check: Box::new(Plan::new(condition(supposition, lexicon)?)),
                        supposition: supposition
                            .iter()
                            .map(|t| t.surface.as_str())
                            .collect::<Vec<_>>()
                            .join(" "),
                    });
                }
                [happened, window @ ..] if happened.is("happened") => return event_window(window, lexicon),
                _ => {}
            }
            let rest = strip_leading(rest, &["is", "are"]);
            match rest {
                [name] if name.role == Role::ObjectName => Some(Action::Identify {
                    name: name.surface.clone(),
                }),
                [word] => {
                    let entry = lexicon.get_entry(&word.normalized)?;
                    match entry.meaning.predicate() {
                        Some(predicate) => Some(Action::Query {
                            description: Description::conjunction(vec![Term::new(
                                entry.word.clone(),
                                predicate.clone(),
                            )]),
                            definition: Some(entry.meaning_expression.clone()),
                        }),
                        None => Some(Action::KnowledgeQuery {
                            subject: KnowledgeSubject::Word(entry.word.clone()),
                        }),
                    }
                }
                _ => Some(Action::Query {
                    description: description(rest, lexicon)?,
                    definition: None,
                }),
            }
        }
        InquiryKind::Where => Some(Action::Locate {
            target: target(strip_leading(rest, &["is", "are"]), lexicon)?,
        }),
        InquiryKind::Who => Some(Action::QueryOwner {
            target: target(strip_leading(rest, &["has", "have", "is"]), lexicon)?,
        }),
        InquiryKind::List => match rest {
            [events] if events.is("events") => Some(Action::ListEvents),
            [events, window @ ..] if events.is("events") => event_window(window, lexicon),
            [all] if all.is("all") => Some(Action::KnowledgeQuery {
                subject: KnowledgeSubject::Everything,
            }),
            [all, kind] if all.is("all") && kind.role == Role::Structural && names_word_types(&kind.normalized) => {
                let subject = match WordType::from_name(&kind.normalized) {
                    Some(word_type) => KnowledgeSubject::Type(word_type),
                    None => KnowledgeSubject::Everything,
                };
                Some(Action::KnowledgeQuery { subject })
            }
            _ => Some(Action::Query {
                description: description(strip_leading(rest, &["all"]), lexicon)?,
                definition: None,
            }),
        },
    }
}

/// `[is] A <relation> B`, also `A is <relation> B`.
fn relation(body: &[&Token], at: usize, lexicon: &Lexicon) -> Option<Action> {
    let word = body[at];
    let left = strip_trailing(&body[..at], &["is", "are"]);
    let right = &body[at + 1..];
    match (left, right) {
        ([l], [r]) if l.role == Role::ObjectName && r.role == Role::ObjectName => {
            let predicate = lexicon.get_entry(&word.normalized)?.meaning.relation()?.clone();
            Some(Action::EvaluateRelation {
                relation: word.normalized.clone(),
                predicate,
                left: l.surface.clone(),
                right: r.surface.clone(),
            })
        }
        _ => None,
    }
}

/// `is A red` or `A is red`.
fn property_check(content: &[&Token], lexicon: &Lexicon) -> Option<Action> {
    let (name, rest) = match content {
        [is, name, rest @ ..] if is.is("is") && name.role == Role::ObjectName => (name, rest),
        [name, is, rest @ ..] if is.is("is") && name.role == Role::ObjectName => (name, rest),
        _ => return None,
    };
    Some(Action::VerifyProperty {
        name: name.surface.clone(),
        description: description(rest, lexicon)?,
    })
}

// ---------------------------------------------------------------------------
// Descriptions and targets
// ---------------------------------------------------------------------------

fn meaning<'a>(token: &Token, lexicon: &'a Lexicon) -> Option<&'a Meaning> {
    match token.role {
        Role::Entry(_) => lexicon.get_entry(&token.normalized).map(|e| &e.meaning),
        _ => None,
    }
}

/// Noun and property words joined by `and`, `or` and `not`. `None` when
/// any token is not part of a description.
pub(super) fn description(tokens: &[&Token], lexicon: &Lexicon) -> Option<Description> {
    let mut alternatives: Vec<Vec<Term>> = vec![Vec::new()];
    let mut negate = false;
    for token in tokens.iter().filter(|t| !t.is_article()) {
        match meaning(token, lexicon)? {
            Meaning::Predicate(predicate) => {
                let mut term = Term::new(token.normalized.clone(), predicate.clone());
                if negate {
                    term = term.negate();
                    negate = false;
                }
                alternatives.last_mut()?.push(term);
            }
            Meaning::Operator(Connective::Not) => negate = !negate,
            Meaning::Operator(Connective::And) => {}
            Meaning::Operator(Connective::Or) => alternatives.push(Vec::new()),
            _ => return None,
        }
    }
    if negate || alternatives.iter().any(Vec::is_empty) {
        return None;
    }
    Some(Description::from_alternatives(alternatives))
}

fn target(tokens: &[&Token], lexicon: &Lexicon) -> Option<Target> {
    match tokens {
        [name] if name.role == Role::ObjectName => Some(Target::Named(name.surface.clone())),
        _ => description(tokens, lexicon).map(Target::Matching),
    }
}

fn split_at<'t, 'a>(tokens: &'t [&'a Token], words: &[&str]) -> Option<(&'t [&'a Token], &'t [&'a Token])> {
    let i = tokens.iter().position(|t| words.iter().any(|w| t.is(w)))?;
    Some((&tokens[..i], &tokens[i + 1..]))
}

pub(super) fn strip_leading<'t, 'a>(tokens: &'t [&'a Token], words: &[&str]) -> &'t [&'a Token] {
    match tokens.split_first() {
        Some((first, rest)) if words.iter().any(|w| first.is(w)) => rest,
        _ => tokens,
    }
}

fn strip_trailing<'t, 'a>(tokens: &'t [&'a Token], words: &[&str]) -> &'t [&'a Token] {
    match tokens.split_last() {
        Some((last, rest)) if words.iter().any(|w| last.is(w)) => rest,
        _ => tokens,
    }
}
