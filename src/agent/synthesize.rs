//! Object synthesis: derive attributes for a new object from a description.
//!
//! Each positive term contributes the simple constraints it can express
//! (`obj.color == 'red'`, `obj.size > 6`, ...). Unset attributes keep the
//! schema defaults. The candidate is then checked against the full
//! description, so negations and complex predicates are honoured even when
//! they could not be solved directly.

use std::collections::BTreeMap;

use crate::lexicon::expr::{Attr, Constraint, Literal};
use crate::world::{ObjectId, ObjectSpec, Owner, DEFAULT_SIZE};

use super::plan::{Description, Term};

/// Why no object can be built for a description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unsatisfiable {
    /// Not enough is known to build one yet.
    Gap(String),
    /// The description contradicts itself.
    Contradiction(String),
}

impl Description {
    /// Attributes for a new object satisfying this description.
    ///
    /// Alternatives are tried in order; the first satisfiable one wins.
    pub fn synthesize(&self, name: Option<&str>) -> Result<ObjectSpec, Unsatisfiable> {
        let base = ObjectSpec {
            name: name.map(str::to_string),
            ..ObjectSpec::default()
        };
        if self.is_empty() {
            return Ok(base);
        }

        let mut first_gap = None;
        let mut contradictions = Vec::new();
        for alternative in self.alternatives() {
            match synthesize_conjunction(alternative, base.clone()) {
                Ok(spec) => return Ok(spec),
                Err(Unsatisfiable::Gap(reason)) => {
                    first_gap.get_or_insert(reason);
                }
                Err(Unsatisfiable::Contradiction(reason)) => contradictions.push(reason),
            }
        }
        match first_gap {
            Some(reason) => Err(Unsatisfiable::Gap(reason)),
            None => Err(Unsatisfiable::Contradiction(contradictions.join("; "))),
        }
    }
}

fn literal_text(lit: &Literal) -> String {
    match lit {
        Literal::Bool(b) => b.to_string(),
        Literal::Int(n) => n.to_string(),
        Literal::Str(s) => format!("'{s}'"),
        Literal::Null => "None".into(),
    }
}

fn synthesize_conjunction(terms: &[Term], mut spec: ObjectSpec) -> Result<ObjectSpec, Unsatisfiable> {
    let mut assigned: BTreeMap<&'static str, (Literal, &str)> = BTreeMap::new();
    let mut min_size = i64::MIN;
    let mut max_size = i64::MAX;
    let mut size_exact: Option<i64> = None;
    let mut unsolved = Vec::new();

    for term in terms.iter().filter(|t| !t.negated) {
        let Some(constraints) = term.predicate.constraints() else {
            unsolved.push(term.word.as_str());
            continue;
        };
        for constraint in constraints {
            match constraint {
                Constraint::SizeAtLeast(n) => min_size = min_size.max(n),
                Constraint::SizeAtMost(n) => max_size = max_size.min(n),
                Constraint::Equals(Attr::Size, Literal::Int(n)) => {
                    if let Some(prev) = size_exact {
                        if prev != n {
                            return Err(Unsatisfiable::Contradiction(format!(
                                "size cannot be both {prev} and {n} ({})",
                                term.word
                            )));
                        }
                    }
                    size_exact = Some(n);
                }
                Constraint::Equals(Attr::Position, _) => unsolved.push(term.word.as_str()),
                Constraint::Equals(attr, lit) => {
                    if let Some((prev, by)) = assigned.get(attr.as_str()) {
                        if *prev != lit {
                            return Err(Unsatisfiable::Contradiction(format!(
                                "{} cannot be both {} ({by}) and {} ({})",
                                attr.as_str(),
                                literal_text(prev),
                                literal_text(&lit),
                                term.word
                            )));
                        }
                    }
                    assigned.insert(attr.as_str(), (lit, term.word.as_str()));
                }
            }
        }
    }

    if min_size > max_size {
        return Err(Unsatisfiable::Contradiction(format!(
            "size must be at least {min_size} and at most {max_size}"
        )));
    }
    if let Some(n) = size_exact {
        if n < min_size || n > max_size {
            return Err(Unsatisfiable::Contradiction(format!(
                "size {n} is outside the required range"
            )));
        }
    }
    spec.size = Some(size_exact.unwrap_or_else(|| DEFAULT_SIZE.clamp(min_size, max_size)));

    for (attr, (lit, word)) in &assigned {
        let text = match lit {
            Literal::Str(s) => s.clone(),
            _ => {
                unsolved.push(*word);
                continue;
            }
        };
        match *attr {
            "name" => {
                if spec.name.is_none() {
                    spec.name = Some(text);
                }
            }
            "shape" => spec.shape = Some(text),
            "color" => spec.color = Some(text),
            "material" => spec.material = Some(text),
            "owner" => match Owner::from_label(&text) {
                Some(owner) => spec.owner = Some(owner),
                None => {
                    return Err(Unsatisfiable::Contradiction(format!(
                        "'{text}' is not a possible owner ({word})"
                    )));
                }
            },
            _ => unsolved.push(*word),
        }
    }

    let candidate = spec.build(ObjectId(0), "candidate", Some((0, 0)));
    let failing: Vec<&Term> = terms.iter().filter(|t| !t.matches(&candidate)).collect();
    if failing.is_empty() {
        return Ok(spec);
    }

    // A negated term ruled out by an assignment another term forced.
    for term in &failing {
        if term.negated && !unsolved.contains(&term.word.as_str()) {
            if let Some(constraints) = term.predicate.constraints() {
                let forced = constraints.iter().all(|c| match c {
                    Constraint::Equals(attr, lit) => assigned
                        .get(attr.as_str())
                        .is_some_and(|(l, _)| l == lit),
                    _ => false,
                });
                if forced && !constraints.is_empty() {
                    return Err(Unsatisfiable::Contradiction(format!(
                        "something cannot be both {0} and not {0}",
                        term.word
                    )));
                }
            }
        }
    }

    let words: Vec<&str> = failing.iter().map(|t| t.word.as_str()).collect();
    Err(Unsatisfiable::Gap(format!(
        "I don't know how to make something that is {}",
        words.join(" and ")
    )))
}
