//! Planner: turn a goal into an ordered list of executable steps.
//!
//! Plans are derived from the goal's completion condition, which carries the
//! description being pursued. Possession planning is container-aware: an
//! unowned match sitting inside another object gets a retrieval step before
//! the take.

use crate::lexicon::Lexicon;
use crate::world::{ObjectId, Owner, World, WorldObject};

use super::error::{PlanningError, PlanningResult};
use super::goal::{Goal, GoalType};
use super::plan::{Action, Description, Plan, PlanSequence, Target};
use super::synthesize::Unsatisfiable;

/// A possession candidate with its ranking key.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
struct Candidate {
    depth: usize,
    id: ObjectId,
}

#[derive(Debug, Clone, Default)]
pub struct Planner;

impl Planner {
    pub fn new() -> Self {
        Self
    }

    pub fn plan(&self, goal: &Goal, lexicon: &Lexicon, world: &dyn World) -> PlanningResult<PlanSequence> {
        let plan = match goal.goal_type {
            GoalType::Understand => self.plan_understand(goal, lexicon),
            GoalType::AchievePossession => match &goal.completion_condition.action {
                Action::VerifyPossession { description, .. } => {
                    self.plan_possession(goal, description, world)
                }
                _ => Err(malformed(goal)),
            },
            GoalType::AchieveExistence => match &goal.completion_condition.action {
                Action::VerifyExistence { description } => self.plan_existence(goal, description, world),
                _ => Err(malformed(goal)),
            },
            GoalType::VerifyState => Ok(PlanSequence::new(
                goal.id,
                vec![goal.completion_condition.clone()],
                "check once",
            )),
        }?;
        tracing::debug!(
            goal = %goal.id,
            strategy = %plan.strategy,
            steps = ?plan.action_types(),
            "plan ready"
        );
        Ok(plan)
    }

    fn plan_understand(&self, goal: &Goal, lexicon: &Lexicon) -> PlanningResult<PlanSequence> {
        let word = goal.target_concept.clone().unwrap_or_default();
        if lexicon.contains(&word) {
            return Ok(PlanSequence::new(goal.id, Vec::new(), "already known"));
        }
        let question = goal
            .inquiry_question
            .clone()
            .unwrap_or_else(|| super::goal::understand_question(&word));
        Ok(PlanSequence::new(
            goal.id,
            vec![Plan::new(Action::OutputQuestion { word, question })],
            "ask for a definition",
        )
        .repeatable())
    }

    fn plan_possession(
        &self,
        goal: &Goal,
        description: &Description,
        world: &dyn World,
    ) -> PlanningResult<PlanSequence> {
        let matches = world.find_objects(&|o: &WorldObject| description.matches(o));

        let owned = matches
            .iter()
            .any(|&id| world.object(id).is_some_and(|o| o.owner == Owner::Agent));
        if owned {
            return Ok(PlanSequence::new(goal.id, Vec::new(), "already held"));
        }

        // Free objects first, then shallower containment, then oldest.
        let best = matches
            .iter()
            .filter(|&&id| world.object(id).is_some_and(|o| o.owner == Owner::World))
            .map(|&id| Candidate {
                depth: world.containment_depth(id),
                id,
            })
            .min();

        if let Some(candidate) = best {
            let Some(object) = world.object(candidate.id) else {
                return Err(malformed(goal));
            };
            let name = object.name.clone();
            let take = Plan::new(Action::Take {
                target: Target::Named(name.clone()),
            });
            return match world.container_of(candidate.id).and_then(|c| world.object(c)) {
                Some(container) => Ok(PlanSequence::new(
                    goal.id,
                    vec![
                        Plan::new(Action::RetrieveFromContainer {
                            target: name,
                            container: container.name.clone(),
                        }),
                        take,
                    ],
                    format!("retrieve from {} then take", container.name),
                )),
                None => Ok(PlanSequence::new(goal.id, vec![take], "take existing")),
            };
        }

        let name = fresh_name(description, world);
        description
            .synthesize(Some(&name))
            .map_err(|u| unsatisfiable(goal, u))?;
        Ok(PlanSequence::new(
            goal.id,
            vec![
                Plan::new(Action::Create {
                    description: description.clone(),
                    name: Some(name.clone()),
                }),
                Plan::new(Action::Take {
                    target: Target::Named(name),
                }),
            ],
            "create then take",
        ))
    }

    fn plan_existence(
        &self,
        goal: &Goal,
        description: &Description,
        world: &dyn World,
    ) -> PlanningResult<PlanSequence> {
        if !world.find_objects(&|o: &WorldObject| description.matches(o)).is_empty() {
            return Ok(PlanSequence::new(goal.id, Vec::new(), "already exists"));
        }
        description
            .synthesize(None)
            .map_err(|u| unsatisfiable(goal, u))?;
        Ok(PlanSequence::new(
            goal.id,
            vec![Plan::new(Action::Create {
                description: description.clone(),
                name: None,
            })],
            "create",
        ))
    }
}

fn malformed(goal: &Goal) -> PlanningError {
    PlanningError::Gap {
        goal_id: goal.id,
        reason: format!("{} goal has no usable completion condition", goal.goal_type),
    }
}

fn unsatisfiable(goal: &Goal, u: Unsatisfiable) -> PlanningError {
    match u {
        Unsatisfiable::Gap(reason) => PlanningError::Gap {
            goal_id: goal.id,
            reason,
        },
        Unsatisfiable::Contradiction(reason) => PlanningError::Contradiction {
            goal_id: goal.id,
            reason,
        },
    }
}

/// A name built from the description words that no object uses yet,
/// e.g. `red_box_1`.
fn fresh_name(description: &Description, world: &dyn World) -> String {
    let mut stem = description
        .alternatives()
        .first()
        .map(|alt| {
            alt.iter()
                .filter(|t| !t.negated)
                .map(|t| t.word.as_str())
                .collect::<Vec<_>>()
                .join("_")
        })
        .unwrap_or_default();
    if stem.is_empty() {
        stem = "thing".into();
    }
    (1..)
        .map(|n| format!("{stem}_{n}"))
        .find(|candidate| world.object_by_name(candidate).is_none())
        .unwrap_or(stem)
}
