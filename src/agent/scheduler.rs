//! Tick scheduler: the goal state machine.
//!
//! One [`TickScheduler::tick`] advances every active goal by at most one plan
//! step, in creation order, then reconciles completion. Plans live in a side
//! table keyed by goal id and are discarded once their goal is terminal.

use crate::lexicon::Lexicon;
use crate::world::World;

use super::exec::{ExecResult, ExecutionEngine, StepOutcome};
use super::goal::{GoalId, GoalStore, GoalType};
use super::plan::{ActionType, PlanTable};
use super::planner::Planner;

/// Something that happened to one goal during a tick.
#[derive(Debug, Clone, PartialEq)]
pub enum TickEvent {
    Planned {
        goal: GoalId,
        strategy: String,
        steps: Vec<ActionType>,
    },
    /// No plan could be built this tick; retried on the next one.
    Skipped { goal: GoalId, reason: String },
    Executed {
        goal: GoalId,
        action: ActionType,
        outcome: StepOutcome,
    },
    Completed { goal: GoalId },
    Failed { goal: GoalId, reason: String },
    /// Steps ran out without satisfying the goal; a fresh plan is built next tick.
    Replanning { goal: GoalId },
}

/// Everything one tick did, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TickReport {
    pub tick: u64,
    pub events: Vec<TickEvent>,
}

impl TickReport {
    /// Questions surfaced to the user this tick.
    pub fn questions(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                TickEvent::Executed {
                    outcome:
                        StepOutcome {
                            result: ExecResult::Question(q),
                            ..
                        },
                    ..
                } => Some(q.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Feedback lines of executed steps.
    pub fn feedback(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                TickEvent::Executed { outcome, .. } => Some(outcome.feedback.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn completed(&self) -> Vec<GoalId> {
        self.events
            .iter()
            .filter_map(|e| match e {
                TickEvent::Completed { goal } => Some(*goal),
                _ => None,
            })
            .collect()
    }

    pub fn failed(&self) -> Vec<GoalId> {
        self.events
            .iter()
            .filter_map(|e| match e {
                TickEvent::Failed { goal, .. } => Some(*goal),
                _ => None,
            })
            .collect()
    }

    pub fn is_idle(&self) -> bool {
        self.events.is_empty()
    }
}

#[derive(Debug, Default)]
pub struct TickScheduler {
    planner: Planner,
    engine: ExecutionEngine,
    plans: PlanTable,
    tick: u64,
}

impl TickScheduler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of ticks run so far.
    pub fn current_tick(&self) -> u64 {
        self.tick
    }

    pub fn plans(&self) -> &PlanTable {
        &self.plans
    }

    pub fn engine(&self) -> &ExecutionEngine {
        &self.engine
    }

    pub fn planner(&self) -> &Planner {
        &self.planner
    }

    /// Advance every active goal by one step.
    pub fn tick(&mut self, goals: &mut GoalStore, lexicon: &Lexicon, world: &mut dyn World) -> TickReport {
        self.tick += 1;
        let mut report = TickReport {
            tick: self.tick,
            events: Vec::new(),
        };

        for id in goals.active_ids() {
            self.advance(id, goals, lexicon, world, &mut report.events);
        }

        self.plans
            .retain(|id| goals.get(id).is_some_and(|g| g.is_active()));
        world.advance_clock();

        tracing::debug!(
            tick = self.tick,
            events = report.events.len(),
            active = goals.active_ids().len(),
            "tick finished"
        );
        report
    }

    fn advance(
        &mut self,
        id: GoalId,
        goals: &mut GoalStore,
        lexicon: &Lexicon,
        world: &mut dyn World,
        events: &mut Vec<TickEvent>,
    ) {
        let Some(mut goal) = goals.get(id).cloned() else {
            return;
        };
        goal.completion_condition = goal.completion_condition.with_current_meanings(lexicon);

        // A learned word closes its goal without asking again.
        if goal.goal_type == GoalType::Understand
            && goal
                .target_concept
                .as_deref()
                .is_some_and(|w| lexicon.contains(w))
        {
            self.plans.remove(id);
            if goals.complete(id) {
                events.push(TickEvent::Completed { goal: id });
            }
            return;
        }

        if !self.plans.contains(id) {
            match self.planner.plan(&goal, lexicon, world) {
                Ok(plan) => {
                    events.push(TickEvent::Planned {
                        goal: id,
                        strategy: plan.strategy.clone(),
                        steps: plan.action_types(),
                    });
                    self.plans.insert(plan);
                }
                Err(e) if e.is_contradiction() => {
                    let reason = e.reason().to_string();
                    tracing::warn!(goal = %id, %reason, "goal cannot be satisfied");
                    if goals.fail(id, reason.clone()) {
                        events.push(TickEvent::Failed { goal: id, reason });
                    }
                    return;
                }
                Err(e) => {
                    tracing::info!(goal = %id, reason = e.reason(), "planning gap, retrying next tick");
                    events.push(TickEvent::Skipped {
                        goal: id,
                        reason: e.reason().to_string(),
                    });
                    return;
                }
            }
        }

        let step = self.plans.get(id).and_then(|p| p.next_step()).cloned();
        if let Some(step) = step {
            let outcome = self.engine.execute(&step, lexicon, world);
            events.push(TickEvent::Executed {
                goal: id,
                action: step.action_type(),
                outcome,
            });
            if let Some(plan) = self.plans.get_mut(id) {
                plan.advance();
            }
        }

        if self.is_satisfied(&goal.completion_condition, lexicon, world) {
            self.plans.remove(id);
            if goals.complete(id) {
                events.push(TickEvent::Completed { goal: id });
            }
            return;
        }

        let exhausted = self.plans.get(id).is_none_or(|p| p.is_exhausted());
        if !exhausted {
            return;
        }
        if let Some(plan) = self.plans.get_mut(id).filter(|p| p.repeatable) {
            plan.rewind();
            return;
        }

        self.plans.remove(id);
        match self.planner.plan(&goal, lexicon, world) {
            Err(e) if e.is_contradiction() => {
                let reason = e.reason().to_string();
                if goals.fail(id, reason.clone()) {
                    events.push(TickEvent::Failed { goal: id, reason });
                }
            }
            _ => events.push(TickEvent::Replanning { goal: id }),
        }
    }

    /// Run the goal's completion condition. Only read-only conditions are
    /// executed; anything else counts as unsatisfied.
    fn is_satisfied(
        &self,
        condition: &super::plan::Plan,
        lexicon: &Lexicon,
        world: &mut dyn World,
    ) -> bool {
        if condition.mutates_world() {
            return false;
        }
        self.engine.execute(condition, lexicon, world).result.is_truthy()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::agent::plan::{Action, Description, Plan, Term};
    use crate::lexicon::{Arity, Predicate, WordType};
    use crate::world::{MemoryWorld, ObjectSpec, Owner, WorldObject};

    fn red_ball() -> Description {
        let term = |w: &str, e: &str| Term::new(w, Arc::new(Predicate::compile(e, Arity::Unary).unwrap()));
        Description::conjunction(vec![
            term("red", "obj.color == 'red'"),
            term("ball", "obj.shape == 'ball'"),
        ])
    }

    fn possession_goal(goals: &mut GoalStore, description: Description) -> GoalId {
        goals.open(
            GoalType::AchievePossession,
            "have a red ball",
            Plan::new(Action::VerifyPossession {
                owner: Owner::Agent,
                description,
            }),
            0,
        )
    }

    #[test]
    fn planning_gap_waits_for_a_solvable_meaning() {
        let mut goals = GoalStore::new();
        let mut lexicon = Lexicon::new();
        lexicon
            .add_entry("even_big", WordType::Property, "obj.size % 2 == 0 and obj.size > 5")
            .unwrap();
        let description = Description::conjunction(vec![Term::new(
            "even_big",
            lexicon.get_entry("even_big").unwrap().meaning.predicate().unwrap().clone(),
        )]);
        let mut world = MemoryWorld::default();
        let mut scheduler = TickScheduler::new();
        let id = possession_goal(&mut goals, description);

        for _ in 0..2 {
            let report = scheduler.tick(&mut goals, &lexicon, &mut world);
            assert!(matches!(report.events.as_slice(), [TickEvent::Skipped { goal, .. }] if *goal == id));
            assert!(goals.get(id).unwrap().is_active());
        }
        assert!(world.is_empty());

        lexicon
            .add_entry_with("even_big", WordType::Property, "obj.size == 8", true)
            .unwrap();
        scheduler.tick(&mut goals, &lexicon, &mut world);
        let report = scheduler.tick(&mut goals, &lexicon, &mut world);
        assert_eq!(report.completed(), vec![id]);
        let held = world.find_objects(&|o: &WorldObject| o.owner == Owner::Agent);
        assert_eq!(held.len(), 1);
        assert_eq!(world.object(held[0]).unwrap().size, 8);
    }

    #[test]
    fn understand_goal_asks_until_taught() {
        let mut goals = GoalStore::new();
        let mut lexicon = Lexicon::new();
        let mut world = MemoryWorld::default();
        let mut scheduler = TickScheduler::new();
        let (id, _) = goals.open_understand("zork", 0);

        for _ in 0..3 {
            let report = scheduler.tick(&mut goals, &lexicon, &mut world);
            assert_eq!(report.questions().len(), 1);
            assert!(goals.get(id).unwrap().is_active());
        }

        lexicon.add_entry("zork", WordType::Noun, "obj.shape == 'zork'").unwrap();
        let report = scheduler.tick(&mut goals, &lexicon, &mut world);
        assert_eq!(report.completed(), vec![id]);
        assert!(report.questions().is_empty());
        assert!(scheduler.plans().is_empty());
    }

    #[test]
    fn possession_takes_one_step_per_tick() {
        let mut goals = GoalStore::new();
        let lexicon = Lexicon::new();
        let mut world = MemoryWorld::default();
        let mut scheduler = TickScheduler::new();
        let id = possession_goal(&mut goals, red_ball());

        let first = scheduler.tick(&mut goals, &lexicon, &mut world);
        assert!(matches!(
            first.events.as_slice(),
            [TickEvent::Planned { .. }, TickEvent::Executed { action: ActionType::Create, .. }]
        ));
        assert!(goals.get(id).unwrap().is_active());

        let second = scheduler.tick(&mut goals, &lexicon, &mut world);
        assert_eq!(second.completed(), vec![id]);
        let held = world.find_objects(&|o: &WorldObject| o.owner == Owner::Agent);
        assert_eq!(held.len(), 1);
    }

    #[test]
    fn contained_candidate_is_retrieved_then_taken() {
        let mut goals = GoalStore::new();
        let lexicon = Lexicon::new();
        let mut world = MemoryWorld::default();
        let chest = world.create_object(ObjectSpec::default().named("chest")).unwrap();
        let ball = world
            .create_object(ObjectSpec::default().named("ruby").color("red").shape("ball"))
            .unwrap();
        world.put_into(ball, chest).unwrap();
        let mut scheduler = TickScheduler::new();
        let id = possession_goal(&mut goals, red_ball());

        let first = scheduler.tick(&mut goals, &lexicon, &mut world);
        assert!(first.events.iter().any(|e| matches!(
            e,
            TickEvent::Executed { action: ActionType::RetrieveFromContainer, .. }
        )));
        assert_eq!(world.container_of(ball), None);

        scheduler.tick(&mut goals, &lexicon, &mut world);
        assert!(!goals.get(id).unwrap().is_active());
        assert_eq!(world.object(ball).unwrap().owner, Owner::Agent);
    }

    #[test]
    fn already_satisfied_goal_completes_without_steps() {
        let mut goals = GoalStore::new();
        let lexicon = Lexicon::new();
        let mut world = MemoryWorld::default();
        world
            .create_object(ObjectSpec::default().color("red").shape("ball").owner(Owner::Agent))
            .unwrap();
        let mut scheduler = TickScheduler::new();
        let id = possession_goal(&mut goals, red_ball());

        let report = scheduler.tick(&mut goals, &lexicon, &mut world);
        assert_eq!(report.completed(), vec![id]);
        assert!(report.feedback().is_empty());
    }

    #[test]
    fn contradiction_fails_goal() {
        let mut goals = GoalStore::new();
        let lexicon = Lexicon::new();
        let mut world = MemoryWorld::default();
        let term = |w: &str, e: &str| Term::new(w, Arc::new(Predicate::compile(e, Arity::Unary).unwrap()));
        let impossible = Description::conjunction(vec![
            term("red", "obj.color == 'red'"),
            term("blue", "obj.color == 'blue'"),
        ]);
        let mut scheduler = TickScheduler::new();
        let id = possession_goal(&mut goals, impossible);

        let report = scheduler.tick(&mut goals, &lexicon, &mut world);
        assert_eq!(report.failed(), vec![id]);
        assert!(world.objects().is_empty());
    }

    #[test]
    fn cancelled_goal_is_dropped() {
        let mut goals = GoalStore::new();
        let lexicon = Lexicon::new();
        let mut world = MemoryWorld::default();
        let mut scheduler = TickScheduler::new();
        let (id, _) = goals.open_understand("zork", 0);
        scheduler.tick(&mut goals, &lexicon, &mut world);
        assert!(scheduler.plans().contains(id));

        assert!(goals.cancel(id));
        assert!(!goals.cancel(id));
        let report = scheduler.tick(&mut goals, &lexicon, &mut world);
        assert!(report.is_idle());
        assert!(scheduler.plans().is_empty());
    }

    #[test]
    fn goals_advance_in_creation_order() {
        let mut goals = GoalStore::new();
        let lexicon = Lexicon::new();
        let mut world = MemoryWorld::default();
        let mut scheduler = TickScheduler::new();
        let (first, _) = goals.open_understand("alpha", 0);
        let (second, _) = goals.open_understand("beta", 0);

        let report = scheduler.tick(&mut goals, &lexicon, &mut world);
        let order: Vec<GoalId> = report
            .events
            .iter()
            .filter_map(|e| match e {
                TickEvent::Executed { goal, .. } => Some(*goal),
                _ => None,
            })
            .collect();
        assert_eq!(order, vec![first, second]);
    }
}
