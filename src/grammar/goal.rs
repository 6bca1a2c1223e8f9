//! Goal statements: `I have a red ball`, `there is a blue box`,
//! `a red box exists`, or any read-only question to keep checking.

use crate::agent::goal::GoalType;
use crate::agent::plan::{Action, Plan};
use crate::lexicon::{Lexicon, Meaning};
use crate::world::{Owner, World};

use super::error::{GrammarError, GrammarResult};
use super::lexer::{Token, tokenize};
use super::parser::{CommandParser, UnknownWordSignal, condition, content, description, shape, unknown_words};

/// A goal ready to be opened in the goal store.
#[derive(Debug, Clone, PartialEq)]
pub struct GoalRequest {
    pub goal_type: GoalType,
    pub description: String,
    pub completion_condition: Plan,
}

#[derive(Debug, Clone, PartialEq)]
pub enum GoalOutcome {
    Goal(GoalRequest),
    Unknown(UnknownWordSignal),
}

impl CommandParser {
    pub fn parse_goal(&self, text: &str, lexicon: &Lexicon, world: &dyn World) -> GrammarResult<GoalOutcome> {
        let tokens = tokenize(text, lexicon, world);
        if let Some(signal) = unknown_words(&tokens, text) {
            return Ok(GoalOutcome::Unknown(signal));
        }
        let not_a_goal = || GrammarError::NotAGoal {
            input: text.trim().to_string(),
        };
        let (goal_type, action) = goal_shape(&tokens, lexicon).ok_or_else(not_a_goal)?;
        Ok(GoalOutcome::Goal(GoalRequest {
            goal_type,
            description: text.trim().to_string(),
            completion_condition: Plan::new(action),
        }))
    }
}

fn goal_shape(tokens: &[Token], lexicon: &Lexicon) -> Option<(GoalType, Action)> {
    let words = content(tokens);

    // The subject pronoun is implied: goals are always the agent's own.
    let subject = match words.first() {
        Some(t) if matches!(lexicon.get_entry(&t.normalized).map(|e| &e.meaning), Some(Meaning::Pronoun(_))) => {
            &words[1..]
        }
        _ => &words[..],
    };

    if let [verb, rest @ ..] = subject {
        if verb.is("have") || verb.is("has") {
            return Some((
                GoalType::AchievePossession,
                Action::VerifyPossession {
                    owner: Owner::Agent,
                    description: description(rest, lexicon)?,
                },
            ));
        }
    }

    if let Some(existence @ Action::VerifyExistence { .. }) = condition(&words, lexicon) {
        return Some((GoalType::AchieveExistence, existence));
    }

    match shape(tokens, lexicon)? {
        action @ (Action::EvaluateRelation { .. } | Action::Query { .. } | Action::VerifyProperty { .. }) => {
            Some((GoalType::VerifyState, action))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::agent::plan::ActionType;
    use crate::lexicon::WordType;
    use crate::world::{MemoryWorld, ObjectSpec};

    fn lexicon() -> Lexicon {
        let mut lex = Lexicon::new();
        lex.add_entry("red", WordType::Property, "obj.color == 'red'").unwrap();
        lex.add_entry("ball", WordType::Noun, "obj.shape == 'ball'").unwrap();
        lex.add_entry("bigger_than", WordType::Relation, "obj1.size > obj2.size").unwrap();
        lex.add_entry("i", WordType::Pronoun, "user").unwrap();
        lex.add_entry("take", WordType::Action, "take").unwrap();
        lex
    }

    fn goal(text: &str) -> GrammarResult<GoalOutcome> {
        let mut world = MemoryWorld::default();
        world.create_object(ObjectSpec::default().named("A")).unwrap();
        world.create_object(ObjectSpec::default().named("B")).unwrap();
        CommandParser::new().parse_goal(text, &lexicon(), &world)
    }

    fn goal_type(text: &str) -> GoalType {
        match goal(text).unwrap() {
            GoalOutcome::Goal(req) => req.goal_type,
            other => panic!("expected a goal for {text:?}, got {other:?}"),
        }
    }

    #[test]
    fn possession_goals() {
        assert_eq!(goal_type("I have a red ball"), GoalType::AchievePossession);
        assert_eq!(goal_type("have a ball"), GoalType::AchievePossession);
        let Ok(GoalOutcome::Goal(req)) = goal("i have a red ball") else {
            panic!("expected goal");
        };
        assert_eq!(req.completion_condition.action_type(), ActionType::VerifyPossession);
        assert_eq!(req.description, "i have a red ball");
    }

    #[test]
    fn existence_goals() {
        assert_eq!(goal_type("there is a red ball"), GoalType::AchieveExistence);
        assert_eq!(goal_type("a red ball exists"), GoalType::AchieveExistence);
    }

    #[test]
    fn verify_state_goals() {
        assert_eq!(goal_type("is A bigger_than B"), GoalType::VerifyState);
        assert_eq!(goal_type("red ball"), GoalType::VerifyState);
    }

    #[test]
    fn commands_are_not_goals() {
        assert!(matches!(goal("take A"), Err(GrammarError::NotAGoal { .. })));
    }

    #[test]
    fn unknown_words_in_goal() {
        let Ok(GoalOutcome::Unknown(signal)) = goal("i have a shiny ball") else {
            panic!("expected unknown words");
        };
        assert_eq!(signal.words, vec!["shiny"]);
    }
}
