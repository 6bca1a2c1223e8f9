//! End-to-end integration tests for lexagent.
//!
//! These tests drive the agent through its conversational surface and the
//! tick loop, checking that lexicon, parser, planner, execution engine and
//! world all work together.

use lexagent::agent::{ActionType, Agent, ExecResult, GoalStatus, GoalType, TickEvent};
use lexagent::config::AgentConfig;
use lexagent::lexicon::WordType;
use lexagent::world::{ObjectSpec, Owner, World, WorldObject};

fn test_agent() -> Agent {
    let mut agent = Agent::new(AgentConfig::default()).unwrap();
    for line in [
        r#"teach property "red" as "obj.color == 'red'""#,
        r#"teach property "blue" as "obj.color == 'blue'""#,
        r#"teach noun "box" as "obj.shape == 'box'""#,
        r#"teach noun "ball" as "obj.shape == 'ball'""#,
        r#"teach relation "bigger_than" as "obj1.size > obj2.size""#,
    ] {
        let r = agent.process(line);
        assert_eq!(r.learned.len(), 1, "{line}: {}", r.feedback);
    }
    agent
}

#[test]
fn scenario_create_then_query() {
    let mut agent = test_agent();

    let created = agent.process("create a red box as A");
    assert_eq!(created.action, Some(ActionType::Create));
    let ExecResult::Created(a) = created.result else {
        panic!("expected creation: {}", created.feedback);
    };

    let query = agent.process("what is red");
    assert_eq!(query.action, Some(ActionType::Query));
    assert!(query.result.objects().contains(&a));
    assert!(query.feedback.contains("obj.color == 'red'"));

    let objects_before = agent.world().objects();
    let unknown = agent.process("what is unknown_word");
    assert_eq!(unknown.action, None);
    assert_eq!(agent.world().objects(), objects_before);
    assert_eq!(unknown.opened_goals.len(), 1);

    let goal = agent.goal(unknown.opened_goals[0]).unwrap();
    assert_eq!(goal.goal_type, GoalType::Understand);
    assert_eq!(goal.target_concept.as_deref(), Some("unknown_word"));
}

#[test]
fn relation_evaluation_between_named_objects() {
    let mut agent = test_agent();
    agent
        .world_mut()
        .create_object(ObjectSpec::default().named("A").size(8))
        .unwrap();
    agent
        .world_mut()
        .create_object(ObjectSpec::default().named("B").size(3))
        .unwrap();

    assert_eq!(agent.process("is A bigger_than B").result, ExecResult::Truth(true));
    assert_eq!(agent.process("is B bigger_than A").result, ExecResult::Truth(false));
}

#[test]
fn unknown_word_forks_without_mutation_or_duplicates() {
    let mut agent = test_agent();
    let events_before = agent.world().objects().len();

    let first = agent.process("create a glittery box");
    assert!(first.action.is_none());
    assert_eq!(first.opened_goals.len(), 1);
    assert_eq!(agent.world().objects().len(), events_before);

    let second = agent.process("create a glittery box");
    assert!(second.opened_goals.is_empty());
    let understand: Vec<_> = agent
        .active_goals()
        .into_iter()
        .filter(|g| g.target_concept.as_deref() == Some("glittery"))
        .collect();
    assert_eq!(understand.len(), 1);
}

#[test]
fn goal_closes_within_one_tick_after_teaching() {
    let mut agent = test_agent();
    let r = agent.process("take the zork");
    let id = r.opened_goals[0];

    let report = agent.tick();
    assert_eq!(report.questions().len(), 1);
    assert!(report.questions()[0].contains("zork"));

    agent.teach("zork", WordType::Noun, "obj.shape == 'zork'").unwrap();
    let report = agent.tick();
    assert_eq!(report.completed(), vec![id]);
    assert_eq!(agent.goal(id).unwrap().status, GoalStatus::Completed);
}

#[test]
fn possession_goal_retrieves_from_container_first() {
    let mut agent = test_agent();
    let world = agent.world_mut();
    let chest = world.create_object(ObjectSpec::default().named("chest")).unwrap();
    let ball = world
        .create_object(ObjectSpec::default().named("ruby").color("red").shape("ball"))
        .unwrap();
    world.put_into(ball, chest).unwrap();

    let id = agent.set_goal("I have a red ball").unwrap().opened_goals[0];
    let first = agent.tick();
    let planned = first.events.iter().find_map(|e| match e {
        TickEvent::Planned { steps, .. } => Some(steps.clone()),
        _ => None,
    });
    assert_eq!(
        planned,
        Some(vec![ActionType::RetrieveFromContainer, ActionType::Take])
    );

    agent.tick();
    assert_eq!(agent.goal(id).unwrap().status, GoalStatus::Completed);
    assert_eq!(agent.world().object(ball).unwrap().owner, Owner::Agent);
    assert_eq!(agent.world().container_of(ball), None);
}

#[test]
fn put_from_conversation_feeds_planner() {
    let mut agent = test_agent();
    agent.process("create a blue box as crate");
    agent.process("create a red ball as marble");
    let put = agent.process("put marble in crate");
    assert_eq!(put.action, Some(ActionType::Put));
    assert!(put.result.is_truthy(), "{}", put.feedback);

    let take = agent.process("take marble");
    assert!(take.result.miss().is_some());

    agent.set_goal("i have a red ball").unwrap();
    let reports = agent.run(5);
    assert_eq!(reports.len(), 2);
    let held = agent
        .world()
        .find_objects(&|o: &WorldObject| o.owner == Owner::Agent);
    assert_eq!(held.len(), 1);
}

#[test]
fn existence_goal_creates_once() {
    let mut agent = test_agent();
    let id = agent.set_goal("there is a blue ball").unwrap().opened_goals[0];
    agent.run(3);
    assert_eq!(agent.goal(id).unwrap().status, GoalStatus::Completed);
    assert_eq!(agent.world().objects().len(), 1);
}

#[test]
fn contradictory_goal_fails() {
    let mut agent = test_agent();
    let id = agent.set_goal("i have a red blue ball").unwrap().opened_goals[0];
    let report = agent.tick();
    assert_eq!(report.failed(), vec![id]);
    assert!(matches!(agent.goal(id).unwrap().status, GoalStatus::Failed { .. }));
    assert!(agent.world().objects().is_empty());
}

#[test]
fn cancellation_is_terminal_and_idempotent() {
    let mut agent = test_agent();
    let id = agent.process("what is a blorp").opened_goals[0];
    assert!(agent.cancel_goal(id).unwrap());
    assert!(!agent.cancel_goal(id).unwrap());
    assert!(agent.tick().is_idle());
}

#[test]
fn ambiguous_take_is_a_soft_miss() {
    let mut agent = test_agent();
    agent.process("create a red ball");
    agent.process("create a red ball");
    let r = agent.process("take the red ball");
    assert!(r.result.miss().is_some());
    assert!(r.feedback.contains("2 objects"));
    let held = agent
        .world()
        .find_objects(&|o: &WorldObject| o.owner == Owner::Agent);
    assert!(held.is_empty());
}

#[test]
fn social_reply_and_not_understood() {
    let mut agent = test_agent();
    agent.process(r#"teach social "hello" as "greeting""#);
    let bare = agent.process("hello");
    assert_eq!(bare.action, Some(ActionType::SocialRespond));
    assert_eq!(bare.result, ExecResult::Unit);

    agent.process(r#"teach social "response_to_hello" as "Hello there.""#);
    assert_eq!(
        agent.process("hello").result,
        ExecResult::Reply("Hello there.".into())
    );

    let muddle = agent.process("red take box");
    assert_eq!(muddle.action, Some(ActionType::NotUnderstood));
    assert!(muddle.opened_goals.is_empty());
}

#[test]
fn deeply_nested_meaning_is_refused() {
    let mut agent = test_agent();
    let depth = 200_000;
    let expression = format!("{}obj.size > 1{}", "(".repeat(depth), ")".repeat(depth));
    let r = agent.process(&format!(r#"teach property "deep" as "{expression}""#));
    assert!(r.learned.is_empty());
    assert!(r.feedback.contains("nested too deeply"), "{}", r.feedback);
    assert!(!agent.lexicon().contains("deep"));

    let shallow = format!("{}obj.size > 1{}", "(".repeat(10), ")".repeat(10));
    let r = agent.process(&format!(r#"teach property "sized" as "{shallow}""#));
    assert_eq!(r.learned, vec!["sized".to_string()]);
}

#[test]
fn refused_put_keeps_object_in_place() {
    let mut agent = test_agent();
    let gem = agent
        .world_mut()
        .create_object(ObjectSpec::default().named("gem"))
        .unwrap();
    let chest = agent
        .world_mut()
        .create_object(ObjectSpec::default().named("chest"))
        .unwrap();
    assert!(agent.process("put gem in chest").result.is_truthy());

    let refused = agent.process("put gem in gem");
    assert!(refused.result.miss().is_some());
    assert_eq!(agent.world().container_of(gem), Some(chest));
    assert_eq!(agent.world().object(gem).unwrap().position, None);
}

#[test]
fn conditional_command_checks_the_world_first() {
    let mut agent = test_agent();
    let skipped = agent.process("if there is a red box then create a blue ball as B");
    assert_eq!(skipped.action, Some(ActionType::ConditionalExecution));
    assert_eq!(skipped.result, ExecResult::Truth(false));
    assert!(agent.world().objects().is_empty());

    agent.process("create a red box as A");
    let ran = agent.process("if there is a red box then create a blue ball as B");
    assert!(matches!(ran.result, ExecResult::Created(_)), "{}", ran.feedback);
    let b = agent.world().object_by_name("B").unwrap();
    assert_eq!(agent.world().object(b).unwrap().color, "blue");

    let unless = agent.process("unless A is blue then take A");
    assert!(unless.result.is_truthy(), "{}", unless.feedback);
    let a = agent.world().object_by_name("A").unwrap();
    assert_eq!(agent.world().object(a).unwrap().owner, Owner::Agent);
}

#[test]
fn hypothetical_question_leaves_world_alone() {
    let mut agent = test_agent();
    let r = agent.process("what if a red box exists");
    assert_eq!(r.action, Some(ActionType::HypotheticalQuery));
    assert_eq!(r.result, ExecResult::Truth(false));
    assert!(agent.world().objects().is_empty());
    assert!(agent.world().events().is_empty());

    let unknown = agent.process("what if a shiny box exists");
    assert_eq!(unknown.action, None);
    assert_eq!(unknown.opened_goals.len(), 1);
}

#[test]
fn event_history_questions() {
    let mut agent = test_agent();
    agent.process("create a red box as A");
    agent.process("take A");

    let all = agent.process("list events");
    let ExecResult::Events(events) = &all.result else {
        panic!("expected events: {}", all.feedback);
    };
    assert_eq!(events.len(), 2);

    let after = agent.process("what happened after event 1");
    assert_eq!(after.action, Some(ActionType::QueryEvents));
    assert!(after.feedback.contains("A passed from world to agent"), "{}", after.feedback);
    assert!(!after.feedback.contains("was created"));

    let missing = agent.process("what happened before event 7");
    assert!(missing.result.miss().is_some());
}

#[test]
fn knowledge_questions_report_definitions() {
    let mut agent = test_agent();
    let relation = agent.process("what is bigger_than");
    assert_eq!(relation.action, Some(ActionType::KnowledgeQuery));
    assert!(relation.feedback.contains("obj1.size > obj2.size"), "{}", relation.feedback);

    let verb = agent.process("what is take");
    assert!(verb.feedback.contains("action word meaning take"), "{}", verb.feedback);

    let about = agent.process("what do you know about red");
    assert!(about.feedback.contains("obj.color == 'red'"), "{}", about.feedback);

    let listing = agent.process("list all relations");
    assert_eq!(listing.feedback, "The relation words I know: bigger_than.");

    let everything = agent.process("list all words");
    assert!(everything.feedback.contains("noun: ball, box"), "{}", everything.feedback);
}
