//! Persistence and recovery tests for lexagent.
//!
//! These tests verify that taught words survive an agent restart
//! (checkpoint + reload cycle) and that a damaged store never loses the
//! words that still compile.

use lexagent::agent::{ActionType, Agent};
use lexagent::config::AgentConfig;
use lexagent::lexicon::store;
use lexagent::lexicon::{Lexicon, WordType};

fn persistent_agent(dir: &std::path::Path) -> Agent {
    Agent::new(AgentConfig::with_memory(dir.join("lexicon.json"))).unwrap()
}

#[test]
fn words_survive_restart() {
    let dir = tempfile::TempDir::new().unwrap();

    // First session: teach and checkpoint.
    let taught = {
        let mut agent = persistent_agent(dir.path());
        agent.teach("red", WordType::Property, "obj.color == 'red'").unwrap();
        agent.teach("box", WordType::Noun, "obj.shape == 'box'").unwrap();
        agent
            .teach("bigger_than", WordType::Relation, "obj1.size > obj2.size")
            .unwrap();
        let count = agent.lexicon().word_count();
        agent.shutdown().unwrap();
        count
    };

    // Second session: the same words, usable immediately.
    let mut agent = persistent_agent(dir.path());
    assert_eq!(agent.lexicon().word_count(), taught);
    let entry = agent.lexicon().get_entry("BIGGER_THAN").unwrap();
    assert_eq!(entry.word_type, WordType::Relation);
    assert_eq!(entry.meaning_expression, "obj1.size > obj2.size");

    let r = agent.process("create a red box as A");
    assert_eq!(r.action, Some(ActionType::Create));
}

#[test]
fn round_trip_preserves_every_tuple() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("words.json");

    let mut lexicon = Lexicon::new();
    lexicon.add_entry("red", WordType::Property, "obj.color == 'red'").unwrap();
    lexicon
        .add_entry("near", WordType::Relation, "abs(obj1.position[0] - obj2.position[0]) <= 1")
        .unwrap();
    lexicon.add_entry("hello", WordType::Social, "greeting").unwrap();
    lexicon.add_entry("you", WordType::Pronoun, "agent").unwrap();
    lexicon.add_entry("soon", WordType::Temporal, "within a few ticks").unwrap();

    assert_eq!(store::save(&lexicon, &path).unwrap(), 5);
    let reloaded = store::load(&path).unwrap();
    assert!(reloaded.skipped.is_empty());
    assert_eq!(store::records(&reloaded.lexicon), store::records(&lexicon));
}

#[test]
fn checkpoint_replaces_previous_file() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("lexicon.json");

    let mut agent = persistent_agent(dir.path());
    agent.teach("red", WordType::Property, "obj.color == 'red'").unwrap();
    agent.checkpoint().unwrap();
    agent
        .reteach("red", WordType::Property, "obj.color == 'crimson'")
        .unwrap();
    agent.checkpoint().unwrap();

    let reloaded = store::load(&path).unwrap();
    assert_eq!(
        reloaded.lexicon.get_entry("red").unwrap().meaning_expression,
        "obj.color == 'crimson'"
    );
    // Only the lexicon file itself; no temp files left behind.
    let files = std::fs::read_dir(dir.path()).unwrap().count();
    assert_eq!(files, 1);
}

#[test]
fn records_that_no_longer_compile_are_skipped() {
    let dir = tempfile::TempDir::new().unwrap();
    let path = dir.path().join("lexicon.json");
    std::fs::write(
        &path,
        r#"[
  {"word": "red", "word_type": "property", "meaning_expression": "obj.color == 'red'"},
  {"word": "heavy", "word_type": "property", "meaning_expression": "obj.weight > 10"}
]"#,
    )
    .unwrap();

    let report = store::load(&path).unwrap();
    assert_eq!(report.loaded, 1);
    assert_eq!(report.skipped.len(), 1);
    assert_eq!(report.skipped[0].word, "heavy");
    assert!(report.lexicon.contains("red"));
}

#[test]
fn curriculum_file_teaches_in_bulk() {
    let dir = tempfile::TempDir::new().unwrap();
    let curriculum = dir.path().join("colors.txt");
    std::fs::write(
        &curriculum,
        "# colors\nproperty :: red :: obj.color == 'red'\n\nproperty :: green :: obj.color == 'green'\nnoun :: bad :: obj.mass > 1\n",
    )
    .unwrap();

    let mut config = AgentConfig::with_memory(dir.path().join("lexicon.json"));
    config.curricula.push(curriculum.clone());
    let agent = Agent::new(config).unwrap();
    assert!(agent.lexicon().contains("green"));
    assert!(!agent.lexicon().contains("bad"));
}

#[test]
fn seed_packs_from_seeds_dir() {
    let dir = tempfile::TempDir::new().unwrap();
    let pack = dir.path().join("mine");
    std::fs::create_dir_all(&pack).unwrap();
    std::fs::write(
        pack.join("seed.toml"),
        r#"
[seed]
id = "mine"
name = "Workshop words"
version = "0.1.0"

[[words]]
word = "glowing"
word_type = "property"
expression = "obj.material == 'phosphor'"
"#,
    )
    .unwrap();

    let mut config = AgentConfig::default();
    config.seeds_dir = Some(dir.path().to_path_buf());
    config.seed_packs = vec!["core".into(), "mine".into()];
    assert!(config.seed_registry().list().iter().any(|p| p.id == "mine"));

    let mut agent = Agent::new(config).unwrap();
    let entry = agent.lexicon().get_entry("glowing").unwrap();
    assert_eq!(entry.word_type, WordType::Property);
    assert_eq!(agent.process("what is glowing").action, Some(ActionType::Query));

    let mut missing = AgentConfig::default();
    missing.seed_packs = vec!["mine".into()];
    assert!(Agent::new(missing).is_err());
}
