//! lexagent CLI: a teachable command-interpretation agent.

use std::io::{BufRead, Write};
use std::path::PathBuf;
use std::str::FromStr;

use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};

use lexagent::agent::{Agent, GoalId, TickEvent, TickReport};
use lexagent::config::AgentConfig;
use lexagent::lexicon::WordType;

#[derive(Parser)]
#[command(name = "lexagent", version, about = "Teachable command-interpretation agent")]
struct Cli {
    /// Agent config file (TOML).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Lexicon file. Overrides `memory_path` from the config.
    #[arg(long, global = true)]
    memory: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Talk to the agent on stdin.
    Chat,

    /// Teach one word and save the lexicon.
    Teach {
        /// noun, property, action, relation, inquiry, social, operator,
        /// conditional, pronoun or temporal.
        word_type: String,
        word: String,
        /// Meaning expression, e.g. "obj.color == 'red'".
        expression: String,

        /// Replace an existing meaning.
        #[arg(long)]
        replace: bool,
    },

    /// Teach every line of a curriculum file (`type :: word :: expression`).
    Learn { file: PathBuf },

    /// List known words.
    Words {
        /// Only words of this type.
        #[arg(long = "type")]
        word_type: Option<String>,
    },

    /// Feed a script through the agent, then tick its goals.
    Run {
        #[arg(long)]
        script: PathBuf,

        /// Ticks to run after the script.
        #[arg(long, default_value = "10")]
        ticks: usize,
    },

    /// List the seed packs available to `seed_packs`.
    Seeds,

    /// Write a default config file.
    InitConfig { path: PathBuf },
}

fn main() -> Result<()> {
    miette::set_hook(Box::new(|_| {
        Box::new(
            miette::MietteHandlerOpts::new()
                .terminal_links(true)
                .unicode(true)
                .context_lines(3)
                .build(),
        )
    }))
    .ok(); // Ignore error if hook already set (e.g., in tests)

    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => AgentConfig::load(path)?,
        None => AgentConfig::default(),
    };
    if let Some(memory) = cli.memory.clone() {
        config.memory_path = Some(memory);
    }

    let default_filter = config.log_filter.clone();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&default_filter)),
        )
        .with_writer(std::io::stderr)
        .init();

    match cli.command {
        Commands::InitConfig { path } => {
            config.save(&path)?;
            println!("Wrote default config to {}", path.display());
        }

        Commands::Seeds => {
            let registry = config.seed_registry();
            for pack in registry.list() {
                let enabled = if config.seed_packs.contains(&pack.id) { "*" } else { " " };
                println!(
                    "{enabled} {:<10} {:<8} {:>3} words  {}",
                    pack.id,
                    pack.version,
                    pack.words.len(),
                    pack.description
                );
            }
        }

        Commands::Chat => {
            let mut agent = Agent::new(config)?;
            println!(
                "lexagent ready ({} words). Teach with: teach <type> \"<word>\" as \"<expression>\". :quit to leave.",
                agent.lexicon().word_count()
            );
            let stdin = std::io::stdin();
            let mut stdout = std::io::stdout();
            let mut lines = stdin.lock().lines();
            loop {
                print!("> ");
                stdout.flush().into_diagnostic()?;
                let Some(line) = lines.next() else {
                    break;
                };
                let line = line.into_diagnostic()?;
                if handle_line(&mut agent, &line) == Flow::Quit {
                    break;
                }
            }
            finish(agent)?;
        }

        Commands::Teach {
            word_type,
            word,
            expression,
            replace,
        } => {
            let mut agent = Agent::new(config)?;
            let word_type = WordType::from_str(&word_type)?;
            let outcome = if replace {
                agent.reteach(&word, word_type, &expression)?
            } else {
                agent.teach(&word, word_type, &expression)?
            };
            println!("{word}: {outcome:?}");
            finish(agent)?;
        }

        Commands::Learn { file } => {
            let mut agent = Agent::new(config)?;
            let report = agent.learn_curriculum(&file)?;
            println!(
                "Learned {} words, {} already known, {} rejected.",
                report.learned,
                report.unchanged,
                report.failed.len()
            );
            for (line, reason) in &report.failed {
                println!("  line {line}: {reason}");
            }
            finish(agent)?;
        }

        Commands::Words { word_type } => {
            let agent = Agent::new(config)?;
            let filter = word_type
                .as_deref()
                .map(WordType::from_str)
                .transpose()?;
            let entries: Vec<_> = agent
                .lexicon()
                .iter()
                .filter(|e| filter.is_none_or(|t| e.word_type == t))
                .collect();
            println!("Words ({}):", entries.len());
            for e in entries {
                println!("  {:<16} {:<10} {}", e.word, e.word_type, e.meaning_expression);
            }
        }

        Commands::Run { script, ticks } => {
            let mut agent = Agent::new(config)?;
            let text = std::fs::read_to_string(&script).into_diagnostic()?;
            for line in text.lines() {
                let line = line.trim();
                if line.is_empty() || line.starts_with('#') {
                    continue;
                }
                println!("> {line}");
                if handle_line(&mut agent, line) == Flow::Quit {
                    break;
                }
            }
            for report in agent.run(ticks) {
                print_tick(&report);
            }
            finish(agent)?;
        }
    }

    Ok(())
}

#[derive(Debug, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// One chat line: a `:command` or an utterance for the agent.
fn handle_line(agent: &mut Agent, line: &str) -> Flow {
    let line = line.trim();
    let Some(command) = line.strip_prefix(':') else {
        if !line.is_empty() {
            println!("{}", agent.process(line).feedback);
        }
        return Flow::Continue;
    };

    let (name, arg) = command
        .split_once(char::is_whitespace)
        .map_or((command, ""), |(n, a)| (n, a.trim()));
    match name {
        "quit" | "q" | "exit" => return Flow::Quit,
        "tick" => {
            let n = arg.parse().unwrap_or(1);
            for _ in 0..n {
                print_tick(&agent.tick());
            }
        }
        "goal" => match agent.set_goal(arg) {
            Ok(response) => println!("{}", response.feedback),
            Err(e) => println!("{e}"),
        },
        "goals" => {
            for goal in agent.goals() {
                println!("  {} [{}] {}", goal.id, goal.status, goal.description);
            }
        }
        "cancel" => match arg.trim_start_matches("goal-").parse::<u64>() {
            Ok(id) => match agent.cancel_goal(GoalId(id)) {
                Ok(true) => println!("Cancelled goal-{id}."),
                Ok(false) => println!("goal-{id} was already finished."),
                Err(e) => println!("{e}"),
            },
            Err(_) => println!("usage: :cancel <goal id>"),
        },
        "words" => {
            let filter = WordType::from_str(arg).ok();
            for e in agent
                .lexicon()
                .iter()
                .filter(|e| filter.is_none_or(|t| e.word_type == t))
            {
                println!("  {:<16} {:<10} {}", e.word, e.word_type, e.meaning_expression);
            }
        }
        "save" => match agent.checkpoint() {
            Ok(n) => println!("Saved {n} words."),
            Err(e) => println!("{e}"),
        },
        _ => println!("commands: :goal <text>, :tick [n], :goals, :cancel <id>, :words [type], :save, :quit"),
    }
    Flow::Continue
}

fn print_tick(report: &TickReport) {
    for event in &report.events {
        match event {
            TickEvent::Executed { goal, outcome, .. } => println!("[{}] {goal}: {}", report.tick, outcome.feedback),
            TickEvent::Completed { goal } => println!("[{}] {goal} completed", report.tick),
            TickEvent::Failed { goal, reason } => println!("[{}] {goal} failed: {reason}", report.tick),
            TickEvent::Skipped { goal, reason } => println!("[{}] {goal} waiting: {reason}", report.tick),
            TickEvent::Planned { .. } | TickEvent::Replanning { .. } => {}
        }
    }
}

fn finish(agent: Agent) -> Result<()> {
    if let Some(path) = agent.shutdown()? {
        println!("Lexicon saved to {}", path.display());
    }
    Ok(())
}
