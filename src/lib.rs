// thiserror's #[error("...{field}...")] format strings reference struct fields,
// but the compiler doesn't see through the derive macro and reports false positives.
#![allow(unused_assignments)]

//! # lexagent
//!
//! A teachable command-interpretation agent. Short utterances become typed
//! actions against a simulated object world; words the agent does not know
//! become goals to learn them, pursued one step per tick.
//!
//! ## Architecture
//!
//! - **Lexicon** (`lexicon`): word → meaning store; meanings are small predicate
//!   expressions compiled at teach time against a fixed object schema
//! - **Grammar** (`grammar`): tokenizer and command parser producing plans or
//!   unknown-word signals
//! - **World** (`world`): the object store the agent acts on
//! - **Agent** (`agent`): goal store, planner, execution engine, tick scheduler
//!   and the [`Agent`](agent::Agent) facade tying them together
//!
//! ## Library usage
//!
//! ```no_run
//! use lexagent::agent::Agent;
//! use lexagent::config::AgentConfig;
//!
//! let mut agent = Agent::new(AgentConfig::default()).unwrap();
//! agent.process(r#"teach property "red" as "obj.color == 'red'""#);
//! agent.process(r#"teach noun "box" as "obj.shape == 'box'""#);
//! agent.process("create a red box as A");
//! let reply = agent.process("what is red");
//! println!("{}", reply.feedback);
//! ```

pub mod agent;
pub mod config;
pub mod error;
pub mod grammar;
pub mod lexicon;
pub mod seeds;
pub mod world;
