//! # Ai Bench
//!
//! Benchmark orchestration for seven-seat strategy agents: one subject agent plays a
//! power against six copies of an opponent agent, over and over, and every produced game
//! is fed to pluggable statistics collectors.
//!
//! It provides:
//! - Agent resolution through an asynchronous factory registry ([`AgentRegistry`](crate::agent_provider::AgentRegistry))
//! - A choice between matches requested from a game server over a connection and matches
//!   simulated in-process ([`StrategySelector`](crate::strategy::StrategySelector))
//! - A run loop handing each batch of games to a composed stats callback ([`runner`])
//! - A lifecycle that always releases the network ports opened during the run ([`lifecycle`])
//! - A replay mode running the stats over games recorded by an earlier run ([`replay`])
//!
//! # Documentation Overview
//!
//! - For the process behaviors (verbosity, log file, server port, warm-up), see
//!   [`Configuration`](crate::configuration::Configuration).
//! - For the command line and its resolution, see [`run_config`].
//! - For the collectors and their ordering, see [`stats`].
//! - For implementing custom agents or match generators, see the
//!   [`AgentFactory`](crate::agent_provider::AgentFactory) and
//!   [`GameGenerator`](crate::generator::GameGenerator) traits.
//!
//! # Usage Example
//!
//! ```no_run
//! use ai_bench::prelude::*;
//!
//! fn main() -> anyhow::Result<()> {
//!     let registry = AgentRegistry::builtin(PortSet::new());
//!     let args = BenchArgs {
//!         ai_1: "dumbbot".to_string(),
//!         ai_2: "random".to_string(),
//!         games: 10,
//!         stats: "ranking,cross_support".to_string(),
//!         save_dir: None,
//!         existing_games_dir: None,
//!         rules: "NO_PRESS".to_string(),
//!     };
//!     let config = RunConfig::resolve(args, &registry)?;
//!     println!("{config}");
//!
//!     let state = Lifecycle::new(Configuration::new(), registry).run(config)?;
//!     println!("{state}");
//!     Ok(())
//! }
//! ```

pub use anyhow;

pub mod agent;
pub mod agent_provider;
pub mod configuration;
pub mod error;
pub mod game;
pub mod game_server;
pub mod generator;
pub mod lifecycle;
pub mod logger;
pub mod players;
pub mod port_guard;
pub mod protocol;
pub mod replay;
pub mod run_config;
pub mod runner;
pub mod simulator;
pub mod stats;
pub mod strategy;

/// Commonly used types and traits for quick access.
///
/// ```rust
/// use ai_bench::prelude::*;
/// ```
pub mod prelude {
    pub use crate::agent::{Agent, Capability, PlayStyle};
    pub use crate::agent_provider::{AgentFactory, AgentRegistry};
    pub use crate::configuration::Configuration;
    pub use crate::error::{BenchError, Result};
    pub use crate::game::GameRecord;
    pub use crate::generator::{GameGenerator, Progress};
    pub use crate::lifecycle::Lifecycle;
    pub use crate::logger::init_logger;
    pub use crate::players::PlayerSlot;
    pub use crate::port_guard::{PortCloser, PortSet};
    pub use crate::replay::Replay;
    pub use crate::run_config::{BenchArgs, RunConfig};
    pub use crate::runner::{RunOutcome, RunState, Termination};
    pub use crate::stats::{CollectorTable, StatKind};
}
