//! Command line and the per-run configuration resolved from it.
//!
//! [`BenchArgs`] is the raw command line. [`RunConfig::resolve`] validates it against the
//! agent registry and normalizes it once at startup:
//!
//! - `--stats` and `--rules` are split on commas, empty tokens dropped
//! - with `--existing-games-dir`, the live-generation options (`--ai-1`, `--ai-2`,
//!   `--save-dir`, `--rules`) are cleared and `save_games` is removed from the stats:
//!   replayed games are already persisted

use std::{fmt::Display, path::PathBuf};

use clap::Parser;

use crate::{
    agent_provider::AgentRegistry,
    error::{BenchError, Result},
    stats::StatKind,
};

/// Benchmark strategy agents against each other.
#[derive(Parser, Debug, Clone, PartialEq, Eq)]
#[command(version, about)]
pub struct BenchArgs {
    /// Subject agent, playing one power
    #[arg(long = "ai-1", default_value = "dumbbot")]
    pub ai_1: String,

    /// Opponent agent, playing the six other powers
    #[arg(long = "ai-2", default_value = "random")]
    pub ai_2: String,

    /// Number of games to run
    #[arg(long, default_value_t = 10)]
    pub games: usize,

    /// Comma separated list of stats to get: cross_convoy | cross_support | ranking
    #[arg(long, default_value = "ranking")]
    pub stats: String,

    /// Directory to save games into (implies save_games)
    #[arg(long)]
    pub save_dir: Option<PathBuf>,

    /// Directory containing game_*.json files to load instead of running new games
    #[arg(long)]
    pub existing_games_dir: Option<PathBuf>,

    /// Comma separated game rules
    #[arg(long, default_value = "NO_PRESS,IGNORE_ERRORS,POWER_CHOICE")]
    pub rules: String,
}

/// Resolved configuration of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunConfig {
    pub ai_1: Option<String>,
    pub ai_2: Option<String>,
    pub games: usize,
    /// Requested stats, in order. May contain unknown names.
    pub stats: Vec<String>,
    pub save_dir: Option<PathBuf>,
    pub existing_games_dir: Option<PathBuf>,
    pub rules: Option<Vec<String>>,
}

fn split_tokens(list: &str) -> Vec<String> {
    list.split(',')
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .collect()
}

impl RunConfig {
    /// Normalize `args` and check the agent identifiers against `registry`.
    pub fn resolve(args: BenchArgs, registry: &AgentRegistry) -> Result<RunConfig> {
        let stats = split_tokens(&args.stats);

        if let Some(dir) = args.existing_games_dir {
            let save_games = StatKind::SaveGames.name();
            return Ok(RunConfig {
                ai_1: None,
                ai_2: None,
                games: 0,
                stats: stats.into_iter().filter(|s| s != save_games).collect(),
                save_dir: None,
                existing_games_dir: Some(dir),
                rules: None,
            });
        }

        for name in [&args.ai_1, &args.ai_2] {
            if !registry.contains(name) {
                return Err(BenchError::configuration(format!(
                    "unknown agent '{name}', expected one of: {}",
                    registry.names().join(" | ")
                )));
            }
        }

        Ok(RunConfig {
            ai_1: Some(args.ai_1),
            ai_2: Some(args.ai_2),
            games: args.games,
            stats,
            save_dir: args.save_dir,
            existing_games_dir: None,
            rules: Some(split_tokens(&args.rules)),
        })
    }

    /// True when games are loaded from disk instead of being played.
    pub fn is_replay(&self) -> bool {
        self.existing_games_dir.is_some()
    }

    /// Subject and opponent identifiers of a live run.
    pub fn agents(&self) -> Result<(&str, &str)> {
        match (&self.ai_1, &self.ai_2) {
            (Some(a), Some(b)) => Ok((a, b)),
            _ => Err(BenchError::configuration(
                "agents are not set when replaying existing games",
            )),
        }
    }

    pub fn rules(&self) -> &[String] {
        self.rules.as_deref().unwrap_or_default()
    }

    /// Stats as they will run: `save_games` first when a save directory is set.
    pub fn effective_stats(&self) -> Vec<String> {
        let mut stats = vec![];
        if self.save_dir.is_some() {
            stats.push(StatKind::SaveGames.name().to_string());
        }
        stats.extend(self.stats.iter().cloned());
        stats
    }
}

impl Display for RunConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        fn opt<T: Display>(value: Option<T>) -> String {
            value.map_or_else(|| "None".to_string(), |v| v.to_string())
        }
        write!(
            f,
            "--ai-1=[{}] --ai-2=[{}] --games=[{}] --stats=[{}] --save-dir=[{}] --existing-games-dir=[{}] --rules=[{}]",
            opt(self.ai_1.as_deref()),
            opt(self.ai_2.as_deref()),
            self.games,
            self.effective_stats().join(","),
            opt(self.save_dir.as_ref().map(|d| d.display())),
            opt(self.existing_games_dir.as_ref().map(|d| d.display())),
            opt(self.rules.as_ref().map(|r| r.join(","))),
        )
    }
}
