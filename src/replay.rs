//! Statistics over games recorded by an earlier run.
//!
//! Every `game_*.json` file of a directory is loaded, in file name order, and the stats
//! callback runs once over all of them. No agent, server or generator is involved.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use tracing::{debug, info, instrument};

use crate::{
    error::{BenchError, Result},
    game::GameRecord,
    run_config::RunConfig,
    stats::CollectorTable,
};

const GAME_FILE_PREFIX: &str = "game_";
const GAME_FILE_SUFFIX: &str = ".json";

/// `<absolute dir>/game_*.json`, the label of a replay.
pub fn replay_label(dir: &Path) -> anyhow::Result<String> {
    let dir = std::path::absolute(dir)
        .with_context(|| format!("could not resolve '{}'", dir.display()))?;
    Ok(dir
        .join(format!("{GAME_FILE_PREFIX}*{GAME_FILE_SUFFIX}"))
        .display()
        .to_string())
}

/// Paths of the recorded games in `dir`, sorted by file name.
pub fn game_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("could not read games directory '{}'", dir.display()))?;
    let mut files = vec![];
    for entry in entries {
        let entry = entry.with_context(|| format!("could not list '{}'", dir.display()))?;
        let name = entry.file_name();
        let Some(name) = name.to_str() else {
            continue;
        };
        if name.starts_with(GAME_FILE_PREFIX) && name.ends_with(GAME_FILE_SUFFIX) {
            files.push(entry.path());
        }
    }
    files.sort();
    Ok(files)
}

/// Load every recorded game of `dir`.
#[instrument]
pub fn load_games(dir: &Path) -> anyhow::Result<Vec<GameRecord>> {
    let games = game_files(dir)?
        .into_iter()
        .map(|path| {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("could not read '{}'", path.display()))?;
            debug!(path = %path.display(), "game loaded");
            serde_json::from_str(content.trim_end_matches(['\r', '\n']))
                .with_context(|| format!("invalid game record in '{}'", path.display()))
        })
        .collect::<anyhow::Result<Vec<GameRecord>>>()?;
    Ok(games)
}

/// Recorded games ready to be fed to the stats callback.
#[derive(Debug, Clone)]
pub struct Replay {
    /// Run configuration, its match count set to the number of loaded games.
    pub config: RunConfig,
    pub label: String,
    pub games: Vec<GameRecord>,
}

impl Replay {
    /// Load the games of the existing-games directory of `config`.
    pub fn load(config: RunConfig) -> Result<Replay> {
        let dir = config
            .existing_games_dir
            .clone()
            .ok_or_else(|| BenchError::configuration("no existing games directory to replay"))?;
        let label =
            replay_label(&dir).map_err(|e| BenchError::configuration(format!("{e:#}")))?;
        let games = load_games(&dir).map_err(|e| BenchError::configuration(format!("{e:#}")))?;
        info!(games = games.len(), %label, "recorded games loaded");

        Ok(Replay {
            config: RunConfig {
                games: games.len(),
                ..config
            },
            label,
            games,
        })
    }

    /// Run the configured stats once over every loaded game.
    pub fn run(&self, collectors: &CollectorTable) -> Result<()> {
        collectors
            .compose(&self.config.stats, None, self.label.clone())
            .call(&self.games)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::{
        game::tests::sample_record,
        stats::{save_games, StatKind},
    };

    fn replay_config(dir: &Path, stats: &[&str]) -> RunConfig {
        RunConfig {
            ai_1: None,
            ai_2: None,
            games: 0,
            stats: stats.iter().map(|s| s.to_string()).collect(),
            save_dir: None,
            existing_games_dir: Some(dir.to_path_buf()),
            rules: None,
        }
    }

    #[test]
    fn loads_only_game_files_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        save_games(dir.path(), &[sample_record("b"), sample_record("a")]).unwrap();
        fs::write(dir.path().join("notes.txt"), "not a game").unwrap();
        fs::write(dir.path().join("game_c.json.bak"), "not a game").unwrap();

        let games = load_games(dir.path()).unwrap();
        let ids = games.iter().map(|g| g.id.as_str()).collect::<Vec<_>>();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn missing_directory_is_a_configuration_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = Replay::load(replay_config(&dir.path().join("missing"), &[])).unwrap_err();
        assert!(matches!(err, BenchError::Configuration(_)));
    }

    #[test]
    fn label_is_the_absolute_pattern() {
        let dir = tempfile::tempdir().unwrap();
        let label = replay_label(dir.path()).unwrap();
        assert!(Path::new(&label).is_absolute());
        assert!(label.ends_with("game_*.json"));
    }

    #[test]
    fn invalid_record_names_the_file() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("game_x.json"), "{\"id\":").unwrap();
        let err = load_games(dir.path()).unwrap_err();
        assert!(format!("{err:#}").contains("game_x.json"));
    }

    #[test]
    fn stats_run_once_over_every_game() {
        let dir = tempfile::tempdir().unwrap();
        let games = (0..5).map(|i| sample_record(&i.to_string())).collect::<Vec<_>>();
        save_games(dir.path(), &games).unwrap();

        let log = Arc::new(Mutex::new(vec![]));
        let table = CollectorTable::new().with(StatKind::Ranking, {
            let log = log.clone();
            move |ctx, games| {
                log.lock().unwrap().push((ctx.label.clone(), games.len()));
                Ok(())
            }
        });

        let replay = Replay::load(replay_config(dir.path(), &["ranking"])).unwrap();
        assert_eq!(replay.config.games, 5);
        replay.run(&table).unwrap();
        let log = log.lock().unwrap();
        assert_eq!(log.len(), 1);
        assert_eq!(log[0].1, 5);
        assert!(log[0].0.ends_with("game_*.json"));
    }
}
