use std::{fs, path::Path};

use anyhow::Context;
use tracing::{debug, instrument};

use crate::game::GameRecord;

/// `game_<id>.json`
pub fn game_file_name(game: &GameRecord) -> String {
    format!("game_{}.json", game.id)
}

/// Write every game of the batch to `dir` as one JSON line. Existing files are overwritten.
#[instrument(skip(games), fields(games = games.len()))]
pub fn save_games(dir: &Path, games: &[GameRecord]) -> anyhow::Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("could not create save directory '{}'", dir.display()))?;
    for game in games {
        let path = dir.join(game_file_name(game));
        let mut content = serde_json::to_string(game)
            .with_context(|| format!("could not serialize game {}", game.id))?;
        content.push('\n');
        fs::write(&path, content)
            .with_context(|| format!("could not write '{}'", path.display()))?;
        debug!(path = %path.display(), "game saved");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::tests::sample_record;

    #[test]
    fn saving_twice_gives_the_same_files() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("nested");
        let games = vec![sample_record("g1"), sample_record("g2")];

        save_games(&target, &games).unwrap();
        let first = fs::read_to_string(target.join("game_g1.json")).unwrap();
        save_games(&target, &games).unwrap();
        let second = fs::read_to_string(target.join("game_g1.json")).unwrap();

        assert_eq!(first, second);
        assert_eq!(fs::read_dir(&target).unwrap().count(), 2);
        let loaded: GameRecord = serde_json::from_str(first.trim_end()).unwrap();
        assert_eq!(loaded, games[0]);
    }
}
