//! Statistics collectors and their composition into one per-batch callback.
//!
//! Collectors are named by [`StatKind`]. A [`CollectorTable`] maps each kind to its
//! implementation; [`CollectorTable::compose`] turns an ordered list of requested names
//! into a [`StatsCallback`] that runs the resolved collectors, in order, on every batch of
//! games.
//!
//! Unknown names are skipped: stats names are advisory and a name this version does not
//! know must never abort a run. When a save directory is given, `save_games` always runs
//! first so the analytic collectors only ever see batches that are already persisted.

use std::{
    collections::BTreeMap,
    fmt::Display,
    path::{Path, PathBuf},
    sync::Arc,
};

use tracing::{debug, warn};

use crate::{
    error::{BenchError, Result},
    game::GameRecord,
};

mod cross_orders;
mod ranking;
mod save_games;

pub use cross_orders::{
    cross_order_report, print_cross_convoy_stats, print_cross_support_stats, CrossOrder,
};
pub use ranking::{print_ranking_stats, ranking_report};
pub use save_games::{game_file_name, save_games};

/// Known collectors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StatKind {
    SaveGames,
    CrossConvoy,
    CrossSupport,
    Ranking,
}

impl StatKind {
    pub const ALL: [StatKind; 4] = [
        StatKind::SaveGames,
        StatKind::CrossConvoy,
        StatKind::CrossSupport,
        StatKind::Ranking,
    ];

    pub fn name(self) -> &'static str {
        match self {
            StatKind::SaveGames => "save_games",
            StatKind::CrossConvoy => "cross_convoy",
            StatKind::CrossSupport => "cross_support",
            StatKind::Ranking => "ranking",
        }
    }

    pub fn from_name(name: &str) -> Option<StatKind> {
        Self::ALL.into_iter().find(|kind| kind.name() == name)
    }
}

impl Display for StatKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

/// What every collector of a callback shares.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectorContext {
    /// Printed with every report, e.g. `1[dumbbot]v6[random]`.
    pub label: String,
    pub save_dir: Option<PathBuf>,
}

/// A collector implementation. Must not depend on anything but its inputs besides its side effects.
pub type Collector = Arc<dyn Fn(&CollectorContext, &[GameRecord]) -> anyhow::Result<()> + Send + Sync>;

/// [`StatKind`] → collector lookup table.
#[derive(Clone, Default)]
pub struct CollectorTable {
    collectors: BTreeMap<StatKind, Collector>,
}

impl CollectorTable {
    /// Table without any collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Table with the four built-in collectors.
    pub fn builtin() -> Self {
        Self::new()
            .with(StatKind::SaveGames, |ctx, games| match &ctx.save_dir {
                Some(dir) => save_games(dir, games),
                None => anyhow::bail!("no save directory configured"),
            })
            .with(StatKind::CrossConvoy, |ctx, games| {
                print_cross_convoy_stats(&ctx.label, games);
                Ok(())
            })
            .with(StatKind::CrossSupport, |ctx, games| {
                print_cross_support_stats(&ctx.label, games);
                Ok(())
            })
            .with(StatKind::Ranking, |ctx, games| {
                print_ranking_stats(&ctx.label, games);
                Ok(())
            })
    }

    /// Register (or replace) the collector of `kind`.
    pub fn with<F>(mut self, kind: StatKind, collector: F) -> Self
    where
        F: Fn(&CollectorContext, &[GameRecord]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.collectors.insert(kind, Arc::new(collector));
        self
    }

    /// Build the callback running the collectors named in `names`, in order.
    ///
    /// - unknown names, and kinds missing from the table, are skipped
    /// - with `save_dir`, `save_games` is prepended
    /// - `save_games` without `save_dir` is skipped
    pub fn compose(
        &self,
        names: &[String],
        save_dir: Option<&Path>,
        label: impl Into<String>,
    ) -> StatsCallback {
        let mut kinds = vec![];
        if save_dir.is_some() {
            kinds.push(StatKind::SaveGames);
        }
        for name in names {
            match StatKind::from_name(name) {
                Some(StatKind::SaveGames) if save_dir.is_none() => {
                    warn!("'save_games' requested without a save directory, skipping");
                }
                Some(kind) => kinds.push(kind),
                None => warn!("unknown stats '{name}', skipping"),
            }
        }

        let steps = kinds
            .into_iter()
            .filter_map(|kind| match self.collectors.get(&kind) {
                Some(collector) => Some((kind, collector.clone())),
                None => {
                    warn!("no collector registered for '{kind}', skipping");
                    None
                }
            })
            .collect::<Vec<_>>();
        debug!(steps = ?steps.iter().map(|(k, _)| k).collect::<Vec<_>>(), "stats callback composed");

        StatsCallback {
            context: CollectorContext {
                label: label.into(),
                save_dir: save_dir.map(Path::to_path_buf),
            },
            steps,
        }
    }
}

/// Build a callback from the built-in collectors. See [`CollectorTable::compose`].
pub fn compose(names: &[String], save_dir: Option<&Path>, label: impl Into<String>) -> StatsCallback {
    CollectorTable::builtin().compose(names, save_dir, label)
}

/// Runs a fixed sequence of collectors on a batch of games.
#[derive(Clone)]
pub struct StatsCallback {
    context: CollectorContext,
    steps: Vec<(StatKind, Collector)>,
}

impl StatsCallback {
    /// Collectors run by this callback, in order.
    pub fn kinds(&self) -> Vec<StatKind> {
        self.steps.iter().map(|(kind, _)| *kind).collect()
    }

    pub fn context(&self) -> &CollectorContext {
        &self.context
    }

    /// Run every collector on `games`. Stops at the first failing collector.
    pub fn call(&self, games: &[GameRecord]) -> Result<()> {
        for (kind, collector) in &self.steps {
            collector(&self.context, games).map_err(|source| BenchError::Collector {
                collector: kind.name(),
                source,
            })?;
        }
        Ok(())
    }
}

impl std::fmt::Debug for StatsCallback {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatsCallback")
            .field("context", &self.context)
            .field("steps", &self.kinds())
            .finish()
    }
}
