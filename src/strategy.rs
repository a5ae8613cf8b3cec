//! Choice between remote and local match generation.
//!
//! A run is remote when one of its agent identifiers carries the [`REMOTE_MARKER`]. The
//! first protocol-capable seat, scanning from seat 0, then gets the single connection of
//! the run and matches are requested from the game server through it. Otherwise every
//! seat is played in-process by the simulator.

use std::sync::Arc;

use tracing::{info, instrument};

use crate::{
    agent::Agent,
    error::{BenchError, Result},
    generator::{GameGenerator, LocalGenerator, ProtocolGenerator},
    players::PlayerSlot,
    port_guard::PortSet,
    protocol::ConnectionProvider,
    run_config::RunConfig,
    simulator::Simulator,
    stats::{CollectorTable, StatsCallback},
};

/// Identifier token selecting remote generation.
pub const REMOTE_MARKER: &str = "daide";

/// Everything the run loop needs.
pub struct BenchmarkPlan {
    pub generator: Arc<dyn GameGenerator>,
    pub players: PlayerSlot,
    pub match_count: usize,
    pub callback: StatsCallback,
}

impl BenchmarkPlan {
    /// `1[subject]v6[opponent]`
    pub fn label(&self) -> String {
        self.players.to_string()
    }

    /// True when matches go through a server connection.
    pub fn is_remote(&self) -> bool {
        self.players.connected_seat().is_some()
    }
}

impl std::fmt::Debug for BenchmarkPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BenchmarkPlan")
            .field("players", &self.players)
            .field("match_count", &self.match_count)
            .field("callback", &self.callback)
            .finish_non_exhaustive()
    }
}

/// True if matches between `subject` and `opponent` are played through the game server.
pub fn is_remote(subject: &str, opponent: &str) -> bool {
    subject.contains(REMOTE_MARKER) || opponent.contains(REMOTE_MARKER)
}

/// Builds [`BenchmarkPlan`]s.
pub struct StrategySelector {
    simulator: Arc<Simulator>,
    connector: Arc<dyn ConnectionProvider>,
    ports: PortSet,
    collectors: CollectorTable,
    local_generator: Option<Arc<dyn GameGenerator>>,
}

impl StrategySelector {
    pub fn new(simulator: Arc<Simulator>, connector: Arc<dyn ConnectionProvider>, ports: PortSet) -> Self {
        StrategySelector {
            simulator,
            connector,
            ports,
            collectors: CollectorTable::builtin(),
            local_generator: None,
        }
    }

    /// Collectors used to compose the stats callback.
    pub fn with_collectors(mut self, collectors: CollectorTable) -> Self {
        self.collectors = collectors;
        self
    }

    /// Generator used instead of the simulator for local runs.
    pub fn with_local_generator(mut self, generator: Option<Arc<dyn GameGenerator>>) -> Self {
        self.local_generator = generator;
        self
    }

    /// Seat the agents and pick the generator for `config`.
    #[instrument(skip_all, fields(subject = %subject, opponent = %opponent))]
    pub async fn select(
        &self,
        subject: Arc<Agent>,
        opponent: Arc<Agent>,
        config: &RunConfig,
    ) -> Result<BenchmarkPlan> {
        let remote = is_remote(&subject.name, &opponent.name);
        let mut players = PlayerSlot::new(subject, opponent);
        let rules = config.rules().to_vec();

        let generator: Arc<dyn GameGenerator> = if remote {
            let seat = players.first_protocol_seat().ok_or_else(|| {
                BenchError::configuration(format!(
                    "remote generation requested for {players} but no agent speaks the protocol"
                ))
            })?;
            let connection = self
                .connector
                .acquire(&self.ports)
                .await
                .map_err(BenchError::Connection)?;
            info!(seat, server = %connection.peer(), "seat connected to game server");
            players.attach(seat, connection);
            Arc::new(ProtocolGenerator::new(rules))
        } else {
            match &self.local_generator {
                Some(generator) => generator.clone(),
                None => Arc::new(LocalGenerator::new(self.simulator.clone(), rules)),
            }
        };

        let callback = self
            .collectors
            .compose(&config.stats, config.save_dir.as_deref(), players.to_string());

        Ok(BenchmarkPlan {
            generator,
            players,
            match_count: config.games,
            callback,
        })
    }
}
