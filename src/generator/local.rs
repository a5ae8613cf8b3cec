use std::sync::Arc;

use async_trait::async_trait;

use super::{GameGenerator, Progress};
use crate::{game::GameRecord, players::PlayerSlot, simulator::Simulator};

/// Plays every seat in-process with the [`Simulator`], one match per invocation.
#[derive(Debug, Clone)]
pub struct LocalGenerator {
    simulator: Arc<Simulator>,
    rules: Vec<String>,
}

impl LocalGenerator {
    pub fn new(simulator: Arc<Simulator>, rules: Vec<String>) -> Self {
        LocalGenerator { simulator, rules }
    }
}

#[async_trait]
impl GameGenerator for LocalGenerator {
    async fn generate(
        &self,
        players: &PlayerSlot,
        progress: &Progress,
    ) -> anyhow::Result<Vec<GameRecord>> {
        let game = self.simulator.play(&players.profiles(), &self.rules)?;
        progress.advance(1);
        // let the embedded server and signal handlers run between matches
        tokio::task::yield_now().await;
        Ok(vec![game])
    }
}
