use std::time::Duration;

use anyhow::{bail, Context};
use async_trait::async_trait;
use tracing::{debug, instrument};

use super::{GameGenerator, Pacing, Progress};
use crate::{
    game::GameRecord,
    players::PlayerSlot,
    protocol::{MatchReply, MatchRequest},
};

/// Plays matches on the game server through the connected seat of the [`PlayerSlot`].
#[derive(Debug)]
pub struct ProtocolGenerator {
    rules: Vec<String>,
    pacing: Pacing,
}

impl ProtocolGenerator {
    /// Delay left to the server between two matches.
    pub const UNSYNC_WAIT: Duration = Duration::from_millis(100);

    pub fn new(rules: Vec<String>) -> Self {
        Self::with_pacing(rules, Pacing::new(Self::UNSYNC_WAIT))
    }

    pub fn with_pacing(rules: Vec<String>, pacing: Pacing) -> Self {
        ProtocolGenerator { rules, pacing }
    }

    pub fn pacing(&self) -> &Pacing {
        &self.pacing
    }
}

#[async_trait]
impl GameGenerator for ProtocolGenerator {
    #[instrument(skip_all)]
    async fn generate(
        &self,
        players: &PlayerSlot,
        progress: &Progress,
    ) -> anyhow::Result<Vec<GameRecord>> {
        let (seat, connected) = players
            .connected_seat()
            .context("no seat holds a server connection")?;
        let connection = connected
            .connection
            .as_ref()
            .context("connected seat lost its connection")?;

        self.pacing.wait().await;
        let request = MatchRequest {
            seats: players.profiles(),
            rules: self.rules.clone(),
        };
        debug!(seat, server = %connection.peer(), "requesting match");
        let reply = connection
            .request::<_, MatchReply>(&request)
            .await
            .context("match request failed");
        self.pacing.mark();

        match reply? {
            MatchReply::Game(game) => {
                progress.advance(1);
                Ok(vec![game])
            }
            MatchReply::Error(e) => bail!("server refused the match: {e}"),
        }
    }

    fn reset_pacing(&self) {
        self.pacing.reset();
    }
}
