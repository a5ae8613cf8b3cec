//! Embedded game server.
//!
//! Accepts TCP clients and hosts one simulated match per [`MatchRequest`] line received,
//! answering with a [`MatchReply`] line.

use std::{
    net::{Ipv4Addr, SocketAddr},
    sync::Arc,
};

use anyhow::Context;
use tokio::{
    io::BufReader,
    net::{TcpListener, TcpStream},
};
use tracing::{debug, info, instrument, warn};

use crate::{
    port_guard::PortSet,
    protocol::{read_line, write_line, MatchReply, MatchRequest},
    simulator::Simulator,
};

#[derive(Debug)]
pub struct GameServer {
    listener: TcpListener,
    simulator: Arc<Simulator>,
}

impl GameServer {
    /// Bind on localhost. `port == 0` picks any free port. The bound port is recorded in `ports`.
    #[instrument(skip(simulator, ports))]
    pub async fn bind(
        port: u16,
        simulator: Arc<Simulator>,
        ports: &PortSet,
    ) -> anyhow::Result<GameServer> {
        let listener = TcpListener::bind((Ipv4Addr::LOCALHOST, port))
            .await
            .with_context(|| format!("could not bind game server on port {port}"))?;
        let addr = listener.local_addr().context("no local address")?;
        ports.insert(addr.port());
        info!(%addr, "game server listening");
        Ok(GameServer {
            listener,
            simulator,
        })
    }

    pub fn local_addr(&self) -> anyhow::Result<SocketAddr> {
        self.listener.local_addr().context("no local address")
    }

    /// Accept clients forever, one task per client.
    pub async fn serve(self) -> anyhow::Result<()> {
        loop {
            let (stream, peer) = self
                .listener
                .accept()
                .await
                .context("could not accept client")?;
            debug!(%peer, "client connected");
            let simulator = self.simulator.clone();
            tokio::spawn(async move {
                if let Err(e) = handle_client(stream, simulator).await {
                    warn!(%peer, "client handler stopped: {e:#}");
                }
            });
        }
    }
}

async fn handle_client(stream: TcpStream, simulator: Arc<Simulator>) -> anyhow::Result<()> {
    let mut stream = BufReader::new(stream);
    while let Some(request) = read_line::<_, MatchRequest>(&mut stream).await? {
        let reply = match simulator.play(&request.seats, &request.rules) {
            Ok(game) => MatchReply::Game(game),
            Err(e) => MatchReply::Error(format!("{e:#}")),
        };
        write_line(stream.get_mut(), &reply).await?;
    }
    Ok(())
}
