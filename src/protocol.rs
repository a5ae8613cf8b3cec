//! Wire messages and client connection to the game server.
//!
//! Messages are JSON documents, one per line. A client sends a [`MatchRequest`] and
//! reads back exactly one [`MatchReply`].

use std::net::SocketAddr;

use anyhow::{bail, Context};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use tokio::{
    io::{AsyncBufReadExt, AsyncWriteExt, BufReader},
    net::TcpStream,
    sync::Mutex,
};
use tracing::{debug, instrument};

use crate::{game::GameRecord, port_guard::PortSet, simulator::SeatProfile};

/// Ask the server to host one match.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRequest {
    /// One profile per seat, in power order.
    pub seats: Vec<SeatProfile>,
    pub rules: Vec<String>,
}

/// Answer to a [`MatchRequest`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchReply {
    Game(GameRecord),
    Error(String),
}

/// A live client connection to the game server.
#[derive(Debug)]
pub struct Connection {
    peer: SocketAddr,
    local_port: u16,
    stream: Mutex<BufReader<TcpStream>>,
}

impl Connection {
    /// Connect to `addr` and record the local port of the connection.
    #[instrument(skip(ports))]
    pub async fn connect(addr: SocketAddr, ports: &PortSet) -> anyhow::Result<Connection> {
        let stream = TcpStream::connect(addr)
            .await
            .with_context(|| format!("could not connect to game server at {addr}"))?;
        let local_port = stream.local_addr().context("no local address")?.port();
        ports.insert(local_port);
        debug!(local_port, "connected to game server");
        Ok(Connection {
            peer: addr,
            local_port,
            stream: Mutex::new(BufReader::new(stream)),
        })
    }

    pub fn peer(&self) -> SocketAddr {
        self.peer
    }

    pub fn local_port(&self) -> u16 {
        self.local_port
    }

    /// Send one message and wait for the single-line answer.
    pub async fn request<Q, R>(&self, message: &Q) -> anyhow::Result<R>
    where
        Q: Serialize,
        R: DeserializeOwned,
    {
        let mut stream = self.stream.lock().await;
        write_line(stream.get_mut(), message).await?;
        read_line(&mut *stream)
            .await?
            .context("connection closed by server")
    }
}

/// Serialize `message` as one JSON line.
pub(crate) async fn write_line<W, T>(writer: &mut W, message: &T) -> anyhow::Result<()>
where
    W: AsyncWriteExt + Unpin,
    T: Serialize,
{
    let mut line = serde_json::to_vec(message).context("could not serialize message")?;
    line.push(b'\n');
    writer
        .write_all(&line)
        .await
        .context("I/O error while sending message")?;
    writer.flush().await.context("I/O error while flushing")
}

/// Read one JSON line. `None` when the peer closed the stream.
pub(crate) async fn read_line<R, T>(reader: &mut R) -> anyhow::Result<Option<T>>
where
    R: AsyncBufReadExt + Unpin,
    T: DeserializeOwned,
{
    let mut line = String::new();
    let n = reader
        .read_line(&mut line)
        .await
        .context("error while reading stream")?;
    if n == 0 {
        return Ok(None);
    }
    let line = line.trim_end();
    if line.is_empty() {
        bail!("empty message");
    }
    serde_json::from_str(line)
        .map(Some)
        .with_context(|| format!("invalid message: {line}"))
}

/// Hands out the live connection used by the protocol generator.
#[async_trait]
pub trait ConnectionProvider: Send + Sync {
    async fn acquire(&self, ports: &PortSet) -> anyhow::Result<Connection>;
}

/// Connects to a fixed server address.
#[derive(Debug, Clone, Copy)]
pub struct TcpConnector {
    addr: SocketAddr,
}

impl TcpConnector {
    pub fn new(addr: SocketAddr) -> Self {
        TcpConnector { addr }
    }
}

#[async_trait]
impl ConnectionProvider for TcpConnector {
    async fn acquire(&self, ports: &PortSet) -> anyhow::Result<Connection> {
        Connection::connect(self.addr, ports).await
    }
}
