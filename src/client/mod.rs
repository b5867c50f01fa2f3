use std::net::SocketAddr;

use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tracing::debug;

use crate::protocol::{ServerCommand, DEFAULT_SERVER_ADDR};
use crate::{BridgeError, Result};

/// Outbound command client for the whisper transcription server.
///
/// Every send opens a fresh TCP connection, writes one raw ASCII token and
/// closes; there is no connection reuse and no response read. Delivery is
/// at-most-once with no confirmation: a missing transcription server must
/// never take the host down with it, so callers report failures and move on.
#[derive(Debug, Clone)]
pub struct CommandSender {
    server_addr: SocketAddr,
}

impl CommandSender {
    /// Create a sender targeting the given server endpoint
    pub fn new(server_addr: SocketAddr) -> Self {
        Self { server_addr }
    }

    /// The endpoint this sender connects to
    pub fn server_addr(&self) -> SocketAddr {
        self.server_addr
    }

    /// Send one lifecycle command to the transcription server.
    ///
    /// The connection is dropped on every exit path, including a failed
    /// write. No retry is attempted.
    pub async fn send(&self, command: ServerCommand) -> Result<()> {
        let mut stream = self.connect().await?;

        stream
            .write_all(command.as_bytes())
            .await
            .map_err(|source| BridgeError::Send { command, source })?;
        stream
            .flush()
            .await
            .map_err(|source| BridgeError::Send { command, source })?;

        debug!("sent '{command}' to whisper server at {}", self.server_addr);
        Ok(())
    }

    /// Diagnostic connection test: connect and immediately close.
    ///
    /// Used at initialization purely to report whether the transcription
    /// server is reachable; both outcomes are non-fatal.
    pub async fn probe(&self) -> Result<()> {
        self.connect().await.map(drop)
    }

    async fn connect(&self) -> Result<TcpStream> {
        TcpStream::connect(self.server_addr)
            .await
            .map_err(|source| BridgeError::Connect {
                addr: self.server_addr,
                source,
            })
    }
}

impl Default for CommandSender {
    fn default() -> Self {
        Self::new(DEFAULT_SERVER_ADDR)
    }
}
