use std::fmt;
use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::str::FromStr;

use crate::BridgeError;

/// Fixed endpoint of the whisper transcription server's command socket
pub const DEFAULT_SERVER_ADDR: SocketAddr =
    SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 65432);

/// Default address the inbound command listener binds to
pub const DEFAULT_LISTEN_ADDRESS: IpAddr = IpAddr::V4(Ipv4Addr::LOCALHOST);

/// Default port the inbound command listener binds to
pub const DEFAULT_LISTEN_PORT: u16 = 65433;

/// Receive buffer bound for one inbound command message.
///
/// A token is exactly the byte payload of one connection's first read; there
/// is no framing or length prefix on the wire.
pub const MAX_COMMAND_BYTES: usize = 1024;

/// Lifecycle command sent to the whisper transcription server.
///
/// This is the closed outbound token set; each variant maps to the exact
/// ASCII payload the server expects. Inbound command names are arbitrary
/// strings and are not members of this set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ServerCommand {
    /// Begin recording audio
    Start,
    /// Stop recording and transcribe
    Stop,
    /// Tell the server to stop listening and exit cleanly
    Shutdown,
}

impl ServerCommand {
    /// The wire token for this command
    pub fn token(&self) -> &'static str {
        match self {
            ServerCommand::Start => "start",
            ServerCommand::Stop => "stop",
            ServerCommand::Shutdown => "shutdown",
        }
    }

    /// The raw bytes written to the outbound channel
    pub fn as_bytes(&self) -> &'static [u8] {
        self.token().as_bytes()
    }
}

impl fmt::Display for ServerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.token())
    }
}

impl FromStr for ServerCommand {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(ServerCommand::Start),
            "stop" => Ok(ServerCommand::Stop),
            "shutdown" => Ok(ServerCommand::Shutdown),
            other => Err(BridgeError::UnknownCommand(other.to_string())),
        }
    }
}
