//! Whisper Bridge - a control-channel relay for a speech-transcription server
//!
//! This crate bridges a voice-command host application and an external
//! whisper transcription server over two independent TCP channels:
//!
//! - An outbound channel for short lifecycle commands (`start`, `stop`,
//!   `shutdown`) sent to the transcription server, one connection per send
//! - An inbound channel the bridge listens on, where the transcription
//!   server delivers recognized command names for the host to execute
//! - A lifecycle coordinator owning startup, the running flag, and graceful
//!   teardown of both channels
//! - A `key=value` configuration loader for the inbound listener endpoint
//!
//! # Example
//!
//! ```rust,no_run
//! use std::path::Path;
//! use std::sync::Arc;
//! use whisper_bridge::{host::TracingHost, WhisperBridge};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let host = Arc::new(TracingHost::new());
//!     let bridge = WhisperBridge::new(host);
//!
//!     // Probe the transcription server, load settings, start listening.
//!     bridge.initialize(Path::new("settings.cfg")).await?;
//!
//!     // ... host runs until it decides to exit ...
//!
//!     // Stop the listener and tell the transcription server to exit.
//!     bridge.shutdown().await?;
//!     Ok(())
//! }
//! ```

pub mod bridge;
pub mod client;
pub mod config;
pub mod host;
pub mod listener;
pub mod protocol;

// Re-export commonly used types for convenience
pub use bridge::{LifecycleState, WhisperBridge};
pub use client::CommandSender;
pub use config::BridgeConfig;
pub use host::{HostProxy, LogLevel, TracingHost};
pub use listener::CommandListener;
pub use protocol::ServerCommand;

use std::net::SocketAddr;
use thiserror::Error;

/// Errors that can occur in the whisper-bridge subsystem
#[derive(Error, Debug)]
pub enum BridgeError {
    /// Could not connect to the transcription server
    #[error("failed to connect to whisper server at {addr}: {source}")]
    Connect {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// Connected but could not write the command token
    #[error("failed to send '{command}' to whisper server: {source}")]
    Send {
        command: ServerCommand,
        source: std::io::Error,
    },

    /// Could not bind the inbound command listener
    #[error("failed to bind command listener on {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    /// Not a member of the outbound command set
    #[error("unknown server command '{0}' (expected start, stop, or shutdown)")]
    UnknownCommand(String),

    /// Lifecycle contract violation (e.g. initializing twice)
    #[error("invalid lifecycle transition: {0}")]
    InvalidState(&'static str),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for whisper-bridge operations
pub type Result<T> = std::result::Result<T, BridgeError>;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
