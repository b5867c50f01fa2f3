use std::net::SocketAddr;
use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tracing::{debug, info};

use crate::client::CommandSender;
use crate::config::BridgeConfig;
use crate::host::{HostProxy, LogLevel};
use crate::listener::CommandListener;
use crate::protocol::ServerCommand;
use crate::{BridgeError, Result};

/// Lifecycle of the bridge. One forward traversal per process; there is no
/// restart transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Uninitialized,
    Initializing,
    Listening,
    ShuttingDown,
    Stopped,
}

/// Coordinator owning both control channels and their teardown.
///
/// `initialize` probes the transcription server, loads configuration and
/// starts the inbound listener; `shutdown` stops the listener and tells the
/// server to release its own resources. The running flag and the listener
/// handle live here rather than as ambient globals, and the flag flips to
/// false strictly before the listener is signalled so the accept loop's
/// unblocking reads as intentional.
pub struct WhisperBridge<H> {
    host: Arc<H>,
    sender: CommandSender,
    running: Arc<AtomicBool>,
    shutdown_tx: broadcast::Sender<()>,
    state: Mutex<LifecycleState>,
    listener: Mutex<Option<CommandListener>>,
}

impl<H: HostProxy + 'static> WhisperBridge<H> {
    /// Create a bridge targeting the default transcription server endpoint
    pub fn new(host: Arc<H>) -> Self {
        Self::with_sender(host, CommandSender::default())
    }

    /// Create a bridge with a custom outbound target
    pub fn with_server_addr(host: Arc<H>, server_addr: SocketAddr) -> Self {
        Self::with_sender(host, CommandSender::new(server_addr))
    }

    fn with_sender(host: Arc<H>, sender: CommandSender) -> Self {
        let (shutdown_tx, _) = broadcast::channel(1);
        Self {
            host,
            sender,
            running: Arc::new(AtomicBool::new(false)),
            shutdown_tx,
            state: Mutex::new(LifecycleState::Uninitialized),
            listener: Mutex::new(None),
        }
    }

    /// Current lifecycle state
    pub async fn state(&self) -> LifecycleState {
        *self.state.lock().await
    }

    /// Whether the inbound listener became active
    pub async fn is_listening(&self) -> bool {
        self.listener.lock().await.is_some()
    }

    /// The address the inbound listener bound, if it is active
    pub async fn listen_addr(&self) -> Option<SocketAddr> {
        self.listener.lock().await.as_ref().map(|l| l.local_addr())
    }

    /// Send one lifecycle command to the transcription server, reporting a
    /// failure instead of propagating it. The triggering host action must
    /// continue unaffected when the server is missing.
    pub async fn dispatch(&self, command: ServerCommand) {
        match self.sender.send(command).await {
            Ok(()) => self
                .host
                .write_log(&format!("Sent '{command}' to whisper server"), LogLevel::Debug),
            Err(e) => self
                .host
                .write_log(&format!("Server command error: {e}"), LogLevel::Error),
        }
    }

    /// Probe the server, load configuration from `config_path` and start
    /// the inbound listener.
    ///
    /// The three steps are independent: an unreachable server or a failed
    /// bind is reported and the rest proceeds, leaving the host fully
    /// functional without that channel. Calling this more than once is a
    /// contract violation.
    pub async fn initialize(&self, config_path: &Path) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            if *state != LifecycleState::Uninitialized {
                return Err(BridgeError::InvalidState(
                    "initialize called on an already-initialized bridge",
                ));
            }
            *state = LifecycleState::Initializing;
        }

        // Reachability report only; failure must not prevent the steps below.
        match self.sender.probe().await {
            Ok(()) => self
                .host
                .write_log("Connected to whisper server", LogLevel::Info),
            Err(e) => self.host.write_log(
                &format!("Failed to connect to whisper server: {e}"),
                LogLevel::Error,
            ),
        }

        let config = BridgeConfig::load(config_path, self.host.as_ref());

        // The flag guards the accept loop, so it flips before the loop starts.
        self.running.store(true, Ordering::SeqCst);

        match CommandListener::start(
            config.listen_endpoint(),
            Arc::clone(&self.host),
            Arc::clone(&self.running),
            self.shutdown_tx.subscribe(),
        )
        .await
        {
            Ok(listener) => {
                info!("command listener active on {}", listener.local_addr());
                *self.listener.lock().await = Some(listener);
            }
            Err(e) => {
                // Inbound command support is lost; the host carries on.
                self.host
                    .write_log(&format!("Error starting listener: {e}"), LogLevel::Error);
            }
        }

        *self.state.lock().await = LifecycleState::Listening;
        Ok(())
    }

    /// Stop the inbound listener and tell the transcription server to shut
    /// down.
    ///
    /// Idempotent: once the bridge has left the listening state, further
    /// calls are no-ops — the listener is not re-closed and the `shutdown`
    /// token is not re-sent.
    pub async fn shutdown(&self) -> Result<()> {
        {
            let mut state = self.state.lock().await;
            match *state {
                LifecycleState::Initializing | LifecycleState::Listening => {
                    *state = LifecycleState::ShuttingDown;
                }
                // Never started or already torn down: nothing to do.
                _ => return Ok(()),
            }
        }

        // Ordering invariant: the flag flips before the listener is woken,
        // so the interrupted accept is classified as clean termination.
        self.running.store(false, Ordering::SeqCst);
        let _ = self.shutdown_tx.send(());

        if let Some(listener) = self.listener.lock().await.take() {
            listener.stop().await;
            debug!("command listener joined");
        }

        // Let the server release its own resources. Fire-and-forget: a
        // server that is already gone is not an error worth surfacing.
        match self.sender.send(ServerCommand::Shutdown).await {
            Ok(()) => self
                .host
                .write_log("Sent shutdown to whisper server", LogLevel::Info),
            Err(e) => self
                .host
                .write_log(&format!("Server shutdown error: {e}"), LogLevel::Error),
        }

        *self.state.lock().await = LifecycleState::Stopped;
        self.host.write_log("Whisper bridge stopped", LogLevel::Info);
        Ok(())
    }
}
