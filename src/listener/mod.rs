use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::io::AsyncReadExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::host::{HostProxy, LogLevel};
use crate::protocol::MAX_COMMAND_BYTES;
use crate::{BridgeError, Result};

/// Inbound command listener.
///
/// Accepts connections from the whisper transcription server, reads one
/// command name per connection and resolves it against the host's command
/// registry. Each accepted connection is handled on its own task, so a
/// stalled peer never blocks the next accept.
///
/// The accept loop runs until the coordinator flips the running flag to
/// false and broadcasts the shutdown signal; that ordering is what lets the
/// loop tell an intentional teardown apart from a genuine accept fault.
#[derive(Debug)]
pub struct CommandListener {
    local_addr: SocketAddr,
    handle: JoinHandle<()>,
}

impl CommandListener {
    /// Bind `addr` and start the accept loop.
    ///
    /// Bind failure (port in use, unusable address) returns
    /// [`BridgeError::Bind`] without the listener ever becoming active; an
    /// already-running listener on the same endpoint is unaffected.
    pub async fn start<H: HostProxy + 'static>(
        addr: SocketAddr,
        host: Arc<H>,
        running: Arc<AtomicBool>,
        shutdown_rx: broadcast::Receiver<()>,
    ) -> Result<Self> {
        host.write_log(
            &format!("Starting command listener on {addr}"),
            LogLevel::Info,
        );

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| BridgeError::Bind { addr, source })?;
        let local_addr = listener.local_addr()?;

        host.write_log("Command listener started", LogLevel::Info);

        let handle = tokio::spawn(accept_loop(listener, host, running, shutdown_rx));

        Ok(Self { local_addr, handle })
    }

    /// The address the listener actually bound (resolves port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Wait for the accept loop to finish.
    ///
    /// Only meaningful after the coordinator has flipped the running flag
    /// and broadcast shutdown; called without that, this waits forever.
    pub async fn stop(self) {
        let _ = self.handle.await;
    }
}

/// Accept inbound connections until shutdown, spawning a handler per
/// connection so accept is never blocked by a slow peer.
async fn accept_loop<H: HostProxy + 'static>(
    listener: TcpListener,
    host: Arc<H>,
    running: Arc<AtomicBool>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    while running.load(Ordering::SeqCst) {
        tokio::select! {
            _ = shutdown_rx.recv() => {
                debug!("command listener received shutdown signal");
                break;
            }
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    debug!("accepted command connection from {peer}");
                    tokio::spawn(handle_connection(stream, Arc::clone(&host)));
                }
                Err(e) => {
                    // Closed-during-shutdown is clean termination, not a fault.
                    if !running.load(Ordering::SeqCst) {
                        break;
                    }
                    host.write_log(
                        &format!("Error accepting command connection: {e}"),
                        LogLevel::Error,
                    );
                    break;
                }
            }
        }
    }

    debug!("command listener stopped");
}

/// Read one command message from the connection and dispatch it.
///
/// The whole first read (up to 1024 bytes, decoded as UTF-8) is one command
/// token; there is no delimiter and no multi-message session. The connection
/// is dropped when handling completes, including on read error.
async fn handle_connection<H: HostProxy>(mut stream: TcpStream, host: Arc<H>) {
    let mut buffer = [0u8; MAX_COMMAND_BYTES];
    let received = match stream.read(&mut buffer).await {
        Ok(n) => String::from_utf8_lossy(&buffer[..n]).into_owned(),
        Err(e) => {
            host.write_log(&format!("Error reading command: {e}"), LogLevel::Error);
            return;
        }
    };

    host.write_log(
        &format!("Received command: '{received}'"),
        LogLevel::Debug,
    );

    // Check the registry first so an unresolved name is reported as such
    // instead of surfacing as a generic execution failure.
    if host.command_exists(&received) {
        host.command_execute(&received);
    } else {
        host.write_log(
            &format!("Command '{received}' not found"),
            LogLevel::Warn,
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::host::testing::RecordingHost;
    use std::time::Duration;
    use tokio::io::AsyncWriteExt;

    struct Fixture {
        listener: CommandListener,
        host: Arc<RecordingHost>,
        running: Arc<AtomicBool>,
        shutdown_tx: broadcast::Sender<()>,
    }

    async fn start_listener() -> Fixture {
        let host = Arc::new(RecordingHost::new());
        let running = Arc::new(AtomicBool::new(true));
        let (shutdown_tx, shutdown_rx) = broadcast::channel(1);

        let listener = CommandListener::start(
            "127.0.0.1:0".parse().unwrap(),
            Arc::clone(&host),
            Arc::clone(&running),
            shutdown_rx,
        )
        .await
        .unwrap();

        Fixture {
            listener,
            host,
            running,
            shutdown_tx,
        }
    }

    async fn send_text(addr: SocketAddr, text: &str) -> TcpStream {
        let mut stream = TcpStream::connect(addr).await.unwrap();
        stream.write_all(text.as_bytes()).await.unwrap();
        stream.flush().await.unwrap();
        stream
    }

    /// Poll until `check` passes or the timeout elapses
    async fn wait_until(mut check: impl FnMut() -> bool) {
        for _ in 0..200 {
            if check() {
                return;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("condition not reached within timeout");
    }

    #[tokio::test]
    async fn test_registered_command_is_executed_once() {
        let fixture = start_listener().await;
        fixture.host.register("MyCommand");

        send_text(fixture.listener.local_addr(), "MyCommand").await;

        let host = Arc::clone(&fixture.host);
        wait_until(move || !host.executed().is_empty()).await;
        assert_eq!(fixture.host.executed(), vec!["MyCommand".to_string()]);
        assert_eq!(fixture.host.log_count_containing("not found"), 0);
    }

    #[tokio::test]
    async fn test_unregistered_command_reports_not_found() {
        let fixture = start_listener().await;

        send_text(fixture.listener.local_addr(), "MyCommand").await;

        let host = Arc::clone(&fixture.host);
        wait_until(move || host.log_count_containing("not found") > 0).await;
        assert_eq!(
            fixture.host.log_count_containing("Command 'MyCommand' not found"),
            1
        );
        assert!(fixture.host.executed().is_empty());
    }

    #[tokio::test]
    async fn test_second_bind_on_same_endpoint_fails() {
        let fixture = start_listener().await;
        let addr = fixture.listener.local_addr();

        let (tx, rx) = broadcast::channel(1);
        let host = Arc::new(RecordingHost::new());
        let err = CommandListener::start(addr, host, Arc::new(AtomicBool::new(true)), rx)
            .await
            .unwrap_err();
        assert!(matches!(err, BridgeError::Bind { .. }));
        drop(tx);

        // The first listener is unaffected and keeps dispatching.
        fixture.host.register("Still Alive");
        send_text(addr, "Still Alive").await;
        let first = Arc::clone(&fixture.host);
        wait_until(move || !first.executed().is_empty()).await;
    }

    #[tokio::test]
    async fn test_stalled_connection_does_not_block_accepts() {
        let fixture = start_listener().await;
        fixture.host.register("Prompt Command");

        // Peer that connects and never writes; its handler stays parked in
        // read while the accept loop keeps going.
        let stalled = TcpStream::connect(fixture.listener.local_addr())
            .await
            .unwrap();

        send_text(fixture.listener.local_addr(), "Prompt Command").await;

        let host = Arc::clone(&fixture.host);
        wait_until(move || !host.executed().is_empty()).await;
        drop(stalled);
    }

    #[tokio::test]
    async fn test_shutdown_signal_stops_the_loop_cleanly() {
        let fixture = start_listener().await;

        fixture.running.store(false, Ordering::SeqCst);
        fixture.shutdown_tx.send(()).unwrap();
        fixture.listener.stop().await;

        // Intentional teardown is never reported as a fault.
        assert!(fixture.host.logs_at(LogLevel::Error).is_empty());
    }

    #[tokio::test]
    async fn test_connections_are_independent() {
        let fixture = start_listener().await;
        fixture.host.register("One");
        fixture.host.register("Two");

        send_text(fixture.listener.local_addr(), "One").await;
        send_text(fixture.listener.local_addr(), "Two").await;

        let host = Arc::clone(&fixture.host);
        wait_until(move || host.executed().len() == 2).await;

        let mut executed = fixture.host.executed();
        executed.sort();
        assert_eq!(executed, vec!["One".to_string(), "Two".to_string()]);
    }
}
