use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use whisper_bridge::{
    host::TracingHost, protocol::DEFAULT_SERVER_ADDR, CommandSender, ServerCommand, WhisperBridge,
};

#[derive(Parser)]
#[command(name = "whisper-bridge")]
#[command(about = "Control-channel bridge for a whisper transcription server")]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Args {
    /// Log level
    #[arg(long, value_enum, default_value = "info", global = true)]
    log_level: LogLevel,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the bridge: probe the server, listen for inbound commands, and
    /// shut the server down on exit
    Run {
        /// Path to the key=value configuration file
        #[arg(long, default_value = "settings.cfg")]
        config: PathBuf,

        /// Transcription server endpoint for outbound commands
        #[arg(long, default_value_t = DEFAULT_SERVER_ADDR)]
        server: SocketAddr,
    },

    /// Send a single lifecycle command to the transcription server
    Send {
        /// Command token: start, stop or shutdown
        command: String,

        /// Transcription server endpoint
        #[arg(long, default_value_t = DEFAULT_SERVER_ADDR)]
        server: SocketAddr,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, ValueEnum, Debug)]
enum LogLevel {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
}

impl From<LogLevel> for tracing::Level {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Trace => tracing::Level::TRACE,
            LogLevel::Debug => tracing::Level::DEBUG,
            LogLevel::Info => tracing::Level::INFO,
            LogLevel::Warn => tracing::Level::WARN,
            LogLevel::Error => tracing::Level::ERROR,
        }
    }
}

/// Wait for TERM signal (Unix only)
#[cfg(unix)]
async fn wait_for_term_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    if let Ok(mut stream) = signal(SignalKind::terminate()) {
        stream.recv().await;
    }
}

#[cfg(not(unix))]
async fn wait_for_term_signal() {
    // On non-Unix systems, just wait indefinitely
    futures::future::pending::<()>().await;
}

async fn run(config: PathBuf, server: SocketAddr) -> Result<()> {
    info!("Starting whisper-bridge v{}", env!("CARGO_PKG_VERSION"));
    info!("  Configuration: {}", config.display());
    info!("  Whisper server: {server}");

    let host = Arc::new(TracingHost::new());
    let bridge = WhisperBridge::with_server_addr(host, server);

    bridge
        .initialize(&config)
        .await
        .context("Failed to initialize bridge")?;

    tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Received Ctrl+C signal");
        }
        _ = wait_for_term_signal() => {
            info!("Received TERM signal");
        }
    }

    bridge
        .shutdown()
        .await
        .context("Failed to shut the bridge down")?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    // Initialize logging
    let log_level: tracing::Level = args.log_level.into();
    tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .init();

    match args.command {
        Command::Run { config, server } => run(config, server).await,
        Command::Send { command, server } => {
            let command: ServerCommand = command.parse()?;
            let sender = CommandSender::new(server);
            if let Err(e) = sender.send(command).await {
                error!("Server command error: {e}");
                return Err(e.into());
            }
            info!("Sent: {command}");
            Ok(())
        }
    }
}
