use tracing::{debug, error, info, warn};

/// Severity of a host-facing log report.
///
/// The original host displayed these as grey/blue/orange/red message
/// categories; the bridge only distinguishes the four levels.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

/// Narrow interface to the voice-command host application.
///
/// The bridge never talks to the host directly; everything it needs is this
/// trait: a fire-and-forget log sink and the command registry lookup pair.
/// Checking `command_exists` before `command_execute` lets the listener
/// report an unresolved name distinctly from an execution failure.
pub trait HostProxy: Send + Sync {
    /// Write a message to the host's log display. Must not block the caller
    /// meaningfully and must not fail.
    fn write_log(&self, message: &str, level: LogLevel);

    /// Whether `name` is registered as an executable host command
    fn command_exists(&self, name: &str) -> bool;

    /// Execute the registered host command `name`. Fire-and-forget from the
    /// bridge's perspective; execution outcome is the registry's concern.
    fn command_execute(&self, name: &str);
}

/// Host proxy backed by `tracing`, for running the bridge standalone.
///
/// Every inbound command is treated as registered and its execution is
/// logged, which makes the binary usable as a diagnostic tap on the
/// transcription server's command output.
#[derive(Debug, Default)]
pub struct TracingHost;

impl TracingHost {
    pub fn new() -> Self {
        Self
    }
}

impl HostProxy for TracingHost {
    fn write_log(&self, message: &str, level: LogLevel) {
        match level {
            LogLevel::Debug => debug!("{message}"),
            LogLevel::Info => info!("{message}"),
            LogLevel::Warn => warn!("{message}"),
            LogLevel::Error => error!("{message}"),
        }
    }

    fn command_exists(&self, _name: &str) -> bool {
        true
    }

    fn command_execute(&self, name: &str) {
        info!("executing host command '{name}'");
    }
}
