use std::net::{IpAddr, SocketAddr};
use std::path::Path;

use tracing::debug;

use crate::host::{HostProxy, LogLevel};
use crate::protocol::{DEFAULT_LISTEN_ADDRESS, DEFAULT_LISTEN_PORT};

/// Endpoint configuration for the inbound command listener.
///
/// Loaded once at initialization from a plain-text `key=value` file.
/// Recognized keys are `listener_address` (an IP literal) and
/// `listener_port` (a decimal port number). Every invalid entry falls back
/// to the default for that one field; loading itself never fails.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BridgeConfig {
    /// Address the command listener binds to
    pub listen_address: IpAddr,
    /// Port the command listener binds to
    pub listen_port: u16,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            listen_address: DEFAULT_LISTEN_ADDRESS,
            listen_port: DEFAULT_LISTEN_PORT,
        }
    }
}

impl BridgeConfig {
    /// The socket address the listener should bind to
    pub fn listen_endpoint(&self) -> SocketAddr {
        SocketAddr::new(self.listen_address, self.listen_port)
    }

    /// Load configuration from `path`, reporting every skipped or rejected
    /// entry through the host's log.
    ///
    /// A missing file is informational, not an error: the defaults are in
    /// effect and the host continues. Malformed lines and invalid values are
    /// rejected individually, so one bad line never invalidates the rest of
    /// the file.
    pub fn load<H: HostProxy + ?Sized>(path: &Path, host: &H) -> Self {
        let mut config = Self::default();

        if !path.exists() {
            host.write_log(
                &format!(
                    "Configuration file ({}) not found, using defaults",
                    path.display()
                ),
                LogLevel::Info,
            );
            return config;
        }

        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) => {
                host.write_log(
                    &format!("Error reading configuration file: {e}"),
                    LogLevel::Error,
                );
                return config;
            }
        };

        for line in contents.lines() {
            config.apply_line(line, host);
        }

        debug!(
            "loaded configuration: listener endpoint {}",
            config.listen_endpoint()
        );
        config
    }

    /// Apply one configuration line, if it holds a recognized `key=value`
    fn apply_line<H: HostProxy + ?Sized>(&mut self, line: &str, host: &H) {
        let trimmed = line.trim();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            return;
        }

        let Some((key, value)) = trimmed.split_once('=') else {
            host.write_log(
                &format!("Skipping invalid configuration: {line}"),
                LogLevel::Warn,
            );
            return;
        };

        let key = key.trim();
        let value = value.trim();
        if key.is_empty() {
            host.write_log(
                &format!("Skipping invalid configuration: {line}"),
                LogLevel::Warn,
            );
            return;
        }

        match key {
            "listener_address" => match value.parse::<IpAddr>() {
                Ok(address) => self.listen_address = address,
                Err(_) => host.write_log(
                    &format!(
                        "Invalid listener ip address {value}, using default {DEFAULT_LISTEN_ADDRESS}"
                    ),
                    LogLevel::Error,
                ),
            },
            "listener_port" => match value.parse::<u16>() {
                Ok(port) if port != 0 => self.listen_port = port,
                _ => host.write_log(
                    &format!("Invalid listener port: {value}, using default {DEFAULT_LISTEN_PORT}"),
                    LogLevel::Error,
                ),
            },
            _ => host.write_log(
                &format!("Ignoring unknown configuration {key}={value}"),
                LogLevel::Warn,
            ),
        }
    }
}
