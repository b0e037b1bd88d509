//! Configuration for servers, clients, framing limits, and logging.
//!
//! A [`ProtocolConfig`] is built from defaults, a TOML file, or environment
//! variables, and validated before use. Validation collects every problem
//! it finds instead of stopping at the first, so one pass over a bad config
//! file reports all of its mistakes.
//!
//! The framing section carries the one hardening knob the codec consumes:
//! `max_frame_size` bounds per-connection buffering against a peer that
//! declares an absurd body length.

use crate::error::{ProtocolError, Result};
use crate::utils::timeout;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Max allowed declared body length for a single frame (16 MB)
pub const MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

/// Standard memcached port, used in default addresses
pub const DEFAULT_PORT: u16 = 11211;

/// Top-level configuration, one section per concern.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct ProtocolConfig {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub framing: FramingConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl ProtocolConfig {
    /// Read and parse a TOML config file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;
        Self::from_toml(&contents)
    }

    /// Parse configuration from a TOML string. Missing sections fall back
    /// to their defaults.
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Defaults overridden by `MEMWIRE_*` environment variables.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("MEMWIRE_SERVER_ADDRESS") {
            config.server.address = addr;
        }
        if let Ok(addr) = std::env::var("MEMWIRE_CLIENT_ADDRESS") {
            config.client.address = addr;
        }
        if let Some(max) = env_parsed("MEMWIRE_MAX_FRAME_SIZE") {
            config.framing.max_frame_size = max;
        }
        if let Some(ms) = env_parsed::<u64>("MEMWIRE_RESPONSE_TIMEOUT_MS") {
            config.client.response_timeout = Duration::from_millis(ms);
        }

        Ok(config)
    }

    /// Defaults with a mutation applied, for tests and one-off tools.
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Render the default configuration as a TOML document.
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Serialize this configuration to a TOML file.
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to serialize config: {e}")))?;
        std::fs::write(path, content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to write config file: {e}")))
    }

    /// Check every section. An empty list means the configuration is usable.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();
        self.server.validate(&mut errors);
        self.client.validate(&mut errors);
        self.framing.validate(&mut errors);
        self.logging.validate(&mut errors);
        errors
    }

    /// [`validate`](Self::validate), folded into a single `Result`.
    pub fn validate_strict(&self) -> Result<()> {
        let errors = self.validate();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )))
        }
    }
}

/// Listener side: bind address, per-connection and shutdown timeouts.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    /// Listen address, e.g. "127.0.0.1:11211"
    pub address: String,

    /// Timeout applied to client connections
    #[serde(with = "duration_serde")]
    pub connection_timeout: Duration,

    /// How long a graceful shutdown waits for connections to drain
    #[serde(with = "duration_serde")]
    pub shutdown_timeout: Duration,

    /// Upper bound on concurrent connections
    pub max_connections: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            address: format!("127.0.0.1:{DEFAULT_PORT}"),
            connection_timeout: timeout::DEFAULT_TIMEOUT,
            shutdown_timeout: timeout::SHUTDOWN_TIMEOUT,
            max_connections: 1024,
        }
    }
}

impl ServerConfig {
    fn validate(&self, errors: &mut Vec<String>) {
        check_address(errors, "Server", &self.address);
        check_duration_range(
            errors,
            "Connection timeout",
            self.connection_timeout,
            Duration::from_millis(100),
            Duration::from_secs(300),
        );
        check_duration_range(
            errors,
            "Shutdown timeout",
            self.shutdown_timeout,
            Duration::from_secs(1),
            Duration::from_secs(60),
        );
        if self.max_connections == 0 {
            errors.push("Max connections must be greater than 0".to_string());
        } else if self.max_connections > 100_000 {
            errors.push(format!(
                "Max connections very high: {} (ensure system resources can support this)",
                self.max_connections
            ));
        }
    }
}

/// Connecting side: target address plus connect and response timeouts.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ClientConfig {
    /// Target server address
    pub address: String,

    /// Timeout for the connection attempt
    #[serde(with = "duration_serde")]
    pub connection_timeout: Duration,

    /// How long a request waits for its correlated response frame
    #[serde(with = "duration_serde")]
    pub response_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            address: format!("127.0.0.1:{DEFAULT_PORT}"),
            connection_timeout: timeout::DEFAULT_TIMEOUT,
            response_timeout: Duration::from_secs(30),
        }
    }
}

impl ClientConfig {
    fn validate(&self, errors: &mut Vec<String>) {
        check_address(errors, "Client", &self.address);
        if self.connection_timeout < Duration::from_millis(100) {
            errors.push("Connection timeout too short (minimum: 100ms)".to_string());
        }
        if self.response_timeout < Duration::from_millis(100) {
            errors.push("Response timeout too short (minimum: 100ms)".to_string());
        }
    }
}

/// Framing limits consumed by the codec.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct FramingConfig {
    /// Largest declared body length the codec will buffer, in bytes
    pub max_frame_size: usize,
}

impl Default for FramingConfig {
    fn default() -> Self {
        Self {
            max_frame_size: MAX_FRAME_SIZE,
        }
    }
}

impl FramingConfig {
    fn validate(&self, errors: &mut Vec<String>) {
        if self.max_frame_size == 0 {
            errors.push("Max frame size cannot be 0".to_string());
        } else if self.max_frame_size < 1024 {
            errors.push("Max frame size too small (minimum: 1 KB)".to_string());
        } else if self.max_frame_size > 100 * 1024 * 1024 {
            errors.push(format!(
                "Max frame size too large: {} bytes (maximum recommended: 100 MB)",
                self.max_frame_size
            ));
        }
    }
}

/// Logging outputs and format, consumed by [`crate::utils::logging`].
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Name stamped on log lines
    pub app_name: String,

    /// Minimum level to emit
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Emit to stdout
    pub log_to_console: bool,

    /// Emit to `log_file_path`
    pub log_to_file: bool,

    /// Destination file, required when `log_to_file` is set
    pub log_file_path: Option<String>,

    /// Format log lines as JSON
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("memwire"),
            log_level: Level::INFO,
            log_to_console: true,
            log_to_file: false,
            log_file_path: None,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    fn validate(&self, errors: &mut Vec<String>) {
        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        match (&self.log_to_file, &self.log_file_path) {
            (true, None) => {
                errors.push("log_file_path must be specified when log_to_file is true".to_string());
            }
            (true, Some(path)) => {
                if let Some(parent) = Path::new(path).parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        errors.push(format!(
                            "Log file directory does not exist: {}",
                            parent.display()
                        ));
                    }
                }
            }
            _ => {}
        }

        if !self.log_to_console && !self.log_to_file {
            errors
                .push("At least one logging output (console or file) must be enabled".to_string());
        }
    }
}

fn check_address(errors: &mut Vec<String>, kind: &str, address: &str) {
    if address.is_empty() {
        errors.push(format!("{kind} address cannot be empty"));
    } else if address.parse::<std::net::SocketAddr>().is_err() {
        errors.push(format!(
            "Invalid {} address format: '{address}' (expected format: 'host:{DEFAULT_PORT}')",
            kind.to_ascii_lowercase()
        ));
    }
}

fn check_duration_range(
    errors: &mut Vec<String>,
    name: &str,
    value: Duration,
    min: Duration,
    max: Duration,
) {
    if value < min {
        errors.push(format!("{name} too short (minimum: {}ms)", min.as_millis()));
    } else if value > max {
        errors.push(format!("{name} too long (maximum: {}s)", max.as_secs()));
    }
}

fn env_parsed<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|v| v.parse().ok())
}

/// Durations cross the TOML boundary as integer milliseconds.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// Log levels cross the TOML boundary as lowercase names.
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S: Serializer>(level: &Level, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&level.to_string().to_ascii_lowercase())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Level, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Level::from_str(&raw)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {raw}")))
    }
}
