//! # Configuration Management
//!
//! Centralized configuration for the framing transport.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment-specific overrides via `from_env()`
//!
//! ## Sections
//! - `[client]`: login server address, connect timeout, `TCP_NODELAY`
//! - `[transport]`: buffer sizes, frame limits, outbound cap, packet logging
//! - `[logging]`: subscriber output
//! - `[[lengths]]`: per-opcode overrides on top of the embedding application's length table

use crate::core::length_table::{LengthEntry, PacketLengths};
use crate::core::reassembly::{DEFAULT_MAX_FRAME_SIZE, DEFAULT_RECV_BUFFER_SIZE};
use crate::error::{ProtocolError, Result};
use crate::utils::coalescer::DEFAULT_OUTBOUND_CAPACITY;
use crate::utils::compression::DEFAULT_MAX_CARRY;
use crate::utils::logging::DEFAULT_REDACTED_OPCODES;
use crate::utils::segment_pool::DEFAULT_SEGMENT_SIZE;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Default connect timeout
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);

/// Opcode of the ping frame used for round-trip sampling
pub const DEFAULT_PING_OPCODE: u8 = 0x73;

/// Main configuration structure that contains all configurable settings
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct NetworkConfig {
    /// Client-specific configuration
    #[serde(default)]
    pub client: ClientConfig,

    /// Transport configuration
    #[serde(default)]
    pub transport: TransportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,

    /// Per-opcode length overrides
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lengths: Vec<LengthEntry>,
}

impl NetworkConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(addr) = std::env::var("FRAMEWIRE_LOGIN_ADDRESS") {
            config.client.login_address = addr;
        }

        if let Ok(timeout) = std::env::var("FRAMEWIRE_CONNECT_TIMEOUT_MS") {
            let millis = timeout.parse::<u64>().map_err(|_| {
                ProtocolError::ConfigError(format!(
                    "FRAMEWIRE_CONNECT_TIMEOUT_MS is not a number: '{timeout}'"
                ))
            })?;
            config.client.connect_timeout = Duration::from_millis(millis);
        }

        if let Ok(capacity) = std::env::var("FRAMEWIRE_OUTBOUND_CAPACITY") {
            if let Ok(val) = capacity.parse::<usize>() {
                config.transport.outbound_capacity = val;
            }
        }

        if let Ok(flag) = std::env::var("FRAMEWIRE_LOG_PACKETS") {
            config.transport.log_packets = matches!(flag.as_str(), "1" | "true" | "yes" | "on");
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| ProtocolError::ConfigError(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Apply the `[[lengths]]` overrides on top of `base`.
    pub fn length_table(&self, mut base: PacketLengths) -> PacketLengths {
        base.apply(&self.lengths);
        base
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        errors.extend(self.client.validate());
        errors.extend(self.transport.validate());
        errors.extend(self.logging.validate());

        for entry in &self.lengths {
            if entry.length == 0 {
                errors.push(format!(
                    "Length override for opcode 0x{:02X} is 0 (use a negative value for dynamic)",
                    entry.opcode
                ));
            } else if entry.length > 0 && entry.length as usize > self.transport.max_frame_size {
                errors.push(format!(
                    "Length override for opcode 0x{:02X} exceeds max_frame_size: {}",
                    entry.opcode, entry.length
                ));
            }
        }

        errors
    }

    /// Validate and return Result - convenience method
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

/// Client-specific configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Login server address (e.g., "login.example.com:2593")
    pub login_address: String,

    /// Timeout for connection attempts
    #[serde(with = "duration_millis")]
    pub connect_timeout: Duration,

    /// Disable Nagle's algorithm on every socket
    pub nodelay: bool,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            login_address: String::from("127.0.0.1:2593"),
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            nodelay: true,
        }
    }
}

impl ClientConfig {
    /// Split `login_address` into host and port.
    pub fn login_endpoint(&self) -> Result<(String, u16)> {
        let (host, port) = self.login_address.rsplit_once(':').ok_or_else(|| {
            ProtocolError::ConfigError(format!(
                "Invalid login address: '{}' (expected 'host:port')",
                self.login_address
            ))
        })?;
        let port = port.parse::<u16>().map_err(|_| {
            ProtocolError::ConfigError(format!("Invalid login port: '{port}'"))
        })?;
        let host = host.trim_start_matches('[').trim_end_matches(']');
        Ok((host.to_string(), port))
    }

    /// Validate client configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.login_address.is_empty() {
            errors.push("Login address cannot be empty".to_string());
        } else if let Err(e) = self.login_endpoint() {
            errors.push(e.to_string());
        }

        if self.connect_timeout.as_millis() < 100 {
            errors.push("Connect timeout too short (minimum: 100ms)".to_string());
        } else if self.connect_timeout.as_secs() > 300 {
            errors.push("Connect timeout too long (maximum: 300s)".to_string());
        }

        errors
    }
}

/// Transport configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Initial ring buffer storage and socket read size
    pub recv_buffer_size: usize,

    /// Largest accepted frame, header included
    pub max_frame_size: usize,

    /// Size of each pooled outbound segment
    pub segment_size: usize,

    /// Segments pre-allocated per connection
    pub initial_segments: usize,

    /// Byte cap for queued outbound data
    pub outbound_capacity: usize,

    /// Ceiling for undecoded compressed bytes carried between reads
    pub max_carry_over: usize,

    /// Opcode of the ping frame
    pub ping_opcode: u8,

    /// Trace every frame on the `framewire::packets` target
    pub log_packets: bool,

    /// Opcodes whose bytes are never logged
    pub redacted_opcodes: Vec<u8>,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            recv_buffer_size: DEFAULT_RECV_BUFFER_SIZE,
            max_frame_size: DEFAULT_MAX_FRAME_SIZE,
            segment_size: DEFAULT_SEGMENT_SIZE,
            initial_segments: 16,
            outbound_capacity: DEFAULT_OUTBOUND_CAPACITY,
            max_carry_over: DEFAULT_MAX_CARRY,
            ping_opcode: DEFAULT_PING_OPCODE,
            log_packets: false,
            redacted_opcodes: DEFAULT_REDACTED_OPCODES.to_vec(),
        }
    }
}

impl TransportConfig {
    /// Validate transport configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.recv_buffer_size == 0 {
            errors.push("Receive buffer size cannot be 0".to_string());
        } else if self.recv_buffer_size > 16 * 1024 * 1024 {
            errors.push(format!(
                "Receive buffer size too large: {} bytes (maximum: 16 MB)",
                self.recv_buffer_size
            ));
        }

        if self.max_frame_size < 3 {
            errors.push("Max frame size too small (minimum: 3 bytes)".to_string());
        } else if self.max_frame_size > DEFAULT_MAX_FRAME_SIZE {
            errors.push(format!(
                "Max frame size too large: {} bytes (maximum: {DEFAULT_MAX_FRAME_SIZE})",
                self.max_frame_size
            ));
        }

        if self.segment_size == 0 {
            errors.push("Segment size cannot be 0".to_string());
        } else if self.segment_size > 64 * 1024 {
            errors.push(format!(
                "Segment size too large: {} bytes (maximum: 64 KB)",
                self.segment_size
            ));
        }

        if self.outbound_capacity < self.segment_size {
            errors.push(format!(
                "Outbound capacity ({}) must hold at least one segment ({})",
                self.outbound_capacity, self.segment_size
            ));
        }

        if self.max_carry_over == 0 {
            errors.push("Max carry-over cannot be 0".to_string());
        }

        errors
    }
}

/// Where [`init_logging`](crate::utils::logging::init_logging) sends events.
///
/// The console layer is human-readable. The file layer writes either the same
/// plain format or one JSON object per line. Packet dumps go to the
/// `framewire::packets` target at trace level under either layer.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Reported once when the subscriber is installed.
    pub app_name: String,

    /// Default filter when `RUST_LOG` is unset.
    #[serde(with = "level_name")]
    pub log_level: Level,

    pub log_to_console: bool,

    pub log_to_file: bool,

    /// Appended to, created if missing. Required with `log_to_file`.
    pub log_file_path: Option<String>,

    /// JSON lines instead of plain text in the file layer.
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("framewire"),
            log_level: Level::INFO,
            log_to_console: true,
            log_to_file: false,
            log_file_path: None,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.trim().is_empty() {
            errors.push("Logging app_name cannot be empty".to_string());
        }

        match (self.log_to_file, self.log_file_path.as_deref()) {
            (true, None) => {
                errors.push("log_file_path must be specified when log_to_file is true".to_string());
            }
            (true, Some(path)) => {
                let path = Path::new(path);
                if path.is_dir() {
                    errors.push(format!("Log file path is a directory: {}", path.display()));
                } else if let Some(parent) = path.parent() {
                    if !parent.as_os_str().is_empty() && !parent.exists() {
                        errors.push(format!(
                            "Log file directory does not exist: {}",
                            parent.display()
                        ));
                    }
                }
            }
            (false, _) => {}
        }

        if !self.log_to_console && !self.log_to_file {
            errors.push("At least one logging output (console or file) must be enabled".to_string());
        }

        errors
    }
}

/// `Duration` fields stored as whole milliseconds.
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(u64::try_from(duration.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

/// `tracing::Level` stored as its lowercase name.
mod level_name {
    use serde::{Deserialize, Deserializer, Serializer};
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&level.as_str().to_ascii_lowercase())
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let name = String::deserialize(deserializer)?;
        name.parse()
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {name}")))
    }
}
