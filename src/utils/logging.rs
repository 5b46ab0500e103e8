//! # Logging
//!
//! Subscriber setup and packet trace output.
//!
//! [`init_logging`] installs a global `tracing` subscriber from a
//! [`LoggingConfig`]: an `EnvFilter` (overridable with `RUST_LOG`), an
//! optional console layer and an optional file layer, plain or JSON.
//!
//! [`log_packet`] writes a hex dump of a frame on the `framewire::packets`
//! target at `TRACE`. Login frames carry account credentials, so opcodes on
//! the redaction list are never dumped.

use std::fmt::Write as _;
use std::fs::File;
use std::sync::Mutex;

use tracing::Level;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::LoggingConfig;
use crate::error::{ProtocolError, Result};

/// Target for packet dumps.
pub const PACKET_TARGET: &str = "framewire::packets";

/// Printed in place of the bytes of a redacted frame.
pub const REDACTED_MARKER: &str = "[ACCOUNT CREDENTIALS HIDDEN]";

/// Opcodes redacted by default: account login and game login.
pub const DEFAULT_REDACTED_OPCODES: [u8; 2] = [0x80, 0x91];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    ClientToServer,
    ServerToClient,
}

impl std::fmt::Display for Direction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Direction::ClientToServer => f.write_str("Client -> Server"),
            Direction::ServerToClient => f.write_str("Server -> Client"),
        }
    }
}

/// Install the global subscriber.
///
/// Fails with [`ProtocolError::ConfigError`] if a subscriber is already set
/// or the log file cannot be created.
pub fn init_logging(config: &LoggingConfig) -> Result<()> {
    let default_filter = level_filter(config.log_level);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let console_layer = config
        .log_to_console
        .then(|| fmt::layer().with_target(true).with_level(true));

    let file = match (config.log_to_file, &config.log_file_path) {
        (true, Some(path)) => Some(File::create(path).map_err(|e| {
            ProtocolError::ConfigError(format!("Failed to create log file {path}: {e}"))
        })?),
        _ => None,
    };

    let (json_file, plain_file) = match file {
        Some(file) if config.json_format => (Some(file), None),
        Some(file) => (None, Some(file)),
        None => (None, None),
    };

    let json_layer = json_file.map(|file| {
        fmt::layer()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(true)
            .json()
    });
    let file_layer = plain_file.map(|file| {
        fmt::layer()
            .with_writer(Mutex::new(file))
            .with_ansi(false)
            .with_target(true)
    });

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(json_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| ProtocolError::ConfigError(format!("Failed to install subscriber: {e}")))?;

    tracing::info!(app = %config.app_name, level = %config.log_level, "Logging initialized");
    Ok(())
}

fn level_filter(level: Level) -> &'static str {
    match level {
        Level::TRACE => "trace",
        Level::DEBUG => "debug",
        Level::INFO => "info",
        Level::WARN => "warn",
        Level::ERROR => "error",
    }
}

/// Offset column, 16 hex bytes split in two groups of 8, and an ASCII gutter.
pub fn hex_dump(bytes: &[u8]) -> String {
    let mut out = String::with_capacity(bytes.len() * 4 + 128);
    out.push_str("          0  1  2  3  4  5  6  7   8  9  A  B  C  D  E  F\n");
    out.push_str("          -- -- -- -- -- -- -- --  -- -- -- -- -- -- -- --\n");

    for (row, chunk) in bytes.chunks(16).enumerate() {
        let _ = write!(out, "{:08X}", row * 16);
        for column in 0..16 {
            if column % 8 == 0 {
                out.push(' ');
            }
            match chunk.get(column) {
                Some(b) => {
                    let _ = write!(out, " {b:02X}");
                }
                None => out.push_str("   "),
            }
        }
        out.push_str("  ");
        out.extend(chunk.iter().map(|&b| {
            if (0x20..0x80).contains(&b) {
                b as char
            } else {
                '.'
            }
        }));
        out.push('\n');
    }
    out
}

/// Trace one frame, unless its opcode is in `redacted`.
pub fn log_packet(direction: Direction, bytes: &[u8], redacted: &[u8]) {
    if !tracing::enabled!(target: PACKET_TARGET, Level::TRACE) {
        return;
    }

    let opcode = bytes.first().copied().unwrap_or(0);
    let body = if redacted.contains(&opcode) {
        REDACTED_MARKER.to_string()
    } else {
        hex_dump(bytes)
    };

    tracing::trace!(
        target: PACKET_TARGET,
        %direction,
        opcode,
        length = bytes.len(),
        "\n{body}"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hex_dump_layout() {
        let dump = hex_dump(b"\x73\x01ABC");
        let row = dump.lines().nth(2).unwrap();
        assert!(row.starts_with("00000000  73 01 41 42 43"));
        assert!(row.ends_with("s.ABC"));
    }

    #[test]
    fn test_hex_dump_second_row_and_group_gap() {
        let dump = hex_dump(&[0xAA; 17]);
        let lines: Vec<&str> = dump.lines().collect();
        assert_eq!(lines.len(), 4);
        assert!(lines[2].contains("AA AA  AA"));
        assert!(lines[3].starts_with("00000010  AA"));
    }

    #[test]
    fn test_direction_display() {
        assert_eq!(Direction::ClientToServer.to_string(), "Client -> Server");
    }

    #[test]
    fn test_log_packet_without_subscriber_is_noop() {
        log_packet(Direction::ServerToClient, &[0x80, 1, 2], &DEFAULT_REDACTED_OPCODES);
    }
}
