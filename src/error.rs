//! # Error Types
//!
//! Error handling for the framing transport.
//!
//! This module defines every error variant the crate can surface, from socket
//! failures to framing violations detected by the reassembler.
//!
//! ## Error Categories
//! - **Connect errors**: name resolution and connect-time socket failures
//! - **Link errors**: receive/send-time socket failures and orderly remote close
//! - **Framing errors**: malformed or oversized dynamic lengths
//! - **Backpressure**: the outbound coalescer would exceed its byte cap
//! - **Configuration errors**: invalid TOML or out-of-range settings
//!
//! Received-frame reads never produce errors; they degrade to default values
//! (see [`crate::core::frame::Frame`]).
//!
//! ## Example Usage
//! ```rust
//! use framewire::error::{ProtocolError, Result};
//!
//! fn check_len(declared: usize) -> Result<usize> {
//!     if declared < 3 {
//!         return Err(ProtocolError::MalformedFrame { opcode: 0xAE, declared });
//!     }
//!     Ok(declared)
//! }
//!
//! assert!(check_len(2).is_err());
//! ```

use std::io;
use thiserror::Error;

/// Error message constants to reduce allocations in error paths.
pub mod constants {
    /// Dispatcher-related error messages
    pub const ERR_DISPATCHER_WRITE_LOCK: &str = "Failed to acquire write lock on dispatcher";
    pub const ERR_DISPATCHER_READ_LOCK: &str = "Failed to acquire read lock on dispatcher";

    /// Connection errors
    pub const ERR_DEAD_SOCKET: &str = "Attempt to write into a dead socket";
    pub const ERR_NO_ADDRESS: &str = "Host name resolved to no addresses";
    pub const ERR_REMOTE_CLOSED: &str = "Remote host closed the connection";

    /// Framing errors
    pub const ERR_CARRY_OVER_OVERFLOW: &str = "Decompression carry-over exceeded its limit";
}

/// ProtocolError is the primary error type for all transport operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Failed to connect to {addr}: {source}")]
    ConnectFailure {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("Failed to resolve {0}")]
    Resolve(String),

    #[error("Connection attempt timed out")]
    ConnectionTimeout,

    #[error("Link failure: {0}")]
    LinkFailure(#[source] io::Error),

    #[error("Connection is not open")]
    NotConnected,

    #[error("Outbound capacity exceeded: {pending} bytes pending, cap is {capacity}")]
    CapacityExceeded { pending: usize, capacity: usize },

    #[error("Malformed frame 0x{opcode:02X}: declared length {declared}")]
    MalformedFrame { opcode: u8, declared: usize },

    #[error("Frame 0x{opcode:02X} too large: {declared} bytes (max {max})")]
    OversizedFrame {
        opcode: u8,
        declared: usize,
        max: usize,
    },

    #[error("Decompression failed")]
    DecompressionFailure,

    #[error("No handler registered for opcode 0x{0:02X}")]
    UnexpectedMessage(u8),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Synchronization primitive poisoned")]
    LockPoisoned,
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;
