//! # framewire
//!
//! Client-side framing transport for length-delimited binary game protocols.
//!
//! Every message starts with a one-byte opcode. A length table says, per
//! opcode, whether the frame has a fixed total size or carries its own
//! big-endian `u16` total length in bytes 1..3. The crate turns a raw TCP
//! byte stream (optionally Huffman-compressed) into whole [`Frame`]s, runs
//! them through pluggable filters and hands them to application handlers on
//! the caller's thread.
//!
//! ## Layout
//! - [`core`]: ring buffer, length tables, frame reader/writer, reassembly
//! - [`protocol`]: filters and opcode dispatch
//! - [`transport`]: tokio connections and the login/game session
//! - [`utils`]: compression, send buffers, statistics, logging
//! - [`config`]: TOML/env configuration
//!
//! ## Example
//! ```rust,no_run
//! use std::sync::Arc;
//! use framewire::{ClientSession, Dispatcher, NetworkConfig, PacketLengths};
//!
//! # async fn run() -> framewire::Result<()> {
//! let config = NetworkConfig::default();
//! let lengths = Arc::new(config.length_table(PacketLengths::dynamic()));
//! let mut session = ClientSession::new(config, lengths);
//!
//! let mut dispatcher = Dispatcher::new();
//! dispatcher.register(0x73, |frame| {
//!     let _sequence = frame.read_u8();
//!     Ok(())
//! })?;
//!
//! session.connect_login().await?;
//! loop {
//!     session.update(&mut dispatcher);
//!     tokio::time::sleep(std::time::Duration::from_millis(16)).await;
//! }
//! # }
//! ```

pub mod config;
pub mod core;
pub mod error;
pub mod protocol;
pub mod transport;
pub mod utils;

pub use config::NetworkConfig;
pub use crate::core::{Frame, FrameLength, FrameReassembler, FrameWriter, LengthTable, PacketLengths};
pub use error::{ProtocolError, Result};
pub use protocol::{Dispatcher, FilterChain, PacketFilter, PacketHandler, PacketMut};
pub use transport::{ClientSession, Connection, ConnectionState, DisconnectReason, FrameInjector};
pub use utils::logging::init_logging;
