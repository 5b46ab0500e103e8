//! # Transport Layer
//!
//! TCP links to login and game servers.
//!
//! ## Components
//! - **Connection**: one socket, its receive task and inbound queue
//! - **ClientSession**: the login/game pair with shared filters

pub mod connection;
pub mod session;

pub use connection::{Connection, ConnectionState, DisconnectReason, FrameInjector};
pub use session::ClientSession;
