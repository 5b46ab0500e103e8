//! # Protocol Layer
//!
//! Everything between the transport and application logic: packet filters
//! that may veto or rewrite frames, and opcode-keyed handler dispatch.

pub mod dispatcher;
pub mod filter;

pub use dispatcher::{Dispatcher, PacketHandler};
pub use filter::{FilterChain, FilterVerdict, PacketFilter, PacketMut};
