//! # Core Framing Components
//!
//! Byte buffering, frame length resolution, frame (de)serialization and
//! incremental reassembly.
//!
//! ## Components
//! - **RingBuffer**: growable circular buffer for inbound bytes
//! - **LengthTable**: opcode → fixed/dynamic length lookup
//! - **Frame / FrameWriter**: typed reader and writer over a single frame
//! - **FrameReassembler**: extraction state machine over the ring buffer
//!
//! ## Wire Format
//! ```text
//! fixed:   [Opcode(1)] [Payload(N-1)]
//! dynamic: [Opcode(1)] [TotalLength(2, BE)] [Payload(TotalLength-3)]
//! ```

pub mod frame;
pub mod length_table;
pub mod reassembly;
pub mod ring_buffer;
pub mod writer;

pub use frame::{Frame, TextEncoding};
pub use length_table::{FrameLength, LengthEntry, LengthTable, PacketLengths};
pub use reassembly::FrameReassembler;
pub use ring_buffer::RingBuffer;
pub use writer::FrameWriter;
