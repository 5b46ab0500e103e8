//! # Packet Length Table
//!
//! Maps an opcode to the length class of its frame. The table contents are
//! protocol configuration supplied by the embedding application; this module
//! only defines the lookup contract and a simple array-backed implementation.
//!
//! A non-negative entry `N` means the frame is always exactly `N` bytes. A
//! negative entry means the frame is dynamic and carries its total length as a
//! big-endian `u16` at offset 1.

use serde::{Deserialize, Serialize};

/// Size of the header of a dynamic frame: opcode + 2-byte total length.
pub const DYNAMIC_HEADER_LEN: usize = 3;

/// Length class of an opcode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameLength {
    /// Exactly this many bytes, opcode included.
    Fixed(usize),
    /// Total length carried in-band at bytes 1..3.
    Dynamic,
}

impl FrameLength {
    /// Offset of the first payload byte for this class.
    #[inline]
    pub fn header_len(self) -> usize {
        match self {
            FrameLength::Fixed(_) => 1,
            FrameLength::Dynamic => DYNAMIC_HEADER_LEN,
        }
    }
}

/// Opcode → length lookup used by the reassembler and the frame writer.
pub trait LengthTable: Send + Sync {
    /// Raw table entry: non-negative fixed length, negative for dynamic.
    fn lookup(&self, opcode: u8) -> i16;

    /// Typed view of [`LengthTable::lookup`].
    fn frame_length(&self, opcode: u8) -> FrameLength {
        match self.lookup(opcode) {
            n if n >= 0 => FrameLength::Fixed(n as usize),
            _ => FrameLength::Dynamic,
        }
    }
}

impl<F> LengthTable for F
where
    F: Fn(u8) -> i16 + Send + Sync,
{
    fn lookup(&self, opcode: u8) -> i16 {
        self(opcode)
    }
}

/// One `[[lengths]]` entry in the TOML configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LengthEntry {
    pub opcode: u8,
    pub length: i16,
}

/// Array-backed length table with one slot per opcode.
#[derive(Debug, Clone)]
pub struct PacketLengths {
    table: [i16; 256],
}

impl PacketLengths {
    /// Every opcode dynamic.
    pub fn dynamic() -> Self {
        Self { table: [-1; 256] }
    }

    /// Build from a complete 256-entry table.
    pub fn from_table(table: [i16; 256]) -> Self {
        Self { table }
    }

    /// Start from an all-dynamic table and apply `entries`.
    pub fn from_entries(entries: &[LengthEntry]) -> Self {
        let mut lengths = Self::dynamic();
        lengths.apply(entries);
        lengths
    }

    /// Overwrite a single opcode.
    pub fn set(&mut self, opcode: u8, length: i16) -> &mut Self {
        self.table[opcode as usize] = length;
        self
    }

    /// Overwrite every opcode named in `entries`.
    pub fn apply(&mut self, entries: &[LengthEntry]) {
        for entry in entries {
            self.table[entry.opcode as usize] = entry.length;
        }
    }
}

impl Default for PacketLengths {
    fn default() -> Self {
        Self::dynamic()
    }
}

impl LengthTable for PacketLengths {
    #[inline]
    fn lookup(&self, opcode: u8) -> i16 {
        self.table[opcode as usize]
    }
}
