//! # Frame Writer
//!
//! Builds one outgoing frame.
//!
//! Fixed frames allocate exactly their declared size up front, start the
//! cursor after the opcode and are zero-padded to the full length on
//! [`FrameWriter::finish`]. Dynamic frames reserve 3 header bytes, double their
//! backing storage as writes need it, and patch the big-endian total length
//! into bytes 1..3 on finish.
//!
//! Writing past the declared length of a fixed frame is a programmer error and
//! panics.

use super::length_table::{FrameLength, LengthTable, DYNAMIC_HEADER_LEN};

/// Initial storage for dynamic frames when no hint is given.
pub const DEFAULT_CAPACITY: usize = 32;

/// Largest total length a dynamic frame can declare.
pub const MAX_DYNAMIC_LEN: usize = u16::MAX as usize;

#[derive(Debug, Clone)]
pub struct FrameWriter {
    buffer: Vec<u8>,
    position: usize,
    written: usize,
    length: FrameLength,
}

impl FrameWriter {
    pub fn new(opcode: u8, table: &dyn LengthTable) -> Self {
        Self::with_length(opcode, table.frame_length(opcode), DEFAULT_CAPACITY)
    }

    /// Like [`FrameWriter::new`], with a storage hint for dynamic frames.
    pub fn with_capacity(opcode: u8, table: &dyn LengthTable, capacity: usize) -> Self {
        Self::with_length(opcode, table.frame_length(opcode), capacity)
    }

    /// Start a frame with an explicit length class.
    ///
    /// # Panics
    /// If `length` is `Fixed(0)`: there is no room for the opcode.
    pub fn with_length(opcode: u8, length: FrameLength, capacity: usize) -> Self {
        let (buffer, position) = match length {
            FrameLength::Fixed(size) => {
                assert!(size > 0, "fixed frame 0x{opcode:02X} declared with length 0");
                (vec![0; size], 1)
            }
            FrameLength::Dynamic => (
                vec![0; capacity.max(DYNAMIC_HEADER_LEN)],
                DYNAMIC_HEADER_LEN,
            ),
        };

        let mut writer = Self {
            buffer,
            position,
            written: position,
            length,
        };
        writer.buffer[0] = opcode;
        writer
    }

    #[inline]
    pub fn opcode(&self) -> u8 {
        self.buffer[0]
    }

    #[inline]
    pub fn length_class(&self) -> FrameLength {
        self.length
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    /// Bytes written so far, header included.
    #[inline]
    pub fn len(&self) -> usize {
        self.written
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        false
    }

    /// Move the cursor to an absolute offset past the header.
    pub fn seek(&mut self, position: usize) {
        let header = self.length.header_len();
        let position = position.max(header);
        self.reserve(position.saturating_sub(self.position));
        self.position = position;
        self.written = self.written.max(position);
    }

    fn reserve(&mut self, additional: usize) {
        let required = self.position + additional;
        match self.length {
            FrameLength::Fixed(size) => assert!(
                required <= size,
                "write of {additional} bytes at offset {} overflows fixed frame 0x{:02X} of length {size}",
                self.position,
                self.opcode(),
            ),
            FrameLength::Dynamic => {
                assert!(
                    required <= MAX_DYNAMIC_LEN,
                    "dynamic frame 0x{:02X} exceeds {MAX_DYNAMIC_LEN} bytes",
                    self.opcode(),
                );
                let mut capacity = self.buffer.len();
                while capacity < required {
                    capacity *= 2;
                }
                if capacity != self.buffer.len() {
                    self.buffer.resize(capacity, 0);
                }
            }
        }
    }

    pub fn write_bytes(&mut self, data: &[u8]) {
        self.reserve(data.len());
        self.buffer[self.position..self.position + data.len()].copy_from_slice(data);
        self.position += data.len();
        self.written = self.written.max(self.position);
    }

    /// Write `count` zero bytes.
    pub fn write_zero(&mut self, count: usize) {
        self.reserve(count);
        self.buffer[self.position..self.position + count].fill(0);
        self.position += count;
        self.written = self.written.max(self.position);
    }

    pub fn write_u8(&mut self, value: u8) {
        self.write_bytes(&[value]);
    }

    pub fn write_i8(&mut self, value: i8) {
        self.write_bytes(&value.to_be_bytes());
    }

    pub fn write_bool(&mut self, value: bool) {
        self.write_u8(value as u8);
    }

    pub fn write_u16(&mut self, value: u16) {
        self.write_bytes(&value.to_be_bytes());
    }

    pub fn write_i16(&mut self, value: i16) {
        self.write_bytes(&value.to_be_bytes());
    }

    pub fn write_u32(&mut self, value: u32) {
        self.write_bytes(&value.to_be_bytes());
    }

    pub fn write_i32(&mut self, value: i32) {
        self.write_bytes(&value.to_be_bytes());
    }

    pub fn write_u64(&mut self, value: u64) {
        self.write_bytes(&value.to_be_bytes());
    }

    pub fn write_i64(&mut self, value: i64) {
        self.write_bytes(&value.to_be_bytes());
    }

    /// Byte-swapped (little-endian) u16.
    pub fn write_u16_reversed(&mut self, value: u16) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// Byte-swapped (little-endian) u32.
    pub fn write_u32_reversed(&mut self, value: u32) {
        self.write_bytes(&value.to_le_bytes());
    }

    /// ISO-8859-1 text. Chars above U+00FF are written as `?`.
    ///
    /// `Some(width)` truncates or zero-pads to exactly `width` bytes; `None`
    /// appends a single NUL terminator.
    pub fn write_ascii(&mut self, text: &str, width: Option<usize>) {
        let bytes: Vec<u8> = text
            .chars()
            .map(|c| u8::try_from(u32::from(c)).unwrap_or(b'?'))
            .collect();
        self.write_units(&bytes, 1, width);
    }

    /// UTF-16BE text; `width` counts code units.
    pub fn write_unicode_be(&mut self, text: &str, width: Option<usize>) {
        let bytes: Vec<u8> = text.encode_utf16().flat_map(u16::to_be_bytes).collect();
        self.write_units(&bytes, 2, width);
    }

    /// UTF-16LE text; `width` counts code units.
    pub fn write_unicode_le(&mut self, text: &str, width: Option<usize>) {
        let bytes: Vec<u8> = text.encode_utf16().flat_map(u16::to_le_bytes).collect();
        self.write_units(&bytes, 2, width);
    }

    /// UTF-8 text; `width` counts bytes.
    pub fn write_utf8(&mut self, text: &str, width: Option<usize>) {
        self.write_units(text.as_bytes(), 1, width);
    }

    fn write_units(&mut self, encoded: &[u8], unit: usize, width: Option<usize>) {
        match width {
            Some(chars) => {
                let size = chars * unit;
                let take = encoded.len().min(size);
                self.write_bytes(&encoded[..take]);
                self.write_zero(size - take);
            }
            None => {
                self.write_bytes(encoded);
                self.write_zero(unit);
            }
        }
    }

    /// Produce the finished frame bytes.
    ///
    /// Dynamic frames are trimmed to the bytes written and get their total
    /// length patched into bytes 1..3. Fixed frames are returned at their
    /// declared size, zero-padded.
    pub fn finish(mut self) -> Vec<u8> {
        if self.length == FrameLength::Dynamic {
            self.buffer.truncate(self.written);
            let total = (self.written as u16).to_be_bytes();
            self.buffer[1..DYNAMIC_HEADER_LEN].copy_from_slice(&total);
        }
        self.buffer
    }
}
