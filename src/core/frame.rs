//! # Received Frame
//!
//! Typed, bounds-checked reader over one complete frame.
//!
//! Every read is checked against the frame length. A read that runs past the
//! end yields the type's default (`0`, `false`, empty string) instead of
//! failing, and sets [`Frame::overrun`] so handlers that care can tell a real
//! zero from a truncated field. Behaviour is identical in every build profile.
//!
//! Multi-byte scalars are big-endian on the wire; the `*_reversed` readers
//! cover the legacy fields stored byte-swapped.

use super::length_table::{FrameLength, LengthTable};

/// Character encoding for string fields.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextEncoding {
    /// One byte per char (ISO-8859-1).
    Ascii,
    /// UTF-16, big-endian code units.
    Utf16Be,
    /// UTF-16, little-endian code units.
    Utf16Le,
    Utf8,
}

impl TextEncoding {
    #[inline]
    fn unit(self) -> usize {
        match self {
            TextEncoding::Utf16Be | TextEncoding::Utf16Le => 2,
            TextEncoding::Ascii | TextEncoding::Utf8 => 1,
        }
    }
}

/// One complete protocol message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    data: Vec<u8>,
    header_len: usize,
    position: usize,
    bypass_filter: bool,
    mutated: bool,
    overrun: bool,
}

impl Frame {
    /// Wrap complete frame bytes. The cursor starts on the first payload byte.
    pub fn new(data: Vec<u8>, length: FrameLength) -> Self {
        let header_len = length.header_len().min(data.len());
        Self {
            data,
            header_len,
            position: header_len,
            bypass_filter: false,
            mutated: false,
            overrun: false,
        }
    }

    /// Wrap complete frame bytes, resolving the header size from `table`.
    pub fn from_bytes(data: Vec<u8>, table: &dyn LengthTable) -> Self {
        let length = match data.first() {
            Some(&opcode) => table.frame_length(opcode),
            None => FrameLength::Fixed(0),
        };
        Self::new(data, length)
    }

    /// Frame synthesized locally or injected by a trusted extension.
    pub fn injected(data: Vec<u8>, table: &dyn LengthTable) -> Self {
        let mut frame = Self::from_bytes(data, table);
        frame.bypass_filter = true;
        frame
    }

    #[inline]
    pub fn opcode(&self) -> u8 {
        self.data.first().copied().unwrap_or(0)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Whether the length lives in-band at bytes 1..3.
    #[inline]
    pub fn is_dynamic(&self) -> bool {
        self.header_len > 1
    }

    /// Whole frame, opcode included.
    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    /// Bytes after the header.
    #[inline]
    pub fn payload(&self) -> &[u8] {
        &self.data[self.header_len..]
    }

    pub fn into_bytes(self) -> Vec<u8> {
        self.data
    }

    #[inline]
    pub fn position(&self) -> usize {
        self.position
    }

    #[inline]
    pub fn remaining(&self) -> usize {
        self.data.len().saturating_sub(self.position)
    }

    /// Move the cursor to an absolute offset, clamped to the frame length.
    pub fn seek(&mut self, position: usize) {
        self.position = position.min(self.data.len());
    }

    /// Move the cursor back to the first payload byte.
    pub fn rewind(&mut self) {
        self.position = self.header_len;
    }

    pub fn skip(&mut self, count: usize) {
        if count > self.remaining() {
            self.overrun = true;
        }
        self.position = (self.position + count).min(self.data.len());
    }

    #[inline]
    pub fn bypass_filter(&self) -> bool {
        self.bypass_filter
    }

    pub fn set_bypass_filter(&mut self, bypass: bool) {
        self.bypass_filter = bypass;
    }

    /// Whether any byte was rewritten after construction.
    #[inline]
    pub fn is_mutated(&self) -> bool {
        self.mutated
    }

    /// Whether any read ran past the end of the frame.
    #[inline]
    pub fn overrun(&self) -> bool {
        self.overrun
    }

    /// Rewrite one byte in place. Out-of-range indices are ignored.
    pub fn set_byte(&mut self, index: usize, value: u8) {
        if let Some(slot) = self.data.get_mut(index) {
            *slot = value;
            self.mutated = true;
        }
    }

    /// Lend the raw bytes out to a filter pass; see [`Frame::restore_bytes`].
    pub(crate) fn take_bytes(&mut self) -> Vec<u8> {
        std::mem::take(&mut self.data)
    }

    /// Put bytes back after a filter pass, rewinding the cursor if they changed.
    pub(crate) fn restore_bytes(&mut self, data: Vec<u8>, mutated: bool) {
        self.data = data;
        if mutated {
            self.header_len = self.header_len.min(self.data.len());
            self.position = self.header_len;
            self.mutated = true;
        }
    }

    #[inline]
    fn take<const N: usize>(&mut self) -> Option<[u8; N]> {
        let end = self.position + N;
        if end > self.data.len() {
            self.overrun = true;
            self.position = self.data.len();
            return None;
        }
        let mut out = [0u8; N];
        out.copy_from_slice(&self.data[self.position..end]);
        self.position = end;
        Some(out)
    }

    pub fn read_u8(&mut self) -> u8 {
        self.take::<1>().map(|b| b[0]).unwrap_or_default()
    }

    pub fn read_i8(&mut self) -> i8 {
        self.read_u8() as i8
    }

    pub fn read_bool(&mut self) -> bool {
        self.read_u8() != 0
    }

    pub fn read_u16(&mut self) -> u16 {
        self.take().map(u16::from_be_bytes).unwrap_or_default()
    }

    pub fn read_i16(&mut self) -> i16 {
        self.take().map(i16::from_be_bytes).unwrap_or_default()
    }

    pub fn read_u32(&mut self) -> u32 {
        self.take().map(u32::from_be_bytes).unwrap_or_default()
    }

    pub fn read_i32(&mut self) -> i32 {
        self.take().map(i32::from_be_bytes).unwrap_or_default()
    }

    pub fn read_u64(&mut self) -> u64 {
        self.take().map(u64::from_be_bytes).unwrap_or_default()
    }

    pub fn read_i64(&mut self) -> i64 {
        self.take().map(i64::from_be_bytes).unwrap_or_default()
    }

    /// Byte-swapped (little-endian) u16.
    pub fn read_u16_reversed(&mut self) -> u16 {
        self.take().map(u16::from_le_bytes).unwrap_or_default()
    }

    /// Byte-swapped (little-endian) u32.
    pub fn read_u32_reversed(&mut self) -> u32 {
        self.take().map(u32::from_le_bytes).unwrap_or_default()
    }

    /// Copy up to `count` bytes; fewer if the frame ends first.
    pub fn read_bytes(&mut self, count: usize) -> Vec<u8> {
        if count > self.remaining() {
            self.overrun = true;
        }
        let end = (self.position + count).min(self.data.len());
        let out = self.data[self.position..end].to_vec();
        self.position = end;
        out
    }

    /// Fixed-width (`Some(chars)`) or null-terminated (`None`) ASCII.
    pub fn read_ascii(&mut self, width: Option<usize>) -> String {
        self.read_text(TextEncoding::Ascii, width, false)
    }

    /// ASCII with characters outside the printable whitelist removed.
    pub fn read_ascii_safe(&mut self, width: Option<usize>) -> String {
        self.read_text(TextEncoding::Ascii, width, true)
    }

    pub fn read_unicode_be(&mut self, width: Option<usize>) -> String {
        self.read_text(TextEncoding::Utf16Be, width, false)
    }

    pub fn read_unicode_le(&mut self, width: Option<usize>) -> String {
        self.read_text(TextEncoding::Utf16Le, width, false)
    }

    pub fn read_utf8(&mut self, width: Option<usize>) -> String {
        self.read_text(TextEncoding::Utf8, width, false)
    }

    /// Read a string field.
    ///
    /// `width` is in characters (code units) for fixed-width fields; the cursor
    /// always advances by the full width. With `None` the string runs to the
    /// first NUL unit (consumed) or the end of the frame. `safe` strips every
    /// char outside `0x20..0xFFFE`.
    pub fn read_text(&mut self, encoding: TextEncoding, width: Option<usize>, safe: bool) -> String {
        let unit = encoding.unit();

        if width == Some(0) {
            return String::new();
        }
        if self.position + unit > self.data.len() {
            self.overrun = true;
            return String::new();
        }

        let remaining = self.remaining();
        let size = match width {
            Some(chars) => {
                if chars * unit > remaining {
                    self.overrun = true;
                }
                (chars * unit).min(remaining)
            }
            None => remaining - remaining % unit,
        };

        let slice = &self.data[self.position..self.position + size];
        let terminator = slice
            .chunks_exact(unit)
            .position(|c| c.iter().all(|&b| b == 0))
            .map(|index| index * unit);
        let text_len = terminator.unwrap_or(size);

        let mut text = decode(encoding, &slice[..text_len]);
        if safe {
            text.retain(is_safe_char);
        }

        self.position = match width {
            Some(chars) => (self.position + chars * unit).min(self.data.len()),
            None => self.position + text_len + terminator.map_or(0, |_| unit),
        };

        text
    }
}

/// Printable whitelist for the safe string mode.
#[inline]
pub fn is_safe_char(c: char) -> bool {
    let c = c as u32;
    (0x20..0xFFFE).contains(&c)
}

fn decode(encoding: TextEncoding, bytes: &[u8]) -> String {
    match encoding {
        TextEncoding::Ascii => bytes.iter().map(|&b| b as char).collect(),
        TextEncoding::Utf8 => String::from_utf8_lossy(bytes).into_owned(),
        TextEncoding::Utf16Be => decode_utf16(bytes, u16::from_be_bytes),
        TextEncoding::Utf16Le => decode_utf16(bytes, u16::from_le_bytes),
    }
}

fn decode_utf16(bytes: &[u8], unit: fn([u8; 2]) -> u16) -> String {
    let units = bytes.chunks_exact(2).map(|c| unit([c[0], c[1]]));
    char::decode_utf16(units)
        .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
        .collect()
}
