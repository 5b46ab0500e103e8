//! # Stream Decompression
//!
//! Inbound compression for the game connection.
//!
//! Decompression works on self-delimited units: a [`Decompressor`] decodes
//! one unit at a time from the front of its input, and reports "need more"
//! when the unit is not complete yet. [`StreamInflater`] keeps whatever tail of
//! a read did not form a complete unit and prepends it to the next read, so
//! units split across socket reads decode correctly.
//!
//! [`Huffman`] is the static-tree codec used by the protocol. Each unit ends
//! with the flush symbol (256); the bits after it up to the byte boundary are
//! padding.

use std::sync::{Arc, OnceLock};

use crate::error::{constants::ERR_CARRY_OVER_OVERFLOW, ProtocolError, Result};

/// Default ceiling for undecoded bytes carried between reads.
pub const DEFAULT_MAX_CARRY: usize = 0x10000;

/// Symbol that terminates a unit.
const FLUSH_SYMBOL: usize = 256;

/// Outcome of decoding one complete unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeStep {
    /// Input bytes the unit occupied, padding included.
    pub consumed: usize,
    /// Bytes appended to the output.
    pub produced: usize,
}

/// Unit-at-a-time stream decoder.
pub trait Decompressor: Send + Sync {
    /// Decode one unit from the front of `src`, appending its output to `dst`.
    ///
    /// Returns `None` and leaves `dst` untouched when `src` does not hold a
    /// complete unit.
    fn decode_unit(&self, src: &[u8], dst: &mut Vec<u8>) -> Option<DecodeStep>;
}

/// Static-tree Huffman codec.
#[derive(Debug, Default, Clone, Copy)]
pub struct Huffman;

impl Huffman {
    /// Encode `data` as a single unit: symbols, flush, zero padding.
    pub fn encode(data: &[u8]) -> Vec<u8> {
        let codes = code_table();
        let mut out = Vec::with_capacity(data.len() + 2);
        let mut acc = 0u8;
        let mut bits = 0u8;

        let symbols = data.iter().map(|&b| b as usize).chain(std::iter::once(FLUSH_SYMBOL));
        for symbol in symbols {
            let (code, len) = codes[symbol];
            for shift in (0..len).rev() {
                acc = (acc << 1) | ((code >> shift) & 1) as u8;
                bits += 1;
                if bits == 8 {
                    out.push(acc);
                    acc = 0;
                    bits = 0;
                }
            }
        }

        if bits > 0 {
            out.push(acc << (8 - bits));
        }
        out
    }

    /// Decode every complete unit in `src`. Trailing partial units are dropped.
    pub fn decode_all(src: &[u8]) -> Vec<u8> {
        let mut out = Vec::with_capacity(src.len() * 2);
        let mut offset = 0;
        while let Some(step) = Huffman.decode_unit(&src[offset..], &mut out) {
            offset += step.consumed;
        }
        out
    }
}

impl Decompressor for Huffman {
    fn decode_unit(&self, src: &[u8], dst: &mut Vec<u8>) -> Option<DecodeStep> {
        let start = dst.len();
        let mut node = 0usize;

        for (index, &byte) in src.iter().enumerate() {
            for shift in (0..8).rev() {
                let next = if byte & (1 << shift) != 0 {
                    DECODE_TREE[node * 2]
                } else {
                    DECODE_TREE[node * 2 + 1]
                };

                if next > 0 {
                    node = next as usize;
                    continue;
                }

                let symbol = next.unsigned_abs() as usize;
                if symbol == FLUSH_SYMBOL {
                    return Some(DecodeStep {
                        consumed: index + 1,
                        produced: dst.len() - start,
                    });
                }
                dst.push(symbol as u8);
                node = 0;
            }
        }

        dst.truncate(start);
        None
    }
}

/// Carry-over wrapper that turns a unit decoder into a stream decoder.
pub struct StreamInflater {
    decoder: Arc<dyn Decompressor>,
    carry: Vec<u8>,
    max_carry: usize,
}

impl StreamInflater {
    pub fn new(decoder: Arc<dyn Decompressor>) -> Self {
        Self::with_limit(decoder, DEFAULT_MAX_CARRY)
    }

    pub fn with_limit(decoder: Arc<dyn Decompressor>, max_carry: usize) -> Self {
        Self {
            decoder,
            carry: Vec::new(),
            max_carry,
        }
    }

    /// Inflater for the protocol's Huffman codec.
    pub fn huffman() -> Self {
        Self::new(Arc::new(Huffman))
    }

    /// Undecoded bytes waiting for the rest of their unit.
    #[inline]
    pub fn carry_len(&self) -> usize {
        self.carry.len()
    }

    pub fn reset(&mut self) {
        self.carry.clear();
    }

    /// Decode `input` (after any carried bytes), appending output to `out`.
    ///
    /// Returns the number of bytes appended. Fails with
    /// [`ProtocolError::DecompressionFailure`] when the undecodable tail grows
    /// past the carry limit.
    pub fn feed(&mut self, input: &[u8], out: &mut Vec<u8>) -> Result<usize> {
        let before = out.len();

        let mut pending = std::mem::take(&mut self.carry);
        pending.extend_from_slice(input);

        let mut offset = 0;
        while offset < pending.len() {
            match self.decoder.decode_unit(&pending[offset..], out) {
                Some(step) => offset += step.consumed,
                None => break,
            }
        }

        let rest = pending.len() - offset;
        if rest > self.max_carry {
            tracing::warn!(carry = rest, limit = self.max_carry, "{}", ERR_CARRY_OVER_OVERFLOW);
            return Err(ProtocolError::DecompressionFailure);
        }

        pending.drain(..offset);
        self.carry = pending;
        Ok(out.len() - before)
    }
}

impl std::fmt::Debug for StreamInflater {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamInflater")
            .field("carry", &self.carry.len())
            .field("max_carry", &self.max_carry)
            .finish()
    }
}

/// Per-symbol (code, bit length), derived once from the decode tree.
fn code_table() -> &'static [(u32, u8); 257] {
    static CODES: OnceLock<[(u32, u8); 257]> = OnceLock::new();
    CODES.get_or_init(|| {
        let mut codes = [(0u32, 0u8); 257];
        let mut stack = vec![(0usize, 0u32, 0u8)];
        while let Some((node, code, len)) = stack.pop() {
            for (bit, child) in [(1u32, DECODE_TREE[node * 2]), (0, DECODE_TREE[node * 2 + 1])] {
                let code = (code << 1) | bit;
                if child > 0 {
                    stack.push((child as usize, code, len + 1));
                } else {
                    codes[child.unsigned_abs() as usize] = (code, len + 1);
                }
            }
        }
        codes
    })
}

const DECODE_TREE: [i16; 512] = [
    1, 2, 3, 4, 5, 0, 6, 7, 8, 9, 10, 11, 12, 13, -256, 14,
    15, 16, 17, 18, 19, 20, 21, 22, -1, 23, 24, 25, 26, 27, 28, 29,
    30, 31, 32, 33, 34, 35, 36, 37, 38, 39, 40, -64, 41, 42, 43, 44,
    -6, 45, 46, 47, 48, 49, 50, 51, -119, 52, -32, 53, 54, -14, 55, -5,
    56, 57, 58, 59, 60, -2, 61, 62, 63, 64, 65, 66, 67, 68, 69, 70,
    71, 72, -51, 73, 74, 75, 76, 77, -101, -111, -4, -97, 78, 79, -110, 80,
    81, -116, 82, 83, 84, -255, 85, 86, 87, 88, 89, 90, -15, -10, 91, 92,
    -21, 93, -117, 94, 95, 96, 97, 98, 99, 100, -114, 101, -105, 102, -26, 103,
    104, 105, 106, 107, 108, 109, 110, 111, 112, -3, 113, -7, 114, -131, 115, -144,
    116, 117, -20, 118, 119, 120, 121, 122, 123, 124, 125, 126, 127, 128, 129, -100,
    130, -8, 131, 132, 133, 134, -120, 135, 136, -31, 137, 138, -109, -234, 139, 140,
    141, 142, 143, 144, -112, 145, -19, 146, 147, 148, 149, -66, 150, -145, -13, -65,
    151, 152, 153, 154, -30, 155, 156, 157, -99, 158, 159, 160, 161, 162, -23, 163,
    -29, 164, -11, 165, 166, -115, 167, 168, 169, 170, -16, 171, -34, 172, 173, -132,
    174, -108, 175, -22, 176, -9, 177, -84, -17, -37, -28, 178, 179, 180, 181, 182,
    183, 184, 185, 186, 187, -104, 188, -78, 189, -61, -79, -178, -59, -134, 190, -25,
    -83, -18, 191, -57, -67, 192, -98, 193, -12, -68, 194, 195, -55, -128, -24, -50,
    -70, 196, -94, -33, 197, -129, -74, 198, -82, 199, -56, -87, -44, 200, -248, 201,
    -163, -81, -52, -123, 202, -113, -48, -41, -122, -40, 203, -90, -54, 204, -86, -192,
    205, 206, 207, -130, -53, 208, -133, -45, 209, 210, 211, -91, 212, 213, -106, -88,
    214, 215, 216, 217, 218, -49, 219, 220, 221, 222, 223, 224, 225, 226, 227, -102,
    -160, 228, -46, 229, -127, 230, -103, 231, 232, 233, -60, 234, 235, -76, 236, -121,
    237, -73, -149, 238, 239, -107, -35, 240, -71, -27, -69, 241, -89, -77, -62, -118,
    -75, -85, -72, -58, -63, -80, 242, -42, -150, -157, -139, -236, -126, -243, -142, -214,
    -138, -206, -240, -146, -204, -147, -152, -201, -227, -207, -154, -209, -153, -254, -176, -156,
    -165, -210, -172, -185, -195, -170, -232, -211, -219, -239, -200, -177, -175, -212, -244, -143,
    -246, -171, -203, -221, -202, -181, -173, -250, -184, -164, -193, -218, -199, -220, -190, -249,
    -230, -217, -169, -216, -191, -197, -47, 243, 244, 245, 246, 247, -148, -159, 248, 249,
    -92, -93, -96, -225, -151, -95, 250, 251, -241, 252, -161, -36, 253, 254, -135, -39,
    -187, -124, 255, -251, -162, -238, -242, -38, -43, -125, -215, -253, -140, -208, -137, -235,
    -158, -237, -136, -205, -155, -141, -228, -229, -213, -168, -224, -194, -196, -226, -183, -233,
    -231, -167, -174, -189, -252, -166, -198, -222, -188, -179, -223, -182, -180, -186, -245, -247,
];
