//! # Frame Reassembly
//!
//! Incremental extraction of complete frames from partial socket reads.
//!
//! Inbound bytes (decompressed first, when compression is on) accumulate in a
//! [`RingBuffer`]. Each extraction pass walks a small state machine:
//!
//! ```text
//! AwaitingHeader --(opcode + length known)--> AwaitingBody --(all bytes)--> emit frame
//!        ^                                                                      |
//!        +----------------------------------------------------------------------+
//! ```
//!
//! Nothing is consumed until a frame is complete, and every complete frame
//! buffered is drained before the pass returns.
//!
//! ## Validation
//! A dynamic frame whose declared total length is below the 3-byte header or
//! above the configured maximum, or a fixed table length of 0, is rejected.
//! The stream cannot be resynchronised after that, so the owner is expected
//! to drop the connection. Frames completed ahead of the bad header are
//! still handed out first.

use std::sync::Arc;

use super::frame::Frame;
use super::length_table::{FrameLength, LengthTable, DYNAMIC_HEADER_LEN};
use super::ring_buffer::RingBuffer;
use crate::error::{ProtocolError, Result};
use crate::utils::compression::StreamInflater;

/// Largest frame the 2-byte length field can describe.
pub const DEFAULT_MAX_FRAME_SIZE: usize = u16::MAX as usize;

/// Initial ring buffer storage.
pub const DEFAULT_RECV_BUFFER_SIZE: usize = 0x10000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Extraction {
    AwaitingHeader,
    AwaitingBody { length: FrameLength, total: usize },
}

pub struct FrameReassembler {
    ring: RingBuffer,
    lengths: Arc<dyn LengthTable>,
    inflater: Option<StreamInflater>,
    inflated: Vec<u8>,
    state: Extraction,
    max_frame_size: usize,
}

impl FrameReassembler {
    pub fn new(lengths: Arc<dyn LengthTable>) -> Self {
        Self::with_limits(lengths, DEFAULT_MAX_FRAME_SIZE, DEFAULT_RECV_BUFFER_SIZE)
    }

    pub fn with_limits(
        lengths: Arc<dyn LengthTable>,
        max_frame_size: usize,
        recv_buffer_size: usize,
    ) -> Self {
        Self {
            ring: RingBuffer::with_capacity(recv_buffer_size),
            lengths,
            inflater: None,
            inflated: Vec::new(),
            state: Extraction::AwaitingHeader,
            max_frame_size: max_frame_size.min(DEFAULT_MAX_FRAME_SIZE),
        }
    }

    /// Route every subsequent read through `inflater`.
    pub fn enable_compression(&mut self, inflater: StreamInflater) {
        self.inflater = Some(inflater);
    }

    #[inline]
    pub fn is_compressed(&self) -> bool {
        self.inflater.is_some()
    }

    /// Bytes buffered but not yet part of an emitted frame.
    #[inline]
    pub fn buffered(&self) -> usize {
        self.ring.len()
    }

    /// Drop all buffered bytes, carry-over and extraction progress.
    pub fn clear(&mut self) {
        self.ring.clear();
        self.state = Extraction::AwaitingHeader;
        if let Some(inflater) = self.inflater.as_mut() {
            inflater.reset();
        }
    }

    /// Feed one socket read and drain every frame it completes.
    pub fn push(&mut self, data: &[u8]) -> Result<Vec<Frame>> {
        self.feed(data)?;
        self.extract()
    }

    /// Buffer one socket read without extracting.
    pub fn feed(&mut self, data: &[u8]) -> Result<()> {
        match self.inflater.as_mut() {
            Some(inflater) => {
                self.inflated.clear();
                inflater.feed(data, &mut self.inflated)?;
                self.ring.enqueue(&self.inflated);
            }
            None => self.ring.enqueue(data),
        }
        Ok(())
    }

    /// Drain every complete frame currently buffered, in arrival order.
    ///
    /// A rejected header only fails the call when no frame precedes it.
    /// Nothing of the bad frame is consumed, so the next call reports it.
    pub fn extract(&mut self) -> Result<Vec<Frame>> {
        let mut frames = Vec::new();
        loop {
            match self.next_frame() {
                Ok(Some(frame)) => frames.push(frame),
                Ok(None) => return Ok(frames),
                Err(e) if frames.is_empty() => return Err(e),
                Err(_) => return Ok(frames),
            }
        }
    }

    /// Advance the state machine until one frame completes or data runs out.
    pub fn next_frame(&mut self) -> Result<Option<Frame>> {
        loop {
            match self.state {
                Extraction::AwaitingHeader => {
                    if self.ring.is_empty() {
                        return Ok(None);
                    }

                    let opcode = self.ring.peek_byte(0);
                    let length = self.lengths.frame_length(opcode);
                    let total = match length {
                        FrameLength::Fixed(0) => {
                            return Err(ProtocolError::MalformedFrame { opcode, declared: 0 });
                        }
                        FrameLength::Fixed(size) => size,
                        FrameLength::Dynamic => {
                            if self.ring.len() < DYNAMIC_HEADER_LEN {
                                return Ok(None);
                            }
                            let declared = self.ring.peek_u16_be(1) as usize;
                            if declared < DYNAMIC_HEADER_LEN {
                                return Err(ProtocolError::MalformedFrame { opcode, declared });
                            }
                            declared
                        }
                    };

                    if total > self.max_frame_size {
                        return Err(ProtocolError::OversizedFrame {
                            opcode,
                            declared: total,
                            max: self.max_frame_size,
                        });
                    }

                    self.state = Extraction::AwaitingBody { length, total };
                }
                Extraction::AwaitingBody { length, total } => {
                    if self.ring.len() < total {
                        return Ok(None);
                    }

                    let data = self.ring.dequeue_vec(total);
                    self.state = Extraction::AwaitingHeader;
                    return Ok(Some(Frame::new(data, length)));
                }
            }
        }
    }
}

impl std::fmt::Debug for FrameReassembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FrameReassembler")
            .field("buffered", &self.ring.len())
            .field("state", &self.state)
            .field("compressed", &self.inflater.is_some())
            .field("max_frame_size", &self.max_frame_size)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::compression::Huffman;

    fn table(opcode: u8) -> i16 {
        match opcode {
            0x73 => 1,
            0x22 => 3,
            0x00 => 0,
            _ => -1,
        }
    }

    fn reassembler() -> FrameReassembler {
        FrameReassembler::new(Arc::new(table))
    }

    #[test]
    fn test_fixed_frame_single_byte() {
        let mut r = reassembler();
        let frames = r.push(&[0x73]).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_bytes(), &[0x73]);
        assert_eq!(r.buffered(), 0);
    }

    #[test]
    fn test_fixed_frame_waits_for_body() {
        let mut r = reassembler();
        assert!(r.push(&[0x22, 0x01]).unwrap().is_empty());
        let frames = r.push(&[0x02]).unwrap();
        assert_eq!(frames[0].as_bytes(), &[0x22, 0x01, 0x02]);
    }

    #[test]
    fn test_dynamic_header_needs_three_bytes() {
        let mut r = reassembler();
        assert!(r.push(&[0xBF, 0x00]).unwrap().is_empty());
        assert_eq!(r.buffered(), 2);
        assert!(r.push(&[0x05, 0xAA]).unwrap().is_empty());
        let frames = r.push(&[0xBB]).unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].as_bytes(), &[0xBF, 0x00, 0x05, 0xAA, 0xBB]);
        assert_eq!(frames[0].payload(), &[0xAA, 0xBB]);
    }

    #[test]
    fn test_drains_all_complete_frames() {
        let mut r = reassembler();
        let frames = r
            .push(&[0x73, 0x22, 1, 2, 0xBF, 0x00, 0x03, 0x73, 0x22])
            .unwrap();
        let opcodes: Vec<u8> = frames.iter().map(Frame::opcode).collect();
        assert_eq!(opcodes, vec![0x73, 0x22, 0xBF, 0x73]);
        assert_eq!(r.buffered(), 1);
    }

    #[test]
    fn test_short_dynamic_length_rejected() {
        let mut r = reassembler();
        let err = r.push(&[0xBF, 0x00, 0x02]).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::MalformedFrame { opcode: 0xBF, declared: 2 }
        ));
    }

    #[test]
    fn test_oversized_dynamic_length_rejected() {
        let mut r = FrameReassembler::with_limits(Arc::new(table), 1024, 2048);
        let err = r.push(&[0xBF, 0x10, 0x00]).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::OversizedFrame { declared: 4096, max: 1024, .. }
        ));
    }

    #[test]
    fn test_frames_before_bad_header_survive() {
        let mut r = FrameReassembler::new(Arc::new(|opcode: u8| if opcode == 0x73 { 2 } else { -1 }));
        let frames = r.push(&[0x73, 0x01, 0x73, 0x02, 0xBF, 0x00, 0x01]).unwrap();
        let bytes: Vec<Vec<u8>> = frames.into_iter().map(Frame::into_bytes).collect();
        assert_eq!(bytes, vec![vec![0x73, 0x01], vec![0x73, 0x02]]);
        assert_eq!(r.buffered(), 3);

        assert!(matches!(
            r.extract(),
            Err(ProtocolError::MalformedFrame { opcode: 0xBF, declared: 1 })
        ));
        assert!(r.push(&[0x73]).is_err());
    }

    #[test]
    fn test_zero_fixed_length_rejected() {
        let mut r = reassembler();
        assert!(matches!(
            r.push(&[0x00]),
            Err(ProtocolError::MalformedFrame { opcode: 0x00, declared: 0 })
        ));
    }

    #[test]
    fn test_compressed_frames_split_across_reads() {
        let mut r = reassembler();
        r.enable_compression(StreamInflater::huffman());

        let mut wire = Huffman::encode(&[0x73, 0xBF, 0x00, 0x04]);
        wire.extend(Huffman::encode(&[0x09, 0x22, 0x05, 0x06]));

        let mut frames = Vec::new();
        for byte in &wire {
            frames.extend(r.push(std::slice::from_ref(byte)).unwrap());
        }
        let bytes: Vec<Vec<u8>> = frames.into_iter().map(Frame::into_bytes).collect();
        assert_eq!(
            bytes,
            vec![vec![0x73], vec![0xBF, 0x00, 0x04, 0x09], vec![0x22, 0x05, 0x06]]
        );
    }

    #[test]
    fn test_clear_resets_progress() {
        let mut r = reassembler();
        r.push(&[0xBF, 0x00, 0x10, 0x01]).unwrap();
        r.clear();
        assert_eq!(r.buffered(), 0);
        assert_eq!(r.push(&[0x73]).unwrap().len(), 1);
    }
}
