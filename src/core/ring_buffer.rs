//! # Ring Buffer
//!
//! Growable circular byte buffer used as the reassembly substrate for inbound
//! socket bytes.
//!
//! ## Behaviour
//! - Grows by reallocate-and-copy to the next multiple of 2048 bytes, never shrinks
//! - `dequeue` never hands out more bytes than are buffered
//! - When drained completely, head and tail snap back to 0 so the common
//!   "whole frame arrives, whole frame leaves" case never wraps
//! - Peeks past the buffered length return 0; callers check [`RingBuffer::len`] first

/// Growth granularity in bytes.
const GROWTH_STEP: usize = 2048;

/// Circular byte FIFO.
#[derive(Debug, Default, Clone)]
pub struct RingBuffer {
    buffer: Vec<u8>,
    head: usize,
    tail: usize,
    len: usize,
}

impl RingBuffer {
    /// Create an empty buffer. No storage is allocated until the first enqueue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a buffer with at least `capacity` bytes of storage.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buffer: vec![0; round_up(capacity)],
            ..Self::default()
        }
    }

    /// Number of buffered bytes.
    #[inline]
    pub fn len(&self) -> usize {
        self.len
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Allocated storage in bytes.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Drop all buffered bytes. Storage is kept.
    pub fn clear(&mut self) {
        self.head = 0;
        self.tail = 0;
        self.len = 0;
    }

    /// Append `data` at the tail, growing the storage if needed.
    pub fn enqueue(&mut self, data: &[u8]) {
        if data.is_empty() {
            return;
        }

        let required = self.len + data.len();
        if required > self.capacity() {
            self.grow(required);
        }

        let capacity = self.capacity();
        let first = data.len().min(capacity - self.tail);
        self.buffer[self.tail..self.tail + first].copy_from_slice(&data[..first]);
        let rest = data.len() - first;
        if rest > 0 {
            self.buffer[..rest].copy_from_slice(&data[first..]);
        }

        self.tail = (self.tail + data.len()) % capacity;
        self.len += data.len();
    }

    /// Copy up to `out.len()` bytes from the head into `out` and consume them.
    ///
    /// Returns the number of bytes actually copied.
    pub fn dequeue(&mut self, out: &mut [u8]) -> usize {
        let size = out.len().min(self.len);
        if size == 0 {
            return 0;
        }

        let capacity = self.capacity();
        let first = size.min(capacity - self.head);
        out[..first].copy_from_slice(&self.buffer[self.head..self.head + first]);
        let rest = size - first;
        if rest > 0 {
            out[first..size].copy_from_slice(&self.buffer[..rest]);
        }

        self.head = (self.head + size) % capacity;
        self.len -= size;

        if self.len == 0 {
            self.head = 0;
            self.tail = 0;
        }

        size
    }

    /// Consume exactly `count` bytes (or everything buffered) into a new vector.
    pub fn dequeue_vec(&mut self, count: usize) -> Vec<u8> {
        let mut out = vec![0; count.min(self.len)];
        self.dequeue(&mut out);
        out
    }

    /// Read the byte `offset` positions past the head without consuming it.
    #[inline]
    pub fn peek_byte(&self, offset: usize) -> u8 {
        if offset >= self.len {
            return 0;
        }
        self.buffer[(self.head + offset) % self.capacity()]
    }

    /// Read a big-endian u16 starting `offset` bytes past the head.
    #[inline]
    pub fn peek_u16_be(&self, offset: usize) -> u16 {
        u16::from_be_bytes([self.peek_byte(offset), self.peek_byte(offset + 1)])
    }

    fn grow(&mut self, required: usize) {
        let mut grown = vec![0; round_up(required)];

        if self.len > 0 {
            if self.head < self.tail {
                grown[..self.len].copy_from_slice(&self.buffer[self.head..self.tail]);
            } else {
                let first = self.capacity() - self.head;
                grown[..first].copy_from_slice(&self.buffer[self.head..]);
                grown[first..first + self.tail].copy_from_slice(&self.buffer[..self.tail]);
            }
        }

        self.head = 0;
        self.tail = self.len;
        self.buffer = grown;
    }
}

#[inline]
fn round_up(size: usize) -> usize {
    size.div_ceil(GROWTH_STEP).max(1) * GROWTH_STEP
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_enqueue_dequeue_basic() {
        let mut ring = RingBuffer::new();
        ring.enqueue(b"hello");
        assert_eq!(ring.len(), 5);
        assert_eq!(ring.capacity(), 2048);

        let mut out = [0u8; 3];
        assert_eq!(ring.dequeue(&mut out), 3);
        assert_eq!(&out, b"hel");
        assert_eq!(ring.len(), 2);
    }

    #[test]
    fn test_dequeue_clamps_to_length() {
        let mut ring = RingBuffer::new();
        ring.enqueue(&[1, 2]);

        let mut out = [0u8; 10];
        assert_eq!(ring.dequeue(&mut out), 2);
        assert_eq!(&out[..2], &[1, 2]);
        assert!(ring.is_empty());
    }

    #[test]
    fn test_indices_reset_when_drained() {
        let mut ring = RingBuffer::new();
        ring.enqueue(&[7; 100]);
        let mut out = [0u8; 100];
        ring.dequeue(&mut out);

        assert_eq!(ring.head, 0);
        assert_eq!(ring.tail, 0);
    }

    #[test]
    fn test_wraparound_preserves_order() {
        let mut ring = RingBuffer::with_capacity(2048);
        ring.enqueue(&[0xAA; 2000]);
        let mut sink = vec![0u8; 1990];
        ring.dequeue(&mut sink);

        // 10 bytes left near the end; this write wraps to the start
        let data: Vec<u8> = (0..100).collect();
        ring.enqueue(&data);
        assert_eq!(ring.capacity(), 2048);
        assert!(ring.tail < ring.head);

        let out = ring.dequeue_vec(110);
        assert_eq!(&out[..10], &[0xAA; 10]);
        assert_eq!(&out[10..], data.as_slice());
    }

    #[test]
    fn test_growth_of_wrapped_content() {
        let mut ring = RingBuffer::with_capacity(2048);
        ring.enqueue(&[1; 2000]);
        let mut sink = vec![0u8; 1500];
        ring.dequeue(&mut sink);
        ring.enqueue(&[2; 1000]);
        assert!(ring.tail < ring.head);

        // forces a resize while the content is split across the array end
        ring.enqueue(&[3; 3000]);
        assert_eq!(ring.capacity(), 6144);
        assert_eq!(ring.len(), 4500);

        let out = ring.dequeue_vec(4500);
        assert!(out[..500].iter().all(|&b| b == 1));
        assert!(out[500..1500].iter().all(|&b| b == 2));
        assert!(out[1500..].iter().all(|&b| b == 3));
    }

    #[test]
    fn test_peek_does_not_consume() {
        let mut ring = RingBuffer::new();
        ring.enqueue(&[0xBF, 0x01, 0x2C]);

        assert_eq!(ring.peek_byte(0), 0xBF);
        assert_eq!(ring.peek_u16_be(1), 0x012C);
        assert_eq!(ring.len(), 3);
    }

    #[test]
    fn test_peek_past_end_returns_zero() {
        let mut ring = RingBuffer::new();
        ring.enqueue(&[0xFF]);
        assert_eq!(ring.peek_byte(1), 0);
        assert_eq!(ring.peek_u16_be(0), 0xFF00);
    }

    #[test]
    fn test_clear_keeps_storage() {
        let mut ring = RingBuffer::new();
        ring.enqueue(&[9; 4000]);
        ring.clear();
        assert!(ring.is_empty());
        assert_eq!(ring.capacity(), 4096);
    }
}
