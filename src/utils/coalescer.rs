//! # Outbound Coalescer
//!
//! FIFO of pooled segments with a hard byte cap.
//!
//! Outgoing bytes are copied into a "current" segment until it fills, which
//! then moves onto the queue. The cap covers queued segments, the current
//! fill and the incoming bytes together; a write that would exceed it fails
//! with [`ProtocolError::CapacityExceeded`] and queues nothing, because a
//! partially queued frame would corrupt the framing of everything after it.

use std::collections::VecDeque;

use super::segment_pool::{Segment, SegmentPool};
use crate::error::{ProtocolError, Result};

/// Default byte cap for pending outbound data.
pub const DEFAULT_OUTBOUND_CAPACITY: usize = 2 * 1024 * 1024;

#[derive(Debug)]
pub struct OutboundCoalescer {
    pool: SegmentPool,
    queue: VecDeque<Segment>,
    current: Option<Segment>,
    capacity: usize,
    frames: usize,
}

impl OutboundCoalescer {
    pub fn new(pool: SegmentPool, capacity: usize) -> Self {
        Self {
            pool,
            queue: VecDeque::new(),
            current: None,
            capacity,
            frames: 0,
        }
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Pending bytes as counted by the cap check.
    pub fn pending_bytes(&self) -> usize {
        self.queue.len() * self.pool.segment_size()
            + self.current.as_ref().map_or(0, Segment::len)
    }

    /// Frames enqueued since the last [`OutboundCoalescer::take_pending`].
    #[inline]
    pub fn pending_frames(&self) -> usize {
        self.frames
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty() && self.current.as_ref().map_or(true, Segment::is_empty)
    }

    /// Queue `data`, or fail without queuing any of it.
    pub fn enqueue(&mut self, data: &[u8]) -> Result<()> {
        let pending = self.pending_bytes() + data.len();
        if pending > self.capacity {
            return Err(ProtocolError::CapacityExceeded {
                pending,
                capacity: self.capacity,
            });
        }

        let mut rest = data;
        while !rest.is_empty() {
            let current = self.current.get_or_insert_with(|| self.pool.acquire());
            let taken = current.push_slice(rest);
            rest = &rest[taken..];

            if current.is_full() {
                if let Some(full) = self.current.take() {
                    self.queue.push_back(full);
                }
            }
        }
        self.frames += 1;
        Ok(())
    }

    /// Pop the oldest full segment. Dropping it returns it to the pool.
    pub fn dequeue(&mut self) -> Option<Segment> {
        self.queue.pop_front()
    }

    /// Take every pending byte, full segments first, then the partial one.
    pub fn take_pending(&mut self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.pending_bytes());
        while let Some(segment) = self.queue.pop_front() {
            out.extend_from_slice(&segment);
        }
        if let Some(segment) = self.current.take() {
            out.extend_from_slice(&segment);
        }
        self.frames = 0;
        out
    }

    /// Release the current and every queued segment back to the pool.
    pub fn clear(&mut self) {
        self.queue.clear();
        self.current = None;
        self.frames = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn coalescer(segment: usize, capacity: usize) -> OutboundCoalescer {
        OutboundCoalescer::new(SegmentPool::new(segment, 2), capacity)
    }

    #[test]
    fn test_enqueue_fills_segments_in_order() {
        let mut out = coalescer(4, 64);
        out.enqueue(b"abcdef").unwrap();
        out.enqueue(b"gh").unwrap();

        assert_eq!(out.dequeue().unwrap().as_slice(), b"abcd");
        assert_eq!(out.dequeue().unwrap().as_slice(), b"efgh");
        assert!(out.dequeue().is_none());
        assert!(out.is_empty());
    }

    #[test]
    fn test_partial_segment_stays_current() {
        let mut out = coalescer(4, 64);
        out.enqueue(b"abcdefg").unwrap();
        assert_eq!(out.pending_bytes(), 7);
        assert_eq!(out.dequeue().unwrap().as_slice(), b"abcd");
        assert!(out.dequeue().is_none());
        assert_eq!(out.take_pending(), b"efg");
    }

    #[test]
    fn test_cap_is_exact() {
        let mut out = coalescer(4, 10);
        out.enqueue(&[1; 10]).unwrap();
        let before = out.pending_bytes();

        let err = out.enqueue(&[2]).unwrap_err();
        assert!(matches!(
            err,
            ProtocolError::CapacityExceeded { pending: 11, capacity: 10 }
        ));
        assert_eq!(out.pending_bytes(), before);
        assert_eq!(out.pending_frames(), 1);
        assert_eq!(out.take_pending(), vec![1; 10]);
        assert_eq!(out.pending_frames(), 0);
    }

    #[test]
    fn test_clear_returns_segments() {
        let pool = SegmentPool::new(4, 0);
        let mut out = OutboundCoalescer::new(pool.clone(), 64);
        out.enqueue(&[0; 10]).unwrap();
        out.clear();
        assert_eq!(pool.available(), 3);
        assert_eq!(out.pending_bytes(), 0);
    }
}
