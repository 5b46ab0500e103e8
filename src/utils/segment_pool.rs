//! # Segment Pool
//!
//! Pool of fixed-size byte segments used to coalesce outbound bytes without a
//! heap allocation per message.
//!
//! A [`Segment`] returns its storage to the pool when dropped, so ownership
//! moves cleanly between the free list, the coalescer queue and the segment
//! currently being filled. The free list never shrinks; an empty pool
//! allocates a fresh segment on demand.
//!
//! ## Usage
//! ```rust
//! use framewire::utils::segment_pool::SegmentPool;
//!
//! let pool = SegmentPool::new(512, 4);
//! let mut segment = pool.acquire();
//! assert_eq!(segment.push_slice(b"abc"), 3);
//! drop(segment);
//! assert_eq!(pool.available(), 4);
//! ```

use std::sync::{Arc, Mutex};

/// Segment size used when none is configured.
pub const DEFAULT_SEGMENT_SIZE: usize = 512;

type FreeList = Arc<Mutex<Vec<Vec<u8>>>>;

/// Fixed-capacity pooled byte buffer with a fill length.
pub struct Segment {
    buffer: Vec<u8>,
    size: usize,
    pool: FreeList,
}

impl Segment {
    /// Bytes currently filled.
    #[inline]
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.buffer.len() == self.size
    }

    /// Room left before the segment is full.
    #[inline]
    pub fn space(&self) -> usize {
        self.size - self.buffer.len()
    }

    /// Copy as much of `data` as fits; returns the number of bytes taken.
    pub fn push_slice(&mut self, data: &[u8]) -> usize {
        let take = data.len().min(self.space());
        self.buffer.extend_from_slice(&data[..take]);
        take
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.buffer
    }
}

impl Drop for Segment {
    fn drop(&mut self) {
        self.buffer.clear();
        // a poisoned free list only costs a reallocation later
        if let Ok(mut free) = self.pool.lock() {
            free.push(std::mem::take(&mut self.buffer));
        }
    }
}

impl std::ops::Deref for Segment {
    type Target = [u8];

    fn deref(&self) -> &Self::Target {
        &self.buffer
    }
}

impl std::fmt::Debug for Segment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Segment")
            .field("len", &self.buffer.len())
            .field("size", &self.size)
            .finish()
    }
}

/// Thread-safe pool of equally sized segments.
#[derive(Clone)]
pub struct SegmentPool {
    free: FreeList,
    segment_size: usize,
}

impl SegmentPool {
    /// Create a pool of `initial` pre-allocated segments of `segment_size` bytes.
    pub fn new(segment_size: usize, initial: usize) -> Self {
        let segment_size = segment_size.max(1);
        let free = (0..initial)
            .map(|_| Vec::with_capacity(segment_size))
            .collect();

        Self {
            free: Arc::new(Mutex::new(free)),
            segment_size,
        }
    }

    /// Take a segment from the free list, or allocate one if it is empty.
    pub fn acquire(&self) -> Segment {
        let buffer = self
            .free
            .lock()
            .ok()
            .and_then(|mut free| free.pop())
            .unwrap_or_else(|| Vec::with_capacity(self.segment_size));

        Segment {
            buffer,
            size: self.segment_size,
            pool: Arc::clone(&self.free),
        }
    }

    #[inline]
    pub fn segment_size(&self) -> usize {
        self.segment_size
    }

    /// Segments currently on the free list.
    pub fn available(&self) -> usize {
        self.free.lock().map(|free| free.len()).unwrap_or(0)
    }
}

impl Default for SegmentPool {
    fn default() -> Self {
        Self::new(DEFAULT_SEGMENT_SIZE, 16)
    }
}

impl std::fmt::Debug for SegmentPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SegmentPool")
            .field("segment_size", &self.segment_size)
            .field("available", &self.available())
            .finish()
    }
}
