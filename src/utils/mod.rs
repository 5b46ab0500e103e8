//! # Utility Modules
//!
//! Supporting pieces used by the transport.
//!
//! ## Components
//! - **Compression**: Huffman stream decoder with carry-over between reads
//! - **Segment Pool**: reusable fixed-size send buffers
//! - **Coalescer**: outbound byte queue with a hard cap
//! - **Metrics**: per-link traffic counters and round-trip samples
//! - **Logging**: subscriber setup and packet hex dumps

pub mod coalescer;
pub mod compression;
pub mod logging;
pub mod metrics;
pub mod segment_pool;

pub use coalescer::OutboundCoalescer;
pub use compression::{Decompressor, Huffman, StreamInflater};
pub use metrics::{LinkStatistics, StatsSnapshot};
pub use segment_pool::{Segment, SegmentPool};
