//! Link Statistics
//!
//! Per-connection byte/packet counters and round-trip-time sampling.
//!
//! Totals are atomic counters bumped from the receive task and the sending
//! task. [`LinkStatistics::sample`] reports totals plus the deltas since the
//! previous sample. Round-trip times live in a 5-slot circular set; the
//! average covers the slots that hold a sample.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::info;

/// Number of round-trip samples kept.
pub const RTT_SAMPLES: usize = 5;

#[derive(Debug, Default, Clone, Copy)]
struct Totals {
    bytes_received: u64,
    bytes_sent: u64,
    packets_received: u64,
    packets_sent: u64,
}

#[derive(Debug, Default)]
struct PingState {
    next_sequence: u8,
    in_flight: Option<(u8, Instant)>,
    samples: [u32; RTT_SAMPLES],
    cursor: usize,
}

/// Counters for one connection.
#[derive(Debug, Default)]
pub struct LinkStatistics {
    bytes_received: AtomicU64,
    bytes_sent: AtomicU64,
    packets_received: AtomicU64,
    packets_sent: AtomicU64,
    last_sample: Mutex<Totals>,
    connected_at: Mutex<Option<Instant>>,
    ping: Mutex<PingState>,
}

/// Totals, deltas since the previous sample, and RTT at a point in time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatsSnapshot {
    pub total_bytes_received: u64,
    pub total_bytes_sent: u64,
    pub total_packets_received: u64,
    pub total_packets_sent: u64,
    pub delta_bytes_received: u64,
    pub delta_bytes_sent: u64,
    pub delta_packets_received: u64,
    pub delta_packets_sent: u64,
    pub average_rtt_ms: u32,
    pub connected_for: Option<Duration>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    // counters stay meaningful even if a holder panicked
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl LinkStatistics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Zero every counter and sample; mark the connection start time.
    pub fn reset(&self) {
        self.bytes_received.store(0, Ordering::Relaxed);
        self.bytes_sent.store(0, Ordering::Relaxed);
        self.packets_received.store(0, Ordering::Relaxed);
        self.packets_sent.store(0, Ordering::Relaxed);
        *lock(&self.last_sample) = Totals::default();
        *lock(&self.connected_at) = Some(Instant::now());
        *lock(&self.ping) = PingState::default();
    }

    pub fn bytes_received(&self, count: usize) {
        self.bytes_received.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn packet_received(&self) {
        self.packets_received.fetch_add(1, Ordering::Relaxed);
    }

    /// Record one sent frame of `bytes` bytes.
    pub fn packet_sent(&self, bytes: usize) {
        self.packets_sent_batch(1, bytes);
    }

    /// Record `packets` frames written together as `bytes` bytes.
    pub fn packets_sent_batch(&self, packets: usize, bytes: usize) {
        self.packets_sent.fetch_add(packets as u64, Ordering::Relaxed);
        self.bytes_sent.fetch_add(bytes as u64, Ordering::Relaxed);
    }

    pub fn total_packets_received(&self) -> u64 {
        self.packets_received.load(Ordering::Relaxed)
    }

    pub fn total_packets_sent(&self) -> u64 {
        self.packets_sent.load(Ordering::Relaxed)
    }

    fn totals(&self) -> Totals {
        Totals {
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            packets_received: self.packets_received.load(Ordering::Relaxed),
            packets_sent: self.packets_sent.load(Ordering::Relaxed),
        }
    }

    /// Start a ping; returns the sequence byte to put on the wire.
    pub fn begin_ping(&self) -> u8 {
        let mut ping = lock(&self.ping);
        let sequence = ping.next_sequence;
        ping.next_sequence = ping.next_sequence.wrapping_add(1);
        ping.in_flight = Some((sequence, Instant::now()));
        sequence
    }

    /// Match a ping reply. Returns the measured RTT when `sequence` is the
    /// ping in flight; stale or unsolicited replies are ignored.
    pub fn ping_received(&self, sequence: u8) -> Option<u32> {
        let sent_at = {
            let mut ping = lock(&self.ping);
            match ping.in_flight {
                Some((expected, sent_at)) if expected == sequence => {
                    ping.in_flight = None;
                    sent_at
                }
                _ => return None,
            }
        };

        let elapsed = u32::try_from(sent_at.elapsed().as_millis()).unwrap_or(u32::MAX);
        self.record_rtt(elapsed);
        Some(elapsed)
    }

    /// Store one RTT sample, overwriting the oldest.
    pub fn record_rtt(&self, millis: u32) {
        let mut ping = lock(&self.ping);
        let cursor = ping.cursor;
        // 0 marks an empty slot, so a sub-millisecond round trip counts as 1
        ping.samples[cursor] = millis.max(1);
        ping.cursor = (cursor + 1) % RTT_SAMPLES;
    }

    /// Mean of the recorded samples; 0 before the first sample.
    pub fn average_rtt_ms(&self) -> u32 {
        let ping = lock(&self.ping);
        let (sum, count) = ping
            .samples
            .iter()
            .filter(|&&s| s != 0)
            .fold((0u64, 0u64), |(sum, count), &s| (sum + s as u64, count + 1));

        if count == 0 {
            0
        } else {
            (sum / count) as u32
        }
    }

    /// Totals plus deltas since the previous call.
    pub fn sample(&self) -> StatsSnapshot {
        let now = self.totals();
        let previous = std::mem::replace(&mut *lock(&self.last_sample), now);

        StatsSnapshot {
            total_bytes_received: now.bytes_received,
            total_bytes_sent: now.bytes_sent,
            total_packets_received: now.packets_received,
            total_packets_sent: now.packets_sent,
            delta_bytes_received: now.bytes_received.saturating_sub(previous.bytes_received),
            delta_bytes_sent: now.bytes_sent.saturating_sub(previous.bytes_sent),
            delta_packets_received: now.packets_received.saturating_sub(previous.packets_received),
            delta_packets_sent: now.packets_sent.saturating_sub(previous.packets_sent),
            average_rtt_ms: self.average_rtt_ms(),
            connected_for: lock(&self.connected_at).map(|at| at.elapsed()),
        }
    }

    /// Take a sample and log it.
    pub fn log_statistics(&self, connection: &str) {
        let snapshot = self.sample();
        info!(
            connection,
            bytes_received = snapshot.total_bytes_received,
            bytes_sent = snapshot.total_bytes_sent,
            packets_received = snapshot.total_packets_received,
            packets_sent = snapshot.total_packets_sent,
            delta_bytes_received = snapshot.delta_bytes_received,
            delta_bytes_sent = snapshot.delta_bytes_sent,
            average_rtt_ms = snapshot.average_rtt_ms,
            connected_secs = snapshot.connected_for.map(|d| d.as_secs()).unwrap_or(0),
            "Link statistics"
        );
    }
}
