//! # Packet Filters
//!
//! Hook points for third-party code to inspect, rewrite or veto frames.
//!
//! Outbound filters run just before a frame is written to the socket; inbound
//! filters run on the consumer side of the inbound queue, just before a frame
//! reaches the application handler. Every registered filter sees every frame:
//! a veto from one filter does not stop the others from running. Rewrites are
//! applied in registration order, each filter seeing the previous one's output.
//! The frame is delivered only if no filter vetoed it.
//!
//! Frames flagged `bypass_filter` (injected by trusted code) skip the chain.

use std::sync::{Arc, RwLock};

use crate::core::frame::Frame;
use crate::error::{ProtocolError, Result};

/// Mutable view of one frame's bytes handed to a filter.
#[derive(Debug)]
pub struct PacketMut<'a> {
    bytes: &'a mut Vec<u8>,
    mutated: bool,
}

impl<'a> PacketMut<'a> {
    pub fn new(bytes: &'a mut Vec<u8>) -> Self {
        Self {
            bytes,
            mutated: false,
        }
    }

    #[inline]
    pub fn opcode(&self) -> u8 {
        self.bytes.first().copied().unwrap_or(0)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes[..]
    }

    /// Mutable access; marks the packet as rewritten.
    pub fn bytes_mut(&mut self) -> &mut Vec<u8> {
        self.mutated = true;
        &mut *self.bytes
    }

    pub fn set_byte(&mut self, index: usize, value: u8) {
        if let Some(slot) = self.bytes.get_mut(index) {
            *slot = value;
            self.mutated = true;
        }
    }

    /// Swap in a whole new frame.
    pub fn replace(&mut self, bytes: Vec<u8>) {
        *self.bytes = bytes;
        self.mutated = true;
    }

    #[inline]
    pub fn is_mutated(&self) -> bool {
        self.mutated
    }
}

/// A registered packet filter. Return `false` to veto the frame.
pub trait PacketFilter: Send + Sync {
    fn filter_inbound(&self, _packet: &mut PacketMut<'_>) -> bool {
        true
    }

    fn filter_outbound(&self, _packet: &mut PacketMut<'_>) -> bool {
        true
    }
}

/// Outcome of running the chain over one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterVerdict {
    pub allow: bool,
    pub mutated: bool,
}

impl Default for FilterVerdict {
    fn default() -> Self {
        Self {
            allow: true,
            mutated: false,
        }
    }
}

#[derive(Debug, Clone, Copy)]
enum Hook {
    Inbound,
    Outbound,
}

/// Ordered set of filters shared by every connection of a session.
#[derive(Default)]
pub struct FilterChain {
    filters: RwLock<Vec<Arc<dyn PacketFilter>>>,
}

impl FilterChain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, filter: Arc<dyn PacketFilter>) -> Result<()> {
        let mut filters = self.filters.write().map_err(|_| ProtocolError::LockPoisoned)?;
        filters.push(filter);
        Ok(())
    }

    pub fn clear(&self) -> Result<()> {
        let mut filters = self.filters.write().map_err(|_| ProtocolError::LockPoisoned)?;
        filters.clear();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.filters.read().map(|f| f.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn snapshot(&self) -> Vec<Arc<dyn PacketFilter>> {
        match self.filters.read() {
            Ok(filters) => filters.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    fn run(&self, hook: Hook, bytes: &mut Vec<u8>) -> FilterVerdict {
        let filters = self.snapshot();
        let mut verdict = FilterVerdict::default();

        for filter in &filters {
            let mut packet = PacketMut::new(bytes);
            let allow = match hook {
                Hook::Inbound => filter.filter_inbound(&mut packet),
                Hook::Outbound => filter.filter_outbound(&mut packet),
            };
            verdict.allow &= allow;
            verdict.mutated |= packet.is_mutated();
        }

        verdict
    }

    /// Run every inbound filter over raw frame bytes.
    pub fn filter_inbound(&self, bytes: &mut Vec<u8>) -> FilterVerdict {
        self.run(Hook::Inbound, bytes)
    }

    /// Run every outbound filter over raw frame bytes.
    pub fn filter_outbound(&self, bytes: &mut Vec<u8>) -> FilterVerdict {
        self.run(Hook::Outbound, bytes)
    }

    /// Filter a received frame in place. Returns whether it should be delivered.
    pub fn apply_inbound(&self, frame: &mut Frame) -> bool {
        if frame.bypass_filter() || self.is_empty() {
            return true;
        }

        let mut bytes = frame.take_bytes();
        let verdict = self.filter_inbound(&mut bytes);
        frame.restore_bytes(bytes, verdict.mutated);
        verdict.allow
    }
}

impl std::fmt::Debug for FilterChain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FilterChain").field("filters", &self.len()).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::length_table::FrameLength;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct Veto(u8);

    impl PacketFilter for Veto {
        fn filter_inbound(&self, packet: &mut PacketMut<'_>) -> bool {
            packet.opcode() != self.0
        }
    }

    struct Rewrite {
        index: usize,
        value: u8,
    }

    impl PacketFilter for Rewrite {
        fn filter_inbound(&self, packet: &mut PacketMut<'_>) -> bool {
            packet.set_byte(self.index, self.value);
            true
        }

        fn filter_outbound(&self, packet: &mut PacketMut<'_>) -> bool {
            let value = packet.as_bytes()[self.index].wrapping_add(self.value);
            packet.set_byte(self.index, value);
            true
        }
    }

    #[derive(Default)]
    struct Counter(AtomicUsize);

    impl PacketFilter for Counter {
        fn filter_inbound(&self, _packet: &mut PacketMut<'_>) -> bool {
            self.0.fetch_add(1, Ordering::SeqCst);
            true
        }
    }

    #[test]
    fn test_empty_chain_allows() {
        let chain = FilterChain::new();
        let mut bytes = vec![0x73, 0x00];
        assert_eq!(chain.filter_inbound(&mut bytes), FilterVerdict::default());
    }

    #[test]
    fn test_veto_still_runs_every_filter() {
        let chain = FilterChain::new();
        let counter = Arc::new(Counter::default());
        chain.register(Arc::new(Veto(0x73))).unwrap();
        chain.register(counter.clone()).unwrap();

        let mut bytes = vec![0x73];
        let verdict = chain.filter_inbound(&mut bytes);
        assert!(!verdict.allow);
        assert_eq!(counter.0.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_mutations_apply_in_order() {
        let chain = FilterChain::new();
        chain.register(Arc::new(Rewrite { index: 1, value: 1 })).unwrap();
        chain.register(Arc::new(Rewrite { index: 1, value: 2 })).unwrap();

        let mut bytes = vec![0x02, 0x10];
        let verdict = chain.filter_outbound(&mut bytes);
        assert!(verdict.allow);
        assert!(verdict.mutated);
        assert_eq!(bytes, vec![0x02, 0x13]);
    }

    #[test]
    fn test_apply_inbound_marks_frame_mutated() {
        let chain = FilterChain::new();
        chain.register(Arc::new(Rewrite { index: 1, value: 9 })).unwrap();

        let mut frame = Frame::new(vec![0x73, 0x00], FrameLength::Fixed(2));
        assert!(chain.apply_inbound(&mut frame));
        assert!(frame.is_mutated());
        assert_eq!(frame.read_u8(), 9);
    }

    #[test]
    fn test_bypass_skips_chain() {
        let chain = FilterChain::new();
        chain.register(Arc::new(Veto(0x73))).unwrap();

        let mut frame = Frame::new(vec![0x73], FrameLength::Fixed(1));
        frame.set_bypass_filter(true);
        assert!(chain.apply_inbound(&mut frame));
        assert!(!frame.is_mutated());
    }
}
