//! Property-based tests using proptest
//!
//! These tests validate framing invariants across a wide range of randomly
//! generated inputs and delivery splits.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use framewire::core::frame::Frame;
use framewire::core::length_table::{FrameLength, LengthTable, PacketLengths};
use framewire::core::reassembly::FrameReassembler;
use framewire::core::ring_buffer::RingBuffer;
use framewire::core::writer::FrameWriter;
use framewire::error::ProtocolError;
use framewire::utils::coalescer::OutboundCoalescer;
use framewire::utils::compression::{Huffman, StreamInflater};
use framewire::utils::segment_pool::SegmentPool;
use proptest::prelude::*;

const DYNAMIC_OPCODE: u8 = 0xBF;

fn lengths() -> Arc<dyn LengthTable> {
    let mut table = PacketLengths::dynamic();
    table.set(0x73, 1).set(0x02, 7);
    Arc::new(table)
}

/// Cut `data` at the given (unsorted, possibly duplicate) offsets. Empty
/// pieces are dropped.
fn split_at_points(data: &[u8], mut points: Vec<usize>) -> Vec<&[u8]> {
    points.iter_mut().for_each(|p| *p %= data.len() + 1);
    points.sort_unstable();
    points.dedup();

    let mut chunks = Vec::new();
    let mut start = 0;
    for point in points {
        chunks.push(&data[start..point]);
        start = point;
    }
    chunks.push(&data[start..]);
    chunks.retain(|chunk| !chunk.is_empty());
    chunks
}

fn dynamic_frame(body: &[u8]) -> Vec<u8> {
    let total = (body.len() + 3) as u16;
    let mut frame = vec![DYNAMIC_OPCODE];
    frame.extend_from_slice(&total.to_be_bytes());
    frame.extend_from_slice(body);
    frame
}

// Property: ring buffer is a FIFO under arbitrary enqueue/dequeue interleaving
proptest! {
    #[test]
    fn prop_ring_buffer_fifo(ops in prop::collection::vec(
        prop_oneof![
            prop::collection::vec(any::<u8>(), 0..700).prop_map(Ok::<Vec<u8>, usize>),
            (0usize..900).prop_map(Err::<Vec<u8>, usize>),
        ],
        1..60,
    )) {
        let mut ring = RingBuffer::new();
        let mut enqueued = Vec::new();
        let mut dequeued = Vec::new();

        for op in ops {
            match op {
                Ok(bytes) => {
                    ring.enqueue(&bytes);
                    enqueued.extend_from_slice(&bytes);
                }
                Err(count) => {
                    let mut out = vec![0; count];
                    let n = ring.dequeue(&mut out);
                    prop_assert!(n <= count);
                    dequeued.extend_from_slice(&out[..n]);
                }
            }
        }

        dequeued.extend(ring.dequeue_vec(ring.len()));
        prop_assert_eq!(dequeued, enqueued);
        prop_assert!(ring.is_empty());
    }
}

// Property: growing mid-sequence keeps buffered bytes in order
proptest! {
    #[test]
    fn prop_ring_buffer_growth_preserves_content(
        prefix in prop::collection::vec(any::<u8>(), 1..2048),
        consumed in 0usize..2048,
        burst in prop::collection::vec(any::<u8>(), 2049..9000),
    ) {
        let mut ring = RingBuffer::with_capacity(2048);
        ring.enqueue(&prefix);
        let consumed = consumed.min(prefix.len());
        let head = ring.dequeue_vec(consumed);
        prop_assert_eq!(&head[..], &prefix[..consumed]);

        let before = ring.capacity();
        ring.enqueue(&burst);
        prop_assert!(ring.capacity() > before);
        prop_assert_eq!(ring.capacity() % 2048, 0);

        let mut expected = prefix[consumed..].to_vec();
        expected.extend_from_slice(&burst);
        prop_assert_eq!(ring.dequeue_vec(ring.len()), expected);
    }
}

// Property: a dynamic frame split across any number of deliveries appears once,
// only after its last byte
proptest! {
    #[test]
    fn prop_dynamic_frame_any_split(
        body in prop::collection::vec(any::<u8>(), 0..1500),
        points in prop::collection::vec(any::<usize>(), 0..12),
    ) {
        let wire = dynamic_frame(&body);
        let mut reassembler = FrameReassembler::new(lengths());
        let chunks = split_at_points(&wire, points);
        let last = chunks.len() - 1;

        let mut frames = Vec::new();
        for (index, chunk) in chunks.into_iter().enumerate() {
            let extracted = reassembler.push(chunk).unwrap();
            if index < last {
                prop_assert!(extracted.is_empty());
            }
            frames.extend(extracted);
        }

        prop_assert_eq!(frames.len(), 1);
        prop_assert_eq!(frames[0].len(), wire.len());
        prop_assert_eq!(frames[0].as_bytes(), &wire[..]);
        prop_assert_eq!(reassembler.buffered(), 0);
    }
}

// Property: a run of frames comes out in order no matter how it is cut
proptest! {
    #[test]
    fn prop_frame_sequence_preserves_order(
        bodies in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..200), 1..20),
        fixed in prop::collection::vec(any::<bool>(), 1..20),
        points in prop::collection::vec(any::<usize>(), 0..30),
    ) {
        let mut expected = Vec::new();
        for (index, body) in bodies.iter().enumerate() {
            if fixed.get(index).copied().unwrap_or(false) {
                let mut frame = vec![0x02];
                frame.extend((0..6).map(|i| body.get(i).copied().unwrap_or(0)));
                expected.push(frame);
            } else {
                expected.push(dynamic_frame(body));
            }
        }
        let wire: Vec<u8> = expected.concat();

        let mut reassembler = FrameReassembler::new(lengths());
        let mut frames = Vec::new();
        for chunk in split_at_points(&wire, points) {
            frames.extend(reassembler.push(chunk).unwrap());
        }

        let got: Vec<Vec<u8>> = frames.into_iter().map(Frame::into_bytes).collect();
        prop_assert_eq!(got, expected);
    }
}

// Property: scalars survive a writer/reader round trip
proptest! {
    #[test]
    fn prop_scalar_roundtrip(
        a in any::<u8>(),
        b in any::<i8>(),
        c in any::<bool>(),
        d in any::<u16>(),
        e in any::<i16>(),
        f in any::<u32>(),
        g in any::<i32>(),
        h in any::<u64>(),
        i in any::<i64>(),
        j in any::<u16>(),
        k in any::<u32>(),
    ) {
        let mut writer = FrameWriter::with_length(DYNAMIC_OPCODE, FrameLength::Dynamic, 64);
        writer.write_u8(a);
        writer.write_i8(b);
        writer.write_bool(c);
        writer.write_u16(d);
        writer.write_i16(e);
        writer.write_u32(f);
        writer.write_i32(g);
        writer.write_u64(h);
        writer.write_i64(i);
        writer.write_u16_reversed(j);
        writer.write_u32_reversed(k);

        let mut frame = Frame::new(writer.finish(), FrameLength::Dynamic);
        prop_assert_eq!(frame.read_u8(), a);
        prop_assert_eq!(frame.read_i8(), b);
        prop_assert_eq!(frame.read_bool(), c);
        prop_assert_eq!(frame.read_u16(), d);
        prop_assert_eq!(frame.read_i16(), e);
        prop_assert_eq!(frame.read_u32(), f);
        prop_assert_eq!(frame.read_i32(), g);
        prop_assert_eq!(frame.read_u64(), h);
        prop_assert_eq!(frame.read_i64(), i);
        prop_assert_eq!(frame.read_u16_reversed(), j);
        prop_assert_eq!(frame.read_u32_reversed(), k);
        prop_assert_eq!(frame.remaining(), 0);
        prop_assert!(!frame.overrun());
    }
}

// Property: strings come back truncated or padded exactly to their width
proptest! {
    #[test]
    fn prop_string_roundtrip(
        ascii in "[a-zA-Z0-9 .,!?]{0,24}",
        unicode in "[a-zA-Z\u{00C0}-\u{00FF}\u{0400}-\u{04FF} ]{0,24}",
        width in 0usize..32,
    ) {
        let mut writer = FrameWriter::with_length(DYNAMIC_OPCODE, FrameLength::Dynamic, 256);
        writer.write_ascii(&ascii, Some(width));
        writer.write_ascii(&ascii, None);
        writer.write_unicode_be(&unicode, Some(width));
        writer.write_unicode_le(&unicode, None);
        writer.write_u8(0xEE);

        let mut frame = Frame::new(writer.finish(), FrameLength::Dynamic);

        let truncated_ascii: String = ascii.chars().take(width).collect();
        prop_assert_eq!(frame.read_ascii(Some(width)), truncated_ascii);
        prop_assert_eq!(frame.read_ascii(None), ascii);

        let truncated_unicode: String = unicode.chars().take(width).collect();
        prop_assert_eq!(frame.read_unicode_be(Some(width)), truncated_unicode);
        prop_assert_eq!(frame.read_unicode_le(None), unicode);

        prop_assert_eq!(frame.read_u8(), 0xEE);
        prop_assert!(!frame.overrun());
    }
}

// Property: reads past the end degrade to defaults and never panic
proptest! {
    #[test]
    fn prop_truncated_reads_degrade(data in prop::collection::vec(any::<u8>(), 1..12)) {
        let mut frame = Frame::new(data.clone(), FrameLength::Fixed(data.len()));
        for _ in 0..4 {
            let _ = frame.read_u32();
            let _ = frame.read_unicode_be(Some(3));
            let _ = frame.read_ascii(None);
        }
        prop_assert_eq!(frame.read_u64(), 0);
        prop_assert!(frame.overrun());
    }
}

// Property: the coalescer accepts bytes up to its cap, drains them in order,
// and rejects the first byte over the cap without side effects
proptest! {
    #[test]
    fn prop_coalescer_cap(
        chunks in prop::collection::vec(prop::collection::vec(any::<u8>(), 1..300), 1..20),
        segment in 16usize..256,
    ) {
        let total: usize = chunks.iter().map(Vec::len).sum();
        let mut coalescer = OutboundCoalescer::new(SegmentPool::new(segment, 2), total);

        for chunk in &chunks {
            coalescer.enqueue(chunk).unwrap();
        }

        let pending = coalescer.pending_bytes();
        let rejected = coalescer.enqueue(&[0xFF]);
        let over_cap = matches!(
            rejected,
            Err(ProtocolError::CapacityExceeded { capacity, .. }) if capacity == total
        );
        prop_assert!(over_cap);
        prop_assert_eq!(coalescer.pending_bytes(), pending);

        prop_assert_eq!(coalescer.take_pending(), chunks.concat());
        prop_assert!(coalescer.is_empty());
    }
}

// Property: splitting a compressed stream anywhere does not change the output
proptest! {
    #[test]
    fn prop_decompression_split_invariant(
        units in prop::collection::vec(prop::collection::vec(any::<u8>(), 0..400), 1..6),
        cut in any::<usize>(),
    ) {
        let compressed: Vec<u8> = units.iter().flat_map(|u| Huffman::encode(u)).collect();
        let cut = cut % (compressed.len() + 1);

        let mut whole = Vec::new();
        StreamInflater::huffman().feed(&compressed, &mut whole).unwrap();

        let mut inflater = StreamInflater::huffman();
        let mut split = Vec::new();
        inflater.feed(&compressed[..cut], &mut split).unwrap();
        inflater.feed(&compressed[cut..], &mut split).unwrap();

        prop_assert_eq!(&split, &whole);
        prop_assert_eq!(whole, units.concat());
        prop_assert_eq!(inflater.carry_len(), 0);
    }
}
