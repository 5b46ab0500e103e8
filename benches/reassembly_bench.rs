use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BatchSize, Criterion, Throughput};
use framewire::core::length_table::{LengthTable, PacketLengths};
use framewire::core::reassembly::FrameReassembler;
use framewire::core::writer::FrameWriter;
use framewire::utils::compression::{Huffman, StreamInflater};

fn lengths() -> Arc<dyn LengthTable> {
    let mut table = PacketLengths::dynamic();
    table.set(0x73, 2).set(0x02, 7);
    Arc::new(table)
}

/// A mixed stream of `count` small fixed and medium dynamic frames.
fn stream(count: usize) -> Vec<u8> {
    let table = lengths();
    let mut wire = Vec::new();
    for i in 0..count {
        if i % 3 == 0 {
            let mut writer = FrameWriter::new(0x73, &*table);
            writer.write_u8(i as u8);
            wire.extend(writer.finish());
        } else {
            let mut writer = FrameWriter::with_capacity(0xBF, &*table, 128);
            writer.write_u32(i as u32);
            writer.write_ascii("benchmark payload", Some(30));
            writer.write_zero(i % 64);
            wire.extend(writer.finish());
        }
    }
    wire
}

#[allow(clippy::unwrap_used)]
fn bench_reassembly(c: &mut Criterion) {
    let mut group = c.benchmark_group("reassembly");
    let wire = stream(1000);
    group.throughput(Throughput::Bytes(wire.len() as u64));

    for &chunk in &[1usize, 64, 1460, 65536] {
        group.bench_function(format!("chunk_{chunk}b"), |b| {
            b.iter_batched(
                || FrameReassembler::new(lengths()),
                |mut reassembler| {
                    let mut frames = 0;
                    for piece in wire.chunks(chunk) {
                        frames += reassembler.push(piece).unwrap().len();
                    }
                    assert_eq!(frames, 1000);
                },
                BatchSize::SmallInput,
            )
        });
    }
    group.finish();
}

#[allow(clippy::unwrap_used)]
fn bench_inflate(c: &mut Criterion) {
    let mut group = c.benchmark_group("huffman_inflate");
    let plain = stream(1000);
    let compressed: Vec<u8> = plain.chunks(512).flat_map(Huffman::encode).collect();
    group.throughput(Throughput::Bytes(plain.len() as u64));

    group.bench_function("whole_stream", |b| {
        b.iter(|| {
            let mut out = Vec::with_capacity(plain.len());
            StreamInflater::huffman().feed(&compressed, &mut out).unwrap();
            assert_eq!(out.len(), plain.len());
        })
    });

    group.bench_function("mtu_reads", |b| {
        b.iter(|| {
            let mut inflater = StreamInflater::huffman();
            let mut out = Vec::with_capacity(plain.len());
            for piece in compressed.chunks(1460) {
                inflater.feed(piece, &mut out).unwrap();
            }
            assert_eq!(out.len(), plain.len());
        })
    });
    group.finish();
}

criterion_group!(benches, bench_reassembly, bench_inflate);
criterion_main!(benches);
