#![no_main]

use std::sync::Arc;

use framewire::core::length_table::PacketLengths;
use framewire::core::reassembly::FrameReassembler;
use framewire::utils::compression::StreamInflater;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // first byte picks the read size and whether the stream is compressed
    let Some((&control, stream)) = data.split_first() else {
        return;
    };

    let mut table = PacketLengths::dynamic();
    table.set(0x73, 2).set(0x02, 7).set(0x11, 1);
    let mut reassembler = FrameReassembler::with_limits(Arc::new(table), 4096, 2048);
    if control & 0x80 != 0 {
        reassembler.enable_compression(StreamInflater::huffman());
    }

    let chunk = usize::from(control & 0x7F) + 1;
    for piece in stream.chunks(chunk) {
        match reassembler.push(piece) {
            Ok(frames) => {
                for mut frame in frames {
                    let _ = frame.read_u32();
                    let _ = frame.read_unicode_be(None);
                    let _ = frame.read_ascii(Some(40));
                }
            }
            Err(_) => return,
        }
    }
});
