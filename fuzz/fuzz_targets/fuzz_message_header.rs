#![no_main]

use libfuzzer_sys::fuzz_target;
use moat_bus::Message;

// Feeding arbitrary bytes through the header parser, and then walking the
// remainder with extract_chunk, must never panic regardless of how the
// header-kind bits and length prefix are set.
fuzz_target!(|data: &[u8]| {
    if data.is_empty() {
        return;
    }
    if let Ok(mut msg) = Message::from_wire_bytes(data) {
        while msg.extract_more() {
            if msg.extract_chunk(11).is_err() {
                break;
            }
        }
    }
});
