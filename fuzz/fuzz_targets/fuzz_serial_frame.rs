#![no_main]

use libfuzzer_sys::fuzz_target;
use moat_bus::Framer;

// Arbitrary byte streams fed one at a time into the in-bound framer must
// never panic, regardless of bogus length prefixes or truncated frames.
fuzz_target!(|data: &[u8]| {
    let mut framer = Framer::new(4096, 100_000);
    for &byte in data {
        let _ = framer.feed(byte);
    }
});
