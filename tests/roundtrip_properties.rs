//! Property-based round-trip laws from §8: header encode/decode and
//! chunk extract/add must be inverses across the full legal input space.

use proptest::prelude::*;
use moat_bus::Message;

fn arb_server_addr() -> impl Strategy<Value = i8> {
    (-4i8..=-1)
}

fn arb_client_addr() -> impl Strategy<Value = i8> {
    0i8..=126
}

proptest! {
    #[test]
    fn header_round_trip_server_server(dst in arb_server_addr(), src in arb_server_addr(), code in 0u16..=3) {
        let mut m = Message::alloc(4, 0);
        m.src = src;
        m.dst = dst;
        m.code = code;
        m.add_header().unwrap();
        let r = Message::from_wire_bytes(m.wire_bytes()).unwrap();
        prop_assert_eq!(r.src, src);
        prop_assert_eq!(r.dst, dst);
        prop_assert_eq!(r.code, code);
    }

    #[test]
    fn header_round_trip_mixed(dst in arb_client_addr(), src in arb_server_addr(), code in 0u16..=31) {
        let mut m = Message::alloc(4, 0);
        m.src = src;
        m.dst = dst;
        m.code = code;
        m.add_header().unwrap();
        let r = Message::from_wire_bytes(m.wire_bytes()).unwrap();
        prop_assert_eq!(r.src, src);
        prop_assert_eq!(r.dst, dst);
        prop_assert_eq!(r.code, code);
    }

    #[test]
    fn header_round_trip_client_client(dst in arb_client_addr(), src in arb_client_addr(), code in 0u16..=255) {
        let mut m = Message::alloc(4, 0);
        m.src = src;
        m.dst = dst;
        m.code = code;
        m.add_header().unwrap();
        let r = Message::from_wire_bytes(m.wire_bytes()).unwrap();
        prop_assert_eq!(r.src, src);
        prop_assert_eq!(r.dst, dst);
        prop_assert_eq!(r.code, code);
    }

    #[test]
    fn chunk_round_trip_for_full_width_values(n in 1u8..=16, v in 0u32..=0xFFFF) {
        let mask = (1u32 << n) - 1;
        let value = v & mask;
        let mut m = Message::alloc(8, 0);
        m.src = -1;
        m.dst = -1;
        m.add_header().unwrap();
        m.add_chunk(value, n).unwrap();
        m.start_extract();
        let decoded = m.extract_chunk(n).unwrap();
        prop_assert_eq!(decoded, value);
    }
}
