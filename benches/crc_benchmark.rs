use criterion::{black_box, criterion_group, criterion_main, Criterion};

use moat_bus::crc::{serial_crc16, WireCrc};

fn wire_crc_update(c: &mut Criterion) {
    c.bench_function("wire_crc_256_chunks", |b| {
        b.iter(|| {
            let mut crc = WireCrc::new();
            for i in 0..256u32 {
                crc.update(black_box(i & 0x7FF), 11);
            }
            black_box(crc.value())
        })
    });
}

fn serial_crc_over_bytes(c: &mut Criterion) {
    let data: Vec<u8> = (0..256u32).map(|i| i as u8).collect();
    c.bench_function("serial_crc16_256_bytes", |b| {
        b.iter(|| black_box(serial_crc16(black_box(&data))))
    });
}

criterion_group!(benches, wire_crc_update, serial_crc_over_bytes);
criterion_main!(benches);
