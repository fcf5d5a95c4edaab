//! # CRC Engine
//!
//! Two CRCs are used by this crate:
//!
//! - An 11-bit CRC over the sequence of *wire states* observed during a bus
//!   transaction (generator polynomial `0x583`, reversed, initial value 0).
//!   The register is updated one wire-width chunk (`W` bits) at a time, XORed
//!   against the arbitration-winning wire value first, so the final CRC is
//!   independent of which priority wire won arbitration.
//! - A 16-bit CRC over the bytes of a serial-framer payload (MoaT's "serial"
//!   CRC, polynomial `0xAC9A`, reversed, initial value 0).
//!
//! CRC-8 (MAXIM, `0x8C`) and CRC-16-MAXIM (`0xA001`) are also provided for
//! completeness — short/long bus-message variants outside the core 11-bit
//! wire path may want them — but the handler itself only uses the wire CRC.

use once_cell::sync::Lazy;

use crate::util::bitrev::rev_bits;

/// 11-bit wire CRC, generator polynomial `0x583` reversed.
pub const WIRE_CRC_WIDTH: u8 = 11;
const WIRE_CRC_POLY: u16 = 0x583;
const WIRE_CRC_MASK: u16 = (1 << WIRE_CRC_WIDTH) - 1;

/// 16-bit serial-framer CRC, generator polynomial `0xAC9A` reversed.
const SERIAL_CRC_POLY: u16 = 0xAC9A;

/// CRC-8/MAXIM, defined but unused by the core wire path.
const CRC8_MAXIM_POLY: u8 = 0x8C;

/// CRC-16/MAXIM, defined but unused by the core wire path.
const CRC16_MAXIM_POLY: u16 = 0xA001;

/// A running CRC register updated one `width`-bit wire value at a time.
///
/// This is the bit-level analogue of a byte CRC, generalized from a fixed
/// 8-bit step to an arbitrary `width`-bit step: table `WIRE_TABLES[width]`
/// holds, for every possible `width`-bit input, the result of folding that
/// input into a zeroed register (the same precomputation a byte CRC does for
/// its 256-entry table, just parametrized over `width` instead of fixed at
/// 8). Because the register only ever examines its low `width` bits as
/// feedback during a `width`-bit step, `reg_new = (reg >> width) ^
/// table[(reg ^ wire_value) & mask]` is exact for any `width <=
/// WIRE_CRC_WIDTH`, which covers every wire count W∈{2,3,4,5} this crate
/// uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireCrc {
    reg: u16,
}

/// `WIRE_TABLES[width]` is indexed by `width` wire widths, `width` itself
/// bounded by `WIRE_CRC_WIDTH` (no caller ever folds in more bits than the
/// register holds).
static WIRE_TABLES: Lazy<Vec<Vec<u16>>> =
    Lazy::new(|| (0..=WIRE_CRC_WIDTH as usize).map(build_wire_table).collect());

fn build_wire_table(width: usize) -> Vec<u16> {
    let poly = rev_bits(WIRE_CRC_POLY as u32, WIRE_CRC_WIDTH) as u16;
    (0..(1usize << width))
        .map(|i| {
            let mut reg = i as u16;
            for _ in 0..width {
                let fb = reg & 1;
                reg >>= 1;
                if fb != 0 {
                    reg ^= poly;
                }
            }
            reg & WIRE_CRC_MASK
        })
        .collect()
}

impl WireCrc {
    pub fn new() -> Self {
        WireCrc { reg: 0 }
    }

    /// Fold in one arbitration-winning wire value (`width` bits wide).
    ///
    /// The register is XORed with `wire_value` *before* the polynomial
    /// division step, which is what makes the resulting CRC independent of
    /// which priority bit happened to win arbitration (§8, "CRC invariance
    /// under priority").
    pub fn update(&mut self, wire_value: u32, width: u8) {
        let mask = (1u16 << width) - 1;
        let idx = ((self.reg ^ (wire_value as u16 & mask)) & mask) as usize;
        self.reg = (self.reg >> width) ^ WIRE_TABLES[width as usize][idx];
    }

    pub fn value(&self) -> u16 {
        self.reg
    }
}

impl Default for WireCrc {
    fn default() -> Self {
        Self::new()
    }
}

/// Byte CRC table, built once, indexed by `(crc ^ byte) & 0xFF`.
struct ByteCrcTable([u16; 256]);

fn build_byte_table(poly_reversed: u16) -> ByteCrcTable {
    let mut table = [0u16; 256];
    for (i, slot) in table.iter_mut().enumerate() {
        let mut crc = i as u16;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ poly_reversed;
            } else {
                crc >>= 1;
            }
        }
        *slot = crc;
    }
    ByteCrcTable(table)
}

static SERIAL_CRC_TABLE: Lazy<ByteCrcTable> = Lazy::new(|| build_byte_table(SERIAL_CRC_POLY));
static CRC16_MAXIM_TABLE: Lazy<ByteCrcTable> = Lazy::new(|| build_byte_table(CRC16_MAXIM_POLY));

/// Compute the serial framer's CRC-16 (poly `0xAC9A` reversed, init 0) over
/// `data`.
pub fn serial_crc16(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &byte in data {
        let idx = ((crc ^ byte as u16) & 0xFF) as usize;
        crc = (crc >> 8) ^ SERIAL_CRC_TABLE.0[idx];
    }
    crc
}

/// CRC-16-MAXIM (poly `0xA001` reversed, init 0), defined but not used by
/// the core wire path.
pub fn crc16_maxim(data: &[u8]) -> u16 {
    let mut crc: u16 = 0;
    for &byte in data {
        let idx = ((crc ^ byte as u16) & 0xFF) as usize;
        crc = (crc >> 8) ^ CRC16_MAXIM_TABLE.0[idx];
    }
    crc
}

/// CRC-8/MAXIM (poly `0x8C` reversed, init 0), defined but not used by the
/// core wire path.
pub fn crc8_maxim(data: &[u8]) -> u8 {
    let mut crc: u8 = 0;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            if crc & 1 != 0 {
                crc = (crc >> 1) ^ CRC8_MAXIM_POLY;
            } else {
                crc >>= 1;
            }
        }
    }
    crc
}
