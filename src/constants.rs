//! Bus Protocol Constants
//!
//! Per-wire-count tables and header constants for the MoaT bus, based on
//! the wire alphabet described for W∈{2,3,4,5} wires.

/// Reserved header prefix length (bytes) for [`crate::message::Message::alloc`].
///
/// Big enough to hold the longest header (`0 DDDDDDD 0 SSSSSSS CC...C`, 3 bytes)
/// so headers can be written backwards into the prefix without copying the
/// payload that follows.
pub const MSG_MAXHDR: usize = 3;

/// Server address range is -1..=-4; -4 is broadcast.
pub const SERVER_ADDR_MIN: i8 = -4;
pub const SERVER_ADDR_MAX: i8 = -1;
pub const SERVER_BROADCAST: i8 = -4;

/// Client address range is 0..=126.
pub const CLIENT_ADDR_MAX: i8 = 126;

/// Wire counts supported by the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WireCount {
    W2 = 2,
    W3 = 3,
    W4 = 4,
    W5 = 5,
}

impl WireCount {
    pub fn value(self) -> u8 {
        self as u8
    }

    fn index(self) -> usize {
        self.value() as usize - 2
    }

    /// Symbols per chunk: LEN[W].
    pub fn len(self) -> u8 {
        [7, 5, 3, 3][self.index()]
    }

    /// Bits per chunk: BITS[W].
    pub fn bits(self) -> u8 {
        [11, 14, 11, 14][self.index()]
    }

    /// End-of-message marker length in symbols: N_END[W].
    pub fn n_end(self) -> u8 {
        [3, 2, 1, 1][self.index()]
    }

    /// Maximum single-symbol value, `2^W - 1`.
    pub fn max_symbol(self) -> u32 {
        (1u32 << self.value()) - 1
    }

    /// `2^BITS[W]`, the boundary between ordinary chunk values and the
    /// residual/end-of-chunk encoding.
    pub fn val_max(self) -> u32 {
        1u32 << self.bits()
    }

    /// The numeric value represented by `N_END[W]` consecutive
    /// maximum-valued symbols.
    pub fn val_end(self) -> u32 {
        let max = self.max_symbol();
        max.pow(self.n_end() as u32) - 1
    }

    /// Symbols needed to transmit the 11-bit wire CRC.
    ///
    /// Equal to `LEN[W]` except for `W=3`, where the CRC frame needs one
    /// fewer transition.
    pub fn len_crc(self) -> u8 {
        match self {
            WireCount::W3 => self.len() - 1,
            _ => self.len(),
        }
    }

    pub fn from_u8(w: u8) -> Option<Self> {
        match w {
            2 => Some(WireCount::W2),
            3 => Some(WireCount::W3),
            4 => Some(WireCount::W4),
            5 => Some(WireCount::W5),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tables_match_spec() {
        assert_eq!(WireCount::W2.len(), 7);
        assert_eq!(WireCount::W3.len(), 5);
        assert_eq!(WireCount::W4.len(), 3);
        assert_eq!(WireCount::W5.len(), 3);

        assert_eq!(WireCount::W2.bits(), 11);
        assert_eq!(WireCount::W3.bits(), 14);
        assert_eq!(WireCount::W4.bits(), 11);
        assert_eq!(WireCount::W5.bits(), 14);

        assert_eq!(WireCount::W2.n_end(), 3);
        assert_eq!(WireCount::W3.n_end(), 2);
        assert_eq!(WireCount::W4.n_end(), 1);
        assert_eq!(WireCount::W5.n_end(), 1);
    }

    #[test]
    fn len_crc_shortens_only_for_w3() {
        assert_eq!(WireCount::W2.len_crc(), WireCount::W2.len());
        assert_eq!(WireCount::W3.len_crc(), WireCount::W3.len() - 1);
        assert_eq!(WireCount::W4.len_crc(), WireCount::W4.len());
        assert_eq!(WireCount::W5.len_crc(), WireCount::W5.len());
    }

    #[test]
    fn val_end_is_all_max_digits() {
        // W=4: one symbol at MAX=15 decodes to 15-1=14.
        assert_eq!(WireCount::W4.val_end(), 14);
        // W=3: two symbols at MAX=7 decode to 6*7+6=48.
        assert_eq!(WireCount::W3.val_end(), 48);
    }
}
