//! # Handler Configuration
//!
//! Timer values are platform policy (§9 Open Questions: "exact value of
//! T_SETTLE/T_BREAK/T_ZERO/T_ERROR in µs left to platform policy"). The
//! defaults here are illustrative starting points, not normative —
//! callers on real hardware are expected to tune them to their bus length
//! and MCU interrupt latency.

use crate::constants::WireCount;

/// Bundles the wire count and timer policy a [`crate::handler::Handler`]
/// needs; there is no file-based configuration layer, since this is an
/// embedded-facing protocol core rather than a host service.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusConfig {
    pub wires: WireCount,

    /// Timer A: settle window, in microseconds.
    pub t_settle_us: u32,
    /// Timer B: minimum propagation time between a verified wire state and
    /// the next flip, in microseconds.
    pub t_break_us: u32,
    /// Minimum contiguous idle time before the bus is declared free.
    pub t_zero_us: u32,
    /// Extra cooldown applied after entering `ERROR`.
    pub t_error_us: u32,
}

impl BusConfig {
    pub fn new(wires: WireCount) -> Self {
        BusConfig {
            wires,
            t_settle_us: 200,
            t_break_us: 50,
            t_zero_us: 1_000,
            t_error_us: 5_000,
        }
    }
}
