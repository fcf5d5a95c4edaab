//! # Bus Error Handling
//!
//! Defines the `BusError` enum, the single error type shared by the message
//! buffer, CRC engine, serial framer and bus handler.

use thiserror::Error;

/// Errors that can occur while building, parsing, or transporting a message.
#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
pub enum BusError {
    /// Header claims a client address outside 0..=126.
    #[error("client address {0} out of range")]
    AddressOutOfRange(i8),

    /// Header's code field doesn't fit the width implied by its address kinds.
    #[error("code {0} too wide for this header form")]
    CodeTooWide(u16),

    /// Fewer bytes were available than the header format requires.
    #[error("header truncated: need {needed} bytes, have {have}")]
    HeaderTruncated { needed: u8, have: u8 },

    /// `extract_chunk`/`add_chunk` was asked for a width outside 1..=16.
    #[error("chunk width {0} out of range (1..=16)")]
    ChunkWidthOutOfRange(u8),

    /// Wire CRC computed at `READ_CRC` didn't match the value on the wire.
    #[error("wire CRC mismatch: computed {computed:#05x}, received {received:#05x}")]
    CrcMismatch { computed: u16, received: u16 },

    /// Serial framer's CRC-16 over `data` didn't match the trailing two bytes.
    #[error("serial CRC-16 mismatch: computed {computed:#06x}, received {received:#06x}")]
    SerialCrcMismatch { computed: u16, received: u16 },

    /// Serial framer's length prefix decoded to an implausible value.
    #[error("serial frame length {0} exceeds maximum")]
    SerialLengthOverflow(u16),

    /// More than `2*W` wire transitions occurred within one settle window.
    #[error("wire flap: hardware fault suspected")]
    Flap,

    /// The wire was held without a settle event for longer than allowed.
    #[error("wire held past allowed settle time")]
    HoldTime,

    /// After `WRITE_ACQUIRE` settled, the wire wasn't cleanly `want_prio`.
    #[error("arbitration acquire failed: wire state did not match asserted priority")]
    AcquireFatal,

    /// ACK slot carried bits outside `{ack_mask, nack_mask}`.
    #[error("bad collision in ACK slot")]
    BadCollision,

    /// A final chunk's decoded value fell outside the valid residual range
    /// (`VAL_MAX..VAL_MAX + 2^(BITS-8)`), implying a corrupted transition.
    #[error("residual chunk value {0} outside the valid range")]
    InvalidResidualChunk(u32),

    /// An expected wire transition never arrived.
    #[error("expected transition missing")]
    Nothing,

    /// Reached a combination of state and input the handler doesn't define.
    #[error("unhandled state transition")]
    Unhandled,

    /// Entered a code path that the state machine's invariants should forbid.
    #[error("cannot happen: handler invariant violated")]
    Cannot,

    /// A state was reached that has no defined behavior (placeholder for
    /// states reserved for future wire counts).
    #[error("unused state")]
    Unused,
}

/// Outcome of a single send attempt, reported via
/// [`BusIo::transmitted`](crate::handler::BusIo::transmitted).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SendResult {
    /// The responder asserted `ack_mask`.
    Success,
    /// No responder asserted anything in the ACK slot, after retries.
    Missing,
    /// The responder asserted `nack_mask`, after retries.
    Error,
    /// A fatal condition (bad collision, acquire failure) ended the attempt.
    Fatal,
}
