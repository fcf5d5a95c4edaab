//! # Serial Framer
//!
//! Byte-level transport carrying [`Message`]s between a host and a gateway
//! MCU (§4.4, §6.3): `priority(1) length(1-2) data(length) CRC16(2, MSB
//! first)`, with a bare `0x06` usable as a stand-alone ACK between frames.
//!
//! This is a push-based, synchronous framer: feed it bytes one at a time
//! as they arrive (`feed`), and drain fully serialized out-bound frames
//! one at a time (`poll_out`). It holds no file handle or async runtime —
//! that belongs to the platform's serial driver, not this crate.

use std::collections::VecDeque;

use bytes::{BufMut, BytesMut};

use crate::crc::serial_crc16;
use crate::error::BusError;
use crate::logging::{log_debug, log_warn};
use crate::message::Message;

const ACK_BYTE: u8 = 0x06;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InState {
    Idle,
    Len,
    Len2,
    Data,
    Crc1,
    Crc2,
}

/// Running counters for the in-bound byte stream.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FramerStats {
    /// Length field exceeded the framer's configured maximum.
    pub overflow: u32,
    /// A partially received frame timed out (§4.4 idle recovery).
    pub lost: u32,
    /// A stray byte outside a frame boundary matched nothing expected.
    pub spurious: u32,
    /// CRC-16 mismatch on an otherwise complete frame.
    pub crc_errors: u32,
    /// Stand-alone ACK bytes received.
    pub ack_in: u32,
    /// Stand-alone ACK bytes sent.
    pub ack_out: u32,
}

/// Byte-stream framer for the host/gateway serial link.
pub struct Framer {
    max_len: usize,
    idle_timeout_us: u32,
    idle_elapsed_us: u32,

    in_state: InState,
    in_prio: u8,
    in_len_high: u8,
    in_len: usize,
    in_data: Vec<u8>,
    in_crc_bytes: [u8; 2],

    out_queues: [VecDeque<Vec<u8>>; 4],

    pub stats: FramerStats,
}

impl Framer {
    /// `idle_timeout_us` is the idle period (nominally ~100ms, §4.4) after
    /// which a partially received frame is discarded.
    pub fn new(max_len: usize, idle_timeout_us: u32) -> Self {
        Framer {
            max_len,
            idle_timeout_us,
            idle_elapsed_us: 0,
            in_state: InState::Idle,
            in_prio: 0,
            in_len_high: 0,
            in_len: 0,
            in_data: Vec::new(),
            in_crc_bytes: [0; 2],
            out_queues: Default::default(),
            stats: FramerStats::default(),
        }
    }

    /// Serializes `msg` and queues it for output, ordered by priority
    /// (1 = highest .. 4 = lowest).
    pub fn enqueue(&mut self, msg: &Message) -> Result<(), BusError> {
        let bytes = self.serialize(msg)?;
        let prio = msg.prio().clamp(1, 4);
        self.out_queues[(prio - 1) as usize].push_back(bytes);
        Ok(())
    }

    fn serialize(&self, msg: &Message) -> Result<Vec<u8>, BusError> {
        let data = msg.wire_bytes();
        let len = data.len();
        if len > 0x7FFF {
            return Err(BusError::SerialLengthOverflow(len as u16));
        }

        let mut out = BytesMut::with_capacity(len + 5);
        out.put_u8(msg.prio().clamp(1, 4));
        if len < 0x80 {
            out.put_u8(len as u8);
        } else {
            out.put_u8(0x80 | ((len >> 8) as u8 & 0x7F));
            out.put_u8((len & 0xFF) as u8);
        }
        out.put_slice(data);
        let crc = serial_crc16(data);
        out.put_u16(crc);
        Ok(out.to_vec())
    }

    /// Pops the next fully serialized out-bound frame, highest priority
    /// class first. The current frame is always drained in full before
    /// the next begins — there is no partial/interleaved frame state to
    /// track here, since the caller owns the byte-at-a-time UART write.
    pub fn poll_out(&mut self) -> Option<Vec<u8>> {
        self.out_queues.iter_mut().find_map(|q| q.pop_front())
    }

    /// A stand-alone ACK byte may be sent between frames; returns the byte
    /// to write and records it in `stats`.
    pub fn ack_byte(&mut self) -> u8 {
        self.stats.ack_out += 1;
        ACK_BYTE
    }

    /// Feeds one in-bound byte. Returns `Some(message)` once a complete,
    /// CRC-verified frame has been assembled.
    pub fn feed(&mut self, byte: u8) -> Option<Message> {
        self.idle_elapsed_us = 0;
        match self.in_state {
            InState::Idle => {
                if (0x01..=0x04).contains(&byte) {
                    self.in_prio = byte;
                    self.in_state = InState::Len;
                } else if byte == ACK_BYTE {
                    self.stats.ack_in += 1;
                } else if byte < 0x20 {
                    self.stats.spurious += 1;
                    log_warn(&format!("spurious byte {byte:#04x} outside a frame"));
                }
                // bytes >= 0x20 outside a frame are out-of-band text (ignored).
                None
            }
            InState::Len => {
                if byte & 0x80 != 0 {
                    self.in_len_high = byte & 0x7F;
                    self.in_state = InState::Len2;
                } else {
                    self.start_data(byte as usize);
                }
                None
            }
            InState::Len2 => {
                let len = ((self.in_len_high as usize) << 8) | byte as usize;
                self.start_data(len);
                None
            }
            InState::Data => {
                self.in_data.push(byte);
                if self.in_data.len() == self.in_len {
                    self.in_state = InState::Crc1;
                }
                None
            }
            InState::Crc1 => {
                self.in_crc_bytes[0] = byte;
                self.in_state = InState::Crc2;
                None
            }
            InState::Crc2 => {
                self.in_crc_bytes[1] = byte;
                self.in_state = InState::Idle;
                let received = u16::from_be_bytes(self.in_crc_bytes);
                let computed = serial_crc16(&self.in_data);
                if received != computed {
                    self.stats.crc_errors += 1;
                    log_warn(&format!("serial CRC mismatch: computed {computed:#06x}, received {received:#06x}"));
                    return None;
                }
                match Message::from_wire_bytes(&self.in_data) {
                    Ok(mut msg) => {
                        msg.prio = self.in_prio as u8;
                        Some(msg)
                    }
                    Err(err) => {
                        self.stats.spurious += 1;
                        log_warn(&format!("frame passed CRC but failed to decode: {err}"));
                        None
                    }
                }
            }
        }
    }

    fn start_data(&mut self, len: usize) {
        if len > self.max_len {
            self.stats.overflow += 1;
            log_warn(&format!("frame length {len} exceeds max {max}", max = self.max_len));
            self.in_state = InState::Idle;
            return;
        }
        self.in_len = len;
        self.in_data.clear();
        self.in_state = if len == 0 { InState::Crc1 } else { InState::Data };
    }

    /// Advances the idle timer by `elapsed_us`; discards a partially
    /// received frame once `idle_timeout_us` has passed without a byte.
    pub fn tick(&mut self, elapsed_us: u32) {
        if self.in_state == InState::Idle {
            self.idle_elapsed_us = 0;
            return;
        }
        self.idle_elapsed_us += elapsed_us;
        if self.idle_elapsed_us >= self.idle_timeout_us {
            self.stats.lost += 1;
            log_debug("partial frame discarded after idle timeout");
            self.in_state = InState::Idle;
            self.idle_elapsed_us = 0;
        }
    }
}
