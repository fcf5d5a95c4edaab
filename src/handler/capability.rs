//! # Platform Capability Interface
//!
//! The handler is I/O-free: everything it needs from the outside world —
//! timers, wire state, and the callbacks a received/sent message triggers —
//! comes through this trait. A static-dispatched generic parameter
//! (`Handler<W: BusIo>`) is used rather than a trait object, per §9's
//! preference for MCU targets.

use crate::error::{BusError, SendResult};
use crate::message::Message;

/// Capabilities the handler consumes from its host platform.
///
/// None of these may block: the handler is driven entirely by its `wire`,
/// `timer`, and `send` entry points, and every capability call must return
/// immediately.
pub trait BusIo {
    /// Arm a single-shot timer; a later call to `timer()` on the handler
    /// signals expiry. Replaces any previously pending timeout.
    fn set_timeout(&mut self, delay_us: u32);

    /// Assert exactly these wires low (open-collector semantics).
    fn set_wire(&mut self, bits: u32);

    /// The currently observed wire byte.
    fn get_wire(&self) -> u32;

    /// Hand a fully received, CRC-verified message to the upper layer.
    /// Returning `true` causes the handler to ACK it, `false` to NACK.
    fn process(&mut self, msg: &Message) -> bool;

    /// Report the terminal outcome of a send attempt. Ownership of `msg`
    /// moves back to the caller here.
    fn transmitted(&mut self, msg: Message, result: SendResult);

    /// Diagnostic: a handler-internal error occurred.
    fn report_error(&mut self, error: BusError);

    /// Optional free-form trace output.
    fn debug(&mut self, _message: &str) {}
}
