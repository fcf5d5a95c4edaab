//! # Bus Handler
//!
//! The arbitrating, self-timed wire-bus state machine (§4.3). `Handler<IO>`
//! is generic over the platform capability trait rather than boxing it,
//! since a templated handler is the preferred shape for MCU targets (§9).
//!
//! The handler is driven entirely by three entry points: [`Handler::send`],
//! [`Handler::wire`], and [`Handler::timer`]. It never blocks and never
//! spawns anything; each call returns after updating internal state and
//! issuing at most a few capability calls.

mod capability;
mod config;
mod state;

pub use capability::BusIo;
pub use config::BusConfig;
pub use state::{State, WriteState};

use std::collections::VecDeque;

use crate::crc::WireCrc;
use crate::error::{BusError, SendResult};
use crate::logging::log_error;
use crate::message::Message;

/// The bus handler state machine, generic over the platform capability
/// implementation `IO`.
pub struct Handler<IO: BusIo> {
    io: IO,
    config: BusConfig,

    state: State,
    write_state: WriteState,

    prio_queue: VecDeque<Message>,
    normal_queue: VecDeque<Message>,

    tx: Option<Message>,
    rx: Option<Message>,

    /// Wire value the handler itself is currently driving (writer) or the
    /// last decoded baseline against which the next symbol is XORed
    /// (reader). Doubles as both roles since they're never active at once.
    intended: u32,
    last_wire: u32,

    /// Wire state observed immediately before the ACK slot, used by both
    /// the sender (reading the slot) and the receiver (asserting it) to
    /// compute matching `ack_mask`/`nack_mask` values (§4.3.4).
    ack_baseline: u32,

    crc: WireCrc,
    current_prio: u32,
    want_prio: u32,

    /// Wire transitions observed since the current settle window started
    /// (§4.3.8 ERR_FLAP: more than `2*W` within one window ⇒ hardware fault).
    transitions: u8,

    /// Per-chunk symbol encode/decode bookkeeping.
    symbol_buf: [u8; 8],
    symbol_len: u8,
    symbol_pos: u8,
    symbol_count: u8,
    chunk_value: u32,

    /// Which [`SendResult`] `tries` is currently counting down for — a
    /// repeat of the same kind keeps decrementing the existing budget,
    /// while a different kind re-arms it (§4.3.7 sets `tries :=`, not
    /// `tries +=`, for each path).
    retry_kind: Option<SendResult>,
    tries: u8,
    backoff: u16,
}

impl<IO: BusIo> Handler<IO> {
    pub fn new(io: IO, config: BusConfig) -> Self {
        Handler {
            io,
            config,
            state: State::WaitIdle,
            write_state: WriteState::More,
            prio_queue: VecDeque::new(),
            normal_queue: VecDeque::new(),
            tx: None,
            rx: None,
            intended: 0,
            last_wire: 0,
            ack_baseline: 0,
            crc: WireCrc::new(),
            current_prio: 0,
            want_prio: 0,
            transitions: 0,
            symbol_buf: [0; 8],
            symbol_len: 0,
            symbol_pos: 0,
            symbol_count: 0,
            chunk_value: 0,
            retry_kind: None,
            tries: 0,
            backoff: 100,
        }
    }

    pub fn state(&self) -> State {
        self.state
    }

    pub fn backoff(&self) -> u16 {
        self.backoff
    }

    /// Number of messages currently queued (not counting one in flight).
    pub fn queued(&self) -> usize {
        self.prio_queue.len() + self.normal_queue.len()
    }

    /// Enqueues a message to send. If the bus is idle and nothing is
    /// already in flight, arbitration starts immediately.
    pub fn send(&mut self, msg: Message) {
        self.enqueue(msg, false);
        if self.state == State::Idle && self.tx.is_none() {
            self.try_start_send();
        }
    }

    /// The platform observed a wire-state change. Must be delivered in
    /// order; a handler instance is not reentrant.
    pub fn wire(&mut self, new_bits: u32) {
        match self.state {
            State::WriteAcquire | State::Write | State::WriteCrc => {
                if new_bits == self.intended {
                    self.last_wire = new_bits;
                    self.io.set_timeout(self.config.t_settle_us);
                } else {
                    self.begin_collision_recovery(new_bits);
                }
            }
            State::Idle => {
                if new_bits != 0 {
                    self.last_wire = new_bits;
                    self.state = State::ReadAcquire;
                    self.io.set_timeout(self.config.t_settle_us);
                }
            }
            _ => {
                self.last_wire = new_bits;
                self.transitions = self.transitions.saturating_add(1);
                self.io.set_timeout(self.config.t_settle_us);
            }
        }
    }

    /// The platform's single-shot timer fired.
    pub fn timer(&mut self) {
        match self.state {
            State::WaitIdle => self.on_wait_idle_settle(),
            State::Idle => self.try_start_send(),
            State::WriteAcquire => self.on_write_acquire_settle(),
            State::Write => self.on_write_settle(),
            State::WriteCrc => self.on_write_settle(),
            State::ReadAck => self.on_read_ack_settle(),
            State::ReadAcquire => self.on_read_acquire_settle(),
            State::Read => self.on_read_settle(),
            State::ReadCrc => self.on_read_crc_settle(),
            State::WriteAck => self.on_write_ack_settle(),
            State::WriteEnd => self.enter_wait_idle(),
            State::Error => self.on_error_timeout(),
        }
    }

    fn enqueue(&mut self, msg: Message, front: bool) {
        let queue = if msg.prio() == 0 { &mut self.prio_queue } else { &mut self.normal_queue };
        if front {
            queue.push_front(msg);
        } else {
            queue.push_back(msg);
        }
    }

    fn pop_next(&mut self) -> Option<Message> {
        self.prio_queue.pop_front().or_else(|| self.normal_queue.pop_front())
    }

    fn requeue_tx_for_retry(&mut self) {
        // Cursor gets reset to the head of the message (header included)
        // by `try_start_send`'s `begin_transmit` call once this is popped
        // again — no need to duplicate that here.
        if let Some(msg) = self.tx.take() {
            self.enqueue(msg, true);
        }
    }

    // -- WAIT_IDLE / IDLE ----------------------------------------------

    fn on_wait_idle_settle(&mut self) {
        let b = self.io.get_wire();
        if b == 0 {
            self.state = State::Idle;
            self.try_start_send();
        } else {
            self.io.set_timeout(self.config.t_zero_us);
        }
    }

    fn enter_wait_idle(&mut self) {
        self.write_state = WriteState::More;
        self.state = State::WaitIdle;
        self.io.set_timeout(self.config.t_zero_us);
    }

    fn try_start_send(&mut self) {
        self.state = State::Idle;
        if let Some(mut msg) = self.pop_next() {
            msg.begin_transmit();
            let want = 1u32 << msg.prio();
            self.want_prio = want;
            self.tx = Some(msg);
            self.intended = want;
            self.io.set_wire(want);
            self.state = State::WriteAcquire;
            self.io.set_timeout(self.config.t_settle_us);
        }
    }

    // -- WRITE_ACQUIRE / WRITE ------------------------------------------

    fn on_write_acquire_settle(&mut self) {
        let b = self.io.get_wire();
        if b == self.want_prio {
            self.current_prio = self.want_prio;
            self.crc = WireCrc::new();
            self.crc.update(b, self.config.wires.value());
            self.write_state = WriteState::More;
            self.intended = b;
            self.write_next_chunk();
        } else if b & self.want_prio.wrapping_sub(1) != 0 {
            self.state = State::ReadAcquire;
            self.last_wire = b;
            self.io.set_timeout(self.config.t_settle_us);
        } else {
            self.io.report_error(BusError::AcquireFatal);
            self.retry_or_fail(SendResult::Fatal);
        }
    }

    fn write_next_chunk(&mut self) {
        let tx = self.tx.as_mut().expect("tx present while in a write state");
        if !tx.extract_more() {
            // Nothing real left to send: the end-of-message marker is next
            // (§4.3.2's "N_END consecutive MAX symbols" case).
            self.write_state = WriteState::Final;
            let n_end = self.config.wires.n_end();
            self.begin_symbol_chunk(self.config.wires.val_end(), n_end);
            return;
        }
        let bits = self.config.wires.bits();
        let v = tx.extract_chunk(bits).expect("chunk width is always within 1..=16");
        let val_max = self.config.wires.val_max();
        if v >= val_max {
            // This chunk exhausted the real payload partway through. `v`
            // itself (not `v - val_max`) goes on the wire unchanged — the
            // marker bit `extract_chunk` set is what makes it land at or
            // above `val_max`, which is exactly what the reader's own
            // `chunk_value >= val_max` check (§4.3.2) looks for; subtracting
            // here would erase the only signal the reader has for detecting
            // this case.
            self.write_state = WriteState::Final;
            let len = self.config.wires.len();
            self.begin_symbol_chunk(v, len);
        } else {
            let len = self.config.wires.len();
            self.begin_symbol_chunk(v, len);
        }
    }

    fn begin_symbol_chunk(&mut self, value: u32, len: u8) {
        let max = self.config.wires.max_symbol();
        debug_assert!(
            (value as u64) < (max as u64).pow(len as u32),
            "chunk value {value} does not fit in {len} base-{max} symbols"
        );
        let mut v = value;
        let mut digits = [0u8; 8];
        for slot in digits.iter_mut().take(len as usize) {
            *slot = (v % max) as u8;
            v /= max;
        }
        for i in 0..len as usize {
            self.symbol_buf[i] = digits[len as usize - 1 - i] + 1;
        }
        self.symbol_len = len;
        self.symbol_pos = 0;
        self.send_next_symbol();
    }

    fn send_next_symbol(&mut self) {
        let s = self.symbol_buf[self.symbol_pos as usize] as u32;
        let next = self.intended ^ s;
        self.io.set_wire(next);
        self.intended = next;
        self.state = State::Write;
        self.io.set_timeout(self.config.t_settle_us);
    }

    fn on_write_settle(&mut self) {
        let b = self.io.get_wire();
        if b != self.intended {
            self.io.report_error(BusError::HoldTime);
            self.enter_error();
            return;
        }
        self.crc.update(b, self.config.wires.value());
        self.symbol_pos += 1;
        if self.symbol_pos < self.symbol_len {
            self.send_next_symbol();
            return;
        }
        self.advance_write_chunk();
    }

    fn advance_write_chunk(&mut self) {
        match self.write_state {
            WriteState::More => self.write_next_chunk(),
            WriteState::Final => {
                self.write_state = WriteState::Crc;
                let len_crc = self.config.wires.len_crc();
                self.state = State::WriteCrc;
                self.begin_symbol_chunk(self.crc.value() as u32, len_crc);
            }
            WriteState::Crc => {
                self.ack_baseline = self.intended;
                self.state = State::ReadAck;
                self.io.set_wire(0);
                self.intended = 0;
                self.io.set_timeout(self.config.t_settle_us);
            }
        }
    }

    // -- Collision recovery (§4.3.5) -------------------------------------

    fn begin_collision_recovery(&mut self, observed: u32) {
        let foreign = observed & !self.intended;
        if foreign == 0 {
            // No genuinely new foreign bit; treat as settle noise.
            self.last_wire = observed;
            self.io.set_timeout(self.config.t_settle_us);
            return;
        }
        let want_prio = foreign & foreign.wrapping_neg();

        // The exact mid-symbol bit-splice of already-transmitted content
        // into a fresh receive buffer is a platform-timing detail with no
        // clean mapping onto the message buffer's bit-cursor API; this
        // preserves the header/address fields of our own attempt and lets
        // the remainder be read fresh off the wire, then requeues our own
        // message (with no added backoff) to contest the bus again right
        // after the winner's message completes.
        self.requeue_tx_for_retry();

        self.current_prio = want_prio;
        self.want_prio = want_prio;
        self.crc = WireCrc::new();
        self.crc.update(want_prio, self.config.wires.value());
        self.intended = observed;
        self.last_wire = observed;
        self.rx = Some(Message::for_receive(self.config.wires.bits() as usize * 4 + 8));
        self.reset_read_accum();
        self.transitions = 0;
        self.state = State::Read;
        self.io.set_wire(0);
        self.io.set_timeout(self.config.t_settle_us);
    }

    // -- READ_ACQUIRE / READ / READ_CRC ----------------------------------

    fn on_read_acquire_settle(&mut self) {
        let b = self.io.get_wire();
        if b != 0 && (b & b.wrapping_sub(1)) == 0 {
            self.current_prio = b;
            self.want_prio = b;
            self.crc = WireCrc::new();
            self.crc.update(b, self.config.wires.value());
            self.intended = b;
            self.rx = Some(Message::for_receive(self.config.wires.bits() as usize * 4 + 8));
            self.reset_read_accum();
            self.transitions = 0;
            self.state = State::Read;
        } else {
            self.io.report_error(BusError::BadCollision);
            self.enter_error();
        }
    }

    fn reset_read_accum(&mut self) {
        self.symbol_count = 0;
        self.chunk_value = 0;
    }

    /// Shared flap/no-transition gate for a settle-window reader callback.
    /// Returns the observed wire value and the transition mask to fold in,
    /// or `None` once it has already dispatched an error/recovery transition
    /// on the caller's behalf (the caller should just return in that case).
    fn check_settle_transition(&mut self) -> Option<(u32, u32)> {
        let b = self.io.get_wire();
        let s = b ^ self.intended;
        self.intended = b;

        if self.transitions > 2 * self.config.wires.value() as u8 {
            self.transitions = 0;
            self.io.report_error(BusError::Flap);
            self.enter_error();
            return None;
        }
        self.transitions = 0;

        if s == 0 {
            self.io.report_error(BusError::Nothing);
            self.rx = None;
            self.enter_wait_idle();
            return None;
        }
        Some((b, s))
    }

    fn on_read_settle(&mut self) {
        let Some((b, s)) = self.check_settle_transition() else {
            return;
        };
        self.crc.update(b, self.config.wires.value());
        self.chunk_value = self.chunk_value * self.config.wires.max_symbol() + (s - 1);
        self.symbol_count += 1;

        let n_end = self.config.wires.n_end();
        if self.symbol_count == n_end && self.chunk_value == self.config.wires.val_end() {
            self.reset_read_accum();
            self.state = State::ReadCrc;
            return;
        }

        if self.symbol_count == self.config.wires.len() {
            let val_max = self.config.wires.val_max();
            let bits = self.config.wires.bits();
            if self.chunk_value >= val_max + (1u32 << (bits - 8)) {
                self.io.report_error(BusError::InvalidResidualChunk(self.chunk_value));
                self.enter_error();
            } else if self.chunk_value >= val_max {
                let residual = self.chunk_value - val_max;
                let _ = self.rx.as_mut().unwrap().add_chunk(residual, bits - 8);
                self.reset_read_accum();
                self.state = State::ReadCrc;
            } else {
                let _ = self.rx.as_mut().unwrap().add_chunk(self.chunk_value, bits);
                self.reset_read_accum();
            }
        }
    }

    fn on_read_crc_settle(&mut self) {
        let Some((_, s)) = self.check_settle_transition() else {
            return;
        };
        self.chunk_value = self.chunk_value * self.config.wires.max_symbol() + (s - 1);
        self.symbol_count += 1;
        if self.symbol_count != self.config.wires.len_crc() {
            return;
        }

        let received = self.chunk_value as u16;
        let computed = self.crc.value();
        self.ack_baseline = self.intended;
        self.io.set_wire(0);
        self.intended = 0;

        let (ack_mask, nack_mask) = self.ack_masks(self.ack_baseline);
        let accepted = if received == computed {
            let rx = self.rx.as_mut().expect("rx present while reading CRC");
            match rx.read_header() {
                Ok(()) => {
                    rx.start_extract();
                    self.io.process(rx)
                }
                Err(err) => {
                    self.io.report_error(err);
                    false
                }
            }
        } else {
            self.io.report_error(BusError::CrcMismatch { computed, received });
            false
        };
        self.rx = None;

        if accepted {
            self.enter_write_ack(ack_mask);
        } else if nack_mask != 0 {
            self.enter_write_ack(nack_mask);
        } else {
            self.enter_wait_idle();
        }
    }

    // -- ACK/NACK (§4.3.4) ------------------------------------------------

    fn ack_masks(&self, b: u32) -> (u32, u32) {
        let ack_mask = if b == 1 { 2 } else { 1 };
        let nack_mask = if self.config.wires.value() == 2 {
            if b == 0 {
                2
            } else {
                0
            }
        } else if b == 1 || b == 3 {
            4
        } else {
            2
        };
        (ack_mask, nack_mask)
    }

    fn enter_write_ack(&mut self, wire_mask: u32) {
        self.io.set_wire(wire_mask);
        self.intended = wire_mask;
        self.state = State::WriteAck;
        self.io.set_timeout(self.config.t_settle_us);
    }

    fn on_write_ack_settle(&mut self) {
        self.io.set_wire(0);
        self.intended = 0;
        self.enter_wait_idle();
    }

    fn on_read_ack_settle(&mut self) {
        let b = self.io.get_wire();
        let (ack_mask, nack_mask) = self.ack_masks(self.ack_baseline);

        if b == ack_mask {
            self.finish_tx(SendResult::Success);
        } else if nack_mask != 0 && b == nack_mask {
            self.retry_or_fail(SendResult::Error);
        } else if b == 0 {
            self.retry_or_fail(SendResult::Missing);
        } else {
            // Anything else in the ACK slot is neither silence nor the
            // expected ack/nack bit: a foreign assertion collided with ours.
            self.io.report_error(BusError::BadCollision);
            self.retry_or_fail(SendResult::Fatal);
        }
    }

    fn finish_tx(&mut self, result: SendResult) {
        self.backoff /= 2;
        self.tries = 0;
        self.retry_kind = None;
        if let Some(msg) = self.tx.take() {
            self.io.transmitted(msg, result);
        }
        self.enter_wait_idle();
    }

    /// Applies the §4.3.7 retry policy for a non-`SUCCESS` ACK-slot outcome.
    ///
    /// `tries` counts down across repeats of the *same* outcome kind; a
    /// different kind re-arms it to that path's starting budget instead of
    /// adding to whatever was left, per §4.3.7's `tries :=`.
    fn retry_or_fail(&mut self, result: SendResult) {
        if self.retry_kind != Some(result) {
            self.retry_kind = Some(result);
            self.tries = match result {
                SendResult::Missing => 2,
                SendResult::Error => 4,
                SendResult::Fatal => 6,
                SendResult::Success => unreachable!("retry_or_fail is never called with Success"),
            };
        }

        if self.tries > 1 {
            self.tries -= 1;
            self.backoff = self.backoff.saturating_mul(3) / 2;
            self.requeue_tx_for_retry();
        } else {
            self.retry_kind = None;
            if let Some(msg) = self.tx.take() {
                self.io.transmitted(msg, result);
            }
        }

        if matches!(result, SendResult::Fatal) {
            self.enter_error();
        } else {
            self.enter_wait_idle();
        }
    }

    // -- ERROR ------------------------------------------------------------

    fn enter_error(&mut self) {
        log_error("bus handler entering ERROR state");
        self.rx = None;
        self.state = State::Error;
        self.io.set_wire(0);
        self.intended = 0;
        self.io.set_timeout(self.config.t_error_us);
    }

    fn on_error_timeout(&mut self) {
        self.enter_wait_idle();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::constants::WireCount;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Default)]
    struct Observed {
        wire: u32,
        timeout: Option<u32>,
        transmitted: Vec<SendResult>,
        processed: Vec<Message>,
        errors: Vec<BusError>,
    }

    struct MockIo {
        observed: Rc<RefCell<Observed>>,
        accept: bool,
    }

    impl BusIo for MockIo {
        fn set_timeout(&mut self, delay_us: u32) {
            self.observed.borrow_mut().timeout = Some(delay_us);
        }
        fn set_wire(&mut self, bits: u32) {
            self.observed.borrow_mut().wire = bits;
        }
        fn get_wire(&self) -> u32 {
            self.observed.borrow().wire
        }
        fn process(&mut self, msg: &Message) -> bool {
            self.observed.borrow_mut().processed.push(msg.clone());
            self.accept
        }
        fn transmitted(&mut self, _msg: Message, result: SendResult) {
            self.observed.borrow_mut().transmitted.push(result);
        }
        fn report_error(&mut self, error: BusError) {
            self.observed.borrow_mut().errors.push(error);
        }
    }

    fn handler(accept: bool) -> (Handler<MockIo>, Rc<RefCell<Observed>>) {
        let observed = Rc::new(RefCell::new(Observed::default()));
        let io = MockIo { observed: observed.clone(), accept };
        let config = BusConfig::new(WireCount::W4);
        (Handler::new(io, config), observed)
    }

    #[test]
    fn idle_to_write_acquire_asserts_priority_bit() {
        let (mut h, observed) = handler(true);
        h.state = State::Idle;

        let mut msg = Message::alloc(4, 1);
        msg.src = -1;
        msg.dst = -2;
        msg.code = 0;
        msg.add_header().unwrap();
        h.send(msg);

        assert_eq!(h.state(), State::WriteAcquire);
        assert_eq!(observed.borrow().wire, 1 << 1);
    }

    #[test]
    fn acquire_fatal_when_wire_never_matches_priority() {
        let (mut h, observed) = handler(true);
        h.state = State::Idle;
        let mut msg = Message::alloc(4, 0);
        msg.src = -1;
        msg.dst = -1;
        msg.add_header().unwrap();
        h.send(msg);
        assert_eq!(h.state(), State::WriteAcquire);

        // Simulate a stuck wire that never reflects our asserted bit.
        observed.borrow_mut().wire = 0;
        h.timer();

        assert_eq!(observed.borrow().errors.len(), 1);
        assert!(matches!(observed.borrow().errors[0], BusError::AcquireFatal));
    }

    #[test]
    fn ack_mask_table_matches_spec_examples() {
        let (h, _observed) = handler(true);
        assert_eq!(h.ack_masks(1), (2, 4));
        assert_eq!(h.ack_masks(3), (1, 4));
        assert_eq!(h.ack_masks(0), (1, 2));
    }

    #[test]
    fn write_next_chunk_carries_residual_bits_instead_of_dropping_them() {
        let (mut h, _observed) = handler(true);
        let mut msg = Message::alloc(4, 0);
        msg.src = -1;
        msg.dst = -1; // server-server, 1-byte header
        msg.code = 0;
        msg.add_header().unwrap();
        msg.append_bytes(&[0xAA, 0xBB]).unwrap(); // 8 header + 16 payload = 24 bits
        msg.begin_transmit();
        h.tx = Some(msg);
        h.write_state = WriteState::More;

        // 24 bits total, 11-bit chunks (W4): two full chunks (11, 11),
        // 2 bits left over for the third.
        h.write_next_chunk();
        assert_eq!(h.write_state, WriteState::More);
        h.write_next_chunk();
        assert_eq!(h.write_state, WriteState::More);

        // The third call exhausts the payload mid-chunk; it must still
        // transmit a LEN-symbol residual chunk (not jump straight to the
        // shorter N_END end-of-message marker and drop those last 2 bits).
        h.write_next_chunk();
        assert_eq!(h.write_state, WriteState::Final);
        assert_eq!(h.symbol_len, h.config.wires.len());
    }

    #[test]
    fn write_next_chunk_sends_pure_end_marker_on_exact_boundary() {
        let (mut h, _observed) = handler(true);
        let mut msg = Message::alloc(4, 0);
        msg.src = -1;
        msg.dst = -1;
        msg.code = 0;
        msg.add_header().unwrap(); // 1-byte header == 8 bits
        msg.add_chunk(0b101, 3).unwrap(); // pad to exactly one 11-bit chunk (W4)
        msg.begin_transmit();
        h.tx = Some(msg);
        h.write_state = WriteState::More;

        // First call consumes the one full 11-bit chunk exactly (no residual).
        h.write_next_chunk();
        assert_eq!(h.write_state, WriteState::More);

        // Nothing real left: this call must send the pure N_END marker, not
        // a spurious residual chunk.
        h.write_next_chunk();
        assert_eq!(h.write_state, WriteState::Final);
        assert_eq!(h.symbol_len, h.config.wires.n_end());
    }

    #[test]
    fn read_settle_with_no_transition_reports_nothing_and_returns_to_wait_idle() {
        let (mut h, observed) = handler(true);
        h.state = State::Read;
        h.intended = 3;
        h.rx = Some(Message::for_receive(32));
        observed.borrow_mut().wire = 3; // unchanged since last sample -> s == 0

        h.on_read_settle();

        assert_eq!(observed.borrow().errors, vec![BusError::Nothing]);
        assert_eq!(h.state(), State::WaitIdle);
        assert!(h.rx.is_none());
    }

    #[test]
    fn read_settle_past_flap_threshold_reports_flap_and_enters_error() {
        let (mut h, observed) = handler(true);
        h.state = State::Read;
        h.intended = 3;
        h.rx = Some(Message::for_receive(32));
        h.transitions = 2 * h.config.wires.value() as u8 + 1;
        observed.borrow_mut().wire = 5; // a real transition, doesn't matter which

        h.on_read_settle();

        assert_eq!(observed.borrow().errors, vec![BusError::Flap]);
        assert_eq!(h.state(), State::Error);
    }

    #[test]
    fn retry_policy_sets_tries_per_result_literally() {
        let (mut h, _observed) = handler(true);
        let mut msg = Message::alloc(4, 0);
        msg.src = -1;
        msg.dst = -1;
        msg.add_header().unwrap();
        h.tx = Some(msg);
        h.state = State::ReadAck;

        h.retry_or_fail(SendResult::Error);
        assert_eq!(h.tries, 3); // set to 4, then decremented once for the retry
        assert_eq!(h.state(), State::WaitIdle);
    }

    #[test]
    fn repeated_missing_exhausts_and_reports_instead_of_retrying_forever() {
        let (mut h, observed) = handler(true);
        let mut msg = Message::alloc(4, 0);
        msg.src = -1;
        msg.dst = -1;
        msg.add_header().unwrap();
        h.tx = Some(msg);
        h.state = State::ReadAck;

        h.retry_or_fail(SendResult::Missing); // tries: 2 -> 1, requeued for another attempt
        assert_eq!(h.tries, 1);
        assert!(h.tx.is_none());
        assert_eq!(h.queued(), 1);

        // The requeued message comes back around for its next attempt.
        h.tx = h.pop_next();
        assert!(h.tx.is_some());

        h.retry_or_fail(SendResult::Missing); // budget exhausted, reported
        assert_eq!(observed.borrow().transmitted, vec![SendResult::Missing]);
        assert!(h.tx.is_none());
    }

    #[test]
    fn a_different_failure_kind_re_arms_the_retry_budget() {
        let (mut h, observed) = handler(true);
        let mut msg = Message::alloc(4, 0);
        msg.src = -1;
        msg.dst = -1;
        msg.add_header().unwrap();
        h.tx = Some(msg);
        h.state = State::ReadAck;

        h.retry_or_fail(SendResult::Missing); // tries: 2 -> 1
        assert_eq!(h.tries, 1);
        h.tx = h.pop_next(); // requeued message comes back for its next attempt

        h.retry_or_fail(SendResult::Error); // different kind: re-armed to 4 -> 3
        assert_eq!(h.tries, 3);
        assert!(h.tx.is_none()); // requeued again, not yet exhausted or reported
        assert!(observed.borrow().transmitted.is_empty());
    }
}
