//! # moat-bus - arbitrating, self-timed wire-bus protocol handler
//!
//! This crate implements the hard engineering core of the MoaT bus: a
//! multi-master, open-collector, self-timed wired bus for cheap
//! microcontrollers. It provides three pieces:
//!
//! - [`message`]: a bit-addressed message buffer with a compact
//!   variable-length header.
//! - [`crc`]: the 11-bit wire CRC and 16-bit serial CRC the protocol uses.
//! - [`serial`]: the byte-level host/gateway transport.
//! - [`handler`]: the I/O-free bus handler state machine itself, generic
//!   over a platform [`handler::BusIo`] capability implementation.
//!
//! Everything outside these — GPIO/timer drivers, higher-level MoaT
//! subsystems, device/address policy — is an external collaborator
//! reached only through the capability interface, never linked in here.
//!
//! ```no_run
//! use moat_bus::constants::WireCount;
//! use moat_bus::handler::{BusConfig, Handler};
//!
//! # fn use_handler<IO: moat_bus::handler::BusIo>(io: IO) {
//! let config = BusConfig::new(WireCount::W4);
//! let mut handler = Handler::new(io, config);
//! handler.timer();
//! # }
//! ```

pub mod constants;
pub mod crc;
pub mod error;
pub mod handler;
pub mod logging;
pub mod message;
pub mod serial;
pub mod util;

pub use crate::error::{BusError, SendResult};
pub use crate::handler::{BusConfig, BusIo, Handler};
pub use crate::logging::{init_logger, log_debug, log_error, log_info, log_warn};
pub use crate::message::Message;
pub use crate::serial::Framer;
