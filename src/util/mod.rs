//! # Utility Modules
//!
//! Small, protocol-agnostic utilities shared by the other modules.

pub mod bitrev;

pub use bitrev::{rev8, rev_bits};
