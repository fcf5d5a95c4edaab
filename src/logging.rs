//! Thin wrappers around the `log` crate, used by the host-facing serial
//! framer to surface overflow/CRC/idle-timeout conditions as they're
//! counted in [`crate::serial::FramerStats`]. The handler's own
//! state-machine events are reported through the platform-supplied
//! `debug`/`report_error` capability hooks instead, since an MCU target may
//! have no `env_logger` to initialize; it only reaches for `log_error`
//! itself when entering `ERROR`, a condition worth surfacing on a host
//! that does have a logger configured.

use log::{debug, error, info, log_enabled, warn, Level};

/// Initializes the logger with the `env_logger` crate.
pub fn init_logger() {
    env_logger::init();
}

/// Logs an error message.
pub fn log_error(message: &str) {
    if log_enabled!(Level::Error) {
        error!("{message}");
    }
}

/// Logs a warning message.
pub fn log_warn(message: &str) {
    if log_enabled!(Level::Warn) {
        warn!("{message}");
    }
}

/// Logs an informational message.
pub fn log_info(message: &str) {
    if log_enabled!(Level::Info) {
        info!("{message}");
    }
}

/// Logs a debug message.
pub fn log_debug(message: &str) {
    if log_enabled!(Level::Debug) {
        debug!("{message}");
    }
}
