//! Logging utilities.
//!
//! Logger initialization lives here; everything else in the crate talks to the
//! `log` facade only.

mod init;

pub use init::{init_logging, LoggingConfig};
