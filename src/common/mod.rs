//! Shared infrastructure: the crate error type and console logging.

pub mod error;
pub mod logging;
