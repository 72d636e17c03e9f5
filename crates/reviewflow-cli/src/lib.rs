//! Library side of the `reviewflow` binary: configuration and logging.

pub mod config;
pub mod logging;
