#![deny(unsafe_op_in_unsafe_fn)]
//! Logging bootstrap for apforge binaries.
//!
//! Reads a small JSON logging config from the state root, installs a
//! `tracing` subscriber with a stderr layer plus a daily-rolling file layer,
//! and prunes old log files.

pub mod config;
pub mod fs;
pub mod init;
pub mod retention;

pub use config::LoggingConfig;
pub use init::{init, LoggingGuards};
pub use retention::run_retention;
