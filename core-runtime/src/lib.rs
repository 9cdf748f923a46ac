//! # Core Runtime Module
//!
//! Shared runtime infrastructure for the decode crates:
//! - Logging and tracing setup
//! - Host log forwarding through [`logging::LoggerSink`]
//!
//! ## Overview
//!
//! Library crates only emit `tracing` events. Binaries and embedding hosts
//! call [`logging::init_logging`] once at startup to decide where those
//! events go.

pub mod error;
pub mod logging;

pub use error::{Error, Result};
