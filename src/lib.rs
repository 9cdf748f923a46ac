//! Workspace placeholder crate.
//!
//! This crate exposes shared feature flags that map to the individual
//! workspace crates (`core-decode`, `core-runtime`). Host applications can
//! depend on `decode-audio-workspace` and enable the documented features
//! without wiring each crate individually.

pub use core_decode::*;

#[cfg(feature = "logging")]
pub use core_runtime::logging;
