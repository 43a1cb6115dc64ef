//! Astrelis Core
//!
//! Shared utilities for the Astrelis crates: logging setup, profiling scopes
//! and the hash collections used across the engine.

pub mod alloc;
pub mod logging;
pub mod profiling;
