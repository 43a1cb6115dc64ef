//! Optimized collection types for Astrelis.
//!
//! Re-exports of the AHash-backed hash collections used throughout the engine.

pub use ahash::{AHashMap as HashMap, AHashSet as HashSet, RandomState};
