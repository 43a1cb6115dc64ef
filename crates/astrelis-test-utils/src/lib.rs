//! Test utilities for Astrelis engine.
//!
//! This crate provides the GPU seam used by the Astrelis renderers together
//! with a mock implementation for testing without a GPU.
//!
//! # Overview
//!
//! The main components are:
//!
//! - [`RenderContext`] - Trait abstracting the GPU operations a batching
//!   renderer performs (buffer creation/upload, pipeline compilation, draws)
//! - `MockRenderContext` - Recording implementation with fault injection
//!   (requires `mock` feature)
//! - GPU wrapper types (`GpuBuffer`, `GpuRenderPipeline`, `GpuBindGroup`) - Can be
//!   real or mock
//!
//! # Example
//!
//! ```rust
//! # #[cfg(feature = "mock")]
//! # {
//! use astrelis_test_utils::{MockRenderContext, RenderContext};
//! use wgpu::*;
//!
//! // Create a mock context for testing
//! let mock = MockRenderContext::new();
//!
//! // Make the second buffer allocation fail
//! mock.fail_buffer_creation(1);
//!
//! let desc = BufferDescriptor {
//!     label: Some("test_buffer"),
//!     size: 1024,
//!     usage: BufferUsages::VERTEX,
//!     mapped_at_creation: false,
//! };
//! assert!(mock.create_buffer(&desc).is_ok());
//! assert!(mock.create_buffer(&desc).is_err());
//!
//! // Verify operations in tests
//! assert_eq!(mock.count_buffer_creates(), 1);
//! # }
//! ```
//!
//! # Design Philosophy
//!
//! ## 1. No Lifetimes
//!
//! All GPU wrapper types are owned and use reference counting internally.
//!
//! ## 2. Interior Mutability
//!
//! Mock implementations use `Mutex` for interior mutability, allowing `&self`
//! methods to record calls.
//!
//! ## 3. Object Safety
//!
//! The `RenderContext` trait is object-safe (`dyn RenderContext`), allowing
//! for polymorphic usage with both real and mock contexts.

pub mod gpu_types;
#[cfg(feature = "mock")]
pub mod mock_render;
pub mod render_context;

// Re-export main types at crate root
pub use gpu_types::*;
#[cfg(feature = "mock")]
pub use mock_render::*;
pub use render_context::*;
