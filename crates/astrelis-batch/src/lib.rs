//! Batched 2D draw engine.
//!
//! A [`FrameSession`] collects sprites, rounded rectangles and glyph quads
//! for one frame, groups consecutive draws that share a
//! [`ResourceSignature`] into batches, and flushes each batch as a single
//! instanced draw. Pipelines and instance buffers come from a
//! [`ResourcePool`] and are reused across frames.
//!
//! GPU access goes through [`astrelis_test_utils::RenderContext`]:
//! [`GraphicsContext`] implements it on wgpu, and the `MockRenderContext` from
//! `astrelis-test-utils` (feature `mock`) records calls for tests.

pub mod batch;
pub mod color;
pub mod content;
pub mod context;
pub mod draw;
pub mod error;
pub mod instances;
pub mod layout;
pub mod pool;
pub mod router;
pub mod session;
pub mod signature;

pub use batch::Batch;
pub use color::Color;
pub use content::{ContentBinding, ContentRegistry};
pub use context::{GraphicsContext, GraphicsContextDescriptor};
pub use draw::{GlyphAtlas, GlyphMetrics, RoundedRect, Sprite};
pub use error::*;
pub use instances::{GlyphInstance, RectInstance, SpriteInstance};
pub use layout::{InstanceLayout, LayoutDescriptor, QUAD_VERTEX_COUNT};
pub use pool::{PoolDescriptor, PoolStats, PooledBuffer, ResourcePool, SizeClass};
pub use router::BatchRouter;
pub use session::{
    FrameGlobals, FrameReport, FrameSession, FrameSessionDescriptor, SessionState,
};
pub use signature::{BlendMode, ContentHandle, LayoutId, PipelineKey, ResourceSignature};

pub use astrelis_test_utils::{GpuBindGroup, GpuError, PipelineDescriptor, RenderContext};
