//! Trait abstracting GPU operations for testing.
//!
//! The `RenderContext` trait provides an abstraction over the handful of GPU
//! operations a batching renderer needs, allowing for both real GPU usage and
//! mock implementations for testing.

use crate::gpu_types::*;
use wgpu::BufferDescriptor;

/// Error returned when the backend fails to create a GPU resource.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GpuError {
    /// The device ran out of memory.
    OutOfMemory,
    /// The descriptor was rejected (invalid shader, layout mismatch, ...).
    Validation(String),
}

impl std::fmt::Display for GpuError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            GpuError::OutOfMemory => write!(f, "GPU out of memory"),
            GpuError::Validation(msg) => write!(f, "GPU validation error: {}", msg),
        }
    }
}

impl std::error::Error for GpuError {}

/// Everything needed to compile a pipeline for one instanced quad layout.
///
/// Unlike `wgpu::RenderPipelineDescriptor` this owns no GPU handles, so it can
/// be built by code that never touches a device.
#[derive(Debug, Clone)]
pub struct PipelineDescriptor<'a> {
    /// Debug label.
    pub label: &'a str,
    /// WGSL source with `vs_main` and `fs_main` entry points.
    pub shader_source: &'a str,
    /// Byte stride of one instance record.
    pub instance_stride: u64,
    /// Per-instance vertex attributes.
    pub attributes: &'a [wgpu::VertexAttribute],
    /// Blend state for the color target (`None` = replace).
    pub blend: Option<wgpu::BlendState>,
    /// Whether the shader samples a texture bound at group 1.
    pub textured: bool,
}

/// A single instanced draw.
#[derive(Debug, Clone, Copy)]
pub struct DrawCommand<'a> {
    /// Pipeline to bind.
    pub pipeline: &'a GpuRenderPipeline,
    /// Per-frame globals bound at group 0.
    pub globals: &'a GpuBindGroup,
    /// Whether the pipeline samples content at group 1.
    pub textured: bool,
    /// Content (texture) bind group for group 1. Textured draws without one
    /// fall back to the backend's default texture.
    pub content: Option<&'a GpuBindGroup>,
    /// Instance buffer bound at vertex slot 0.
    pub instances: &'a GpuBuffer,
    /// Vertices generated per instance.
    pub vertex_count: u32,
    /// Number of instances to draw.
    pub instance_count: u32,
}

/// Trait abstracting GPU resource creation and submission.
///
/// # Lifetime Considerations
///
/// All returned types are owned and reference counted, so this trait does not
/// use lifetimes and stays object-safe (`dyn RenderContext`).
///
/// # Borrow Checking Pattern
///
/// Methods take `&self` and return owned wrapper types. Mock implementations
/// use interior mutability (Mutex) to record calls.
///
/// # Example
///
/// ```rust,no_run
/// use astrelis_test_utils::RenderContext;
/// use wgpu::{BufferDescriptor, BufferUsages};
///
/// fn upload(ctx: &dyn RenderContext, data: &[u8]) {
///     let desc = BufferDescriptor {
///         label: None,
///         size: data.len() as u64,
///         usage: BufferUsages::VERTEX | BufferUsages::COPY_DST,
///         mapped_at_creation: false,
///     };
///     if let Ok(buffer) = ctx.create_buffer(&desc) {
///         ctx.write_buffer(&buffer, 0, data);
///     }
/// }
/// ```
pub trait RenderContext: Send + Sync {
    // Buffer operations

    /// Create a GPU buffer.
    fn create_buffer(&self, desc: &BufferDescriptor) -> Result<GpuBuffer, GpuError>;

    /// Write data to a buffer.
    ///
    /// For real buffers, this maps to `queue.write_buffer()`.
    /// For mock buffers, this records the operation for test verification.
    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]);

    // Pipeline operations

    /// Compile a render pipeline for an instanced quad layout.
    fn create_render_pipeline(
        &self,
        desc: &PipelineDescriptor,
    ) -> Result<GpuRenderPipeline, GpuError>;

    // Bind group operations

    /// Create the group 0 bind group exposing `buffer` as a uniform.
    fn create_uniform_binding(&self, buffer: &GpuBuffer) -> Result<GpuBindGroup, GpuError>;

    // Command operations

    /// Record one instanced draw for the current frame.
    fn draw(&self, command: &DrawCommand<'_>);

    /// Submit everything recorded since the last submit to the queue.
    fn submit(&self);
}
