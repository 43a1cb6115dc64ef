//! The `InstanceLayout` capability shared by every batched renderer.
//!
//! A layout describes one fixed-size instance record: its byte stride, the
//! vertex attributes the shader reads, and the shader itself. Batches and the
//! router only ever see strides and byte slices, so they stay generic over
//! sprite / rect / glyph shapes without branching per draw.

use astrelis_test_utils::PipelineDescriptor;
use bytemuck::Pod;

use crate::signature::{BlendMode, LayoutId};

/// Vertices generated per instanced quad (two triangles, no index buffer).
pub const QUAD_VERTEX_COUNT: u32 = 6;

/// Static description of an instance layout.
#[derive(Debug, Clone, Copy)]
pub struct LayoutDescriptor {
    pub id: LayoutId,
    pub label: &'static str,
    /// Size of one instance record in bytes.
    pub stride: u64,
    /// Instances per batch (and therefore per draw call).
    pub capacity: u32,
    pub attributes: &'static [wgpu::VertexAttribute],
    pub shader_source: &'static str,
    pub vertices_per_instance: u32,
    /// Whether draws need a ready content binding.
    pub textured: bool,
}

impl LayoutDescriptor {
    /// Pipeline description for this layout with the given blend mode.
    pub fn pipeline_descriptor(&self, blend: BlendMode) -> PipelineDescriptor<'static> {
        PipelineDescriptor {
            label: self.label,
            shader_source: self.shader_source,
            instance_stride: self.stride,
            attributes: self.attributes,
            blend: blend.to_wgpu(),
            textured: self.textured,
        }
    }

    /// Whether `other` describes the same GPU-side record as `self`, so the
    /// two can share batches and a pipeline under one id.
    pub fn is_compatible(&self, other: &LayoutDescriptor) -> bool {
        self.id == other.id
            && self.stride == other.stride
            && self.textured == other.textured
            && self.vertices_per_instance == other.vertices_per_instance
            && self.label == other.label
            && (std::ptr::eq(self.attributes, other.attributes)
                || self.attributes == other.attributes)
            && (std::ptr::eq(self.shader_source, other.shader_source)
                || self.shader_source == other.shader_source)
    }
}

/// A plain-old-data instance record that can be packed into a batch.
pub trait InstanceLayout: Pod {
    const DESCRIPTOR: LayoutDescriptor;

    /// Copy this instance into `dst`, which is exactly one stride long.
    #[inline]
    fn write_into(&self, dst: &mut [u8]) {
        dst.copy_from_slice(bytemuck::bytes_of(self));
    }
}

/// Size of `T` as a stride, for use in `LayoutDescriptor` constants.
pub const fn stride_of<T>() -> u64 {
    std::mem::size_of::<T>() as u64
}
