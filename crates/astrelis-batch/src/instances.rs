//! Instance layouts for sprites, rounded rectangles and glyph quads.

use bytemuck::{Pod, Zeroable};

use crate::layout::{InstanceLayout, LayoutDescriptor, QUAD_VERTEX_COUNT, stride_of};
use crate::signature::LayoutId;

/// Textured, optionally rotated sprite quad.
///
/// 64 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct SpriteInstance {
    /// Top-left corner in world units.
    pub position: [f32; 2],
    pub size: [f32; 2],
    pub uv_min: [f32; 2],
    pub uv_max: [f32; 2],
    /// Tint (RGBA, straight alpha).
    pub color: [f32; 4],
    /// Rotation around the quad center, in radians.
    pub rotation: f32,
    pub _padding: [f32; 3],
}

impl SpriteInstance {
    pub const LAYOUT: LayoutId = LayoutId(1);
}

impl Default for SpriteInstance {
    fn default() -> Self {
        Self {
            position: [0.0; 2],
            size: [0.0; 2],
            uv_min: [0.0, 0.0],
            uv_max: [1.0, 1.0],
            color: [1.0; 4],
            rotation: 0.0,
            _padding: [0.0; 3],
        }
    }
}

impl InstanceLayout for SpriteInstance {
    const DESCRIPTOR: LayoutDescriptor = LayoutDescriptor {
        id: Self::LAYOUT,
        label: "batched_sprite",
        stride: stride_of::<Self>(),
        capacity: 1000,
        attributes: &wgpu::vertex_attr_array![
            0 => Float32x2, // position
            1 => Float32x2, // size
            2 => Float32x2, // uv_min
            3 => Float32x2, // uv_max
            4 => Float32x4, // color
            5 => Float32,   // rotation
        ],
        shader_source: include_str!("shaders/sprite.wgsl"),
        vertices_per_instance: QUAD_VERTEX_COUNT,
        textured: true,
    };
}

/// Untextured rectangle with per-corner radii and an optional border.
///
/// 80 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct RectInstance {
    pub position: [f32; 2],
    pub size: [f32; 2],
    pub color: [f32; 4],
    /// Top-left, top-right, bottom-right, bottom-left.
    pub corner_radii: [f32; 4],
    pub border_color: [f32; 4],
    pub border_thickness: f32,
    pub _padding: [f32; 3],
}

impl RectInstance {
    pub const LAYOUT: LayoutId = LayoutId(2);
}

impl Default for RectInstance {
    fn default() -> Self {
        Self {
            position: [0.0; 2],
            size: [0.0; 2],
            color: [1.0; 4],
            corner_radii: [0.0; 4],
            border_color: [0.0; 4],
            border_thickness: 0.0,
            _padding: [0.0; 3],
        }
    }
}

impl InstanceLayout for RectInstance {
    const DESCRIPTOR: LayoutDescriptor = LayoutDescriptor {
        id: Self::LAYOUT,
        label: "batched_rect",
        stride: stride_of::<Self>(),
        capacity: 512,
        attributes: &wgpu::vertex_attr_array![
            0 => Float32x2, // position
            1 => Float32x2, // size
            2 => Float32x4, // color
            3 => Float32x4, // corner_radii
            4 => Float32x4, // border_color
            5 => Float32,   // border_thickness
        ],
        shader_source: include_str!("shaders/rect.wgsl"),
        vertices_per_instance: QUAD_VERTEX_COUNT,
        textured: false,
    };
}

/// Glyph quad sampled from a single-channel coverage atlas.
///
/// 48 bytes.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Pod, Zeroable)]
pub struct GlyphInstance {
    pub position: [f32; 2],
    pub size: [f32; 2],
    pub uv_min: [f32; 2],
    pub uv_max: [f32; 2],
    pub color: [f32; 4],
}

impl GlyphInstance {
    pub const LAYOUT: LayoutId = LayoutId(3);
}

impl InstanceLayout for GlyphInstance {
    const DESCRIPTOR: LayoutDescriptor = LayoutDescriptor {
        id: Self::LAYOUT,
        label: "batched_glyph",
        stride: stride_of::<Self>(),
        capacity: 2048,
        attributes: &wgpu::vertex_attr_array![
            0 => Float32x2, // position
            1 => Float32x2, // size
            2 => Float32x2, // uv_min
            3 => Float32x2, // uv_max
            4 => Float32x4, // color
        ],
        shader_source: include_str!("shaders/glyph.wgsl"),
        vertices_per_instance: QUAD_VERTEX_COUNT,
        textured: true,
    };
}
