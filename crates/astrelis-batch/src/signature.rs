//! Resource signatures: the key deciding which draws may share a batch.

/// Identifies a texture (or equivalent shading resource) for the session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ContentHandle(pub u64);

impl ContentHandle {
    /// Untextured content. Always ready.
    pub const NONE: ContentHandle = ContentHandle(0);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

impl std::fmt::Display for ContentHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_none() {
            write!(f, "#none")
        } else {
            write!(f, "#{}", self.0)
        }
    }
}

/// Identifies an instance layout (sprite, rect, glyph, ...).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayoutId(pub u32);

impl std::fmt::Display for LayoutId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "layout:{}", self.0)
    }
}

/// How a draw is composited onto the target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum BlendMode {
    /// Straight alpha blending.
    #[default]
    Alpha,
    /// Source color is already multiplied by alpha.
    Premultiplied,
    /// Source is added onto the destination.
    Additive,
    /// Source multiplies the destination.
    Multiply,
    /// Source replaces the destination.
    Opaque,
}

impl BlendMode {
    /// The wgpu blend state for this mode (`None` = no blending).
    pub fn to_wgpu(self) -> Option<wgpu::BlendState> {
        match self {
            BlendMode::Alpha => Some(wgpu::BlendState::ALPHA_BLENDING),
            BlendMode::Premultiplied => Some(wgpu::BlendState::PREMULTIPLIED_ALPHA_BLENDING),
            BlendMode::Additive => Some(wgpu::BlendState {
                color: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::SrcAlpha,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
                alpha: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::Zero,
                    dst_factor: wgpu::BlendFactor::One,
                    operation: wgpu::BlendOperation::Add,
                },
            }),
            BlendMode::Multiply => Some(wgpu::BlendState {
                color: wgpu::BlendComponent {
                    src_factor: wgpu::BlendFactor::Dst,
                    dst_factor: wgpu::BlendFactor::OneMinusSrcAlpha,
                    operation: wgpu::BlendOperation::Add,
                },
                alpha: wgpu::BlendComponent::OVER,
            }),
            BlendMode::Opaque => None,
        }
    }
}

/// Immutable key identifying a GPU pipeline configuration plus the content
/// bound with it.
///
/// Draws with equal signatures may be coalesced into one batch; draws with
/// different signatures never share a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResourceSignature {
    pub layout: LayoutId,
    pub content: ContentHandle,
    pub blend: BlendMode,
}

impl ResourceSignature {
    pub fn new(layout: LayoutId, content: ContentHandle, blend: BlendMode) -> Self {
        Self {
            layout,
            content,
            blend,
        }
    }

    /// Signature for instances of layout `I`.
    pub fn of<I: crate::layout::InstanceLayout>(content: ContentHandle, blend: BlendMode) -> Self {
        Self::new(I::DESCRIPTOR.id, content, blend)
    }

    /// The part of the signature that determines pipeline state.
    pub fn pipeline_key(&self) -> PipelineKey {
        PipelineKey {
            layout: self.layout,
            blend: self.blend,
        }
    }
}

impl std::fmt::Display for ResourceSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}/{}/{:?}", self.layout, self.content, self.blend)
    }
}

/// Cache key for compiled pipelines.
///
/// Content is bound through a separate bind group, so it does not take part.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PipelineKey {
    pub layout: LayoutId,
    pub blend: BlendMode,
}
