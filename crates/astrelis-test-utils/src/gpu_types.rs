//! GPU resource wrappers that can be real or mock.
//!
//! These types wrap WGPU resources and allow for both real GPU operations
//! and mock implementations for testing.

/// Wrapper around GPU buffer that can be real or mock.
///
/// # Design Pattern: Opaque Wrapper
///
/// This type hides whether it contains a real `wgpu::Buffer` or a mock.
/// Users hold owned `GpuBuffer`, which is cheap to clone (wgpu handles are
/// reference counted).
#[derive(Clone, Debug)]
pub struct GpuBuffer {
    inner: GpuBufferInner,
}

#[derive(Clone, Debug)]
enum GpuBufferInner {
    Real(wgpu::Buffer),
    #[cfg(feature = "mock")]
    Mock { id: usize, size: u64 },
}

impl GpuBuffer {
    /// Create from real WGPU buffer
    pub fn from_wgpu(buffer: wgpu::Buffer) -> Self {
        Self {
            inner: GpuBufferInner::Real(buffer),
        }
    }

    /// Create mock buffer (for testing)
    #[cfg(feature = "mock")]
    pub fn mock(id: usize, size: u64) -> Self {
        Self {
            inner: GpuBufferInner::Mock { id, size },
        }
    }

    /// Size of the buffer in bytes.
    pub fn size(&self) -> u64 {
        match &self.inner {
            GpuBufferInner::Real(buffer) => buffer.size(),
            #[cfg(feature = "mock")]
            GpuBufferInner::Mock { size, .. } => *size,
        }
    }

    /// Get the underlying wgpu::Buffer (if real)
    ///
    /// # Panics
    /// Panics if this is a mock buffer (test code should never call this)
    pub fn as_wgpu(&self) -> &wgpu::Buffer {
        match &self.inner {
            GpuBufferInner::Real(buffer) => buffer,
            #[cfg(feature = "mock")]
            GpuBufferInner::Mock { .. } => {
                panic!("Attempted to get wgpu::Buffer from mock buffer - this is a test-only buffer")
            }
        }
    }

    /// Check if this is a mock (useful in tests)
    #[cfg(feature = "mock")]
    pub fn is_mock(&self) -> bool {
        matches!(self.inner, GpuBufferInner::Mock { .. })
    }

    /// Get mock ID (for test assertions)
    #[cfg(feature = "mock")]
    pub fn mock_id(&self) -> Option<usize> {
        match &self.inner {
            GpuBufferInner::Mock { id, .. } => Some(*id),
            _ => None,
        }
    }
}

/// Wrapper around GPU render pipeline that can be real or mock.
#[derive(Clone, Debug)]
pub struct GpuRenderPipeline {
    inner: GpuRenderPipelineInner,
}

#[derive(Clone, Debug)]
enum GpuRenderPipelineInner {
    Real(wgpu::RenderPipeline),
    #[cfg(feature = "mock")]
    Mock { id: usize },
}

impl GpuRenderPipeline {
    /// Create from real WGPU render pipeline
    pub fn from_wgpu(pipeline: wgpu::RenderPipeline) -> Self {
        Self {
            inner: GpuRenderPipelineInner::Real(pipeline),
        }
    }

    /// Create mock render pipeline (for testing)
    #[cfg(feature = "mock")]
    pub fn mock(id: usize) -> Self {
        Self {
            inner: GpuRenderPipelineInner::Mock { id },
        }
    }

    /// Get the underlying wgpu::RenderPipeline (if real)
    pub fn as_wgpu(&self) -> &wgpu::RenderPipeline {
        match &self.inner {
            GpuRenderPipelineInner::Real(pipeline) => pipeline,
            #[cfg(feature = "mock")]
            GpuRenderPipelineInner::Mock { .. } => {
                panic!("Attempted to get wgpu::RenderPipeline from mock")
            }
        }
    }

    /// Check if this is a mock
    #[cfg(feature = "mock")]
    pub fn is_mock(&self) -> bool {
        matches!(self.inner, GpuRenderPipelineInner::Mock { .. })
    }

    /// Get mock ID (for test assertions)
    #[cfg(feature = "mock")]
    pub fn mock_id(&self) -> Option<usize> {
        match &self.inner {
            GpuRenderPipelineInner::Mock { id } => Some(*id),
            _ => None,
        }
    }
}

/// Wrapper around GPU bind group that can be real or mock.
#[derive(Clone, Debug)]
pub struct GpuBindGroup {
    inner: GpuBindGroupInner,
}

#[derive(Clone, Debug)]
enum GpuBindGroupInner {
    Real(wgpu::BindGroup),
    #[cfg(feature = "mock")]
    Mock { id: usize },
}

impl GpuBindGroup {
    /// Create from real WGPU bind group
    pub fn from_wgpu(bind_group: wgpu::BindGroup) -> Self {
        Self {
            inner: GpuBindGroupInner::Real(bind_group),
        }
    }

    /// Create mock bind group (for testing)
    #[cfg(feature = "mock")]
    pub fn mock(id: usize) -> Self {
        Self {
            inner: GpuBindGroupInner::Mock { id },
        }
    }

    /// Get the underlying wgpu::BindGroup (if real)
    pub fn as_wgpu(&self) -> &wgpu::BindGroup {
        match &self.inner {
            GpuBindGroupInner::Real(bind_group) => bind_group,
            #[cfg(feature = "mock")]
            GpuBindGroupInner::Mock { .. } => {
                panic!("Attempted to get wgpu::BindGroup from mock")
            }
        }
    }

    /// Check if this is a mock
    #[cfg(feature = "mock")]
    pub fn is_mock(&self) -> bool {
        matches!(self.inner, GpuBindGroupInner::Mock { .. })
    }

    /// Get mock ID (for test assertions)
    #[cfg(feature = "mock")]
    pub fn mock_id(&self) -> Option<usize> {
        match &self.inner {
            GpuBindGroupInner::Mock { id } => Some(*id),
            _ => None,
        }
    }
}
