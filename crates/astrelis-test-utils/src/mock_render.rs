//! Mock implementation of RenderContext for testing.
//!
//! This module provides a mock GPU context that records operations
//! without actually interacting with the GPU.

use crate::{gpu_types::*, render_context::*};
use parking_lot::Mutex;
use wgpu::*;

/// Records a GPU operation call for verification in tests.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderCall {
    CreateBuffer {
        size: u64,
        usage: BufferUsages,
    },
    WriteBuffer {
        buffer_id: usize,
        offset: u64,
        size: usize,
    },
    CreateRenderPipeline {
        label: String,
    },
    CreateBindGroup {
        buffer_id: usize,
    },
    Draw {
        pipeline_id: usize,
        buffer_id: usize,
        content_id: Option<usize>,
        vertex_count: u32,
        instance_count: u32,
    },
    Submit,
}

/// A recorded draw, flattened for assertions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MockDraw {
    pub pipeline_id: usize,
    pub buffer_id: usize,
    pub content_id: Option<usize>,
    pub instance_count: u32,
}

/// Resource kinds that can be made to fail.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FailureTarget {
    Buffer,
    Pipeline,
    Binding,
}

/// Monotonic counters for generating IDs and ordinals.
#[derive(Debug, Default)]
struct Counters {
    buffers: usize,
    pipelines: usize,
    bind_groups: usize,
    buffer_attempts: usize,
    pipeline_attempts: usize,
    binding_attempts: usize,
}

/// Mock implementation of RenderContext for testing.
///
/// # Borrow Checking Pattern: Interior Mutability
///
/// Methods take `&self` but need to mutate internal state (record calls).
/// `parking_lot::Mutex` keeps the type `Send + Sync` as the trait requires.
///
/// # Fault Injection
///
/// `fail_buffer_creation(n)` and friends make the n-th (0-based) creation
/// attempt of that resource kind fail, counted from construction.
///
/// # Example
///
/// ```rust
/// use astrelis_test_utils::{MockRenderContext, RenderContext};
/// use wgpu::*;
///
/// let mock = MockRenderContext::new();
///
/// let buffer = mock
///     .create_buffer(&BufferDescriptor {
///         label: None,
///         size: 1024,
///         usage: BufferUsages::VERTEX,
///         mapped_at_creation: false,
///     })
///     .unwrap();
///
/// assert!(buffer.is_mock());
/// assert_eq!(mock.count_buffer_creates(), 1);
/// ```
pub struct MockRenderContext {
    /// Recorded calls for verification
    calls: Mutex<Vec<RenderCall>>,
    counters: Mutex<Counters>,
    /// Pending injected failures as (target, attempt ordinal)
    failures: Mutex<Vec<(FailureTarget, usize)>>,
}

impl MockRenderContext {
    /// Create a new mock render context.
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            counters: Mutex::new(Counters::default()),
            failures: Mutex::new(Vec::new()),
        }
    }

    /// Make the `attempt`-th buffer creation (0-based) fail with out-of-memory.
    pub fn fail_buffer_creation(&self, attempt: usize) {
        self.failures.lock().push((FailureTarget::Buffer, attempt));
    }

    /// Make the `attempt`-th pipeline creation (0-based) fail validation.
    pub fn fail_pipeline_creation(&self, attempt: usize) {
        self.failures.lock().push((FailureTarget::Pipeline, attempt));
    }

    /// Make the `attempt`-th uniform binding creation (0-based) fail.
    pub fn fail_binding_creation(&self, attempt: usize) {
        self.failures.lock().push((FailureTarget::Binding, attempt));
    }

    /// Create a standalone bind group, e.g. to stand in for a texture binding.
    pub fn mock_bind_group(&self) -> GpuBindGroup {
        let mut counters = self.counters.lock();
        let id = counters.bind_groups;
        counters.bind_groups += 1;
        GpuBindGroup::mock(id)
    }

    /// Get a copy of all recorded calls (for test assertions).
    pub fn calls(&self) -> Vec<RenderCall> {
        self.calls.lock().clone()
    }

    /// All recorded draws, in submission order.
    pub fn draws(&self) -> Vec<MockDraw> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match *call {
                RenderCall::Draw {
                    pipeline_id,
                    buffer_id,
                    content_id,
                    instance_count,
                    ..
                } => Some(MockDraw {
                    pipeline_id,
                    buffer_id,
                    content_id,
                    instance_count,
                }),
                _ => None,
            })
            .collect()
    }

    /// Instance counts of all recorded draws, in submission order.
    pub fn draw_instance_counts(&self) -> Vec<u32> {
        self.draws().iter().map(|draw| draw.instance_count).collect()
    }

    /// Count successful buffer creations.
    pub fn count_buffer_creates(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::CreateBuffer { .. }))
    }

    /// Count buffer write operations.
    pub fn count_buffer_writes(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::WriteBuffer { .. }))
    }

    /// Count successful render pipeline creations.
    pub fn count_render_pipeline_creates(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::CreateRenderPipeline { .. }))
    }

    /// Count draw calls.
    pub fn count_draws(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::Draw { .. }))
    }

    /// Count queue submissions.
    pub fn count_submits(&self) -> usize {
        self.count(|call| matches!(call, RenderCall::Submit))
    }

    /// Clear recorded calls (useful between test steps).
    ///
    /// ID counters and pending failures are left untouched.
    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Get total number of recorded calls.
    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    fn count(&self, predicate: impl Fn(&RenderCall) -> bool) -> usize {
        self.calls.lock().iter().filter(|call| predicate(call)).count()
    }

    /// Consume an injected failure matching `target` and `attempt`, if any.
    fn take_failure(&self, target: FailureTarget, attempt: usize) -> bool {
        let mut failures = self.failures.lock();
        match failures
            .iter()
            .position(|&(t, a)| t == target && a == attempt)
        {
            Some(index) => {
                failures.swap_remove(index);
                true
            }
            None => false,
        }
    }
}

impl Default for MockRenderContext {
    fn default() -> Self {
        Self::new()
    }
}

impl RenderContext for MockRenderContext {
    fn create_buffer(&self, desc: &BufferDescriptor) -> Result<GpuBuffer, GpuError> {
        let attempt = {
            let mut counters = self.counters.lock();
            counters.buffer_attempts += 1;
            counters.buffer_attempts - 1
        };
        if self.take_failure(FailureTarget::Buffer, attempt) {
            return Err(GpuError::OutOfMemory);
        }

        let id = {
            let mut counters = self.counters.lock();
            counters.buffers += 1;
            counters.buffers - 1
        };

        self.calls.lock().push(RenderCall::CreateBuffer {
            size: desc.size,
            usage: desc.usage,
        });

        Ok(GpuBuffer::mock(id, desc.size))
    }

    fn write_buffer(&self, buffer: &GpuBuffer, offset: u64, data: &[u8]) {
        if let Some(buffer_id) = buffer.mock_id() {
            self.calls.lock().push(RenderCall::WriteBuffer {
                buffer_id,
                offset,
                size: data.len(),
            });
        }
    }

    fn create_render_pipeline(
        &self,
        desc: &PipelineDescriptor,
    ) -> Result<GpuRenderPipeline, GpuError> {
        let attempt = {
            let mut counters = self.counters.lock();
            counters.pipeline_attempts += 1;
            counters.pipeline_attempts - 1
        };
        if self.take_failure(FailureTarget::Pipeline, attempt) {
            return Err(GpuError::Validation(format!(
                "injected failure for pipeline '{}'",
                desc.label
            )));
        }

        let id = {
            let mut counters = self.counters.lock();
            counters.pipelines += 1;
            counters.pipelines - 1
        };

        self.calls.lock().push(RenderCall::CreateRenderPipeline {
            label: desc.label.to_string(),
        });

        Ok(GpuRenderPipeline::mock(id))
    }

    fn create_uniform_binding(&self, buffer: &GpuBuffer) -> Result<GpuBindGroup, GpuError> {
        let attempt = {
            let mut counters = self.counters.lock();
            counters.binding_attempts += 1;
            counters.binding_attempts - 1
        };
        if self.take_failure(FailureTarget::Binding, attempt) {
            return Err(GpuError::OutOfMemory);
        }

        let bind_group = self.mock_bind_group();
        self.calls.lock().push(RenderCall::CreateBindGroup {
            buffer_id: buffer.mock_id().unwrap_or(usize::MAX),
        });

        Ok(bind_group)
    }

    fn draw(&self, command: &DrawCommand<'_>) {
        self.calls.lock().push(RenderCall::Draw {
            pipeline_id: command.pipeline.mock_id().unwrap_or(usize::MAX),
            buffer_id: command.instances.mock_id().unwrap_or(usize::MAX),
            content_id: command.content.and_then(GpuBindGroup::mock_id),
            vertex_count: command.vertex_count,
            instance_count: command.instance_count,
        });
    }

    fn submit(&self) {
        self.calls.lock().push(RenderCall::Submit);
    }
}
