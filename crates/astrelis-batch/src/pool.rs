//! Pooled GPU resources: compiled pipelines and instance buffers.
//!
//! Pipelines are cached per [`PipelineKey`] and live as long as the pool.
//! Instance buffers are grouped by size class (byte size rounded up to the
//! next power of two), so any free buffer of the right class can back any
//! batch.
//!
//! # Buffer lifecycle
//!
//! ```text
//! acquire_buffer ──► in use ──release_buffer──► in flight ──reclaim──► free
//!        ▲                                                              │
//!        └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Released buffers are not reusable until [`ResourcePool::reclaim`] runs
//! after the frame's queue submission. Uploads are queue writes that only take
//! effect at submit, so handing the same buffer to two batches of one frame
//! would make both draws read the last upload.

use astrelis_core::alloc::HashMap;
use astrelis_core::profiling::profile_function;
use astrelis_test_utils::{GpuBuffer, GpuRenderPipeline, RenderContext};

use crate::error::{ResourceCreationError, ResourceKind};
use crate::layout::LayoutDescriptor;
use crate::signature::{PipelineKey, ResourceSignature};

/// Buffer size class in bytes (always a power of two).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SizeClass(u64);

impl SizeClass {
    /// Smallest class able to hold `bytes`.
    pub fn for_size(bytes: u64) -> Self {
        Self(bytes.max(1).next_power_of_two())
    }

    pub fn bytes(self) -> u64 {
        self.0
    }
}

/// A buffer borrowed from the pool.
///
/// Hand it back with [`ResourcePool::release_buffer`].
#[derive(Debug)]
pub struct PooledBuffer {
    buffer: GpuBuffer,
    class: SizeClass,
}

impl PooledBuffer {
    pub fn buffer(&self) -> &GpuBuffer {
        &self.buffer
    }

    pub fn size_class(&self) -> SizeClass {
        self.class
    }
}

/// A free buffer and the frame it was last used in.
#[derive(Debug)]
struct FreeBuffer {
    buffer: GpuBuffer,
    last_used: u64,
}

/// Configuration for a [`ResourcePool`].
#[derive(Debug, Clone, Default)]
pub struct PoolDescriptor {
    /// Drop free buffers that went unused for this many frames.
    ///
    /// `None` (the default) never frees buffers, so the pool only grows.
    pub idle_eviction_frames: Option<u64>,
}

/// Pool statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    pub pipelines_created: u64,
    pub buffers_created: u64,
    pub buffers_evicted: u64,
    pub free_buffers: usize,
    pub in_flight_buffers: usize,
    pub borrowed_buffers: usize,
}

/// Cache and free-list manager for pipelines and instance buffers.
pub struct ResourcePool {
    descriptor: PoolDescriptor,
    pipelines: HashMap<PipelineKey, GpuRenderPipeline>,
    free: HashMap<SizeClass, Vec<FreeBuffer>>,
    in_flight: Vec<PooledBuffer>,
    borrowed: usize,
    frame: u64,
    pipelines_created: u64,
    buffers_created: u64,
    buffers_evicted: u64,
}

impl ResourcePool {
    pub fn new(descriptor: PoolDescriptor) -> Self {
        Self {
            descriptor,
            pipelines: HashMap::new(),
            free: HashMap::new(),
            in_flight: Vec::new(),
            borrowed: 0,
            frame: 0,
            pipelines_created: 0,
            buffers_created: 0,
            buffers_evicted: 0,
        }
    }

    /// Get the pipeline for `signature`, compiling it on first use.
    ///
    /// A failed compilation is not cached; the next request retries.
    pub fn acquire_pipeline(
        &mut self,
        context: &dyn RenderContext,
        signature: &ResourceSignature,
        layout: &LayoutDescriptor,
    ) -> Result<GpuRenderPipeline, ResourceCreationError> {
        let key = signature.pipeline_key();
        if let Some(pipeline) = self.pipelines.get(&key) {
            return Ok(pipeline.clone());
        }

        profile_function!();
        let pipeline = context
            .create_render_pipeline(&layout.pipeline_descriptor(signature.blend))
            .map_err(|err| ResourceCreationError::new(ResourceKind::Pipeline, layout.label, err))?;

        self.pipelines_created += 1;
        tracing::info!(
            "Compiled pipeline '{}' ({:?} blend), {} cached",
            layout.label,
            signature.blend,
            self.pipelines.len() + 1
        );
        self.pipelines.insert(key, pipeline.clone());
        Ok(pipeline)
    }

    /// Borrow a buffer of `class`, allocating one if none is free.
    pub fn acquire_buffer(
        &mut self,
        context: &dyn RenderContext,
        class: SizeClass,
    ) -> Result<PooledBuffer, ResourceCreationError> {
        if let Some(free) = self.free.get_mut(&class).and_then(Vec::pop) {
            self.borrowed += 1;
            return Ok(PooledBuffer {
                buffer: free.buffer,
                class,
            });
        }

        let buffer = context
            .create_buffer(&wgpu::BufferDescriptor {
                label: Some("batched_instance_buffer"),
                size: class.bytes(),
                usage: wgpu::BufferUsages::VERTEX | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
            .map_err(|err| {
                ResourceCreationError::new(ResourceKind::InstanceBuffer, "batched_instance_buffer", err)
            })?;

        self.buffers_created += 1;
        self.borrowed += 1;
        tracing::trace!(
            "Allocated instance buffer of {} bytes ({} total)",
            class.bytes(),
            self.buffers_created
        );
        Ok(PooledBuffer { buffer, class })
    }

    /// Give a borrowed buffer back. It becomes reusable after [`reclaim`](Self::reclaim).
    pub fn release_buffer(&mut self, buffer: PooledBuffer) {
        self.borrowed = self.borrowed.saturating_sub(1);
        self.in_flight.push(buffer);
    }

    /// Return every in-flight buffer to its free list.
    ///
    /// Call once the work that used them has been submitted.
    pub fn reclaim(&mut self) {
        let frame = self.frame;
        for PooledBuffer { buffer, class } in self.in_flight.drain(..) {
            self.free.entry(class).or_default().push(FreeBuffer {
                buffer,
                last_used: frame,
            });
        }
    }

    /// Advance the pool's frame counter and apply idle eviction.
    pub fn end_frame(&mut self) {
        self.frame += 1;
        let Some(max_idle) = self.descriptor.idle_eviction_frames else {
            return;
        };

        let frame = self.frame;
        let mut evicted = 0;
        for list in self.free.values_mut() {
            let before = list.len();
            list.retain(|free| frame - free.last_used <= max_idle);
            evicted += before - list.len();
        }
        if evicted > 0 {
            self.buffers_evicted += evicted as u64;
            tracing::debug!("Evicted {} idle instance buffers", evicted);
        }
    }

    pub fn descriptor(&self) -> &PoolDescriptor {
        &self.descriptor
    }

    /// Number of cached pipelines.
    pub fn pipeline_count(&self) -> usize {
        self.pipelines.len()
    }

    /// Number of free buffers across all size classes.
    pub fn free_buffer_count(&self) -> usize {
        self.free.values().map(Vec::len).sum()
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            pipelines_created: self.pipelines_created,
            buffers_created: self.buffers_created,
            buffers_evicted: self.buffers_evicted,
            free_buffers: self.free_buffer_count(),
            in_flight_buffers: self.in_flight.len(),
            borrowed_buffers: self.borrowed,
        }
    }
}

impl Default for ResourcePool {
    fn default() -> Self {
        Self::new(PoolDescriptor::default())
    }
}
