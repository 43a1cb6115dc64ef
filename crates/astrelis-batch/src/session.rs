//! Frame session: the begin / append / end protocol.
//!
//! ```text
//!            begin_frame              end_frame
//!   Idle ───────────────► Recording ───────────► Flushing ──► Idle
//!                          │    ▲
//!                          └────┘ append
//! ```
//!
//! `append` only copies instance bytes into a staging batch. All GPU work
//! (pipeline lookup, buffer upload, draw, submit) happens in `end_frame`, in
//! the order batches were opened.

use std::sync::Arc;

use astrelis_core::alloc::HashMap;
use astrelis_core::profiling::{profile_function, profile_scope};
use astrelis_test_utils::{DrawCommand, GpuBindGroup, GpuBuffer, GpuError, RenderContext};
use bytemuck::{Pod, Zeroable};
use glam::Mat4;

use crate::batch::Batch;
use crate::content::{ContentBinding, ContentRegistry};
use crate::error::{
    AppendError, DrawFailure, InvalidSignature, InvalidSignatureReason, ProtocolError,
    ResourceCreationError, ResourceKind,
};
use crate::layout::{InstanceLayout, LayoutDescriptor};
use crate::pool::{PoolDescriptor, ResourcePool, SizeClass};
use crate::router::BatchRouter;
use crate::signature::{ContentHandle, LayoutId, ResourceSignature};

/// Where a session is in its frame protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Between frames.
    Idle,
    /// Accepting `append` calls.
    Recording,
    /// Inside `end_frame`.
    Flushing,
}

/// Per-frame shader globals, uploaded once in `begin_frame`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FrameGlobals {
    pub view_projection: Mat4,
}

impl FrameGlobals {
    /// Pixel-space projection with the origin at the top-left corner and Y
    /// pointing down.
    pub fn orthographic(width: f32, height: f32) -> Self {
        Self {
            view_projection: Mat4::orthographic_rh(0.0, width, height, 0.0, -1.0, 1.0),
        }
    }
}

impl Default for FrameGlobals {
    fn default() -> Self {
        Self {
            view_projection: Mat4::IDENTITY,
        }
    }
}

/// Uniform layout matching `Globals` in the shaders.
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
struct GlobalsUniform {
    view_proj: [[f32; 4]; 4],
}

impl From<&FrameGlobals> for GlobalsUniform {
    fn from(globals: &FrameGlobals) -> Self {
        Self {
            view_proj: globals.view_projection.to_cols_array_2d(),
        }
    }
}

/// Configuration for a [`FrameSession`].
#[derive(Debug, Clone)]
pub struct FrameSessionDescriptor {
    /// Label used in logs.
    pub label: &'static str,
    /// Cap on instances per batch. Each layout's own capacity applies when
    /// this is `None` or larger.
    pub max_instances_per_batch: Option<u32>,
    /// Resource pool configuration.
    pub pool: PoolDescriptor,
}

impl Default for FrameSessionDescriptor {
    fn default() -> Self {
        Self {
            label: "frame_session",
            max_instances_per_batch: None,
            pool: PoolDescriptor::default(),
        }
    }
}

/// Outcome of one `end_frame`.
#[derive(Debug, Clone, Default)]
pub struct FrameReport {
    /// Index of the frame this report describes (0-based).
    pub frame_index: u64,
    /// Batches recorded during the frame.
    pub batches: usize,
    /// Draws actually issued.
    pub draw_calls: usize,
    /// Instances covered by the issued draws.
    pub instances: u64,
    /// Batches that were skipped because a resource could not be created.
    pub failures: Vec<DrawFailure>,
    /// Set when the frame globals could not be created. No draws were issued.
    pub degraded: Option<ResourceCreationError>,
}

impl FrameReport {
    /// Whether every recorded batch was drawn.
    pub fn is_complete(&self) -> bool {
        self.degraded.is_none() && self.failures.is_empty()
    }
}

/// Uniform buffer and group 0 binding for the frame globals.
struct GlobalsBinding {
    buffer: GpuBuffer,
    bind_group: GpuBindGroup,
}

/// Records draw requests for one frame at a time and flushes them as
/// instanced draws.
///
/// # Example
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use astrelis_batch::*;
///
/// # fn run(context: Arc<GraphicsContext>, texture: ContentHandle) -> Result<(), Box<dyn std::error::Error>> {
/// let mut session = FrameSession::new(context, FrameSessionDescriptor::default());
///
/// session.begin_frame(&FrameGlobals::orthographic(800.0, 600.0))?;
/// let sprite = Sprite::new(texture, glam::Vec2::splat(32.0));
/// session.draw_on_position(&sprite, glam::Vec2::new(10.0, 10.0))?;
/// let report = session.end_frame()?;
/// assert!(report.is_complete());
/// # Ok(())
/// # }
/// ```
pub struct FrameSession {
    context: Arc<dyn RenderContext>,
    descriptor: FrameSessionDescriptor,
    state: SessionState,
    frame_index: u64,
    router: BatchRouter,
    pool: ResourcePool,
    content: ContentRegistry,
    layouts: HashMap<LayoutId, LayoutDescriptor>,
    globals: Option<GlobalsBinding>,
    globals_error: Option<ResourceCreationError>,
}

impl FrameSession {
    pub fn new(context: Arc<dyn RenderContext>, descriptor: FrameSessionDescriptor) -> Self {
        let pool = ResourcePool::new(descriptor.pool.clone());
        Self::with_pool(context, pool, descriptor)
    }

    /// Create a session around an existing pool, e.g. one warmed up by a
    /// previous session.
    pub fn with_pool(
        context: Arc<dyn RenderContext>,
        pool: ResourcePool,
        descriptor: FrameSessionDescriptor,
    ) -> Self {
        tracing::debug!("Creating frame session '{}'", descriptor.label);
        Self {
            context,
            descriptor,
            state: SessionState::Idle,
            frame_index: 0,
            router: BatchRouter::new(),
            pool,
            content: ContentRegistry::new(),
            layouts: HashMap::new(),
            globals: None,
            globals_error: None,
        }
    }

    /// Start recording a frame.
    ///
    /// Fails without side effects unless the session is idle.
    pub fn begin_frame(&mut self, globals: &FrameGlobals) -> Result<(), ProtocolError> {
        profile_function!();
        self.expect_state("begin_frame", SessionState::Idle)?;

        match self.ensure_globals() {
            Ok(()) => {
                if let Some(binding) = &self.globals {
                    let uniform = GlobalsUniform::from(globals);
                    self.context
                        .write_buffer(&binding.buffer, 0, bytemuck::bytes_of(&uniform));
                }
            }
            Err(err) => {
                tracing::error!(
                    "Frame {} of '{}' has no globals, nothing will be drawn: {}",
                    self.frame_index,
                    self.descriptor.label,
                    err
                );
                self.globals_error = Some(err);
            }
        }

        self.state = SessionState::Recording;
        Ok(())
    }

    /// Queue one instance for drawing with `signature`.
    ///
    /// The instance lands in the batch for its signature, opening a new batch
    /// when the current one is full or another signature was appended in
    /// between. No GPU work happens here.
    pub fn append<I: InstanceLayout>(
        &mut self,
        signature: ResourceSignature,
        instance: &I,
    ) -> Result<(), AppendError> {
        self.expect_state("append", SessionState::Recording)?;

        let layout = I::DESCRIPTOR;
        if signature.layout != layout.id {
            return Err(InvalidSignature {
                handle: signature.content,
                reason: InvalidSignatureReason::LayoutMismatch {
                    expected: signature.layout,
                    actual: layout.id,
                },
            }
            .into());
        }
        self.content.validate(signature.content, layout.textured)?;
        self.register_layout(signature.content, &layout)?;

        let capacity = self.batch_capacity(&layout);
        let batch = self.router.route(signature, layout.stride as usize, capacity);
        let appended = batch.try_append_with(|dst| instance.write_into(dst));
        debug_assert!(appended, "router returned a full batch");
        Ok(())
    }

    /// Flush every recorded batch, submit, and return to idle.
    ///
    /// A batch whose pipeline or buffer cannot be created is skipped and
    /// listed in [`FrameReport::failures`]; the other batches still draw.
    pub fn end_frame(&mut self) -> Result<FrameReport, ProtocolError> {
        profile_function!();
        self.expect_state("end_frame", SessionState::Recording)?;
        self.state = SessionState::Flushing;

        let mut report = FrameReport {
            frame_index: self.frame_index,
            batches: self.router.active_count(),
            ..Default::default()
        };

        if let Some(err) = self.globals_error.take() {
            report.degraded = Some(err);
        } else if let Some(globals) = &self.globals {
            for (batch_index, batch) in self.router.batches().iter().enumerate() {
                if batch.is_empty() {
                    continue;
                }
                let signature = batch.signature();
                let Some(layout) = self.layouts.get(&signature.layout) else {
                    tracing::error!("No layout registered for {}, skipping batch", signature);
                    continue;
                };

                match flush_batch(
                    self.context.as_ref(),
                    &mut self.pool,
                    &self.content,
                    layout,
                    &globals.bind_group,
                    batch,
                ) {
                    Ok(()) => {
                        report.draw_calls += 1;
                        report.instances += batch.instance_count() as u64;
                    }
                    Err(error) => {
                        tracing::warn!(
                            "Skipping batch {} ({}, {} instances): {}",
                            batch_index,
                            signature,
                            batch.instance_count(),
                            error
                        );
                        report.failures.push(DrawFailure {
                            signature,
                            batch_index,
                            instance_count: batch.instance_count(),
                            error,
                        });
                    }
                }
            }
        }

        self.context.submit();
        self.pool.reclaim();
        self.pool.end_frame();
        self.router.retire_all();
        if let Some(max_idle) = self.pool.descriptor().idle_eviction_frames {
            self.router.evict_idle(max_idle);
        }

        tracing::trace!(
            "Frame {} of '{}': {} batches, {} draws, {} instances",
            report.frame_index,
            self.descriptor.label,
            report.batches,
            report.draw_calls,
            report.instances
        );

        self.frame_index += 1;
        self.state = SessionState::Idle;
        Ok(report)
    }

    /// Register content that is ready to draw.
    pub fn register_content(&mut self, handle: ContentHandle, bind_group: GpuBindGroup) {
        self.content.register(handle, ContentBinding::Ready(bind_group));
    }

    /// Mark content as still loading. Appends that reference it are rejected
    /// until it is registered as ready. Batches already recorded for it this
    /// frame are skipped at flush and reported as failures.
    pub fn mark_content_pending(&mut self, handle: ContentHandle) {
        self.content.mark_pending(handle);
    }

    pub fn unregister_content(&mut self, handle: ContentHandle) {
        self.content.unregister(handle);
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    /// Number of frames ended so far.
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    pub fn pool(&self) -> &ResourcePool {
        &self.pool
    }

    pub fn router(&self) -> &BatchRouter {
        &self.router
    }

    pub fn content(&self) -> &ContentRegistry {
        &self.content
    }

    pub fn context(&self) -> &Arc<dyn RenderContext> {
        &self.context
    }

    pub fn descriptor(&self) -> &FrameSessionDescriptor {
        &self.descriptor
    }

    /// Tear down the session, keeping its pool for reuse.
    pub fn into_pool(self) -> ResourcePool {
        self.pool
    }

    pub(crate) fn expect_state(
        &self,
        operation: &'static str,
        expected: SessionState,
    ) -> Result<(), ProtocolError> {
        if self.state == expected {
            return Ok(());
        }
        let err = ProtocolError {
            operation,
            state: self.state,
            expected,
        };
        tracing::error!("{}", err);
        Err(err)
    }

    /// Remember `layout` under its id, rejecting a different record that
    /// claims an id already in use.
    fn register_layout(
        &mut self,
        handle: ContentHandle,
        layout: &LayoutDescriptor,
    ) -> Result<(), InvalidSignature> {
        let conflict = InvalidSignature {
            handle,
            reason: InvalidSignatureReason::LayoutConflict { layout: layout.id },
        };
        if layout.stride == 0 {
            tracing::error!("{}", conflict);
            return Err(conflict);
        }
        match self.layouts.get(&layout.id) {
            Some(registered) if registered.is_compatible(layout) => Ok(()),
            Some(registered) => {
                tracing::error!(
                    "{} ('{}' is registered, got '{}')",
                    conflict,
                    registered.label,
                    layout.label
                );
                Err(conflict)
            }
            None => {
                self.layouts.insert(layout.id, *layout);
                Ok(())
            }
        }
    }

    fn batch_capacity(&self, layout: &LayoutDescriptor) -> u32 {
        let capacity = match self.descriptor.max_instances_per_batch {
            Some(max) => layout.capacity.min(max),
            None => layout.capacity,
        };
        capacity.max(1)
    }

    /// Create the globals uniform and binding if they don't exist yet.
    ///
    /// Nothing is cached on failure, so the next frame retries.
    fn ensure_globals(&mut self) -> Result<(), ResourceCreationError> {
        if self.globals.is_some() {
            return Ok(());
        }

        profile_scope!("create_globals");
        let buffer = self
            .context
            .create_buffer(&wgpu::BufferDescriptor {
                label: Some("batched_globals"),
                size: std::mem::size_of::<GlobalsUniform>() as u64,
                usage: wgpu::BufferUsages::UNIFORM | wgpu::BufferUsages::COPY_DST,
                mapped_at_creation: false,
            })
            .map_err(|source| {
                ResourceCreationError::new(ResourceKind::UniformBuffer, "batched_globals", source)
            })?;
        let bind_group = self.context.create_uniform_binding(&buffer).map_err(|source| {
            ResourceCreationError::new(
                ResourceKind::UniformBinding,
                "batched_globals_bind_group",
                source,
            )
        })?;
        self.globals = Some(GlobalsBinding { buffer, bind_group });
        Ok(())
    }
}

/// Upload one batch and issue its draw.
fn flush_batch(
    context: &dyn RenderContext,
    pool: &mut ResourcePool,
    content: &ContentRegistry,
    layout: &LayoutDescriptor,
    globals: &GpuBindGroup,
    batch: &Batch,
) -> Result<(), ResourceCreationError> {
    profile_scope!("flush_batch");
    let signature = batch.signature();

    let content_binding = if layout.textured && !signature.content.is_none() {
        let binding = content.binding(signature.content).ok_or_else(|| {
            ResourceCreationError::new(
                ResourceKind::ContentBinding,
                layout.label,
                GpuError::Validation(format!(
                    "content {} was unregistered or marked pending during the frame",
                    signature.content
                )),
            )
        })?;
        Some(binding)
    } else {
        None
    };

    let pipeline = pool.acquire_pipeline(context, &signature, layout)?;
    let buffer = pool.acquire_buffer(context, SizeClass::for_size(batch.staging_size() as u64))?;

    context.write_buffer(buffer.buffer(), 0, batch.staging_view());
    context.draw(&DrawCommand {
        pipeline: &pipeline,
        globals,
        textured: layout.textured,
        content: content_binding,
        instances: buffer.buffer(),
        vertex_count: layout.vertices_per_instance,
        instance_count: batch.instance_count(),
    });

    pool.release_buffer(buffer);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::instances::{RectInstance, SpriteInstance};
    use crate::signature::BlendMode;
    use astrelis_test_utils::MockRenderContext;

    fn session() -> (Arc<MockRenderContext>, FrameSession) {
        let mock = Arc::new(MockRenderContext::new());
        let session = FrameSession::new(mock.clone(), FrameSessionDescriptor::default());
        (mock, session)
    }

    fn rect_sig() -> ResourceSignature {
        ResourceSignature::of::<RectInstance>(ContentHandle::NONE, BlendMode::Alpha)
    }

    #[test]
    fn test_state_transitions() {
        let (_mock, mut session) = session();
        assert_eq!(session.state(), SessionState::Idle);

        session.begin_frame(&FrameGlobals::default()).unwrap();
        assert_eq!(session.state(), SessionState::Recording);

        let report = session.end_frame().unwrap();
        assert_eq!(report.frame_index, 0);
        assert_eq!(session.state(), SessionState::Idle);
        assert_eq!(session.frame_index(), 1);
    }

    #[test]
    fn test_protocol_errors_leave_state_unchanged() {
        let (_mock, mut session) = session();

        let err = session.end_frame().unwrap_err();
        assert_eq!(err.operation, "end_frame");
        assert_eq!(err.state, SessionState::Idle);
        assert_eq!(session.state(), SessionState::Idle);

        let err = session.append(rect_sig(), &RectInstance::default()).unwrap_err();
        assert!(matches!(err, AppendError::Protocol(_)));

        session.begin_frame(&FrameGlobals::default()).unwrap();
        let err = session.begin_frame(&FrameGlobals::default()).unwrap_err();
        assert_eq!(err.expected, SessionState::Idle);
        assert_eq!(err.state, SessionState::Recording);
        assert_eq!(session.state(), SessionState::Recording);
    }

    #[test]
    fn test_globals_created_once_and_uploaded_every_frame() {
        let (mock, mut session) = session();
        for _ in 0..3 {
            session.begin_frame(&FrameGlobals::orthographic(640.0, 480.0)).unwrap();
            session.end_frame().unwrap();
        }
        // One globals buffer, three uploads, three submits.
        assert_eq!(mock.count_buffer_creates(), 1);
        assert_eq!(mock.count_buffer_writes(), 3);
        assert_eq!(mock.count_submits(), 3);
        assert_eq!(mock.count_draws(), 0);
    }

    #[test]
    fn test_layout_mismatch_rejected() {
        let (_mock, mut session) = session();
        session.begin_frame(&FrameGlobals::default()).unwrap();

        let err = session
            .append(rect_sig(), &SpriteInstance::default())
            .unwrap_err();
        assert_eq!(
            err,
            AppendError::InvalidSignature(InvalidSignature {
                handle: ContentHandle::NONE,
                reason: InvalidSignatureReason::LayoutMismatch {
                    expected: RectInstance::LAYOUT,
                    actual: SpriteInstance::LAYOUT,
                },
            })
        );
        assert!(session.router().is_empty());
    }

    #[test]
    fn test_max_instances_per_batch_caps_layout_capacity() {
        let mock = Arc::new(MockRenderContext::new());
        let mut session = FrameSession::new(
            mock.clone(),
            FrameSessionDescriptor {
                max_instances_per_batch: Some(4),
                ..Default::default()
            },
        );

        session.begin_frame(&FrameGlobals::default()).unwrap();
        for _ in 0..10 {
            session.append(rect_sig(), &RectInstance::default()).unwrap();
        }
        let report = session.end_frame().unwrap();

        assert_eq!(report.batches, 3);
        assert_eq!(mock.draw_instance_counts(), vec![4, 4, 2]);
    }

    #[test]
    fn test_orthographic_maps_corners() {
        let globals = FrameGlobals::orthographic(200.0, 100.0);
        let top_left = globals.view_projection.project_point3(glam::Vec3::ZERO);
        let bottom_right = globals
            .view_projection
            .project_point3(glam::Vec3::new(200.0, 100.0, 0.0));

        assert!((top_left.x + 1.0).abs() < 1e-5 && (top_left.y - 1.0).abs() < 1e-5);
        assert!((bottom_right.x - 1.0).abs() < 1e-5 && (bottom_right.y + 1.0).abs() < 1e-5);
    }
}
