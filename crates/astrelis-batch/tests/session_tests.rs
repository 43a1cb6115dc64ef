//! Frame protocol, routing and failure handling against the mock context.

use std::sync::Arc;

use astrelis_batch::*;
use astrelis_test_utils::MockRenderContext;
use glam::Vec2;

fn setup() -> (Arc<MockRenderContext>, FrameSession) {
    let _ = astrelis_core::logging::try_init();
    let mock = Arc::new(MockRenderContext::new());
    let session = FrameSession::new(mock.clone(), FrameSessionDescriptor::default());
    (mock, session)
}

fn rect(blend: BlendMode) -> RoundedRect {
    RoundedRect::new(Vec2::ZERO, Vec2::splat(10.0), Color::WHITE).with_blend(blend)
}

fn register_texture(mock: &MockRenderContext, session: &mut FrameSession, id: u64) -> ContentHandle {
    let handle = ContentHandle(id);
    session.register_content(handle, mock.mock_bind_group());
    handle
}

#[test]
fn test_capacity_overflow_opens_second_batch() {
    let (mock, mut session) = setup();
    let capacity = RectInstance::DESCRIPTOR.capacity;

    session.begin_frame(&FrameGlobals::default()).unwrap();
    for _ in 0..=capacity {
        session.draw_rect(&rect(BlendMode::Alpha)).unwrap();
    }
    let report = session.end_frame().unwrap();

    assert_eq!(report.batches, 2);
    assert_eq!(report.draw_calls, 2);
    assert_eq!(report.instances, capacity as u64 + 1);
    assert_eq!(mock.draw_instance_counts(), vec![capacity, 1]);
}

#[test]
fn test_sprites_split_at_layout_capacity() {
    let (mock, mut session) = setup();
    let texture = register_texture(&mock, &mut session, 1);
    let sprite = Sprite::new(texture, Vec2::splat(16.0));

    session.begin_frame(&FrameGlobals::default()).unwrap();
    for i in 0..1500 {
        session
            .draw_on_position(&sprite, Vec2::new(i as f32, 0.0))
            .unwrap();
    }
    let report = session.end_frame().unwrap();

    assert!(report.is_complete());
    assert_eq!(mock.draw_instance_counts(), vec![1000, 500]);
}

#[test]
fn test_interleaved_signature_preserves_order() {
    let (mock, mut session) = setup();
    let a = rect(BlendMode::Alpha);
    let b = rect(BlendMode::Additive);

    session.begin_frame(&FrameGlobals::default()).unwrap();
    for r in [&a, &a, &b, &a] {
        session.draw_rect(r).unwrap();
    }
    session.end_frame().unwrap();

    let draws = mock.draws();
    assert_eq!(mock.draw_instance_counts(), vec![2, 1, 1]);
    assert_eq!(draws[0].pipeline_id, draws[2].pipeline_id);
    assert_ne!(draws[0].pipeline_id, draws[1].pipeline_id);
    assert_eq!(mock.count_render_pipeline_creates(), 2);
}

#[test]
fn test_alternating_textures_draw_in_order() {
    let (mock, mut session) = setup();
    let tex1 = register_texture(&mock, &mut session, 1);
    let tex2 = register_texture(&mock, &mut session, 2);
    let content_ids: Vec<_> = [tex1, tex2]
        .iter()
        .map(|handle| session.content().binding(*handle).and_then(GpuBindGroup::mock_id))
        .collect();

    session.begin_frame(&FrameGlobals::default()).unwrap();
    for texture in [tex1, tex2, tex1] {
        session
            .draw(&Sprite::new(texture, Vec2::splat(8.0)))
            .unwrap();
    }
    session.end_frame().unwrap();

    let draws = mock.draws();
    assert_eq!(mock.draw_instance_counts(), vec![1, 1, 1]);
    assert_eq!(
        draws.iter().map(|draw| draw.content_id).collect::<Vec<_>>(),
        vec![content_ids[0], content_ids[1], content_ids[0]]
    );
    // Content does not affect pipeline state.
    assert_eq!(mock.count_render_pipeline_creates(), 1);
}

#[test]
fn test_mixed_layouts_split_batches() {
    let (mock, mut session) = setup();
    let texture = register_texture(&mock, &mut session, 1);
    let sprite = Sprite::new(texture, Vec2::splat(8.0));

    session.begin_frame(&FrameGlobals::default()).unwrap();
    session.draw(&sprite).unwrap();
    session.draw_rect(&rect(BlendMode::Alpha)).unwrap();
    session.draw(&sprite).unwrap();
    let report = session.end_frame().unwrap();

    assert_eq!(report.batches, 3);
    let draws = mock.draws();
    assert_eq!(draws[1].content_id, None);
    assert_eq!(mock.count_render_pipeline_creates(), 2);
}

#[test]
fn test_begin_frame_twice_is_rejected() {
    let (mock, mut session) = setup();
    session.begin_frame(&FrameGlobals::default()).unwrap();
    session.draw_rect(&rect(BlendMode::Alpha)).unwrap();

    let err = session.begin_frame(&FrameGlobals::default()).unwrap_err();
    assert_eq!(err.operation, "begin_frame");
    assert_eq!(session.state(), SessionState::Recording);

    // The frame in progress is untouched.
    let report = session.end_frame().unwrap();
    assert_eq!(report.draw_calls, 1);
    assert_eq!(mock.count_submits(), 1);
}

#[test]
fn test_append_outside_recording_is_rejected() {
    let (mock, mut session) = setup();

    let err = session.draw_rect(&rect(BlendMode::Alpha)).unwrap_err();
    assert!(matches!(
        err,
        AppendError::Protocol(ProtocolError {
            state: SessionState::Idle,
            expected: SessionState::Recording,
            ..
        })
    ));

    session.begin_frame(&FrameGlobals::default()).unwrap();
    session.end_frame().unwrap();
    assert!(session.draw_rect(&rect(BlendMode::Alpha)).is_err());
    assert!(session.end_frame().is_err());

    assert_eq!(mock.count_submits(), 1);
    assert_eq!(session.frame_index(), 1);
}

#[test]
fn test_unknown_and_pending_content_rejected() {
    let (mock, mut session) = setup();
    let loading = ContentHandle(5);
    session.mark_content_pending(loading);

    session.begin_frame(&FrameGlobals::default()).unwrap();
    let err = session
        .draw(&Sprite::new(ContentHandle(99), Vec2::ONE))
        .unwrap_err();
    assert_eq!(
        err,
        AppendError::InvalidSignature(InvalidSignature {
            handle: ContentHandle(99),
            reason: InvalidSignatureReason::Unregistered,
        })
    );

    let err = session.draw(&Sprite::new(loading, Vec2::ONE)).unwrap_err();
    assert!(matches!(
        err,
        AppendError::InvalidSignature(InvalidSignature {
            reason: InvalidSignatureReason::Pending,
            ..
        })
    ));

    // Other draws in the frame are unaffected.
    session.draw_rect(&rect(BlendMode::Alpha)).unwrap();
    let report = session.end_frame().unwrap();
    assert_eq!(report.batches, 1);
    assert!(report.is_complete());

    session.register_content(loading, mock.mock_bind_group());
    session.begin_frame(&FrameGlobals::default()).unwrap();
    session.draw(&Sprite::new(loading, Vec2::ONE)).unwrap();
    assert_eq!(session.end_frame().unwrap().draw_calls, 1);
}

#[test]
fn test_untextured_sprite_uses_fallback() {
    let (mock, mut session) = setup();

    session.begin_frame(&FrameGlobals::default()).unwrap();
    session
        .draw(&Sprite::new(ContentHandle::NONE, Vec2::ONE))
        .unwrap();
    session.end_frame().unwrap();

    assert_eq!(mock.draws()[0].content_id, None);
    assert_eq!(mock.draw_instance_counts(), vec![1]);
}

#[test]
fn test_buffer_failure_skips_only_that_batch() {
    let (mock, mut session) = setup();
    // Attempt 0 is the globals uniform, batches follow in order.
    mock.fail_buffer_creation(2);

    session.begin_frame(&FrameGlobals::default()).unwrap();
    for (blend, count) in [
        (BlendMode::Alpha, 1),
        (BlendMode::Additive, 2),
        (BlendMode::Multiply, 3),
    ] {
        for _ in 0..count {
            session.draw_rect(&rect(blend)).unwrap();
        }
    }
    let report = session.end_frame().unwrap();

    assert_eq!(report.batches, 3);
    assert_eq!(report.draw_calls, 2);
    assert_eq!(report.instances, 4);
    assert_eq!(report.failures.len(), 1);

    let failure = &report.failures[0];
    assert_eq!(failure.batch_index, 1);
    assert_eq!(failure.instance_count, 2);
    assert_eq!(failure.signature.blend, BlendMode::Additive);
    assert_eq!(failure.error.resource, ResourceKind::InstanceBuffer);
    assert_eq!(failure.error.source, GpuError::OutOfMemory);

    assert_eq!(mock.draw_instance_counts(), vec![1, 3]);
    assert_eq!(mock.count_submits(), 1);
    assert_eq!(session.state(), SessionState::Idle);
}

#[test]
fn test_pipeline_failure_is_retried_next_frame() {
    let (mock, mut session) = setup();
    mock.fail_pipeline_creation(1);

    let frame = |session: &mut FrameSession| {
        session.begin_frame(&FrameGlobals::default()).unwrap();
        session.draw_rect(&rect(BlendMode::Alpha)).unwrap();
        session.draw_rect(&rect(BlendMode::Opaque)).unwrap();
        session.end_frame().unwrap()
    };

    let report = frame(&mut session);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].batch_index, 1);
    assert_eq!(report.failures[0].error.resource, ResourceKind::Pipeline);
    assert_eq!(session.pool().pipeline_count(), 1);

    let report = frame(&mut session);
    assert!(report.is_complete());
    assert_eq!(report.draw_calls, 2);
    assert_eq!(session.pool().pipeline_count(), 2);
}

#[test]
fn test_globals_failure_degrades_frame() {
    let (mock, mut session) = setup();
    mock.fail_buffer_creation(0);

    session.begin_frame(&FrameGlobals::default()).unwrap();
    session.draw_rect(&rect(BlendMode::Alpha)).unwrap();
    let report = session.end_frame().unwrap();

    let degraded = report.degraded.as_ref().unwrap();
    assert_eq!(degraded.resource, ResourceKind::UniformBuffer);
    assert_eq!(report.batches, 1);
    assert_eq!(report.draw_calls, 0);
    assert_eq!(mock.count_draws(), 0);
    assert_eq!(mock.count_submits(), 1);

    // Globals are created on the next frame.
    session.begin_frame(&FrameGlobals::default()).unwrap();
    session.draw_rect(&rect(BlendMode::Alpha)).unwrap();
    let report = session.end_frame().unwrap();
    assert!(report.is_complete());
    assert_eq!(mock.count_draws(), 1);
}

#[test]
fn test_globals_binding_failure_degrades_frame() {
    let (mock, mut session) = setup();
    mock.fail_binding_creation(0);

    session.begin_frame(&FrameGlobals::default()).unwrap();
    let report = session.end_frame().unwrap();
    assert_eq!(
        report.degraded.map(|err| err.resource),
        Some(ResourceKind::UniformBinding)
    );

    session.begin_frame(&FrameGlobals::default()).unwrap();
    assert!(session.end_frame().unwrap().degraded.is_none());
}

#[test]
fn test_second_frame_reuses_everything() {
    let (mock, mut session) = setup();
    let texture = register_texture(&mock, &mut session, 1);

    let frame = |session: &mut FrameSession| {
        session.begin_frame(&FrameGlobals::orthographic(800.0, 600.0)).unwrap();
        session.draw(&Sprite::new(texture, Vec2::ONE)).unwrap();
        session.draw_rect(&rect(BlendMode::Alpha)).unwrap();
        session.draw(&Sprite::new(texture, Vec2::ONE)).unwrap();
        session.end_frame().unwrap()
    };

    frame(&mut session);
    let batches_created = session.router().batches_created();
    assert_eq!(batches_created, 3);
    assert_eq!(session.pool().stats().buffers_created, 3);
    assert_eq!(session.pool().free_buffer_count(), 3);

    mock.clear_calls();
    let report = frame(&mut session);

    assert!(report.is_complete());
    assert_eq!(mock.count_buffer_creates(), 0);
    assert_eq!(mock.count_render_pipeline_creates(), 0);
    assert_eq!(mock.count_draws(), 3);
    assert_eq!(session.router().batches_created(), batches_created);
    assert_eq!(session.pool().free_buffer_count(), 3);
}

#[test]
fn test_sessions_can_share_a_warm_pool() {
    let (mock, mut session) = setup();
    session.begin_frame(&FrameGlobals::default()).unwrap();
    session.draw_rect(&rect(BlendMode::Alpha)).unwrap();
    session.end_frame().unwrap();

    let pool = session.into_pool();
    let mut session = FrameSession::with_pool(mock.clone(), pool, FrameSessionDescriptor::default());
    mock.clear_calls();

    session.begin_frame(&FrameGlobals::default()).unwrap();
    session.draw_rect(&rect(BlendMode::Alpha)).unwrap();
    session.end_frame().unwrap();

    // Only the new session's globals buffer is created.
    assert_eq!(mock.count_buffer_creates(), 1);
    assert_eq!(mock.count_render_pipeline_creates(), 0);
}

#[test]
fn test_every_draw_uploads_its_staging_prefix() {
    let (mock, mut session) = setup();

    session.begin_frame(&FrameGlobals::default()).unwrap();
    for _ in 0..3 {
        session.draw_rect(&rect(BlendMode::Alpha)).unwrap();
    }
    session.end_frame().unwrap();

    let stride = RectInstance::DESCRIPTOR.stride as usize;
    let writes: Vec<usize> = mock
        .calls()
        .iter()
        .filter_map(|call| match call {
            astrelis_test_utils::RenderCall::WriteBuffer { size, .. } => Some(*size),
            _ => None,
        })
        .collect();
    // Globals upload, then one instance upload.
    assert_eq!(writes, vec![64, 3 * stride]);
}

#[test]
fn test_content_dropped_mid_frame_is_reported() {
    let (mock, mut session) = setup();
    let texture = register_texture(&mock, &mut session, 5);

    session.begin_frame(&FrameGlobals::default()).unwrap();
    session.draw(&Sprite::new(texture, Vec2::ONE)).unwrap();
    session.draw_rect(&rect(BlendMode::Alpha)).unwrap();
    session.unregister_content(texture);
    let report = session.end_frame().unwrap();

    assert!(!report.is_complete());
    assert_eq!(report.draw_calls, 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].batch_index, 0);
    assert_eq!(report.failures[0].error.resource, ResourceKind::ContentBinding);
    assert_eq!(mock.draws().len(), 1);
    assert_eq!(mock.draws()[0].content_id, None);

    session.register_content(texture, mock.mock_bind_group());
    session.begin_frame(&FrameGlobals::default()).unwrap();
    session.draw(&Sprite::new(texture, Vec2::ONE)).unwrap();
    session.mark_content_pending(texture);
    let report = session.end_frame().unwrap();

    assert_eq!(report.draw_calls, 0);
    assert_eq!(report.failures[0].error.resource, ResourceKind::ContentBinding);
}

/// A user layout that reuses the rect layout's id.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Marker {
    position: [f32; 2],
}

impl InstanceLayout for Marker {
    const DESCRIPTOR: LayoutDescriptor = LayoutDescriptor {
        id: RectInstance::LAYOUT,
        label: "marker",
        stride: layout::stride_of::<Marker>(),
        capacity: 64,
        attributes: &[],
        shader_source: "",
        vertices_per_instance: QUAD_VERTEX_COUNT,
        textured: false,
    };
}

/// A user layout that asks for zero-sized batches.
#[repr(C)]
#[derive(Debug, Clone, Copy, bytemuck::Pod, bytemuck::Zeroable)]
struct Dot {
    position: [f32; 2],
}

impl InstanceLayout for Dot {
    const DESCRIPTOR: LayoutDescriptor = LayoutDescriptor {
        id: LayoutId(40),
        label: "dot",
        stride: layout::stride_of::<Dot>(),
        capacity: 0,
        attributes: &[],
        shader_source: "",
        vertices_per_instance: QUAD_VERTEX_COUNT,
        textured: false,
    };
}

#[test]
fn test_conflicting_layout_id_is_rejected() {
    let (mock, mut session) = setup();
    let marker_sig = ResourceSignature::of::<Marker>(ContentHandle::NONE, BlendMode::Alpha);

    session.begin_frame(&FrameGlobals::default()).unwrap();
    session.draw_rect(&rect(BlendMode::Alpha)).unwrap();
    let err = session
        .append(marker_sig, &Marker { position: [1.0, 2.0] })
        .unwrap_err();
    assert_eq!(
        err,
        AppendError::InvalidSignature(InvalidSignature {
            handle: ContentHandle::NONE,
            reason: InvalidSignatureReason::LayoutConflict {
                layout: RectInstance::LAYOUT,
            },
        })
    );
    assert_eq!(session.router().batches()[0].instance_count(), 1);

    let report = session.end_frame().unwrap();
    assert!(report.is_complete());
    assert_eq!(mock.draw_instance_counts(), vec![1]);
}

#[test]
fn test_zero_capacity_layout_still_batches() {
    let (mock, mut session) = setup();
    let dot_sig = ResourceSignature::of::<Dot>(ContentHandle::NONE, BlendMode::Alpha);

    session.begin_frame(&FrameGlobals::default()).unwrap();
    for _ in 0..2 {
        session.append(dot_sig, &Dot { position: [0.0; 2] }).unwrap();
    }
    let report = session.end_frame().unwrap();

    assert_eq!(report.batches, 2);
    assert_eq!(mock.draw_instance_counts(), vec![1, 1]);
}

#[test]
fn test_idle_batches_evicted_with_pool_buffers() {
    let mock = Arc::new(MockRenderContext::new());
    let mut session = FrameSession::new(
        mock.clone(),
        FrameSessionDescriptor {
            pool: PoolDescriptor {
                idle_eviction_frames: Some(1),
            },
            ..Default::default()
        },
    );
    let texture = register_texture(&mock, &mut session, 5);

    session.begin_frame(&FrameGlobals::default()).unwrap();
    session.draw(&Sprite::new(texture, Vec2::ONE)).unwrap();
    session.end_frame().unwrap();
    assert_eq!(session.router().idle_count(), 1);

    for expected_idle in [2, 1] {
        session.begin_frame(&FrameGlobals::default()).unwrap();
        session.draw_rect(&rect(BlendMode::Alpha)).unwrap();
        session.end_frame().unwrap();
        assert_eq!(session.router().idle_count(), expected_idle);
    }
}
