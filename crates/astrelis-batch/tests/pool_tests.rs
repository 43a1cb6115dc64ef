//! Resource pool behavior across frames.

use std::sync::Arc;

use astrelis_batch::*;
use astrelis_test_utils::MockRenderContext;
use glam::Vec2;

fn session_with(pool: PoolDescriptor) -> (Arc<MockRenderContext>, FrameSession) {
    let mock = Arc::new(MockRenderContext::new());
    let session = FrameSession::new(
        mock.clone(),
        FrameSessionDescriptor {
            label: "pool_tests",
            pool,
            ..Default::default()
        },
    );
    (mock, session)
}

fn draw_rects(session: &mut FrameSession, blends: &[BlendMode]) -> FrameReport {
    session.begin_frame(&FrameGlobals::default()).unwrap();
    for &blend in blends {
        session
            .draw_rect(&RoundedRect::new(Vec2::ZERO, Vec2::ONE, Color::WHITE).with_blend(blend))
            .unwrap();
    }
    session.end_frame().unwrap()
}

#[test]
fn test_free_count_matches_buffers_borrowed() {
    let (_mock, mut session) = session_with(PoolDescriptor::default());

    draw_rects(
        &mut session,
        &[BlendMode::Alpha, BlendMode::Additive, BlendMode::Opaque, BlendMode::Alpha],
    );

    let stats = session.pool().stats();
    assert_eq!(stats.buffers_created, 4);
    assert_eq!(stats.free_buffers, 4);
    assert_eq!(stats.in_flight_buffers, 0);
    assert_eq!(stats.borrowed_buffers, 0);
    assert_eq!(stats.pipelines_created, 3);
}

#[test]
fn test_no_buffer_shared_within_a_frame() {
    let (mock, mut session) = session_with(PoolDescriptor::default());

    draw_rects(&mut session, &[BlendMode::Alpha, BlendMode::Additive, BlendMode::Alpha]);
    let first: Vec<usize> = mock.draws().iter().map(|draw| draw.buffer_id).collect();
    assert_eq!(first.len(), 3);
    assert!(first[0] != first[1] && first[1] != first[2] && first[0] != first[2]);

    mock.clear_calls();
    draw_rects(&mut session, &[BlendMode::Alpha, BlendMode::Additive, BlendMode::Alpha]);
    let mut second: Vec<usize> = mock.draws().iter().map(|draw| draw.buffer_id).collect();

    // Same buffers, possibly handed out in a different order.
    let mut first = first;
    first.sort_unstable();
    second.sort_unstable();
    assert_eq!(first, second);
}

#[test]
fn test_pool_grows_to_peak_and_stays() {
    let (mock, mut session) = session_with(PoolDescriptor::default());

    draw_rects(&mut session, &[BlendMode::Alpha, BlendMode::Additive]);
    draw_rects(
        &mut session,
        &[BlendMode::Alpha, BlendMode::Additive, BlendMode::Alpha, BlendMode::Additive],
    );
    draw_rects(&mut session, &[BlendMode::Alpha]);

    let stats = session.pool().stats();
    assert_eq!(stats.buffers_created, 4);
    assert_eq!(stats.free_buffers, 4);
    assert_eq!(stats.buffers_evicted, 0);
    // Globals buffer plus four instance buffers.
    assert_eq!(mock.count_buffer_creates(), 5);
}

#[test]
fn test_idle_buffers_are_evicted() {
    let (_mock, mut session) = session_with(PoolDescriptor {
        idle_eviction_frames: Some(2),
    });

    draw_rects(&mut session, &[BlendMode::Alpha, BlendMode::Additive]);
    assert_eq!(session.pool().free_buffer_count(), 2);

    // One buffer stays in use, the other goes idle.
    draw_rects(&mut session, &[BlendMode::Alpha]);
    assert_eq!(session.pool().free_buffer_count(), 2);

    draw_rects(&mut session, &[BlendMode::Alpha]);
    let stats = session.pool().stats();
    assert_eq!(stats.free_buffers, 1);
    assert_eq!(stats.buffers_evicted, 1);

    // Pipelines are never evicted.
    assert_eq!(session.pool().pipeline_count(), 2);
}
