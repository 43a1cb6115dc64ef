//! Renders a few frames of rects, sprites and text into an offscreen texture
//! and logs what each frame cost.
//!
//! Run with: `cargo run -p astrelis-batch --example offscreen_frames`
//!
//! With the default `profiling` feature, connect `puffin_viewer` to
//! `127.0.0.1:8585` to inspect the frame scopes.

use astrelis_batch::*;
use astrelis_core::logging;
use astrelis_core::profiling::{ProfilingBackend, init_profiling, new_frame};
use glam::Vec2;

const SIZE: u32 = 512;

fn main() {
    logging::init();
    init_profiling(ProfilingBackend::PuffinHttp);

    let context = match GraphicsContext::new_owned_sync() {
        Ok(context) => context,
        Err(err) => {
            tracing::error!("Cannot run example: {}", err);
            return;
        }
    };

    let target = context.device.create_texture(&wgpu::TextureDescriptor {
        label: Some("offscreen_target"),
        size: wgpu::Extent3d {
            width: SIZE,
            height: SIZE,
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format: context.target_format(),
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
        view_formats: &[],
    });
    context.set_target(
        target.create_view(&wgpu::TextureViewDescriptor::default()),
        Some(Color::from_hex(0x202028).to_wgpu()),
    );

    // A one-glyph "font" that reuses the fallback texture.
    let atlas = GlyphAtlas::new(ContentHandle::NONE, 18.0).with_glyph(
        '#',
        GlyphMetrics {
            uv_min: Vec2::ZERO,
            uv_max: Vec2::ONE,
            size: Vec2::new(8.0, 14.0),
            bearing: Vec2::new(0.0, 2.0),
            advance: 10.0,
        },
    );

    let mut session = FrameSession::new(
        context.clone(),
        FrameSessionDescriptor {
            label: "offscreen",
            ..Default::default()
        },
    );

    for frame in 0..5 {
        new_frame();
        if let Err(err) = render_frame(&mut session, &atlas, frame as f32) {
            tracing::error!("Frame {} failed: {}", frame, err);
        }
    }

    let stats = session.pool().stats();
    tracing::info!(
        "Done: {} pipelines, {} instance buffers, {} batches allocated",
        stats.pipelines_created,
        stats.buffers_created,
        session.router().batches_created()
    );
}

fn render_frame(
    session: &mut FrameSession,
    atlas: &GlyphAtlas,
    t: f32,
) -> Result<(), Box<dyn std::error::Error>> {
    session.begin_frame(&FrameGlobals::orthographic(SIZE as f32, SIZE as f32))?;

    for row in 0..16 {
        for col in 0..16 {
            let position = Vec2::new(col as f32 * 32.0, row as f32 * 32.0);
            let fill = Color::rgb(col as f32 / 16.0, row as f32 / 16.0, 0.5);
            session.draw_rect(
                &RoundedRect::new(position + Vec2::splat(2.0), Vec2::splat(28.0), fill)
                    .with_radius(6.0)
                    .with_border(1.0, Color::WHITE),
            )?;
        }
    }

    let marker = Sprite::new(ContentHandle::NONE, Vec2::splat(24.0))
        .with_tint(Color::rgba(1.0, 0.8, 0.2, 0.8))
        .with_rotation(t * 0.3)
        .with_blend(BlendMode::Additive);
    for i in 0..8 {
        session.draw_on_position(&marker, Vec2::new(40.0 + i as f32 * 56.0, 240.0))?;
    }

    session.draw_string(atlas, "####\n##", Vec2::new(16.0, 16.0), Color::WHITE)?;

    let report = session.end_frame()?;
    tracing::info!(
        "Frame {}: {} batches, {} draw calls, {} instances",
        report.frame_index,
        report.batches,
        report.draw_calls,
        report.instances
    );
    for failure in &report.failures {
        tracing::warn!("{}", failure);
    }
    Ok(())
}
