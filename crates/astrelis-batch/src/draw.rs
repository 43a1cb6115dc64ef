//! High-level draw helpers that pack sprites, rounded rectangles and text
//! into instance records and route them through [`FrameSession::append`].

use astrelis_core::alloc::HashMap;
use glam::Vec2;

use crate::color::Color;
use crate::error::AppendError;
use crate::instances::{GlyphInstance, RectInstance, SpriteInstance};
use crate::session::{FrameSession, SessionState};
use crate::signature::{BlendMode, ContentHandle, ResourceSignature};

/// A textured quad.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Sprite {
    pub content: ContentHandle,
    /// Top-left corner.
    pub position: Vec2,
    pub size: Vec2,
    pub uv_min: Vec2,
    pub uv_max: Vec2,
    pub tint: Color,
    /// Rotation around the center, in radians.
    pub rotation: f32,
    pub blend: BlendMode,
}

impl Sprite {
    /// A sprite showing the whole of `content` at the origin.
    pub fn new(content: ContentHandle, size: Vec2) -> Self {
        Self {
            content,
            position: Vec2::ZERO,
            size,
            uv_min: Vec2::ZERO,
            uv_max: Vec2::ONE,
            tint: Color::WHITE,
            rotation: 0.0,
            blend: BlendMode::Alpha,
        }
    }

    pub fn with_position(mut self, position: Vec2) -> Self {
        self.position = position;
        self
    }

    /// Show only the `uv_min..uv_max` region of the texture.
    pub fn with_uv(mut self, uv_min: Vec2, uv_max: Vec2) -> Self {
        self.uv_min = uv_min;
        self.uv_max = uv_max;
        self
    }

    pub fn with_tint(mut self, tint: Color) -> Self {
        self.tint = tint;
        self
    }

    pub fn with_rotation(mut self, rotation: f32) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }

    pub fn signature(&self) -> ResourceSignature {
        ResourceSignature::of::<SpriteInstance>(self.content, self.blend)
    }

    fn instance_at(&self, position: Vec2) -> SpriteInstance {
        SpriteInstance {
            position: position.to_array(),
            size: self.size.to_array(),
            uv_min: self.uv_min.to_array(),
            uv_max: self.uv_max.to_array(),
            color: self.tint.to_array(),
            rotation: self.rotation,
            _padding: [0.0; 3],
        }
    }
}

/// A filled rectangle with optional rounded corners and border.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RoundedRect {
    pub position: Vec2,
    pub size: Vec2,
    pub fill: Color,
    /// Radii as `[top_left, top_right, bottom_right, bottom_left]`.
    pub corner_radii: [f32; 4],
    pub border_thickness: f32,
    pub border_color: Color,
    pub blend: BlendMode,
}

impl RoundedRect {
    pub fn new(position: Vec2, size: Vec2, fill: Color) -> Self {
        Self {
            position,
            size,
            fill,
            corner_radii: [0.0; 4],
            border_thickness: 0.0,
            border_color: Color::TRANSPARENT,
            blend: BlendMode::Alpha,
        }
    }

    /// Same radius on every corner.
    pub fn with_radius(mut self, radius: f32) -> Self {
        self.corner_radii = [radius; 4];
        self
    }

    pub fn with_corner_radii(mut self, corner_radii: [f32; 4]) -> Self {
        self.corner_radii = corner_radii;
        self
    }

    pub fn with_border(mut self, thickness: f32, color: Color) -> Self {
        self.border_thickness = thickness;
        self.border_color = color;
        self
    }

    pub fn with_blend(mut self, blend: BlendMode) -> Self {
        self.blend = blend;
        self
    }

    pub fn signature(&self) -> ResourceSignature {
        ResourceSignature::of::<RectInstance>(ContentHandle::NONE, self.blend)
    }

    fn instance(&self) -> RectInstance {
        RectInstance {
            position: self.position.to_array(),
            size: self.size.to_array(),
            color: self.fill.to_array(),
            corner_radii: self.corner_radii,
            border_color: self.border_color.to_array(),
            border_thickness: self.border_thickness,
            _padding: [0.0; 3],
        }
    }
}

/// Placement of one glyph inside an atlas texture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GlyphMetrics {
    pub uv_min: Vec2,
    pub uv_max: Vec2,
    /// Quad size in pixels. Zero-sized glyphs (spaces) only advance the pen.
    pub size: Vec2,
    /// Offset from the pen position (top of the line) to the quad's top-left.
    pub bearing: Vec2,
    /// Horizontal pen advance after this glyph.
    pub advance: f32,
}

/// Pre-rasterized glyphs packed into one texture.
#[derive(Debug, Clone)]
pub struct GlyphAtlas {
    content: ContentHandle,
    line_height: f32,
    glyphs: HashMap<char, GlyphMetrics>,
}

impl GlyphAtlas {
    pub fn new(content: ContentHandle, line_height: f32) -> Self {
        Self {
            content,
            line_height,
            glyphs: HashMap::new(),
        }
    }

    pub fn insert(&mut self, ch: char, metrics: GlyphMetrics) {
        self.glyphs.insert(ch, metrics);
    }

    pub fn with_glyph(mut self, ch: char, metrics: GlyphMetrics) -> Self {
        self.insert(ch, metrics);
        self
    }

    pub fn get(&self, ch: char) -> Option<&GlyphMetrics> {
        self.glyphs.get(&ch)
    }

    pub fn content(&self) -> ContentHandle {
        self.content
    }

    pub fn line_height(&self) -> f32 {
        self.line_height
    }

    pub fn len(&self) -> usize {
        self.glyphs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.glyphs.is_empty()
    }
}

impl FrameSession {
    /// Draw a sprite at its own position.
    pub fn draw(&mut self, sprite: &Sprite) -> Result<(), AppendError> {
        self.draw_on_position(sprite, sprite.position)
    }

    /// Draw a sprite with its top-left corner at `position`.
    pub fn draw_on_position(&mut self, sprite: &Sprite, position: Vec2) -> Result<(), AppendError> {
        self.append(sprite.signature(), &sprite.instance_at(position))
    }

    pub fn draw_rect(&mut self, rect: &RoundedRect) -> Result<(), AppendError> {
        self.append(rect.signature(), &rect.instance())
    }

    /// Lay out `text` left to right starting at `origin` (top-left of the
    /// first line) and queue one glyph quad per visible character.
    ///
    /// `\n` starts a new line. Characters missing from the atlas are skipped
    /// without advancing the pen. Returns the number of quads queued.
    pub fn draw_string(
        &mut self,
        atlas: &GlyphAtlas,
        text: &str,
        origin: Vec2,
        color: Color,
    ) -> Result<usize, AppendError> {
        self.expect_state("draw_string", SessionState::Recording)?;
        self.content().validate(atlas.content, true)?;

        let signature = ResourceSignature::of::<GlyphInstance>(atlas.content, BlendMode::Alpha);
        let color = color.to_array();
        let mut pen = origin;
        let mut count = 0;

        for ch in text.chars() {
            if ch == '\n' {
                pen = Vec2::new(origin.x, pen.y + atlas.line_height);
                continue;
            }
            let Some(glyph) = atlas.get(ch) else {
                continue;
            };

            if glyph.size.x > 0.0 && glyph.size.y > 0.0 {
                let instance = GlyphInstance {
                    position: (pen + glyph.bearing).to_array(),
                    size: glyph.size.to_array(),
                    uv_min: glyph.uv_min.to_array(),
                    uv_max: glyph.uv_max.to_array(),
                    color,
                };
                self.append(signature, &instance)?;
                count += 1;
            }
            pen.x += glyph.advance;
        }

        Ok(count)
    }
}
