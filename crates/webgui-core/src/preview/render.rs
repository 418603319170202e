use thiserror::Error;

use super::capture::CaptureBuffer;
use crate::model::Rect;

/// Glyph advance of the default font at scale 1.
const GLYPH_WIDTH: f64 = 6.0;
/// Line height of the default font at scale 1.
const LINE_HEIGHT: f64 = 9.0;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RenderError {
    #[error("render failed: {0}")]
    Failed(String),

    #[error("missing render context: {0}")]
    MissingContext(&'static str),
}

/// Draw API handed to HUD content for one pass.
///
/// Text draws are recorded into the attached [`CaptureBuffer`]; every other
/// primitive only marks the buffer as holding non-text content.  With no
/// buffer attached nothing is recorded.
pub struct HudRenderer<'a> {
    bounds: Rect,
    frame: u64,
    capture: Option<&'a mut CaptureBuffer>,
    draw_calls: usize,
    size: Option<(i32, i32)>,
}

impl<'a> HudRenderer<'a> {
    pub fn new(bounds: Rect, frame: u64, capture: Option<&'a mut CaptureBuffer>) -> Self {
        Self {
            bounds,
            frame,
            capture,
            draw_calls: 0,
            size: None,
        }
    }

    pub fn bounds(&self) -> Rect {
        self.bounds
    }

    pub fn frame(&self) -> u64 {
        self.frame
    }

    pub fn is_capturing(&self) -> bool {
        self.capture.is_some()
    }

    pub fn draw_calls(&self) -> usize {
        self.draw_calls
    }

    /// Width of `text` at `scale`.
    pub fn text_width(text: &str, scale: f64) -> f64 {
        text.chars().count() as f64 * GLYPH_WIDTH * scale
    }

    pub fn text_height(scale: f64) -> f64 {
        LINE_HEIGHT * scale
    }

    /// Draws text at scale 1 and returns its width.
    pub fn text(&mut self, text: &str, x: f64, y: f64, color: u32, shadow: bool) -> f64 {
        self.text_scaled(text, x, y, color, shadow, 1.0)
    }

    pub fn text_scaled(&mut self, text: &str, x: f64, y: f64, color: u32, shadow: bool, scale: f64) -> f64 {
        self.draw_calls += 1;
        if let Some(buffer) = self.capture.as_deref_mut() {
            buffer.record_text(text, x, y, color, shadow, scale);
        }
        Self::text_width(text, scale)
    }

    pub fn line(&mut self, _x1: f64, _y1: f64, _x2: f64, _y2: f64, _color: u32) {
        self.mark_non_text();
    }

    pub fn quad(&mut self, _x: f64, _y: f64, _width: f64, _height: f64, _color: u32) {
        self.mark_non_text();
    }

    pub fn triangle(&mut self, _points: [(f64, f64); 3], _color: u32) {
        self.mark_non_text();
    }

    pub fn texture(&mut self, _texture: &str, _x: f64, _y: f64, _width: f64, _height: f64) {
        self.mark_non_text();
    }

    pub fn item(&mut self, _item: &str, _x: i32, _y: i32, _scale: f32) {
        self.mark_non_text();
    }

    pub fn entity(&mut self, _entity: &str, _x: i32, _y: i32, _width: i32, _height: i32) {
        self.mark_non_text();
    }

    /// Requests a new element size, applied after the pass.
    pub fn set_size(&mut self, width: i32, height: i32) {
        self.size = Some((width, height));
    }

    pub fn requested_size(&self) -> Option<(i32, i32)> {
        self.size
    }

    fn mark_non_text(&mut self) {
        self.draw_calls += 1;
        if let Some(buffer) = self.capture.as_deref_mut() {
            buffer.mark_non_text();
        }
    }
}
