use std::io::Write;

use crate::{Result, RingConfig, VisualElement};

/// Consumer of the per-frame element state. The renderer owns the draw call
/// and the camera; it only ever sees the elements.
pub trait Renderer {
    fn render(&mut self, elements: &[VisualElement]) -> Result<()>;
}

/// Glyph ramp from resting to full height.
const LEVELS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Renders the ring as one line of bar glyphs per frame.
#[derive(Debug)]
pub struct TextRenderer<W: Write> {
    out: W,
    min_height: f32,
    max_height_delta: f32,
    line: String,
}

impl<W: Write> TextRenderer<W> {
    pub fn new(out: W, ring: &RingConfig) -> Self {
        Self {
            out,
            min_height: ring.min_height,
            max_height_delta: ring.max_height_delta,
            line: String::with_capacity(ring.element_count * 3),
        }
    }

    pub fn into_inner(self) -> W {
        self.out
    }

    fn glyph(&self, height: f32) -> char {
        if self.max_height_delta <= 0.0 {
            return LEVELS[0];
        }
        let level = ((height - self.min_height) / self.max_height_delta).clamp(0.0, 1.0);
        LEVELS[(level * (LEVELS.len() - 1) as f32).round() as usize]
    }
}

impl<W: Write> Renderer for TextRenderer<W> {
    fn render(&mut self, elements: &[VisualElement]) -> Result<()> {
        self.line.clear();
        for element in elements {
            let glyph = self.glyph(element.height());
            self.line.push(glyph);
        }
        writeln!(self.out, "{}", self.line)?;
        Ok(())
    }
}
