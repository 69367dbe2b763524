use std::f32::consts::TAU;

use glam::Vec3;
use serde::{Deserialize, Serialize};

use crate::{ParameterUpdate, RingConfig};

/// Colour in hue/saturation/lightness, each component in `[0, 1]`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Hsl {
    pub h: f32,
    pub s: f32,
    pub l: f32,
}

impl Hsl {
    pub const fn new(h: f32, s: f32, l: f32) -> Self {
        Self { h, s, l }
    }

    /// Converts to RGB components in `[0, 1]`. Hue wraps around.
    pub fn to_rgb(self) -> [f32; 3] {
        let h = self.h.rem_euclid(1.0);
        let s = self.s.clamp(0.0, 1.0);
        let l = self.l.clamp(0.0, 1.0);

        if s == 0.0 {
            return [l, l, l];
        }

        let hi = if l <= 0.5 { l * (1.0 + s) } else { l + s - l * s };
        let lo = 2.0 * l - hi;

        [
            hue_channel(lo, hi, h + 1.0 / 3.0),
            hue_channel(lo, hi, h),
            hue_channel(lo, hi, h - 1.0 / 3.0),
        ]
    }
}

fn hue_channel(lo: f32, hi: f32, mut t: f32) -> f32 {
    if t < 0.0 {
        t += 1.0;
    }
    if t > 1.0 {
        t -= 1.0;
    }
    if t < 1.0 / 6.0 {
        lo + (hi - lo) * 6.0 * t
    } else if t < 0.5 {
        hi
    } else if t < 2.0 / 3.0 {
        lo + (hi - lo) * 6.0 * (2.0 / 3.0 - t)
    } else {
        lo
    }
}

/// One bar of the ring as handed to the renderer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VisualElement {
    pub position: Vec3,
    /// Width, height and depth; the height is the audio-driven axis.
    pub scale: Vec3,
    pub color: Hsl,
}

impl VisualElement {
    pub fn height(&self) -> f32 {
        self.scale.y
    }
}

/// Fixed arena of ring elements, created once and updated in place.
#[derive(Debug, Clone)]
pub struct RingScene {
    elements: Vec<VisualElement>,
}

impl RingScene {
    /// Lays the elements out evenly on the circle, resting on `y = 0`.
    pub fn new(config: &RingConfig) -> Self {
        let count = config.element_count;
        let elements = (0..count)
            .map(|i| {
                let fraction = i as f32 / count as f32;
                let angle = fraction * TAU;
                VisualElement {
                    position: Vec3::new(angle.cos() * config.radius, 0.0, angle.sin() * config.radius),
                    scale: Vec3::new(config.element_width, 1.0, config.element_depth),
                    color: Hsl::new(fraction, 1.0, 0.5),
                }
            })
            .collect();

        Self { elements }
    }

    pub fn elements(&self) -> &[VisualElement] {
        &self.elements
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Writes each update into its element; unknown indices are ignored.
    pub fn apply_updates(&mut self, updates: &[ParameterUpdate]) {
        for update in updates {
            if let Some(element) = self.elements.get_mut(update.index) {
                element.position = update.position;
                element.scale.y = update.height;
                element.color = update.color;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn close(a: [f32; 3], b: [f32; 3]) -> bool {
        a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-5)
    }

    #[test]
    fn hsl_primaries() {
        assert!(close(Hsl::new(0.0, 1.0, 0.5).to_rgb(), [1.0, 0.0, 0.0]));
        assert!(close(Hsl::new(1.0 / 3.0, 1.0, 0.5).to_rgb(), [0.0, 1.0, 0.0]));
        assert!(close(Hsl::new(2.0 / 3.0, 1.0, 0.5).to_rgb(), [0.0, 0.0, 1.0]));
        assert!(close(Hsl::new(0.4, 0.0, 0.3).to_rgb(), [0.3, 0.3, 0.3]));
        assert!(close(Hsl::new(1.0, 1.0, 0.5).to_rgb(), [1.0, 0.0, 0.0]));
    }

    #[test]
    fn ring_starts_on_the_circle() {
        let config = RingConfig {
            element_count: 4,
            ..RingConfig::default()
        };
        let scene = RingScene::new(&config);
        assert_eq!(scene.len(), 4);

        let first = scene.elements()[0];
        assert!((first.position - Vec3::new(5.0, 0.0, 0.0)).length() < 1e-5);
        let second = scene.elements()[1];
        assert!((second.position - Vec3::new(0.0, 0.0, 5.0)).length() < 1e-5);
        assert_eq!(second.color, Hsl::new(0.25, 1.0, 0.5));
        assert_eq!(second.scale, Vec3::new(0.1, 1.0, 0.1));
    }

    #[test]
    fn updates_write_in_place() {
        let mut scene = RingScene::new(&RingConfig {
            element_count: 2,
            ..RingConfig::default()
        });
        let update = ParameterUpdate {
            index: 1,
            bin_index: 0,
            value: 1.0,
            height: 8.1,
            position: Vec3::new(-5.0, 4.05, 0.0),
            color: Hsl::new(0.5, 1.0, 0.8),
        };
        let stray = ParameterUpdate { index: 9, ..update };
        scene.apply_updates(&[update, stray]);

        let element = scene.elements()[1];
        assert_eq!(element.height(), 8.1);
        assert_eq!(element.position, update.position);
        assert_eq!(element.color.l, 0.8);
        assert_eq!(element.scale.x, 0.1);
    }
}
