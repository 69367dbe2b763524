//! Deterministic mapping from a frequency snapshot of any length to the fixed
//! set of ring parameters.
//!
//! Element `i` of `N` reads bin `min(i * floor(L / N), L - 1)`. The resulting
//! magnitude drives the element's height and lightness; its angle and hue
//! depend on the index alone.

use std::f32::consts::TAU;

use glam::Vec3;

use crate::{FrequencySnapshot, Hsl, RingConfig};

const BASE_LIGHTNESS: f32 = 0.3;
const LIGHTNESS_RANGE: f32 = 0.5;
const SATURATION: f32 = 1.0;

/// Fixed geometry the mapper lays the ring out with.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RingLayout {
    pub element_count: usize,
    pub radius: f32,
    pub min_height: f32,
    pub max_height_delta: f32,
}

impl From<&RingConfig> for RingLayout {
    fn from(config: &RingConfig) -> Self {
        Self {
            element_count: config.element_count,
            radius: config.radius,
            min_height: config.min_height,
            max_height_delta: config.max_height_delta,
        }
    }
}

impl Default for RingLayout {
    fn default() -> Self {
        Self::from(&RingConfig::default())
    }
}

/// Visual parameters computed for a single element in one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterUpdate {
    pub index: usize,
    /// Snapshot bin the value was read from.
    pub bin_index: usize,
    /// Normalised magnitude in `[0, 1]`.
    pub value: f32,
    pub height: f32,
    pub position: Vec3,
    pub color: Hsl,
}

/// Distance between sampled bins: `floor(len / count)`.
pub fn resample_step(len: usize, count: usize) -> usize {
    if count == 0 {
        0
    } else {
        len / count
    }
}

/// Bin indices read for each of `count` elements from a snapshot of `len`
/// bins. Empty when either is zero.
pub fn resample_indices(len: usize, count: usize) -> impl Iterator<Item = usize> {
    let step = resample_step(len, count);
    let last = len.saturating_sub(1);
    let count = if len == 0 { 0 } else { count };
    (0..count).map(move |i| i.saturating_mul(step).min(last))
}

/// Computes the parameters of element `index` for normalised `value`.
pub fn map_element(index: usize, bin_index: usize, value: f32, layout: &RingLayout) -> ParameterUpdate {
    let fraction = index as f32 / layout.element_count as f32;
    let angle = fraction * TAU;
    let height = layout.min_height + value * layout.max_height_delta;

    ParameterUpdate {
        index,
        bin_index,
        value,
        height,
        position: Vec3::new(
            angle.cos() * layout.radius,
            height / 2.0,
            angle.sin() * layout.radius,
        ),
        color: Hsl::new(fraction, SATURATION, BASE_LIGHTNESS + value * LIGHTNESS_RANGE),
    }
}

/// Maps `bins` onto `layout`, replacing the contents of `out`.
///
/// An empty snapshot or a zero element count leaves `out` empty so the
/// previously rendered frame stays as it was.
pub fn map_frequencies(
    bins: &[u8],
    max_magnitude: u8,
    layout: &RingLayout,
    out: &mut Vec<ParameterUpdate>,
) {
    out.clear();
    if bins.is_empty() || layout.element_count == 0 || max_magnitude == 0 {
        return;
    }

    let max = max_magnitude as f32;
    out.extend(
        resample_indices(bins.len(), layout.element_count)
            .enumerate()
            .map(|(i, bin)| map_element(i, bin, bins[bin] as f32 / max, layout)),
    );
}

/// Holds the per-frame update buffer so mapping does not allocate once warm.
#[derive(Debug, Clone)]
pub struct ParameterMapper {
    layout: RingLayout,
    updates: Vec<ParameterUpdate>,
}

impl ParameterMapper {
    pub fn new(layout: RingLayout) -> Self {
        Self {
            layout,
            updates: Vec::with_capacity(layout.element_count),
        }
    }

    /// Updates produced by the last [`evaluate`](Self::evaluate).
    pub fn updates(&self) -> &[ParameterUpdate] {
        &self.updates
    }

    pub fn evaluate(&mut self, snapshot: &FrequencySnapshot) -> &[ParameterUpdate] {
        map_frequencies(
            snapshot.as_slice(),
            snapshot.max_magnitude(),
            &self.layout,
            &mut self.updates,
        );
        &self.updates
    }
}
