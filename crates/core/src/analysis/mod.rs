use std::{
    f32::consts::PI,
    fmt,
    sync::{Arc, OnceLock},
};

use parking_lot::{Mutex, MutexGuard};
use realfft::{num_complex::Complex32, RealFftPlanner, RealToComplex};

use crate::{AnalyzerConfig, Result, SessionId, VisualiserError};

mod history;

use history::SampleHistory;

/// Largest value a byte frequency bin can hold.
pub const MAX_BYTE_MAGNITUDE: u8 = u8::MAX;

/// Spectral analyzer that turns the most recent window of played audio into
/// smoothed per-bin magnitudes.
///
/// Reads are cached: the transform and the temporal smoothing only run when
/// new input arrived since the previous read, so repeated reads within one
/// frame observe the same data.
pub struct AnalyzerNode {
    config: AnalyzerConfig,
    history: SampleHistory,
    window: Vec<f32>,
    smoothed: Vec<f32>,
    decibels: Vec<f32>,
    bytes: Vec<u8>,
    fresh_input: bool,
    input: Option<SessionId>,
    frames_processed: u64,
    fft: FftResources,
}

impl AnalyzerNode {
    pub fn new(config: AnalyzerConfig) -> Result<Self> {
        config.validate()?;

        let size = config.fft_size;
        let bins = config.frequency_bin_count();
        let plan = RealFftPlanner::<f32>::new().plan_fft_forward(size);
        let fft = FftResources {
            size,
            scratch: plan.make_scratch_vec(),
            spectrum: plan.make_output_vec(),
            input: plan.make_input_vec(),
            plan,
        };

        Ok(Self {
            history: SampleHistory::new(size),
            window: blackman_window(size),
            smoothed: vec![0.0; bins],
            decibels: vec![f32::NEG_INFINITY; bins],
            bytes: vec![0; bins],
            fresh_input: false,
            input: None,
            frames_processed: 0,
            fft,
            config,
        })
    }

    pub fn config(&self) -> &AnalyzerConfig {
        &self.config
    }

    pub fn fft_size(&self) -> usize {
        self.config.fft_size
    }

    pub fn frequency_bin_count(&self) -> usize {
        self.config.frequency_bin_count()
    }

    /// Total number of input frames (including silence) seen so far.
    pub fn frames_processed(&self) -> u64 {
        self.frames_processed
    }

    /// Session currently feeding the analyzer, if any.
    pub fn connected_session(&self) -> Option<SessionId> {
        self.input
    }

    /// Routes `session` into the analyzer, replacing any previous input.
    pub fn connect(&mut self, session: SessionId) {
        if let Some(previous) = self.input.replace(session) {
            if previous != session {
                tracing::debug!(%previous, %session, "analyzer input replaced");
            }
        }
    }

    /// Detaches `session`. Returns `false` when it was not the connected input.
    pub fn disconnect(&mut self, session: SessionId) -> bool {
        if self.input == Some(session) {
            self.input = None;
            true
        } else {
            false
        }
    }

    /// Feeds a block of mono samples that was just played.
    pub fn push_samples(&mut self, samples: &[f32]) {
        if samples.is_empty() {
            return;
        }
        self.history.extend(samples);
        self.frames_processed += samples.len() as u64;
        self.fresh_input = true;
    }

    /// Feeds `frames` samples of silence, as happens while nothing plays.
    pub fn push_silence(&mut self, frames: usize) {
        if frames == 0 {
            return;
        }
        self.history.extend_silence(frames);
        self.frames_processed += frames as u64;
        self.fresh_input = true;
    }

    /// Copies the current byte magnitudes (`0..=255`) into `out`.
    ///
    /// Only `min(out.len(), bin count)` entries are written.
    pub fn get_byte_frequency_data(&mut self, out: &mut [u8]) -> Result<()> {
        self.refresh()?;
        let n = out.len().min(self.bytes.len());
        out[..n].copy_from_slice(&self.bytes[..n]);
        Ok(())
    }

    /// Copies the current magnitudes in decibels into `out`.
    pub fn get_float_frequency_data(&mut self, out: &mut [f32]) -> Result<()> {
        self.refresh()?;
        let n = out.len().min(self.decibels.len());
        out[..n].copy_from_slice(&self.decibels[..n]);
        Ok(())
    }

    fn refresh(&mut self) -> Result<()> {
        if !self.fresh_input {
            return Ok(());
        }

        let fft = &mut self.fft;
        self.history.copy_into(&mut fft.input);
        for (sample, weight) in fft.input.iter_mut().zip(&self.window) {
            *sample *= weight;
        }

        fft.plan
            .process_with_scratch(&mut fft.input, &mut fft.spectrum, &mut fft.scratch)
            .map_err(|e| VisualiserError::Analyzer(e.to_string()))?;

        let tau = self.config.smoothing;
        let scale = 1.0 / fft.size as f32;
        let min_db = self.config.min_decibels;
        let range_scale = MAX_BYTE_MAGNITUDE as f32 / (self.config.max_decibels - min_db);

        for (k, bin) in fft.spectrum.iter().take(self.smoothed.len()).enumerate() {
            let magnitude = bin.norm() * scale;
            let mut value = tau * self.smoothed[k] + (1.0 - tau) * magnitude;
            if !value.is_finite() {
                value = 0.0;
            }
            self.smoothed[k] = value;

            let db = 20.0 * value.log10();
            self.decibels[k] = db;
            self.bytes[k] = byte_from_decibels(db, min_db, range_scale);
        }

        self.fresh_input = false;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn break_transform(&mut self) {
        self.fft.spectrum.clear();
    }
}

fn byte_from_decibels(db: f32, min_db: f32, range_scale: f32) -> u8 {
    let scaled = (range_scale * (db - min_db)).floor();
    if scaled.is_nan() || scaled <= 0.0 {
        0
    } else {
        scaled.min(MAX_BYTE_MAGNITUDE as f32) as u8
    }
}

fn blackman_window(len: usize) -> Vec<f32> {
    const ALPHA: f32 = 0.16;
    let a0 = 0.5 * (1.0 - ALPHA);
    let a1 = 0.5;
    let a2 = 0.5 * ALPHA;

    (0..len)
        .map(|n| {
            let x = n as f32 / len as f32;
            a0 - a1 * (2.0 * PI * x).cos() + a2 * (4.0 * PI * x).cos()
        })
        .collect()
}

struct FftResources {
    size: usize,
    plan: Arc<dyn RealToComplex<f32>>,
    scratch: Vec<Complex32>,
    spectrum: Vec<Complex32>,
    input: Vec<f32>,
}

impl fmt::Debug for AnalyzerNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnalyzerNode")
            .field("config", &self.config)
            .field("input", &self.input)
            .field("frames_processed", &self.frames_processed)
            .field("fresh_input", &self.fresh_input)
            .field("fft", &self.fft)
            .finish()
    }
}

impl fmt::Debug for FftResources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FftResources")
            .field("size", &self.size)
            .finish()
    }
}

/// Process-lifetime slot for the single [`AnalyzerNode`].
///
/// Cloning shares the slot. The node is created on first use and is never
/// replaced or dropped while any clone is alive.
#[derive(Clone, Default)]
pub struct SharedAnalyzer {
    slot: Arc<OnceLock<Mutex<AnalyzerNode>>>,
}

impl SharedAnalyzer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.slot.get().is_some()
    }

    /// Locks the node if it has been created.
    pub fn lock(&self) -> Option<MutexGuard<'_, AnalyzerNode>> {
        self.slot.get().map(|node| node.lock())
    }

    /// Locks the node, creating it from `config` on the first call.
    ///
    /// Later calls ignore `config`; the node cannot be reconfigured.
    pub fn lock_or_init(&self, config: &AnalyzerConfig) -> Result<MutexGuard<'_, AnalyzerNode>> {
        if let Some(node) = self.slot.get() {
            return Ok(node.lock());
        }

        let node = AnalyzerNode::new(config.clone())?;
        if self.slot.set(Mutex::new(node)).is_ok() {
            tracing::info!(
                fft_size = config.fft_size,
                smoothing = config.smoothing,
                "created analyzer node"
            );
        }

        self.lock().ok_or(VisualiserError::AnalyzerUnavailable)
    }

    /// Returns `true` when both handles point at the same slot.
    pub fn same_node(&self, other: &SharedAnalyzer) -> bool {
        Arc::ptr_eq(&self.slot, &other.slot)
    }
}

impl fmt::Debug for SharedAnalyzer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SharedAnalyzer")
            .field("initialized", &self.is_initialized())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::sine_samples;

    fn config(smoothing: f32) -> AnalyzerConfig {
        AnalyzerConfig {
            smoothing,
            ..AnalyzerConfig::default()
        }
    }

    /// Frequency that lands exactly on bin `k` for a given window.
    fn bin_frequency(k: usize, fft_size: usize, sample_rate: u32) -> f32 {
        k as f32 * sample_rate as f32 / fft_size as f32
    }

    #[test]
    fn silence_reads_as_zero() {
        let mut node = AnalyzerNode::new(config(0.8)).unwrap();
        node.push_silence(2_048);

        let mut out = vec![7u8; node.frequency_bin_count()];
        node.get_byte_frequency_data(&mut out).unwrap();
        assert!(out.iter().all(|&b| b == 0));
    }

    #[test]
    fn tone_peaks_at_its_bin() {
        let mut node = AnalyzerNode::new(config(0.0)).unwrap();
        let freq = bin_frequency(32, 512, 48_000);
        node.push_samples(&sine_samples(freq, 48_000, 0.05));

        let mut out = vec![0u8; 256];
        node.get_byte_frequency_data(&mut out).unwrap();
        assert_eq!(out[32], MAX_BYTE_MAGNITUDE);
        assert!(out[100] < 200, "far bin too loud: {}", out[100]);
    }

    #[test]
    fn repeated_reads_without_input_are_identical() {
        let mut node = AnalyzerNode::new(config(0.8)).unwrap();
        node.push_samples(&sine_samples(1_000.0, 48_000, 0.02));

        let mut first = vec![0u8; 256];
        let mut second = vec![0u8; 256];
        node.get_byte_frequency_data(&mut first).unwrap();
        node.get_byte_frequency_data(&mut second).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn smoothing_decays_towards_new_input() {
        let mut node = AnalyzerNode::new(config(0.8)).unwrap();
        let freq = bin_frequency(16, 512, 48_000);
        node.push_samples(&sine_samples(freq, 48_000, 0.05));

        let mut loud = vec![0.0f32; 256];
        node.get_float_frequency_data(&mut loud).unwrap();

        node.push_silence(512);
        let mut decayed = vec![0.0f32; 256];
        node.get_float_frequency_data(&mut decayed).unwrap();

        let expected = loud[16] + 20.0 * 0.8f32.log10();
        assert!((decayed[16] - expected).abs() < 1e-3);
    }

    #[test]
    fn short_output_buffers_are_truncated() {
        let mut node = AnalyzerNode::new(config(0.0)).unwrap();
        node.push_samples(&sine_samples(500.0, 48_000, 0.02));

        let mut full = vec![0u8; 256];
        node.get_byte_frequency_data(&mut full).unwrap();
        let mut short = [0u8; 4];
        node.get_byte_frequency_data(&mut short).unwrap();
        assert_eq!(&full[..4], &short);
    }

    #[test]
    fn connection_tracks_a_single_session() {
        let mut node = AnalyzerNode::new(AnalyzerConfig::default()).unwrap();
        node.connect(SessionId(1));
        node.connect(SessionId(2));
        assert_eq!(node.connected_session(), Some(SessionId(2)));
        assert!(!node.disconnect(SessionId(1)));
        assert!(node.disconnect(SessionId(2)));
        assert_eq!(node.connected_session(), None);
    }

    #[test]
    fn broken_transform_reports_error() {
        let mut node = AnalyzerNode::new(AnalyzerConfig::default()).unwrap();
        node.break_transform();
        node.push_silence(16);
        let mut out = vec![0u8; 256];
        assert!(matches!(
            node.get_byte_frequency_data(&mut out),
            Err(VisualiserError::Analyzer(_))
        ));
    }

    #[test]
    fn byte_mapping_clamps_to_range() {
        let scale = 255.0 / 70.0;
        assert_eq!(byte_from_decibels(f32::NEG_INFINITY, -100.0, scale), 0);
        assert_eq!(byte_from_decibels(-120.0, -100.0, scale), 0);
        assert_eq!(byte_from_decibels(-65.0, -100.0, scale), 127);
        assert_eq!(byte_from_decibels(0.0, -100.0, scale), 255);
    }

    #[test]
    fn shared_slot_initialises_once() {
        let shared = SharedAnalyzer::new();
        assert!(shared.lock().is_none());

        shared.lock_or_init(&config(0.5)).unwrap();
        let other = shared.clone();
        let node = other.lock_or_init(&config(0.1)).unwrap();
        assert_eq!(node.config().smoothing, 0.5);
        assert!(shared.same_node(&other));
    }
}
