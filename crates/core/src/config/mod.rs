use serde::{Deserialize, Serialize};

use crate::{Result, VisualiserError};

/// Top-level configuration structure for the application.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub audio: AudioConfig,
    pub analyzer: AnalyzerConfig,
    pub ring: RingConfig,
}

impl AppConfig {
    /// Parses a (possibly partial) JSON document and validates the result.
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)
            .map_err(|e| VisualiserError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        self.audio.validate()?;
        self.analyzer.validate()?;
        self.ring.validate()
    }
}

/// Configuration of the audio context the analyzer lives in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AudioConfig {
    /// Rate at which silence is fed to the analyzer while nothing plays.
    pub sample_rate: u32,
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48_000,
        }
    }
}

impl AudioConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if self.sample_rate == 0 {
            return Err(VisualiserError::Config(
                "audio.sample_rate must be positive".into(),
            ));
        }
        Ok(())
    }
}

/// Fixed settings of the spectral analyzer node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    /// Transform window size in samples.
    pub fft_size: usize,
    /// Weight given to the previous magnitude, in `[0, 1]`.
    pub smoothing: f32,
    pub min_decibels: f32,
    pub max_decibels: f32,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            fft_size: 512,
            smoothing: 0.8,
            min_decibels: -100.0,
            max_decibels: -30.0,
        }
    }
}

impl AnalyzerConfig {
    pub const MIN_FFT_SIZE: usize = 32;
    pub const MAX_FFT_SIZE: usize = 32_768;

    /// Number of frequency bins produced per read: half the window size.
    pub fn frequency_bin_count(&self) -> usize {
        self.fft_size / 2
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if !self.fft_size.is_power_of_two()
            || !(Self::MIN_FFT_SIZE..=Self::MAX_FFT_SIZE).contains(&self.fft_size)
        {
            return Err(VisualiserError::Config(format!(
                "analyzer.fft_size must be a power of two in [{}, {}], got {}",
                Self::MIN_FFT_SIZE,
                Self::MAX_FFT_SIZE,
                self.fft_size
            )));
        }
        if !(0.0..=1.0).contains(&self.smoothing) {
            return Err(VisualiserError::Config(format!(
                "analyzer.smoothing must lie in [0, 1], got {}",
                self.smoothing
            )));
        }
        let finite = self.min_decibels.is_finite() && self.max_decibels.is_finite();
        if !finite || self.min_decibels >= self.max_decibels {
            return Err(VisualiserError::Config(
                "analyzer.min_decibels must be a finite value below max_decibels".into(),
            ));
        }
        Ok(())
    }
}

/// Geometry of the ring of visual elements.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RingConfig {
    pub element_count: usize,
    pub radius: f32,
    pub min_height: f32,
    pub max_height_delta: f32,
    pub element_width: f32,
    pub element_depth: f32,
}

impl Default for RingConfig {
    fn default() -> Self {
        Self {
            element_count: 64,
            radius: 5.0,
            min_height: 0.1,
            max_height_delta: 8.0,
            element_width: 0.1,
            element_depth: 0.1,
        }
    }
}

impl RingConfig {
    pub(crate) fn validate(&self) -> Result<()> {
        if !(self.radius.is_finite() && self.radius > 0.0) {
            return Err(VisualiserError::Config("ring.radius must be positive".into()));
        }
        let non_negative = |x: f32| x.is_finite() && x >= 0.0;
        if !non_negative(self.min_height) || !non_negative(self.max_height_delta) {
            return Err(VisualiserError::Config(
                "ring heights must be finite and not negative".into(),
            ));
        }
        let positive = |x: f32| x.is_finite() && x > 0.0;
        if !positive(self.element_width) || !positive(self.element_depth) {
            return Err(VisualiserError::Config(
                "ring element footprint must be positive".into(),
            ));
        }
        Ok(())
    }
}
