use std::fmt;

use crate::{analysis::MAX_BYTE_MAGNITUDE, AnalyzerConfig, SharedAnalyzer};

/// Reusable buffer of byte frequency magnitudes, overwritten on every sample.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrequencySnapshot {
    bins: Box<[u8]>,
}

impl FrequencySnapshot {
    pub fn zeroed(len: usize) -> Self {
        Self {
            bins: vec![0; len].into_boxed_slice(),
        }
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.bins
    }

    pub fn len(&self) -> usize {
        self.bins.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bins.is_empty()
    }

    /// Value that normalises to `1.0`.
    pub fn max_magnitude(&self) -> u8 {
        MAX_BYTE_MAGNITUDE
    }

    fn bins_mut(&mut self) -> &mut [u8] {
        &mut self.bins
    }

    fn clear(&mut self) {
        self.bins.fill(0);
    }
}

impl AsRef<[u8]> for FrequencySnapshot {
    fn as_ref(&self) -> &[u8] {
        &self.bins
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SamplerStatus {
    /// No analyzer exists yet; the snapshot keeps its previous contents.
    Idle,
    Live,
    /// The analyzer failed; the snapshot stays zeroed from now on.
    Degraded,
}

/// Copies the shared analyzer's output into a fixed, long-lived buffer.
pub struct FrequencySampler {
    analyzer: SharedAnalyzer,
    snapshot: FrequencySnapshot,
    status: SamplerStatus,
}

impl FrequencySampler {
    pub fn new(analyzer: SharedAnalyzer, resolution: usize) -> Self {
        Self {
            analyzer,
            snapshot: FrequencySnapshot::zeroed(resolution),
            status: SamplerStatus::Idle,
        }
    }

    /// Sizes the buffer to the analyzer's bin count.
    pub fn for_config(analyzer: SharedAnalyzer, config: &AnalyzerConfig) -> Self {
        Self::new(analyzer, config.frequency_bin_count())
    }

    pub fn status(&self) -> SamplerStatus {
        self.status
    }

    /// Refreshes the snapshot from the analyzer and returns it.
    ///
    /// Without an analyzer the previous contents are returned unchanged. An
    /// analyzer failure zeroes the snapshot once and disables sampling.
    pub fn sample(&mut self) -> &FrequencySnapshot {
        if self.status == SamplerStatus::Degraded {
            return &self.snapshot;
        }
        let Some(mut node) = self.analyzer.lock() else {
            return &self.snapshot;
        };

        match node.get_byte_frequency_data(self.snapshot.bins_mut()) {
            Ok(()) => self.status = SamplerStatus::Live,
            Err(error) => {
                tracing::warn!(%error, "analyzer failed; visual elements fall back to rest height");
                self.snapshot.clear();
                self.status = SamplerStatus::Degraded;
            }
        }

        &self.snapshot
    }
}

impl fmt::Debug for FrequencySampler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FrequencySampler")
            .field("status", &self.status)
            .field("resolution", &self.snapshot.len())
            .finish()
    }
}
