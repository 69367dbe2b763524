/// Fixed-capacity ring holding the most recent time-domain samples.
///
/// Starts out full of silence so a window can always be read.
#[derive(Debug, Clone)]
pub(crate) struct SampleHistory {
    data: Vec<f32>,
    write_idx: usize,
}

impl SampleHistory {
    pub(crate) fn new(cap: usize) -> Self {
        Self {
            data: vec![0.0; cap.max(1)],
            write_idx: 0,
        }
    }

    pub(crate) fn extend(&mut self, samples: &[f32]) {
        let cap = self.data.len();
        let tail = &samples[samples.len().saturating_sub(cap)..];
        for &x in tail {
            self.data[self.write_idx] = x;
            self.write_idx = (self.write_idx + 1) % cap;
        }
    }

    pub(crate) fn extend_silence(&mut self, frames: usize) {
        let cap = self.data.len();
        for _ in 0..frames.min(cap) {
            self.data[self.write_idx] = 0.0;
            self.write_idx = (self.write_idx + 1) % cap;
        }
    }

    /// Copies the whole history, oldest sample first, into `out`.
    pub(crate) fn copy_into(&self, out: &mut [f32]) {
        debug_assert_eq!(out.len(), self.data.len());
        let first = self.data.len() - self.write_idx;
        out[..first].copy_from_slice(&self.data[self.write_idx..]);
        out[first..].copy_from_slice(&self.data[..self.write_idx]);
    }
}
