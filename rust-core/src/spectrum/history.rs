//! Sliding mono history feeding the analyzer
//!
//! Fixed-length FIFO of mono-mixed samples, oldest first. The length is set
//! once at construction and never changes.

use super::windowing::apply_window;
use std::collections::TryReserveError;

/// Fixed-length sliding window of mono samples
pub struct MonoHistory {
    samples: Vec<f32>,
}

impl MonoHistory {
    /// Create a zeroed history of `length` samples
    pub fn new(length: usize) -> Result<Self, TryReserveError> {
        let mut samples = Vec::new();
        samples.try_reserve_exact(length)?;
        samples.resize(length, 0.0);

        Ok(Self { samples })
    }

    /// Append a stereo block as `(left + right) / 2`
    ///
    /// The oldest `k` samples are discarded, where `k` is the common length
    /// of both channels. Blocks longer than the history keep only their most
    /// recent samples.
    pub fn append(&mut self, left: &[f32], right: &[f32]) {
        debug_assert_eq!(left.len(), right.len());

        let n = self.samples.len();
        let k = left.len().min(right.len());

        // Drop the front of oversized blocks
        let skip = k.saturating_sub(n);
        let (left, right) = (&left[skip..k], &right[skip..k]);
        let k = k - skip;

        self.samples.copy_within(k.., 0);

        for ((dst, &l), &r) in self.samples[n - k..].iter_mut().zip(left).zip(right) {
            *dst = 0.5 * (l + r);
        }
    }

    /// Write `history * window` into `out`
    pub fn apply_window(&self, window: &[f32], out: &mut [f32]) {
        apply_window(&self.samples, window, out);
    }

    /// Reset every sample to zero
    pub fn clear(&mut self) {
        self.samples.fill(0.0);
    }

    pub fn as_slice(&self) -> &[f32] {
        &self.samples
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}
