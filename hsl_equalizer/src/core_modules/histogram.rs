// THEORY:
// The `HistogramBuilder` quantizes every lightness sample into one of `N_BINS` levels
// and counts them. It is the only stage whose parallel form has a shared-write hazard:
// two workers can land in the same bin. Rather than atomics, each rayon worker folds
// its slice of samples into a private bin array and the partial arrays are summed
// element-wise at the end. The result is identical to the sequential count.
//
// Quantization rule (shared with the remap pass so the two never disagree):
//     bin = round_half_away_from_zero(lightness * (N_BINS - 1))
// clamped into [0, N_BINS - 1] so that float overshoot past 1.0 (or a NaN) cannot
// index out of bounds.

use rayon::prelude::*;

use crate::core_modules::pixel::pixel::Lightness;

/// Number of lightness quantization levels shared by histogram, CDF and remap.
pub const N_BINS: usize = 256;
/// Largest valid bin index, as the float scale factor used in quantization.
pub const MAX_BIN: f32 = (N_BINS - 1) as f32;

const SAMPLES_PER_TASK: usize = 16 * 1024;

pub type BinCount = u32;

/// Maps a lightness in [0, 1] to its bin index.
#[inline]
pub fn lightness_to_bin(lightness: Lightness) -> usize {
    // `as usize` saturates negatives and NaN to 0.
    ((lightness * MAX_BIN).round() as usize).min(N_BINS - 1)
}

/// A fixed-size count of lightness samples per bin.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Histogram {
    bins: [BinCount; N_BINS],
}

impl Default for Histogram {
    fn default() -> Self {
        Self { bins: [0; N_BINS] }
    }
}

impl Histogram {
    pub fn from_bins(bins: [BinCount; N_BINS]) -> Self {
        Self { bins }
    }

    /// Counts `samples` on the current rayon pool using per-worker partial histograms.
    pub fn from_lightness(samples: &[Lightness]) -> Self {
        samples
            .par_chunks(SAMPLES_PER_TASK)
            .fold(Histogram::default, |mut partial, chunk| {
                partial.accumulate(chunk);
                partial
            })
            .reduce(Histogram::default, Histogram::merged)
    }

    /// Single-threaded count; the reference the parallel version must match.
    pub fn from_lightness_sequential(samples: &[Lightness]) -> Self {
        let mut histogram = Histogram::default();
        histogram.accumulate(samples);
        histogram
    }

    fn accumulate(&mut self, samples: &[Lightness]) {
        for &lightness in samples {
            self.bins[lightness_to_bin(lightness)] += 1;
        }
    }

    fn merged(mut self, other: Histogram) -> Histogram {
        for (bin, count) in self.bins.iter_mut().zip(other.bins.iter()) {
            *bin += count;
        }
        self
    }

    pub fn bins(&self) -> &[BinCount; N_BINS] {
        &self.bins
    }

    /// Sum of all bins. Equals the number of samples that were counted.
    pub fn total(&self) -> u64 {
        self.bins.iter().map(|&count| count as u64).sum()
    }

    /// Index of the fullest bin, lowest index on ties.
    pub fn peak_bin(&self) -> usize {
        let mut peak = 0;
        for (bin, &count) in self.bins.iter().enumerate() {
            if count > self.bins[peak] {
                peak = bin;
            }
        }
        peak
    }

    /// Number of bins holding at least one sample.
    pub fn occupied_bins(&self) -> usize {
        self.bins.iter().filter(|&&count| count > 0).count()
    }
}

impl std::ops::Index<usize> for Histogram {
    type Output = BinCount;

    fn index(&self, bin: usize) -> &Self::Output {
        &self.bins[bin]
    }
}
