// THEORY:
// The `CdfCalculator` turns the histogram into its cumulative distribution: an
// inclusive prefix sum where entry `i` is the number of pixels at or below bin `i`.
//
// Two scans are provided:
// 1.  **Sequential**: one ordered pass, O(n) work. For the fixed 256 bins this is
//     the fastest option and the default.
// 2.  **Hillis-Steele**: O(log n) data-parallel rounds, O(n log n) total work. Each
//     round snapshots the array into a backup and adds `backup[i - stride]` into
//     every `i >= stride`. Writes only read the snapshot, so the round's indices can
//     be split across workers freely. It only pays off for large bin counts with many
//     workers, which is why the choice is a `ScanStrategy` rather than hard-wired.
//
// Both scans use wrapping integer addition, so they agree bit for bit on any input.

use std::fmt;

use rayon::prelude::*;

use crate::core_modules::buffer::try_filled;
use crate::core_modules::histogram::{BinCount, Histogram, N_BINS};
use crate::error::Result;
use crate::pipeline::Stage;

/// Smallest array length for which `ScanStrategy::Auto` picks the parallel scan.
pub const PARALLEL_SCAN_MIN_BINS: usize = 4096;

/// Which prefix-scan algorithm computes the CDF.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ScanStrategy {
    /// Hillis-Steele when there are several workers and enough bins, otherwise sequential.
    #[default]
    Auto,
    Sequential,
    HillisSteele,
}

impl ScanStrategy {
    /// Resolves `Auto` for a scan over `len` elements with `threads` workers.
    pub fn resolve(self, len: usize, threads: usize) -> ScanStrategy {
        match self {
            ScanStrategy::Auto if threads > 1 && len >= PARALLEL_SCAN_MIN_BINS => {
                ScanStrategy::HillisSteele
            }
            ScanStrategy::Auto => ScanStrategy::Sequential,
            fixed => fixed,
        }
    }
}

impl fmt::Display for ScanStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ScanStrategy::Auto => "auto",
            ScanStrategy::Sequential => "sequential",
            ScanStrategy::HillisSteele => "hillis-steele",
        };
        f.write_str(name)
    }
}

impl std::str::FromStr for ScanStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(ScanStrategy::Auto),
            "sequential" => Ok(ScanStrategy::Sequential),
            "hillis-steele" | "hillis_steele" | "parallel" => Ok(ScanStrategy::HillisSteele),
            other => Err(format!("unknown scan strategy '{other}'")),
        }
    }
}

/// In-place inclusive prefix sum, one ordered pass.
pub fn inclusive_scan_sequential(values: &mut [BinCount]) {
    for index in 1..values.len() {
        values[index] = values[index].wrapping_add(values[index - 1]);
    }
}

/// In-place inclusive prefix sum using Hillis-Steele rounds on the current rayon pool.
/// Fails only if the snapshot buffer cannot be allocated.
pub fn inclusive_scan_hillis_steele(values: &mut [BinCount]) -> Result<()> {
    let len = values.len();
    if len < 2 {
        return Ok(());
    }

    let mut backup = try_filled(len, 0, Stage::ComputingCdf)?;
    let mut stride = 1;
    while stride < len {
        // Only the prefix that will be read this round needs snapshotting.
        let read_len = len - stride;
        backup[..read_len].copy_from_slice(&values[..read_len]);

        values[stride..]
            .par_iter_mut()
            .zip(backup[..read_len].par_iter())
            .for_each(|(value, earlier)| *value = value.wrapping_add(*earlier));

        stride *= 2;
    }
    Ok(())
}

/// Cumulative bin counts; non-decreasing, last entry equals the pixel count.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cdf {
    values: [BinCount; N_BINS],
}

impl Cdf {
    /// Computes the CDF of `histogram` with an already resolved strategy.
    pub fn compute(histogram: &Histogram, strategy: ScanStrategy) -> Result<Self> {
        let mut values = *histogram.bins();
        match strategy {
            ScanStrategy::HillisSteele => inclusive_scan_hillis_steele(&mut values)?,
            ScanStrategy::Sequential | ScanStrategy::Auto => inclusive_scan_sequential(&mut values),
        }
        Ok(Self { values })
    }

    pub fn sequential(histogram: &Histogram) -> Self {
        let mut values = *histogram.bins();
        inclusive_scan_sequential(&mut values);
        Self { values }
    }

    pub fn values(&self) -> &[BinCount; N_BINS] {
        &self.values
    }

    /// Count in bin 0, the stand-in for the minimum used by normalization.
    pub fn first(&self) -> BinCount {
        self.values[0]
    }

    pub fn last(&self) -> BinCount {
        self.values[N_BINS - 1]
    }

    pub fn is_monotonic(&self) -> bool {
        self.values.windows(2).all(|pair| pair[1] >= pair[0])
    }
}

impl std::ops::Index<usize> for Cdf {
    type Output = BinCount;

    fn index(&self, bin: usize) -> &Self::Output {
        &self.values[bin]
    }
}
