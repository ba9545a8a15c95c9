// THEORY:
// The `Normalizer` rescales the CDF into the equalization lookup table:
//
//     table[bin] = (cdf[bin] - cdf[0]) / (total_pixels - cdf[0]) * (N_BINS - 1)
//
// `cdf[0]` stands in for the cumulative count at the first non-empty bin. The two only
// coincide when bin 0 holds pixels; the formula is kept as-is so output matches the
// established behavior rather than the textbook variant.
//
// A zero divisor means every pixel sits in bin 0. That image has no contrast to
// redistribute, and it is reported as `DegenerateImage` instead of letting NaN or
// infinity leak into the table.

use crate::core_modules::cdf::Cdf;
use crate::core_modules::histogram::{MAX_BIN, N_BINS, lightness_to_bin};
use crate::core_modules::pixel::pixel::Lightness;
use crate::error::{EqualizeError, Result};

/// The equalization lookup table, values in [0, N_BINS - 1] for a consistent CDF.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedCdf {
    table: [f32; N_BINS],
}

impl NormalizedCdf {
    /// Builds the table from `cdf` for an image of `total_pixels` pixels.
    pub fn from_cdf(cdf: &Cdf, total_pixels: u32) -> Result<Self> {
        let first = cdf.first();
        if total_pixels == first {
            return Err(EqualizeError::DegenerateImage {
                total_pixels,
                first_bin_count: first,
            });
        }
        if total_pixels < first {
            return Err(EqualizeError::InvalidArgument {
                parameter: "total_pixels",
                reason: format!("{total_pixels} is smaller than the first CDF entry {first}"),
            });
        }

        let divisor = (total_pixels - first) as f32;
        let mut table = [0.0f32; N_BINS];
        for (slot, &cumulative) in table.iter_mut().zip(cdf.values().iter()) {
            *slot = cumulative.saturating_sub(first) as f32 / divisor * MAX_BIN;
        }
        Ok(Self { table })
    }

    pub fn values(&self) -> &[f32; N_BINS] {
        &self.table
    }

    /// New lightness for `lightness`, quantized with the same rule as the histogram.
    #[inline]
    pub fn remap(&self, lightness: Lightness) -> Lightness {
        self.table[lightness_to_bin(lightness)] / MAX_BIN
    }

    pub fn is_within_range(&self) -> bool {
        self.table.iter().all(|value| (0.0..=MAX_BIN).contains(value))
    }
}

impl std::ops::Index<usize> for NormalizedCdf {
    type Output = f32;

    fn index(&self, bin: usize) -> &Self::Output {
        &self.table[bin]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core_modules::histogram::Histogram;

    fn cdf_from_bins(entries: &[(usize, u32)]) -> Cdf {
        let mut bins = [0u32; N_BINS];
        for &(bin, count) in entries {
            bins[bin] = count;
        }
        Cdf::sequential(&Histogram::from_bins(bins))
    }

    #[test]
    fn spreads_four_levels_evenly() {
        let cdf = cdf_from_bins(&[(0, 1), (85, 1), (170, 1), (255, 1)]);
        let table = NormalizedCdf::from_cdf(&cdf, 4).unwrap();
        assert_eq!(table[0], 0.0);
        assert_eq!(table[84], 0.0);
        assert!((table[85] - 85.0).abs() < 1e-4);
        assert!((table[169] - 85.0).abs() < 1e-4);
        assert!((table[170] - 170.0).abs() < 1e-4);
        assert_eq!(table[255], 255.0);
        assert!(table.is_within_range());
    }

    #[test]
    fn all_pixels_in_bin_zero_is_degenerate() {
        let cdf = cdf_from_bins(&[(0, 16)]);
        let err = NormalizedCdf::from_cdf(&cdf, 16).unwrap_err();
        assert!(matches!(
            err,
            EqualizeError::DegenerateImage {
                total_pixels: 16,
                first_bin_count: 16
            }
        ));
    }

    #[test]
    fn empty_bin_zero_uses_zero_as_minimum() {
        // Known approximation: bin 0 empty means the minimum is taken as 0, not the
        // first occupied bin's count.
        let cdf = cdf_from_bins(&[(100, 3), (200, 1)]);
        let table = NormalizedCdf::from_cdf(&cdf, 4).unwrap();
        assert_eq!(table[99], 0.0);
        assert!((table[100] - 0.75 * 255.0).abs() < 1e-3);
        assert_eq!(table[255], 255.0);
    }

    #[test]
    fn inconsistent_total_is_rejected() {
        let cdf = cdf_from_bins(&[(0, 10)]);
        assert!(matches!(
            NormalizedCdf::from_cdf(&cdf, 4),
            Err(EqualizeError::InvalidArgument { .. })
        ));
    }

    #[test]
    fn remap_uses_histogram_quantization() {
        let cdf = cdf_from_bins(&[(0, 1), (255, 1)]);
        let table = NormalizedCdf::from_cdf(&cdf, 2).unwrap();
        assert_eq!(table.remap(0.0), 0.0);
        assert_eq!(table.remap(1.0), 1.0);
        assert_eq!(table.remap(0.5), 0.0);
    }
}
