// THEORY:
// `HslImage` is the working copy of the picture for the duration of one equalization.
// It is stored as three parallel arrays (hue, saturation, lightness) rather than a
// `Vec<HslPixel>` because the histogram, remap and diagnostic passes only ever read
// or write the lightness plane; keeping it contiguous lets those passes stream one
// `f32` slice.
//
// Every pass here is data-parallel over disjoint indices, so they run as rayon
// iterators on whichever pool the caller installed. Each call returns only after
// every worker is done, which is the stage barrier the pipeline relies on.

use rayon::prelude::*;

use crate::core_modules::buffer::try_filled;
use crate::core_modules::color_converter::color_converter::{hsl_to_rgb, rgb_to_hsl};
use crate::core_modules::normalizer::NormalizedCdf;
use crate::core_modules::pixel::pixel::{CHANNELS, Hue, HslPixel, Lightness, RgbaPixel, Saturation};
use crate::error::Result;
use crate::pipeline::Stage;

/// A planar HSL image, index-aligned with the packed RGBA buffer it came from.
#[derive(Debug, Clone, PartialEq)]
pub struct HslImage {
    hue: Vec<Hue>,
    saturation: Vec<Saturation>,
    lightness: Vec<Lightness>,
}

impl HslImage {
    /// Allocates zeroed planes for `len` pixels.
    pub fn try_new(len: usize) -> Result<Self> {
        let hue = try_filled(len, 0, Stage::ConvertingToHsl)?;
        let saturation = try_filled(len, 0.0, Stage::ConvertingToHsl)?;
        let lightness = try_filled(len, 0.0, Stage::ConvertingToHsl)?;
        Ok(Self {
            hue,
            saturation,
            lightness,
        })
    }

    /// Allocates the planes and converts a packed RGBA buffer into them.
    /// `rgba.len()` must be a multiple of four; trailing bytes are ignored.
    pub fn try_from_rgba(rgba: &[u8]) -> Result<Self> {
        let mut image = Self::try_new(rgba.len() / CHANNELS)?;
        image.fill_from_rgba(rgba);
        Ok(image)
    }

    pub fn len(&self) -> usize {
        self.lightness.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lightness.is_empty()
    }

    pub fn lightness(&self) -> &[Lightness] {
        &self.lightness
    }

    pub fn pixel(&self, index: usize) -> Option<HslPixel> {
        Some(HslPixel::new(
            *self.hue.get(index)?,
            *self.saturation.get(index)?,
            *self.lightness.get(index)?,
        ))
    }

    fn fill_from_rgba(&mut self, rgba: &[u8]) {
        rgba.par_chunks_exact(CHANNELS)
            .zip(self.hue.par_iter_mut())
            .zip(self.saturation.par_iter_mut())
            .zip(self.lightness.par_iter_mut())
            .for_each(|(((bytes, hue), saturation), lightness)| {
                // `par_chunks_exact` never yields a short chunk.
                let hsl = rgb_to_hsl(RgbaPixel::from_bytes(bytes).unwrap_or_default());
                *hue = hsl.hue;
                *saturation = hsl.saturation;
                *lightness = hsl.lightness;
            });
    }

    /// Replaces every lightness value through the equalization lookup table.
    pub fn remap_lightness(&mut self, table: &NormalizedCdf) {
        self.lightness
            .par_iter_mut()
            .for_each(|lightness| *lightness = table.remap(*lightness));
    }

    /// Converts back into `out`, which must hold `len() * 4` bytes. Alpha is forced opaque.
    pub fn write_rgba(&self, out: &mut [u8]) {
        out.par_chunks_exact_mut(CHANNELS)
            .zip(self.hue.par_iter())
            .zip(self.saturation.par_iter())
            .zip(self.lightness.par_iter())
            .for_each(|(((bytes, hue), saturation), lightness)| {
                hsl_to_rgb(HslPixel::new(*hue, *saturation, *lightness)).write_to(bytes);
            });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn planes_stay_index_aligned() {
        let rgba = [255, 0, 0, 255, 0, 0, 0, 0, 255, 255, 255, 9];
        let image = HslImage::try_from_rgba(&rgba).unwrap();
        assert_eq!(image.len(), 3);
        assert_eq!(image.pixel(0), Some(HslPixel::new(0, 1.0, 0.5)));
        assert_eq!(image.pixel(1), Some(HslPixel::new(0, 0.0, 0.0)));
        assert_eq!(image.pixel(2), Some(HslPixel::new(0, 0.0, 1.0)));
        assert_eq!(image.pixel(3), None);
    }

    #[test]
    fn write_back_reproduces_input_with_opaque_alpha() {
        let rgba = [10, 20, 30, 0, 200, 200, 200, 17];
        let image = HslImage::try_from_rgba(&rgba).unwrap();
        let mut out = vec![0u8; rgba.len()];
        image.write_rgba(&mut out);
        assert_eq!(out[3], 255);
        assert_eq!(out[7], 255);
        assert_eq!(&out[4..7], &[200, 200, 200]);
        for (a, b) in out[..3].iter().zip(&rgba[..3]) {
            assert!((*a as i16 - *b as i16).abs() <= 2);
        }
    }

    #[test]
    fn empty_buffer_gives_empty_image() {
        let image = HslImage::try_from_rgba(&[]).unwrap();
        assert!(image.is_empty());
    }
}
