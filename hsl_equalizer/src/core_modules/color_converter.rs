// THEORY:
// The `ColorConverter` is the stateless bridge between the additive RGB space the
// caller hands us and the perceptual HSL space the equalizer works in. Histogram
// equalization only touches lightness, so the conversion has to separate "how bright"
// from "what color" cleanly enough that the color survives the trip back.
//
// Both directions are total functions over their input domains:
// - Gray pixels (zero chroma) have no defined hue; they get hue 0 and saturation 0
//   instead of dividing by a zero chroma.
// - Hue is rounded to whole degrees and wrapped into [0, 360).
// - The inverse clamps each channel into 0..=255 and always emits an opaque pixel.
//
// These are plain sRGB-encoded formulas with no linearization.

pub mod color_converter {
    use crate::core_modules::pixel::pixel::{Hue, HslPixel, RgbaPixel};

    const CHROMA_EPSILON: f32 = 1e-6;
    const DEGREES_PER_SECTOR: f32 = 60.0;

    /// Converts one RGBA pixel to HSL. Alpha is ignored.
    pub fn rgb_to_hsl(pixel: RgbaPixel) -> HslPixel {
        let (red, green, blue) = pixel.normalized();

        let maximum_channel = red.max(green.max(blue));
        let minimum_channel = red.min(green.min(blue));
        let chroma = maximum_channel - minimum_channel;
        let lightness = (maximum_channel + minimum_channel) * 0.5;

        if chroma <= CHROMA_EPSILON {
            return HslPixel::new(0, 0.0, lightness);
        }

        // Non-zero chroma keeps lightness strictly inside (0, 1), so this is never zero.
        let denominator = 1.0 - (2.0 * lightness - 1.0).abs();
        let saturation = (chroma / denominator).min(1.0);

        let (base_difference, sector_offset) = if maximum_channel == red {
            (green - blue, 0.0)
        } else if maximum_channel == green {
            (blue - red, 2.0)
        } else {
            (red - green, 4.0)
        };

        let mut hue_degrees = (base_difference / chroma + sector_offset) * DEGREES_PER_SECTOR;
        if hue_degrees < 0.0 {
            hue_degrees += 360.0;
        }

        HslPixel::new(wrap_hue(hue_degrees.round() as Hue), saturation, lightness)
    }

    /// Converts one HSL pixel back to RGBA. The result is always opaque.
    pub fn hsl_to_rgb(pixel: HslPixel) -> RgbaPixel {
        let hue = wrap_hue(pixel.hue);
        let saturation = pixel.saturation.clamp(0.0, 1.0);
        let lightness = pixel.lightness.clamp(0.0, 1.0);

        let chroma = (1.0 - (2.0 * lightness - 1.0).abs()) * saturation;
        let sector = hue as f32 / DEGREES_PER_SECTOR;
        let secondary = chroma * (1.0 - (sector % 2.0 - 1.0).abs());
        let offset = lightness - chroma * 0.5;

        let (red, green, blue) = match hue / 60 {
            0 => (chroma, secondary, 0.0),
            1 => (secondary, chroma, 0.0),
            2 => (0.0, chroma, secondary),
            3 => (0.0, secondary, chroma),
            4 => (secondary, 0.0, chroma),
            _ => (chroma, 0.0, secondary),
        };

        RgbaPixel::opaque(
            to_channel(red + offset),
            to_channel(green + offset),
            to_channel(blue + offset),
        )
    }

    #[inline]
    fn wrap_hue(hue: Hue) -> Hue {
        hue.rem_euclid(360)
    }

    #[inline]
    fn to_channel(value: f32) -> u8 {
        (value * 255.0).round().clamp(0.0, 255.0) as u8
    }
}
