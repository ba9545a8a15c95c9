// THEORY (Pixel Representations):
// The `Pixel` module holds the two "dumb" per-pixel data containers the equalizer
// moves between: the packed RGBA8 pixel as it arrives from the caller, and the HSL
// triple the histogram stages operate on. Neither type knows how to convert itself;
// that lives in `color_converter`, keeping these as plain values that are cheap to
// copy in and out of the parallel loops.
//
// Ranges:
// - RGBA channels are raw bytes (0..=255). Alpha is carried in but never round-tripped
//   through HSL; output pixels are always fully opaque.
// - Hue is stored as whole degrees in [0, 360).
// - Saturation and lightness are `f32` in [0, 1].

pub mod pixel {
    pub type Byte = u8;
    pub type Channel = Byte;
    pub type NormalizedChannel = f32;
    pub type Hue = i32;
    pub type Saturation = f32;
    pub type Lightness = f32;

    /// Bytes per packed RGBA pixel.
    pub const CHANNELS: usize = 4;
    /// Alpha value written to every output pixel.
    pub const OPAQUE: Channel = 0xFF;

    /// A single packed RGBA8 pixel.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct RgbaPixel {
        /// The red channel value (0-255).
        pub red: Channel,
        /// The green channel value (0-255).
        pub green: Channel,
        /// The blue channel value (0-255).
        pub blue: Channel,
        /// The alpha (transparency) channel value (0-255).
        pub alpha: Channel,
    }

    impl RgbaPixel {
        pub fn new(red: Channel, green: Channel, blue: Channel, alpha: Channel) -> Self {
            Self {
                red,
                green,
                blue,
                alpha,
            }
        }

        /// An opaque pixel, the shape every converted output pixel takes.
        pub fn opaque(red: Channel, green: Channel, blue: Channel) -> Self {
            Self::new(red, green, blue, OPAQUE)
        }

        /// Red, green and blue scaled to 0..1 (still gamma-encoded).
        pub fn normalized(&self) -> (NormalizedChannel, NormalizedChannel, NormalizedChannel) {
            (
                self.red as NormalizedChannel / 255.0,
                self.green as NormalizedChannel / 255.0,
                self.blue as NormalizedChannel / 255.0,
            )
        }

        /// Reads one pixel out of a 4-byte slice. Returns `None` on a short slice.
        pub fn from_bytes(bytes: &[Byte]) -> Option<Self> {
            match bytes {
                [red, green, blue, alpha, ..] => Some(Self::new(*red, *green, *blue, *alpha)),
                _ => None,
            }
        }

        /// Writes the pixel into the first four bytes of `out`.
        pub fn write_to(&self, out: &mut [Byte]) {
            out[..CHANNELS].copy_from_slice(&self.to_bytes());
        }

        pub fn to_bytes(&self) -> [Byte; CHANNELS] {
            [self.red, self.green, self.blue, self.alpha]
        }
    }

    impl From<[Byte; CHANNELS]> for RgbaPixel {
        fn from(bytes: [Byte; CHANNELS]) -> Self {
            RgbaPixel::new(bytes[0], bytes[1], bytes[2], bytes[3])
        }
    }

    impl From<RgbaPixel> for [Byte; CHANNELS] {
        fn from(pixel: RgbaPixel) -> Self {
            pixel.to_bytes()
        }
    }

    /// A pixel in Hue-Saturation-Lightness form.
    #[derive(Debug, Clone, Copy, PartialEq, Default)]
    pub struct HslPixel {
        /// Hue in whole degrees, [0, 360).
        pub hue: Hue,
        /// Saturation, [0, 1].
        pub saturation: Saturation,
        /// Lightness, [0, 1].
        pub lightness: Lightness,
    }

    impl HslPixel {
        pub fn new(hue: Hue, saturation: Saturation, lightness: Lightness) -> Self {
            Self {
                hue,
                saturation,
                lightness,
            }
        }
    }
}
