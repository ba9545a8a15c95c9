// File I/O and the before/after histogram plot. These sit outside the numeric pipeline;
// the `visual_tester` binary is their main user.

use std::fs::File;
use std::io::BufWriter;
use std::path::Path;

use image::codecs::png::PngEncoder;
use image::{DynamicImage, ExtendedColorType, ImageEncoder, ImageFormat, Rgba, RgbaImage};
use imageproc::drawing::draw_line_segment_mut;

use crate::core_modules::histogram::{Histogram, N_BINS};
use crate::error::{EqualizeError, Result};

const PLOT_MARGIN: u32 = 20;
const BACKGROUND: Rgba<u8> = Rgba([255, 255, 255, 255]);
const AXIS: Rgba<u8> = Rgba([0, 0, 0, 255]);
/// Line color of the input histogram.
pub const BEFORE_COLOR: Rgba<u8> = Rgba([0x00, 0x25, 0xad, 255]);
/// Line color of the post-equalization histogram.
pub const AFTER_COLOR: Rgba<u8> = Rgba([0xad, 0x25, 0x00, 255]);

/// Decodes any format the `image` crate understands into RGBA8.
pub fn load_rgba(path: impl AsRef<Path>) -> Result<RgbaImage> {
    Ok(image::open(path)?.to_rgba8())
}

/// Encodes an RGBA8 buffer, choosing the format from the file extension.
/// Formats without an alpha channel get the RGB channels only.
pub fn save(path: impl AsRef<Path>, width: u32, height: u32, buffer: &[u8]) -> Result<()> {
    let path = path.as_ref();
    let image = RgbaImage::from_raw(width, height, buffer.to_vec()).ok_or_else(|| {
        EqualizeError::invalid(
            "buffer",
            format!("{} bytes do not hold a {width}x{height} RGBA image", buffer.len()),
        )
    })?;
    let image = DynamicImage::ImageRgba8(image);
    match ImageFormat::from_path(path)? {
        ImageFormat::Jpeg => image.to_rgb8().save(path)?,
        _ => image.save(path)?,
    }
    Ok(())
}

/// Writes an RGBA8 image as PNG regardless of extension.
pub fn save_png(path: impl AsRef<Path>, image: &RgbaImage) -> Result<()> {
    let output = BufWriter::new(File::create(path)?);
    let encoder = PngEncoder::new(output);
    encoder.write_image(
        image.as_raw(),
        image.width(),
        image.height(),
        ExtendedColorType::Rgba8,
    )?;
    Ok(())
}

/// Draws both histograms as line plots over bins [0, N_BINS - 1], sharing one y scale.
/// `width` and `height` are clamped up to leave room for the margins.
pub fn render_histogram_plot(
    before: &Histogram,
    after: &Histogram,
    width: u32,
    height: u32,
) -> RgbaImage {
    let width = width.max(PLOT_MARGIN * 2 + 2);
    let height = height.max(PLOT_MARGIN * 2 + 2);
    let mut plot = RgbaImage::from_pixel(width, height, BACKGROUND);

    let left = PLOT_MARGIN;
    let bottom = height - PLOT_MARGIN - 1;
    let plot_width = width - 2 * PLOT_MARGIN;
    let plot_height = height - 2 * PLOT_MARGIN;

    let axis_x = (left - 1) as f32;
    let axis_y = (bottom + 1) as f32;
    draw_line_segment_mut(
        &mut plot,
        (axis_x, axis_y),
        ((left + plot_width - 1) as f32, axis_y),
        AXIS,
    );
    draw_line_segment_mut(&mut plot, (axis_x, PLOT_MARGIN as f32), (axis_x, axis_y), AXIS);

    let peak = before
        .bins()
        .iter()
        .chain(after.bins().iter())
        .copied()
        .max()
        .unwrap_or(0)
        .max(1) as u64;

    // Whole-pixel positions keep the series on the same columns as the axes.
    let point = |bin: usize, count: u32| -> (f32, f32) {
        let x = left as u64 + bin as u64 * (plot_width as u64 - 1) / (N_BINS as u64 - 1);
        let y = bottom as u64 - count as u64 * (plot_height as u64 - 1) / peak;
        (x as f32, y as f32)
    };

    for (histogram, color) in [(before, BEFORE_COLOR), (after, AFTER_COLOR)] {
        let mut previous = point(0, histogram[0]);
        for bin in 1..N_BINS {
            let current = point(bin, histogram[bin]);
            draw_line_segment_mut(&mut plot, previous, current, color);
            previous = current;
        }
    }

    plot
}
