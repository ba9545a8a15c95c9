use hsl_equalizer::core_modules::color_converter::color_converter::rgb_to_hsl;
use hsl_equalizer::core_modules::pixel::pixel::RgbaPixel;
use hsl_equalizer::{EqualizeError, Equalizer, EqualizerConfig, N_BINS, ScanStrategy, Stage};
use image::{Rgba, RgbaImage};

fn equalizer(threads: usize) -> Equalizer {
    Equalizer::new(
        EqualizerConfig::default()
            .with_threads(threads)
            .with_diagnostics(true),
    )
    .unwrap()
}

fn gray_image(levels: &[u8]) -> Vec<u8> {
    levels
        .iter()
        .flat_map(|&level| [level, level, level, 255])
        .collect()
}

/// Deterministic colorful test image.
fn noisy_image(width: u32, height: u32, mut state: u64) -> Vec<u8> {
    (0..width * height)
        .flat_map(|_| {
            state = state
                .wrapping_mul(6364136223846793005)
                .wrapping_add(1442695040888963407);
            let [r, g, b, a, ..] = (state >> 16).to_le_bytes();
            // Bias toward the darker half so equalization has work to do.
            [r / 2, g / 2 + 10, b / 3, a]
        })
        .collect()
}

#[test]
fn four_gray_levels_map_exactly() {
    let input = gray_image(&[0, 85, 170, 255]);
    let equalized = equalizer(2).equalize(&input, 2, 2).unwrap();

    let diagnostics = equalized.diagnostics.as_ref().unwrap();
    for bin in [0, 85, 170, 255] {
        assert_eq!(diagnostics.histogram[bin], 1, "bin {bin}");
    }
    assert_eq!(diagnostics.histogram.occupied_bins(), 4);

    let cdf = &diagnostics.cdf;
    assert_eq!((cdf[0], cdf[84], cdf[85], cdf[169]), (1, 1, 2, 2));
    assert_eq!((cdf[170], cdf[254], cdf[255]), (3, 3, 4));

    let table = &diagnostics.normalized_cdf;
    assert_eq!(table[0], 0.0);
    assert!((table[85] - 85.0).abs() < 1e-4);
    assert!((table[170] - 170.0).abs() < 1e-4);
    assert_eq!(table[255], 255.0);

    assert_eq!(equalized.pixels, input);
    assert_eq!((equalized.width, equalized.height), (2, 2));
}

#[test]
fn all_black_image_is_degenerate() {
    let input = gray_image(&[0; 16]);
    let err = equalizer(4).equalize(&input, 4, 4).unwrap_err();
    assert!(matches!(
        err,
        EqualizeError::DegenerateImage {
            total_pixels: 16,
            first_bin_count: 16
        }
    ));
    assert_eq!(err.stage(), Some(Stage::Normalizing));
}

#[test]
fn single_black_pixel_is_degenerate() {
    let err = equalizer(1).equalize(&[0, 0, 0, 255], 1, 1).unwrap_err();
    assert!(matches!(err, EqualizeError::DegenerateImage { .. }));
}

#[test]
fn single_non_black_pixel_completes() {
    // Bin 0 is empty, so the divisor is the full pixel count and the pixel
    // lands at the top of the range.
    let equalized = equalizer(1).equalize(&[100, 100, 100, 3], 1, 1).unwrap();
    assert_eq!(equalized.pixels, vec![255, 255, 255, 255]);
}

#[test]
fn constant_bright_image_is_not_flagged() {
    // Only an all-bin-0 image has a zero divisor; other flat images saturate.
    let equalized = equalizer(2).equalize(&gray_image(&[200; 16]), 4, 4).unwrap();
    assert!(equalized.pixels.iter().all(|&byte| byte == 255));
}

#[test]
fn histogram_and_cdf_invariants_hold() {
    let (width, height) = (97, 61);
    let input = noisy_image(width, height, 11);
    let equalized = equalizer(3).equalize(&input, width, height).unwrap();
    let diagnostics = equalized.diagnostics.unwrap();
    let total = (width * height) as u64;

    assert_eq!(diagnostics.histogram.total(), total);
    assert_eq!(diagnostics.post_histogram.total(), total);
    assert!(diagnostics.cdf.is_monotonic());
    assert_eq!(diagnostics.cdf.last() as u64, total);
    assert!(diagnostics.normalized_cdf.is_within_range());
    assert_eq!(diagnostics.normalized_cdf.values().len(), N_BINS);
}

#[test]
fn output_is_opaque_and_same_size() {
    let (width, height) = (16, 9);
    let mut input = noisy_image(width, height, 5);
    for alpha in input.iter_mut().skip(3).step_by(4) {
        *alpha = 0;
    }
    let equalized = equalizer(2).equalize(&input, width, height).unwrap();
    assert_eq!(equalized.pixels.len(), input.len());
    assert!(equalized.pixels.iter().skip(3).step_by(4).all(|&alpha| alpha == 255));
}

#[test]
fn equalization_spreads_a_dark_image() {
    let (width, height) = (64, 64);
    let input = noisy_image(width, height, 99);
    let equalized = equalizer(4).equalize(&input, width, height).unwrap();
    let diagnostics = equalized.diagnostics.unwrap();

    let highest_bin = |histogram: &hsl_equalizer::core_modules::histogram::Histogram| {
        (0..N_BINS).rev().find(|&bin| histogram[bin] > 0).unwrap()
    };
    assert!(highest_bin(&diagnostics.histogram) < 200);
    assert_eq!(highest_bin(&diagnostics.post_histogram), N_BINS - 1);
}

#[test]
fn result_does_not_depend_on_workers_or_scan() {
    let (width, height) = (64, 48);
    let input = noisy_image(width, height, 3);
    let reference = Equalizer::new(
        EqualizerConfig::default()
            .with_threads(1)
            .with_scan(ScanStrategy::Sequential),
    )
    .unwrap()
    .equalize(&input, width, height)
    .unwrap();

    for threads in [2, 3, 8] {
        for scan in [ScanStrategy::Auto, ScanStrategy::HillisSteele] {
            let config = EqualizerConfig::default().with_threads(threads).with_scan(scan);
            let equalized = Equalizer::new(config)
                .unwrap()
                .equalize(&input, width, height)
                .unwrap();
            assert_eq!(equalized.pixels, reference.pixels, "{threads} threads, {scan}");
        }
    }
}

#[test]
fn equalizing_twice_changes_nothing_but_rounding() {
    let (width, height) = (64, 64);
    let mut state = 0x1234_5678u32;
    let levels: Vec<u8> = (0..width * height)
        .map(|_| {
            state ^= state << 13;
            state ^= state >> 17;
            state ^= state << 5;
            (state % 16) as u8 * 9
        })
        .collect();
    let input = gray_image(&levels);

    let equalizer = equalizer(2);
    let once = equalizer.equalize(&input, width, height).unwrap();
    let twice = equalizer.equalize(&once.pixels, width, height).unwrap();

    for (a, b) in once.pixels.iter().zip(&twice.pixels) {
        assert!((*a as i16 - *b as i16).abs() <= 1);
    }
    let first = once.diagnostics.unwrap().post_histogram;
    let second = twice.diagnostics.unwrap().post_histogram;
    assert_eq!(first.occupied_bins(), second.occupied_bins());
}

#[test]
fn hue_survives_equalization() {
    // A reddish and a bluish pixel over a gray ramp keep their hue families.
    let mut pixels = gray_image(&[10, 30, 50, 70, 90, 110]);
    pixels.extend_from_slice(&[120, 40, 40, 255, 40, 40, 120, 255]);
    let equalized = equalizer(1).equalize(&pixels, 4, 2).unwrap();

    let hue_at = |buffer: &[u8], index: usize| {
        let offset = index * 4;
        rgb_to_hsl(RgbaPixel::new(
            buffer[offset],
            buffer[offset + 1],
            buffer[offset + 2],
            buffer[offset + 3],
        ))
        .hue
    };
    assert!((hue_at(&equalized.pixels, 6) - hue_at(&pixels, 6)).abs() <= 2);
    assert!((hue_at(&equalized.pixels, 7) - hue_at(&pixels, 7)).abs() <= 2);
}

#[test]
fn image_wrapper_round_trips_dimensions() {
    let mut image = RgbaImage::new(5, 3);
    for (x, y, pixel) in image.enumerate_pixels_mut() {
        let level = (x * 40 + y * 10) as u8;
        *pixel = Rgba([level, level, level, 128]);
    }
    let equalized = equalizer(2).equalize_image(&image).unwrap();
    assert_eq!(equalized.dimensions(), (5, 3));
    assert!(equalized.pixels().all(|pixel| pixel[3] == 255));
}
