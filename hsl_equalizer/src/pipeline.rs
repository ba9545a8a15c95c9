// THEORY:
// The `pipeline` module is the top-level API for the equalizer. It owns the worker pool
// and walks one image through the fixed sequence of stages:
//
//     Validating -> ConvertingToHsl -> BuildingHistogram -> ComputingCdf
//         -> Normalizing -> Remapping -> ConvertingToRgb -> Done
//
// with `Failed` reachable from any of them.
//
// Key architectural principles:
// 1.  **Validate before allocating**: dimensions and buffer length are checked first,
//     so a rejected call creates no state at all.
// 2.  **Scoped ownership**: every intermediate (HSL planes, histogram, CDF, table,
//     output) is an owned value local to `run`. Any `?` drops exactly what has been
//     acquired so far; there is no separate cleanup path to get wrong.
// 3.  **Stage barriers**: parallel stages are rayon iterators installed on our own pool.
//     Each returns only once every worker has finished, so the histogram never sees a
//     half-converted lightness plane and the remap never sees a partial table.
// 4.  **Single-threaded bookkeeping**: allocations, the sequential scan and the table
//     computation run once on the calling worker, never per worker.

use std::fmt;
use std::ops::RangeInclusive;
use std::time::{Duration, Instant};

use image::RgbaImage;
use log::{debug, info, warn};
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::config::EqualizerConfig;
use crate::core_modules::buffer::try_filled;
use crate::core_modules::cdf::Cdf;
use crate::core_modules::histogram::{Histogram, N_BINS};
use crate::core_modules::hsl_image::HslImage;
use crate::core_modules::normalizer::NormalizedCdf;
use crate::core_modules::pixel::pixel::CHANNELS;
use crate::error::{EqualizeError, Result};

/// The states an equalization call moves through.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Stage {
    Validating,
    ConvertingToHsl,
    BuildingHistogram,
    ComputingCdf,
    Normalizing,
    Remapping,
    ConvertingToRgb,
    Done,
    Failed,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Validating => "validating",
            Stage::ConvertingToHsl => "converting to HSL",
            Stage::BuildingHistogram => "building histogram",
            Stage::ComputingCdf => "computing CDF",
            Stage::Normalizing => "normalizing",
            Stage::Remapping => "remapping",
            Stage::ConvertingToRgb => "converting to RGB",
            Stage::Done => "done",
            Stage::Failed => "failed",
        };
        f.write_str(name)
    }
}

/// Wall-clock duration of one completed stage.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StageTiming {
    pub stage: Stage,
    pub elapsed: Duration,
}

/// Per-stage durations of a successful call, in execution order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageTimings {
    pub stages: Vec<StageTiming>,
}

impl StageTimings {
    pub fn get(&self, stage: Stage) -> Option<Duration> {
        self.stages
            .iter()
            .find(|timing| timing.stage == stage)
            .map(|timing| timing.elapsed)
    }

    pub fn total(&self) -> Duration {
        self.stages.iter().map(|timing| timing.elapsed).sum()
    }
}

/// The lookup chain of one call plus the histogram of the equalized lightness.
/// `histogram` and `post_histogram` are what a before/after plot needs.
#[derive(Debug, Clone, PartialEq)]
pub struct Diagnostics {
    pub histogram: Histogram,
    pub post_histogram: Histogram,
    pub cdf: Cdf,
    pub normalized_cdf: NormalizedCdf,
}

impl Diagnostics {
    /// The bin index range both histograms are plotted over.
    pub fn bin_range(&self) -> RangeInclusive<usize> {
        0..=N_BINS - 1
    }
}

/// The primary output of the equalizer: a new opaque RGBA8 image of the input's size.
#[derive(Debug, Clone)]
pub struct Equalized {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
    /// Present when `collect_diagnostics` is set.
    pub diagnostics: Option<Diagnostics>,
    /// Present when `trace_step_times` is set.
    pub timings: Option<StageTimings>,
}

/// Records stage transitions, logging each one and timing them when asked to.
struct StageTracker {
    current: Stage,
    started: Option<Instant>,
    timings: Option<StageTimings>,
}

impl StageTracker {
    fn new(trace_step_times: bool) -> Self {
        Self {
            current: Stage::Validating,
            started: trace_step_times.then(Instant::now),
            timings: trace_step_times.then(StageTimings::default),
        }
    }

    fn enter(&mut self, stage: Stage) {
        self.close_current();
        self.current = stage;
        info!("Starting {}..", stage);
    }

    fn close_current(&mut self) {
        if let (Some(started), Some(timings)) = (self.started.as_mut(), self.timings.as_mut()) {
            let elapsed = started.elapsed();
            debug!("Step '{}' time: {:?}", self.current, elapsed);
            timings.stages.push(StageTiming {
                stage: self.current,
                elapsed,
            });
            *started = Instant::now();
        }
    }

    fn finish(&mut self) -> Option<StageTimings> {
        self.close_current();
        self.current = Stage::Done;
        self.timings.take()
    }

    /// Moves to `Failed` and returns the stage that was running.
    fn fail(&mut self) -> Stage {
        let failed_in = self.current;
        self.current = Stage::Failed;
        failed_in
    }
}

/// The main, top-level struct for the equalizer: configuration plus its worker pool.
pub struct Equalizer {
    config: EqualizerConfig,
    pool: ThreadPool,
}

impl Equalizer {
    /// Builds a pool of `config.threads` workers. Rejects a zero thread count.
    pub fn new(config: EqualizerConfig) -> Result<Self> {
        config.validate()?;
        let pool = ThreadPoolBuilder::new()
            .num_threads(config.threads)
            .thread_name(|index| format!("hsl-eq-worker-{index}"))
            .build()?;
        Ok(Self { config, pool })
    }

    pub fn config(&self) -> &EqualizerConfig {
        &self.config
    }

    /// Equalizes a packed RGBA8 buffer of `width * height` pixels.
    ///
    /// On success the caller owns a new buffer of the same size with alpha forced to
    /// 255. On failure nothing allocated by the call survives.
    pub fn equalize(&self, input: &[u8], width: u32, height: u32) -> Result<Equalized> {
        self.pool.install(|| self.run(input, width, height))
    }

    /// Convenience wrapper over `equalize` for `image` buffers.
    pub fn equalize_image(&self, image: &RgbaImage) -> Result<RgbaImage> {
        let equalized = self.equalize(image.as_raw(), image.width(), image.height())?;
        RgbaImage::from_raw(equalized.width, equalized.height, equalized.pixels)
            .ok_or_else(|| EqualizeError::invalid("output", "buffer does not match dimensions"))
    }

    fn run(&self, input: &[u8], width: u32, height: u32) -> Result<Equalized> {
        let mut tracker = StageTracker::new(self.config.trace_step_times);
        let result = self.run_stages(&mut tracker, input, width, height);
        if let Err(e) = &result {
            let failed_in = tracker.fail();
            warn!(
                "Equalization of {}x{} image failed while {}: {}",
                width, height, failed_in, e
            );
        }
        result
    }

    fn run_stages(
        &self,
        tracker: &mut StageTracker,
        input: &[u8],
        width: u32,
        height: u32,
    ) -> Result<Equalized> {
        // Stage 0: Validation
        let total_pixels = validate_dimensions(input.len(), width, height)?;

        // Stage 1: RGB -> HSL, parallel over pixels
        tracker.enter(Stage::ConvertingToHsl);
        let mut hsl_image = HslImage::try_from_rgba(input)?;

        // Stage 2: Lightness histogram, per-worker partials merged
        tracker.enter(Stage::BuildingHistogram);
        let histogram = Histogram::from_lightness(hsl_image.lightness());

        // Stage 3: Cumulative distribution
        tracker.enter(Stage::ComputingCdf);
        let strategy = self.config.scan.resolve(N_BINS, self.config.threads);
        debug!("Using {} prefix scan", strategy);
        let cdf = Cdf::compute(&histogram, strategy)?;

        // Stage 4: Lookup table
        tracker.enter(Stage::Normalizing);
        let normalized_cdf = NormalizedCdf::from_cdf(&cdf, total_pixels)?;

        // Stage 5: Apply the table to every lightness value
        tracker.enter(Stage::Remapping);
        hsl_image.remap_lightness(&normalized_cdf);

        // Stage 6: HSL -> RGB into a fresh output buffer
        tracker.enter(Stage::ConvertingToRgb);
        let mut pixels = try_filled(input.len(), 0u8, Stage::ConvertingToRgb)?;
        hsl_image.write_rgba(&mut pixels);

        let timings = tracker.finish();

        if self.config.log_histogram {
            log_tables(&histogram, &cdf, &normalized_cdf);
        }

        let diagnostics = self.config.collect_diagnostics.then(|| {
            info!("Starting post processed histogram calculation..");
            Diagnostics {
                post_histogram: Histogram::from_lightness(hsl_image.lightness()),
                histogram,
                cdf,
                normalized_cdf,
            }
        });

        Ok(Equalized {
            width,
            height,
            pixels,
            diagnostics,
            timings,
        })
    }
}

/// Checks dimensions against the buffer and returns the pixel count.
fn validate_dimensions(len: usize, width: u32, height: u32) -> Result<u32> {
    if width == 0 {
        return Err(EqualizeError::invalid("width", "must be positive"));
    }
    if height == 0 {
        return Err(EqualizeError::invalid("height", "must be positive"));
    }
    let total_pixels = width.checked_mul(height).ok_or_else(|| {
        EqualizeError::invalid(
            "dimensions",
            format!("{width}x{height} overflows the 32-bit pixel counters"),
        )
    })?;
    let expected = (total_pixels as usize)
        .checked_mul(CHANNELS)
        .ok_or_else(|| EqualizeError::invalid("dimensions", "byte length overflows usize"))?;
    if len != expected {
        return Err(EqualizeError::invalid(
            "input",
            format!("expected {expected} bytes for {width}x{height} RGBA, got {len}"),
        ));
    }
    Ok(total_pixels)
}

fn log_tables(histogram: &Histogram, cdf: &Cdf, normalized_cdf: &NormalizedCdf) {
    info!("Printing histogram..");
    for (bin, count) in histogram.bins().iter().enumerate() {
        info!("{}:{}", bin, count);
    }

    info!("Printing cdf..");
    for (bin, count) in cdf.values().iter().enumerate() {
        info!("{}:{}", bin, count);
    }

    info!("Printing normalized cdf..");
    for (bin, value) in normalized_cdf.values().iter().enumerate() {
        info!("{}:{}", bin, value);
    }
}
