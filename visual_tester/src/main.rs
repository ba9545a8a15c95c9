use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use hsl_equalizer::core_modules::utils::image_helper;
use hsl_equalizer::{Equalizer, EqualizerConfig, ScanStrategy};
use log::info;

const PLOT_WIDTH: u32 = 1024;
const PLOT_HEIGHT: u32 = 512;

/// Histogram-equalize an image in HSL space
#[derive(Parser, Debug)]
#[command(version, about, long_about = None, arg_required_else_help = true)]
struct Cli {
    /// Image to equalize
    input: PathBuf,

    /// Where to write the equalized image; format follows the extension
    output: PathBuf,

    /// Worker threads (defaults to HSL_EQ_THREADS, then the CPU count)
    #[arg(short = 't', long)]
    threads: Option<usize>,

    /// Prefix-scan algorithm for the CDF: auto, sequential or hillis-steele
    #[arg(long, default_value_t = ScanStrategy::Auto)]
    scan: ScanStrategy,

    /// Log every histogram, CDF and normalized CDF bin
    #[arg(long, default_value_t = false)]
    log_histogram: bool,

    /// Write a PNG plot of the input and equalized histograms
    #[arg(long)]
    plot: Option<PathBuf>,

    /// Log how long each stage takes
    #[arg(long, default_value_t = false)]
    trace_step_times: bool,

    /// Default the log level to debug instead of info
    #[arg(short, long, default_value_t = false)]
    verbose: bool,
}

/// `--threads` wins over `HSL_EQ_THREADS`, which is only read when the flag is absent.
fn build_config(args: &Cli) -> anyhow::Result<EqualizerConfig> {
    let base = match args.threads {
        Some(threads) => EqualizerConfig::default().with_threads(threads),
        None => EqualizerConfig::from_env()?,
    };
    Ok(base
        .with_scan(args.scan)
        .with_log_histogram(args.log_histogram)
        .with_diagnostics(args.plot.is_some())
        .with_step_times(args.trace_step_times))
}

fn main() -> anyhow::Result<()> {
    let args = Cli::parse();

    let default_level = if args.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    // --- 1. Configuration ---
    let config = build_config(&args)?;
    info!("Using {} worker threads, {} scan", config.threads, config.scan);

    // --- 2. Decode ---
    let image = image_helper::load_rgba(&args.input)
        .with_context(|| format!("failed to read {}", args.input.display()))?;
    info!("Loaded {} ({}x{})", args.input.display(), image.width(), image.height());

    // --- 3. Equalize ---
    let equalizer = Equalizer::new(config)?;
    let equalized = equalizer.equalize(image.as_raw(), image.width(), image.height())?;

    if let Some(timings) = &equalized.timings {
        for timing in &timings.stages {
            info!("{}: {:?}", timing.stage, timing.elapsed);
        }
        info!("Total: {:?}", timings.total());
    }

    // --- 4. Encode ---
    image_helper::save(
        &args.output,
        equalized.width,
        equalized.height,
        &equalized.pixels,
    )
    .with_context(|| format!("failed to write {}", args.output.display()))?;
    info!("Equalized image saved to {}", args.output.display());

    // --- 5. Optional before/after plot ---
    if let (Some(plot_path), Some(diagnostics)) = (&args.plot, &equalized.diagnostics) {
        let plot = image_helper::render_histogram_plot(
            &diagnostics.histogram,
            &diagnostics.post_histogram,
            PLOT_WIDTH,
            PLOT_HEIGHT,
        );
        image_helper::save_png(plot_path, &plot)
            .with_context(|| format!("failed to write {}", plot_path.display()))?;
        info!("Histogram plot saved to {}", plot_path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use hsl_equalizer::config::THREADS_ENV_VAR;

    #[test]
    fn thread_flag_overrides_environment() {
        // Only test in this binary that touches the process environment.
        unsafe { std::env::set_var(THREADS_ENV_VAR, "not-a-number") };

        let flagged =
            Cli::try_parse_from(["visual_tester", "in.jpg", "out.jpg", "--threads", "3"]).unwrap();
        let config = build_config(&flagged).unwrap();
        assert_eq!(config.threads, 3);

        let unflagged = Cli::try_parse_from(["visual_tester", "in.jpg", "out.jpg"]).unwrap();
        assert!(build_config(&unflagged).is_err());

        unsafe { std::env::remove_var(THREADS_ENV_VAR) };
    }

    #[test]
    fn plot_flag_turns_on_diagnostics() {
        let args = Cli::try_parse_from([
            "visual_tester",
            "in.png",
            "out.png",
            "--threads",
            "1",
            "--scan",
            "hillis-steele",
            "--plot",
            "plot.png",
        ])
        .unwrap();
        let config = build_config(&args).unwrap();
        assert!(config.collect_diagnostics);
        assert_eq!(config.scan, ScanStrategy::HillisSteele);
    }
}
