// Explicit configuration for an `Equalizer`. Nothing here is read from globals at
// equalization time; `from_env` is a one-shot constructor for binaries.

use std::env;

pub use crate::core_modules::cdf::ScanStrategy;
use crate::error::{EqualizeError, Result};

/// Environment variable consulted by `EqualizerConfig::from_env` for the worker count.
pub const THREADS_ENV_VAR: &str = "HSL_EQ_THREADS";

/// Configuration for the Equalizer, allowing for tunable behavior.
#[derive(Debug, Clone, PartialEq)]
pub struct EqualizerConfig {
    /// Number of worker threads in the fork-join pool. Must be at least 1.
    pub threads: usize,
    /// Prefix-scan algorithm for the CDF stage.
    pub scan: ScanStrategy,
    /// Log every bin of the histogram, CDF and normalized CDF at `info` level.
    pub log_histogram: bool,
    /// Return the input and post-equalization histograms alongside the image,
    /// for plotting by the caller.
    pub collect_diagnostics: bool,
    /// Time each stage and return the durations.
    pub trace_step_times: bool,
}

impl Default for EqualizerConfig {
    fn default() -> Self {
        Self {
            threads: num_cpus::get().max(1),
            scan: ScanStrategy::default(),
            log_histogram: false,
            collect_diagnostics: false,
            trace_step_times: false,
        }
    }
}

impl EqualizerConfig {
    /// Defaults, with the thread count overridden by `HSL_EQ_THREADS` when set.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        if let Some(threads) = read_threads_from_env()? {
            config.threads = threads;
        }
        Ok(config)
    }

    pub fn with_threads(mut self, threads: usize) -> Self {
        self.threads = threads;
        self
    }

    pub fn with_scan(mut self, scan: ScanStrategy) -> Self {
        self.scan = scan;
        self
    }

    pub fn with_log_histogram(mut self, enabled: bool) -> Self {
        self.log_histogram = enabled;
        self
    }

    pub fn with_diagnostics(mut self, enabled: bool) -> Self {
        self.collect_diagnostics = enabled;
        self
    }

    pub fn with_step_times(mut self, enabled: bool) -> Self {
        self.trace_step_times = enabled;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.threads == 0 {
            return Err(EqualizeError::invalid("threads", "must be >= 1"));
        }
        Ok(())
    }
}

fn read_threads_from_env() -> Result<Option<usize>> {
    let raw = match env::var(THREADS_ENV_VAR) {
        Ok(value) => value,
        Err(env::VarError::NotPresent) => return Ok(None),
        Err(e) => {
            return Err(EqualizeError::invalid(
                "threads",
                format!("failed to read {THREADS_ENV_VAR}: {e}"),
            ));
        }
    };
    parse_threads(&raw).map(Some)
}

fn parse_threads(raw: &str) -> Result<usize> {
    let parsed: usize = raw.trim().parse().map_err(|_| {
        EqualizeError::invalid(
            "threads",
            format!("{THREADS_ENV_VAR} must be a positive integer, got '{raw}'"),
        )
    })?;
    if parsed == 0 {
        return Err(EqualizeError::invalid(
            "threads",
            format!("{THREADS_ENV_VAR} must be >= 1"),
        ));
    }
    Ok(parsed)
}
