// THEORY:
// This file is the main entry point for the `hsl_equalizer` library crate.
// It defines the public API exposed to callers such as the `visual_tester` binary.
//
// The primary export is the `Equalizer` and its associated data structures
// (`EqualizerConfig`, `Equalized`, `Diagnostics`) as the high-level interface for
// histogram equalization. The numeric stages live in `core_modules`, each usable
// on its own: color conversion, histogram, CDF and normalization.

pub mod config;
pub mod core_modules;
pub mod error;
pub mod parallel_pipeline;
pub mod pipeline;

pub use config::{EqualizerConfig, ScanStrategy};
pub use core_modules::histogram::N_BINS;
pub use error::{EqualizeError, Result};
pub use parallel_pipeline::{EqualizerService, ImageFrame};
pub use pipeline::{Diagnostics, Equalized, Equalizer, Stage, StageTimings};
