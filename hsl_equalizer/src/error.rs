//! Error types for the equalization pipeline.

use thiserror::Error;

use crate::pipeline::Stage;

/// Result type alias for equalizer operations
pub type Result<T> = std::result::Result<T, EqualizeError>;

/// Every way an equalization call can fail. A failed call never returns an output buffer.
#[derive(Error, Debug)]
pub enum EqualizeError {
    /// Rejected before any allocation: zero dimensions, wrong buffer length, bad config.
    #[error("Invalid argument: {parameter} ({reason})")]
    InvalidArgument {
        parameter: &'static str,
        reason: String,
    },

    /// A buffer reservation failed. Everything allocated earlier in the call is released.
    #[error("Allocation of {bytes} bytes failed while {stage}")]
    AllocationFailure { stage: Stage, bytes: usize },

    /// The normalization divisor is zero: every pixel falls in lightness bin 0.
    #[error("Degenerate image: all {total_pixels} pixels share the first lightness bin ({first_bin_count})")]
    DegenerateImage {
        total_pixels: u32,
        first_bin_count: u32,
    },

    /// The worker pool could not be built.
    #[error("Failed to build worker pool: {0}")]
    ThreadPool(#[from] rayon::ThreadPoolBuildError),

    /// Image decode or encode failed in the file helpers.
    #[error("Image error: {0}")]
    Image(#[from] image::ImageError),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The asynchronous front-end has shut down.
    #[error("Equalizer service is no longer running")]
    ServiceClosed,
}

impl EqualizeError {
    pub(crate) fn invalid(parameter: &'static str, reason: impl Into<String>) -> Self {
        Self::InvalidArgument {
            parameter,
            reason: reason.into(),
        }
    }

    /// The pipeline stage the error originated in, where one applies.
    pub fn stage(&self) -> Option<Stage> {
        match self {
            EqualizeError::InvalidArgument { .. } => Some(Stage::Validating),
            EqualizeError::AllocationFailure { stage, .. } => Some(*stage),
            EqualizeError::DegenerateImage { .. } => Some(Stage::Normalizing),
            _ => None,
        }
    }

    /// Whether later calls can still succeed after this one failed.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, EqualizeError::ServiceClosed)
    }
}
