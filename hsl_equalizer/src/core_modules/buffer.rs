// Fallible allocation for every buffer the pipeline owns. A failed reservation is
// reported as `AllocationFailure` tagged with the stage that asked for it; whatever
// the caller already holds is released by ordinary drops as the error propagates.

use crate::error::{EqualizeError, Result};
use crate::pipeline::Stage;

/// Allocates a `Vec` of exactly `len` copies of `value`, or reports which stage failed.
pub fn try_filled<T: Clone>(len: usize, value: T, stage: Stage) -> Result<Vec<T>> {
    let mut buffer = Vec::new();
    buffer.try_reserve_exact(len).map_err(|_| EqualizeError::AllocationFailure {
        stage,
        bytes: len.saturating_mul(std::mem::size_of::<T>()),
    })?;
    buffer.resize(len, value);
    Ok(buffer)
}
