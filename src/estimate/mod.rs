//! Memory estimation core
//!
//! Maps a [`ParameterSizeSummary`] (float32-reference byte sizes) to
//! per-precision inference memory in GiB:
//!
//! ```text
//! inference_gib = total_size_bytes / divisor(precision) * 1.2 / 2^30
//! ```
//!
//! # Example
//!
//! ```
//! use vram_calculator::estimate::{estimate, ParameterSizeSummary, PrecisionKind};
//!
//! let summary = ParameterSizeSummary::new(14_000_000_000.0, 1_000_000_000.0);
//! let estimates = estimate(&summary, &[PrecisionKind::Float32, PrecisionKind::Int4]).unwrap();
//! assert!(estimates.as_slice()[0].inference_gib > estimates.as_slice()[1].inference_gib);
//! ```

mod memory;
mod precision;


pub use memory::{
    estimate, estimate_all, estimate_named, MemoryEstimate, MemoryEstimates, ParameterSizeSummary,
    BYTES_PER_GIB, INFERENCE_OVERHEAD,
};
pub use precision::{PrecisionKind, PRECISION_DIVISORS};
