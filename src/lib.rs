//! # vram-calculator
//!
//! Inference memory estimates for Hugging Face Hub models at float32,
//! float16/bfloat16, int8 and int4, computed from configuration files and
//! safetensors headers only.
//!
//! - [`mod@estimate`]: pure arithmetic from a [`ParameterSizeSummary`] to GiB
//! - [`hub`]: identifier normalization and weight-free model resolution
//! - [`cli`] and [`config`]: the `vram-calculator` binary
//!
//! ```
//! use vram_calculator::{estimate_all, ParameterSizeSummary, PrecisionKind};
//!
//! let summary = ParameterSizeSummary::new(14_000_000_000.0, 0.0);
//! let estimates = estimate_all(&summary).unwrap();
//! let int4 = estimates.get(PrecisionKind::Int4).unwrap();
//! assert!((int4.inference_gib - 1.9557774066925049).abs() < 1e-12);
//! ```

#![allow(clippy::module_name_repetitions)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_possible_truncation)]

pub mod cli;
pub mod config;
pub mod error;
pub mod estimate;
pub mod hub;

pub use error::{ErrorKind, Result, VramError};
pub use estimate::{
    estimate, estimate_all, estimate_named, MemoryEstimate, MemoryEstimates, ParameterSizeSummary,
    PrecisionKind,
};
pub use hub::{HubOptions, HubTransport, ModelReport, ModelResolver, ResolvedModel};
