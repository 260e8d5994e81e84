//! Inference memory estimation from a parameter-size summary
//!
//! Pure arithmetic: no I/O and no shared state, so every function here is
//! safe to call from any thread.

use serde::{Deserialize, Serialize};

use super::precision::PrecisionKind;
use crate::error::{Result, VramError};

/// Activation and framework overhead applied on top of raw parameter bytes
pub const INFERENCE_OVERHEAD: f64 = 1.2;

/// Bytes per gibibyte
pub const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Parameter byte sizes at the float32 reference width
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterSizeSummary {
    /// Bytes for every parameter, at 4 bytes per parameter
    pub total_size_bytes: f64,
    /// Bytes for the largest single layer, at 4 bytes per parameter
    pub largest_layer_size_bytes: f64,
    /// Name of the largest layer, when known
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub largest_layer_name: Option<String>,
}

impl ParameterSizeSummary {
    /// Create a summary without a largest-layer name
    #[must_use]
    pub fn new(total_size_bytes: f64, largest_layer_size_bytes: f64) -> Self {
        Self {
            total_size_bytes,
            largest_layer_size_bytes,
            largest_layer_name: None,
        }
    }

    /// Build a summary from element counts (4 bytes each)
    #[must_use]
    pub fn from_param_counts(total_params: u64, largest_layer_params: u64) -> Self {
        Self::new(total_params as f64 * 4.0, largest_layer_params as f64 * 4.0)
    }

    /// Attach the largest layer's name
    #[must_use]
    pub fn with_largest_layer_name(mut self, name: impl Into<String>) -> Self {
        self.largest_layer_name = Some(name.into());
        self
    }

    /// Parameter count implied by the float32 byte total
    #[must_use]
    pub fn param_count(&self) -> f64 {
        self.total_size_bytes / 4.0
    }

    /// Reject sizes that a successful resolution can never produce
    pub fn validate(&self) -> Result<()> {
        check_size("total_size_bytes", self.total_size_bytes)?;
        check_size("largest_layer_size_bytes", self.largest_layer_size_bytes)?;
        Ok(())
    }
}

fn check_size(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(VramError::invalid(format!(
            "invalid parameter size: {field} must be a finite non-negative number, got {value}"
        )));
    }
    Ok(())
}

/// Estimated memory for one precision
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MemoryEstimate {
    /// Precision the estimate applies to
    pub precision: PrecisionKind,
    /// Parameters plus inference overhead, in GiB
    pub inference_gib: f64,
    /// Largest single layer without overhead, in GiB
    pub largest_layer_gib: f64,
}

impl MemoryEstimate {
    /// Check if the whole model fits in `available_gib`
    #[must_use]
    pub fn fits_in(&self, available_gib: f64) -> bool {
        self.inference_gib <= available_gib
    }

    /// Check if the largest layer alone fits on one device of `device_gib`
    #[must_use]
    pub fn largest_layer_fits_in(&self, device_gib: f64) -> bool {
        self.largest_layer_gib <= device_gib
    }
}

/// Estimates in the order the precisions were requested
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryEstimates {
    estimates: Vec<MemoryEstimate>,
}

impl MemoryEstimates {
    /// Estimates, in request order
    #[must_use]
    pub fn as_slice(&self) -> &[MemoryEstimate] {
        &self.estimates
    }

    /// Iterate in request order
    pub fn iter(&self) -> std::slice::Iter<'_, MemoryEstimate> {
        self.estimates.iter()
    }

    /// Estimate for one precision
    #[must_use]
    pub fn get(&self, precision: PrecisionKind) -> Option<&MemoryEstimate> {
        self.estimates.iter().find(|e| e.precision == precision)
    }

    /// Number of estimates
    #[must_use]
    pub fn len(&self) -> usize {
        self.estimates.len()
    }

    /// True when no precision was estimated
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.estimates.is_empty()
    }

    /// (precision label, inference GiB) pairs in request order
    #[must_use]
    pub fn as_map(&self) -> Vec<(&'static str, f64)> {
        self.estimates
            .iter()
            .map(|e| (e.precision.label(), e.inference_gib))
            .collect()
    }
}

impl<'a> IntoIterator for &'a MemoryEstimates {
    type Item = &'a MemoryEstimate;
    type IntoIter = std::slice::Iter<'a, MemoryEstimate>;

    fn into_iter(self) -> Self::IntoIter {
        self.estimates.iter()
    }
}

/// Estimate inference memory for each requested precision
///
/// # Errors
///
/// `InvalidInput` when the summary holds a negative or non-finite size, or
/// when `precisions` is empty.
pub fn estimate(
    summary: &ParameterSizeSummary,
    precisions: &[PrecisionKind],
) -> Result<MemoryEstimates> {
    summary.validate()?;
    if precisions.is_empty() {
        return Err(VramError::invalid("at least one precision must be requested"));
    }

    let estimates = precisions
        .iter()
        .map(|&precision| {
            let divisor = f64::from(precision.divisor());
            let scaled_total = summary.total_size_bytes / divisor;
            let scaled_largest = summary.largest_layer_size_bytes / divisor;
            MemoryEstimate {
                precision,
                inference_gib: scaled_total * INFERENCE_OVERHEAD / BYTES_PER_GIB,
                largest_layer_gib: scaled_largest / BYTES_PER_GIB,
            }
        })
        .collect();

    Ok(MemoryEstimates { estimates })
}

/// Estimate for precisions given by name
///
/// All names are parsed before anything is computed, so an unknown name
/// yields an error and no estimates at all.
pub fn estimate_named<S: AsRef<str>>(
    summary: &ParameterSizeSummary,
    precisions: &[S],
) -> Result<MemoryEstimates> {
    let kinds = PrecisionKind::parse_all(precisions)?;
    estimate(summary, &kinds)
}

/// Estimate for all four precisions, widest first
pub fn estimate_all(summary: &ParameterSizeSummary) -> Result<MemoryEstimates> {
    estimate(summary, &PrecisionKind::ALL)
}
