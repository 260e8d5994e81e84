//! Precision kinds and their size divisors
//!
//! float32 is the reference width (4 bytes per parameter). Every other
//! precision packs parameters into a fixed fraction of that, expressed as a
//! divisor of the float32 byte count.

use serde::{Deserialize, Serialize};

use crate::error::{Result, VramError};

/// Numeric width used for parameters at inference time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum PrecisionKind {
    /// 32-bit float (reference)
    #[serde(rename = "float32")]
    Float32,
    /// 16-bit float or bfloat16
    #[serde(rename = "float16/bfloat16")]
    Float16OrBfloat16,
    /// 8-bit integer quantization
    #[serde(rename = "int8")]
    Int8,
    /// 4-bit integer quantization
    #[serde(rename = "int4")]
    Int4,
}

/// Divisor applied to float32 byte counts, in descending width order
pub const PRECISION_DIVISORS: [(PrecisionKind, u32); 4] = [
    (PrecisionKind::Float32, 1),
    (PrecisionKind::Float16OrBfloat16, 2),
    (PrecisionKind::Int8, 4),
    (PrecisionKind::Int4, 8),
];

impl PrecisionKind {
    /// Every precision, widest first
    pub const ALL: [PrecisionKind; 4] = [
        PrecisionKind::Float32,
        PrecisionKind::Float16OrBfloat16,
        PrecisionKind::Int8,
        PrecisionKind::Int4,
    ];

    /// Size divisor relative to float32
    #[must_use]
    pub fn divisor(self) -> u32 {
        PRECISION_DIVISORS
            .iter()
            .find(|(kind, _)| *kind == self)
            .map_or(1, |(_, divisor)| *divisor)
    }

    /// Bytes per parameter at this precision
    #[must_use]
    pub fn bytes_per_param(self) -> f64 {
        4.0 / f64::from(self.divisor())
    }

    /// Canonical label, as printed in tables and JSON
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::Float32 => "float32",
            Self::Float16OrBfloat16 => "float16/bfloat16",
            Self::Int8 => "int8",
            Self::Int4 => "int4",
        }
    }

    /// Parse every name, failing on the first unknown one
    pub fn parse_all<S: AsRef<str>>(names: &[S]) -> Result<Vec<Self>> {
        names.iter().map(|name| name.as_ref().parse()).collect()
    }
}

impl std::str::FromStr for PrecisionKind {
    type Err = VramError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "float32" | "fp32" | "f32" => Ok(Self::Float32),
            "float16/bfloat16" | "float16" | "bfloat16" | "fp16" | "bf16" | "f16" | "half" => {
                Ok(Self::Float16OrBfloat16)
            }
            "int8" | "i8" | "q8" => Ok(Self::Int8),
            "int4" | "i4" | "q4" => Ok(Self::Int4),
            _ => Err(VramError::invalid(format!(
                "unknown precision `{s}`. Valid precisions: float32, float16/bfloat16, int8, int4"
            ))),
        }
    }
}

impl std::fmt::Display for PrecisionKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}
