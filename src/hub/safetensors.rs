//! Weight-free parameter layout from safetensors headers.
//!
//! A safetensors file starts with an 8-byte little-endian header length
//! followed by a JSON header describing every tensor. Two range reads per
//! shard are enough to count every parameter without touching weights.

use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use tracing::debug;

use super::repo_id::RepoId;
use super::transport::{HubTransport, RepoInfo};
use crate::error::{Result, VramError};
use crate::estimate::ParameterSizeSummary;

/// Index file listing the shards of a sharded checkpoint
pub const SHARD_INDEX_FILE: &str = "model.safetensors.index.json";

/// Headers larger than this are corrupt
pub const MAX_HEADER_SIZE: u64 = 100_000_000;

/// Bytes per parameter at the float32 reference width
const REFERENCE_BYTES_PER_PARAM: f64 = 4.0;

/// One tensor entry of a safetensors header
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TensorEntry {
    /// Stored dtype (`F16`, `BF16`, `F32`, ...)
    pub dtype: String,
    /// Tensor shape
    pub shape: Vec<u64>,
    /// Byte range inside the data section
    #[serde(default)]
    pub data_offsets: [u64; 2],
}

impl TensorEntry {
    /// Number of elements, `None` when the shape overflows `u64`
    #[must_use]
    pub fn num_elements(&self) -> Option<u64> {
        self.shape.iter().try_fold(1u64, |acc, &d| acc.checked_mul(d))
    }
}

#[derive(Deserialize)]
struct ShardIndex {
    weight_map: HashMap<String, String>,
}

/// Parse a header's JSON body, skipping `__metadata__`
pub fn parse_header(repo: &RepoId, file: &str, json: &[u8]) -> Result<BTreeMap<String, TensorEntry>> {
    let raw: BTreeMap<String, serde_json::Value> = serde_json::from_slice(json)
        .map_err(|e| VramError::load(repo.as_str(), format!("invalid safetensors header in `{file}`: {e}")))?;

    raw.into_iter()
        .filter(|(name, _)| name != "__metadata__")
        .map(|(name, value)| {
            let entry: TensorEntry = serde_json::from_value(value).map_err(|e| {
                VramError::load(
                    repo.as_str(),
                    format!("invalid tensor `{name}` in `{file}`: {e}"),
                )
            })?;
            Ok((name, entry))
        })
        .collect()
}

/// Read one file's header with two range requests
pub fn read_header<T: HubTransport + ?Sized>(
    transport: &T,
    repo: &RepoId,
    file: &str,
) -> Result<BTreeMap<String, TensorEntry>> {
    let prefix = transport.fetch_range(repo, file, 0, 8)?;
    let len_bytes: [u8; 8] = prefix.as_slice().try_into().map_err(|_| {
        VramError::load(repo.as_str(), format!("`{file}` is too short to be a safetensors file"))
    })?;
    let header_len = u64::from_le_bytes(len_bytes);
    if header_len == 0 || header_len > MAX_HEADER_SIZE {
        return Err(VramError::load(
            repo.as_str(),
            format!("`{file}` declares an invalid safetensors header length of {header_len} bytes"),
        ));
    }

    debug!(file, header_len, "reading safetensors header");
    let json = transport.fetch_range(repo, file, 8, header_len)?;
    if json.len() as u64 != header_len {
        return Err(VramError::load(
            repo.as_str(),
            format!(
                "`{file}` header truncated: expected {header_len} bytes, got {}",
                json.len()
            ),
        ));
    }
    parse_header(repo, file, &json)
}

/// Safetensors files holding the weights, or empty when there are none
pub fn weight_files<T: HubTransport + ?Sized>(
    transport: &T,
    repo: &RepoId,
    info: &RepoInfo,
) -> Result<Vec<String>> {
    if info.has_file(SHARD_INDEX_FILE) {
        let body = transport.fetch_file(repo, SHARD_INDEX_FILE)?;
        let index: ShardIndex = serde_json::from_slice(&body).map_err(|e| {
            VramError::load(repo.as_str(), format!("invalid `{SHARD_INDEX_FILE}`: {e}"))
        })?;
        let shards: BTreeSet<String> = index.weight_map.into_values().collect();
        return Ok(shards.into_iter().collect());
    }

    let mut files: Vec<String> = info
        .files
        .iter()
        .filter(|f| !f.contains('/') && f.ends_with(".safetensors"))
        .cloned()
        .collect();
    files.sort();
    Ok(files)
}

/// Layer a tensor belongs to
///
/// Names with a numeric segment group under the prefix through that segment
/// (`model.layers.3.mlp.up_proj.weight` → `model.layers.3`); other names
/// group under their parent module (`model.embed_tokens.weight` →
/// `model.embed_tokens`).
#[must_use]
pub fn layer_key(tensor_name: &str) -> &str {
    let mut end = 0;
    for segment in tensor_name.split('.') {
        end += segment.len();
        if !segment.is_empty() && segment.bytes().all(|b| b.is_ascii_digit()) {
            return &tensor_name[..end];
        }
        end += 1;
    }
    tensor_name
        .rsplit_once('.')
        .map_or(tensor_name, |(parent, _)| parent)
}

/// Parameter counts accumulated across one or more headers
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterLayout {
    /// Total element count
    pub total_params: u64,
    /// Number of tensors seen
    pub tensor_count: usize,
    /// Number of weight files read
    pub file_count: usize,
    /// Element count per layer
    pub layers: BTreeMap<String, u64>,
    /// Element count per stored dtype
    pub dtypes: BTreeMap<String, u64>,
}

impl ParameterLayout {
    /// Create an empty layout
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add one tensor
    ///
    /// # Errors
    ///
    /// `LoadError` when the shape or a running count overflows `u64`; the
    /// layout is left unchanged.
    pub fn add_tensor(&mut self, repo: &RepoId, name: &str, entry: &TensorEntry) -> Result<()> {
        let overflow = || {
            VramError::load(
                repo.as_str(),
                format!("parameter count overflows at tensor `{name}`"),
            )
        };
        let key = layer_key(name);

        let params = entry.num_elements().ok_or_else(overflow)?;
        let total = self.total_params.checked_add(params).ok_or_else(overflow)?;
        let layer = self
            .layers
            .get(key)
            .copied()
            .unwrap_or(0)
            .checked_add(params)
            .ok_or_else(overflow)?;
        let dtype = self
            .dtypes
            .get(&entry.dtype)
            .copied()
            .unwrap_or(0)
            .checked_add(params)
            .ok_or_else(overflow)?;

        self.total_params = total;
        self.tensor_count += 1;
        self.layers.insert(key.to_string(), layer);
        self.dtypes.insert(entry.dtype.clone(), dtype);
        Ok(())
    }

    /// Add every tensor of a header
    pub fn add_header(&mut self, repo: &RepoId, header: &BTreeMap<String, TensorEntry>) -> Result<()> {
        for (name, entry) in header {
            self.add_tensor(repo, name, entry)?;
        }
        Ok(())
    }

    /// Largest layer by element count (first by name on ties)
    #[must_use]
    pub fn largest_layer(&self) -> Option<(&str, u64)> {
        self.layers
            .iter()
            .fold(None, |best: Option<(&str, u64)>, (name, &params)| match best {
                Some((_, best_params)) if best_params >= params => best,
                _ => Some((name.as_str(), params)),
            })
    }

    /// Stored dtype holding the most parameters
    #[must_use]
    pub fn dominant_dtype(&self) -> Option<&str> {
        self.dtypes
            .iter()
            .max_by_key(|(_, count)| **count)
            .map(|(dtype, _)| dtype.as_str())
    }

    /// Float32-reference byte summary
    #[must_use]
    pub fn summary(&self) -> ParameterSizeSummary {
        let total = self.total_params as f64 * REFERENCE_BYTES_PER_PARAM;
        match self.largest_layer() {
            Some((name, params)) => {
                ParameterSizeSummary::new(total, params as f64 * REFERENCE_BYTES_PER_PARAM)
                    .with_largest_layer_name(name)
            }
            None => ParameterSizeSummary::new(total, 0.0),
        }
    }
}

/// Read every weight file's header into one layout
///
/// Returns `None` when the repository has no safetensors weights.
pub fn read_layout<T: HubTransport + ?Sized>(
    transport: &T,
    repo: &RepoId,
    info: &RepoInfo,
) -> Result<Option<ParameterLayout>> {
    let files = weight_files(transport, repo, info)?;
    if files.is_empty() {
        return Ok(None);
    }

    let mut layout = ParameterLayout::new();
    for file in &files {
        let header = read_header(transport, repo, file)?;
        layout.add_header(repo, &header)?;
        layout.file_count += 1;
    }
    debug!(
        shards = files.len(),
        tensors = layout.tensor_count,
        params = layout.total_params,
        "parameter layout read"
    );
    Ok(Some(layout))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn entry(dtype: &str, shape: &[u64]) -> TensorEntry {
        TensorEntry {
            dtype: dtype.into(),
            shape: shape.to_vec(),
            data_offsets: [0, 0],
        }
    }

    #[test]
    fn test_layer_key_numeric_block() {
        assert_eq!(layer_key("model.layers.3.mlp.up_proj.weight"), "model.layers.3");
        assert_eq!(layer_key("transformer.h.11.attn.c_attn.bias"), "transformer.h.11");
        assert_eq!(layer_key("blocks.0.weight"), "blocks.0");
    }

    #[test]
    fn test_layer_key_plain_module() {
        assert_eq!(layer_key("model.embed_tokens.weight"), "model.embed_tokens");
        assert_eq!(layer_key("lm_head.weight"), "lm_head");
        assert_eq!(layer_key("wte"), "wte");
    }

    #[test]
    fn test_num_elements() {
        assert_eq!(entry("F16", &[4096, 11008]).num_elements(), Some(45_088_768));
        assert_eq!(entry("F32", &[]).num_elements(), Some(1));
        assert_eq!(entry("F32", &[u64::MAX / 2, 4]).num_elements(), None);
    }

    #[test]
    fn test_parse_header_skips_metadata() {
        let repo = RepoId::parse("org/m").unwrap();
        let json = br#"{
            "__metadata__": {"format": "pt"},
            "a.weight": {"dtype": "F16", "shape": [2, 3], "data_offsets": [0, 12]}
        }"#;
        let header = parse_header(&repo, "model.safetensors", json).unwrap();
        assert_eq!(header.len(), 1);
        assert_eq!(header["a.weight"].shape, vec![2, 3]);
    }

    #[test]
    fn test_parse_header_rejects_garbage() {
        let repo = RepoId::parse("org/m").unwrap();
        assert!(parse_header(&repo, "x.safetensors", b"not json").is_err());
        let bad_tensor = br#"{"a": {"dtype": "F16"}}"#;
        assert!(parse_header(&repo, "x.safetensors", bad_tensor).is_err());
    }

    #[test]
    fn test_layout_summary() {
        let repo = RepoId::parse("org/m").unwrap();
        let mut layout = ParameterLayout::new();
        for (name, dtype, shape) in [
            ("model.embed_tokens.weight", "BF16", &[1000u64, 10][..]),
            ("model.layers.0.q.weight", "BF16", &[10, 10][..]),
            ("model.layers.0.k.weight", "BF16", &[10, 10][..]),
            ("model.layers.1.q.weight", "BF16", &[10, 10][..]),
            ("model.norm.weight", "F32", &[10][..]),
        ] {
            layout.add_tensor(&repo, name, &entry(dtype, shape)).unwrap();
        }

        assert_eq!(layout.total_params, 10_000 + 300 + 10);
        assert_eq!(layout.tensor_count, 5);
        assert_eq!(layout.largest_layer(), Some(("model.embed_tokens", 10_000)));
        assert_eq!(layout.dominant_dtype(), Some("BF16"));

        let summary = layout.summary();
        assert_eq!(summary.total_size_bytes, 41_240.0);
        assert_eq!(summary.largest_layer_size_bytes, 40_000.0);
        assert_eq!(summary.largest_layer_name.as_deref(), Some("model.embed_tokens"));
    }

    #[test]
    fn test_empty_layout_summary() {
        let summary = ParameterLayout::new().summary();
        assert_eq!(summary.total_size_bytes, 0.0);
        assert_eq!(summary.largest_layer_size_bytes, 0.0);
        assert!(summary.largest_layer_name.is_none());
    }

    #[test]
    fn test_overflowing_shape_is_load_error() {
        let repo = RepoId::parse("org/m").unwrap();
        let mut layout = ParameterLayout::new();
        layout
            .add_tensor(&repo, "a.weight", &entry("F32", &[10, 10]))
            .unwrap();

        let err = layout
            .add_tensor(&repo, "b.weight", &entry("F32", &[u64::MAX / 2, 4]))
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::LoadError);
        assert!(err.to_string().contains("parameter count overflows"));
        // Rejected tensor leaves the layout untouched
        assert_eq!(layout.total_params, 100);
        assert_eq!(layout.tensor_count, 1);
    }

    #[test]
    fn test_overflowing_total_is_load_error() {
        let repo = RepoId::parse("org/m").unwrap();
        let mut layout = ParameterLayout::new();
        layout
            .add_tensor(&repo, "model.layers.0.w", &entry("F32", &[u64::MAX / 2, 2]))
            .unwrap();
        let err = layout
            .add_tensor(&repo, "model.layers.1.w", &entry("F32", &[u64::MAX / 2, 2]))
            .unwrap_err();
        assert_eq!(err.kind(), crate::error::ErrorKind::LoadError);
        assert_eq!(layout.tensor_count, 1);
    }
}
