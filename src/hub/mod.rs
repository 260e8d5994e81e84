//! Hugging Face Hub model resolution
//!
//! Turns a model identifier (or hub URL) into a
//! [`ParameterSizeSummary`](crate::estimate::ParameterSizeSummary) plus the
//! metadata reported alongside memory estimates, reading only small
//! metadata files and safetensors headers.
//!
//! # Example
//!
//! ```ignore
//! use vram_calculator::hub::{HubOptions, ModelResolver};
//!
//! let resolver = ModelResolver::new(HubOptions::from_env())?;
//! let model = resolver.resolve("mistralai/Mistral-7B-Instruct-v0.2")?;
//! println!("{} bytes at float32", model.summary.total_size_bytes);
//! ```

mod architecture;
mod options;
mod repo_id;
mod resolver;
mod safetensors;
mod transport;

#[cfg(test)]
mod tests;

pub use architecture::{Architecture, ModelConfig, CONFIG_FILE};
pub use options::{HubOptions, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT};
pub use repo_id::{apply_llama_alias, extract_from_url, RepoId};
pub use resolver::{
    ModelReport, ModelResolver, ResolvedModel, WeightSource, CHAT_TEMPLATE_FILE,
    TOKENIZER_CONFIG_FILE,
};
pub use safetensors::{
    layer_key, parse_header, read_header, read_layout, ParameterLayout, TensorEntry,
    MAX_HEADER_SIZE, SHARD_INDEX_FILE,
};
pub use transport::{classify_status, HttpTransport, HubTransport, RepoInfo, RequestTarget};
