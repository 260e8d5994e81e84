//! CLI argument parsing
//!
//! # Usage
//!
//! ```bash
//! vram-calculator estimate mistralai/Mistral-7B-Instruct-v0.2
//! vram-calculator estimate https://huggingface.co/gpt2 --precision int8,int4
//! vram-calculator metadata meta-llama/Llama-2-7b --token hf_xxx --format json
//! vram-calculator compute --total-bytes 14000000000
//! ```

mod core;
mod types;

pub use core::{
    parse_args, Cli, Command, ComputeArgs, EstimateArgs, HubArgs, MetadataArgs,
    DEFAULT_PRECISIONS,
};
pub use types::OutputFormat;
