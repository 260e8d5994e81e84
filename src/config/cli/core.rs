//! Core CLI types - Cli, Command, and argument structs

use clap::{Args, Parser, Subcommand};
use std::time::Duration;

use super::types::OutputFormat;
use crate::hub::{HubOptions, DEFAULT_TIMEOUT};

/// Precisions reported when none are requested
pub const DEFAULT_PRECISIONS: [&str; 4] = ["float32", "float16/bfloat16", "int8", "int4"];

/// vram-calculator: inference memory estimates for hub models
#[derive(Parser, Debug, Clone, PartialEq)]
#[command(name = "vram-calculator")]
#[command(version)]
#[command(
    about = "Estimate inference memory for Hugging Face Hub models at float32, float16/bfloat16, int8 and int4 without downloading weights"
)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress headings and diagnostics
    #[arg(short, long, global = true)]
    pub quiet: bool,
}

/// Available commands
#[derive(Subcommand, Debug, Clone, PartialEq)]
pub enum Command {
    /// Estimate inference memory for a hub model
    Estimate(EstimateArgs),

    /// Memory estimates plus max context length and chat template presence
    Metadata(MetadataArgs),

    /// Estimate from a known parameter size, without contacting the hub
    Compute(ComputeArgs),
}

/// Hub connection arguments shared by commands that resolve a model
#[derive(Args, Debug, Clone, PartialEq)]
pub struct HubArgs {
    /// Model identifier (`org/name`) or hub URL
    #[arg(value_name = "MODEL")]
    pub model: String,

    /// Access token for gated models (defaults to HF_TOKEN or the cached token)
    #[arg(short, long)]
    pub token: Option<String>,

    /// Git revision (branch, tag, or commit)
    #[arg(short, long, default_value = "main")]
    pub revision: String,

    /// Hub endpoint (defaults to HF_ENDPOINT or https://huggingface.co)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Per-request timeout in seconds
    #[arg(long, default_value_t = DEFAULT_TIMEOUT.as_secs())]
    pub timeout_secs: u64,
}

impl HubArgs {
    /// Hub options: flags override the environment
    #[must_use]
    pub fn to_options(&self) -> HubOptions {
        let mut options = HubOptions::from_env()
            .revision(self.revision.clone())
            .timeout(Duration::from_secs(self.timeout_secs));
        if let Some(endpoint) = &self.endpoint {
            options = options.endpoint(endpoint.clone());
        }
        if let Some(token) = &self.token {
            options = options.token(token.clone());
        }
        options
    }
}

/// Arguments for the estimate command
#[derive(Args, Debug, Clone, PartialEq)]
pub struct EstimateArgs {
    #[command(flatten)]
    pub hub: HubArgs,

    /// Precisions to estimate (repeat or comma-separate)
    #[arg(short, long = "precision", value_delimiter = ',', default_values_t = DEFAULT_PRECISIONS.map(String::from))]
    pub precisions: Vec<String>,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the metadata command
#[derive(Args, Debug, Clone, PartialEq)]
pub struct MetadataArgs {
    #[command(flatten)]
    pub hub: HubArgs,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Arguments for the compute command
#[derive(Args, Debug, Clone, PartialEq)]
pub struct ComputeArgs {
    /// Total parameter bytes at float32 (4 bytes per parameter)
    #[arg(long, allow_negative_numbers = true)]
    pub total_bytes: f64,

    /// Largest layer bytes at float32
    #[arg(long, default_value_t = 0.0, allow_negative_numbers = true)]
    pub largest_layer_bytes: f64,

    /// Precisions to estimate (repeat or comma-separate)
    #[arg(short, long = "precision", value_delimiter = ',', default_values_t = DEFAULT_PRECISIONS.map(String::from))]
    pub precisions: Vec<String>,

    /// Output format (text, json)
    #[arg(short, long, default_value = "text")]
    pub format: OutputFormat,
}

/// Parse CLI arguments from a string slice (for testing)
pub fn parse_args<I, T>(args: I) -> Result<Cli, clap::Error>
where
    I: IntoIterator<Item = T>,
    T: Into<std::ffi::OsString> + Clone,
{
    Cli::try_parse_from(args)
}
