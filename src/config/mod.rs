//! Command-line configuration
//!
//! Flags take precedence over the environment (`HF_TOKEN`, `HF_HOME`,
//! `HF_ENDPOINT`), which takes precedence over cached token files.

pub mod cli;

pub use cli::{
    parse_args, Cli, Command, ComputeArgs, EstimateArgs, HubArgs, MetadataArgs, OutputFormat,
    DEFAULT_PRECISIONS,
};
