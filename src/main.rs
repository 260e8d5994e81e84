//! vram-calculator CLI
//!
//! Estimates the memory needed to serve a Hugging Face Hub model without
//! downloading its weights.
//!
//! # Usage
//!
//! ```bash
//! # Four-precision memory table
//! vram-calculator estimate mistralai/Mistral-7B-Instruct-v0.2
//!
//! # Table plus max context length and chat template presence
//! vram-calculator metadata meta-llama/Llama-2-7b --token hf_xxx
//!
//! # Estimator only, from a known float32 size
//! vram-calculator compute --total-bytes 14000000000 --format json
//! ```

use clap::Parser;
use std::process::ExitCode;
use vram_calculator::cli::{init_tracing, run_command, Cli, LogLevel};

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_tracing(LogLevel::from_flags(cli.verbose, cli.quiet));

    match run_command(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error[{} {}]: {e}", e.code(), e.kind());
            ExitCode::FAILURE
        }
    }
}
