//! CLI command implementations

mod compute;
mod estimate;
mod metadata;
mod output;


use crate::cli::LogLevel;
use crate::config::{Cli, Command};
use crate::error::Result;

/// Execute a CLI command based on the parsed arguments
pub fn run_command(cli: Cli) -> Result<()> {
    let log_level = LogLevel::from_flags(cli.verbose, cli.quiet);

    match cli.command {
        Command::Estimate(args) => estimate::run_estimate(args, log_level),
        Command::Metadata(args) => metadata::run_metadata(args, log_level),
        Command::Compute(args) => compute::run_compute(args, log_level),
    }
}
