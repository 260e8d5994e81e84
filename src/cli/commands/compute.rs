//! Compute command implementation

use super::output::{memory_json, Output};
use crate::cli::LogLevel;
use crate::config::{ComputeArgs, OutputFormat};
use crate::error::Result;
use crate::estimate::{estimate_named, ParameterSizeSummary};

pub fn run_compute(args: ComputeArgs, level: LogLevel) -> Result<()> {
    render_compute(&args, level)?.print();
    Ok(())
}

pub(super) fn render_compute(args: &ComputeArgs, level: LogLevel) -> Result<Output> {
    let summary = ParameterSizeSummary::new(args.total_bytes, args.largest_layer_bytes);
    let estimates = estimate_named(&summary, &args.precisions)?;

    Ok(match args.format {
        OutputFormat::Text => {
            let mut out = Output::new(level);
            out.summary_details(&summary);
            out.memory_table(&estimates);
            out
        }
        OutputFormat::Json => Output::json(&memory_json(&estimates, &summary)),
    })
}
