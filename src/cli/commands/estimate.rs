//! Estimate command implementation

use serde_json::json;

use super::output::{memory_json, with_fields, Output};
use crate::cli::LogLevel;
use crate::config::{EstimateArgs, OutputFormat};
use crate::error::Result;
use crate::estimate::{estimate, PrecisionKind};
use crate::hub::{HubTransport, ModelResolver, ResolvedModel, WeightSource};

pub fn run_estimate(args: EstimateArgs, level: LogLevel) -> Result<()> {
    // Unknown precisions fail before any request is made
    let precisions = PrecisionKind::parse_all(&args.precisions)?;
    let resolver = ModelResolver::new(args.hub.to_options())?;
    render_estimate(&resolver, &args, &precisions, level)?.print();
    Ok(())
}

pub(super) fn render_estimate<T: HubTransport>(
    resolver: &ModelResolver<T>,
    args: &EstimateArgs,
    precisions: &[PrecisionKind],
    level: LogLevel,
) -> Result<Output> {
    let model = resolver.resolve(&args.hub.model)?;
    let estimates = estimate(&model.summary, precisions)?;

    Ok(match args.format {
        OutputFormat::Text => {
            let mut out = Output::new(level);
            out.log(LogLevel::Normal, format!("Memory sizes for {}", model.repo_id));
            source_details(&mut out, &model);
            out.memory_table(&estimates);
            out
        }
        OutputFormat::Json => Output::json(&with_fields(
            json!({
                "model": model.repo_id,
                "weight_source": model.weight_source,
            }),
            memory_json(&estimates, &model.summary),
        )),
    })
}

/// Where the counts came from plus the parameter summary, verbose only
pub(super) fn source_details(out: &mut Output, model: &ResolvedModel) {
    let source = match &model.weight_source {
        WeightSource::Safetensors {
            files,
            tensors,
            dtype,
        } => format!(
            "safetensors headers ({files} file(s), {tensors} tensors{})",
            dtype
                .as_deref()
                .map(|d| format!(", stored as {d}"))
                .unwrap_or_default()
        ),
        WeightSource::ConfigEstimate => "config.json dimensions (estimate)".to_string(),
    };
    out.log(LogLevel::Verbose, format!("Source: {source}"));
    out.summary_details(&model.summary);
}
