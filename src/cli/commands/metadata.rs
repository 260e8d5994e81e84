//! Metadata command implementation

use serde_json::json;

use super::estimate::source_details;
use super::output::{memory_json, with_fields, Output};
use crate::cli::LogLevel;
use crate::config::{MetadataArgs, OutputFormat};
use crate::error::Result;
use crate::hub::{HubTransport, ModelReport, ModelResolver};

pub fn run_metadata(args: MetadataArgs, level: LogLevel) -> Result<()> {
    let resolver = ModelResolver::new(args.hub.to_options())?;
    render_metadata(&resolver, &args, level)?.print();
    Ok(())
}

pub(super) fn render_metadata<T: HubTransport>(
    resolver: &ModelResolver<T>,
    args: &MetadataArgs,
    level: LogLevel,
) -> Result<Output> {
    let report = ModelReport::build(resolver, &args.hub.model)?;

    Ok(match args.format {
        OutputFormat::Text => {
            let mut out = Output::new(level);
            out.log(
                LogLevel::Normal,
                format!("Memory sizes for {}", report.model.repo_id),
            );
            source_details(&mut out, &report.model);
            out.memory_table(&report.memory);
            out.log(LogLevel::Normal, "");
            out.line(format!(
                "Max length: {}",
                report
                    .max_length()
                    .map_or_else(|| "unknown".to_string(), |n| n.to_string())
            ));
            out.line(format!(
                "Chat template: {}",
                if report.has_chat_template() { "yes" } else { "no" }
            ));
            out
        }
        OutputFormat::Json => Output::json(&with_fields(
            json!({
                "model": report.model.repo_id,
                "weight_source": report.model.weight_source,
                "max_length": report.max_length(),
                "has_chat_template": report.has_chat_template(),
            }),
            memory_json(&report.memory, &report.model.summary),
        )),
    })
}
