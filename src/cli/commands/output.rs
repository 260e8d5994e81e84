//! Buffered command output and the shared memory table

use serde_json::{json, Map, Value};

use crate::cli::logging::enabled;
use crate::cli::LogLevel;
use crate::estimate::{MemoryEstimates, ParameterSizeSummary, BYTES_PER_GIB};

/// Lines collected before anything is printed, so a failing command
/// writes nothing to stdout
#[derive(Debug, PartialEq)]
pub(super) struct Output {
    level: LogLevel,
    lines: Vec<String>,
}

impl Output {
    pub(super) fn new(level: LogLevel) -> Self {
        Self {
            level,
            lines: Vec::new(),
        }
    }

    /// Pretty-printed JSON document, identical at every level
    pub(super) fn json(value: &Value) -> Self {
        Self {
            level: LogLevel::Quiet,
            lines: vec![format!("{value:#}")],
        }
    }

    /// Line shown when the level permits `required`
    pub(super) fn log(&mut self, required: LogLevel, line: impl Into<String>) {
        if enabled(self.level, required) {
            self.lines.push(line.into());
        }
    }

    /// Line shown at every level
    pub(super) fn line(&mut self, line: impl Into<String>) {
        self.lines.push(line.into());
    }

    #[cfg(test)]
    pub(super) fn lines(&self) -> &[String] {
        &self.lines
    }

    pub(super) fn print(&self) {
        for line in &self.lines {
            println!("{line}");
        }
    }

    /// Precision → GB table; verbose adds the largest-layer column
    pub(super) fn memory_table(&mut self, estimates: &MemoryEstimates) {
        let verbose = self.level == LogLevel::Verbose;
        if verbose {
            self.log(
                LogLevel::Normal,
                format!(
                    "{:<18} {:>12} {:>19}",
                    "Precision", "Memory (GB)", "Largest layer (GB)"
                ),
            );
        } else {
            self.log(
                LogLevel::Normal,
                format!("{:<18} {:>12}", "Precision", "Memory (GB)"),
            );
        }

        for e in estimates {
            let row = if verbose {
                format!(
                    "{:<18} {:>12.2} {:>19.2}",
                    e.precision.label(),
                    e.inference_gib,
                    e.largest_layer_gib
                )
            } else {
                format!("{:<18} {:>12.2}", e.precision.label(), e.inference_gib)
            };
            self.line(row);
        }
    }

    /// Parameter count and largest layer, verbose only
    pub(super) fn summary_details(&mut self, summary: &ParameterSizeSummary) {
        self.log(
            LogLevel::Verbose,
            format!(
                "Parameters: {:.0} ({:.2} GB at float32)",
                summary.param_count(),
                summary.total_size_bytes / BYTES_PER_GIB
            ),
        );
        if let Some(name) = &summary.largest_layer_name {
            self.log(
                LogLevel::Verbose,
                format!(
                    "Largest layer: {name} ({:.2} GB at float32)",
                    summary.largest_layer_size_bytes / BYTES_PER_GIB
                ),
            );
        }
    }
}

/// JSON shared by every command: the label map (request order) plus
/// per-precision detail
pub(super) fn memory_json(estimates: &MemoryEstimates, summary: &ParameterSizeSummary) -> Value {
    let memory_sizes: Map<String, Value> = estimates
        .as_map()
        .into_iter()
        .map(|(label, gib)| (label.to_string(), json!(gib)))
        .collect();
    json!({
        "memory_sizes": memory_sizes,
        "estimates": estimates.as_slice(),
        "total_size_bytes": summary.total_size_bytes,
        "largest_layer": {
            "name": summary.largest_layer_name,
            "size_bytes": summary.largest_layer_size_bytes,
        },
    })
}

/// Copy the fields of `extra` into `base` when both are objects
pub(super) fn with_fields(mut base: Value, extra: Value) -> Value {
    if let (Value::Object(base_map), Value::Object(extra_map)) = (&mut base, extra) {
        base_map.extend(extra_map);
    }
    base
}
