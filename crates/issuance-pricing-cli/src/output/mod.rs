pub mod csv_out;
pub mod json;
pub mod minimal;
pub mod table;

use crate::OutputFormat;
use serde_json::Value;

/// Dispatch output to the appropriate formatter.
pub fn format_output(format: &OutputFormat, value: &Value) {
    match format {
        OutputFormat::Json => json::print_json(value),
        OutputFormat::Table => table::print_table(value),
        OutputFormat::Csv => csv_out::print_csv(value),
        OutputFormat::Minimal => minimal::print_minimal(value),
    }
}

/// The payload of either envelope: `result` for computation output,
/// `data` for API responses, else the value itself.
pub(crate) fn payload(value: &Value) -> &Value {
    value
        .as_object()
        .and_then(|m| m.get("result").or_else(|| m.get("data")))
        .unwrap_or(value)
}

/// Line items of a quote, under either naming.
pub(crate) fn line_items(payload: &Value) -> Option<&Vec<Value>> {
    payload
        .get("costs")
        .or_else(|| payload.get("custos"))
        .and_then(Value::as_array)
}

/// Render a scalar for a single table or CSV cell.
pub(crate) fn cell(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null => String::new(),
        _ => serde_json::to_string(value).unwrap_or_default(),
    }
}
