use serde_json::Value;

use super::{cell, payload};

/// Paths to the headline number of each command's output, in priority order.
const PRIORITY_PATHS: &[&[&str]] = &[
    &["totals", "total_primeiro_ano"],
    &["totais", "total_primeiro_ano"],
    &["total"],
    &["amount"],
    &["gross"],
    &["state", "status"],
    &["primary_table"],
    &["valid"],
];

/// Print just the key answer value from the output.
pub fn print_minimal(value: &Value) {
    println!("{}", minimal_answer(value));
}

fn minimal_answer(value: &Value) -> String {
    if let Some(Value::String(error)) = value.get("error") {
        return format!("error: {}", error);
    }
    let body = payload(value);

    for path in PRIORITY_PATHS {
        if let Some(found) = lookup(body, path) {
            if !found.is_null() {
                return cell(found);
            }
        }
    }

    match body {
        Value::Object(map) => map
            .iter()
            .next()
            .map(|(key, val)| format!("{}: {}", key, cell(val)))
            .unwrap_or_default(),
        other => cell(other),
    }
}

fn lookup<'a>(value: &'a Value, path: &[&str]) -> Option<&'a Value> {
    path.iter().try_fold(value, |v, key| v.get(*key))
}
