use serde_json::{Map, Value};
use tabled::{builder::Builder, Table};

use super::{cell, line_items, payload};

const LINE_ITEM_COLUMNS: [&str; 6] = [
    "role",
    "provider",
    "origin",
    "recurrence",
    "upfront_gross",
    "recurring_gross",
];

/// Format output as tables using the tabled crate.
pub fn print_table(value: &Value) {
    let body = payload(value);

    if let Some(items) = line_items(body) {
        print_quote(body, items);
    } else {
        match body {
            Value::Object(map) => print_flat_object(map),
            Value::Array(arr) => print_array_table(arr),
            other => println!("{}", cell(other)),
        }
    }

    if let Some(Value::String(error)) = value.get("error") {
        println!("Error: {}", error);
    }

    if let Some(Value::Array(warnings)) = value.get("warnings") {
        if !warnings.is_empty() {
            println!("\nWarnings:");
            for w in warnings.iter().filter_map(Value::as_str) {
                println!("  - {}", w);
            }
        }
    }

    if let Some(Value::String(meth)) = value.get("methodology") {
        println!("\nMethodology: {}", meth);
    }
}

fn print_quote(body: &Value, items: &[Value]) {
    let mut builder = Builder::default();
    builder.push_record(LINE_ITEM_COLUMNS);
    for item in items {
        builder.push_record(
            LINE_ITEM_COLUMNS
                .iter()
                .map(|col| item.get(*col).map(cell).unwrap_or_default()),
        );
    }
    println!("{}", Table::from(builder));

    let totals = body.get("totals").or_else(|| body.get("totais"));
    if let Some(Value::Object(totals)) = totals {
        println!();
        print_flat_object(totals);
    }

    let series = body.get("series_costs").or_else(|| body.get("series"));
    if let Some(Value::Array(series)) = series {
        if series.len() > 1 {
            println!();
            print_array_table(series);
        }
    }
}

fn print_flat_object(map: &Map<String, Value>) {
    let mut builder = Builder::default();
    builder.push_record(["Field", "Value"]);
    for (key, val) in map {
        builder.push_record([key.as_str(), &format_value(val)]);
    }
    println!("{}", Table::from(builder));
}

fn print_array_table(arr: &[Value]) {
    if arr.is_empty() {
        println!("(empty)");
        return;
    }

    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<String> = first.keys().cloned().collect();
        let mut builder = Builder::default();
        builder.push_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(h.as_str()).map(format_value).unwrap_or_default())
                    .collect();
                builder.push_record(row);
            }
        }

        println!("{}", Table::from(builder));
    } else {
        for item in arr {
            println!("{}", format_value(item));
        }
    }
}

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "-".to_string(),
        Value::Array(arr) => arr.iter().map(format_value).collect::<Vec<_>>().join(", "),
        other => cell(other),
    }
}
