use serde_json::Value;
use std::io;

use super::{cell, line_items, payload};

/// Write output as CSV to stdout. Quotes are written one row per line item.
pub fn print_csv(value: &Value) {
    let stdout = io::stdout();
    let mut wtr = csv::Writer::from_writer(stdout.lock());
    let body = payload(value);

    if let Some(items) = line_items(body) {
        write_array_csv(&mut wtr, items);
    } else {
        match body {
            Value::Object(map) => {
                let _ = wtr.write_record(["field", "value"]);
                for (key, val) in map {
                    let _ = wtr.write_record([key.as_str(), &cell(val)]);
                }
            }
            Value::Array(arr) => write_array_csv(&mut wtr, arr),
            other => {
                let _ = wtr.write_record([&cell(other)]);
            }
        }
    }

    let _ = wtr.flush();
}

fn write_array_csv<W: io::Write>(wtr: &mut csv::Writer<W>, arr: &[Value]) {
    if let Some(Value::Object(first)) = arr.first() {
        let headers: Vec<&str> = first.keys().map(|k| k.as_str()).collect();
        let _ = wtr.write_record(&headers);

        for item in arr {
            if let Value::Object(map) = item {
                let row: Vec<String> = headers
                    .iter()
                    .map(|h| map.get(*h).map(cell).unwrap_or_default())
                    .collect();
                let _ = wtr.write_record(&row);
            }
        }
    } else {
        for item in arr {
            let _ = wtr.write_record([&cell(item)]);
        }
    }
}
