use serde_json::Value;
use std::io::{self, Read};

/// Read a piped request from stdin. JSON is tried first, then YAML.
/// Returns None when stdin is a terminal or the pipe is empty.
pub fn read_stdin() -> Result<Option<Value>, Box<dyn std::error::Error>> {
    if atty::is(atty::Stream::Stdin) {
        return Ok(None);
    }

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer)?;
    parse_piped(&buffer)
}

fn parse_piped(buffer: &str) -> Result<Option<Value>, Box<dyn std::error::Error>> {
    let trimmed = buffer.trim();
    if trimmed.is_empty() {
        return Ok(None);
    }

    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) => Ok(Some(value)),
        Err(json_err) => match serde_yaml::from_str::<Value>(trimmed) {
            Ok(value @ Value::Object(_)) => Ok(Some(value)),
            _ => Err(format!("stdin is neither JSON nor a YAML mapping: {}", json_err).into()),
        },
    }
}
