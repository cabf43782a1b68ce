use serde_json::Value;
use std::io::{self, Write};

/// Pretty-printed document followed by a newline, so piped output ends cleanly.
pub fn write_json<W: Write>(out: &mut W, value: &Value) -> io::Result<()> {
    serde_json::to_writer_pretty(&mut *out, value)?;
    writeln!(out)
}

pub fn print_json(value: &Value) {
    let stdout = io::stdout();
    let mut handle = stdout.lock();
    if let Err(e) = write_json(&mut handle, value) {
        eprintln!("Failed to write JSON output: {}", e);
    }
}
