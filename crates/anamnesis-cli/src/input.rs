//! Console narrative input.

use std::io::{self, BufRead};

/// Read the narrative: successive lines until a blank line or end of input,
/// joined with newlines and trimmed.
pub fn read_narrative<R: BufRead>(reader: R) -> io::Result<String> {
    let mut lines = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            break;
        }
        lines.push(line);
    }
    Ok(lines.join("\n").trim().to_string())
}
