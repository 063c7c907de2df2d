//! Decode raw LLM answers into slot values
//!
//! Free-text slots pass through untouched. Structured slots are parsed as
//! JSON; when that fails, exactly one repair pass is applied before a second
//! and final parse:
//!
//! 1. unwrap a surrounding Markdown code fence
//! 2. strip a single trailing `,` or `;`
//! 3. append the closers of every bracket left open, innermost first
//!
//! Brackets inside string literals are ignored. The pass never iterates, so
//! output that is still malformed after it surfaces as a `parse_failure`.

use anamnesis_domain::{ErrorDescriptor, SlotValue};
use serde_json::Value;
use tracing::debug;

/// Decode `raw_text` for a slot with the given shape template
///
/// No semantic validation against the template is performed: any text that
/// parses as JSON is accepted as-is.
pub fn decode(
    raw_text: &str,
    shape_template: Option<&Value>,
) -> Result<SlotValue, ErrorDescriptor> {
    if shape_template.is_none() {
        return Ok(SlotValue::Text(raw_text.to_string()));
    }

    if let Ok(value) = serde_json::from_str::<Value>(raw_text) {
        return Ok(SlotValue::Structured(value));
    }

    let repaired = repair_json(raw_text);
    debug!("Repaired structured answer ({} -> {} chars)", raw_text.len(), repaired.len());

    serde_json::from_str::<Value>(&repaired)
        .map(SlotValue::Structured)
        .map_err(|e| {
            ErrorDescriptor::parse_failure(format!("Invalid JSON after repair: {}", e), &repaired)
        })
}

/// Apply the single bounded repair pass to `raw_text`
///
/// # Examples
///
/// ```
/// use anamnesis_extractor::decoder::repair_json;
///
/// assert_eq!(repair_json(r#"{"a": "b""#), r#"{"a": "b"}"#);
/// assert_eq!(repair_json(r#"{"a": {"b": [1, 2,"#), r#"{"a": {"b": [1, 2]}}"#);
/// ```
pub fn repair_json(raw_text: &str) -> String {
    let mut text = strip_code_fence(raw_text.trim()).trim().to_string();

    if text.ends_with(',') || text.ends_with(';') {
        text.pop();
        let kept = text.trim_end().len();
        text.truncate(kept);
    }

    let closers = missing_closers(&text);
    text.push_str(&closers);
    text
}

/// Remove a Markdown fence (```` ```json ```` / ```` ``` ````) around the payload
fn strip_code_fence(text: &str) -> &str {
    if !text.starts_with("```") {
        return text;
    }

    // Drop the opening fence line
    let body = match text.find('\n') {
        Some(idx) => &text[idx + 1..],
        None => return "",
    };

    // Truncated answers may lack the closing fence
    match body.rfind("```") {
        Some(idx) => &body[..idx],
        None => body,
    }
}

/// Closers for every bracket still open at the end of `text`, innermost first
fn missing_closers(text: &str) -> String {
    let mut open = Vec::new();
    let mut in_string = false;
    let mut escaped = false;

    for c in text.chars() {
        if in_string {
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => in_string = true,
            '{' => open.push('}'),
            '[' => open.push(']'),
            '}' | ']' => {
                if open.last() == Some(&c) {
                    open.pop();
                }
            }
            _ => {}
        }
    }

    open.iter().rev().collect()
}
