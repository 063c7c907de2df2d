//! Output formatting for the CLI.

use anamnesis_domain::{ExtractionResult, ResultSink, RunId, RunSummary, SlotValue};
use colored::{Color, Colorize};
use std::io::{self, Write};

/// Result colors, cycled by completion index
pub const PALETTE: [Color; 10] = [
    Color::Cyan,
    Color::Magenta,
    Color::Yellow,
    Color::Blue,
    Color::Green,
    Color::BrightBlue,
    Color::BrightMagenta,
    Color::BrightCyan,
    Color::BrightYellow,
    Color::BrightGreen,
];

const RULE_WIDTH: usize = 50;

/// Output formatter.
#[derive(Debug, Clone, Copy)]
pub struct Formatter {
    color_enabled: bool,
}

impl Formatter {
    /// Create a new formatter.
    pub fn new(color_enabled: bool) -> Self {
        Self { color_enabled }
    }

    /// Invitation to type the narrative.
    pub fn input_prompt(&self) -> String {
        self.colorize(
            "📝 Enter your medical context (paste and press Enter twice):\n",
            Color::Cyan,
        )
    }

    /// Shown once the narrative has been sent off.
    pub fn sending(&self) -> String {
        self.colorize("⏳ Sending all questions to LLM...\n", Color::Yellow)
    }

    /// Shown when the narrative is empty.
    pub fn no_context(&self) -> String {
        self.colorize("❌ No context provided.", Color::Red)
    }

    /// Format an error message.
    pub fn error(&self, message: &str) -> String {
        self.colorize(&format!("❌ {}", message), Color::Red)
    }

    /// Closing line with the total run time.
    pub fn done(&self, summary: &RunSummary) -> String {
        self.colorize(
            &format!("\n✅ Done in {:.2}s", summary.elapsed_seconds()),
            Color::Green,
        )
    }

    /// One result block, colored by its completion index.
    pub fn result(&self, index: usize, result: &ExtractionResult) -> String {
        self.colorize(&render_result(result), PALETTE[index % PALETTE.len()])
    }

    /// Colorize text if color is enabled.
    fn colorize(&self, text: &str, color: Color) -> String {
        if !self.color_enabled {
            return text.to_string();
        }
        text.color(color).to_string()
    }
}

/// Plain-text result block, shared by the console and the log file
///
/// ```text
///
/// 📌 FAMILY_HISTORY (1.23s):
/// Mother has type 2 diabetes.
/// --------------------------------------------------
/// ```
pub fn render_result(result: &ExtractionResult) -> String {
    format!(
        "\n📌 {} ({:.2}s):\n{}\n{}",
        result.slot_id.to_uppercase(),
        result.elapsed_seconds(),
        render_value(&result.value),
        "-".repeat(RULE_WIDTH)
    )
}

/// Text of a slot value: free text as-is, JSON pretty-printed, errors tagged
pub fn render_value(value: &SlotValue) -> String {
    match value {
        SlotValue::Text(text) => text.clone(),
        SlotValue::Structured(json) => {
            serde_json::to_string_pretty(json).unwrap_or_else(|_| json.to_string())
        }
        SlotValue::Failed(error) => {
            let mut text = format!("ERROR [{}]: {}", error.kind, error.message);
            if let Some(excerpt) = &error.excerpt {
                text.push('\n');
                text.push_str(excerpt);
            }
            text
        }
    }
}

/// Writes every result to the console as it completes
pub struct ConsoleSink<W> {
    out: W,
    formatter: Formatter,
    shown: usize,
}

impl<W: Write> ConsoleSink<W> {
    /// Create a sink writing to `out`
    pub fn new(out: W, formatter: Formatter) -> Self {
        Self {
            out,
            formatter,
            shown: 0,
        }
    }

    /// Recover the underlying writer
    pub fn into_inner(self) -> W {
        self.out
    }
}

impl<W: Write> ResultSink for ConsoleSink<W> {
    type Error = io::Error;

    fn begin(&mut self, _run_id: RunId, _narrative: &str) -> io::Result<()> {
        writeln!(self.out, "{}", self.formatter.sending())?;
        self.out.flush()
    }

    fn accept(&mut self, result: &ExtractionResult) -> io::Result<()> {
        let block = self.formatter.result(self.shown, result);
        self.shown += 1;
        writeln!(self.out, "{}", block)?;
        self.out.flush()
    }

    fn finish(&mut self, summary: &RunSummary) -> io::Result<()> {
        writeln!(self.out, "{}", self.formatter.done(summary))?;
        self.out.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use anamnesis_domain::ErrorDescriptor;
    use serde_json::json;
    use std::time::Duration;

    fn text_result(slot: &str, text: &str, millis: u64) -> ExtractionResult {
        ExtractionResult::new(
            slot,
            SlotValue::Text(text.to_string()),
            Duration::from_millis(millis),
        )
    }

    #[test]
    fn test_render_text_result() {
        let rendered = render_result(&text_result("family_history", "Mother has diabetes.", 1234));
        assert_eq!(
            rendered,
            format!(
                "\n📌 FAMILY_HISTORY (1.23s):\nMother has diabetes.\n{}",
                "-".repeat(50)
            )
        );
    }

    #[test]
    fn test_render_structured_value_is_pretty() {
        let value = SlotValue::Structured(json!({"Complaint": "headache"}));
        assert_eq!(render_value(&value), "{\n  \"Complaint\": \"headache\"\n}");
    }

    #[test]
    fn test_render_error_with_excerpt() {
        let value = SlotValue::Failed(ErrorDescriptor::http_status(500, "model not found"));
        let rendered = render_value(&value);
        assert!(rendered.starts_with("ERROR [http_status]: "));
        assert!(rendered.ends_with("\nmodel not found"));
    }

    #[test]
    fn test_render_error_without_excerpt() {
        let value = SlotValue::Failed(ErrorDescriptor::network("connection refused"));
        assert_eq!(
            render_value(&value),
            "ERROR [network_exception]: connection refused"
        );
    }

    #[test]
    fn test_colorize_disabled() {
        let formatter = Formatter::new(false);
        assert_eq!(formatter.no_context(), "❌ No context provided.");
        assert_eq!(formatter.error("bad config"), "❌ bad config");
    }

    #[test]
    fn test_palette_has_ten_distinct_colors() {
        for (i, a) in PALETTE.iter().enumerate() {
            for b in &PALETTE[i + 1..] {
                assert_ne!(a, b);
            }
        }
    }

    #[test]
    fn test_console_sink_writes_blocks_in_arrival_order() {
        let mut sink = ConsoleSink::new(Vec::new(), Formatter::new(false));
        let run_id = RunId::new();

        sink.begin(run_id, "narrative").unwrap();
        sink.accept(&text_result("second", "b", 10)).unwrap();
        sink.accept(&text_result("first", "a", 20)).unwrap();
        sink.finish(&RunSummary {
            run_id,
            completed: 2,
            failed: 0,
            elapsed: Duration::from_millis(2500),
        })
        .unwrap();

        let output = String::from_utf8(sink.into_inner()).unwrap();
        assert!(output.starts_with("⏳ Sending all questions to LLM..."));
        assert!(output.find("📌 SECOND").unwrap() < output.find("📌 FIRST").unwrap());
        assert!(output.ends_with("✅ Done in 2.50s\n"));
    }
}
