use anyhow::Result;
use clap::ValueEnum;
use colored::{Color, Colorize};
use comfy_table::{Attribute, Cell, Color as CellColor, Table, presets};
use serde::Serialize;
use std::io::Write;

/// Output format options for CLI commands
#[derive(Clone, Copy, Debug, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Formatted table output (default)
    #[default]
    Table,
    /// JSON output for scripting
    Json,
    /// Compact single-line output
    Compact,
}

#[derive(Clone, Debug, Default)]
pub struct GlobalOptions {
    pub output_format: OutputFormat,
    pub quiet: bool,
    pub verbose: bool,
    pub no_color: bool,
}

/// Reports that can be rendered as a table or a one-liner
pub trait TableDisplay {
    fn to_table(&self, output: &OutputManager) -> Table;
    fn to_compact(&self) -> String;
}

/// Kind of status line; picks the marker and colour.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Tone {
    Success,
    Warning,
    Info,
    Detail,
    Pending,
}

impl Tone {
    fn marker(self) -> &'static str {
        match self {
            Tone::Success => "✓",
            Tone::Warning => "⚠",
            Tone::Info => "ℹ",
            Tone::Detail => "→",
            Tone::Pending => "⟳",
        }
    }

    fn color(self) -> Color {
        match self {
            Tone::Success => Color::Green,
            Tone::Warning => Color::Yellow,
            Tone::Info => Color::Blue,
            Tone::Detail => Color::BrightBlack,
            Tone::Pending => Color::Cyan,
        }
    }
}

/// Writes status lines and reports according to the global flags.
///
/// Status lines go to stdout and are suppressed by `--quiet` and by JSON
/// output, so `--output json` prints exactly one JSON document. Verbose
/// detail goes to stderr.
pub struct OutputManager {
    options: GlobalOptions,
}

impl OutputManager {
    pub fn new(options: GlobalOptions) -> Self {
        Self { options }
    }

    fn chatty(&self) -> bool {
        !self.options.quiet && self.options.output_format != OutputFormat::Json
    }

    fn paint(&self, tone: Tone, text: &str) -> String {
        if self.options.no_color {
            format!("{} {text}", tone.marker())
        } else {
            format!("{} {}", tone.marker().color(tone.color()).bold(), text.color(tone.color()))
        }
    }

    pub fn display<T>(&self, data: &T) -> Result<()>
    where
        T: Serialize + TableDisplay,
    {
        if self.options.quiet {
            return Ok(());
        }
        match self.options.output_format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(data)?),
            OutputFormat::Table => println!("{}", data.to_table(self)),
            OutputFormat::Compact => println!("{}", data.to_compact()),
        }
        Ok(())
    }

    pub fn success(&self, message: &str) {
        if self.chatty() {
            println!("{}", self.paint(Tone::Success, message));
        }
    }

    pub fn warning(&self, message: &str) {
        if self.chatty() {
            println!("{}", self.paint(Tone::Warning, message));
        }
    }

    pub fn info(&self, message: &str) {
        if self.chatty() {
            println!("{}", self.paint(Tone::Info, message));
        }
    }

    /// Only shown with `--verbose`.
    pub fn verbose(&self, message: &str) {
        if self.options.verbose && !self.options.quiet {
            eprintln!("{}", self.paint(Tone::Detail, message));
        }
    }

    pub fn heading(&self, text: &str) {
        if !self.chatty() {
            return;
        }
        if self.options.no_color {
            println!("\n{text}\n{}", "=".repeat(text.chars().count()));
        } else {
            println!("\n{}", text.bright_blue().bold());
        }
    }

    pub fn key_value(&self, key: &str, value: &str) {
        if !self.chatty() {
            return;
        }
        if self.options.no_color {
            println!("{key}: {value}");
        } else {
            println!("{}: {value}", key.bright_cyan().bold());
        }
    }

    /// Transient line, overwritten by the next `clear_line`.
    pub fn progress(&self, message: &str) {
        if self.chatty() {
            print!("\r{}...", self.paint(Tone::Pending, message));
            std::io::stdout().flush().ok();
        }
    }

    pub fn clear_line(&self) {
        if self.chatty() {
            print!("\r{:80}\r", "");
            std::io::stdout().flush().ok();
        }
    }

    /// Empty table with a bold header row.
    pub fn table(&self, headers: &[&str]) -> Table {
        let mut table = Table::new();
        if self.options.no_color {
            table.load_preset(presets::ASCII_FULL);
        } else {
            table.load_preset(presets::UTF8_FULL_CONDENSED);
        }
        table.set_header(headers.iter().map(|header| {
            let cell = Cell::new(header).add_attribute(Attribute::Bold);
            if self.options.no_color { cell } else { cell.fg(CellColor::Cyan) }
        }));
        table
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Serialize)]
    struct Sample {
        name: String,
        value: i32,
    }

    impl TableDisplay for Sample {
        fn to_table(&self, output: &OutputManager) -> Table {
            let mut table = output.table(&["Name", "Value"]);
            table.add_row(vec![Cell::new(&self.name), Cell::new(self.value)]);
            table
        }

        fn to_compact(&self) -> String {
            format!("{}={}", self.name, self.value)
        }
    }

    fn manager(options: GlobalOptions) -> OutputManager {
        OutputManager::new(options)
    }

    #[test]
    fn test_plain_paint_uses_marker_only() {
        let output = manager(GlobalOptions {
            no_color: true,
            ..Default::default()
        });
        assert_eq!(output.paint(Tone::Success, "done"), "✓ done");
        assert_eq!(output.paint(Tone::Warning, "careful"), "⚠ careful");
    }

    #[test]
    fn test_json_and_quiet_silence_status_lines() {
        assert!(!manager(GlobalOptions {
            output_format: OutputFormat::Json,
            ..Default::default()
        })
        .chatty());
        assert!(!manager(GlobalOptions {
            quiet: true,
            ..Default::default()
        })
        .chatty());
        assert!(manager(GlobalOptions::default()).chatty());
    }

    #[test]
    fn test_table_renders_header_and_rows() {
        let output = manager(GlobalOptions {
            no_color: true,
            ..Default::default()
        });
        let sample = Sample {
            name: "article".to_string(),
            value: 3,
        };
        let rendered = sample.to_table(&output).to_string();
        assert!(rendered.contains("Name"));
        assert!(rendered.contains("article"));
        assert_eq!(sample.to_compact(), "article=3");
    }

    #[test]
    fn test_display_in_every_format() {
        let sample = Sample {
            name: "x".to_string(),
            value: 1,
        };
        for output_format in [OutputFormat::Table, OutputFormat::Json, OutputFormat::Compact] {
            let output = manager(GlobalOptions {
                output_format,
                no_color: true,
                ..Default::default()
            });
            assert!(output.display(&sample).is_ok());
        }
    }
}
