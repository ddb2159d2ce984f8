use clap::ValueEnum;
use comfy_table::{modifiers, presets, Attribute, Cell, Table};
use owo_colors::OwoColorize;
use serde::Serialize;
use serde_json::json;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Human,
    Json,
    #[value(name = "json-pretty")]
    JsonPretty,
}

pub struct Output {
    format: OutputFormat,
    quiet: bool,
}

impl Output {
    pub fn new(format: OutputFormat, quiet: bool) -> Self {
        Self { format, quiet }
    }

    pub fn is_human(&self) -> bool {
        self.format == OutputFormat::Human
    }

    pub fn success(&self, msg: impl AsRef<str>) {
        if self.quiet {
            return;
        }

        match self.format {
            OutputFormat::Human => println!("{} {}", "✓".green(), msg.as_ref()),
            OutputFormat::Json | OutputFormat::JsonPretty => {
                self.print_json(&json!({ "type": "success", "message": msg.as_ref() }));
            }
        }
    }

    pub fn error(&self, msg: impl AsRef<str>) {
        // Errors show even in quiet mode
        match self.format {
            OutputFormat::Human => eprintln!("{} {}", "✗".red(), msg.as_ref()),
            OutputFormat::Json | OutputFormat::JsonPretty => {
                self.print_json(&json!({ "type": "error", "message": msg.as_ref() }));
            }
        }
    }

    pub fn info(&self, msg: impl AsRef<str>) {
        if self.quiet {
            return;
        }

        match self.format {
            OutputFormat::Human => println!("{}", msg.as_ref()),
            OutputFormat::Json | OutputFormat::JsonPretty => {
                self.print_json(&json!({ "type": "info", "message": msg.as_ref() }));
            }
        }
    }

    pub fn warn(&self, msg: impl AsRef<str>) {
        if self.quiet {
            return;
        }

        match self.format {
            OutputFormat::Human => println!("{} {}", "⚠".yellow(), msg.as_ref()),
            OutputFormat::Json | OutputFormat::JsonPretty => {
                self.print_json(&json!({ "type": "warning", "message": msg.as_ref() }));
            }
        }
    }

    /// Structured result for the JSON formats; ignored in human mode.
    pub fn data<T: Serialize>(&self, data: &T) {
        if self.is_human() || self.quiet {
            return;
        }
        match serde_json::to_value(data) {
            Ok(value) => self.print_json(&value),
            Err(e) => self.error(format!("Failed to serialize output: {}", e)),
        }
    }

    /// Human-mode table; ignored in the JSON formats.
    pub fn table(&self, header: &[&str], rows: Vec<Vec<String>>) {
        if !self.is_human() || self.quiet {
            return;
        }
        println!("{}", build_table(header, rows));
    }

    fn print_json(&self, data: &serde_json::Value) {
        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string(data).unwrap_or_default()),
            OutputFormat::JsonPretty => println!("{}", serde_json::to_string_pretty(data).unwrap_or_default()),
            OutputFormat::Human => println!("{}", data),
        }
    }
}

fn build_table(header: &[&str], rows: Vec<Vec<String>>) -> Table {
    let mut table = Table::new();
    table.set_header(
        header
            .iter()
            .map(|h| Cell::new(h).fg(comfy_table::Color::Cyan).add_attribute(Attribute::Bold))
            .collect::<Vec<_>>(),
    );
    for row in rows {
        table.add_row(row);
    }
    table.load_preset(presets::UTF8_FULL);
    table.apply_modifier(modifiers::UTF8_ROUND_CORNERS);
    table
}
