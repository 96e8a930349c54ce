//! Output formatting for suite results

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use uiscript_engine::{TestResult, TestSuiteResult};

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// One line per script
    Plain,
}

/// Rows that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

impl TableDisplay for TestResult {
    fn headers() -> Vec<&'static str> {
        vec!["Status", "Script", "Duration", "Error"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            status(self.success),
            self.name.clone(),
            format!("{} ms", self.duration_ms),
            first_line(self.error.as_deref()),
        ]
    }
}

fn status(success: bool) -> String {
    if success {
        "✓ pass".green().to_string()
    } else {
        "✗ fail".red().to_string()
    }
}

/// Tables hold the headline; the full trace is in the log
fn first_line(error: Option<&str>) -> String {
    error
        .and_then(|e| e.lines().next())
        .unwrap_or_default()
        .to_string()
}

/// Print rows in the chosen format
pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            let mut table = Table::new();
            table
                .load_preset(UTF8_FULL)
                .set_content_arrangement(ContentArrangement::Dynamic);

            table.set_header(T::headers());
            for item in items {
                table.add_row(item.row());
            }

            println!("{table}");
        }
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(items).unwrap_or_default());
        }
        OutputFormat::Plain => {
            for item in items {
                println!("{}", item.row().join("\t"));
            }
        }
    }
}

/// Print the per-script results and the summary line
pub fn print_suite(suite: &TestSuiteResult, format: OutputFormat) {
    if let OutputFormat::Json = format {
        println!("{}", serde_json::to_string_pretty(suite).unwrap_or_default());
        return;
    }

    if suite.results.is_empty() {
        print_warning("No scripts found.");
        return;
    }
    print_list(&suite.results, format);

    let summary = format!(
        "{} passed, {} failed ({} ms)",
        suite.passed, suite.failed, suite.duration_ms
    );
    if suite.success() {
        print_success(&summary);
    } else {
        print_error(&summary);
    }
}

/// Print success message
pub fn print_success(message: &str) {
    println!("✅ {}", message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("❌ {}", message);
}

/// Print warning message
pub fn print_warning(message: &str) {
    println!("⚠️  {}", message);
}
