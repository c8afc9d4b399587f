//! Output formatting for CLI

use clap::ValueEnum;
use colored::Colorize;
use comfy_table::{presets::UTF8_FULL, ContentArrangement, Table};
use serde::Serialize;

use parasuite_common::{ContextReport, SuiteReport};
use parasuite_e2e::TestSpec;

/// Output format
#[derive(Debug, Clone, Copy, ValueEnum, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable table format
    #[default]
    Table,
    /// JSON format
    Json,
    /// YAML format
    Yaml,
    /// Plain text format
    Plain,
}

/// Trait for items that can be displayed in a table
pub trait TableDisplay {
    fn headers() -> Vec<&'static str>;
    fn row(&self) -> Vec<String>;
}

impl TableDisplay for ContextReport {
    fn headers() -> Vec<&'static str> {
        vec!["Context", "Test", "State", "Duration", "Artifacts", "Error"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.unit.clone(),
            self.state.to_string(),
            format!("{} ms", self.elapsed_ms),
            self.artifacts.len().to_string(),
            self.error.clone().unwrap_or_default(),
        ]
    }
}

impl TableDisplay for TestSpec {
    fn headers() -> Vec<&'static str> {
        vec!["Name", "Tags", "Steps", "Skip", "Description"]
    }

    fn row(&self) -> Vec<String> {
        vec![
            self.name.clone(),
            self.tags.join(","),
            self.steps.len().to_string(),
            if self.skip { "yes" } else { "no" }.to_string(),
            self.description.clone(),
        ]
    }
}

/// Print a list of items
pub fn print_list<T: Serialize + TableDisplay>(items: &[T], format: OutputFormat) {
    if items.is_empty() && format != OutputFormat::Json {
        println!("No items found.");
        return;
    }

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
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(items).unwrap_or_default());
        }
        OutputFormat::Plain => {
            for (i, item) in items.iter().enumerate() {
                if i > 0 {
                    println!("---");
                }
                let row = item.row();
                for (header, value) in T::headers().iter().zip(row.iter()) {
                    println!("{}: {}", header, value);
                }
            }
        }
    }
}

/// One-line totals for a finished suite
pub fn summary_line(report: &SuiteReport) -> String {
    format!(
        "{}: {} passed, {} failed, {} skipped ({} ms, peak {} concurrent)",
        report.suite,
        report.counts.succeeded,
        report.counts.failed,
        report.counts.skipped,
        report.duration_ms,
        report.peak_running
    )
}

/// Print a finished suite
pub fn print_report(report: &SuiteReport, format: OutputFormat) {
    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(report).unwrap_or_default());
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(report).unwrap_or_default());
        }
        OutputFormat::Table | OutputFormat::Plain => {
            print_list(&report.contexts, format);
            for artifact in &report.artifacts {
                print_info(&format!(
                    "{} captured {}",
                    artifact.context,
                    artifact.path.display()
                ));
            }
            for error in &report.errors {
                print_warning(error);
            }
            if report.is_success() {
                print_success(&summary_line(report));
            } else {
                print_error(&summary_line(report));
            }
        }
    }
}

/// Print success message
pub fn print_success(message: &str) {
    println!("{} {}", "✅".green(), message);
}

/// Print error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "❌".red(), message);
}

/// Print warning message
pub fn print_warning(message: &str) {
    println!("⚠️  {}", message.yellow());
}

/// Print info message
pub fn print_info(message: &str) {
    println!("ℹ️  {}", message);
}
