//! Output formatters for migration results.

use clap::ValueEnum;
use comfy_table::{Cell, Table};
use ormsync_core::migration::{GenerationReport, MigrationStatusEntry, RollbackOutcome};

/// Output format for results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// ASCII table format
    Table,
    /// JSON format
    Json,
}

impl std::fmt::Display for OutputFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OutputFormat::Table => write!(f, "table"),
            OutputFormat::Json => write!(f, "json"),
        }
    }
}

/// Trait for formatting output.
pub trait Formatter {
    /// Format a generation result; `name` is the written migration, if any.
    fn format_generated(&self, name: Option<&str>, report: &GenerationReport) -> String;

    /// Format the migrations applied (or, for a dry run, pending).
    fn format_applied(&self, names: &[String], dry_run: bool) -> String;

    /// Format the migrations rolled back.
    fn format_rolled_back(&self, outcomes: &[RollbackOutcome]) -> String;

    /// Format migration status.
    fn format_status(&self, entries: &[MigrationStatusEntry]) -> String;
}

/// Create a formatter for the given output format.
pub fn create_formatter(format: OutputFormat) -> Box<dyn Formatter> {
    match format {
        OutputFormat::Table => Box::new(TableFormatter),
        OutputFormat::Json => Box::new(JsonFormatter),
    }
}

/// Table formatter using comfy-table.
pub struct TableFormatter;

impl Formatter for TableFormatter {
    fn format_generated(&self, name: Option<&str>, report: &GenerationReport) -> String {
        let mut lines = Vec::new();
        for warning in &report.warnings {
            lines.push(format!("Warning: {}", warning));
        }
        match name {
            Some(name) => lines.push(format!(
                "Created migration {} ({} statement(s))",
                name,
                report.up.len()
            )),
            None if report.is_empty() => lines.push("No changes detected".to_string()),
            None => lines.push(report.up_sql().trim_end().to_string()),
        }
        lines.join("\n")
    }

    fn format_applied(&self, names: &[String], dry_run: bool) -> String {
        if names.is_empty() {
            return "Nothing to migrate".to_string();
        }
        let mut table = Table::new();
        table.set_header(vec![if dry_run { "Pending" } else { "Applied" }]);
        for name in names {
            table.add_row(vec![name]);
        }
        table.to_string()
    }

    fn format_rolled_back(&self, outcomes: &[RollbackOutcome]) -> String {
        if outcomes.is_empty() {
            return "Nothing to roll back".to_string();
        }
        let mut table = Table::new();
        table.set_header(vec!["Rolled back", "Down script"]);
        for outcome in outcomes {
            table.add_row(vec![
                Cell::new(&outcome.name),
                Cell::new(if outcome.down_script_run { "run" } else { "none" }),
            ]);
        }
        table.to_string()
    }

    fn format_status(&self, entries: &[MigrationStatusEntry]) -> String {
        if entries.is_empty() {
            return "No migrations".to_string();
        }
        let mut table = Table::new();
        table.set_header(vec!["Migration", "State", "Executed at", "Rolled back at"]);
        for entry in entries {
            table.add_row(vec![
                Cell::new(&entry.name),
                Cell::new(entry.state),
                Cell::new(format_time(entry.executed_at.as_ref())),
                Cell::new(format_time(entry.rolled_back_at.as_ref())),
            ]);
        }
        table.to_string()
    }
}

/// JSON formatter.
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn format_generated(&self, name: Option<&str>, report: &GenerationReport) -> String {
        let warnings: Vec<String> = report.warnings.iter().map(|w| w.to_string()).collect();
        serde_json::json!({
            "migration": name,
            "statements": report.up.len(),
            "up": report.up_sql(),
            "down": report.down_sql(),
            "warnings": warnings,
        })
        .to_string()
    }

    fn format_applied(&self, names: &[String], dry_run: bool) -> String {
        let key = if dry_run { "pending" } else { "applied" };
        let mut obj = serde_json::Map::new();
        obj.insert(key.to_string(), serde_json::json!(names));
        serde_json::Value::Object(obj).to_string()
    }

    fn format_rolled_back(&self, outcomes: &[RollbackOutcome]) -> String {
        serde_json::to_string_pretty(outcomes).unwrap_or_else(|_| "[]".to_string())
    }

    fn format_status(&self, entries: &[MigrationStatusEntry]) -> String {
        serde_json::to_string_pretty(entries).unwrap_or_else(|_| "[]".to_string())
    }
}

fn format_time(time: Option<&chrono::DateTime<chrono::Utc>>) -> String {
    time.map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| "-".to_string())
}
