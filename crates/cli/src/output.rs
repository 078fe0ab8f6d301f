//! Output formatting utilities

use clap::ValueEnum;
use colored::Colorize;
use serde::{Deserialize, Serialize};
use service_lib::schema::FieldError;
use service_lib::SleepDisorder;
use tabled::{settings::Style, Table, Tabled};

/// Output format for CLI commands
#[derive(Debug, Clone, Copy, Default, PartialEq, ValueEnum, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutputFormat {
    /// Table format (default)
    #[default]
    Table,
    /// JSON format
    Json,
}

/// Print a table from a list of items
pub fn print_table<T: Tabled + Serialize>(items: &[T], format: OutputFormat) {
    match format {
        OutputFormat::Table => {
            if items.is_empty() {
                println!("{}", "No items found".yellow());
                return;
            }
            let table = Table::new(items).with(Style::rounded()).to_string();
            println!("{}", table);
        }
        OutputFormat::Json => {
            if let Ok(json) = serde_json::to_string_pretty(&items) {
                println!("{}", json);
            }
        }
    }
}

/// Pretty-print any serializable value as JSON
pub fn print_json<T: Serialize + ?Sized>(value: &T) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[derive(Tabled, Serialize)]
struct FieldErrorRow {
    #[tabled(rename = "Field")]
    field: String,
    #[tabled(rename = "Problem")]
    kind: String,
    #[tabled(rename = "Message")]
    message: String,
}

/// Print per-field request errors as a table
pub fn print_field_errors(errors: &[FieldError]) {
    let rows: Vec<FieldErrorRow> = errors
        .iter()
        .map(|e| FieldErrorRow {
            field: e.field.clone(),
            kind: serde_json::to_value(e.kind)
                .ok()
                .and_then(|v| v.as_str().map(str::to_string))
                .unwrap_or_default()
                .red()
                .to_string(),
            message: e.message.clone(),
        })
        .collect();
    print_table(&rows, OutputFormat::Table);
}

/// Print a success message
pub fn print_success(message: &str) {
    println!("{} {}", "✓".green().bold(), message);
}

/// Print an error message
pub fn print_error(message: &str) {
    eprintln!("{} {}", "✗".red().bold(), message);
}

/// Print a warning message
pub fn print_warning(message: &str) {
    println!("{} {}", "⚠".yellow().bold(), message);
}

/// Print an info message
pub fn print_info(message: &str) {
    println!("{} {}", "ℹ".blue().bold(), message);
}

/// Color status based on value
pub fn color_status(status: &str) -> String {
    match status.to_lowercase().as_str() {
        "healthy" | "ready" => status.green().to_string(),
        "degraded" => status.yellow().to_string(),
        "unhealthy" | "not ready" => status.red().to_string(),
        _ => status.to_string(),
    }
}

/// Color a predicted label; disorders stand out from the negative class
pub fn color_label(label: SleepDisorder) -> String {
    match label {
        SleepDisorder::NoneSleep => label.as_str().green().bold().to_string(),
        SleepDisorder::SleepApnea | SleepDisorder::Insomnia => {
            label.as_str().red().bold().to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_output_format_from_config_string() {
        let format: OutputFormat = serde_json::from_str(r#""json""#).unwrap();
        assert_eq!(format, OutputFormat::Json);
        assert!(serde_json::from_str::<OutputFormat>(r#""yaml""#).is_err());
    }

    #[test]
    fn test_color_label_keeps_text() {
        colored::control::set_override(false);
        assert_eq!(color_label(SleepDisorder::SleepApnea), "Sleep Apnea");
        assert_eq!(color_status("degraded"), "degraded");
    }
}
