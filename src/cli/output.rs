//! Shared output formatting utilities for CLI commands
//!
//! Reports are written to stdout as JSON, YAML or a small table.

use anyhow::{Context, Result};
use serde::Serialize;
use std::str::FromStr;

use crate::domain::BindingReport;

/// Output format options
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Json,
    Yaml,
    Table,
}

impl FromStr for OutputFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "json" => Ok(OutputFormat::Json),
            "yaml" => Ok(OutputFormat::Yaml),
            "table" => Ok(OutputFormat::Table),
            _ => anyhow::bail!(
                "Unsupported output format: '{}'. Use 'json', 'yaml', or 'table'.",
                s
            ),
        }
    }
}

/// Print data in the specified format
pub fn print_output<T: Serialize>(data: &T, format: &str) -> Result<()> {
    print_output_format(data, format.parse()?)
}

/// Print data in the specified OutputFormat
pub fn print_output_format<T: Serialize>(data: &T, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Json => print_json(data),
        OutputFormat::Yaml => print_yaml(data),
        OutputFormat::Table => {
            anyhow::bail!("Table format requires custom implementation per data type")
        }
    }
}

/// Print data as JSON
pub fn print_json<T: Serialize>(data: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(data).context("Failed to serialize to JSON")?;
    println!("{}", json);
    Ok(())
}

/// Print data as YAML
pub fn print_yaml<T: Serialize>(data: &T) -> Result<()> {
    let yaml = serde_yaml::to_string(data).context("Failed to serialize to YAML")?;
    println!("{}", yaml);
    Ok(())
}

/// Print a horizontal separator line
pub fn print_separator(width: usize) {
    println!("{}", "-".repeat(width));
}

/// Key/value rows of a binding report.
pub fn report_rows(report: &BindingReport) -> Vec<(&'static str, String)> {
    let mut rows = vec![
        ("app", report.app_name.clone()),
        ("resource_group", report.resource_group.clone()),
        ("hostname", report.hostname.clone()),
        ("certificate", report.certificate_name.clone()),
        ("source_vault", report.source_vault.clone()),
        ("destination_vault", report.destination_vault.clone()),
        ("thumbprint", report.thumbprint.to_string()),
        ("ssl_state", report.ssl_state.to_string()),
    ];
    if let Some(version) = &report.import.version {
        rows.push(("imported_version", version.clone()));
    }
    if let Some(path) = &report.scratch_path {
        rows.push(("scratch_path", path.display().to_string()));
    }
    rows
}

/// Print a binding report as a two-column table
pub fn print_report_table(report: &BindingReport) {
    println!();
    println!("{:<20} {}", "Key", "Value");
    print_separator(72);
    for (key, value) in report_rows(report) {
        println!("{:<20} {}", key, value);
    }
    println!();
}

/// Print a binding report in the requested format
pub fn print_report(report: &BindingReport, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Table => {
            print_report_table(report);
            Ok(())
        }
        other => print_output_format(report, other),
    }
}
