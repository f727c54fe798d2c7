//! Output formatting for CLI commands.
//!
//! This module provides formatting utilities for displaying
//! per-host results in various formats.

use colored::Colorize;
use std::fmt::Write;
use tabled::{Table, Tabled};

use crate::config::ValidationResult;
use crate::fleet::{FleetReport, HostResult};

use super::commands::OutputFormat;

/// Output formatter for CLI.
#[derive(Debug)]
pub struct OutputFormatter {
    /// Output format.
    format: OutputFormat,
}

/// Host result row for table display.
#[derive(Tabled)]
struct HostResultRow {
    #[tabled(rename = "Host")]
    host: String,
    #[tabled(rename = "Result")]
    code: String,
    #[tabled(rename = "Status")]
    status: String,
}

impl OutputFormatter {
    /// Creates a new output formatter.
    #[must_use]
    pub const fn new(format: OutputFormat) -> Self {
        Self { format }
    }

    /// Formats a fleet report for display.
    #[must_use]
    pub fn format_report(&self, report: &FleetReport) -> String {
        match self.format {
            OutputFormat::Json => serde_json::to_string_pretty(report).unwrap_or_default(),
            OutputFormat::Text => Self::format_report_text(report),
        }
    }

    /// Formats a report as text: host bodies, then the summary table.
    fn format_report_text(report: &FleetReport) -> String {
        let mut output = String::new();

        for result in &report.results {
            if let Some(body) = &result.body {
                let _ = writeln!(output, "# {}", result.host);
                output.push_str(body);
                if !body.ends_with('\n') {
                    output.push('\n');
                }
                output.push('\n');
            }
        }

        if report.is_empty() {
            output.push_str("No hosts targeted.\n");
            return output;
        }

        let rows: Vec<HostResultRow> = report
            .results
            .iter()
            .map(|r| HostResultRow {
                host: r.host.clone(),
                code: Self::format_code(r),
                status: Self::truncate(&r.status, 60),
            })
            .collect();
        output.push_str(&Table::new(rows).to_string());
        output.push('\n');

        let failed = report.failed();
        let summary = if failed == 0 {
            format!("{} hosts succeeded", report.len()).green().to_string()
        } else {
            format!("{failed} of {} hosts failed", report.len()).red().to_string()
        };
        let _ = writeln!(output, "\n{summary}");

        output
    }

    /// Formats validation warnings.
    #[must_use]
    pub fn format_validation(&self, result: &ValidationResult) -> String {
        let mut output = String::new();
        for warning in &result.warnings {
            let _ = writeln!(output, "{} {warning}", "warning:".yellow());
        }
        output
    }

    fn format_code(result: &HostResult) -> String {
        if result.is_success() {
            "0".green().to_string()
        } else {
            result.code.to_string().red().to_string()
        }
    }

    /// Truncates a string to a maximum number of characters.
    fn truncate(s: &str, max_len: usize) -> String {
        if s.chars().count() <= max_len {
            s.to_string()
        } else {
            let kept: String = s.chars().take(max_len.saturating_sub(3)).collect();
            format!("{kept}...")
        }
    }
}
