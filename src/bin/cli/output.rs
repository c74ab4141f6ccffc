//! Output formatting for CLI operations.

use std::time::Duration;

use pagerestore::progress::format_bytes;
use pagerestore::{DispatchStats, RestoreSummary};
use serde_json::json;

/// Everything the extract command reports.
pub struct RestoreReport<'a> {
    pub summary: &'a RestoreSummary,
    pub stats: &'a DispatchStats,
    pub bytes: u64,
    pub elapsed: Duration,
}

/// Trait for output formatting
pub trait OutputFormatter {
    /// Formats the result of a restore run
    fn format_restore(&self, report: &RestoreReport<'_>) -> String;
}

/// Human-readable output formatter
pub struct HumanFormatter;

impl OutputFormatter for HumanFormatter {
    fn format_restore(&self, report: &RestoreReport<'_>) -> String {
        let summary = report.summary;
        let mut output = String::new();
        output.push_str(&format!(
            "Restored {} entries ({}) in {:.2}s using {} thread(s)\n",
            report.stats.entries_dispatched,
            format_bytes(report.bytes),
            report.elapsed.as_secs_f64(),
            report.stats.threads_used
        ));
        output.push_str(&format!(
            "  completed:              {}\n",
            summary.completed_files.len()
        ));
        output.push_str(&format!(
            "  created from increment: {}\n",
            summary.created_page_files.len()
        ));
        output.push_str(&format!(
            "  increment blocks into:  {}\n",
            summary.written_increment_files.len()
        ));
        output.push_str(&format!("  blocks applied:         {}\n", summary.block_count()));
        output
    }
}

/// JSON output formatter
pub struct JsonFormatter;

impl OutputFormatter for JsonFormatter {
    fn format_restore(&self, report: &RestoreReport<'_>) -> String {
        let summary = report.summary;
        let value = json!({
            "entries": report.stats.entries_dispatched,
            "bytes": report.bytes,
            "threads": report.stats.threads_used,
            "elapsed_seconds": report.elapsed.as_secs_f64(),
            "completed_files": summary.completed_files,
            "created_page_files": summary.created_page_files,
            "written_increment_files": summary.written_increment_files,
        });
        format!("{}\n", value)
    }
}

/// Creates the formatter for the requested output format
pub fn create_formatter(format: crate::OutputFormat) -> Box<dyn OutputFormatter> {
    match format {
        crate::OutputFormat::Human => Box::new(HumanFormatter),
        crate::OutputFormat::Json => Box::new(JsonFormatter),
    }
}
