//! Job report: counters and the events worth telling the operator about.
//!
//! The report lives for one job. It is handed to the job steps and later
//! rendered into the run summary mail and the job directory.

use chrono::{DateTime, Local};
use serde::Serialize;

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ReportLevel {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportEntry {
    pub at: DateTime<Local>,
    pub level: ReportLevel,
    pub message: String,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct JobReport {
    pub entries: Vec<ReportEntry>,
    pub records_changed: usize,
    pub changes_made: usize,
    pub duplicates_removed: usize,
}

impl JobReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn info(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::info!("{}", message);
        self.push(ReportLevel::Info, message);
    }

    pub fn warn(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!("{}", message);
        self.push(ReportLevel::Warning, message);
    }

    pub fn error(&mut self, message: impl Into<String>) {
        let message = message.into();
        tracing::error!("{}", message);
        self.push(ReportLevel::Error, message);
    }

    fn push(&mut self, level: ReportLevel, message: String) {
        self.entries.push(ReportEntry {
            at: Local::now(),
            level,
            message,
        });
    }

    pub fn has_level(&self, level: ReportLevel) -> bool {
        self.entries.iter().any(|e| e.level == level)
    }

    /// Plain-text log of the job, one line per entry
    pub fn render(&self) -> String {
        let mut out = String::new();
        for entry in &self.entries {
            let level = match entry.level {
                ReportLevel::Info => "INFO",
                ReportLevel::Warning => "WARNING",
                ReportLevel::Error => "ERROR",
            };
            out.push_str(&format!(
                "[{} {}] {}\n",
                entry.at.format("%Y-%m-%d %H:%M:%S"),
                level,
                entry.message
            ));
        }
        out.push_str(&format!(
            "\n{} record(s) changed, {} change(s) made, {} duplicate(s) removed\n",
            self.records_changed, self.changes_made, self.duplicates_removed
        ));
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render() {
        let mut report = JobReport::new();
        report.info("Starting job");
        report.warn("The (first) target term could not be authorized.");
        report.records_changed = 2;
        report.changes_made = 3;

        assert!(report.has_level(ReportLevel::Warning));
        assert!(!report.has_level(ReportLevel::Error));

        let text = report.render();
        assert!(text.contains("INFO] Starting job"));
        assert!(text.contains("WARNING] The (first) target term"));
        assert!(text.ends_with("2 record(s) changed, 3 change(s) made, 0 duplicate(s) removed\n"));
    }

    #[test]
    fn test_serializes_levels_in_snake_case() {
        let mut report = JobReport::new();
        report.error("Job aborted");
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["entries"][0]["level"], "error");
        assert_eq!(json["records_changed"], 0);
    }
}
