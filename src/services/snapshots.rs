//! Record snapshots
//!
//! Each job gets its own directory under `jobs_dir`, holding the bib
//! document before and after every save plus a summary of the run.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Local};

use crate::error::AppResult;
use crate::models::JobReport;
use crate::services::alma::Bib;

pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    /// Store for the job started at `started`
    pub fn new(jobs_dir: &Path, started: DateTime<Local>) -> Self {
        Self {
            dir: jobs_dir.join(started.format("%Y-%m-%dT%H-%M-%S").to_string()),
        }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn save_before(&self, bib: &Bib) -> AppResult<()> {
        self.write(&format!("{}.before.xml", bib.mms_id), &bib.to_xml()?)
    }

    pub fn save_after(&self, bib: &Bib) -> AppResult<()> {
        self.write(&format!("{}.after.xml", bib.mms_id), &bib.to_xml()?)
    }

    pub fn save_summary(&self, report: &JobReport) -> AppResult<()> {
        let json = serde_json::to_string_pretty(report)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        self.write("summary.json", &json)
    }

    fn write(&self, name: &str, contents: &str) -> AppResult<()> {
        fs::create_dir_all(&self.dir)?;
        fs::write(self.dir.join(name), contents)?;
        Ok(())
    }
}
