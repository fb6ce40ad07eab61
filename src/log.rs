use serde::{Deserialize, Serialize};
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use chrono::Utc;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemStatus {
    Completed,
    Rejected,
    Failed,
}

/// One machine-readable record per item event, appended as JSONL.
#[derive(Serialize, Deserialize, Debug)]
pub struct TransferLogEntry {
    pub timestamp: String,
    pub direction: String,
    pub path: String,
    pub bytes: i64,
    pub status: ItemStatus,
    pub error: Option<String>,
}

impl TransferLogEntry {
    pub fn new(direction: &str, path: &str, bytes: i64, status: ItemStatus) -> Self {
        TransferLogEntry {
            timestamp: Utc::now().to_rfc3339(),
            direction: direction.to_owned(),
            path: path.to_owned(),
            bytes,
            status,
            error: None,
        }
    }

    pub fn with_error(mut self, error: impl Into<String>) -> Self {
        self.error = Some(error.into());
        self
    }
}

pub struct TransferLog {
    log_file_path: PathBuf,
}

impl TransferLog {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        TransferLog {
            log_file_path: path.as_ref().to_path_buf(),
        }
    }

    pub fn add_entry(&self, entry: TransferLogEntry) -> Result<()> {
        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.log_file_path)
            .context("Failed to open transfer log file")?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer(&mut writer, &entry)?;
        writer.write_all(b"\n")?;
        writer.flush()?;
        Ok(())
    }

    pub fn read_log(&self) -> Result<Vec<TransferLogEntry>> {
        if !self.log_file_path.exists() {
            return Ok(Vec::new());
        }
        let file = File::open(&self.log_file_path)
            .context("Failed to open transfer log file for reading")?;
        let reader = BufReader::new(file);
        let mut entries = Vec::new();
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            let entry: TransferLogEntry = serde_json::from_str(&line)?;
            entries.push(entry);
        }
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn entries_round_trip() {
        let tmp = TempDir::new().unwrap();
        let log = TransferLog::new(tmp.path().join("transfers.jsonl"));

        log.add_entry(TransferLogEntry::new("gorg", "A/b.txt", 3, ItemStatus::Completed))
            .unwrap();
        log.add_entry(
            TransferLogEntry::new("zorg", "secret.dat", 0, ItemStatus::Rejected)
                .with_error("operator said no"),
        )
        .unwrap();

        let entries = log.read_log().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].direction, "gorg");
        assert_eq!(entries[0].status, ItemStatus::Completed);
        assert_eq!(entries[1].status, ItemStatus::Rejected);
        assert_eq!(entries[1].error.as_deref(), Some("operator said no"));
    }

    #[test]
    fn missing_file_reads_empty() {
        let tmp = TempDir::new().unwrap();
        let log = TransferLog::new(tmp.path().join("never-written.jsonl"));
        assert!(log.read_log().unwrap().is_empty());
    }
}
