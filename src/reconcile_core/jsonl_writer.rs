//! JSONL writer for reconciled records
//!
//! The file is truncated when opened, so identical input yields an identical
//! file. Line one is the column header; each following line is one record as a
//! JSON array of strings in header order. The run summary goes to a sibling
//! `<name>.summary.json` file.

use super::projection::{OutputRecord, OUTPUT_HEADER};
use super::run::RunSummary;
use super::writer_backend::{ReconcileWriterBackend, ReconcileWriterError};
use async_trait::async_trait;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

pub struct RecordsJsonlWriter {
    file: BufWriter<File>,
    path: PathBuf,
    records_written: usize,
}

impl RecordsJsonlWriter {
    pub fn new(path: impl AsRef<Path>) -> Result<Self, ReconcileWriterError> {
        let path = path.as_ref();

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let file = File::create(path)?;
        let mut writer = Self {
            file: BufWriter::new(file),
            path: path.to_path_buf(),
            records_written: 0,
        };
        writer.write_header()?;

        log::info!("📝 Writing reconciled records to: {}", path.display());
        Ok(writer)
    }

    fn write_header(&mut self) -> Result<(), ReconcileWriterError> {
        let json = serde_json::to_string(&OUTPUT_HEADER)?;
        writeln!(self.file, "{}", json)?;
        Ok(())
    }

    pub fn write_record(&mut self, record: &OutputRecord) -> Result<(), ReconcileWriterError> {
        let json = serde_json::to_string(&record.columns())?;
        writeln!(self.file, "{}", json)?;
        self.records_written += 1;
        Ok(())
    }

    pub fn summary_path(&self) -> PathBuf {
        let stem = self
            .path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "output".to_string());
        self.path.with_file_name(format!("{}.summary.json", stem))
    }

    pub fn write_summary(&mut self, summary: &RunSummary) -> Result<(), ReconcileWriterError> {
        let json = serde_json::to_string_pretty(summary)?;
        let summary_path = self.summary_path();
        std::fs::write(&summary_path, json)?;

        log::debug!("Saved run summary to {}", summary_path.display());
        Ok(())
    }

    pub fn flush(&mut self) -> Result<(), ReconcileWriterError> {
        self.file.flush()?;
        Ok(())
    }

    pub fn records_written(&self) -> usize {
        self.records_written
    }
}

impl Drop for RecordsJsonlWriter {
    fn drop(&mut self) {
        let _ = self.file.flush();
    }
}

#[async_trait]
impl ReconcileWriterBackend for RecordsJsonlWriter {
    async fn write_record(&mut self, record: &OutputRecord) -> Result<(), ReconcileWriterError> {
        RecordsJsonlWriter::write_record(self, record)
    }

    async fn write_summary(&mut self, summary: &RunSummary) -> Result<(), ReconcileWriterError> {
        RecordsJsonlWriter::write_summary(self, summary)
    }

    async fn flush(&mut self) -> Result<(), ReconcileWriterError> {
        RecordsJsonlWriter::flush(self)
    }

    fn backend_type(&self) -> &'static str {
        "JSONL"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile_core::normalizer::{BusinessKey, CategoryKey};
    use crate::reconcile_core::projection::RecordKind;
    use tempfile::tempdir;

    fn create_test_record(po: &str, units: i64) -> OutputRecord {
        OutputRecord {
            kind: RecordKind::Adjustment,
            business_key: BusinessKey {
                po: po.to_string(),
                work_city: "Manila".to_string(),
                project: "MUPDA".to_string(),
                planning_group: "PG".to_string(),
                role: "Annotator".to_string(),
                level: "L1".to_string(),
                language: "English".to_string(),
                week: "37".to_string(),
            },
            category: CategoryKey::new("Philippines", "MNL-1"),
            units,
        }
    }

    #[tokio::test]
    async fn test_header_then_records() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("out").join("tagged.jsonl");

        let mut writer = RecordsJsonlWriter::new(&path).unwrap();
        ReconcileWriterBackend::write_record(&mut writer, &create_test_record("PO1", -6_025_000_000))
            .await
            .unwrap();
        ReconcileWriterBackend::flush(&mut writer).await.unwrap();
        assert_eq!(writer.records_written(), 1);

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let header: Vec<String> = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(header[0], "Type of Hours");
        assert_eq!(header[11], "Total Hours");

        let record: Vec<String> = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(record[0], "Max Bill Adjustment");
        assert_eq!(record[1], "PO1");
        assert_eq!(record[11], "-60.25");
    }

    #[tokio::test]
    async fn test_reopen_truncates() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tagged.jsonl");

        {
            let mut writer = RecordsJsonlWriter::new(&path).unwrap();
            writer.write_record(&create_test_record("PO1", -1)).unwrap();
            writer.write_record(&create_test_record("PO2", -2)).unwrap();
        }
        let first = std::fs::read(&path).unwrap();

        {
            let mut writer = RecordsJsonlWriter::new(&path).unwrap();
            writer.write_record(&create_test_record("PO1", -1)).unwrap();
            writer.write_record(&create_test_record("PO2", -2)).unwrap();
        }
        let second = std::fs::read(&path).unwrap();

        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_summary_sidecar() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("tagged.jsonl");
        let mut writer = RecordsJsonlWriter::new(&path).unwrap();

        let summary = RunSummary {
            rows_read: 3,
            residual_units: 10,
            allocated_units: 7,
            leftover_units: 3,
            ..Default::default()
        };
        ReconcileWriterBackend::write_summary(&mut writer, &summary)
            .await
            .unwrap();

        let summary_path = dir.path().join("tagged.summary.json");
        assert_eq!(writer.summary_path(), summary_path);

        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(summary_path).unwrap()).unwrap();
        assert_eq!(parsed["rows_read"], 3);
        assert_eq!(parsed["leftover_units"], 3);
    }
}
