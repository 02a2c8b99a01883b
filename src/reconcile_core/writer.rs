//! Unified writer interface for reconciled records
//!
//! Routes writes to either JSONL or SQLite backend based on configuration.

use super::jsonl_writer::RecordsJsonlWriter;
use super::projection::OutputRecord;
use super::run::RunSummary;
use super::sqlite_writer::SqliteRecordWriter;
use super::writer_backend::{ReconcileWriterBackend, ReconcileWriterError};
use crate::config::BackendType;
use std::path::PathBuf;

/// Unified writer that routes to either JSONL or SQLite backend
pub enum ReconcileWriter {
    Jsonl(RecordsJsonlWriter),
    Sqlite(SqliteRecordWriter),
}

impl ReconcileWriter {
    pub fn new(backend: BackendType, path: PathBuf) -> Result<Self, ReconcileWriterError> {
        match backend {
            BackendType::Jsonl => {
                let writer = RecordsJsonlWriter::new(path)?;
                Ok(ReconcileWriter::Jsonl(writer))
            }
            BackendType::Sqlite => {
                let writer = SqliteRecordWriter::new(path)?;
                Ok(ReconcileWriter::Sqlite(writer))
            }
        }
    }

    pub async fn write_record(&mut self, record: &OutputRecord) -> Result<(), ReconcileWriterError> {
        match self {
            ReconcileWriter::Jsonl(w) => w.write_record(record),
            ReconcileWriter::Sqlite(w) => w.write_record(record).await,
        }
    }

    /// Write every record in order, then flush
    pub async fn write_all(&mut self, records: &[OutputRecord]) -> Result<(), ReconcileWriterError> {
        for record in records {
            self.write_record(record).await?;
        }
        self.flush().await
    }

    pub async fn write_summary(&mut self, summary: &RunSummary) -> Result<(), ReconcileWriterError> {
        match self {
            ReconcileWriter::Jsonl(w) => w.write_summary(summary),
            ReconcileWriter::Sqlite(w) => w.write_summary(summary).await,
        }
    }

    /// Flush pending writes to storage
    pub async fn flush(&mut self) -> Result<(), ReconcileWriterError> {
        match self {
            ReconcileWriter::Jsonl(w) => w.flush(),
            ReconcileWriter::Sqlite(w) => w.flush().await,
        }
    }

    /// Get backend type for logging
    pub fn backend_type(&self) -> &'static str {
        match self {
            ReconcileWriter::Jsonl(w) => w.backend_type(),
            ReconcileWriter::Sqlite(w) => w.backend_type(),
        }
    }
}
