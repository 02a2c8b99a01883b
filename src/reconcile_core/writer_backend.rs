//! Writer backend trait for reconciled output
//!
//! Defines the interface for emitting output records and the run summary to
//! different backends. Backends write the fixed column header before any record.

use super::projection::OutputRecord;
use super::run::RunSummary;
use async_trait::async_trait;

#[derive(Debug)]
pub enum ReconcileWriterError {
    Io(std::io::Error),
    Serialization(serde_json::Error),
    Database(String),
}

impl From<std::io::Error> for ReconcileWriterError {
    fn from(err: std::io::Error) -> Self {
        ReconcileWriterError::Io(err)
    }
}

impl From<serde_json::Error> for ReconcileWriterError {
    fn from(err: serde_json::Error) -> Self {
        ReconcileWriterError::Serialization(err)
    }
}

impl From<rusqlite::Error> for ReconcileWriterError {
    fn from(err: rusqlite::Error) -> Self {
        ReconcileWriterError::Database(err.to_string())
    }
}

impl std::fmt::Display for ReconcileWriterError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReconcileWriterError::Io(e) => write!(f, "IO error: {}", e),
            ReconcileWriterError::Serialization(e) => write!(f, "Serialization error: {}", e),
            ReconcileWriterError::Database(e) => write!(f, "Database error: {}", e),
        }
    }
}

impl std::error::Error for ReconcileWriterError {}

/// Backend trait for writing reconciled records
#[async_trait]
pub trait ReconcileWriterBackend: Send {
    /// Write a single output record
    async fn write_record(&mut self, record: &OutputRecord) -> Result<(), ReconcileWriterError>;

    /// Record the run summary alongside the output
    async fn write_summary(&mut self, summary: &RunSummary) -> Result<(), ReconcileWriterError>;

    /// Flush pending writes to storage
    async fn flush(&mut self) -> Result<(), ReconcileWriterError>;

    /// Get backend type for logging
    fn backend_type(&self) -> &'static str;
}
