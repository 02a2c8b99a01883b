//! SQLite writer for reconciled records
//!
//! Column names follow the output header. Every run gets its own `run_id`;
//! `seq` preserves output order within a run and `units` keeps the exact
//! fixed-point value next to the rendered hours.

use super::projection::OutputRecord;
use super::run::RunSummary;
use super::writer_backend::{ReconcileWriterBackend, ReconcileWriterError};
use crate::sqlite_pragma::apply_optimized_pragmas;
use async_trait::async_trait;
use chrono::Utc;
use rusqlite::{params, Connection};
use std::path::Path;

pub struct SqliteRecordWriter {
    conn: Connection,
    run_id: String,
    batch: Vec<OutputRecord>,
    batch_size: usize,
    next_seq: i64,
}

impl SqliteRecordWriter {
    pub fn new(db_path: impl AsRef<Path>) -> Result<Self, ReconcileWriterError> {
        let run_id = format!("run_{}", Utc::now().format("%Y%m%dT%H%M%S%.6f"));
        Self::with_run_id(db_path, run_id)
    }

    pub fn with_run_id(
        db_path: impl AsRef<Path>,
        run_id: impl Into<String>,
    ) -> Result<Self, ReconcileWriterError> {
        // Ensure parent directory exists
        if let Some(parent) = db_path.as_ref().parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    ReconcileWriterError::Io(std::io::Error::new(
                        e.kind(),
                        format!(
                            "Failed to create database directory {}: {}",
                            parent.display(),
                            e
                        ),
                    ))
                })?;
            }
        }

        let conn = Connection::open(db_path)?;
        apply_optimized_pragmas(&conn)?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS reconciled_rows (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                run_id TEXT NOT NULL,
                seq INTEGER NOT NULL,
                type_of_hours TEXT NOT NULL,
                po TEXT NOT NULL,
                work_city TEXT NOT NULL,
                project TEXT NOT NULL,
                planning_group TEXT NOT NULL,
                role TEXT NOT NULL,
                level TEXT NOT NULL,
                language TEXT NOT NULL,
                week TEXT NOT NULL,
                country TEXT NOT NULL,
                facility TEXT NOT NULL,
                total_hours TEXT NOT NULL,
                units INTEGER NOT NULL,
                UNIQUE(run_id, seq)
            )",
            [],
        )?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_reconciled_po ON reconciled_rows(run_id, po)",
            [],
        )?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS reconcile_runs (
                run_id TEXT PRIMARY KEY,
                generated_at INTEGER NOT NULL,
                rows_read INTEGER NOT NULL,
                rows_dropped INTEGER NOT NULL,
                line_items INTEGER NOT NULL,
                adjusted_line_items INTEGER NOT NULL,
                residual_units INTEGER NOT NULL,
                allocated_units INTEGER NOT NULL,
                leftover_units INTEGER NOT NULL,
                records INTEGER NOT NULL
            )",
            [],
        )?;

        let run_id = run_id.into();
        log::info!("✅ SQLite record writer initialized (run {})", run_id);

        Ok(Self {
            conn,
            run_id,
            batch: Vec::with_capacity(100),
            batch_size: 100,
            next_seq: 0,
        })
    }

    pub fn run_id(&self) -> &str {
        &self.run_id
    }

    fn flush_batch(&mut self) -> Result<(), ReconcileWriterError> {
        if self.batch.is_empty() {
            return Ok(());
        }

        let tx = self.conn.transaction()?;
        let mut seq = self.next_seq;

        for record in &self.batch {
            let key = &record.business_key;
            tx.execute(
                "INSERT INTO reconciled_rows
                 (run_id, seq, type_of_hours, po, work_city, project, planning_group,
                  role, level, language, week, country, facility, total_hours, units)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    self.run_id,
                    seq,
                    record.kind.as_str(),
                    key.po,
                    key.work_city,
                    key.project,
                    key.planning_group,
                    key.role,
                    key.level,
                    key.language,
                    key.week,
                    record.category.country,
                    record.category.facility,
                    record.hours_text(),
                    record.units,
                ],
            )?;
            seq += 1;
        }

        tx.commit()?;
        self.next_seq = seq;

        log::debug!("✅ Flushed {} records to SQLite", self.batch.len());
        self.batch.clear();

        Ok(())
    }
}

fn to_sql_int(value: u128) -> i64 {
    value.min(i64::MAX as u128) as i64
}

#[async_trait]
impl ReconcileWriterBackend for SqliteRecordWriter {
    async fn write_record(&mut self, record: &OutputRecord) -> Result<(), ReconcileWriterError> {
        self.batch.push(record.clone());

        if self.batch.len() >= self.batch_size {
            self.flush_batch()?;
        }

        Ok(())
    }

    async fn write_summary(&mut self, summary: &RunSummary) -> Result<(), ReconcileWriterError> {
        self.conn.execute(
            "INSERT OR REPLACE INTO reconcile_runs
             (run_id, generated_at, rows_read, rows_dropped, line_items, adjusted_line_items,
              residual_units, allocated_units, leftover_units, records)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)",
            params![
                self.run_id,
                summary.generated_at,
                summary.rows_read as i64,
                summary.rows_dropped as i64,
                summary.line_items as i64,
                summary.adjusted_line_items as i64,
                to_sql_int(summary.residual_units),
                to_sql_int(summary.allocated_units),
                to_sql_int(summary.leftover_units),
                summary.records as i64,
            ],
        )?;
        Ok(())
    }

    async fn flush(&mut self) -> Result<(), ReconcileWriterError> {
        self.flush_batch()
    }

    fn backend_type(&self) -> &'static str {
        "SQLite"
    }
}
