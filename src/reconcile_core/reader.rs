//! Asynchronous JSONL row reader
//!
//! Unparseable lines are logged and skipped so one bad line cannot abort a run.

use super::normalizer::RawRow;
use std::path::PathBuf;
use tokio::fs::File;
use tokio::io::{AsyncBufReadExt, BufReader};

#[derive(Debug)]
pub enum ReaderError {
    Io(std::io::Error),
}

impl From<std::io::Error> for ReaderError {
    fn from(err: std::io::Error) -> Self {
        ReaderError::Io(err)
    }
}

impl std::fmt::Display for ReaderError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReaderError::Io(e) => write!(f, "IO error: {}", e),
        }
    }
}

impl std::error::Error for ReaderError {}

pub struct JsonlRowReader {
    path: PathBuf,
    skipped_lines: usize,
}

impl JsonlRowReader {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            skipped_lines: 0,
        }
    }

    /// Read every row from the file; blank lines are ignored
    pub async fn read_all(&mut self) -> Result<Vec<RawRow>, ReaderError> {
        let file = File::open(&self.path).await?;
        let mut lines = BufReader::new(file).lines();
        let mut rows = Vec::new();
        let mut line_no = 0usize;

        log::info!("📖 Reading rows from: {}", self.path.display());

        while let Some(line) = lines.next_line().await? {
            line_no += 1;
            let line = line.trim();
            if line.is_empty() {
                continue;
            }

            match RawRow::from_jsonl(line) {
                Ok(row) => rows.push(row),
                Err(e) => {
                    self.skipped_lines += 1;
                    log::warn!("Skipping unparseable line {}: {}", line_no, e);
                }
            }
        }

        log::info!(
            "✅ Read {} rows ({} lines skipped)",
            rows.len(),
            self.skipped_lines
        );

        Ok(rows)
    }

    pub fn skipped_lines(&self) -> usize {
        self.skipped_lines
    }
}
