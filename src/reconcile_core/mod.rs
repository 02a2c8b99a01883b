//! Reconcile Core - Billing Record Reconciliation Engine
//!
//! Folds raw billing rows into line items, spreads each line item's
//! unassigned quantity over its country buckets by tier, and projects the
//! outcome into flat records.
//!
//! # Architecture
//!
//! ```text
//! JSONL rows → JsonlRowReader → RawRow
//!     ↓
//! LineItemAggregator (BusinessKey → buckets + residual)
//!     ↓
//! AllocationEngine (tiered largest-remainder, fixed-point units)
//!     ↓
//! ResultProjector (SRT / Max Bill Adjustment / Unassigned Adjustment)
//!     ↓
//! ReconcileWriter → JSONL or SQLite backend
//! ```
//!
//! All quantities are carried as integer units of 10^-8 hour, so every
//! line item conserves its residual exactly.

pub mod aggregator;
pub mod allocator;
pub mod normalizer;
pub mod projection;
pub mod reader;
pub mod run;
pub mod tiers;
pub mod units;
pub mod writer_backend;
pub mod jsonl_writer;
pub mod sqlite_writer;
pub mod writer;

pub use aggregator::{Bucket, LineItem, LineItemAggregator, MAX_TOTAL_UNITS};
pub use allocator::{Allocation, AllocationEngine, AllocationError, AllocationResult};
pub use normalizer::{BusinessKey, CategoryKey, RawRow, UnassignedSentinel};
pub use projection::{OutputRecord, RecordKind, ResultProjector, OUTPUT_HEADER};
pub use reader::{JsonlRowReader, ReaderError};
pub use run::{ReconcileRun, Reconciliation, RunSummary};
pub use tiers::{Tier, TierPolicy, TierPolicyError};
pub use units::{format_total_units, format_units, hours_to_units, units_to_hours, UNITS_PER_HOUR};
pub use writer_backend::{ReconcileWriterBackend, ReconcileWriterError};
pub use jsonl_writer::RecordsJsonlWriter;
pub use sqlite_writer::SqliteRecordWriter;
pub use writer::ReconcileWriter;
