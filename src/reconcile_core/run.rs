//! One reconciliation run: aggregate every row, then allocate and project

use super::aggregator::{LineItem, LineItemAggregator};
use super::allocator::{AllocationEngine, AllocationResult};
use super::normalizer::{RawRow, UnassignedSentinel};
use super::projection::{OutputRecord, ResultProjector};
use super::tiers::TierPolicy;
use chrono::Utc;
use serde::Serialize;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunSummary {
    pub rows_read: usize,
    pub rows_dropped: usize,
    pub line_items: usize,
    /// Line items that carried a nonzero residual
    pub adjusted_line_items: usize,
    /// Run totals are summed in `u128` so any number of line items fits
    pub residual_units: u128,
    pub allocated_units: u128,
    pub leftover_units: u128,
    pub records: usize,
    pub generated_at: i64,
}

impl RunSummary {
    fn record(&mut self, result: &AllocationResult) {
        self.line_items += 1;
        if result.residual_units > 0 {
            self.adjusted_line_items += 1;
        }
        self.residual_units += result.residual_units as u128;
        self.allocated_units += result.total_allocated() as u128;
        self.leftover_units += result.leftover_units as u128;
    }

    pub fn is_conserved(&self) -> bool {
        self.allocated_units + self.leftover_units == self.residual_units
    }
}

pub struct Reconciliation {
    pub line_items: Vec<LineItem>,
    pub results: Vec<AllocationResult>,
    pub records: Vec<OutputRecord>,
    pub summary: RunSummary,
}

pub struct ReconcileRun {
    sentinel: UnassignedSentinel,
    engine: AllocationEngine,
    projector: ResultProjector,
}

impl ReconcileRun {
    pub fn new(policy: TierPolicy, sentinel: UnassignedSentinel) -> Self {
        Self {
            engine: AllocationEngine::new(policy),
            projector: ResultProjector::new(sentinel.clone()),
            sentinel,
        }
    }

    pub fn with_defaults() -> Self {
        Self::new(TierPolicy::default(), UnassignedSentinel::default())
    }

    pub fn engine(&self) -> &AllocationEngine {
        &self.engine
    }

    /// All rows are folded before any line item is allocated.
    pub fn execute<'a>(&self, rows: impl IntoIterator<Item = &'a RawRow>) -> Reconciliation {
        let mut aggregator = LineItemAggregator::new(self.sentinel.clone());
        aggregator.add_rows(rows);

        let mut summary = RunSummary {
            rows_read: aggregator.rows_seen(),
            rows_dropped: aggregator.rows_dropped(),
            generated_at: Utc::now().timestamp(),
            ..Default::default()
        };

        let line_items = aggregator.into_line_items();
        let results: Vec<AllocationResult> = line_items
            .iter()
            .map(|item| self.engine.allocate(item))
            .collect();

        for result in &results {
            summary.record(result);
        }

        let records = self.projector.project(line_items.iter().zip(results.iter()));
        summary.records = records.len();

        log::debug!(
            "Reconciled {} line items ({} adjusted) into {} records",
            summary.line_items,
            summary.adjusted_line_items,
            summary.records
        );

        Reconciliation {
            line_items,
            results,
            records,
            summary,
        }
    }
}
