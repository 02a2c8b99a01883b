//! Projection of allocation results into flat output records

use super::aggregator::{LineItem, MAX_TOTAL_UNITS};
use super::allocator::AllocationResult;
use super::normalizer::{BusinessKey, CategoryKey, UnassignedSentinel};
use super::units::{format_units, units_to_hours};
use serde::Serialize;

pub const OUTPUT_HEADER: [&str; 12] = [
    "Type of Hours",
    "PO",
    "Work City",
    "Project",
    "Planning Group",
    "Role",
    "Level",
    "Language",
    "Week",
    "Country",
    "Facility",
    "Total Hours",
];

/// Variant order is output section order
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum RecordKind {
    #[serde(rename = "SRT")]
    Observed,
    #[serde(rename = "Max Bill Adjustment")]
    Adjustment,
    #[serde(rename = "Unassigned Adjustment")]
    Unassigned,
}

impl RecordKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            RecordKind::Observed => "SRT",
            RecordKind::Adjustment => "Max Bill Adjustment",
            RecordKind::Unassigned => "Unassigned Adjustment",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OutputRecord {
    pub kind: RecordKind,
    pub business_key: BusinessKey,
    pub category: CategoryKey,
    /// Signed quantity in fixed-point units
    pub units: i64,
}

impl OutputRecord {
    pub fn hours_text(&self) -> String {
        format_units(self.units)
    }

    pub fn hours(&self) -> f64 {
        units_to_hours(self.units)
    }

    /// Column values in `OUTPUT_HEADER` order
    pub fn columns(&self) -> Vec<String> {
        let mut columns = Vec::with_capacity(OUTPUT_HEADER.len());
        columns.push(self.kind.as_str().to_string());
        columns.extend(self.business_key.fields().iter().map(|f| f.to_string()));
        columns.push(self.category.country.clone());
        columns.push(self.category.facility.clone());
        columns.push(self.hours_text());
        columns
    }

    fn sort_key(&self) -> (RecordKind, &BusinessKey, &CategoryKey) {
        (self.kind, &self.business_key, &self.category)
    }
}

fn negate(units: u64) -> i64 {
    // Allocations and leftovers never exceed their line item's residual or
    // capacity, both bounded by MAX_TOTAL_UNITS at aggregation
    debug_assert!(units <= MAX_TOTAL_UNITS);
    -(units.min(MAX_TOTAL_UNITS) as i64)
}

pub struct ResultProjector {
    sentinel: UnassignedSentinel,
}

impl ResultProjector {
    pub fn new(sentinel: UnassignedSentinel) -> Self {
        Self { sentinel }
    }

    /// Records for one line item, unsorted
    pub fn project_line(&self, item: &LineItem, result: &AllocationResult) -> Vec<OutputRecord> {
        let mut records = Vec::with_capacity(item.buckets().len() * 2 + 1);

        for bucket in item.buckets() {
            records.push(OutputRecord {
                kind: RecordKind::Observed,
                business_key: item.key.clone(),
                category: bucket.category.clone(),
                units: bucket.observed_units,
            });
        }

        for allocation in &result.allocations {
            if allocation.allocated_units > 0 {
                records.push(OutputRecord {
                    kind: RecordKind::Adjustment,
                    business_key: item.key.clone(),
                    category: allocation.category.clone(),
                    units: negate(allocation.allocated_units),
                });
            }
        }

        if result.leftover_units > 0 {
            records.push(OutputRecord {
                kind: RecordKind::Unassigned,
                business_key: item.key.clone(),
                category: self.sentinel.category(),
                units: negate(result.leftover_units),
            });
        }

        records
    }

    /// Records for every line item, in deterministic output order
    pub fn project<'a>(
        &self,
        entries: impl IntoIterator<Item = (&'a LineItem, &'a AllocationResult)>,
    ) -> Vec<OutputRecord> {
        let mut records: Vec<OutputRecord> = entries
            .into_iter()
            .flat_map(|(item, result)| self.project_line(item, result))
            .collect();
        sort_records(&mut records);
        records
    }
}

/// Stable sort: section by kind, then business key, then category
pub fn sort_records(records: &mut [OutputRecord]) {
    records.sort_by(|a, b| a.sort_key().cmp(&b.sort_key()));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::reconcile_core::aggregator::LineItemAggregator;
    use crate::reconcile_core::allocator::AllocationEngine;
    use crate::reconcile_core::normalizer::{
        RawRow, DEFAULT_UNASSIGNED_COUNTRY, DEFAULT_UNASSIGNED_FACILITY, FIELD_COUNTRY,
        FIELD_FACILITY, FIELD_HOURS, FIELD_PO,
    };
    use serde_json::json;

    fn create_test_row(po: &str, country: &str, facility: &str, hours: f64) -> RawRow {
        RawRow::from_pairs([
            (FIELD_PO, json!(po)),
            (FIELD_COUNTRY, json!(country)),
            (FIELD_FACILITY, json!(facility)),
            (FIELD_HOURS, json!(hours)),
        ])
    }

    fn project(rows: &[RawRow]) -> Vec<OutputRecord> {
        let mut agg = LineItemAggregator::new(UnassignedSentinel::default());
        agg.add_rows(rows);
        let engine = AllocationEngine::with_defaults();
        let items = agg.into_line_items();
        let results: Vec<AllocationResult> = items.iter().map(|i| engine.allocate(i)).collect();
        ResultProjector::new(UnassignedSentinel::default()).project(items.iter().zip(results.iter()))
    }

    #[test]
    fn test_records_per_line_item() {
        let records = project(&[
            create_test_row("PO1", "Philippines", "MNL", 100.0),
            create_test_row("PO1", "India", "BLR", 50.0),
            create_test_row(
                "PO1",
                DEFAULT_UNASSIGNED_COUNTRY,
                DEFAULT_UNASSIGNED_FACILITY,
                -90.0,
            ),
        ]);

        assert_eq!(records.len(), 4);
        assert_eq!(records[0].kind, RecordKind::Observed);
        assert_eq!(records[0].category.country, "India");
        assert_eq!(records[0].hours_text(), "50");
        assert_eq!(records[1].category.country, "Philippines");

        assert_eq!(records[2].kind, RecordKind::Adjustment);
        assert_eq!(records[2].category.country, "India");
        assert_eq!(records[2].hours_text(), "-30");
        assert_eq!(records[3].category.country, "Philippines");
        assert_eq!(records[3].hours_text(), "-60");
    }

    #[test]
    fn test_leftover_placeholder() {
        let records = project(&[
            create_test_row("PO1", "Canada", "YYZ", 1.0),
            create_test_row("PO1", "", "", -3.5),
        ]);

        let placeholder = records.last().unwrap();
        assert_eq!(placeholder.kind, RecordKind::Unassigned);
        assert_eq!(placeholder.category.country, DEFAULT_UNASSIGNED_COUNTRY);
        assert_eq!(placeholder.category.facility, DEFAULT_UNASSIGNED_FACILITY);
        assert_eq!(placeholder.hours_text(), "-2.5");
        assert_eq!(placeholder.hours(), -2.5);
    }

    #[test]
    fn test_columns_match_header() {
        let records = project(&[create_test_row("PO9", "India", "BLR", 7.25)]);
        let columns = records[0].columns();

        assert_eq!(columns.len(), OUTPUT_HEADER.len());
        assert_eq!(columns[0], "SRT");
        assert_eq!(columns[1], "PO9");
        assert_eq!(columns[9], "India");
        assert_eq!(columns[10], "BLR");
        assert_eq!(columns[11], "7.25");
    }

    #[test]
    fn test_ordering_independent_of_input_order() {
        let rows = vec![
            create_test_row("PO2", "India", "BLR", 4.0),
            create_test_row("PO1", "Philippines", "MNL", 3.0),
            create_test_row("PO2", "", "", 1.0),
            create_test_row("PO1", "India", "BLR", 2.0),
            create_test_row("PO1", "", "", 9.0),
        ];
        let mut reversed = rows.clone();
        reversed.reverse();

        let forward = project(&rows);
        let backward = project(&reversed);

        let forward_cols: Vec<Vec<String>> = forward.iter().map(|r| r.columns()).collect();
        let backward_cols: Vec<Vec<String>> = backward.iter().map(|r| r.columns()).collect();
        assert_eq!(forward_cols, backward_cols);
    }
}
