//! Line item aggregation: folds raw rows into capacity buckets and a residual
//!
//! Line items and buckets keep first-observed order; the allocation engine uses
//! that order to break remainder ties.

use super::normalizer::{BusinessKey, CategoryKey, RawRow, UnassignedSentinel, FIELD_HOURS};
use std::collections::HashMap;

/// Upper bound for any line item total, so every output quantity fits in `i64`
pub const MAX_TOTAL_UNITS: u64 = i64::MAX as u64;

/// Capacity observed for one category of a line item
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Bucket {
    pub category: CategoryKey,
    /// Signed sum of matching rows, as observed
    pub observed_units: i64,
}

impl Bucket {
    pub fn new(category: CategoryKey) -> Self {
        Self {
            category,
            observed_units: 0,
        }
    }

    /// Capacity available to absorb an adjustment; a net-negative bucket has none
    pub fn capacity_units(&self) -> u64 {
        self.observed_units.max(0) as u64
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LineItem {
    pub key: BusinessKey,
    buckets: Vec<Bucket>,
    bucket_index: HashMap<CategoryKey, usize>,
    residual_units: u64,
}

impl LineItem {
    pub fn new(key: BusinessKey) -> Self {
        Self {
            key,
            buckets: Vec::new(),
            bucket_index: HashMap::new(),
            residual_units: 0,
        }
    }

    /// Buckets in first-observed order
    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    pub fn bucket(&self, category: &CategoryKey) -> Option<&Bucket> {
        self.bucket_index.get(category).map(|&idx| &self.buckets[idx])
    }

    /// Unassigned adjustment amount, always non-negative
    pub fn residual_units(&self) -> u64 {
        self.residual_units
    }

    /// Never exceeds `MAX_TOTAL_UNITS`
    pub fn total_capacity_units(&self) -> u64 {
        self.buckets.iter().map(Bucket::capacity_units).sum()
    }

    /// Returns false, leaving the item untouched, when the residual would
    /// exceed `i64::MAX`.
    fn add_residual(&mut self, units: i64) -> bool {
        match self.residual_units.checked_add(units.unsigned_abs()) {
            Some(total) if total <= MAX_TOTAL_UNITS => {
                self.residual_units = total;
                true
            }
            _ => false,
        }
    }

    /// Returns false, leaving the item untouched, when the bucket total would
    /// overflow `i64` or push the summed capacity past `i64::MAX`.
    fn add_observed(&mut self, category: CategoryKey, units: i64) -> bool {
        let current = self
            .bucket_index
            .get(&category)
            .map(|&idx| self.buckets[idx].observed_units)
            .unwrap_or(0);
        let Some(updated) = current.checked_add(units) else {
            return false;
        };

        let capacity_after = self.total_capacity_units() as u128 - current.max(0) as u128
            + updated.max(0) as u128;
        if capacity_after > MAX_TOTAL_UNITS as u128 {
            return false;
        }

        let idx = match self.bucket_index.get(&category) {
            Some(&idx) => idx,
            None => {
                let idx = self.buckets.len();
                self.bucket_index.insert(category.clone(), idx);
                self.buckets.push(Bucket::new(category));
                idx
            }
        };
        self.buckets[idx].observed_units = updated;
        true
    }
}

pub struct LineItemAggregator {
    sentinel: UnassignedSentinel,
    items: Vec<LineItem>,
    index: HashMap<BusinessKey, usize>,
    rows_seen: usize,
    rows_dropped: usize,
}

impl LineItemAggregator {
    pub fn new(sentinel: UnassignedSentinel) -> Self {
        Self {
            sentinel,
            items: Vec::new(),
            index: HashMap::new(),
            rows_seen: 0,
            rows_dropped: 0,
        }
    }

    pub fn add_row(&mut self, row: &RawRow) {
        self.rows_seen += 1;

        if row.fields.contains_key(FIELD_HOURS) && row.hours().is_none() {
            log::debug!(
                "Coerced non-numeric quantity to zero: {}",
                row.text(FIELD_HOURS)
            );
        }

        let units = row.quantity_units();
        if units == 0 {
            self.rows_dropped += 1;
            return;
        }

        let key = row.business_key();
        let category = row.category_key();
        let idx = match self.index.get(&key) {
            Some(&idx) => idx,
            None => {
                let idx = self.items.len();
                self.index.insert(key.clone(), idx);
                self.items.push(LineItem::new(key));
                idx
            }
        };

        let item = &mut self.items[idx];
        let accepted = if self.sentinel.matches(&category) {
            item.add_residual(units)
        } else {
            item.add_observed(category, units)
        };

        if !accepted {
            self.rows_dropped += 1;
            log::warn!(
                "⚠️  Dropped row for PO '{}': quantity {} would overflow the line item total",
                item.key.po,
                row.text(FIELD_HOURS)
            );
        }
    }

    pub fn add_rows<'a>(&mut self, rows: impl IntoIterator<Item = &'a RawRow>) {
        for row in rows {
            self.add_row(row);
        }
    }

    pub fn get(&self, key: &BusinessKey) -> Option<&LineItem> {
        self.index.get(key).map(|&idx| &self.items[idx])
    }

    /// Line items in first-observed order
    pub fn line_items(&self) -> &[LineItem] {
        &self.items
    }

    pub fn into_line_items(self) -> Vec<LineItem> {
        self.items
    }

    pub fn rows_seen(&self) -> usize {
        self.rows_seen
    }

    /// Rows whose quantity was zero after conversion, or whose quantity
    /// would push a line item total past `MAX_TOTAL_UNITS`
    pub fn rows_dropped(&self) -> usize {
        self.rows_dropped
    }
}
