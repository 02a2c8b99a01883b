//! Tiered, capacity-bounded allocation of unassigned adjustments
//!
//! # Algorithm
//!
//! Tiers are processed in policy order. Within a tier the target
//! `min(remaining, tier_capacity)` is split proportionally to each active
//! bucket's spare capacity:
//!
//! 1. Floor pass: `floor(target * spare / tier_capacity)` per bucket.
//! 2. Largest remainder pass: the shortfall is handed out one unit at a time,
//!    ranked by descending remainder, ties broken by first-observed bucket order.
//!
//! All arithmetic is integer; products are widened to `u128`. The tier's
//! allocations sum exactly to its target, so conservation holds by
//! construction. A final verification pass re-checks
//! `allocated + leftover == residual` and repairs any discrepancy.

use super::aggregator::LineItem;
use super::normalizer::CategoryKey;
use super::tiers::TierPolicy;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AllocationError {
    /// A negative residual reached the engine; the aggregator never produces one.
    NegativeResidual(i64),
}

impl std::fmt::Display for AllocationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AllocationError::NegativeResidual(units) => {
                write!(f, "Negative residual reached allocation engine: {}", units)
            }
        }
    }
}

impl std::error::Error for AllocationError {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Allocation {
    pub category: CategoryKey,
    pub capacity_units: u64,
    pub allocated_units: u64,
}

impl Allocation {
    fn spare_units(&self) -> u64 {
        self.capacity_units - self.allocated_units
    }
}

/// Allocation outcome for one line item, buckets in first-observed order
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AllocationResult {
    pub residual_units: u64,
    pub allocations: Vec<Allocation>,
    /// Residual that no bucket in any tier could absorb
    pub leftover_units: u64,
}

impl AllocationResult {
    pub fn total_allocated(&self) -> u64 {
        self.allocations.iter().map(|a| a.allocated_units).sum()
    }

    pub fn allocated(&self, category: &CategoryKey) -> u64 {
        self.allocations
            .iter()
            .find(|a| &a.category == category)
            .map(|a| a.allocated_units)
            .unwrap_or(0)
    }

    pub fn is_conserved(&self) -> bool {
        self.total_allocated() as u128 + self.leftover_units as u128 == self.residual_units as u128
    }

    /// Bucket indices grouped by tier, in priority order.
    /// Buckets whose country is in no tier never receive units.
    fn tier_groups(&self, policy: &TierPolicy) -> Vec<Vec<usize>> {
        policy
            .tiers()
            .iter()
            .map(|tier| {
                self.allocations
                    .iter()
                    .enumerate()
                    .filter(|(_, a)| tier.contains(&a.category.country))
                    .map(|(idx, _)| idx)
                    .collect()
            })
            .collect()
    }

    /// Re-check conservation and nudge allocations one unit at a time until it
    /// holds. Returns the number of units moved.
    pub(crate) fn reconcile_totals(&mut self, policy: &TierPolicy) -> u64 {
        let accounted = self.total_allocated() as u128 + self.leftover_units as u128;
        let residual = self.residual_units as u128;
        if accounted == residual {
            return 0;
        }

        log::warn!(
            "⚠️  Allocation discrepancy: allocated {} + leftover {} != residual {}, correcting",
            self.total_allocated(),
            self.leftover_units,
            self.residual_units
        );

        let groups = self.tier_groups(policy);
        let mut moved = 0u64;

        if accounted < residual {
            let mut deficit = (residual - accounted) as u64;

            // Add to the highest-priority tier with spare capacity first
            for group in &groups {
                loop {
                    let mut progressed = false;
                    for &idx in group {
                        if deficit == 0 {
                            break;
                        }
                        if self.allocations[idx].spare_units() > 0 {
                            self.allocations[idx].allocated_units += 1;
                            deficit -= 1;
                            moved += 1;
                            progressed = true;
                        }
                    }
                    if deficit == 0 || !progressed {
                        break;
                    }
                }
            }

            // Only reachable when residual exceeds total capacity
            self.leftover_units += deficit;
            moved += deficit;
        } else {
            let mut excess = (accounted - residual) as u64;

            // Remove from the lowest-priority tier first
            for group in groups.iter().rev() {
                loop {
                    let mut progressed = false;
                    for &idx in group.iter().rev() {
                        if excess == 0 {
                            break;
                        }
                        if self.allocations[idx].allocated_units > 0 {
                            self.allocations[idx].allocated_units -= 1;
                            excess -= 1;
                            moved += 1;
                            progressed = true;
                        }
                    }
                    if excess == 0 || !progressed {
                        break;
                    }
                }
            }

            let from_leftover = excess.min(self.leftover_units);
            self.leftover_units -= from_leftover;
            moved += from_leftover;
        }

        moved
    }
}

/// Split `target` across `spares` proportionally using the largest remainder method.
///
/// Requires `target <= sum(spares)`. The result sums exactly to `target`, each
/// share is at most its spare, and each share is its exact proportional value
/// rounded down or up.
fn apportion(target: u64, spares: &[u64]) -> Vec<u64> {
    let total: u128 = spares.iter().map(|&s| s as u128).sum();
    let mut shares = vec![0u64; spares.len()];
    if target == 0 || total == 0 {
        return shares;
    }

    let mut remainders = vec![0u128; spares.len()];
    for (idx, &spare) in spares.iter().enumerate() {
        let numerator = target as u128 * spare as u128;
        shares[idx] = ((numerator / total) as u64).min(spare);
        remainders[idx] = numerator % total;
    }

    let assigned: u64 = shares.iter().sum();
    let mut shortfall = target - assigned;

    // Same denominator for every bucket, so comparing numerator remainders
    // ranks the fractional parts exactly
    let mut ranked: Vec<usize> = (0..spares.len()).collect();
    ranked.sort_by(|&a, &b| remainders[b].cmp(&remainders[a]).then(a.cmp(&b)));

    while shortfall > 0 {
        let mut progressed = false;
        for &idx in &ranked {
            if shortfall == 0 {
                break;
            }
            if shares[idx] < spares[idx] {
                shares[idx] += 1;
                shortfall -= 1;
                progressed = true;
            }
        }
        if !progressed {
            break;
        }
    }

    shares
}

pub struct AllocationEngine {
    policy: TierPolicy,
}

impl AllocationEngine {
    pub fn new(policy: TierPolicy) -> Self {
        Self { policy }
    }

    pub fn with_defaults() -> Self {
        Self::new(TierPolicy::default())
    }

    pub fn policy(&self) -> &TierPolicy {
        &self.policy
    }

    /// Allocate a line item's residual across its buckets
    pub fn allocate(&self, item: &LineItem) -> AllocationResult {
        let allocations = item
            .buckets()
            .iter()
            .map(|b| Allocation {
                category: b.category.clone(),
                capacity_units: b.capacity_units(),
                allocated_units: 0,
            })
            .collect();

        self.distribute(item.residual_units(), allocations)
    }

    /// Allocate from raw values; a negative residual is a caller bug and is rejected.
    ///
    /// `buckets` must be in first-observed order.
    pub fn allocate_units(
        &self,
        residual_units: i64,
        buckets: &[(CategoryKey, u64)],
    ) -> Result<AllocationResult, AllocationError> {
        if residual_units < 0 {
            return Err(AllocationError::NegativeResidual(residual_units));
        }

        let allocations = buckets
            .iter()
            .map(|(category, capacity)| Allocation {
                category: category.clone(),
                capacity_units: *capacity,
                allocated_units: 0,
            })
            .collect();

        Ok(self.distribute(residual_units as u64, allocations))
    }

    fn distribute(&self, residual_units: u64, allocations: Vec<Allocation>) -> AllocationResult {
        let mut result = AllocationResult {
            residual_units,
            allocations,
            leftover_units: 0,
        };
        let mut remaining = residual_units;

        for tier in self.policy.tiers() {
            if remaining == 0 {
                break;
            }

            let active: Vec<usize> = result
                .allocations
                .iter()
                .enumerate()
                .filter(|(_, a)| tier.contains(&a.category.country) && a.spare_units() > 0)
                .map(|(idx, _)| idx)
                .collect();

            if active.is_empty() {
                continue;
            }

            let spares: Vec<u64> = active
                .iter()
                .map(|&idx| result.allocations[idx].spare_units())
                .collect();
            let tier_capacity: u128 = spares.iter().map(|&s| s as u128).sum();
            let tier_target = (remaining as u128).min(tier_capacity) as u64;

            let shares = apportion(tier_target, &spares);
            for (&idx, share) in active.iter().zip(shares) {
                result.allocations[idx].allocated_units += share;
            }

            log::debug!(
                "Tier '{}': placed {} of {} remaining units across {} buckets",
                tier.name,
                tier_target,
                remaining,
                active.len()
            );

            remaining -= tier_target;
        }

        result.leftover_units = remaining;

        if remaining > 0 {
            log::warn!(
                "Requested adjustment {} exceeds available capacity {}; {} units left unassigned",
                residual_units,
                residual_units - remaining,
                remaining
            );
        }

        result.reconcile_totals(&self.policy);
        result
    }
}
