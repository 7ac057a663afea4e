use serde::{Deserialize, Serialize};

use crate::observed::{relative_reduction, GateResult};
use crate::pairing::FailurePair;

/// Thresholds added by the trajectory-outcome lane
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrajectoryThresholds {
    pub min_pair_count: usize,
    pub min_relative_harmful_retry_reduction: f64,
    /// Applies to both the OFF and ON sides
    pub min_judgeable_coverage: f64,
}

impl Default for TrajectoryThresholds {
    fn default() -> Self {
        Self {
            min_pair_count: 3,
            min_relative_harmful_retry_reduction: 0.20,
            min_judgeable_coverage: 0.60,
        }
    }
}

/// Harmful / benign / abstained retry totals per pair side
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrajectoryAggregate {
    pub pair_count: usize,
    pub retries_off: u64,
    pub retries_on: u64,
    pub harmful_retries_off: u64,
    pub harmful_retries_on: u64,
    pub benign_retries_off: u64,
    pub benign_retries_on: u64,
    pub abstained_off: u64,
    pub abstained_on: u64,
    pub relative_harmful_retry_reduction: f64,
    pub judgeable_coverage_off: f64,
    pub judgeable_coverage_on: f64,
}

/// `(retries - abstained) / retries`; a side with no retries is fully judged
pub fn judgeable_coverage(retries: u64, abstained: u64) -> f64 {
    if retries == 0 {
        return 1.0;
    }
    (retries.saturating_sub(abstained)) as f64 / retries as f64
}

/// Classify-and-count aggregation over the same pairs as the observed lane
pub fn aggregate_pairs(pairs: &[FailurePair]) -> TrajectoryAggregate {
    let mut aggregate = TrajectoryAggregate {
        pair_count: pairs.len(),
        ..Default::default()
    };

    for pair in pairs {
        aggregate.retries_off += pair.off.retries;
        aggregate.retries_on += pair.on.retries;
        aggregate.harmful_retries_off += pair.off.harmful_retries();
        aggregate.harmful_retries_on += pair.on.harmful_retries();
        aggregate.benign_retries_off += pair.off.benign_retries();
        aggregate.benign_retries_on += pair.on.benign_retries();
        aggregate.abstained_off += pair.off.abstained_retries();
        aggregate.abstained_on += pair.on.abstained_retries();
    }

    aggregate.relative_harmful_retry_reduction = relative_reduction(
        aggregate.harmful_retries_off as f64,
        aggregate.harmful_retries_on as f64,
    );
    aggregate.judgeable_coverage_off =
        judgeable_coverage(aggregate.retries_off, aggregate.abstained_off);
    aggregate.judgeable_coverage_on =
        judgeable_coverage(aggregate.retries_on, aggregate.abstained_on);

    aggregate
}

/// Apply the trajectory-lane thresholds
pub fn gate(aggregate: &TrajectoryAggregate, thresholds: &TrajectoryThresholds) -> GateResult {
    let mut result = GateResult::passing();
    let mut check = |condition: bool, failure: String| {
        if !condition {
            result.pass = false;
            result.failures.push(failure);
        }
    };

    check(
        aggregate.pair_count >= thresholds.min_pair_count,
        format!(
            "pair count {} < {}",
            aggregate.pair_count, thresholds.min_pair_count
        ),
    );
    check(
        aggregate.relative_harmful_retry_reduction
            >= thresholds.min_relative_harmful_retry_reduction,
        format!(
            "relative harmful-retry reduction {:.4} < {:.4}",
            aggregate.relative_harmful_retry_reduction,
            thresholds.min_relative_harmful_retry_reduction
        ),
    );
    check(
        aggregate.judgeable_coverage_off >= thresholds.min_judgeable_coverage,
        format!(
            "judgeable coverage off {:.4} < {:.4}",
            aggregate.judgeable_coverage_off, thresholds.min_judgeable_coverage
        ),
    );
    check(
        aggregate.judgeable_coverage_on >= thresholds.min_judgeable_coverage,
        format!(
            "judgeable coverage on {:.4} < {:.4}",
            aggregate.judgeable_coverage_on, thresholds.min_judgeable_coverage
        ),
    );

    result
}
