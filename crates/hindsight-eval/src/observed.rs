use serde::{Deserialize, Serialize};

use crate::pairing::FailurePair;

/// Thresholds for the observed A/B gate
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObservedThresholds {
    pub min_pair_count: usize,
    pub min_relative_dead_end_reduction: f64,
    pub min_relative_wall_time_reduction: f64,
    pub min_relative_token_count_reduction: f64,
    pub min_relative_token_proxy_reduction: f64,
    pub min_recovery_success_rate_on: f64,
    pub max_recovery_success_rate_drop: f64,
}

impl Default for ObservedThresholds {
    fn default() -> Self {
        Self {
            min_pair_count: 3,
            min_relative_dead_end_reduction: 0.25,
            min_relative_wall_time_reduction: 0.10,
            min_relative_token_count_reduction: 0.10,
            min_relative_token_proxy_reduction: 0.10,
            min_recovery_success_rate_on: 0.90,
            max_recovery_success_rate_drop: 0.0,
        }
    }
}

/// Pass/fail verdict with one entry per violated threshold
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateResult {
    pub pass: bool,
    pub failures: Vec<String>,
}

impl GateResult {
    pub fn passing() -> Self {
        Self {
            pass: true,
            failures: Vec::new(),
        }
    }

    fn check(&mut self, condition: bool, failure: String) {
        if !condition {
            self.pass = false;
            self.failures.push(failure);
        }
    }
}

/// Aggregates over OFF/ON pair sides
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservedAggregate {
    pub pair_count: usize,
    pub repeated_dead_end_rate_off: f64,
    pub repeated_dead_end_rate_on: f64,
    pub recovery_success_rate_off: f64,
    pub recovery_success_rate_on: f64,
    pub relative_dead_end_reduction: f64,
    pub relative_wall_time_reduction: f64,
    pub relative_token_count_reduction: f64,
    pub relative_token_proxy_reduction: f64,
    pub absolute_recovery_delta: f64,
    pub expected_dead_ends_avoided: f64,
}

/// `(off - on) / off`, with the zero conventions fixed by contract:
/// both zero is 0, improvement from nothing to something is -1.
pub fn relative_reduction(off_total: f64, on_total: f64) -> f64 {
    if off_total == 0.0 {
        if on_total > 0.0 {
            return -1.0;
        }
        return 0.0;
    }
    (off_total - on_total) / off_total
}

/// Compute pair aggregates for the observed lane
pub fn aggregate_pairs(pairs: &[FailurePair]) -> ObservedAggregate {
    let pair_count = pairs.len();
    if pair_count == 0 {
        return ObservedAggregate::default();
    }
    let n = pair_count as f64;

    let retries_off: u64 = pairs.iter().map(|p| p.off.retries).sum();
    let retries_on: u64 = pairs.iter().map(|p| p.on.retries).sum();
    let wall_off: u64 = pairs.iter().map(|p| p.off.wall_time_ms).sum();
    let wall_on: u64 = pairs.iter().map(|p| p.on.wall_time_ms).sum();
    let tokens_off: u64 = pairs.iter().map(|p| p.off.token_total).sum();
    let tokens_on: u64 = pairs.iter().map(|p| p.on.token_total).sum();
    let proxy_off: f64 = pairs.iter().map(|p| p.off.token_proxy).sum();
    let proxy_on: f64 = pairs.iter().map(|p| p.on.token_proxy).sum();
    let success_off = pairs.iter().filter(|p| p.off.success).count() as f64;
    let success_on = pairs.iter().filter(|p| p.on.success).count() as f64;

    let rate_off = success_off / n;
    let rate_on = success_on / n;

    ObservedAggregate {
        pair_count,
        repeated_dead_end_rate_off: retries_off as f64 / n,
        repeated_dead_end_rate_on: retries_on as f64 / n,
        recovery_success_rate_off: rate_off,
        recovery_success_rate_on: rate_on,
        relative_dead_end_reduction: relative_reduction(retries_off as f64, retries_on as f64),
        relative_wall_time_reduction: relative_reduction(wall_off as f64, wall_on as f64),
        relative_token_count_reduction: relative_reduction(tokens_off as f64, tokens_on as f64),
        relative_token_proxy_reduction: relative_reduction(proxy_off, proxy_on),
        absolute_recovery_delta: rate_on - rate_off,
        expected_dead_ends_avoided: (retries_off as f64 - retries_on as f64) / n,
    }
}

/// Apply every observed-lane threshold
pub fn gate(aggregate: &ObservedAggregate, thresholds: &ObservedThresholds) -> GateResult {
    let mut result = GateResult::passing();

    result.check(
        aggregate.pair_count >= thresholds.min_pair_count,
        format!(
            "pair count {} < {}",
            aggregate.pair_count, thresholds.min_pair_count
        ),
    );
    result.check(
        aggregate.relative_dead_end_reduction >= thresholds.min_relative_dead_end_reduction,
        format!(
            "relative dead-end reduction {:.4} < {:.4}",
            aggregate.relative_dead_end_reduction, thresholds.min_relative_dead_end_reduction
        ),
    );
    result.check(
        aggregate.relative_wall_time_reduction >= thresholds.min_relative_wall_time_reduction,
        format!(
            "relative wall-time reduction {:.4} < {:.4}",
            aggregate.relative_wall_time_reduction, thresholds.min_relative_wall_time_reduction
        ),
    );
    result.check(
        aggregate.relative_token_count_reduction
            >= thresholds.min_relative_token_count_reduction,
        format!(
            "relative token-count reduction {:.4} < {:.4}",
            aggregate.relative_token_count_reduction,
            thresholds.min_relative_token_count_reduction
        ),
    );
    result.check(
        aggregate.relative_token_proxy_reduction
            >= thresholds.min_relative_token_proxy_reduction,
        format!(
            "relative token-proxy reduction {:.4} < {:.4}",
            aggregate.relative_token_proxy_reduction,
            thresholds.min_relative_token_proxy_reduction
        ),
    );
    result.check(
        aggregate.recovery_success_rate_on >= thresholds.min_recovery_success_rate_on,
        format!(
            "recovery success rate on {:.4} < {:.4}",
            aggregate.recovery_success_rate_on, thresholds.min_recovery_success_rate_on
        ),
    );
    result.check(
        aggregate.recovery_success_rate_off - aggregate.recovery_success_rate_on
            <= thresholds.max_recovery_success_rate_drop,
        format!(
            "recovery success rate drop {:.4} > {:.4}",
            aggregate.recovery_success_rate_off - aggregate.recovery_success_rate_on,
            thresholds.max_recovery_success_rate_drop
        ),
    );

    result
}
