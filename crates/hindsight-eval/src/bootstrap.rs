use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::observed::relative_reduction;
use crate::pairing::FailurePair;

/// Bootstrap / trust knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TrustConfig {
    pub bootstrap_samples: usize,
    pub confidence_level: f64,
    pub seed: u64,
}

impl Default for TrustConfig {
    fn default() -> Self {
        Self {
            bootstrap_samples: 2000,
            confidence_level: 0.95,
            seed: 42,
        }
    }
}

impl TrustConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.bootstrap_samples < 200 {
            return Err(format!(
                "bootstrapSamples must be >= 200: {}",
                self.bootstrap_samples
            ));
        }
        if !(0.5..=0.999).contains(&self.confidence_level) {
            return Err(format!(
                "confidenceLevel must be within [0.5, 0.999]: {}",
                self.confidence_level
            ));
        }
        Ok(())
    }
}

/// `(low, median, high)` at `(alpha/2, 0.5, 1 - alpha/2)`
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Interval {
    pub low: f64,
    pub median: f64,
    pub high: f64,
}

/// Bootstrap output attached to gate reports
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrustSummary {
    pub bootstrap_samples: usize,
    pub confidence_level: f64,
    pub seed: u64,
    pub effective_seed: u64,
    pub intervals: BTreeMap<String, Interval>,
}

/// Deterministic 64-bit LCG (MMIX multiplier). The stream is strictly
/// sequential within one draw so results are bit-identical across runs.
struct Lcg {
    state: u64,
}

impl Lcg {
    fn new(seed: u64) -> Self {
        Self {
            state: seed.wrapping_mul(0x9E37_79B9_7F4A_7C15).wrapping_add(1),
        }
    }

    fn next_u64(&mut self) -> u64 {
        self.state = self
            .state
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.state
    }

    fn next_index(&mut self, n: usize) -> usize {
        ((self.next_u64() >> 33) as usize) % n
    }
}

fn fnv1a(bytes: &[u8]) -> u64 {
    let mut hash: u64 = 0xcbf2_9ce4_8422_2325;
    for byte in bytes {
        hash ^= *byte as u64;
        hash = hash.wrapping_mul(0x0000_0100_0000_01B3);
    }
    hash
}

/// Effective seed: configured seed XOR a hash of the pair identity list,
/// so a different pair set gets a different (but reproducible) stream.
pub fn seed_for_pairs(seed: u64, pairs: &[FailurePair]) -> u64 {
    let joined = pairs
        .iter()
        .map(|pair| pair.id())
        .collect::<Vec<_>>()
        .join("\n");
    seed ^ fnv1a(joined.as_bytes())
}

fn quantile(sorted: &[f64], q: f64) -> f64 {
    if sorted.is_empty() {
        return 0.0;
    }
    let index = (((sorted.len() - 1) as f64) * q).round() as usize;
    sorted[index.min(sorted.len() - 1)]
}

fn interval_of(mut values: Vec<f64>, confidence_level: f64) -> Interval {
    values.sort_by(|a, b| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal));
    let alpha = 1.0 - confidence_level;
    Interval {
        low: quantile(&values, alpha / 2.0),
        median: quantile(&values, 0.5),
        high: quantile(&values, 1.0 - alpha / 2.0),
    }
}

struct DrawTotals {
    retries_off: f64,
    retries_on: f64,
    wall_off: f64,
    wall_on: f64,
    tokens_off: f64,
    tokens_on: f64,
    proxy_off: f64,
    proxy_on: f64,
    harmful_off: f64,
    harmful_on: f64,
}

fn draw_totals(pairs: &[FailurePair], indices: &[usize]) -> DrawTotals {
    let mut totals = DrawTotals {
        retries_off: 0.0,
        retries_on: 0.0,
        wall_off: 0.0,
        wall_on: 0.0,
        tokens_off: 0.0,
        tokens_on: 0.0,
        proxy_off: 0.0,
        proxy_on: 0.0,
        harmful_off: 0.0,
        harmful_on: 0.0,
    };
    for &index in indices {
        let pair = &pairs[index];
        totals.retries_off += pair.off.retries as f64;
        totals.retries_on += pair.on.retries as f64;
        totals.wall_off += pair.off.wall_time_ms as f64;
        totals.wall_on += pair.on.wall_time_ms as f64;
        totals.tokens_off += pair.off.token_total as f64;
        totals.tokens_on += pair.on.token_total as f64;
        totals.proxy_off += pair.off.token_proxy;
        totals.proxy_on += pair.on.token_proxy;
        totals.harmful_off += pair.off.harmful_retries() as f64;
        totals.harmful_on += pair.on.harmful_retries() as f64;
    }
    totals
}

/// Paired bootstrap over the observed-lane metrics: resample `N` pairs with
/// replacement `bootstrapSamples` times and recompute each aggregate.
pub fn bootstrap_observed(pairs: &[FailurePair], config: &TrustConfig) -> Result<TrustSummary> {
    config
        .validate()
        .map_err(crate::error::Error::Config)?;

    let effective_seed = seed_for_pairs(config.seed, pairs);
    let mut summary = TrustSummary {
        bootstrap_samples: config.bootstrap_samples,
        confidence_level: config.confidence_level,
        seed: config.seed,
        effective_seed,
        intervals: BTreeMap::new(),
    };
    if pairs.is_empty() {
        return Ok(summary);
    }

    let mut rng = Lcg::new(effective_seed);
    let mut dead_end = Vec::with_capacity(config.bootstrap_samples);
    let mut wall = Vec::with_capacity(config.bootstrap_samples);
    let mut tokens = Vec::with_capacity(config.bootstrap_samples);
    let mut proxy = Vec::with_capacity(config.bootstrap_samples);
    let mut avoided = Vec::with_capacity(config.bootstrap_samples);

    let mut indices = vec![0usize; pairs.len()];
    for _ in 0..config.bootstrap_samples {
        for slot in indices.iter_mut() {
            *slot = rng.next_index(pairs.len());
        }
        let totals = draw_totals(pairs, &indices);
        dead_end.push(relative_reduction(totals.retries_off, totals.retries_on));
        wall.push(relative_reduction(totals.wall_off, totals.wall_on));
        tokens.push(relative_reduction(totals.tokens_off, totals.tokens_on));
        proxy.push(relative_reduction(totals.proxy_off, totals.proxy_on));
        avoided.push((totals.retries_off - totals.retries_on) / pairs.len() as f64);
    }

    summary.intervals.insert(
        "relativeDeadEndReduction".to_string(),
        interval_of(dead_end, config.confidence_level),
    );
    summary.intervals.insert(
        "relativeWallTimeReduction".to_string(),
        interval_of(wall, config.confidence_level),
    );
    summary.intervals.insert(
        "relativeTokenCountReduction".to_string(),
        interval_of(tokens, config.confidence_level),
    );
    summary.intervals.insert(
        "relativeTokenProxyReduction".to_string(),
        interval_of(proxy, config.confidence_level),
    );
    summary.intervals.insert(
        "expectedDeadEndsAvoided".to_string(),
        interval_of(avoided, config.confidence_level),
    );

    Ok(summary)
}

/// Same bootstrap discipline as the observed lane, over harmful-retry totals
pub fn bootstrap_trajectory(pairs: &[FailurePair], config: &TrustConfig) -> Result<TrustSummary> {
    config
        .validate()
        .map_err(crate::error::Error::Config)?;

    let effective_seed = seed_for_pairs(config.seed, pairs);
    let mut summary = TrustSummary {
        bootstrap_samples: config.bootstrap_samples,
        confidence_level: config.confidence_level,
        seed: config.seed,
        effective_seed,
        intervals: BTreeMap::new(),
    };
    if pairs.is_empty() {
        return Ok(summary);
    }

    let mut rng = Lcg::new(effective_seed);
    let mut harmful = Vec::with_capacity(config.bootstrap_samples);
    let mut indices = vec![0usize; pairs.len()];
    for _ in 0..config.bootstrap_samples {
        for slot in indices.iter_mut() {
            *slot = rng.next_index(pairs.len());
        }
        let totals = draw_totals(pairs, &indices);
        harmful.push(relative_reduction(totals.harmful_off, totals.harmful_on));
    }

    summary.intervals.insert(
        "relativeHarmfulRetryReduction".to_string(),
        interval_of(harmful, config.confidence_level),
    );

    Ok(summary)
}
