use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::episode::RecoveryEpisode;

/// Pair construction knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PairingConfig {
    pub min_occurrences_per_family: usize,
    pub require_cross_session: bool,
    pub max_wall_time_ratio: f64,
    pub max_token_count_ratio: f64,
}

impl Default for PairingConfig {
    fn default() -> Self {
        Self {
            min_occurrences_per_family: 2,
            require_cross_session: true,
            max_wall_time_ratio: 4.0,
            max_token_count_ratio: 4.0,
        }
    }
}

impl PairingConfig {
    pub fn validate(&self) -> Result<(), String> {
        if self.min_occurrences_per_family < 2 {
            return Err(format!(
                "minOccurrencesPerFamily must be >= 2: {}",
                self.min_occurrences_per_family
            ));
        }
        if !self.max_wall_time_ratio.is_finite() || self.max_wall_time_ratio < 1.0 {
            return Err(format!(
                "maxWallTimeRatio must be >= 1: {}",
                self.max_wall_time_ratio
            ));
        }
        if !self.max_token_count_ratio.is_finite() || self.max_token_count_ratio < 1.0 {
            return Err(format!(
                "maxTokenCountRatio must be >= 1: {}",
                self.max_token_count_ratio
            ));
        }
        Ok(())
    }
}

/// Two same-family episodes ordered by start time, crossing sessions,
/// within the configured resource-ratio bounds.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailurePair {
    pub family_signature: String,
    pub off: RecoveryEpisode,
    pub on: RecoveryEpisode,
    pub wall_time_ratio: f64,
    pub token_count_ratio: f64,
    pub quality_score: f64,
}

impl FailurePair {
    /// Stable identifier used when seeding the bootstrap
    pub fn id(&self) -> String {
        format!("{}::{}", self.off.start_event_id, self.on.start_event_id)
    }
}

/// Why candidate transitions were dropped, plus volume counters
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairingDiagnostics {
    pub episodes_seen: usize,
    pub families_seen: usize,
    pub families_eligible: usize,
    pub candidate_transitions: usize,
    pub dropped_small_family: usize,
    pub dropped_same_session: usize,
    pub dropped_wall_time_ratio: usize,
    pub dropped_token_count_ratio: usize,
    pub pairs_built: usize,
}

/// Group episodes into families and build adjacent OFF -> ON pairs
pub fn build_pairs(
    episodes: &[RecoveryEpisode],
    config: &PairingConfig,
) -> (Vec<FailurePair>, PairingDiagnostics) {
    let mut diagnostics = PairingDiagnostics {
        episodes_seen: episodes.len(),
        ..Default::default()
    };

    let mut families: BTreeMap<&str, Vec<&RecoveryEpisode>> = BTreeMap::new();
    for episode in episodes {
        families
            .entry(episode.family_signature.as_str())
            .or_default()
            .push(episode);
    }
    diagnostics.families_seen = families.len();

    let mut pairs = Vec::new();
    for (family, mut members) in families {
        if members.len() < config.min_occurrences_per_family {
            diagnostics.dropped_small_family += 1;
            continue;
        }
        diagnostics.families_eligible += 1;
        members.sort_by(|a, b| {
            a.started_at
                .cmp(&b.started_at)
                .then_with(|| a.start_event_id.cmp(&b.start_event_id))
        });

        // Disjoint consecutive (off, on) chunks: each episode joins at most
        // one pair.
        for chunk in members.chunks(2) {
            if chunk.len() < 2 {
                continue;
            }
            let (off, on) = (chunk[0], chunk[1]);
            diagnostics.candidate_transitions += 1;

            if config.require_cross_session && off.session_id == on.session_id {
                diagnostics.dropped_same_session += 1;
                continue;
            }

            let wall_ratio = bounded_ratio(off.wall_time_ms as f64, on.wall_time_ms as f64);
            if wall_ratio > config.max_wall_time_ratio {
                diagnostics.dropped_wall_time_ratio += 1;
                continue;
            }

            let token_ratio = bounded_ratio(off.token_total as f64, on.token_total as f64);
            if token_ratio > config.max_token_count_ratio {
                diagnostics.dropped_token_count_ratio += 1;
                continue;
            }

            let quality_score =
                1.0 / (1.0 + wall_ratio.log2().abs() + token_ratio.log2().abs());

            pairs.push(FailurePair {
                family_signature: family.to_string(),
                off: off.clone(),
                on: on.clone(),
                wall_time_ratio: wall_ratio,
                token_count_ratio: token_ratio,
                quality_score,
            });
        }
    }

    diagnostics.pairs_built = pairs.len();
    (pairs, diagnostics)
}

/// `max/min` of two non-negative totals. Both zero compares equal (1);
/// one-sided zero is unbounded and falls outside every configured maximum.
fn bounded_ratio(a: f64, b: f64) -> f64 {
    if a == 0.0 && b == 0.0 {
        return 1.0;
    }
    if a == 0.0 || b == 0.0 {
        return f64::INFINITY;
    }
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    hi / lo
}
