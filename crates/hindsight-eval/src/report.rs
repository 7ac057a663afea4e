use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::bootstrap::{bootstrap_observed, bootstrap_trajectory, TrustConfig, TrustSummary};
use crate::episode::RecoveryEpisode;
use crate::error::Result;
use crate::observed::{
    self, GateResult, ObservedAggregate, ObservedThresholds,
};
use crate::pairing::{FailurePair, PairingConfig, PairingDiagnostics};
use crate::strata::{stratify, StrataReport};
use crate::trajectory::{self, TrajectoryAggregate, TrajectoryThresholds};

/// Compact per-episode view embedded in reports
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeSummary {
    pub session_id: String,
    pub family_signature: String,
    pub start_event_id: String,
    pub retries: u64,
    pub wall_time_ms: u64,
    pub token_total: u64,
}

impl From<&RecoveryEpisode> for EpisodeSummary {
    fn from(episode: &RecoveryEpisode) -> Self {
        Self {
            session_id: episode.session_id.clone(),
            family_signature: episode.family_signature.clone(),
            start_event_id: episode.start_event_id.clone(),
            retries: episode.retries,
            wall_time_ms: episode.wall_time_ms,
            token_total: episode.token_total,
        }
    }
}

/// Compact per-pair view embedded in reports
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PairSummary {
    pub family_signature: String,
    pub off_session_id: String,
    pub on_session_id: String,
    pub off_retries: u64,
    pub on_retries: u64,
    pub off_wall_time_ms: u64,
    pub on_wall_time_ms: u64,
    pub off_token_total: u64,
    pub on_token_total: u64,
    pub quality_score: f64,
}

impl From<&FailurePair> for PairSummary {
    fn from(pair: &FailurePair) -> Self {
        Self {
            family_signature: pair.family_signature.clone(),
            off_session_id: pair.off.session_id.clone(),
            on_session_id: pair.on.session_id.clone(),
            off_retries: pair.off.retries,
            on_retries: pair.on.retries,
            off_wall_time_ms: pair.off.wall_time_ms,
            on_wall_time_ms: pair.on.wall_time_ms,
            off_token_total: pair.off.token_total,
            on_token_total: pair.on.token_total,
            quality_score: pair.quality_score,
        }
    }
}

/// Observed-A/B gate report, the primary evaluation document
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObservedGateReport {
    pub thresholds: ObservedThresholds,
    pub pairing: PairingConfig,
    pub pairing_diagnostics: PairingDiagnostics,
    pub episode_count: usize,
    pub episodes: Vec<EpisodeSummary>,
    pub pair_count: usize,
    pub pairs: Vec<PairSummary>,
    pub aggregate: ObservedAggregate,
    pub trust_summary: TrustSummary,
    pub gate_result: GateResult,
    pub strata: StrataReport,
}

/// Trajectory-outcome gate report, the harmful-retry lane
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TrajectoryGateReport {
    pub thresholds: TrajectoryThresholds,
    pub pairing: PairingConfig,
    pub pairing_diagnostics: PairingDiagnostics,
    pub episode_count: usize,
    pub pair_count: usize,
    pub pairs: Vec<PairSummary>,
    pub aggregate: TrajectoryAggregate,
    pub trust_summary: TrustSummary,
    pub gate_result: GateResult,
}

/// Build the observed-lane report end to end from extracted episodes
pub fn build_observed_report(
    episodes: &[RecoveryEpisode],
    pairs: &[FailurePair],
    pairing_diagnostics: PairingDiagnostics,
    pairing: &PairingConfig,
    thresholds: &ObservedThresholds,
    trust: &TrustConfig,
) -> Result<ObservedGateReport> {
    let aggregate = observed::aggregate_pairs(pairs);
    let gate_result = observed::gate(&aggregate, thresholds);
    let trust_summary = bootstrap_observed(pairs, trust)?;
    let strata = stratify(pairs, thresholds);

    Ok(ObservedGateReport {
        thresholds: thresholds.clone(),
        pairing: pairing.clone(),
        pairing_diagnostics,
        episode_count: episodes.len(),
        episodes: episodes.iter().map(EpisodeSummary::from).collect(),
        pair_count: pairs.len(),
        pairs: pairs.iter().map(PairSummary::from).collect(),
        aggregate,
        trust_summary,
        gate_result,
        strata,
    })
}

/// Build the trajectory-lane report from the same pairs
pub fn build_trajectory_report(
    episodes: &[RecoveryEpisode],
    pairs: &[FailurePair],
    pairing_diagnostics: PairingDiagnostics,
    pairing: &PairingConfig,
    thresholds: &TrajectoryThresholds,
    trust: &TrustConfig,
) -> Result<TrajectoryGateReport> {
    let aggregate = trajectory::aggregate_pairs(pairs);
    let gate_result = trajectory::gate(&aggregate, thresholds);
    let trust_summary = bootstrap_trajectory(pairs, trust)?;

    Ok(TrajectoryGateReport {
        thresholds: thresholds.clone(),
        pairing: pairing.clone(),
        pairing_diagnostics,
        episode_count: episodes.len(),
        pair_count: pairs.len(),
        pairs: pairs.iter().map(PairSummary::from).collect(),
        aggregate,
        trust_summary,
        gate_result,
    })
}

/// Export pair summaries as CSV for spreadsheet triage
pub fn export_pairs_csv(pairs: &[FailurePair], path: impl AsRef<Path>) -> Result<()> {
    let mut writer = csv::Writer::from_path(path.as_ref())?;
    writer.write_record([
        "family",
        "offSession",
        "onSession",
        "offRetries",
        "onRetries",
        "offWallTimeMs",
        "onWallTimeMs",
        "offTokenTotal",
        "onTokenTotal",
        "qualityScore",
    ])?;
    for pair in pairs {
        let record = vec![
            pair.family_signature.clone(),
            pair.off.session_id.clone(),
            pair.on.session_id.clone(),
            pair.off.retries.to_string(),
            pair.on.retries.to_string(),
            pair.off.wall_time_ms.to_string(),
            pair.on.wall_time_ms.to_string(),
            pair.off.token_total.to_string(),
            pair.on.token_total.to_string(),
            format!("{:.4}", pair.quality_score),
        ];
        writer.write_record(&record)?;
    }
    writer.flush().map_err(|err| crate::error::Error::Io(err))?;
    Ok(())
}
