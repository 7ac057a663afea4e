use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hindsight_types::{EventType, TraceEvent};

use crate::corpus::SessionCorpus;
use crate::episode::{extract_episodes, RecoveryEpisode};
use crate::pairing::{build_pairs, FailurePair, PairingConfig, PairingDiagnostics};

/// Long-horizon holdout knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HoldoutConfig {
    pub min_session_duration_ms: u64,
    pub min_total_latency_ms: u64,
    pub min_tool_results: usize,
    /// Share of sessions (chronologically last) assigned to eval,
    /// clamped to [0.05, 0.95]
    pub eval_ratio: f64,
    pub strict_family_overlap: bool,
    pub min_family_disjoint_pair_count: usize,
}

impl Default for HoldoutConfig {
    fn default() -> Self {
        Self {
            min_session_duration_ms: 0,
            min_total_latency_ms: 0,
            min_tool_results: 1,
            eval_ratio: 0.30,
            strict_family_overlap: false,
            min_family_disjoint_pair_count: 20,
        }
    }
}

impl HoldoutConfig {
    pub fn clamped_eval_ratio(&self) -> f64 {
        self.eval_ratio.clamp(0.05, 0.95)
    }
}

/// Which lane a report should treat as primary
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum PrimaryLane {
    FullEval,
    FamilyDisjoint,
}

/// Train/eval split with family-overlap accounting and the family-disjoint
/// eval slice reported as an additional lane.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HoldoutReport {
    pub sessions_total: usize,
    pub sessions_kept: usize,
    pub train_session_count: usize,
    pub eval_session_count: usize,
    pub train_family_count: usize,
    pub eval_family_count: usize,
    pub overlapping_family_count: usize,
    pub overlap_rate_by_eval_families: f64,
    pub strict_violation: bool,
    pub eval_pair_count: usize,
    pub family_disjoint_pair_count: usize,
    pub primary_lane: PrimaryLane,
    pub pairing_diagnostics: PairingDiagnostics,
}

/// Outcome bundle: the report plus the pairs for each eval lane
pub struct HoldoutLanes {
    pub report: HoldoutReport,
    pub eval_pairs: Vec<FailurePair>,
    pub family_disjoint_pairs: Vec<FailurePair>,
}

struct SessionWindow<'a> {
    session_id: &'a str,
    events: &'a [TraceEvent],
    started_at: DateTime<Utc>,
}

fn session_passes_floors(events: &[TraceEvent], config: &HoldoutConfig) -> bool {
    let Some(first) = events.first() else {
        return false;
    };
    let Some(last) = events.last() else {
        return false;
    };

    let duration_ms = (last.timestamp - first.timestamp).num_milliseconds().max(0) as u64;
    if duration_ms < config.min_session_duration_ms {
        return false;
    }

    let total_latency: u64 = events
        .iter()
        .filter_map(|e| e.metrics.as_ref().and_then(|m| m.latency_ms))
        .sum();
    if total_latency < config.min_total_latency_ms {
        return false;
    }

    let tool_results = events
        .iter()
        .filter(|e| e.event_type == EventType::ToolResult)
        .count();
    tool_results >= config.min_tool_results
}

fn families_of(episodes: &[RecoveryEpisode]) -> BTreeSet<String> {
    episodes
        .iter()
        .map(|e| e.family_signature.clone())
        .collect()
}

/// Filter sessions by the configured floors, split chronologically by start
/// time, and compute the overlap and family-disjoint lanes.
pub fn analyze_holdout(
    corpus: &SessionCorpus,
    pairing: &PairingConfig,
    config: &HoldoutConfig,
) -> HoldoutLanes {
    let mut kept: Vec<SessionWindow> = corpus
        .iter()
        .filter(|(_, events)| session_passes_floors(events, config))
        .filter_map(|(session_id, events)| {
            events.first().map(|first| SessionWindow {
                session_id,
                events,
                started_at: first.timestamp,
            })
        })
        .collect();
    kept.sort_by(|a, b| {
        a.started_at
            .cmp(&b.started_at)
            .then_with(|| a.session_id.cmp(b.session_id))
    });

    let sessions_kept = kept.len();
    let eval_count = ((sessions_kept as f64) * config.clamped_eval_ratio()).ceil() as usize;
    let eval_count = eval_count.min(sessions_kept);
    let train_count = sessions_kept - eval_count;

    let mut train_episodes = Vec::new();
    for window in &kept[..train_count] {
        train_episodes.extend(extract_episodes(window.session_id, window.events));
    }
    let mut eval_episodes = Vec::new();
    for window in &kept[train_count..] {
        eval_episodes.extend(extract_episodes(window.session_id, window.events));
    }

    let train_families = families_of(&train_episodes);
    let eval_families = families_of(&eval_episodes);
    let overlapping: BTreeSet<&String> = train_families.intersection(&eval_families).collect();
    let overlap_rate = if eval_families.is_empty() {
        0.0
    } else {
        overlapping.len() as f64 / eval_families.len() as f64
    };

    let (eval_pairs, pairing_diagnostics) = build_pairs(&eval_episodes, pairing);

    let disjoint_episodes: Vec<RecoveryEpisode> = eval_episodes
        .iter()
        .filter(|e| !train_families.contains(&e.family_signature))
        .cloned()
        .collect();
    let (family_disjoint_pairs, _) = build_pairs(&disjoint_episodes, pairing);

    let primary_lane = if family_disjoint_pairs.len() >= config.min_family_disjoint_pair_count {
        PrimaryLane::FamilyDisjoint
    } else {
        PrimaryLane::FullEval
    };

    let report = HoldoutReport {
        sessions_total: corpus.len(),
        sessions_kept,
        train_session_count: train_count,
        eval_session_count: eval_count,
        train_family_count: train_families.len(),
        eval_family_count: eval_families.len(),
        overlapping_family_count: overlapping.len(),
        overlap_rate_by_eval_families: overlap_rate,
        strict_violation: config.strict_family_overlap && !overlapping.is_empty(),
        eval_pair_count: eval_pairs.len(),
        family_disjoint_pair_count: family_disjoint_pairs.len(),
        primary_lane,
        pairing_diagnostics,
    };

    HoldoutLanes {
        report,
        eval_pairs,
        family_disjoint_pairs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn tool_result(session: &str, id: &str, offset_s: i64, command: &str, is_error: bool) -> TraceEvent {
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 0, 0, 0).unwrap();
        let mut event = TraceEvent::new(
            id,
            base + Duration::seconds(offset_s),
            session,
            "claude-code",
            EventType::ToolResult,
        );
        event.payload.insert("command".into(), command.into());
        event
            .payload
            .insert("output".into(), if is_error { "Error: boom" } else { "ok" }.into());
        event.payload.insert("isError".into(), is_error.into());
        event
    }

    fn recovery_session(session: &str, day_offset: i64, command: &str) -> Vec<TraceEvent> {
        let start = day_offset * 86_400;
        vec![
            tool_result(session, &format!("{}-f", session), start, command, true),
            tool_result(session, &format!("{}-s", session), start + 30, &format!("{} --fixed", command), false),
        ]
    }

    fn corpus_of(sessions: Vec<Vec<TraceEvent>>) -> SessionCorpus {
        let mut corpus = SessionCorpus::new();
        for events in sessions {
            corpus.insert(events[0].session_id.clone(), events);
        }
        corpus
    }

    #[test]
    fn test_chronological_split_and_overlap() {
        // Ten sessions over ten days, all in the same family
        let corpus = corpus_of(
            (0..10)
                .map(|i| recovery_session(&format!("sess-{:02}", i), i, "pytest tests"))
                .collect(),
        );
        let lanes = analyze_holdout(
            &corpus,
            &PairingConfig::default(),
            &HoldoutConfig::default(),
        );

        assert_eq!(lanes.report.sessions_kept, 10);
        assert_eq!(lanes.report.eval_session_count, 3);
        assert_eq!(lanes.report.train_session_count, 7);
        assert_eq!(lanes.report.eval_pair_count, 1);
        // One shared family across both splits
        assert_eq!(lanes.report.overlapping_family_count, 1);
        assert_eq!(lanes.report.overlap_rate_by_eval_families, 1.0);
        // Overlapping family is excluded from the disjoint lane
        assert_eq!(lanes.report.family_disjoint_pair_count, 0);
        assert_eq!(lanes.report.primary_lane, PrimaryLane::FullEval);
    }

    #[test]
    fn test_disjoint_lane_keeps_unseen_families() {
        let mut sessions: Vec<Vec<TraceEvent>> = (0..7)
            .map(|i| recovery_session(&format!("sess-{:02}", i), i, "pytest tests"))
            .collect();
        // Late sessions introduce a family the train split never saw
        sessions.push(recovery_session("sess-97", 7, "cargo test --workspace"));
        sessions.push(recovery_session("sess-98", 8, "cargo test --workspace"));
        sessions.push(recovery_session("sess-99", 9, "cargo test --workspace"));

        let lanes = analyze_holdout(
            &corpus_of(sessions),
            &PairingConfig::default(),
            &HoldoutConfig::default(),
        );

        assert_eq!(lanes.report.eval_session_count, 3);
        assert_eq!(lanes.report.overlapping_family_count, 0);
        assert!(lanes.report.family_disjoint_pair_count >= 1);
        assert_eq!(
            lanes.report.family_disjoint_pair_count,
            lanes.report.eval_pair_count
        );
    }

    #[test]
    fn test_session_floors_filter() {
        let corpus = corpus_of(vec![
            recovery_session("sess-a", 0, "pytest"),
            vec![tool_result("sess-b", "b-1", 86_400, "ls", false)],
        ]);
        let config = HoldoutConfig {
            min_tool_results: 2,
            ..Default::default()
        };
        let lanes = analyze_holdout(&corpus, &PairingConfig::default(), &config);
        assert_eq!(lanes.report.sessions_total, 2);
        assert_eq!(lanes.report.sessions_kept, 1);
    }

    #[test]
    fn test_strict_mode_flags_overlap() {
        let corpus = corpus_of(
            (0..4)
                .map(|i| recovery_session(&format!("sess-{:02}", i), i, "pytest tests"))
                .collect(),
        );
        let strict = HoldoutConfig {
            strict_family_overlap: true,
            ..Default::default()
        };
        let lanes = analyze_holdout(&corpus, &PairingConfig::default(), &strict);
        assert!(lanes.report.strict_violation);
    }

    #[test]
    fn test_eval_ratio_clamped() {
        let config = HoldoutConfig {
            eval_ratio: 2.0,
            ..Default::default()
        };
        assert_eq!(config.clamped_eval_ratio(), 0.95);
        let config = HoldoutConfig {
            eval_ratio: 0.0,
            ..Default::default()
        };
        assert_eq!(config.clamped_eval_ratio(), 0.05);
    }
}
