use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use hindsight_types::{
    extract_error_signatures, normalize_command_signature, normalize_text, truncate, EventType,
    TraceEvent,
};

use crate::classify::{classify_failure, Classification, FailureKind};
use crate::corpus::SessionCorpus;

/// Family signatures are bounded to this many characters
const FAMILY_SIGNATURE_MAX: usize = 240;

/// A failure inside an episode, classified for the trajectory lane
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EpisodeFailure {
    pub event_id: String,
    pub classification: Classification,
    /// Strictly between the episode's start and end (a retry)
    pub interior: bool,
}

/// First failure to next same-session success, inclusive
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecoveryEpisode {
    pub session_id: String,
    pub family_signature: String,
    pub start_event_id: String,
    pub end_event_id: String,
    pub started_at: DateTime<Utc>,
    pub ended_at: DateTime<Utc>,
    /// Failures strictly between start and end
    pub retries: u64,
    pub wall_time_ms: u64,
    pub token_total: u64,
    pub token_proxy: f64,
    /// Always true by construction; kept explicit for aggregates
    pub success: bool,
    pub model: Option<String>,
    pub failures: Vec<EpisodeFailure>,
}

impl RecoveryEpisode {
    /// Interior failures (retries) classified as harmful
    pub fn harmful_retries(&self) -> u64 {
        self.failures
            .iter()
            .filter(|f| f.interior && f.classification.harmful)
            .count() as u64
    }

    /// Interior failures where the classifier abstained
    pub fn abstained_retries(&self) -> u64 {
        self.failures
            .iter()
            .filter(|f| f.interior && f.classification.abstained)
            .count() as u64
    }

    /// Interior failures judged benign (classified, not harmful)
    pub fn benign_retries(&self) -> u64 {
        self.failures
            .iter()
            .filter(|f| {
                f.interior && !f.classification.harmful && !f.classification.abstained
            })
            .count() as u64
    }

    /// Count of failures of one kind across the whole episode
    pub fn failure_count(&self, kind: FailureKind) -> u64 {
        self.failures
            .iter()
            .filter(|f| f.classification.kind == kind)
            .count() as u64
    }
}

/// Extract recovery episodes from one session's chronological events.
/// Episodes partition the tool-result sequence: each failure starts at most
/// one episode, and scanning resumes after the closing success.
pub fn extract_episodes(session_id: &str, events: &[TraceEvent]) -> Vec<RecoveryEpisode> {
    let tool_results: Vec<usize> = events
        .iter()
        .enumerate()
        .filter(|(_, e)| e.event_type == EventType::ToolResult)
        .map(|(i, _)| i)
        .collect();

    let mut episodes = Vec::new();
    let mut cursor = 0;

    while cursor < tool_results.len() {
        let start_idx = tool_results[cursor];
        if !events[start_idx].is_error() {
            cursor += 1;
            continue;
        }

        // First failure found; look for the next success in this session
        let mut close = None;
        for (offset, &candidate_idx) in tool_results.iter().enumerate().skip(cursor + 1) {
            if !events[candidate_idx].is_error() {
                close = Some((offset, candidate_idx));
                break;
            }
        }

        let Some((close_cursor, end_idx)) = close else {
            // Unrecovered failure; nothing further can close an episode
            break;
        };

        episodes.push(build_episode(
            session_id,
            events,
            &tool_results[cursor..=close_cursor],
            start_idx,
            end_idx,
        ));
        cursor = close_cursor + 1;
    }

    episodes
}

/// Extract episodes across a whole corpus, in session order
pub fn extract_all_episodes(corpus: &SessionCorpus) -> Vec<RecoveryEpisode> {
    let mut episodes = Vec::new();
    for (session_id, events) in corpus {
        episodes.extend(extract_episodes(session_id, events));
    }
    episodes
}

fn build_episode(
    session_id: &str,
    events: &[TraceEvent],
    span_tool_results: &[usize],
    start_idx: usize,
    end_idx: usize,
) -> RecoveryEpisode {
    let start = &events[start_idx];
    let end = &events[end_idx];

    let mut failures = Vec::new();
    let mut retries = 0u64;
    for &idx in span_tool_results {
        let event = &events[idx];
        if !event.is_error() {
            continue;
        }
        let interior = idx != start_idx;
        if interior {
            retries += 1;
        }
        failures.push(EpisodeFailure {
            event_id: event.id.clone(),
            classification: classify_failure(
                event.command().unwrap_or(""),
                event.output_text().unwrap_or(""),
            ),
            interior,
        });
    }

    let mut token_total = 0u64;
    let mut token_proxy = 0.0f64;
    for event in &events[start_idx..=end_idx] {
        let tokens = event.tokens();
        token_total += tokens.total();
        token_proxy += tokens.proxy();
    }

    let wall_time_ms = (end.timestamp - start.timestamp).num_milliseconds().max(0) as u64;

    RecoveryEpisode {
        session_id: session_id.to_string(),
        family_signature: family_signature(start),
        start_event_id: start.id.clone(),
        end_event_id: end.id.clone(),
        started_at: start.timestamp,
        ended_at: end.timestamp,
        retries,
        wall_time_ms,
        token_total,
        token_proxy,
        success: true,
        model: model_at(events, start_idx),
        failures,
    }
}

/// Normalized command signature plus the primary error signature, bounded.
/// Falls back through error signature and output prefix so every failure
/// lands in some family.
pub fn family_signature(failure: &TraceEvent) -> String {
    let command_sig = failure
        .command()
        .map(normalize_command_signature)
        .unwrap_or_default();
    let error_sig = failure
        .output_text()
        .map(|output| extract_error_signatures(output, 1))
        .unwrap_or_default()
        .into_iter()
        .next()
        .unwrap_or_default();

    let combined = format!("{} {}", command_sig, error_sig);
    let combined = combined.trim();
    if !combined.is_empty() {
        return truncate(&normalize_text(combined), FAMILY_SIGNATURE_MAX);
    }

    if let Some(output) = failure.output_text() {
        let prefix = truncate(&normalize_text(output), 120);
        if !prefix.is_empty() {
            return prefix;
        }
    }
    "unknown-failure".to_string()
}

/// Model in effect at an event: the most recent `payload.model` on message
/// or summary records at or before it.
fn model_at(events: &[TraceEvent], upto_idx: usize) -> Option<String> {
    events[..=upto_idx]
        .iter()
        .rev()
        .filter(|e| {
            matches!(
                e.event_type,
                EventType::AssistantOutput | EventType::TurnSummary | EventType::Checkpoint
            )
        })
        .find_map(|e| e.payload_str("model").map(str::to_string))
}
