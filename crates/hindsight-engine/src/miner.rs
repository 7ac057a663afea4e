use std::collections::{BTreeMap, HashMap, HashSet};

use hindsight_types::{
    are_near_duplicate, extract_error_signatures, normalize_command_signature, normalize_text,
    truncate, EventType, MinedArtifact, TraceEvent, ARTIFACT_ID_PREFIX,
};

/// How many tool results ahead of a failure a fixing success may appear
const LOOKAHEAD_WINDOW: usize = 6;

/// Jaccard threshold above which a success is an unchanged retry. Kept high
/// so genuinely different retries with a shared prefix are not suppressed.
const RETRY_DUPLICATE_THRESHOLD: f64 = 0.95;

/// Evidence event ids retained per fingerprint; the founding pair stays
const EVIDENCE_CAP: usize = 8;

#[derive(Debug, Clone)]
struct ResultRecord {
    event_id: String,
    command: Option<String>,
    output: Option<String>,
    is_error: bool,
    /// Failures are matched to at most one fixing success
    matched: bool,
}

#[derive(Debug, Clone)]
struct FingerprintStats {
    fail_sig: String,
    success_sig: String,
    support_count: u64,
    sessions: HashSet<String>,
    evidence: Vec<String>,
}

/// Streaming miner for wrong-turn -> fix transitions. State is an arena of
/// per-session result vectors plus a fingerprint -> accumulator map.
pub struct WrongTurnMiner {
    sessions: HashMap<String, Vec<ResultRecord>>,
    fingerprints: BTreeMap<String, FingerprintStats>,
}

impl Default for WrongTurnMiner {
    fn default() -> Self {
        Self::new()
    }
}

impl WrongTurnMiner {
    pub fn new() -> Self {
        Self {
            sessions: HashMap::new(),
            fingerprints: BTreeMap::new(),
        }
    }

    /// Feed one event into the miner. Only tool results advance state; a
    /// succeeding result resolves every unmatched failure within the
    /// lookahead window behind it.
    pub fn ingest(&mut self, event: &TraceEvent) {
        if event.event_type != EventType::ToolResult {
            return;
        }

        let record = ResultRecord {
            event_id: event.id.clone(),
            command: event.command().map(str::to_string),
            output: event.output_text().map(str::to_string),
            is_error: event.is_error(),
            matched: false,
        };

        let session_id = event.session_id.clone();
        let records = self.sessions.entry(session_id.clone()).or_default();
        records.push(record);

        let success_index = records.len() - 1;
        if records[success_index].is_error {
            return;
        }

        // Resolve pending failures: this success is the first success for
        // every unmatched failure within the window, because earlier
        // successes would already have claimed them.
        let mut transitions = Vec::new();
        for fail_index in success_index.saturating_sub(LOOKAHEAD_WINDOW)..success_index {
            if !records[fail_index].is_error || records[fail_index].matched {
                continue;
            }
            records[fail_index].matched = true;

            let failure = records[fail_index].clone();
            let success = records[success_index].clone();

            if is_unchanged_retry(&failure, &success) {
                continue;
            }
            transitions.push((failure, success));
        }

        for (failure, success) in transitions {
            self.record_transition(&session_id, &failure, &success);
        }
    }

    fn record_transition(
        &mut self,
        session_id: &str,
        failure: &ResultRecord,
        success: &ResultRecord,
    ) {
        let fail_sig = failure_signature(failure);
        let success_sig = success_signature(success);
        if fail_sig.is_empty() || success_sig.is_empty() {
            return;
        }

        let key = fingerprint_key(&fail_sig, &success_sig);
        let stats = self
            .fingerprints
            .entry(key)
            .or_insert_with(|| FingerprintStats {
                fail_sig,
                success_sig,
                support_count: 0,
                sessions: HashSet::new(),
                evidence: Vec::new(),
            });

        stats.support_count += 1;
        stats.sessions.insert(session_id.to_string());
        for event_id in [&failure.event_id, &success.event_id] {
            if stats.evidence.len() < EVIDENCE_CAP {
                stats.evidence.push(event_id.clone());
            }
        }
    }

    /// Rank mined artifacts: cross-session support first, then raw support,
    /// then confidence, then id for determinism.
    pub fn mine(&self, limit: usize) -> Vec<MinedArtifact> {
        let mut artifacts: Vec<MinedArtifact> = self
            .fingerprints
            .values()
            .map(|stats| {
                let session_count = stats.sessions.len() as u64;
                MinedArtifact {
                    id: fingerprint_key(&stats.fail_sig, &stats.success_sig),
                    kind: MinedArtifact::KIND_WRONG_TURN_FIX.to_string(),
                    summary: format!(
                        "When you hit \"{}\", prefer \"{}\"",
                        stats.fail_sig, stats.success_sig
                    ),
                    confidence: confidence(stats.support_count, session_count),
                    evidence_event_ids: stats.evidence.clone(),
                    support_count: stats.support_count,
                    support_session_count: session_count,
                    cross_session_support: session_count > 1,
                }
            })
            .collect();

        artifacts.sort_by(|a, b| {
            b.support_session_count
                .cmp(&a.support_session_count)
                .then_with(|| b.support_count.cmp(&a.support_count))
                .then_with(|| {
                    b.confidence
                        .partial_cmp(&a.confidence)
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .then_with(|| a.id.cmp(&b.id))
        });
        artifacts.truncate(limit);
        artifacts
    }

    /// Number of distinct fingerprints currently tracked
    pub fn fingerprint_count(&self) -> usize {
        self.fingerprints.len()
    }
}

/// Confidence grows with support occurrences and with distinct sessions,
/// saturating at 0.9.
fn confidence(support_count: u64, session_count: u64) -> f64 {
    let count_weight = ((support_count.saturating_sub(1)) as f64 / 4.0).clamp(0.0, 1.0);
    let session_weight = ((session_count.saturating_sub(1)) as f64 / 2.0).clamp(0.0, 1.0);
    (0.45 + 0.20 * count_weight + 0.25 * session_weight).min(0.9)
}

fn is_unchanged_retry(failure: &ResultRecord, success: &ResultRecord) -> bool {
    // A command-not-found failure never counts as an unchanged retry: the
    // original command did not execute, so a resolved invocation path is
    // itself the fix.
    if let Some(output) = &failure.output {
        let lowered = output.to_lowercase();
        if lowered.contains("command not found") || lowered.contains("not recognized as") {
            return false;
        }
    }
    match (&failure.command, &success.command) {
        (Some(fail_cmd), Some(success_cmd)) => {
            let fail_cmd = strip_invocation_prefix(fail_cmd);
            let success_cmd = strip_invocation_prefix(success_cmd);
            fail_cmd == success_cmd
                || are_near_duplicate(fail_cmd, success_cmd, RETRY_DUPLICATE_THRESHOLD)
        }
        _ => false,
    }
}

/// Drop a leading `./` from the program token so re-running the same binary
/// via an explicit relative path compares equal.
fn strip_invocation_prefix(command: &str) -> &str {
    command.strip_prefix("./").unwrap_or(command)
}

fn failure_signature(record: &ResultRecord) -> String {
    if let Some(command) = &record.command {
        let sig = normalize_command_signature(command);
        if !sig.is_empty() {
            return sig;
        }
    }
    if let Some(output) = &record.output {
        if let Some(first) = extract_error_signatures(output, 1).into_iter().next() {
            return first;
        }
        return truncate(&normalize_text(output), 120);
    }
    String::new()
}

fn success_signature(record: &ResultRecord) -> String {
    if let Some(command) = &record.command {
        let sig = normalize_command_signature(command);
        if !sig.is_empty() {
            return sig;
        }
    }
    if let Some(output) = &record.output {
        return truncate(&normalize_text(output), 120);
    }
    String::new()
}

fn fingerprint_key(fail_sig: &str, success_sig: &str) -> String {
    format!(
        "{}{}-{}",
        ARTIFACT_ID_PREFIX,
        fail_sig.replace(char::is_whitespace, "_"),
        success_sig.replace(char::is_whitespace, "_")
    )
}
