use std::collections::BTreeMap;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use hindsight_types::{
    truncate, LearningSuggestion, ARTIFACT_ID_PREFIX, FAILURE_WARNING_TITLE, RETRIEVAL_ID_PREFIX,
};
use hindsight_index::{parse_swebench_session, Metadata};

use crate::error::Result;

/// Which suggestion kinds the policy may emit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HintMode {
    All,
    ArtifactOnly,
}

/// Hint policy knobs
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct HintConfig {
    pub max_suggestions: usize,
    pub hint_mode: HintMode,
    pub suggestion_query_max_chars: usize,
    pub suggestion_plan_timeout_ms: u64,
    pub suggestion_total_timeout_ms: u64,
}

impl Default for HintConfig {
    fn default() -> Self {
        Self {
            max_suggestions: 3,
            hint_mode: HintMode::All,
            suggestion_query_max_chars: 1200,
            suggestion_plan_timeout_ms: 1500,
            suggestion_total_timeout_ms: 4000,
        }
    }
}

impl HintConfig {
    pub fn validate(&self) -> std::result::Result<(), String> {
        if self.suggestion_query_max_chars < 512 {
            return Err(format!(
                "suggestionQueryMaxChars must be >= 512: {}",
                self.suggestion_query_max_chars
            ));
        }
        if self.suggestion_plan_timeout_ms < 50 {
            return Err(format!(
                "suggestionPlanTimeoutMs must be >= 50: {}",
                self.suggestion_plan_timeout_ms
            ));
        }
        if self.suggestion_total_timeout_ms < self.suggestion_plan_timeout_ms {
            return Err(format!(
                "suggestionTotalTimeoutMs ({}) must be >= suggestionPlanTimeoutMs ({})",
                self.suggestion_total_timeout_ms, self.suggestion_plan_timeout_ms
            ));
        }
        Ok(())
    }
}

/// Prompt bounded for retrieval
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BoundedQuery {
    pub text: String,
    pub truncated: bool,
}

/// Collapse whitespace; over the cap, keep a head slice and a tail slice
/// joined by `" ... "` so both beginning context and recency context
/// survive.
pub fn bound_prompt(prompt: &str, max_chars: usize) -> BoundedQuery {
    let collapsed = prompt.split_whitespace().collect::<Vec<_>>().join(" ");
    let chars: Vec<char> = collapsed.chars().collect();
    if chars.len() <= max_chars {
        return BoundedQuery {
            text: collapsed,
            truncated: false,
        };
    }

    const SEPARATOR: &str = " ... ";
    let head_len = ((max_chars as f64) * 0.65).ceil() as usize;
    let head: String = chars[..head_len].iter().collect::<String>().trim_end().to_string();
    let tail_budget = max_chars.saturating_sub(head.chars().count() + SEPARATOR.len());
    let tail: String = chars[chars.len() - tail_budget..]
        .iter()
        .collect::<String>()
        .trim_start()
        .to_string();

    BoundedQuery {
        text: format!("{}{}{}", head, SEPARATOR, tail),
        truncated: true,
    }
}

/// One step of the retrieval cascade
#[derive(Debug, Clone)]
pub struct RetrievalPlan {
    pub filters: Metadata,
    pub scope: &'static str,
    pub outcome_filter: &'static str,
    pub fallback_to_global_tool_results: bool,
}

/// Ordered plan list for a session. SWE-bench sessions first try their own
/// instance before degrading to global tool results.
pub fn build_plans(session_id: &str) -> Vec<RetrievalPlan> {
    let mut plans = Vec::new();

    if let Some(swebench) = parse_swebench_session(session_id) {
        let mut instance_success = Metadata::new();
        instance_success.insert("eventType".to_string(), "tool_result".into());
        instance_success.insert(
            "swebenchInstanceId".to_string(),
            swebench.instance_id.clone().into(),
        );
        instance_success.insert("isError".to_string(), false.into());
        plans.push(RetrievalPlan {
            filters: instance_success,
            scope: "swebench-instance",
            outcome_filter: "success",
            fallback_to_global_tool_results: false,
        });

        let mut instance_any = Metadata::new();
        instance_any.insert("eventType".to_string(), "tool_result".into());
        instance_any.insert(
            "swebenchInstanceId".to_string(),
            swebench.instance_id.into(),
        );
        plans.push(RetrievalPlan {
            filters: instance_any,
            scope: "swebench-instance",
            outcome_filter: "any",
            fallback_to_global_tool_results: false,
        });
    }

    let fallback = !plans.is_empty();

    let mut global_success = Metadata::new();
    global_success.insert("eventType".to_string(), "tool_result".into());
    global_success.insert("isError".to_string(), false.into());
    plans.push(RetrievalPlan {
        filters: global_success,
        scope: "global",
        outcome_filter: "success",
        fallback_to_global_tool_results: fallback,
    });

    let mut global_any = Metadata::new();
    global_any.insert("eventType".to_string(), "tool_result".into());
    plans.push(RetrievalPlan {
        filters: global_any,
        scope: "global",
        outcome_filter: "any",
        fallback_to_global_tool_results: fallback,
    });

    plans
}

/// Seam through which the policy asks the learning loop for candidate
/// suggestions under a specific plan.
pub trait CandidateSource {
    fn candidates(
        &self,
        text: &str,
        filters: &Metadata,
        limit: usize,
    ) -> Result<Vec<LearningSuggestion>>;
}

/// Suggestion taxonomy used by the slot policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionKind {
    Artifact,
    FailureWarning,
    Retrieval,
    Other,
}

impl SuggestionKind {
    pub fn classify(suggestion: &LearningSuggestion) -> Self {
        if suggestion.id.starts_with(ARTIFACT_ID_PREFIX) {
            SuggestionKind::Artifact
        } else if suggestion.title == FAILURE_WARNING_TITLE {
            SuggestionKind::FailureWarning
        } else if suggestion.id.starts_with(RETRIEVAL_ID_PREFIX) {
            SuggestionKind::Retrieval
        } else {
            SuggestionKind::Other
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionKind::Artifact => "artifact",
            SuggestionKind::FailureWarning => "failure_warning",
            SuggestionKind::Retrieval => "retrieval",
            SuggestionKind::Other => "other",
        }
    }

    fn confidence_floor(&self) -> f64 {
        match self {
            SuggestionKind::Artifact => 0.45,
            SuggestionKind::FailureWarning => 0.20,
            SuggestionKind::Retrieval => 0.55,
            SuggestionKind::Other => 0.60,
        }
    }

    const ALL: [SuggestionKind; 4] = [
        SuggestionKind::Artifact,
        SuggestionKind::FailureWarning,
        SuggestionKind::Retrieval,
        SuggestionKind::Other,
    ];
}

/// Per-kind accounting; `available = selected + filtered + suppressed`
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KindCounters {
    pub available: usize,
    pub filtered: usize,
    pub suppressed_by_budget: usize,
    pub selected: usize,
}

/// Diagnostic record written as a checkpoint event after every synthesis,
/// including runs that emit zero hints.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PolicyCheckpoint {
    pub available: usize,
    pub filtered: usize,
    pub suppressed_by_budget: usize,
    pub selected: usize,
    pub self_filtered: usize,
    pub kinds: BTreeMap<String, KindCounters>,
    pub artifact_hint_count: usize,
    pub failure_warning_hint_count: usize,
    pub retrieval_hint_count: usize,
    pub other_hint_count: usize,
    pub retrieval_plans_attempted: usize,
    pub retrieval_scope: Option<String>,
    pub outcome_filter: Option<String>,
    pub fallback_to_global_tool_results: bool,
    pub retrieval_error_count: usize,
    pub retrieval_timed_out: bool,
    pub query_truncated: bool,
}

/// A selected hint with its rendered message line
#[derive(Debug, Clone)]
pub struct RankedHint {
    pub suggestion: LearningSuggestion,
    pub kind: SuggestionKind,
    pub rendered: String,
}

/// Result of one synthesis pass
#[derive(Debug, Clone)]
pub struct PolicyOutcome {
    pub hints: Vec<RankedHint>,
    pub message: Option<String>,
    pub checkpoint: PolicyCheckpoint,
}

/// Synthesis context for one agent turn
#[derive(Debug, Clone, Default)]
pub struct PolicyInput<'a> {
    pub prompt: &'a str,
    pub session_id: &'a str,
    pub latest_user_input_event_id: Option<&'a str>,
}

/// Turn-start hint synthesis. Best-effort by contract: retrieval failures
/// and budget expiry degrade the hint list, never the agent turn.
pub struct HintPolicy {
    config: HintConfig,
}

impl HintPolicy {
    pub fn new(config: HintConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &HintConfig {
        &self.config
    }

    pub fn synthesize(&self, source: &dyn CandidateSource, input: &PolicyInput) -> PolicyOutcome {
        let mut checkpoint = PolicyCheckpoint::default();

        let bounded = bound_prompt(input.prompt, self.config.suggestion_query_max_chars);
        checkpoint.query_truncated = bounded.truncated;

        let candidates = self.run_cascade(source, &bounded.text, input.session_id, &mut checkpoint);
        let candidates = self.self_filter(candidates, input, &mut checkpoint);
        let hints = self.select(candidates, &mut checkpoint);

        let message = if hints.is_empty() {
            None
        } else {
            Some(
                hints
                    .iter()
                    .map(|hint| hint.rendered.clone())
                    .collect::<Vec<_>>()
                    .join("\n"),
            )
        };

        PolicyOutcome {
            hints,
            message,
            checkpoint,
        }
    }

    fn run_cascade(
        &self,
        source: &dyn CandidateSource,
        text: &str,
        session_id: &str,
        checkpoint: &mut PolicyCheckpoint,
    ) -> Vec<LearningSuggestion> {
        if self.config.max_suggestions == 0 {
            return Vec::new();
        }

        let total_budget = Duration::from_millis(self.config.suggestion_total_timeout_ms);
        let plan_budget = Duration::from_millis(self.config.suggestion_plan_timeout_ms);
        let started = Instant::now();
        let limit = self.config.max_suggestions + 2;

        for plan in build_plans(session_id) {
            if started.elapsed() >= total_budget {
                checkpoint.retrieval_timed_out = true;
                break;
            }

            let plan_started = Instant::now();
            checkpoint.retrieval_plans_attempted += 1;
            let outcome = source.candidates(text, &plan.filters, limit);
            let plan_overran = plan_started.elapsed() > plan_budget;

            match outcome {
                Err(_) => {
                    checkpoint.retrieval_error_count += 1;
                    if plan_overran || started.elapsed() >= total_budget {
                        checkpoint.retrieval_timed_out = true;
                        break;
                    }
                }
                Ok(suggestions) if suggestions.is_empty() => {
                    if plan_overran || started.elapsed() >= total_budget {
                        checkpoint.retrieval_timed_out = true;
                        break;
                    }
                }
                Ok(suggestions) => {
                    checkpoint.retrieval_scope = Some(plan.scope.to_string());
                    checkpoint.outcome_filter = Some(plan.outcome_filter.to_string());
                    checkpoint.fallback_to_global_tool_results =
                        plan.fallback_to_global_tool_results;
                    if plan_overran {
                        checkpoint.retrieval_timed_out = true;
                    }
                    return suggestions;
                }
            }
        }

        Vec::new()
    }

    /// Drop suggestions whose evidence points at the prompt we are
    /// currently answering.
    fn self_filter(
        &self,
        candidates: Vec<LearningSuggestion>,
        input: &PolicyInput,
        checkpoint: &mut PolicyCheckpoint,
    ) -> Vec<LearningSuggestion> {
        let Some(current_input_id) = input.latest_user_input_event_id else {
            return candidates;
        };
        let mut kept = Vec::new();
        for suggestion in candidates {
            if suggestion
                .evidence_event_ids
                .iter()
                .any(|id| id == current_input_id)
            {
                checkpoint.self_filtered += 1;
            } else {
                kept.push(suggestion);
            }
        }
        kept
    }

    fn select(
        &self,
        candidates: Vec<LearningSuggestion>,
        checkpoint: &mut PolicyCheckpoint,
    ) -> Vec<RankedHint> {
        // Dedupe by id, preserving retrieval order
        let mut seen = std::collections::HashSet::new();
        let mut by_kind: BTreeMap<SuggestionKind, Vec<LearningSuggestion>> = BTreeMap::new();
        for suggestion in candidates {
            if !seen.insert(suggestion.id.clone()) {
                continue;
            }
            let kind = SuggestionKind::classify(&suggestion);
            checkpoint.available += 1;
            checkpoint.kind_entry(kind).available += 1;
            by_kind.entry(kind).or_default().push(suggestion);
        }

        // Confidence floors per kind
        for (kind, pool) in by_kind.iter_mut() {
            let floor = kind.confidence_floor();
            pool.retain(|suggestion| {
                let passes = suggestion.confidence >= floor;
                if !passes {
                    checkpoint.filtered += 1;
                    checkpoint.kind_entry(*kind).filtered += 1;
                }
                passes
            });
            pool.sort_by(|a, b| {
                b.confidence
                    .partial_cmp(&a.confidence)
                    .unwrap_or(std::cmp::Ordering::Equal)
                    .then_with(|| a.id.cmp(&b.id))
            });
        }

        let max = self.config.max_suggestions;
        let artifact_only = self.config.hint_mode == HintMode::ArtifactOnly;
        let mut hints: Vec<RankedHint> = Vec::new();

        for kind in SuggestionKind::ALL {
            let pool = by_kind.remove(&kind).unwrap_or_default();
            let remaining = max.saturating_sub(hints.len());
            let cap = if artifact_only && kind != SuggestionKind::Artifact {
                0
            } else {
                match kind {
                    SuggestionKind::Artifact => remaining.min(1),
                    SuggestionKind::FailureWarning => remaining.min(1),
                    SuggestionKind::Retrieval => {
                        let artifact_selected = hints
                            .iter()
                            .any(|hint| hint.kind == SuggestionKind::Artifact);
                        if artifact_selected {
                            remaining.min(1)
                        } else {
                            remaining
                        }
                    }
                    SuggestionKind::Other => remaining,
                }
            };

            for (index, suggestion) in pool.into_iter().enumerate() {
                if index < cap {
                    let rendered = render_hint(&suggestion);
                    checkpoint.selected += 1;
                    checkpoint.kind_entry(kind).selected += 1;
                    hints.push(RankedHint {
                        suggestion,
                        kind,
                        rendered,
                    });
                } else {
                    checkpoint.suppressed_by_budget += 1;
                    checkpoint.kind_entry(kind).suppressed_by_budget += 1;
                }
            }
        }

        checkpoint.artifact_hint_count = checkpoint.kind_selected(SuggestionKind::Artifact);
        checkpoint.failure_warning_hint_count =
            checkpoint.kind_selected(SuggestionKind::FailureWarning);
        checkpoint.retrieval_hint_count = checkpoint.kind_selected(SuggestionKind::Retrieval);
        checkpoint.other_hint_count = checkpoint.kind_selected(SuggestionKind::Other);

        hints
    }
}

impl PolicyCheckpoint {
    fn kind_entry(&mut self, kind: SuggestionKind) -> &mut KindCounters {
        self.kinds.entry(kind.as_str().to_string()).or_default()
    }

    fn kind_selected(&self, kind: SuggestionKind) -> usize {
        self.kinds
            .get(kind.as_str())
            .map(|counters| counters.selected)
            .unwrap_or(0)
    }
}

/// `"{rationale} (confidence {pct}%). Action: {first bullet, clipped}"`
fn render_hint(suggestion: &LearningSuggestion) -> String {
    let pct = (suggestion.confidence * 100.0).round() as u32;
    let action = suggestion
        .first_action()
        .unwrap_or(suggestion.title.as_str());
    format!(
        "{} (confidence {}%). Action: {}",
        suggestion.rationale,
        pct,
        truncate(action, 120)
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn suggestion(id: &str, title: &str, confidence: f64) -> LearningSuggestion {
        LearningSuggestion {
            id: id.to_string(),
            title: title.to_string(),
            rationale: format!("rationale for {}", id),
            confidence,
            evidence_event_ids: vec![format!("{}-evidence", id)],
            playbook_markdown: format!("- Action: act on {}", id),
        }
    }

    struct FixedSource {
        pool: Vec<LearningSuggestion>,
    }

    impl CandidateSource for FixedSource {
        fn candidates(
            &self,
            _text: &str,
            _filters: &Metadata,
            _limit: usize,
        ) -> Result<Vec<LearningSuggestion>> {
            Ok(self.pool.clone())
        }
    }

    struct FailingSource;

    impl CandidateSource for FailingSource {
        fn candidates(
            &self,
            _text: &str,
            _filters: &Metadata,
            _limit: usize,
        ) -> Result<Vec<LearningSuggestion>> {
            Err(crate::error::Error::Retrieval("backend down".to_string()))
        }
    }

    #[test]
    fn test_bound_prompt_collapses_whitespace() {
        let bounded = bound_prompt("fix   the \n\n bug", 1200);
        assert_eq!(bounded.text, "fix the bug");
        assert!(!bounded.truncated);
    }

    #[test]
    fn test_bound_prompt_head_tail_split() {
        let prompt = "x".repeat(2000);
        let bounded = bound_prompt(&prompt, 1200);
        assert!(bounded.truncated);
        assert!(bounded.text.chars().count() <= 1200);
        assert!(bounded.text.contains(" ... "));
    }

    #[test]
    fn test_build_plans_global_session() {
        let plans = build_plans("sess-a");
        assert_eq!(plans.len(), 2);
        assert_eq!(plans[0].scope, "global");
        assert_eq!(plans[0].outcome_filter, "success");
        assert_eq!(plans[1].outcome_filter, "any");
        assert!(!plans[0].fallback_to_global_tool_results);
    }

    #[test]
    fn test_build_plans_swebench_session() {
        let plans = build_plans("swebench::django-1234::hints-on");
        assert_eq!(plans.len(), 4);
        assert_eq!(plans[0].scope, "swebench-instance");
        assert_eq!(plans[0].outcome_filter, "success");
        assert_eq!(plans[1].outcome_filter, "any");
        assert!(plans[2].fallback_to_global_tool_results);
        assert!(plans[3].fallback_to_global_tool_results);
    }

    #[test]
    fn test_slot_order_artifact_caps_retrieval() {
        // (0.95, retrieval), (0.90, retrieval), (0.88, retrieval),
        // (0.80, artifact), maxSuggestions=3 => exactly 1 artifact plus the
        // 0.95 retrieval hint.
        let source = FixedSource {
            pool: vec![
                suggestion("retrieval-1", "t1", 0.95),
                suggestion("retrieval-2", "t2", 0.90),
                suggestion("retrieval-3", "t3", 0.88),
                suggestion("artifact-a-b", "t4", 0.80),
            ],
        };
        let policy = HintPolicy::new(HintConfig {
            max_suggestions: 3,
            ..Default::default()
        });
        let outcome = policy.synthesize(
            &source,
            &PolicyInput {
                prompt: "fix the build",
                session_id: "sess-a",
                latest_user_input_event_id: None,
            },
        );

        assert_eq!(outcome.hints.len(), 2);
        assert_eq!(outcome.hints[0].kind, SuggestionKind::Artifact);
        assert_eq!(outcome.hints[1].suggestion.id, "retrieval-1");
        assert!(outcome.checkpoint.suppressed_by_budget >= 1);
        assert_eq!(outcome.checkpoint.selected, 2);
        assert_eq!(outcome.checkpoint.retrieval_hint_count, 1);
    }

    #[test]
    fn test_artifact_only_mode() {
        let source = FixedSource {
            pool: vec![
                suggestion("retrieval-1", "t1", 0.95),
                suggestion("retrieval-2", "t2", 0.90),
                suggestion("artifact-a-b", "t4", 0.80),
            ],
        };
        let policy = HintPolicy::new(HintConfig {
            max_suggestions: 1,
            hint_mode: HintMode::ArtifactOnly,
            ..Default::default()
        });
        let outcome = policy.synthesize(
            &source,
            &PolicyInput {
                prompt: "fix the build",
                session_id: "sess-a",
                latest_user_input_event_id: None,
            },
        );

        assert_eq!(outcome.hints.len(), 1);
        assert_eq!(outcome.hints[0].kind, SuggestionKind::Artifact);
        assert_eq!(outcome.checkpoint.retrieval_hint_count, 0);
        let message = outcome.message.unwrap();
        assert!(!message.contains("retrieval-1"));
    }

    #[test]
    fn test_confidence_floors_filter() {
        let source = FixedSource {
            pool: vec![
                suggestion("artifact-low", "below floor", 0.40),
                suggestion("retrieval-low", "below floor", 0.50),
                suggestion("unclassified", "other kind", 0.55),
            ],
        };
        let policy = HintPolicy::new(HintConfig::default());
        let outcome = policy.synthesize(
            &source,
            &PolicyInput {
                prompt: "anything",
                session_id: "sess-a",
                latest_user_input_event_id: None,
            },
        );

        assert!(outcome.hints.is_empty());
        assert!(outcome.message.is_none());
        assert_eq!(outcome.checkpoint.available, 3);
        assert_eq!(outcome.checkpoint.filtered, 3);
        assert_eq!(outcome.checkpoint.selected, 0);
    }

    #[test]
    fn test_counter_balance_per_kind() {
        let source = FixedSource {
            pool: vec![
                suggestion("retrieval-1", "t", 0.95),
                suggestion("retrieval-2", "t", 0.90),
                suggestion("retrieval-3", "t", 0.40),
                suggestion("artifact-a", "t", 0.80),
            ],
        };
        let policy = HintPolicy::new(HintConfig {
            max_suggestions: 2,
            ..Default::default()
        });
        let outcome = policy.synthesize(
            &source,
            &PolicyInput {
                prompt: "anything",
                session_id: "sess-a",
                latest_user_input_event_id: None,
            },
        );

        for counters in outcome.checkpoint.kinds.values() {
            assert_eq!(
                counters.available,
                counters.selected + counters.filtered + counters.suppressed_by_budget
            );
        }
        assert!(outcome.checkpoint.selected <= 2);
    }

    #[test]
    fn test_self_filter_drops_current_prompt_evidence() {
        let mut tainted = suggestion("retrieval-1", "t", 0.95);
        tainted.evidence_event_ids = vec!["current-input".to_string()];
        let source = FixedSource {
            pool: vec![tainted, suggestion("retrieval-2", "t", 0.90)],
        };
        let policy = HintPolicy::new(HintConfig::default());
        let outcome = policy.synthesize(
            &source,
            &PolicyInput {
                prompt: "anything",
                session_id: "sess-a",
                latest_user_input_event_id: Some("current-input"),
            },
        );

        assert_eq!(outcome.checkpoint.self_filtered, 1);
        assert_eq!(outcome.hints.len(), 1);
        assert_eq!(outcome.hints[0].suggestion.id, "retrieval-2");
    }

    #[test]
    fn test_failed_plans_increment_error_count_and_never_throw() {
        let policy = HintPolicy::new(HintConfig::default());
        let outcome = policy.synthesize(
            &FailingSource,
            &PolicyInput {
                prompt: "anything",
                session_id: "sess-a",
                latest_user_input_event_id: None,
            },
        );

        assert!(outcome.hints.is_empty());
        assert_eq!(outcome.checkpoint.retrieval_error_count, 2);
        assert_eq!(outcome.checkpoint.retrieval_plans_attempted, 2);
    }

    #[test]
    fn test_rendered_hint_format() {
        let rendered = render_hint(&suggestion("artifact-a", "title", 0.72));
        assert!(rendered.contains("(confidence 72%)"));
        assert!(rendered.contains("Action: act on artifact-a"));
    }

    #[test]
    fn test_duplicate_ids_deduped() {
        let source = FixedSource {
            pool: vec![
                suggestion("retrieval-1", "t", 0.95),
                suggestion("retrieval-1", "t", 0.95),
            ],
        };
        let policy = HintPolicy::new(HintConfig::default());
        let outcome = policy.synthesize(
            &source,
            &PolicyInput {
                prompt: "anything",
                session_id: "sess-a",
                latest_user_input_event_id: None,
            },
        );
        assert_eq!(outcome.checkpoint.available, 1);
        assert_eq!(outcome.hints.len(), 1);
    }

    #[test]
    fn test_config_validation() {
        let bad = HintConfig {
            suggestion_query_max_chars: 100,
            ..Default::default()
        };
        assert!(bad.validate().is_err());

        let inverted = HintConfig {
            suggestion_plan_timeout_ms: 2000,
            suggestion_total_timeout_ms: 1000,
            ..Default::default()
        };
        assert!(inverted.validate().is_err());
    }
}
