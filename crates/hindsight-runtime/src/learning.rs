use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use hindsight_engine::{CandidateSource, WrongTurnMiner};
use hindsight_index::{
    CompositeIndex, DocumentBuilder, DocumentIndex, MetaValue, Metadata, SearchQuery, SearchResult,
};
use hindsight_types::{
    LearningSuggestion, MinedArtifact, TraceEvent, FAILURE_WARNING_TITLE, RETRIEVAL_ID_PREFIX,
};

use crate::error::{Error, Result};
use crate::storage::{EventFilter, TraceStore};

/// Optional second-stage ranker applied after index retrieval
pub trait Reranker: Send + Sync {
    fn rerank(&self, query: &SearchQuery, results: &[SearchResult]) -> Vec<SearchResult>;
}

/// Counts reported by a bootstrap pass
#[derive(Debug, Clone, Copy, Default)]
pub struct BootstrapOutcome {
    pub event_count: usize,
    pub document_count: usize,
}

/// A candidate request against the loop
#[derive(Debug, Clone, Default)]
pub struct SuggestQuery {
    pub text: String,
    pub filters: Metadata,
    pub limit: usize,
}

/// Wires store, composite index, miner, and document builder into the
/// single-writer ingest path and the read-only retrieval/mining paths.
/// `ingest` returns only after append, document upsert, and miner ingest
/// have all completed, so readers observe a monotone view.
pub struct LearningLoop {
    store: Arc<TraceStore>,
    index: CompositeIndex,
    builder: DocumentBuilder,
    miner: Mutex<WrongTurnMiner>,
    reranker: Option<Box<dyn Reranker>>,
    bootstrapped: Mutex<bool>,
}

impl LearningLoop {
    pub fn new(store: Arc<TraceStore>, index: CompositeIndex) -> Self {
        Self {
            store,
            index,
            builder: DocumentBuilder::new(),
            miner: Mutex::new(WrongTurnMiner::new()),
            reranker: None,
            bootstrapped: Mutex::new(false),
        }
    }

    pub fn with_reranker(mut self, reranker: Box<dyn Reranker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    pub fn store(&self) -> &TraceStore {
        &self.store
    }

    /// Append to the store, project into the index, and stream into the
    /// miner, exactly once per event.
    pub fn ingest(&self, event: &TraceEvent) -> Result<()> {
        self.store.append(event)?;
        self.index_and_mine(event)?;
        Ok(())
    }

    fn index_and_mine(&self, event: &TraceEvent) -> Result<usize> {
        let documents = self.builder.build(event);
        let count = documents.len();
        self.index.upsert_many(documents)?;
        let mut miner = self
            .miner
            .lock()
            .map_err(|_| Error::InvalidOperation("miner lock poisoned".to_string()))?;
        miner.ingest(event);
        Ok(count)
    }

    /// Rebuild index and miner state from the store. Runs once per loop
    /// instance; later calls without `force` are no-ops reporting zeros.
    pub fn bootstrap_from_store(&self, force: bool) -> Result<BootstrapOutcome> {
        let mut bootstrapped = self
            .bootstrapped
            .lock()
            .map_err(|_| Error::InvalidOperation("bootstrap lock poisoned".to_string()))?;
        if *bootstrapped && !force {
            return Ok(BootstrapOutcome::default());
        }

        if force {
            let mut miner = self
                .miner
                .lock()
                .map_err(|_| Error::InvalidOperation("miner lock poisoned".to_string()))?;
            *miner = WrongTurnMiner::new();
        }

        let mut outcome = BootstrapOutcome::default();
        for event in self.store.query(&EventFilter::default())? {
            outcome.event_count += 1;
            outcome.document_count += self.index_and_mine(&event)?;
        }

        *bootstrapped = true;
        Ok(outcome)
    }

    /// Index search plus the optional reranker pass. Reranker output is
    /// normalized: filtered to the initial result set, deduped by id, and
    /// padded with the remaining initial results in original order.
    pub fn retrieve(&self, query: &SearchQuery) -> Result<Vec<SearchResult>> {
        let initial = self.index.search(query)?;
        let Some(reranker) = &self.reranker else {
            return Ok(initial);
        };

        let initial_ids: HashSet<&str> =
            initial.iter().map(|r| r.document.id.as_str()).collect();
        let mut seen = HashSet::new();
        let mut normalized = Vec::new();

        for result in reranker.rerank(query, &initial) {
            if !initial_ids.contains(result.document.id.as_str()) {
                continue;
            }
            if seen.insert(result.document.id.clone()) {
                normalized.push(result);
            }
        }
        for result in &initial {
            if normalized.len() >= query.limit {
                break;
            }
            if seen.insert(result.document.id.clone()) {
                normalized.push(result.clone());
            }
        }

        normalized.truncate(query.limit);
        Ok(normalized)
    }

    /// Ranked artifacts from the miner
    pub fn mine(&self, limit: usize) -> Result<Vec<MinedArtifact>> {
        let miner = self
            .miner
            .lock()
            .map_err(|_| Error::InvalidOperation("miner lock poisoned".to_string()))?;
        Ok(miner.mine(limit))
    }

    /// Produce candidate suggestions for the hint policy: mined artifacts,
    /// a failure warning from the error lane, and plain retrieval hits.
    ///
    /// When the caller's filter pins `isError=false`, a second search with
    /// `isError=true` runs in the same pass so the policy sees the negative
    /// lane's evidence alongside the positive one.
    pub fn suggest(&self, query: &SuggestQuery) -> Result<Vec<LearningSuggestion>> {
        if query.limit == 0 {
            return Ok(Vec::new());
        }

        let search = SearchQuery {
            text: query.text.clone(),
            filter: query.filters.clone(),
            limit: query.limit,
        };
        let results = self.retrieve(&search)?;

        let mut suggestions = Vec::new();

        for artifact in self.mine(query.limit)? {
            suggestions.push(artifact_suggestion(&artifact));
        }

        if query.filters.get("isError") == Some(&MetaValue::Bool(false)) {
            let mut error_filter = query.filters.clone();
            error_filter.insert("isError".to_string(), MetaValue::Bool(true));
            let error_lane = self.retrieve(&SearchQuery {
                text: query.text.clone(),
                filter: error_filter,
                limit: query.limit,
            })?;
            if let Some(warning) = failure_warning_suggestion(&error_lane) {
                suggestions.push(warning);
            }
        }

        for (rank, result) in results.iter().enumerate() {
            suggestions.push(retrieval_suggestion(result, rank));
        }

        let mut seen = HashSet::new();
        suggestions.retain(|suggestion| seen.insert(suggestion.id.clone()));
        suggestions.truncate(query.limit);
        Ok(suggestions)
    }
}

impl CandidateSource for LearningLoop {
    fn candidates(
        &self,
        text: &str,
        filters: &Metadata,
        limit: usize,
    ) -> hindsight_engine::Result<Vec<LearningSuggestion>> {
        self.suggest(&SuggestQuery {
            text: text.to_string(),
            filters: filters.clone(),
            limit,
        })
        .map_err(|err| hindsight_engine::Error::Retrieval(err.to_string()))
    }
}

fn artifact_suggestion(artifact: &MinedArtifact) -> LearningSuggestion {
    let action = artifact
        .summary
        .split("prefer ")
        .nth(1)
        .map(|tail| tail.trim_matches('"').to_string())
        .unwrap_or_else(|| artifact.summary.clone());
    LearningSuggestion {
        id: artifact.id.clone(),
        title: artifact.summary.clone(),
        rationale: format!(
            "Observed {} fixes across {} sessions",
            artifact.support_count, artifact.support_session_count
        ),
        confidence: artifact.confidence,
        evidence_event_ids: artifact.evidence_event_ids.clone(),
        playbook_markdown: format!("- Action: {}", action),
    }
}

fn failure_warning_suggestion(error_lane: &[SearchResult]) -> Option<LearningSuggestion> {
    let first = error_lane.first()?;
    let mut evidence: Vec<String> = Vec::new();
    let mut seen = HashSet::new();
    for result in error_lane {
        let event_id = result.document.source_event_id.clone();
        if seen.insert(event_id.clone()) {
            evidence.push(event_id);
        }
    }
    let first_line = first.document.text.lines().next().unwrap_or("").to_string();
    Some(LearningSuggestion {
        id: format!("warning-{}", first.document.id),
        title: FAILURE_WARNING_TITLE.to_string(),
        rationale: format!("A similar attempt failed before: {}", first_line),
        confidence: 0.55,
        evidence_event_ids: evidence,
        playbook_markdown: format!("- Action: Avoid repeating `{}` as-is", first_line),
    })
}

fn retrieval_suggestion(result: &SearchResult, rank: usize) -> LearningSuggestion {
    let first_line = result.document.text.lines().next().unwrap_or("").to_string();
    let confidence = (0.75 - 0.05 * rank as f64).max(0.30);
    LearningSuggestion {
        id: format!("{}{}", RETRIEVAL_ID_PREFIX, result.document.id),
        title: format!("Related prior activity: {}", first_line),
        rationale: "A prior session ran something similar".to_string(),
        confidence,
        evidence_event_ids: vec![result.document.source_event_id.clone()],
        playbook_markdown: format!("- Action: Consider `{}`", first_line),
    }
}
