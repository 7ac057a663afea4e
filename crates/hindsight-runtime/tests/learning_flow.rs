// Integration tests for the complete flow: trace events -> store ->
// index/miner -> turn-start hints, across process-style restarts.
use std::sync::Arc;

use hindsight_index::{
    Bm25Config, CompositeConfig, CompositeIndex, DocumentIndex, LexicalIndex, SearchQuery,
};
use hindsight_runtime::{HarnessSink, LearningLoop, SinkOptions, TraceStore};
use hindsight_testing::{write_trace_files, wrong_turn_corpus, SessionBuilder};
use tempfile::TempDir;

fn composite() -> CompositeIndex {
    let primary: Arc<dyn DocumentIndex> =
        Arc::new(LexicalIndex::new(Bm25Config::default()).unwrap());
    CompositeIndex::new(primary, None, CompositeConfig::default()).unwrap()
}

#[test]
fn test_restart_rebuilds_index_and_miner_from_store() {
    let dir = TempDir::new().unwrap();

    // First process: ingest the corpus through the loop
    {
        let store = Arc::new(TraceStore::open(dir.path()).unwrap());
        let learning = LearningLoop::new(store, composite());
        for events in wrong_turn_corpus() {
            for event in &events {
                learning.ingest(event).unwrap();
            }
        }
        let artifacts = learning.mine(10).unwrap();
        assert_eq!(artifacts.len(), 1);
        assert_eq!(artifacts[0].support_session_count, 2);
    }

    // Second process: fresh loop over the same store, rebuilt on bootstrap
    let store = Arc::new(TraceStore::open(dir.path()).unwrap());
    let learning = LearningLoop::new(store, composite());
    let outcome = learning.bootstrap_from_store(false).unwrap();
    assert!(outcome.event_count >= 9);

    let artifacts = learning.mine(10).unwrap();
    assert_eq!(artifacts.len(), 1);
    assert_eq!(artifacts[0].support_count, 2);
    assert!(artifacts[0].cross_session_support);

    let results = learning
        .retrieve(&SearchQuery::new("pants build app", 5))
        .unwrap();
    assert!(!results.is_empty());
}

#[test]
fn test_sink_hint_flow_on_prior_corpus() {
    let dir = TempDir::new().unwrap();

    // Seed the store directly with trace files from another harness run
    let sessions_dir = dir.path().join("sessions");
    std::fs::create_dir_all(&sessions_dir).unwrap();
    write_trace_files(&sessions_dir, &wrong_turn_corpus());

    let sink = HarnessSink::install(
        SinkOptions::new(dir.path(), "claude-code").with_session_id("sess-new"),
    )
    .unwrap();

    let message = sink
        .before_agent_start("pants build app keeps failing with command not found")
        .expect("hints from mined history");
    assert!(message.contains("Action:"));
    assert!(message.to_lowercase().contains("pants"));
}

#[test]
fn test_ingested_event_round_trips_unchanged() {
    let dir = TempDir::new().unwrap();
    let store = Arc::new(TraceStore::open(dir.path()).unwrap());
    let learning = LearningLoop::new(store, composite());

    let events = SessionBuilder::new("sess-rt")
        .user_input("run the tests")
        .tool_result("pytest tests", "Command failed", true)
        .build();
    for event in &events {
        learning.ingest(event).unwrap();
    }

    let stored = learning
        .store()
        .query(&hindsight_runtime::EventFilter::for_session("sess-rt"))
        .unwrap();
    assert_eq!(stored.len(), events.len());
    for (stored_event, original) in stored.iter().zip(&events) {
        assert_eq!(
            serde_json::to_string(stored_event).unwrap(),
            serde_json::to_string(original).unwrap()
        );
    }
}
