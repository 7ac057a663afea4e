// End-to-end gate scenarios over synthetic trace corpora.
use hindsight_eval::{
    aggregate_trajectory, build_observed_report, build_pairs, extract_all_episodes, gate_trajectory,
    load_corpus, EvalConfig, ObservedThresholds, PairingConfig, TrajectoryThresholds, TrustConfig,
};
use hindsight_testing::{write_trace_files, SessionBuilder};
use tempfile::TempDir;

/// Four same-family episodes across four sessions: the OFF episodes recover
/// slowly with interior retries, the ON episodes recover fast.
fn badflag_corpus() -> Vec<Vec<hindsight_types::TraceEvent>> {
    let off_1 = SessionBuilder::new("sess-off-1")
        .tool_result("pytest --badflag", "error: unrecognized option --badflag", true)
        .tool_result("pytest --badflag -v", "error: unrecognized option --badflag", true)
        .tool_result("pytest --badflag -q", "error: unrecognized option --badflag", true)
        .tool_result("pytest -k smoke", "3 passed", false)
        .build();
    // Stagger session starts so chronological pairing yields (off, on) twice
    let on_1 = SessionBuilder::new("sess-on-1")
        .tool_result("pytest --badflag", "error: unrecognized option --badflag", true)
        .tool_result("pytest -k smoke", "3 passed", false)
        .starting_after_days(1)
        .build();
    let off_2 = SessionBuilder::new("sess-off-2")
        .tool_result("pytest --badflag", "error: unrecognized option --badflag", true)
        .tool_result("pytest -k smoke", "3 passed", false)
        .starting_after_days(2)
        .build();
    let on_2 = SessionBuilder::new("sess-on-2")
        .tool_result("pytest --badflag", "error: unrecognized option --badflag", true)
        .tool_result("pytest --badflag -x", "error: unrecognized option --badflag", true)
        .tool_result("pytest -k smoke", "3 passed", false)
        .starting_after_days(3)
        .build();

    vec![off_1, on_1, off_2, on_2]
}

#[test]
fn test_observed_gate_passes_on_improving_corpus() {
    let dir = TempDir::new().unwrap();
    write_trace_files(dir.path(), &badflag_corpus());

    let corpus = load_corpus(dir.path()).unwrap();
    let episodes = extract_all_episodes(&corpus);
    assert_eq!(episodes.len(), 4);
    // All four land in the same family
    let families: std::collections::BTreeSet<_> =
        episodes.iter().map(|e| e.family_signature.clone()).collect();
    assert_eq!(families.len(), 1);

    let pairing = PairingConfig::default();
    let (pairs, diagnostics) = build_pairs(&episodes, &pairing);
    assert_eq!(pairs.len(), 2);
    assert_eq!(diagnostics.pairs_built, 2);

    let thresholds = ObservedThresholds {
        min_pair_count: 1,
        ..Default::default()
    };
    let trust = TrustConfig {
        bootstrap_samples: 300,
        ..Default::default()
    };
    let report =
        build_observed_report(&episodes, &pairs, diagnostics, &pairing, &thresholds, &trust)
            .unwrap();

    assert!(report.gate_result.pass, "failures: {:?}", report.gate_result.failures);
    assert!(report.aggregate.relative_dead_end_reduction > 0.25);
    assert!(report.aggregate.relative_wall_time_reduction > 0.10);
    assert_eq!(report.aggregate.recovery_success_rate_on, 1.0);
    assert!(report
        .trust_summary
        .intervals
        .contains_key("relativeDeadEndReduction"));
    assert_eq!(report.strata.tool_surface["python-toolchain"].pair_count, 2);
}

#[test]
fn test_trajectory_coverage_failure_on_abstained_retries() {
    // OFF episode with one unclassifiable interior retry; ON episode clean.
    let off = SessionBuilder::new("sess-off")
        .tool_result("make widgets", "the widget machine is sad", true)
        .tool_result("make gadgets", "gadget assembly went sideways", true)
        .tool_result("make all", "done", false)
        .build();
    let on = SessionBuilder::new("sess-on")
        .tool_result("make widgets", "the widget machine is sad", true)
        .tool_result("make all", "done", false)
        .starting_after_days(1)
        .build();

    let dir = TempDir::new().unwrap();
    write_trace_files(dir.path(), &[off, on]);

    let corpus = load_corpus(dir.path()).unwrap();
    let episodes = extract_all_episodes(&corpus);
    let (pairs, _) = build_pairs(&episodes, &PairingConfig::default());
    assert_eq!(pairs.len(), 1);

    let aggregate = aggregate_trajectory(&pairs);
    assert_eq!(aggregate.abstained_off, 1);
    assert_eq!(aggregate.retries_on, 0);

    let thresholds = TrajectoryThresholds {
        min_pair_count: 1,
        min_judgeable_coverage: 0.8,
        ..Default::default()
    };
    let result = gate_trajectory(&aggregate, &thresholds);
    assert!(!result.pass);
    assert!(result
        .failures
        .iter()
        .any(|f| f.starts_with("judgeable coverage off")));
}

#[test]
fn test_eval_config_defaults_round_trip_through_report() {
    let config = EvalConfig::default();
    let dir = TempDir::new().unwrap();
    write_trace_files(dir.path(), &badflag_corpus());

    let corpus = load_corpus(dir.path()).unwrap();
    let episodes = extract_all_episodes(&corpus);
    let (pairs, diagnostics) = build_pairs(&episodes, &config.pairing);

    // Default minPairCount=3 fails a two-pair corpus; the report still
    // builds with a populated failures list.
    let report = build_observed_report(
        &episodes,
        &pairs,
        diagnostics,
        &config.pairing,
        &config.observed,
        &TrustConfig {
            bootstrap_samples: 200,
            ..config.trust
        },
    )
    .unwrap();
    assert!(!report.gate_result.pass);
    assert!(report
        .gate_result
        .failures
        .iter()
        .any(|f| f.starts_with("pair count")));
}
