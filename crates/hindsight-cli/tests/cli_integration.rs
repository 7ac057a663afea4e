use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

use hindsight_testing::{write_trace_files, wrong_turn_corpus};

fn hindsight() -> Command {
    Command::cargo_bin("hindsight").expect("binary builds")
}

#[test]
fn test_help_lists_subcommands() {
    hindsight()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("ingest"))
        .stdout(predicate::str::contains("suggest"))
        .stdout(predicate::str::contains("eval"));
}

#[test]
fn test_ingest_then_sessions_listing() {
    let data_dir = TempDir::new().unwrap();
    let traces_dir = TempDir::new().unwrap();
    write_trace_files(traces_dir.path(), &wrong_turn_corpus());

    for entry in std::fs::read_dir(traces_dir.path()).unwrap() {
        let path = entry.unwrap().path();
        hindsight()
            .arg("ingest")
            .arg("--data-dir")
            .arg(data_dir.path())
            .arg(&path)
            .assert()
            .success()
            .stdout(predicate::str::contains("Ingested"));
    }

    hindsight()
        .arg("sessions")
        .arg("--data-dir")
        .arg(data_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("sess-hist-1"))
        .stdout(predicate::str::contains("sess-clean"));
}

#[test]
fn test_suggest_emits_hint_from_mined_history() {
    let data_dir = TempDir::new().unwrap();
    let sessions_dir = data_dir.path().join("sessions");
    std::fs::create_dir_all(&sessions_dir).unwrap();
    write_trace_files(&sessions_dir, &wrong_turn_corpus());

    hindsight()
        .arg("suggest")
        .arg("--data-dir")
        .arg(data_dir.path())
        .arg("--session")
        .arg("sess-new")
        .arg("pants build app fails with command not found")
        .assert()
        .success()
        .stdout(predicate::str::contains("Action:"));
}

#[test]
fn test_eval_observed_strict_exit_code_on_thin_corpus() {
    let traces_dir = TempDir::new().unwrap();
    write_trace_files(traces_dir.path(), &wrong_turn_corpus());

    // Two history sessions produce at most one pair; minPairCount=3 fails
    hindsight()
        .arg("eval")
        .arg("observed")
        .arg("--traces")
        .arg(traces_dir.path())
        .arg("--strict")
        .assert()
        .code(2)
        .stdout(predicate::str::contains("GATE: FAIL"));
}

#[test]
fn test_eval_observed_non_strict_exits_zero() {
    let traces_dir = TempDir::new().unwrap();
    write_trace_files(traces_dir.path(), &wrong_turn_corpus());

    hindsight()
        .arg("eval")
        .arg("observed")
        .arg("--traces")
        .arg(traces_dir.path())
        .assert()
        .success();
}

#[test]
fn test_export_bundle_is_idempotent() {
    let data_dir = TempDir::new().unwrap();
    let bundle_dir = TempDir::new().unwrap();
    let sessions_dir = data_dir.path().join("sessions");
    std::fs::create_dir_all(&sessions_dir).unwrap();
    write_trace_files(&sessions_dir, &wrong_turn_corpus());

    hindsight()
        .arg("export-bundle")
        .arg("--data-dir")
        .arg(data_dir.path())
        .arg("--session")
        .arg("sess-hist-1")
        .arg("--out")
        .arg(bundle_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Stored bundle"));

    hindsight()
        .arg("export-bundle")
        .arg("--data-dir")
        .arg(data_dir.path())
        .arg("--session")
        .arg("sess-hist-1")
        .arg("--out")
        .arg(bundle_dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("duplicate=true"));
}

#[test]
fn test_missing_traces_directory_reports_error() {
    hindsight()
        .arg("eval")
        .arg("observed")
        .arg("--traces")
        .arg("/nonexistent/hindsight-traces")
        .assert()
        .code(1)
        .stderr(predicate::str::contains("ERROR:"));
}
