mod bootstrap;
mod classify;
mod config;
mod corpus;
mod episode;
mod error;
mod holdout;
mod observed;
mod pairing;
mod report;
mod strata;
mod trajectory;

pub use bootstrap::{
    bootstrap_observed, bootstrap_trajectory, seed_for_pairs, Interval, TrustConfig, TrustSummary,
};
pub use classify::{classify_failure, Classification, FailureKind};
pub use config::EvalConfig;
pub use corpus::{load_corpus, SessionCorpus};
pub use episode::{
    extract_all_episodes, extract_episodes, family_signature, EpisodeFailure, RecoveryEpisode,
};
pub use error::{Error, Result};
pub use holdout::{analyze_holdout, HoldoutConfig, HoldoutLanes, HoldoutReport, PrimaryLane};
pub use observed::{
    aggregate_pairs as aggregate_observed, gate as gate_observed, relative_reduction, GateResult,
    ObservedAggregate, ObservedThresholds,
};
pub use pairing::{build_pairs, FailurePair, PairingConfig, PairingDiagnostics};
pub use report::{
    build_observed_report, build_trajectory_report, export_pairs_csv, EpisodeSummary,
    ObservedGateReport, PairSummary, TrajectoryGateReport,
};
pub use strata::{pair_model, stratify, tool_surface, StrataReport, StratumResult};
pub use trajectory::{
    aggregate_pairs as aggregate_trajectory, gate as gate_trajectory, judgeable_coverage,
    TrajectoryAggregate, TrajectoryThresholds,
};
