mod error;
mod miner;
mod policy;

pub use error::{Error, Result};
pub use miner::WrongTurnMiner;
pub use policy::{
    bound_prompt, build_plans, BoundedQuery, CandidateSource, HintConfig, HintMode, HintPolicy,
    KindCounters, PolicyCheckpoint, PolicyInput, PolicyOutcome, RankedHint, RetrievalPlan,
    SuggestionKind,
};
