mod artifact;
mod error;
mod event;
mod signature;
mod util;

pub use artifact::{LearningSuggestion, MinedArtifact, ARTIFACT_ID_PREFIX, RETRIEVAL_ID_PREFIX};
pub use error::{Error, Result};
pub use event::{
    EventMetrics, EventType, Outcome, Scope, SessionSummary, TokenUsage, TraceEvent,
};
pub use signature::{
    are_near_duplicate, extract_error_signatures, normalize_command_signature, normalize_text,
};
pub use util::truncate;

/// Title used by failure-warning suggestions emitted from the error lane.
pub const FAILURE_WARNING_TITLE: &str = "Prior failure warning";
