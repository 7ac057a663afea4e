use serde::{Deserialize, Serialize};

/// Id prefix of mined wrong-turn artifacts
pub const ARTIFACT_ID_PREFIX: &str = "artifact-";

/// Id prefix of plain retrieval suggestions
pub const RETRIEVAL_ID_PREFIX: &str = "retrieval-";

/// A learned correction mined from fail-to-success transitions
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MinedArtifact {
    /// `artifact-<failSig>-<successSig>`
    pub id: String,

    pub kind: String,

    /// Rendered rule: `When you hit "X", prefer "Y"`
    pub summary: String,

    pub confidence: f64,

    /// Up to 8 event ids; the first two are the founding pair
    pub evidence_event_ids: Vec<String>,

    pub support_count: u64,

    /// Distinct sessions contributing support
    pub support_session_count: u64,

    pub cross_session_support: bool,
}

impl MinedArtifact {
    pub const KIND_WRONG_TURN_FIX: &'static str = "wrong_turn_fix";
}

/// A ranked hint emitted at turn start
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningSuggestion {
    pub id: String,
    pub title: String,
    pub rationale: String,
    pub confidence: f64,
    pub evidence_event_ids: Vec<String>,
    /// Short bullet list beginning with `- Action: ...`
    pub playbook_markdown: String,
}

impl LearningSuggestion {
    /// First `- Action:` bullet body, if the playbook carries one
    pub fn first_action(&self) -> Option<&str> {
        for line in self.playbook_markdown.lines() {
            let trimmed = line.trim();
            if let Some(rest) = trimmed.strip_prefix("- Action:") {
                return Some(rest.trim());
            }
        }
        None
    }
}
