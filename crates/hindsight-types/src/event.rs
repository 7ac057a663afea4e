use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Visibility scope of a trace event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    Personal,
    Team,
    Public,
}

/// Type of trace event
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventType {
    UserInput,
    ToolCall,
    ToolResult,
    TurnSummary,
    Checkpoint,
    Feedback,
    AssistantOutput,
}

impl EventType {
    /// Convert to the wire string used in document metadata
    pub fn as_str(&self) -> &'static str {
        match self {
            EventType::UserInput => "user_input",
            EventType::ToolCall => "tool_call",
            EventType::ToolResult => "tool_result",
            EventType::TurnSummary => "turn_summary",
            EventType::Checkpoint => "checkpoint",
            EventType::Feedback => "feedback",
            EventType::AssistantOutput => "assistant_output",
        }
    }
}

/// Outcome recorded on an event's metrics
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Success,
    Failure,
    Unknown,
}

impl Outcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Outcome::Success => "success",
            Outcome::Failure => "failure",
            Outcome::Unknown => "unknown",
        }
    }
}

/// Token buckets attributed to a single event
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TokenUsage {
    pub input_uncached: u64,
    pub input_cached: u64,
    pub output: u64,
    pub cache_write: u64,
    pub thinking: u64,
}

impl TokenUsage {
    /// Raw token total across all buckets
    pub fn total(&self) -> u64 {
        self.input_uncached + self.input_cached + self.output + self.cache_write + self.thinking
    }

    /// Monotone weighted summary used when comparing episodes.
    /// Cached input is cheap, output and thinking dominate.
    pub fn proxy(&self) -> f64 {
        self.input_uncached as f64
            + self.input_cached as f64 / 10.0
            + 2.0 * (self.output as f64 + self.thinking as f64)
            + self.cache_write as f64 / 2.0
    }
}

/// Per-event measurements attached by the harness adapter
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventMetrics {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub latency_ms: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub outcome: Option<Outcome>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tokens: Option<TokenUsage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cost_usd: Option<f64>,
}

/// The universal trace record. Events are created by the ingest adapter,
/// never mutated, never deleted. Unknown payload fields round-trip.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TraceEvent {
    pub id: String,

    /// RFC3339 UTC; monotone within a session (writer responsibility)
    pub timestamp: DateTime<Utc>,

    /// Session is the unit of ownership; one writer per session
    pub session_id: String,

    pub harness: String,

    pub scope: Scope,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub agent_id: Option<String>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,

    #[serde(rename = "type")]
    pub event_type: EventType,

    /// Type-specific key/value map (command, text, isError, toolName, ...)
    #[serde(default)]
    pub payload: Map<String, Value>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub metrics: Option<EventMetrics>,
}

impl TraceEvent {
    pub fn new(
        id: impl Into<String>,
        timestamp: DateTime<Utc>,
        session_id: impl Into<String>,
        harness: impl Into<String>,
        event_type: EventType,
    ) -> Self {
        Self {
            id: id.into(),
            timestamp,
            session_id: session_id.into(),
            harness: harness.into(),
            scope: Scope::Personal,
            agent_id: None,
            tags: Vec::new(),
            event_type,
            payload: Map::new(),
            metrics: None,
        }
    }

    /// String payload field, if present and a string
    pub fn payload_str(&self, key: &str) -> Option<&str> {
        self.payload.get(key).and_then(Value::as_str)
    }

    /// Boolean payload field, if present and a bool
    pub fn payload_bool(&self, key: &str) -> Option<bool> {
        self.payload.get(key).and_then(Value::as_bool)
    }

    /// Command string for tool calls/results
    pub fn command(&self) -> Option<&str> {
        self.payload_str("command")
    }

    /// Tool name recorded by the adapter
    pub fn tool_name(&self) -> Option<&str> {
        self.payload_str("toolName")
    }

    /// Output or text body of the event
    pub fn output_text(&self) -> Option<&str> {
        self.payload_str("output").or_else(|| self.payload_str("text"))
    }

    /// Whether this is a failing tool result. Payload `isError` and
    /// `metrics.outcome` agree when both are present; either marks failure.
    pub fn is_error(&self) -> bool {
        if self.event_type != EventType::ToolResult {
            return false;
        }
        if self.payload_bool("isError") == Some(true) {
            return true;
        }
        matches!(
            self.metrics.as_ref().and_then(|m| m.outcome),
            Some(Outcome::Failure)
        )
    }

    /// Resolved outcome for tool results
    pub fn outcome(&self) -> Outcome {
        if let Some(outcome) = self.metrics.as_ref().and_then(|m| m.outcome) {
            return outcome;
        }
        match self.payload_bool("isError") {
            Some(true) => Outcome::Failure,
            Some(false) => Outcome::Success,
            None => Outcome::Unknown,
        }
    }

    /// Token usage attributed to this event, zero when absent
    pub fn tokens(&self) -> TokenUsage {
        self.metrics
            .as_ref()
            .and_then(|m| m.tokens)
            .unwrap_or_default()
    }
}

/// Per-session rollup for listings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSummary {
    pub session_id: String,
    pub event_count: usize,
    pub tool_result_count: usize,
    pub failure_count: usize,
    pub first_timestamp: Option<DateTime<Utc>>,
    pub last_timestamp: Option<DateTime<Utc>>,
}
