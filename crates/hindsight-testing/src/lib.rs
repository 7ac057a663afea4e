//! Shared fixtures for integration tests: event builders and small session
//! corpora written as JSONL trace files.

use std::fs::File;
use std::io::Write;
use std::path::Path;

use chrono::{DateTime, Duration, TimeZone, Utc};

use hindsight_types::{EventMetrics, EventType, Outcome, TokenUsage, TraceEvent};

/// Fixed corpus epoch so fixtures are reproducible
pub fn base_time() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0).unwrap()
}

/// Builder for one session's worth of events
pub struct SessionBuilder {
    session_id: String,
    events: Vec<TraceEvent>,
    clock_s: i64,
}

impl SessionBuilder {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            events: Vec::new(),
            clock_s: 0,
        }
    }

    fn next_event(&mut self, id_prefix: &str, event_type: EventType) -> TraceEvent {
        let id = format!("{}-{}-{}", self.session_id, id_prefix, self.events.len());
        let event = TraceEvent::new(
            id,
            base_time() + Duration::seconds(self.clock_s),
            self.session_id.clone(),
            "claude-code",
            event_type,
        );
        self.clock_s += 10;
        event
    }

    pub fn user_input(mut self, text: &str) -> Self {
        let mut event = self.next_event("input", EventType::UserInput);
        event.payload.insert("text".into(), text.into());
        self.events.push(event);
        self
    }

    pub fn assistant(mut self, model: &str, text: &str) -> Self {
        let mut event = self.next_event("assistant", EventType::AssistantOutput);
        event.payload.insert("model".into(), model.into());
        event.payload.insert("text".into(), text.into());
        self.events.push(event);
        self
    }

    pub fn tool_result(mut self, command: &str, output: &str, is_error: bool) -> Self {
        let mut event = self.next_event("tool", EventType::ToolResult);
        event.payload.insert("command".into(), command.into());
        event.payload.insert("output".into(), output.into());
        event.payload.insert("isError".into(), is_error.into());
        event.metrics = Some(EventMetrics {
            latency_ms: Some(800),
            outcome: Some(if is_error {
                Outcome::Failure
            } else {
                Outcome::Success
            }),
            tokens: Some(TokenUsage {
                input_uncached: 100,
                output: 20,
                ..Default::default()
            }),
            cost_usd: None,
        });
        self.events.push(event);
        self
    }

    /// Shift the whole session later in time (for chronological splits)
    pub fn starting_after_days(mut self, days: i64) -> Self {
        for event in &mut self.events {
            event.timestamp = event.timestamp + Duration::days(days);
        }
        self
    }

    pub fn build(self) -> Vec<TraceEvent> {
        self.events
    }
}

/// Write sessions as one JSONL trace file per session under `dir`
pub fn write_trace_files(dir: impl AsRef<Path>, sessions: &[Vec<TraceEvent>]) {
    for events in sessions {
        let Some(first) = events.first() else {
            continue;
        };
        let name: String = first
            .session_id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' { c } else { '_' })
            .collect();
        let path = dir.as_ref().join(format!("{}.jsonl", name));
        let mut file = File::create(path).expect("create trace file");
        for event in events {
            let line = serde_json::to_string(event).expect("serialize event");
            writeln!(file, "{}", line).expect("write trace line");
        }
    }
}

/// A small corpus with one recurring wrong-turn family across two sessions
/// plus an unrelated healthy session.
pub fn wrong_turn_corpus() -> Vec<Vec<TraceEvent>> {
    vec![
        SessionBuilder::new("sess-hist-1")
            .user_input("build the service")
            .assistant("opus-4", "building")
            .tool_result("pants build app", "bash: pants: command not found", true)
            .tool_result("./pants build app", "built ok", false)
            .build(),
        SessionBuilder::new("sess-hist-2")
            .user_input("build again")
            .assistant("opus-4", "building")
            .tool_result("pants build app", "bash: pants: command not found", true)
            .tool_result("./pants build app", "built ok", false)
            .build(),
        SessionBuilder::new("sess-clean")
            .user_input("list files")
            .tool_result("ls -la", "total 12", false)
            .build(),
    ]
}
