use std::path::PathBuf;
use std::sync::{Arc, Mutex};

use chrono::Utc;
use uuid::Uuid;

use hindsight_engine::{HintConfig, HintPolicy, PolicyInput};
use hindsight_index::{
    Bm25Config, CompositeConfig, CompositeIndex, DocumentIndex, LexicalIndex,
};
use hindsight_types::{EventType, Scope, TraceEvent};

use crate::error::{Error, Result};
use crate::learning::LearningLoop;
use crate::storage::TraceStore;

/// Construction options for the harness sink. The session id is a value
/// passed in here, defaulting to a fresh UUID at install time.
pub struct SinkOptions {
    pub data_dir: PathBuf,
    pub session_id: Option<String>,
    pub harness: String,
    pub hints: HintConfig,
    pub index: Bm25Config,
    pub composite: CompositeConfig,
    pub secondary: Option<Arc<dyn DocumentIndex>>,
}

impl SinkOptions {
    pub fn new(data_dir: impl Into<PathBuf>, harness: impl Into<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            session_id: None,
            harness: harness.into(),
            hints: HintConfig::default(),
            index: Bm25Config::default(),
            composite: CompositeConfig::default(),
            secondary: None,
        }
    }

    pub fn with_session_id(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }
}

/// Explicit sink interface for harness adapters. Each hook ingests the
/// adapter-built event synchronously; `before_agent_start` is the only hook
/// with a return value, the rendered hint message.
pub struct HarnessSink {
    learning: Arc<LearningLoop>,
    policy: HintPolicy,
    session_id: String,
    harness: String,
    latest_user_input: Mutex<Option<String>>,
}

impl HarnessSink {
    pub fn install(options: SinkOptions) -> Result<Self> {
        options.hints.validate().map_err(Error::Config)?;

        let store = Arc::new(TraceStore::open(&options.data_dir)?);
        let primary: Arc<dyn DocumentIndex> = Arc::new(LexicalIndex::new(options.index)?);
        let composite = CompositeIndex::new(primary, options.secondary, options.composite)?;
        let learning = Arc::new(LearningLoop::new(store, composite));
        learning.bootstrap_from_store(false)?;

        Ok(Self {
            learning,
            policy: HintPolicy::new(options.hints),
            session_id: options
                .session_id
                .unwrap_or_else(|| Uuid::new_v4().to_string()),
            harness: options.harness,
            latest_user_input: Mutex::new(None),
        })
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn learning(&self) -> &Arc<LearningLoop> {
        &self.learning
    }

    pub fn on_input(&self, event: &TraceEvent) -> Result<()> {
        self.record(event)
    }

    pub fn on_tool_call(&self, event: &TraceEvent) -> Result<()> {
        self.record(event)
    }

    pub fn on_tool_result(&self, event: &TraceEvent) -> Result<()> {
        self.record(event)
    }

    pub fn on_turn_start(&self, event: &TraceEvent) -> Result<()> {
        self.record(event)
    }

    pub fn on_turn_end(&self, event: &TraceEvent) -> Result<()> {
        self.record(event)
    }

    fn record(&self, event: &TraceEvent) -> Result<()> {
        if event.event_type == EventType::UserInput {
            let mut latest = self
                .latest_user_input
                .lock()
                .map_err(|_| Error::InvalidOperation("input tracking lock poisoned".to_string()))?;
            *latest = Some(event.id.clone());
        }
        self.learning.ingest(event)
    }

    /// Synthesize turn-start hints. Best-effort by contract: any internal
    /// failure (including the checkpoint append) degrades to fewer or no
    /// hints and never blocks the agent turn.
    pub fn before_agent_start(&self, prompt: &str) -> Option<String> {
        let latest = self
            .latest_user_input
            .lock()
            .map(|guard| guard.clone())
            .unwrap_or(None);

        let input = PolicyInput {
            prompt,
            session_id: &self.session_id,
            latest_user_input_event_id: latest.as_deref(),
        };
        let outcome = self.policy.synthesize(self.learning.as_ref(), &input);

        let mut checkpoint_event = TraceEvent::new(
            format!("checkpoint-{}", Uuid::new_v4()),
            Utc::now(),
            self.session_id.clone(),
            self.harness.clone(),
            EventType::Checkpoint,
        );
        checkpoint_event.scope = Scope::Personal;
        if let Ok(serde_json::Value::Object(payload)) =
            serde_json::to_value(&outcome.checkpoint)
        {
            checkpoint_event.payload = payload;
        }
        // The diagnostic record is valuable but not load-bearing.
        let _ = self.learning.ingest(&checkpoint_event);

        outcome.message
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone, Utc};
    use tempfile::TempDir;

    fn tool_result(
        sink: &HarnessSink,
        id: &str,
        offset_s: i64,
        command: &str,
        output: &str,
        is_error: bool,
    ) -> TraceEvent {
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 10, 0, 0).unwrap();
        let mut event = TraceEvent::new(
            id,
            base + Duration::seconds(offset_s),
            sink.session_id(),
            "claude-code",
            EventType::ToolResult,
        );
        event.payload.insert("command".into(), command.into());
        event.payload.insert("output".into(), output.into());
        event.payload.insert("isError".into(), is_error.into());
        event
    }

    #[test]
    fn test_install_generates_session_id() -> Result<()> {
        let dir = TempDir::new()?;
        let sink = HarnessSink::install(SinkOptions::new(dir.path(), "claude-code"))?;
        assert!(!sink.session_id().is_empty());
        Ok(())
    }

    #[test]
    fn test_before_agent_start_writes_checkpoint_even_when_empty() -> Result<()> {
        let dir = TempDir::new()?;
        let sink = HarnessSink::install(SinkOptions::new(dir.path(), "claude-code"))?;

        let message = sink.before_agent_start("fix the failing build");
        assert!(message.is_none());

        let checkpoints = sink.learning().store().query(
            &crate::storage::EventFilter {
                session_id: Some(sink.session_id().to_string()),
                event_types: vec![EventType::Checkpoint],
                ..Default::default()
            },
        )?;
        assert_eq!(checkpoints.len(), 1);
        assert!(checkpoints[0].payload.contains_key("retrievalPlansAttempted"));
        Ok(())
    }

    #[test]
    fn test_full_loop_emits_artifact_hint() -> Result<()> {
        let dir = TempDir::new()?;
        let sink = HarnessSink::install(
            SinkOptions::new(dir.path(), "claude-code").with_session_id("sess-live"),
        )?;

        // Cross-session history (written through a second sink instance)
        let history = HarnessSink::install(
            SinkOptions::new(dir.path(), "claude-code").with_session_id("sess-old"),
        )?;
        for (session_sink, session) in [(&history, "sess-old"), (&sink, "sess-live")] {
            let mut fail = tool_result(
                session_sink,
                &format!("{}-fail", session),
                0,
                "pants build app",
                "pants: command not found",
                true,
            );
            fail.session_id = session.to_string();
            session_sink.on_tool_result(&fail)?;

            let mut fix = tool_result(
                session_sink,
                &format!("{}-fix", session),
                5,
                "./pants build app",
                "built ok",
                false,
            );
            fix.session_id = session.to_string();
            session_sink.on_tool_result(&fix)?;
        }

        let message = sink
            .before_agent_start("pants build app is failing with command not found")
            .expect("artifact hint emitted");
        assert!(message.contains("Action:"));
        assert!(message.contains("confidence"));
        Ok(())
    }
}
