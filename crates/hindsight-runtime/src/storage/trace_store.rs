use std::collections::HashMap;
use std::fs::{File, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Utc};
use walkdir::WalkDir;

use hindsight_types::{EventType, SessionSummary, TraceEvent};

use crate::error::{Error, Result};

/// Filter for store queries
#[derive(Debug, Clone, Default)]
pub struct EventFilter {
    pub session_id: Option<String>,
    pub event_types: Vec<EventType>,
    pub tag: Option<String>,
    pub since: Option<DateTime<Utc>>,
    pub until: Option<DateTime<Utc>>,
}

impl EventFilter {
    pub fn for_session(session_id: impl Into<String>) -> Self {
        Self {
            session_id: Some(session_id.into()),
            ..Default::default()
        }
    }

    fn matches(&self, event: &TraceEvent) -> bool {
        if let Some(session_id) = &self.session_id {
            if &event.session_id != session_id {
                return false;
            }
        }
        if !self.event_types.is_empty() && !self.event_types.contains(&event.event_type) {
            return false;
        }
        if let Some(tag) = &self.tag {
            if !event.tags.iter().any(|t| t == tag) {
                return false;
            }
        }
        if let Some(since) = self.since {
            if event.timestamp < since {
                return false;
            }
        }
        if let Some(until) = self.until {
            if event.timestamp > until {
                return false;
            }
        }
        true
    }
}

/// Append-only per-session JSONL log under `<dataDir>/sessions/`. Writes
/// within one session are serialized through a per-session lock;
/// cross-session writes may run concurrently. Malformed lines on disk are
/// dropped on read and scanning continues.
pub struct TraceStore {
    sessions_dir: PathBuf,
    session_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl TraceStore {
    /// Open (and create if missing) the store under `data_dir`
    pub fn open(data_dir: impl AsRef<Path>) -> Result<Self> {
        let sessions_dir = data_dir.as_ref().join("sessions");
        std::fs::create_dir_all(&sessions_dir)?;
        Ok(Self {
            sessions_dir,
            session_locks: Mutex::new(HashMap::new()),
        })
    }

    pub fn sessions_dir(&self) -> &Path {
        &self.sessions_dir
    }

    fn session_path(&self, session_id: &str) -> PathBuf {
        self.sessions_dir
            .join(format!("{}.jsonl", sanitize_session_id(session_id)))
    }

    fn session_lock(&self, session_id: &str) -> Arc<Mutex<()>> {
        let mut locks = match self.session_locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        locks
            .entry(session_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Append one event to its session log and fsync
    pub fn append(&self, event: &TraceEvent) -> Result<()> {
        let line = serde_json::to_string(event)?;
        let lock = self.session_lock(&event.session_id);
        let _guard = lock.lock().map_err(|_| {
            Error::InvalidOperation(format!("session lock poisoned: {}", event.session_id))
        })?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.session_path(&event.session_id))?;
        file.write_all(line.as_bytes())?;
        file.write_all(b"\n")?;
        file.sync_all()?;
        Ok(())
    }

    /// Events of one session, in append order
    pub fn session_events(&self, session_id: &str) -> Result<Vec<TraceEvent>> {
        let path = self.session_path(session_id);
        if !path.exists() {
            return Ok(Vec::new());
        }
        read_events(&path)
    }

    /// Raw bytes of one session log, for bundle export
    pub fn session_bytes(&self, session_id: &str) -> Result<Vec<u8>> {
        let path = self.session_path(session_id);
        if !path.exists() {
            return Err(Error::InvalidOperation(format!(
                "session not found: {}",
                session_id
            )));
        }
        Ok(std::fs::read(path)?)
    }

    /// Iterate stored events session by session, applying the filter.
    /// Session files are visited in filename order for determinism.
    pub fn query(&self, filter: &EventFilter) -> Result<Vec<TraceEvent>> {
        if let Some(session_id) = &filter.session_id {
            let events = self.session_events(session_id)?;
            return Ok(events.into_iter().filter(|e| filter.matches(e)).collect());
        }

        let mut results = Vec::new();
        for path in self.session_files()? {
            for event in read_events(&path)? {
                if filter.matches(&event) {
                    results.push(event);
                }
            }
        }
        Ok(results)
    }

    /// Per-session rollups for listings
    pub fn list_sessions(&self) -> Result<Vec<SessionSummary>> {
        let mut summaries = Vec::new();
        for path in self.session_files()? {
            let events = read_events(&path)?;
            let Some(first) = events.first() else {
                continue;
            };
            let tool_results = events
                .iter()
                .filter(|e| e.event_type == EventType::ToolResult)
                .count();
            let failures = events.iter().filter(|e| e.is_error()).count();
            summaries.push(SessionSummary {
                session_id: first.session_id.clone(),
                event_count: events.len(),
                tool_result_count: tool_results,
                failure_count: failures,
                first_timestamp: events.first().map(|e| e.timestamp),
                last_timestamp: events.last().map(|e| e.timestamp),
            });
        }
        Ok(summaries)
    }

    fn session_files(&self) -> Result<Vec<PathBuf>> {
        let mut paths: Vec<PathBuf> = WalkDir::new(&self.sessions_dir)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| path.extension().map(|ext| ext == "jsonl").unwrap_or(false))
            .collect();
        paths.sort();
        Ok(paths)
    }
}

fn read_events(path: &Path) -> Result<Vec<TraceEvent>> {
    let file = File::open(path)?;
    let reader = BufReader::new(file);
    let mut events = Vec::new();
    for line in reader.lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        // Partial or corrupt lines are tolerated; keep scanning.
        if let Ok(event) = serde_json::from_str::<TraceEvent>(&line) {
            events.push(event);
        }
    }
    Ok(events)
}

/// Session ids may contain separators (`swebench::a::b`); keep filenames flat
fn sanitize_session_id(session_id: &str) -> String {
    session_id
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                c
            } else {
                '_'
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn event(session: &str, id: &str, offset_s: i64, event_type: EventType) -> TraceEvent {
        let base = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        TraceEvent::new(
            id,
            base + chrono::Duration::seconds(offset_s),
            session,
            "claude-code",
            event_type,
        )
    }

    #[test]
    fn test_append_then_query_round_trips() -> Result<()> {
        let dir = TempDir::new()?;
        let store = TraceStore::open(dir.path())?;

        let mut original = event("sess-a", "e1", 0, EventType::ToolResult);
        original.payload.insert("command".into(), "pytest".into());
        original.tags.push("ci".into());
        store.append(&original)?;

        let events = store.query(&EventFilter::for_session("sess-a"))?;
        assert_eq!(events.len(), 1);
        assert_eq!(
            serde_json::to_string(&events[0])?,
            serde_json::to_string(&original)?
        );
        Ok(())
    }

    #[test]
    fn test_query_filters_by_type_tag_and_time() -> Result<()> {
        let dir = TempDir::new()?;
        let store = TraceStore::open(dir.path())?;

        let mut tagged = event("sess-a", "e1", 0, EventType::ToolResult);
        tagged.tags.push("ci".into());
        store.append(&tagged)?;
        store.append(&event("sess-a", "e2", 10, EventType::UserInput))?;
        store.append(&event("sess-b", "e3", 20, EventType::ToolResult))?;

        let by_type = store.query(&EventFilter {
            event_types: vec![EventType::ToolResult],
            ..Default::default()
        })?;
        assert_eq!(by_type.len(), 2);

        let by_tag = store.query(&EventFilter {
            tag: Some("ci".into()),
            ..Default::default()
        })?;
        assert_eq!(by_tag.len(), 1);
        assert_eq!(by_tag[0].id, "e1");

        let base = Utc.with_ymd_and_hms(2026, 3, 1, 8, 0, 0).unwrap();
        let by_time = store.query(&EventFilter {
            since: Some(base + chrono::Duration::seconds(5)),
            ..Default::default()
        })?;
        assert_eq!(by_time.len(), 2);
        Ok(())
    }

    #[test]
    fn test_malformed_lines_are_dropped() -> Result<()> {
        let dir = TempDir::new()?;
        let store = TraceStore::open(dir.path())?;
        store.append(&event("sess-a", "e1", 0, EventType::ToolResult))?;

        // Simulate a torn write at the end of the log
        let path = store.sessions_dir().join("sess-a.jsonl");
        let mut file = OpenOptions::new().append(true).open(&path)?;
        file.write_all(b"{\"id\": \"torn")?;

        let events = store.session_events("sess-a")?;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].id, "e1");
        Ok(())
    }

    #[test]
    fn test_session_id_with_separators_is_stored() -> Result<()> {
        let dir = TempDir::new()?;
        let store = TraceStore::open(dir.path())?;
        let session = "swebench::django-1234::hints-on";
        store.append(&event(session, "e1", 0, EventType::ToolResult))?;

        let events = store.session_events(session)?;
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].session_id, session);
        Ok(())
    }

    #[test]
    fn test_list_sessions_summarizes() -> Result<()> {
        let dir = TempDir::new()?;
        let store = TraceStore::open(dir.path())?;

        let mut failing = event("sess-a", "e1", 0, EventType::ToolResult);
        failing.payload.insert("isError".into(), true.into());
        store.append(&failing)?;
        store.append(&event("sess-a", "e2", 5, EventType::UserInput))?;
        store.append(&event("sess-b", "e3", 0, EventType::ToolResult))?;

        let mut summaries = store.list_sessions()?;
        summaries.sort_by(|a, b| a.session_id.cmp(&b.session_id));
        assert_eq!(summaries.len(), 2);
        assert_eq!(summaries[0].session_id, "sess-a");
        assert_eq!(summaries[0].event_count, 2);
        assert_eq!(summaries[0].failure_count, 1);
        Ok(())
    }

    #[test]
    fn test_missing_session_reads_empty() -> Result<()> {
        let dir = TempDir::new()?;
        let store = TraceStore::open(dir.path())?;
        assert!(store.session_events("nope")?.is_empty());
        Ok(())
    }
}
