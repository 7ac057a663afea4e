use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use walkdir::WalkDir;

use hindsight_types::TraceEvent;

use crate::error::Result;

/// Events grouped by session, each session sorted chronologically
pub type SessionCorpus = BTreeMap<String, Vec<TraceEvent>>;

/// Load every `.jsonl` trace file under `root` into a per-session corpus.
/// Malformed lines are dropped; files may mix sessions freely.
pub fn load_corpus(root: impl AsRef<Path>) -> Result<SessionCorpus> {
    let mut sessions: SessionCorpus = BTreeMap::new();

    for entry in WalkDir::new(root.as_ref())
        .sort_by_file_name()
        .into_iter()
        .filter_map(|entry| entry.ok())
    {
        if !entry.file_type().is_file() {
            continue;
        }
        let path = entry.path();
        if path.extension().map(|ext| ext != "jsonl").unwrap_or(true) {
            continue;
        }

        let file = File::open(path)?;
        for line in BufReader::new(file).lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            if let Ok(event) = serde_json::from_str::<TraceEvent>(&line) {
                sessions.entry(event.session_id.clone()).or_default().push(event);
            }
        }
    }

    for events in sessions.values_mut() {
        events.sort_by(|a, b| a.timestamp.cmp(&b.timestamp).then_with(|| a.id.cmp(&b.id)));
    }

    Ok(sessions)
}
