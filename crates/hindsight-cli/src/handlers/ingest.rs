use std::fs::File;
use std::io::{BufRead, BufReader};
use std::sync::Arc;

use anyhow::Context;

use hindsight_index::{Bm25Config, CompositeConfig, CompositeIndex, DocumentIndex, LexicalIndex};
use hindsight_runtime::{resolve_workspace_path, LearningLoop, TraceStore};
use hindsight_types::TraceEvent;

use crate::args::IngestArgs;
use crate::handlers::EXIT_OK;

pub fn handle_ingest(args: &IngestArgs) -> anyhow::Result<i32> {
    let data_dir = resolve_workspace_path(args.data_dir.as_deref())?;
    let store = Arc::new(TraceStore::open(&data_dir)?);
    let primary: Arc<dyn DocumentIndex> = Arc::new(LexicalIndex::new(Bm25Config::default())?);
    let index = CompositeIndex::new(primary, None, CompositeConfig::default())?;
    let learning = LearningLoop::new(store, index);

    let file = File::open(&args.file)
        .with_context(|| format!("cannot open trace file {}", args.file.display()))?;

    let mut ingested = 0usize;
    let mut skipped = 0usize;
    for line in BufReader::new(file).lines() {
        let line = line?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<TraceEvent>(&line) {
            Ok(event) => {
                learning.ingest(&event)?;
                ingested += 1;
            }
            Err(_) => skipped += 1,
        }
    }

    println!("Ingested {} events ({} malformed lines skipped)", ingested, skipped);
    println!("Store: {}", data_dir.display());
    Ok(EXIT_OK)
}
