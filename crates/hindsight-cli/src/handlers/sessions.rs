use hindsight_runtime::{resolve_workspace_path, TraceStore};

use crate::args::SessionsArgs;
use crate::handlers::EXIT_OK;

pub fn handle_sessions(args: &SessionsArgs) -> anyhow::Result<i32> {
    let data_dir = resolve_workspace_path(args.data_dir.as_deref())?;
    let store = TraceStore::open(&data_dir)?;
    let mut summaries = store.list_sessions()?;
    summaries.sort_by(|a, b| b.last_timestamp.cmp(&a.last_timestamp));

    if summaries.is_empty() {
        println!("No sessions stored under {}", data_dir.display());
        return Ok(EXIT_OK);
    }

    println!(
        "{:<40} {:>8} {:>8} {:>8}",
        "SESSION", "EVENTS", "TOOLS", "FAILS"
    );
    for summary in &summaries {
        println!(
            "{:<40} {:>8} {:>8} {:>8}",
            summary.session_id,
            summary.event_count,
            summary.tool_result_count,
            summary.failure_count
        );
    }
    Ok(EXIT_OK)
}
