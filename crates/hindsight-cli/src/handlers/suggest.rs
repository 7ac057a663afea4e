use owo_colors::OwoColorize;

use hindsight_engine::{HintConfig, HintMode};
use hindsight_runtime::{resolve_workspace_path, HarnessSink, SinkOptions};

use crate::args::SuggestArgs;
use crate::handlers::EXIT_OK;

pub fn handle_suggest(args: &SuggestArgs) -> anyhow::Result<i32> {
    let data_dir = resolve_workspace_path(args.data_dir.as_deref())?;
    let prompt = args.prompt.join(" ");

    let hints = HintConfig {
        max_suggestions: args.max_suggestions,
        hint_mode: if args.artifact_only {
            HintMode::ArtifactOnly
        } else {
            HintMode::All
        },
        ..Default::default()
    };

    let mut options = SinkOptions::new(&data_dir, "cli");
    options.hints = hints;
    if let Some(session) = &args.session {
        options = options.with_session_id(session.clone());
    }
    let sink = HarnessSink::install(options)?;

    match sink.before_agent_start(&prompt) {
        Some(message) => {
            println!("{}", "Prior hints:".bold());
            println!("{}", message);
        }
        None => println!("{}", "No hints above the confidence floors.".dimmed()),
    }
    Ok(EXIT_OK)
}
