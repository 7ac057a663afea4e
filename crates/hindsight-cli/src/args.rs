use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

#[derive(Debug, Parser)]
#[command(name = "hindsight", version, about = "Trace-driven learning loop for coding-agent harnesses")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Ingest a JSONL trace file into the workspace store
    Ingest(IngestArgs),

    /// List stored sessions
    Sessions(SessionsArgs),

    /// Synthesize turn-start hints for a prompt
    Suggest(SuggestArgs),

    /// Run the offline evaluation gates
    #[command(subcommand)]
    Eval(EvalCommand),

    /// Long-horizon holdout split with the family-disjoint lane
    Holdout(HoldoutArgs),

    /// Export one session as a gzipped bundle
    ExportBundle(ExportBundleArgs),
}

#[derive(Debug, Args)]
pub struct IngestArgs {
    /// Workspace data directory (defaults to the resolved workspace path)
    #[arg(long)]
    pub data_dir: Option<String>,

    /// JSONL trace file to ingest
    pub file: PathBuf,
}

#[derive(Debug, Args)]
pub struct SessionsArgs {
    #[arg(long)]
    pub data_dir: Option<String>,
}

#[derive(Debug, Args)]
pub struct SuggestArgs {
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Session the hints are synthesized for
    #[arg(long)]
    pub session: Option<String>,

    /// Maximum number of hints
    #[arg(long, default_value_t = 3)]
    pub max_suggestions: usize,

    /// Only emit mined artifacts
    #[arg(long)]
    pub artifact_only: bool,

    /// The turn-start prompt
    pub prompt: Vec<String>,
}

#[derive(Debug, Subcommand)]
pub enum EvalCommand {
    /// Observed A/B gate over OFF/ON recovery pairs
    Observed(EvalArgs),

    /// Trajectory-outcome gate over harmful retries
    Trajectory(EvalArgs),
}

#[derive(Debug, Args)]
pub struct EvalArgs {
    /// Directory of JSONL trace files
    #[arg(long)]
    pub traces: PathBuf,

    /// Optional evaluation config (TOML)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Exit non-zero when the gate fails
    #[arg(long)]
    pub strict: bool,

    /// Emit the full report as JSON on stdout
    #[arg(long)]
    pub json: bool,

    /// Also export pairs as CSV to this path
    #[arg(long)]
    pub csv: Option<PathBuf>,
}

#[derive(Debug, Args)]
pub struct HoldoutArgs {
    #[arg(long)]
    pub traces: PathBuf,

    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Exit non-zero when train/eval families overlap
    #[arg(long)]
    pub strict: bool,

    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Args)]
pub struct ExportBundleArgs {
    #[arg(long)]
    pub data_dir: Option<String>,

    /// Session to export
    #[arg(long)]
    pub session: String,

    /// Team namespace for the bundle key
    #[arg(long, default_value = "local")]
    pub team: String,

    /// Bundle store root
    #[arg(long)]
    pub out: PathBuf,
}
