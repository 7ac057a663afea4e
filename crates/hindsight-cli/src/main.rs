mod args;
mod handlers;

use clap::Parser;

use args::{Cli, Command};

fn main() {
    let cli = Cli::parse();
    match run(&cli) {
        Ok(code) => std::process::exit(code),
        Err(err) => {
            eprintln!("ERROR: {}", err);
            std::process::exit(1);
        }
    }
}

fn run(cli: &Cli) -> anyhow::Result<i32> {
    match &cli.command {
        Command::Ingest(args) => handlers::handle_ingest(args),
        Command::Sessions(args) => handlers::handle_sessions(args),
        Command::Suggest(args) => handlers::handle_suggest(args),
        Command::Eval(command) => handlers::handle_eval(command),
        Command::Holdout(args) => handlers::handle_holdout(args),
        Command::ExportBundle(args) => handlers::handle_export_bundle(args),
    }
}
