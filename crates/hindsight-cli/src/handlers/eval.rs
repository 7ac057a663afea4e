use owo_colors::OwoColorize;

use hindsight_eval::{
    build_observed_report, build_pairs, build_trajectory_report, export_pairs_csv,
    extract_all_episodes, load_corpus, EvalConfig, GateResult,
};

use crate::args::{EvalArgs, EvalCommand};
use crate::handlers::{EXIT_GATE_FAILED, EXIT_OK};

pub fn handle_eval(command: &EvalCommand) -> anyhow::Result<i32> {
    match command {
        EvalCommand::Observed(args) => run_observed(args),
        EvalCommand::Trajectory(args) => run_trajectory(args),
    }
}

fn load_eval_config(args: &EvalArgs) -> anyhow::Result<EvalConfig> {
    if !args.traces.is_dir() {
        anyhow::bail!("traces directory not found: {}", args.traces.display());
    }
    match &args.config {
        Some(path) => Ok(EvalConfig::load_from(path)?),
        None => Ok(EvalConfig::default()),
    }
}

fn run_observed(args: &EvalArgs) -> anyhow::Result<i32> {
    let config = load_eval_config(args)?;
    let corpus = load_corpus(&args.traces)?;
    let episodes = extract_all_episodes(&corpus);
    let (pairs, diagnostics) = build_pairs(&episodes, &config.pairing);

    if let Some(csv_path) = &args.csv {
        export_pairs_csv(&pairs, csv_path)?;
    }

    let report = build_observed_report(
        &episodes,
        &pairs,
        diagnostics,
        &config.pairing,
        &config.observed,
        &config.trust,
    )?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Episodes: {}   Pairs: {}   (families eligible: {})",
            report.episode_count,
            report.pair_count,
            report.pairing_diagnostics.families_eligible
        );
        println!(
            "Dead-end reduction: {:.1}%   Wall-time: {:.1}%   Tokens: {:.1}%",
            report.aggregate.relative_dead_end_reduction * 100.0,
            report.aggregate.relative_wall_time_reduction * 100.0,
            report.aggregate.relative_token_count_reduction * 100.0
        );
        if let Some(interval) = report.trust_summary.intervals.get("relativeDeadEndReduction") {
            println!(
                "Dead-end reduction CI: [{:.3}, {:.3}, {:.3}]",
                interval.low, interval.median, interval.high
            );
        }
        print_gate(&report.gate_result);
    }

    Ok(exit_code(&report.gate_result, args.strict))
}

fn run_trajectory(args: &EvalArgs) -> anyhow::Result<i32> {
    let config = load_eval_config(args)?;
    let corpus = load_corpus(&args.traces)?;
    let episodes = extract_all_episodes(&corpus);
    let (pairs, diagnostics) = build_pairs(&episodes, &config.pairing);

    if let Some(csv_path) = &args.csv {
        export_pairs_csv(&pairs, csv_path)?;
    }

    let report = build_trajectory_report(
        &episodes,
        &pairs,
        diagnostics,
        &config.pairing,
        &config.trajectory,
        &config.trust,
    )?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!(
            "Pairs: {}   Harmful retries OFF/ON: {}/{}   Abstained OFF/ON: {}/{}",
            report.pair_count,
            report.aggregate.harmful_retries_off,
            report.aggregate.harmful_retries_on,
            report.aggregate.abstained_off,
            report.aggregate.abstained_on
        );
        println!(
            "Harmful-retry reduction: {:.1}%   Coverage OFF/ON: {:.2}/{:.2}",
            report.aggregate.relative_harmful_retry_reduction * 100.0,
            report.aggregate.judgeable_coverage_off,
            report.aggregate.judgeable_coverage_on
        );
        print_gate(&report.gate_result);
    }

    Ok(exit_code(&report.gate_result, args.strict))
}

fn print_gate(result: &GateResult) {
    if result.pass {
        println!("{}", "GATE: PASS".green().bold());
    } else {
        println!("{}", "GATE: FAIL".red().bold());
        for failure in &result.failures {
            println!("  - {}", failure);
        }
    }
}

fn exit_code(result: &GateResult, strict: bool) -> i32 {
    if strict && !result.pass {
        EXIT_GATE_FAILED
    } else {
        EXIT_OK
    }
}
