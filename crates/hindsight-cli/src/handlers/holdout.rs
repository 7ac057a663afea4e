use hindsight_eval::{analyze_holdout, load_corpus, EvalConfig, PrimaryLane};

use crate::args::HoldoutArgs;
use crate::handlers::{EXIT_FAMILY_OVERLAP, EXIT_OK};

pub fn handle_holdout(args: &HoldoutArgs) -> anyhow::Result<i32> {
    if !args.traces.is_dir() {
        anyhow::bail!("traces directory not found: {}", args.traces.display());
    }
    let mut config = match &args.config {
        Some(path) => EvalConfig::load_from(path)?,
        None => EvalConfig::default(),
    };
    if args.strict {
        config.holdout.strict_family_overlap = true;
    }

    let corpus = load_corpus(&args.traces)?;
    let lanes = analyze_holdout(&corpus, &config.pairing, &config.holdout);
    let report = &lanes.report;

    if args.json {
        println!("{}", serde_json::to_string_pretty(report)?);
    } else {
        println!(
            "Sessions: {} kept of {}   Train/Eval: {}/{}",
            report.sessions_kept,
            report.sessions_total,
            report.train_session_count,
            report.eval_session_count
        );
        println!(
            "Families train/eval: {}/{}   Overlap: {} ({:.1}% of eval)",
            report.train_family_count,
            report.eval_family_count,
            report.overlapping_family_count,
            report.overlap_rate_by_eval_families * 100.0
        );
        println!(
            "Eval pairs: {}   Family-disjoint pairs: {}   Primary lane: {}",
            report.eval_pair_count,
            report.family_disjoint_pair_count,
            match report.primary_lane {
                PrimaryLane::FullEval => "full-eval",
                PrimaryLane::FamilyDisjoint => "family-disjoint",
            }
        );
    }

    if report.strict_violation {
        return Ok(EXIT_FAMILY_OVERLAP);
    }
    Ok(EXIT_OK)
}
