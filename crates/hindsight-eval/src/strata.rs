use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::observed::{aggregate_pairs, gate, GateResult, ObservedAggregate, ObservedThresholds};
use crate::pairing::FailurePair;

/// Closed mapping from a family signature's leading token to a tool surface
pub fn tool_surface(family_signature: &str) -> &'static str {
    let first_token = family_signature.split_whitespace().next().unwrap_or("");
    let program = first_token.rsplit('/').next().unwrap_or(first_token);

    match program {
        "git" => "git",
        "kubectl" | "helm" | "k9s" => "k8s",
        "docker" | "podman" | "docker-compose" => "container:docker",
        "npm" | "npx" | "yarn" | "pnpm" | "node" | "tsc" | "jest" | "vitest" => "js-toolchain",
        "python" | "python3" | "pip" | "pip3" | "pytest" | "tox" | "uv" | "poetry" => {
            "python-toolchain"
        }
        "go" | "gofmt" | "golangci-lint" => "go-toolchain",
        "curl" | "wget" | "http" | "httpie" => "http-probe",
        "bash" | "sh" | "zsh" | "ls" | "cat" | "cd" | "mkdir" | "rm" | "cp" | "mv" | "echo"
        | "grep" | "rg" | "find" | "sed" | "awk" => "shell",
        _ => "other",
    }
}

/// Model label for a pair. Pairs spanning two models become `mixed:a|b`
/// with sorted components.
pub fn pair_model(pair: &FailurePair) -> String {
    let off = pair.off.model.as_deref().unwrap_or("unknown");
    let on = pair.on.model.as_deref().unwrap_or("unknown");
    if off == on {
        off.to_string()
    } else {
        let mut sides = [off, on];
        sides.sort();
        format!("mixed:{}|{}", sides[0], sides[1])
    }
}

/// One stratum's aggregate and verdict
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StratumResult {
    pub pair_count: usize,
    pub aggregate: ObservedAggregate,
    pub gate_result: GateResult,
}

/// Stratified results along the three required dimensions
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StrataReport {
    pub model: BTreeMap<String, StratumResult>,
    pub tool_surface: BTreeMap<String, StratumResult>,
    pub model_tool_surface: BTreeMap<String, StratumResult>,
}

/// Group pairs by model, tool surface, and their cross product; each stratum
/// gets its own aggregate and gate run.
pub fn stratify(pairs: &[FailurePair], thresholds: &ObservedThresholds) -> StrataReport {
    let mut by_model: BTreeMap<String, Vec<FailurePair>> = BTreeMap::new();
    let mut by_surface: BTreeMap<String, Vec<FailurePair>> = BTreeMap::new();
    let mut by_cross: BTreeMap<String, Vec<FailurePair>> = BTreeMap::new();

    for pair in pairs {
        let model = pair_model(pair);
        let surface = tool_surface(&pair.family_signature).to_string();
        let cross = format!("{}/{}", model, surface);
        by_model.entry(model).or_default().push(pair.clone());
        by_surface.entry(surface).or_default().push(pair.clone());
        by_cross.entry(cross).or_default().push(pair.clone());
    }

    let summarize = |groups: BTreeMap<String, Vec<FailurePair>>| {
        groups
            .into_iter()
            .map(|(key, members)| {
                let aggregate = aggregate_pairs(&members);
                let gate_result = gate(&aggregate, thresholds);
                (
                    key,
                    StratumResult {
                        pair_count: members.len(),
                        aggregate,
                        gate_result,
                    },
                )
            })
            .collect()
    };

    StrataReport {
        model: summarize(by_model),
        tool_surface: summarize(by_surface),
        model_tool_surface: summarize(by_cross),
    }
}
