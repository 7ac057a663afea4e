use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// Failure taxonomy for the trajectory-outcome lane. The match order below
/// is a versioned contract: reordering changes gate results.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailureKind {
    TransientExternal,
    BenignProbe,
    CommandMismatch,
    EnvironmentMismatch,
    MissingContext,
    UnknownFailure,
}

impl FailureKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureKind::TransientExternal => "transient_external",
            FailureKind::BenignProbe => "benign_probe",
            FailureKind::CommandMismatch => "command_mismatch",
            FailureKind::EnvironmentMismatch => "environment_mismatch",
            FailureKind::MissingContext => "missing_context",
            FailureKind::UnknownFailure => "unknown_failure",
        }
    }
}

/// One classified failure
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Classification {
    pub kind: FailureKind,
    pub harmful: bool,
    pub confidence: f64,
    pub abstained: bool,
}

static TRANSIENT_EXTERNAL: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\btimed? ?out\b|timeout|connection reset|econnreset|etimedout|eai_again|rate limit|too many requests|\b429\b|\b5\d{2}\b.{0,30}(server|error|unavailable)|service unavailable|temporarily unavailable|network is unreachable",
    )
    .unwrap()
});

static PROBE_COMMANDS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:curl|wget|rg|grep|find|ls|stat|test|cat|head|tail|which|jq)\b").unwrap()
});

static PROBE_FAILURE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b404\b|not found|no matches|no match found|no such file|nothing to show|empty (?:response|result)|jq: error|parse error",
    )
    .unwrap()
});

static COMMAND_MISMATCH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)unknown option|unrecognized option|unknown flag|invalid argument|invalid option|no such option|did you mean|usage:|requires the .{0,40}flag|must (?:be run with|specify) ",
    )
    .unwrap()
});

static ENVIRONMENT_MISMATCH: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)command not found|not recognized as an? |no such file or directory|externally-managed-environment|err_module_not_found|modulenotfounderror|permission denied|eacces|is not installed",
    )
    .unwrap()
});

static MISSING_CONTEXT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)traceback \(most recent call last\)|keyerror|attributeerror|typeerror|nameerror|importerror|merge (?:conflict|blocked)|cannot merge|\b401\b|\b403\b|unauthorized|forbidden|does not exist in (?:the )?repo|path .{0,80}does not exist",
    )
    .unwrap()
});

/// Classify one failing tool result from its command and output. The
/// precedence encodes severity ordering: external flake, then harmless
/// probes, then the three harmful kinds, then abstain.
pub fn classify_failure(command: &str, output: &str) -> Classification {
    let combined = format!("{}\n{}", command, output);
    let command_lower = command.trim().to_lowercase();

    if TRANSIENT_EXTERNAL.is_match(&combined) {
        return Classification {
            kind: FailureKind::TransientExternal,
            harmful: false,
            confidence: 0.84,
            abstained: false,
        };
    }

    if PROBE_COMMANDS.is_match(&command_lower) && PROBE_FAILURE.is_match(output) {
        return Classification {
            kind: FailureKind::BenignProbe,
            harmful: false,
            confidence: 0.82,
            abstained: false,
        };
    }

    if COMMAND_MISMATCH.is_match(&combined) {
        return Classification {
            kind: FailureKind::CommandMismatch,
            harmful: true,
            confidence: 0.90,
            abstained: false,
        };
    }

    if ENVIRONMENT_MISMATCH.is_match(&combined) {
        return Classification {
            kind: FailureKind::EnvironmentMismatch,
            harmful: true,
            confidence: 0.86,
            abstained: false,
        };
    }

    if MISSING_CONTEXT.is_match(&combined) {
        return Classification {
            kind: FailureKind::MissingContext,
            harmful: true,
            confidence: 0.78,
            abstained: false,
        };
    }

    Classification {
        kind: FailureKind::UnknownFailure,
        harmful: false,
        confidence: 0.35,
        abstained: true,
    }
}
