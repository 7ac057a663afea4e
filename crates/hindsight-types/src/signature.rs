use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;

use crate::util::truncate;

/// Upper bound on a normalized command signature
const COMMAND_SIGNATURE_MAX: usize = 240;

/// Upper bound on a single error signature line
const ERROR_SIGNATURE_MAX: usize = 160;

static ENV_PREFIX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^(?:env\s+)?(?:[a-z_][a-z0-9_]*=\S*\s+)+").unwrap());
static QUOTED: Lazy<Regex> = Lazy::new(|| Regex::new(r#""[^"]*"|'[^']*'"#).unwrap());
static NUMBER: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d+\b").unwrap());
static ERROR_CUE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:error|exception|traceback|failed|failure|fatal|panic(?:ked)?|denied|not found|no such file|unknown option|invalid argument|modulenotfounderror)\b",
    )
    .unwrap()
});
static HTTP_STATUS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)\b(?:http|status|code)\b\D{0,10}\b[45]\d{2}\b").unwrap());

/// Lowercase, collapse whitespace, trim
pub fn normalize_text(s: &str) -> String {
    s.to_lowercase()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Reduce a shell command to a stable signature: env-var prefixes stripped,
/// quoted strings become `<str>`, long paths become `<path>`, numeric
/// literals become `<num>`. Bounded to 240 chars.
pub fn normalize_command_signature(cmd: &str) -> String {
    let lowered = normalize_text(cmd);
    let stripped = ENV_PREFIX.replace(&lowered, "");
    let quoted = QUOTED.replace_all(&stripped, "<str>");

    let pathed: Vec<String> = quoted
        .split_whitespace()
        .map(|token| {
            let slashes = token.matches('/').count();
            if slashes >= 3 || (slashes >= 1 && token.len() > 16) {
                "<path>".to_string()
            } else {
                token.to_string()
            }
        })
        .collect();

    let joined = pathed.join(" ");
    let numbered = NUMBER.replace_all(&joined, "<num>");
    truncate(numbered.trim(), COMMAND_SIGNATURE_MAX)
}

/// Scan tool output for lines matching error cues (`Error`, `Exception`,
/// `FAILED`, HTTP status >= 400, ...) and return up to `k` normalized,
/// deduplicated signatures in scan order.
pub fn extract_error_signatures(output: &str, k: usize) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut signatures = Vec::new();

    for line in output.lines() {
        if signatures.len() >= k {
            break;
        }
        if !ERROR_CUE.is_match(line) && !HTTP_STATUS.is_match(line) {
            continue;
        }
        let sig = truncate(&normalize_text(line), ERROR_SIGNATURE_MAX);
        if sig.is_empty() {
            continue;
        }
        if seen.insert(sig.clone()) {
            signatures.push(sig);
        }
    }

    signatures
}

/// Character trigram Jaccard similarity at or above `threshold` means the
/// two strings are near-duplicates. Byte-equal strings always match.
pub fn are_near_duplicate(a: &str, b: &str, threshold: f64) -> bool {
    if a == b {
        return true;
    }
    let na = normalize_text(a);
    let nb = normalize_text(b);
    if na == nb {
        return true;
    }

    let grams_a = trigrams(&na);
    let grams_b = trigrams(&nb);
    if grams_a.is_empty() || grams_b.is_empty() {
        return na == nb;
    }

    let intersection = grams_a.intersection(&grams_b).count();
    let union = grams_a.len() + grams_b.len() - intersection;
    if union == 0 {
        return true;
    }
    (intersection as f64 / union as f64) >= threshold
}

fn trigrams(s: &str) -> HashSet<Vec<char>> {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() < 3 {
        return HashSet::new();
    }
    chars.windows(3).map(|w| w.to_vec()).collect()
}
