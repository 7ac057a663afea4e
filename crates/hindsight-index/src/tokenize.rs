/// Lowercase and split on anything outside `[a-z0-9_./:-]`, dropping tokens
/// of length <= 1.
pub fn tokenize(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| {
            !(c.is_ascii_lowercase()
                || c.is_ascii_digit()
                || matches!(c, '_' | '.' | '/' | ':' | '-'))
        })
        .filter(|token| token.len() > 1)
        .map(|token| token.to_string())
        .collect()
}

/// Bound a tokenized query to `max` unique terms. When the unique terms
/// exceed the cap, keep the first `ceil(0.75 * max)` and fill the remaining
/// budget with the tail-most unique terms, preserving relative order. The
/// head keeps beginning context, the tail keeps recency context.
pub fn bound_query_terms(tokens: &[String], max: usize) -> Vec<String> {
    let mut unique = Vec::new();
    let mut seen = std::collections::HashSet::new();
    for token in tokens {
        if seen.insert(token.as_str()) {
            unique.push(token.clone());
        }
    }

    if unique.len() <= max || max == 0 {
        if max == 0 {
            unique.clear();
        }
        return unique;
    }

    let head_len = ((max as f64) * 0.75).ceil() as usize;
    let head_len = head_len.min(max);
    let tail_len = max - head_len;

    let mut bounded: Vec<String> = unique[..head_len].to_vec();
    if tail_len > 0 {
        let tail_start = unique.len() - tail_len;
        bounded.extend_from_slice(&unique[tail_start..]);
    }
    bounded
}
