//! Text helpers shared by the normalizer, the indexes, and the rules.
//!
//! Everything here is a pure function over `&str`; the keyword and token
//! conventions (lowercase, alphanumeric, length floor of 3) are part of the
//! data-model contract, so they live next to it.

/// Lowercase alphanumeric tokens of length >= 3.
///
/// This is the convention for `ToolSpec::description_tokens` and the
/// keyword index: split on anything non-alphanumeric, drop short fragments.
pub fn tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.len() >= 3)
        .map(str::to_string)
        .collect()
}

/// Word tokens of length > 2, used by name similarity scoring.
pub fn word_tokens(text: &str) -> Vec<String> {
    text.to_lowercase()
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .flat_map(|w| w.split('_'))
        .filter(|t| t.len() > 2)
        .map(str::to_string)
        .collect()
}

/// Split an identifier into lowercase parts on camelCase and underscore
/// boundaries: `getUserId` -> `["get", "user", "id"]`.
pub fn identifier_tokens(name: &str) -> Vec<String> {
    let mut parts = Vec::new();
    let mut current = String::new();
    let mut prev_lower = false;
    for c in name.chars() {
        if !c.is_alphanumeric() {
            if !current.is_empty() {
                parts.push(std::mem::take(&mut current));
            }
            prev_lower = false;
            continue;
        }
        if c.is_uppercase() && prev_lower {
            if !current.is_empty() {
                parts.push(std::mem::take(&mut current));
            }
        }
        prev_lower = c.is_lowercase() || c.is_numeric();
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        parts.push(current);
    }
    parts
}

/// Jaccard similarity of two token sets. Both empty -> 0.
pub fn jaccard(a: &[String], b: &[String]) -> f64 {
    use std::collections::HashSet;
    let sa: HashSet<&str> = a.iter().map(String::as_str).collect();
    let sb: HashSet<&str> = b.iter().map(String::as_str).collect();
    if sa.is_empty() && sb.is_empty() {
        return 0.0;
    }
    let intersection = sa.intersection(&sb).count();
    let union = sa.union(&sb).count();
    if union == 0 {
        return 0.0;
    }
    intersection as f64 / union as f64
}

/// True when `needle` occurs in `haystack` as a contiguous subsequence.
pub fn is_subsequence(needle: &[String], haystack: &[String]) -> bool {
    if needle.is_empty() || needle.len() > haystack.len() {
        return false;
    }
    haystack.windows(needle.len()).any(|w| w == needle)
}
