//! Food name matching
//!
//! Names match when equal after normalization or when either contains the other.
//! This is permissive on purpose: "rice" matches both "fried rice" and "rice pudding".

use serde::Serialize;

/// Lowercase, trim and collapse internal whitespace
pub fn normalize_name(name: &str) -> String {
    name.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Match rule on already normalized names
pub fn normalized_names_match(a: &str, b: &str) -> bool {
    a == b || a.contains(b) || b.contains(a)
}

/// Whether two raw food names refer to the same food
pub fn names_match(a: &str, b: &str) -> bool {
    normalized_names_match(&normalize_name(a), &normalize_name(b))
}

/// Outcome of greedy one-to-one matching
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MatchCounts {
    pub true_positives: usize,
    pub false_positives: usize,
    pub false_negatives: usize,
}

/// Greedily pair detected names with actual names
///
/// Detected names are visited in order and each claims the first actual name
/// that matches and is not yet claimed. Inputs must already be normalized.
pub fn match_foods<S: AsRef<str>>(detected: &[S], actual: &[S]) -> MatchCounts {
    let mut claimed = vec![false; actual.len()];
    let mut true_positives = 0;

    for d in detected {
        let hit = actual
            .iter()
            .enumerate()
            .find(|(i, a)| !claimed[*i] && normalized_names_match(d.as_ref(), a.as_ref()))
            .map(|(i, _)| i);

        if let Some(i) = hit {
            claimed[i] = true;
            true_positives += 1;
        }
    }

    MatchCounts {
        true_positives,
        false_positives: detected.len() - true_positives,
        false_negatives: actual.len() - true_positives,
    }
}
