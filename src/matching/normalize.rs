//! Title/artist normalization and candidate deduplication

use std::cmp::Ordering;
use std::collections::HashMap;

use lazy_static::lazy_static;
use regex::Regex;

use super::candidate::MatchCandidate;

lazy_static! {
    static ref BRACKETED: Regex =
        Regex::new(r"[\(\[\{][^\)\]\}]*[\)\]\}]").expect("Invalid bracket pattern");
    static ref FEATURING: Regex =
        Regex::new(r"\b(?:featuring|feat\.?|ft\.?)\s.*$").expect("Invalid featuring pattern");
    static ref NON_ALPHANUMERIC: Regex =
        Regex::new(r"[^\p{L}\p{N}]+").expect("Invalid separator pattern");
}

/// Normalize a title or artist for identity comparison
///
/// Lowercases, removes bracketed qualifiers and `feat.` clauses, and
/// collapses runs of non-alphanumeric characters to single spaces.
///
/// # Example
///
/// ```
/// use beatscan::matching::normalize::dedup_key;
///
/// assert_eq!(dedup_key("Night Drive (Remix) feat. Ola"), "night drive");
/// assert_eq!(dedup_key("  A$AP -- Test!! "), "a ap test");
/// ```
pub fn dedup_key(text: &str) -> String {
    let lower = text.to_lowercase();
    let without_brackets = BRACKETED.replace_all(&lower, " ");
    let without_featuring = FEATURING.replace(&without_brackets, " ");
    NON_ALPHANUMERIC
        .replace_all(&without_featuring, " ")
        .trim()
        .to_string()
}

/// Drop duplicates by normalized (title, artist), keeping the most confident
///
/// First-seen order is preserved for the survivors.
pub fn dedupe(candidates: Vec<MatchCandidate>) -> Vec<MatchCandidate> {
    let mut index: HashMap<(String, String), usize> = HashMap::new();
    let mut kept: Vec<MatchCandidate> = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        let key = candidate.dedup_key();
        match index.get(&key) {
            Some(&i) => {
                if candidate.confidence > kept[i].confidence {
                    kept[i] = candidate;
                }
            }
            None => {
                index.insert(key, kept.len());
                kept.push(candidate);
            }
        }
    }

    kept
}

/// Sort by confidence, highest first (stable)
pub fn rank(candidates: &mut [MatchCandidate]) {
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });
}
