//! Fuzzy "did you mean" lookups for unknown catalog ids.

use strsim::jaro_winkler;

/// Minimum similarity score for a suggestion (0.0-1.0).
const FUZZY_THRESHOLD: f64 = 0.8;

/// The candidate most similar to `name`, if any clears the threshold.
pub fn closest_match<'a>(
    name: &str,
    candidates: impl IntoIterator<Item = &'a str>,
) -> Option<String> {
    let lower = name.to_lowercase();
    candidates
        .into_iter()
        .map(|c| (jaro_winkler(&lower, &c.to_lowercase()), c))
        .filter(|(score, _)| *score >= FUZZY_THRESHOLD)
        .max_by(|a, b| a.0.total_cmp(&b.0))
        .map(|(_, c)| c.to_string())
}
