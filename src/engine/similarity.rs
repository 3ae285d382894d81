//! Normalized similarity scoring between text chunks.
//!
//! The match locator compares a search chunk against candidate line windows
//! with [`score`]: 1.0 is identical, 0.0 is completely different. Fast paths
//! handle exact and case-insensitive matches before falling back to
//! Levenshtein edit distance.

/// Maximum character count for Levenshtein inputs.
///
/// Inputs longer than this are rejected with a pessimistic distance estimate
/// to prevent O(m*n) allocation/computation DoS. 10,000 characters covers any
/// reasonable search chunk; the windowed scan keeps chunks bounded anyway.
const MAX_LEVENSHTEIN_INPUT: usize = 10_000;

/// Near-exact score for chunks that differ only in case or edge whitespace.
///
/// Rewards inconsequential differences without conflating them with a true
/// exact match.
const NEAR_EXACT_SCORE: f64 = 0.99;

/// Compute the Levenshtein edit distance between two strings.
///
/// Returns the minimum number of single-character edits (insertions,
/// deletions, substitutions) required to transform `a` into `b`.
///
/// If either input exceeds [`MAX_LEVENSHTEIN_INPUT`] characters, returns
/// `max(m, n)` as a pessimistic upper bound without computing the full matrix.
pub fn distance(a: &str, b: &str) -> usize {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let m = a_chars.len();
    let n = b_chars.len();

    if m == 0 {
        return n;
    }
    if n == 0 {
        return m;
    }

    // DoS guard: reject oversized inputs with pessimistic estimate.
    if m > MAX_LEVENSHTEIN_INPUT || n > MAX_LEVENSHTEIN_INPUT {
        return m.max(n);
    }

    // Use two rows instead of the full matrix for O(min(m,n)) space.
    let mut prev = vec![0usize; n + 1];
    let mut curr = vec![0usize; n + 1];

    for (j, slot) in prev.iter_mut().enumerate() {
        *slot = j;
    }

    for i in 1..=m {
        curr[0] = i;
        for j in 1..=n {
            let cost = usize::from(a_chars[i - 1] != b_chars[j - 1]);
            curr[j] = (prev[j] + 1) // deletion
                .min(curr[j - 1] + 1) // insertion
                .min(prev[j - 1] + cost); // substitution
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

/// Score the similarity of two text chunks in `[0, 1]`.
///
/// - Exact equality is 1.0.
/// - Exactly one empty string is 0.0 (both empty is 1.0 via equality).
/// - Case-insensitive, edge-trimmed equality is [`NEAR_EXACT_SCORE`].
/// - Otherwise `1 - distance / max(char_len)`.
pub fn score(a: &str, b: &str) -> f64 {
    if a == b {
        return 1.0;
    }
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    if a.to_lowercase().trim() == b.to_lowercase().trim() {
        return NEAR_EXACT_SCORE;
    }

    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }

    let dist = distance(a, b);
    1.0 - (dist as f64 / max_len as f64)
}
