//! Locating the target line range for a search chunk.
//!
//! Three attempts, cheapest first:
//! 1. exact-position check at the declared start line (fast path for
//!    unshifted content);
//! 2. a windowed scan sliding the search-sized window across a slack region
//!    around the declared line, or the whole buffer when no line was
//!    declared (the dominant cost center);
//! 3. one aggressive line-number-stripping retry over the same window.
//!
//! Anything still below threshold fails with a diagnostic payload embedding
//! the best candidate and a buffer excerpt.

use tracing::debug;

use crate::engine::DiffOptions;
use crate::engine::normalize;
use crate::engine::similarity;
use crate::error::PatchError;

/// Best-scoring candidate from a scan. Transient, produced per block.
#[derive(Debug, Clone)]
pub struct MatchResult {
    /// 0-based start of the best window, `None` when nothing scored above 0.
    pub index: Option<usize>,
    /// Similarity of the best window, in `[0, 1]`.
    pub score: f64,
    /// Text of the best window, for diagnostics.
    pub content: String,
}

/// A successfully located target range.
#[derive(Debug)]
pub(crate) struct Located {
    /// 0-based buffer line where the matched range starts.
    pub index: usize,
    /// Similarity that cleared the threshold.
    pub score: f64,
    /// Set when the match only succeeded after aggressive line-number
    /// stripping; the caller swaps its working (search, replace) text
    /// for these for the remainder of the block.
    pub stripped: Option<(String, String)>,
}

/// Slide a window of `chunk`'s line count across `lines[start..end)`,
/// scoring each offset and keeping the best.
pub fn fuzzy_search(lines: &[String], chunk: &str, start: usize, end: usize) -> MatchResult {
    let mut best = MatchResult {
        index: None,
        score: 0.0,
        content: String::new(),
    };

    let window = chunk.split('\n').count();
    let end = end.min(lines.len());
    if window == 0 || end < window {
        return best;
    }

    for i in start..=(end - window) {
        let candidate = lines[i..i + window].join("\n");
        let score = similarity::score(&candidate, chunk);
        if score > best.score {
            best = MatchResult {
                index: Some(i),
                score,
                content: candidate,
            };
        }
    }

    best
}

/// Find the line range in `lines` matching `search`, or fail with
/// [`PatchError::NoSimilarMatch`].
///
/// `start_line` is the 1-based, delta-adjusted declared line (0 =
/// unspecified, scans the whole buffer). `replace` travels along so the
/// aggressive retry can hand back a consistently stripped pair.
pub(crate) fn locate(
    lines: &[String],
    search: &str,
    replace: &str,
    start_line: usize,
    opts: &DiffOptions,
) -> Result<Located, PatchError> {
    let search_line_count = search.split('\n').count();

    let mut scan_start = 0usize;
    let mut scan_end = lines.len();
    let mut best = MatchResult {
        index: None,
        score: 0.0,
        content: String::new(),
    };

    // Fast path: content exactly where the caller declared it.
    if start_line > 0 {
        let exact_start = start_line - 1;
        let exact_end = (exact_start + search_line_count).min(lines.len());
        let chunk = if exact_start < lines.len() {
            lines[exact_start..exact_end].join("\n")
        } else {
            String::new()
        };

        let score = similarity::score(&chunk, search);
        if score >= opts.fuzzy_threshold {
            debug!(line = start_line, score, "exact-position match");
            return Ok(Located {
                index: exact_start,
                score,
                stripped: None,
            });
        }

        scan_start = start_line.saturating_sub(opts.buffer_lines + 1);
        scan_end = lines.len().min(start_line + search_line_count + opts.buffer_lines);
    }

    let scanned = fuzzy_search(lines, search, scan_start, scan_end);
    if scanned.score > best.score {
        best = scanned;
    }

    if let Some(index) = best.index {
        if best.score >= opts.fuzzy_threshold {
            debug!(index, score = best.score, "windowed scan match");
            return Ok(Located {
                index,
                score: best.score,
                stripped: None,
            });
        }
    }

    // Last resort: re-derive the chunk with aggressive line-number stripping
    // and scan the same window once more.
    let aggressive_search = normalize::strip_line_numbers(search, true);
    if aggressive_search != search {
        let retried = fuzzy_search(lines, &aggressive_search, scan_start, scan_end);
        if let Some(index) = retried.index {
            if retried.score >= opts.fuzzy_threshold {
                debug!(index, score = retried.score, "aggressive-strip match");
                let aggressive_replace = normalize::strip_line_numbers(replace, true);
                return Ok(Located {
                    index,
                    score: retried.score,
                    stripped: Some((aggressive_search, aggressive_replace)),
                });
            }
        }
    }

    Err(no_match_error(lines, search, start_line, search_line_count, &best, opts))
}

/// Assemble the `NoSimilarMatch` diagnostic: score, threshold, searched
/// range, best candidate found, and a buffer excerpt around the declared
/// location, enough to diagnose without re-running.
fn no_match_error(
    lines: &[String],
    search: &str,
    start_line: usize,
    search_line_count: usize,
    best: &MatchResult,
    opts: &DiffOptions,
) -> PatchError {
    let line_hint = if start_line > 0 {
        format!(" at line: {start_line}")
    } else {
        String::new()
    };

    let search_range = if start_line > 0 {
        format!("starting at line {start_line}")
    } else {
        "start to end".to_owned()
    };

    let best_match_section = best.index.map_or_else(
        || "(no match)".to_owned(),
        |index| normalize::add_line_numbers(&best.content, index + 1),
    );

    let excerpt_start = start_line.saturating_sub(1 + opts.buffer_lines);
    let excerpt_end = lines
        .len()
        .min(start_line + search_line_count + opts.buffer_lines);
    let excerpt = if excerpt_start < excerpt_end {
        normalize::add_line_numbers(
            &lines[excerpt_start..excerpt_end].join("\n"),
            1.max(start_line.saturating_sub(opts.buffer_lines)),
        )
    } else {
        "(empty)".to_owned()
    };

    let details = format!(
        "Debug Info:\n\
         - Similarity Score: {:.0}%\n\
         - Required Threshold: {:.0}%\n\
         - Search Range: {search_range}\n\
         - Tried both standard and aggressive line number stripping\n\
         - Tip: use the read tool to get the latest content before retrying, the buffer may have changed\n\n\
         Search Content:\n{search}\n\n\
         Best Match Found:\n{best_match_section}\n\n\
         Original Content:\n{excerpt}",
        (best.score * 100.0).floor(),
        (opts.fuzzy_threshold * 100.0).floor(),
    );

    PatchError::NoSimilarMatch {
        score: best.score,
        threshold: opts.fuzzy_threshold,
        line_hint,
        details,
    }
}
