//! Fuzzy SEARCH/REPLACE diff engine.
//!
//! Given an original text buffer and one or more SEARCH/REPLACE blocks
//! (optionally annotated with a `:start_line:`), locates each block's
//! intended target region even when line numbers or whitespace have
//! drifted, and applies the replacement while preserving indentation.
//!
//! # Architecture
//!
//! [`apply_diff`] sequences the stages per block:
//!
//! ```text
//! validate markers → extract blocks → per block:
//!     normalize (unescape, strip line numbers)
//!     locate    (exact position → windowed scan → aggressive retry)
//!     apply     (indentation re-anchor, region hook, splice)
//! → aggregate (success iff at least one block applied)
//! ```
//!
//! Validation/extraction failures are fatal and abort before any mutation.
//! Per-block failures are recorded and siblings continue. A running line
//! delta re-targets later blocks' declared lines against the already-mutated
//! buffer.
//!
//! The engine is pure and synchronous: each call works on its own line
//! vector, so concurrent calls on distinct buffers are safe. Calls against
//! the same logical document must be serialized by the caller.

pub mod apply;
pub mod locate;
pub mod normalize;
pub mod parser;
pub mod preview;
pub mod similarity;

use tracing::{debug, warn};

pub use apply::{RegionHook, mark_modified_section};
pub use locate::MatchResult;
pub use normalize::unescape_html_entities;
pub use parser::DiffBlock;

use crate::error::{PatchError, PatchResult};

/// Minimum normalized similarity to accept a candidate range.
pub const DEFAULT_FUZZY_THRESHOLD: f64 = 0.8;

/// Slack lines scanned around a declared start line.
pub const DEFAULT_BUFFER_LINES: usize = 5;

/// Tunables for one apply call.
#[derive(Debug, Clone)]
pub struct DiffOptions {
    /// Similarity threshold in `[0, 1]`; candidates below it are rejected.
    pub fuzzy_threshold: f64,
    /// Window slack around the declared start line for the fuzzy scan.
    pub buffer_lines: usize,
    /// Post-process hook for the first line of each applied block.
    /// `None` leaves replacement lines untouched.
    pub region_hook: Option<RegionHook>,
}

impl Default for DiffOptions {
    fn default() -> Self {
        Self {
            fuzzy_threshold: DEFAULT_FUZZY_THRESHOLD,
            buffer_lines: DEFAULT_BUFFER_LINES,
            region_hook: None,
        }
    }
}

/// Result of one [`apply_diff`] invocation.
#[derive(Debug)]
pub struct DiffOutcome {
    /// True when at least one block applied.
    pub success: bool,
    /// The full rebuilt buffer; `None` when no block applied.
    pub content: Option<String>,
    /// Number of blocks that applied.
    pub applied_count: usize,
    /// Per-block failures; non-fatal diagnostics when `success` is true.
    pub failures: Vec<PatchError>,
    /// One opaque region id per applied block, in application order.
    pub modified_sections: Vec<String>,
}

/// Apply a multi-block SEARCH/REPLACE diff to `original`.
///
/// HTML entities in `diff` are unescaped first, since tool-call channels may
/// entity-escape their payloads. Blocks are processed in ascending declared
/// start line order (unspecified lines first, ties in appearance order).
///
/// # Errors
///
/// `MalformedDiff` or `InvalidDiffFormat` when the diff text is structurally
/// broken; the original buffer is never partially touched in that case.
/// Per-block errors (`IdenticalContent`, `EmptySearch`, `NoSimilarMatch`) do
/// not abort the call; they are collected in [`DiffOutcome::failures`], and
/// the outcome only reports overall failure if no block applied.
pub fn apply_diff(original: &str, diff: &str, opts: &DiffOptions) -> PatchResult<DiffOutcome> {
    let diff = unescape_html_entities(diff);

    parser::validate_markers(&diff)?;
    let mut blocks = parser::parse_blocks(&diff)?;

    // Stable sort: unspecified (0) first, ties keep appearance order.
    blocks.sort_by_key(|block| block.start_line);

    // Output keeps whichever ending the input predominantly used.
    let uses_crlf = original.contains("\r\n");
    let mut lines: Vec<String> = original
        .split('\n')
        .map(|line| line.strip_suffix('\r').unwrap_or(line).to_owned())
        .collect();

    let mut delta: i64 = 0;
    let mut applied_count = 0usize;
    let mut failures: Vec<PatchError> = Vec::new();
    let mut modified_sections: Vec<String> = Vec::new();

    for block in blocks {
        let mut search = normalize::unescape_markers(&block.search);
        let mut replace = normalize::unescape_markers(&block.replace);

        // A declared line of 0 means unspecified and is never delta-adjusted.
        let mut start_line = if block.start_line == 0 {
            0
        } else {
            let adjusted = block.start_line as i64 + delta;
            if adjusted <= 0 { 0 } else { adjusted as usize }
        };

        let numbered = normalize::every_line_has_line_numbers(&search)
            && (normalize::every_line_has_line_numbers(&replace) || replace.trim().is_empty());

        if numbered {
            if start_line == 0 {
                if let Some(derived) = normalize::leading_line_number(&search) {
                    start_line = derived;
                }
            }
            search = normalize::strip_line_numbers(&search, false);
            replace = normalize::strip_line_numbers(&replace, false);
        }

        if search == replace {
            failures.push(PatchError::IdenticalContent);
            continue;
        }
        if search.is_empty() {
            failures.push(PatchError::EmptySearch);
            continue;
        }

        let located = match locate::locate(&lines, &search, &replace, start_line, opts) {
            Ok(located) => located,
            Err(e) => {
                warn!(start_line, "block failed to match");
                failures.push(e);
                continue;
            }
        };

        // An aggressive-strip match replaces the working text for the rest
        // of this block's processing.
        if let Some((stripped_search, stripped_replace)) = located.stripped {
            search = stripped_search;
            replace = stripped_replace;
        }

        let search_lines: Vec<&str> = search.split('\n').collect();
        let replace_lines: Vec<&str> = if replace.is_empty() {
            Vec::new()
        } else {
            replace.split('\n').collect()
        };

        let region_id = apply::next_region_id();
        let applied = apply::apply(
            &lines,
            located.index,
            &search_lines,
            &replace_lines,
            &region_id,
            opts.region_hook,
        );

        delta = delta - applied.replaced_len as i64 + replace_lines.len() as i64;
        lines = applied.lines;
        modified_sections.push(region_id);
        applied_count += 1;

        debug!(
            index = located.index,
            score = located.score,
            delta,
            "block applied"
        );
    }

    let line_ending = if uses_crlf { "\r\n" } else { "\n" };
    let success = applied_count > 0;

    Ok(DiffOutcome {
        success,
        content: success.then(|| lines.join(line_ending)),
        applied_count,
        failures,
        modified_sections,
    })
}
