//! SEARCH/REPLACE block parsing.
//!
//! Two passes over the raw diff text:
//! 1. [`validate_markers`] counts the three marker families and rejects
//!    structurally unbalanced input before anything is extracted.
//! 2. [`parse_blocks`] runs a line-by-line tokenizer that classifies each
//!    line (SEARCH open / divider / REPLACE close / directive / content) and
//!    assembles [`DiffBlock`]s. An explicit state machine instead of one big
//!    backtracking pattern keeps the grammar auditable and removes
//!    catastrophic-backtracking risk.
//!
//! Grammar per block (7- and 8-character marker variants both accepted):
//!
//! ```text
//! <<<<<<< SEARCH
//! :start_line:<N>      (optional)
//! :end_line:<N>        (optional, accepted but ignored)
//! -------              (optional)
//! <search lines>
//! =======
//! <replace lines>
//! >>>>>>> REPLACE
//! ```
//!
//! A marker preceded by a backslash is body content, not structure; the
//! normalizer later rewrites it to its literal form.

use crate::error::{PatchError, PatchResult};

/// One SEARCH/REPLACE unit extracted from a diff submission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiffBlock {
    /// 1-based line the caller believes the search text begins at.
    /// 0 means unspecified (forces a full-buffer scan).
    pub start_line: usize,
    /// Raw search text (markers still escaped, line numbers still present).
    pub search: String,
    /// Raw replacement text.
    pub replace: String,
}

/// Count marker families and reject unbalanced diffs.
///
/// # Errors
///
/// `MalformedDiff` when no SEARCH marker is found, no REPLACE marker is
/// found, the SEARCH/REPLACE counts differ, or the divider count differs
/// from the SEARCH count.
pub(crate) fn validate_markers(diff: &str) -> PatchResult<()> {
    let mut search_count = 0usize;
    let mut replace_count = 0usize;
    let mut divider_count = 0usize;

    for line in diff.split('\n') {
        if line.starts_with("<<<<<<< SEARCH") || line.starts_with("<<<<<<<< SEARCH") {
            search_count += 1;
        } else if line.starts_with(">>>>>>> REPLACE") || line.starts_with(">>>>>>>> REPLACE") {
            replace_count += 1;
        } else if line.starts_with("=======") {
            divider_count += 1;
        }
    }

    if search_count == 0 {
        return Err(PatchError::MalformedDiff {
            reason: "no SEARCH marker found".to_owned(),
        });
    }
    if replace_count == 0 {
        return Err(PatchError::MalformedDiff {
            reason: "no REPLACE marker found".to_owned(),
        });
    }
    if search_count != replace_count {
        return Err(PatchError::MalformedDiff {
            reason: format!(
                "mismatched SEARCH/REPLACE markers: {search_count} SEARCH vs {replace_count} REPLACE"
            ),
        });
    }
    if divider_count != search_count {
        return Err(PatchError::MalformedDiff {
            reason: format!("mismatched dividers: expected {search_count}, found {divider_count}"),
        });
    }

    Ok(())
}

/// Tokenizer state for one pass over the diff lines.
#[derive(Clone, Copy)]
enum State {
    /// Outside any block; waiting for a SEARCH open marker.
    Scanning,
    /// Inside the search section. `phase` tracks directive consumption:
    /// 0 = may take `:start_line:`, 1 = may take `:end_line:`,
    /// 2 = may take the `-------` line, 3 = body content has begun.
    Search { phase: u8 },
    /// Inside the replacement section, after the `=======` divider.
    Replace,
}

/// Extract all complete SEARCH/REPLACE blocks from the diff text.
///
/// Call [`validate_markers`] first; this function assumes counts are sane
/// and reports `InvalidDiffFormat` only when no complete block survives
/// tokenization (e.g. a marker line carries trailing junk, or a divider is
/// misplaced despite correct global counts).
pub(crate) fn parse_blocks(diff: &str) -> PatchResult<Vec<DiffBlock>> {
    let mut blocks = Vec::new();

    let mut state = State::Scanning;
    let mut start_line = 0usize;
    let mut search_lines: Vec<&str> = Vec::new();
    let mut replace_lines: Vec<&str> = Vec::new();

    for line in diff.split('\n') {
        match state {
            State::Scanning => {
                if is_search_open(line) {
                    start_line = 0;
                    search_lines.clear();
                    replace_lines.clear();
                    state = State::Search { phase: 0 };
                }
                // Anything between blocks is ignored.
            }
            State::Search { phase } => {
                if phase < 3 {
                    if phase == 0 {
                        if let Some(n) = directive_value(line, ":start_line:") {
                            start_line = n;
                            state = State::Search { phase: 1 };
                            continue;
                        }
                    }
                    if phase <= 1 && directive_value(line, ":end_line:").is_some() {
                        // Accepted for compatibility, not used by matching.
                        state = State::Search { phase: 2 };
                        continue;
                    }
                    if is_dash_divider(line) {
                        state = State::Search { phase: 3 };
                        continue;
                    }
                }
                if is_block_divider(line) {
                    state = State::Replace;
                } else {
                    search_lines.push(line);
                    state = State::Search { phase: 3 };
                }
            }
            State::Replace => {
                if is_replace_close(line) {
                    blocks.push(DiffBlock {
                        start_line,
                        search: search_lines.join("\n"),
                        replace: replace_lines.join("\n"),
                    });
                    state = State::Scanning;
                } else {
                    replace_lines.push(line);
                }
            }
        }
    }

    if blocks.is_empty() {
        return Err(PatchError::InvalidDiffFormat {
            reason: "no complete SEARCH/REPLACE block could be extracted".to_owned(),
        });
    }

    Ok(blocks)
}

/// `<<<<<<< SEARCH` or `<<<<<<<< SEARCH`, optional trailing `>`, then only
/// whitespace. A leading backslash makes the line content, never structure.
fn is_search_open(line: &str) -> bool {
    let Some(rest) = line
        .strip_prefix("<<<<<<<< SEARCH")
        .or_else(|| line.strip_prefix("<<<<<<< SEARCH"))
    else {
        return false;
    };
    let rest = rest.strip_prefix('>').unwrap_or(rest);
    rest.trim().is_empty()
}

/// `>>>>>>> REPLACE` or `>>>>>>>> REPLACE`, optional trailing `<`.
fn is_replace_close(line: &str) -> bool {
    let Some(rest) = line
        .strip_prefix(">>>>>>>> REPLACE")
        .or_else(|| line.strip_prefix(">>>>>>> REPLACE"))
    else {
        return false;
    };
    let rest = rest.strip_prefix('<').unwrap_or(rest);
    rest.trim().is_empty()
}

/// Exactly `=======` plus optional trailing whitespace. Eight or more equals
/// signs are not a divider here (they still count in validation, which is how
/// an unescaped `========` body line surfaces as a count mismatch).
fn is_block_divider(line: &str) -> bool {
    line.trim_end() == "======="
}

/// The optional `-------` line terminating the directive section.
fn is_dash_divider(line: &str) -> bool {
    line.trim_end() == "-------"
}

/// Parse `:start_line:<N>`-style directives. The prefix must sit at the very
/// start of the line; the value may carry surrounding whitespace but must be
/// pure digits.
fn directive_value(line: &str, directive: &str) -> Option<usize> {
    let value = line.strip_prefix(directive)?.trim();
    if value.is_empty() || !value.bytes().all(|b| b.is_ascii_digit()) {
        return None;
    }
    value.parse().ok()
}

#[cfg(test)]
mod tests {
    use super::*;

    const CANONICAL: &str = "<<<<<<< SEARCH\n:start_line:2\n-------\nold line\n=======\nnew line\n>>>>>>> REPLACE";

    #[test]
    fn test_validate_canonical() {
        assert!(validate_markers(CANONICAL).is_ok());
    }

    #[test]
    fn test_validate_no_search() {
        let err = validate_markers("=======\n>>>>>>> REPLACE").expect_err("should fail");
        assert!(err.to_string().contains("no SEARCH marker"));
    }

    #[test]
    fn test_validate_no_replace() {
        let err = validate_markers("<<<<<<< SEARCH\nfoo\n=======\nbar").expect_err("should fail");
        assert!(err.to_string().contains("no REPLACE marker"));
    }

    #[test]
    fn test_validate_count_mismatch() {
        let diff = "<<<<<<< SEARCH\na\n=======\nb\n>>>>>>> REPLACE\n<<<<<<< SEARCH\nc\n=======\nd";
        let err = validate_markers(diff).expect_err("should fail");
        assert!(err.to_string().contains("2 SEARCH vs 1 REPLACE"));
    }

    #[test]
    fn test_validate_divider_mismatch() {
        let diff = "<<<<<<< SEARCH\na\n>>>>>>> REPLACE";
        let err = validate_markers(diff).expect_err("should fail");
        assert!(err.to_string().contains("dividers"));
    }

    #[test]
    fn test_parse_canonical() {
        let blocks = parse_blocks(CANONICAL).expect("should parse");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].start_line, 2);
        assert_eq!(blocks[0].search, "old line");
        assert_eq!(blocks[0].replace, "new line");
    }

    #[test]
    fn test_parse_without_directives() {
        let diff = "<<<<<<< SEARCH\nold\n=======\nnew\n>>>>>>> REPLACE";
        let blocks = parse_blocks(diff).expect("should parse");
        assert_eq!(blocks[0].start_line, 0);
        assert_eq!(blocks[0].search, "old");
    }

    #[test]
    fn test_parse_end_line_accepted_and_ignored() {
        let diff =
            "<<<<<<< SEARCH\n:start_line:3\n:end_line:5\n-------\nold\n=======\nnew\n>>>>>>> REPLACE";
        let blocks = parse_blocks(diff).expect("should parse");
        assert_eq!(blocks[0].start_line, 3);
        assert_eq!(blocks[0].search, "old");
    }

    #[test]
    fn test_parse_eight_char_markers() {
        let diff = "<<<<<<<< SEARCH\nold\n=======\nnew\n>>>>>>>> REPLACE";
        let blocks = parse_blocks(diff).expect("should parse");
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn test_parse_trailing_arrow_tolerated() {
        let diff = "<<<<<<< SEARCH>\nold\n=======\nnew\n>>>>>>> REPLACE<";
        let blocks = parse_blocks(diff).expect("should parse");
        assert_eq!(blocks.len(), 1);
    }

    #[test]
    fn test_parse_multiple_blocks_with_prose_between() {
        let diff = "intro text\n<<<<<<< SEARCH\n:start_line:1\n-------\na\n=======\nb\n>>>>>>> REPLACE\nsome prose\n<<<<<<< SEARCH\n:start_line:9\n-------\nc\n=======\nd\n>>>>>>> REPLACE\ntrailing";
        let blocks = parse_blocks(diff).expect("should parse");
        assert_eq!(blocks.len(), 2);
        assert_eq!(blocks[1].start_line, 9);
        assert_eq!(blocks[1].search, "c");
    }

    #[test]
    fn test_parse_escaped_markers_are_content() {
        let diff = "<<<<<<< SEARCH\n\\=======\n\\>>>>>>> REPLACE line\n=======\n\\<<<<<<< SEARCH line\n>>>>>>> REPLACE";
        let blocks = parse_blocks(diff).expect("should parse");
        assert_eq!(blocks.len(), 1);
        assert_eq!(blocks[0].search, "\\=======\n\\>>>>>>> REPLACE line");
        assert_eq!(blocks[0].replace, "\\<<<<<<< SEARCH line");
    }

    #[test]
    fn test_parse_directive_after_content_is_content() {
        let diff = "<<<<<<< SEARCH\nfoo\n:start_line:5\n=======\nbar\n>>>>>>> REPLACE";
        let blocks = parse_blocks(diff).expect("should parse");
        assert_eq!(blocks[0].start_line, 0);
        assert_eq!(blocks[0].search, "foo\n:start_line:5");
    }

    #[test]
    fn test_parse_empty_replace_section() {
        let diff = "<<<<<<< SEARCH\n:start_line:1\n-------\ngone\n=======\n>>>>>>> REPLACE";
        let blocks = parse_blocks(diff).expect("should parse");
        assert_eq!(blocks[0].replace, "");
    }

    #[test]
    fn test_parse_counts_ok_but_marker_line_has_junk() {
        // Counting sees the SEARCH prefix, but the tokenizer rejects the
        // trailing junk, so no block opens and extraction fails.
        let diff = "<<<<<<< SEARCH blah\nold\n=======\nnew\n>>>>>>> REPLACE";
        assert!(validate_markers(diff).is_ok());
        let err = parse_blocks(diff).expect_err("should fail");
        assert!(matches!(err, PatchError::InvalidDiffFormat { .. }));
        assert!(err.to_string().contains("Expected Format"));
    }

    #[test]
    fn test_parse_unterminated_block_discarded() {
        let diff = "<<<<<<< SEARCH\na\n=======\nb\n>>>>>>> REPLACE\n<<<<<<< SEARCH\ndangling";
        let blocks = parse_blocks(diff).expect("should parse");
        assert_eq!(blocks.len(), 1);
    }
}
