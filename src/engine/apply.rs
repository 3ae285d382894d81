//! Applying a replacement to a located line range.
//!
//! Replacement lines keep their indentation structure *relative to the first
//! search line*, re-anchored onto the indentation actually found in the
//! buffer. The buffer's real indent wins over whatever the search block
//! assumed, so a block matched one nesting level deeper than the model
//! thought still lands correctly indented.
//!
//! The first replacement line of each applied block is additionally offered
//! to a pluggable [`RegionHook`] so owning surfaces can tag changed regions;
//! [`mark_modified_section`] is the stock hook for HTML `<section>` content.

use std::sync::LazyLock;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use regex::Regex;

/// Hook invoked with the first line of each applied replacement block.
///
/// Returns `Some(rewritten)` to substitute the line, `None` to leave it
/// unchanged. The default (no hook) is identity.
pub type RegionHook = fn(region_id: &str, line: &str) -> Option<String>;

/// Opening `<section ...>` tag, first occurrence only.
#[allow(clippy::unwrap_used)] // pattern is a checked literal
static SECTION_OPEN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<section([^>]*)>").unwrap());

static REGION_SEQ: AtomicU64 = AtomicU64::new(0);

/// Result of splicing one replacement into the buffer.
pub(crate) struct Applied {
    /// The new buffer.
    pub lines: Vec<String>,
    /// How many original lines were replaced (clamped at the buffer end),
    /// for the caller's delta bookkeeping.
    pub replaced_len: usize,
}

/// Generate an opaque region id for one applied block.
pub(crate) fn next_region_id() -> String {
    let millis = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis());
    let seq = REGION_SEQ.fetch_add(1, Ordering::Relaxed);
    format!("modified-{millis}-{seq}")
}

/// Replace `search_lines.len()` lines at `match_index` with
/// indentation-adjusted `replace_lines`.
///
/// All lines outside the replaced range are carried over untouched.
pub(crate) fn apply(
    lines: &[String],
    match_index: usize,
    search_lines: &[&str],
    replace_lines: &[&str],
    region_id: &str,
    hook: Option<RegionHook>,
) -> Applied {
    let end = (match_index + search_lines.len()).min(lines.len());
    let replaced_len = end - match_index;

    let original_indent = lines
        .get(match_index)
        .map_or("", |line| leading_indent(line));
    let search_base_indent = search_lines.first().map_or("", |line| leading_indent(line));

    let indented: Vec<String> = replace_lines
        .iter()
        .enumerate()
        .map(|(i, line)| {
            let mut processed = reindent(line, original_indent, search_base_indent);
            if i == 0 {
                if let Some(hook) = hook {
                    if let Some(rewritten) = hook(region_id, &processed) {
                        processed = rewritten;
                    }
                }
            }
            processed
        })
        .collect();

    let mut out = Vec::with_capacity(lines.len() - replaced_len + indented.len());
    out.extend_from_slice(&lines[..match_index]);
    out.extend(indented);
    out.extend_from_slice(&lines[end..]);

    Applied {
        lines: out,
        replaced_len,
    }
}

/// Re-anchor one replacement line's indentation.
///
/// `relative = own indent − search base indent`. Negative shortens the
/// matched indent (floor at zero); non-negative appends the excess beyond
/// the base level onto the matched indent.
fn reindent(line: &str, original_indent: &str, search_base_indent: &str) -> String {
    let current_indent = leading_indent(line);
    let base_len = search_base_indent.len();

    let final_indent = if current_indent.len() < base_len {
        let cut = base_len - current_indent.len();
        let keep = original_indent.len().saturating_sub(cut);
        original_indent[..keep].to_owned()
    } else {
        format!("{original_indent}{}", &current_indent[base_len..])
    };

    format!("{final_indent}{}", line.trim())
}

/// Leading run of spaces and tabs.
fn leading_indent(line: &str) -> &str {
    let content_start = line.len() - line.trim_start_matches([' ', '\t']).len();
    &line[..content_start]
}

/// Stock region hook: inject modified-region attributes into an opening
/// `<section>` tag so the owning UI can highlight changed regions.
#[must_use]
pub fn mark_modified_section(region_id: &str, line: &str) -> Option<String> {
    if !SECTION_OPEN.is_match(line) {
        return None;
    }
    let rewritten = SECTION_OPEN.replace(line, |caps: &regex::Captures<'_>| {
        format!(
            "<section{} data-sandbox-modified=\"true\" data-element-id=\"{region_id}\">",
            &caps[1]
        )
    });
    Some(rewritten.into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(lines: &[&str]) -> Vec<String> {
        lines.iter().map(|&l| l.to_owned()).collect()
    }

    #[test]
    fn test_apply_same_indent() {
        let lines = buffer(&["foo", "bar", "baz"]);
        let applied = apply(&lines, 1, &["bar"], &["qux"], "id", None);
        assert_eq!(applied.lines, vec!["foo", "qux", "baz"]);
        assert_eq!(applied.replaced_len, 1);
    }

    #[test]
    fn test_apply_preserves_relative_indent() {
        let lines = buffer(&["  if (x) {", "    doThing();", "  }"]);
        let applied = apply(
            &lines,
            1,
            &["    doThing();"],
            &["      doOtherThing();", "      second();"],
            "id",
            None,
        );
        // Replacement is 2 deeper than its 4-space base; anchored onto the
        // matched line's 4-space indent that makes 6.
        assert_eq!(
            applied.lines,
            vec!["  if (x) {", "      doOtherThing();", "      second();", "  }"]
        );
    }

    #[test]
    fn test_apply_reanchors_to_buffer_indent() {
        // Search assumed no indent; buffer has 4 spaces. Replacement keeps
        // its own relative structure on top of the buffer's real indent.
        let lines = buffer(&["    value = 1"]);
        let applied = apply(&lines, 0, &["value = 1"], &["value = 2", "  extra()"], "id", None);
        assert_eq!(applied.lines, vec!["    value = 2", "      extra()"]);
    }

    #[test]
    fn test_apply_dedents_below_anchor() {
        // Replacement line is 2 shallower than the search base; the matched
        // indent is shortened by the same amount.
        let lines = buffer(&["        inner();"]);
        let applied = apply(&lines, 0, &["    inner();"], &["  outer();"], "id", None);
        assert_eq!(applied.lines, vec!["      outer();"]);
    }

    #[test]
    fn test_apply_dedent_floors_at_zero() {
        let lines = buffer(&[" x"]);
        let applied = apply(&lines, 0, &["      x"], &["y"], "id", None);
        assert_eq!(applied.lines, vec!["y"]);
    }

    #[test]
    fn test_apply_deletion() {
        let lines = buffer(&["keep", "drop me", "keep too"]);
        let applied = apply(&lines, 1, &["drop me"], &[], "id", None);
        assert_eq!(applied.lines, vec!["keep", "keep too"]);
    }

    #[test]
    fn test_apply_hook_on_first_line_only() {
        fn shout(_id: &str, line: &str) -> Option<String> {
            Some(format!("{line}!"))
        }
        let lines = buffer(&["a", "b"]);
        let applied = apply(&lines, 0, &["a"], &["x", "y"], "id", Some(shout));
        assert_eq!(applied.lines, vec!["x!", "y", "b"]);
    }

    #[test]
    fn test_mark_modified_section() {
        let line = "<section class=\"intro\">";
        let rewritten = mark_modified_section("modified-1-2", line).expect("should rewrite");
        assert_eq!(
            rewritten,
            "<section class=\"intro\" data-sandbox-modified=\"true\" data-element-id=\"modified-1-2\">"
        );
    }

    #[test]
    fn test_mark_modified_section_case_insensitive() {
        let rewritten = mark_modified_section("id", "<SECTION>").expect("should rewrite");
        assert!(rewritten.contains("data-element-id=\"id\""));
    }

    #[test]
    fn test_mark_modified_section_ignores_other_tags() {
        assert!(mark_modified_section("id", "<div class=\"x\">").is_none());
    }

    #[test]
    fn test_region_ids_unique() {
        let a = next_region_id();
        let b = next_region_id();
        assert_ne!(a, b);
        assert!(a.starts_with("modified-"));
    }
}
