//! Unified-diff preview of an applied patch, using the `similar` crate.
//!
//! Shown to the caller after a successful apply so it can confirm what
//! actually changed (which may differ from the submitted replacement text
//! after indentation re-anchoring and region marking).

use similar::{Algorithm, TextDiff};

/// Render a unified diff between the buffer before and after the patch.
///
/// Patience produces cleaner hunks for structured text than plain Myers.
#[must_use]
pub fn unified_diff(name: &str, old: &str, new: &str) -> String {
    let diff = TextDiff::configure()
        .algorithm(Algorithm::Patience)
        .diff_lines(old, new);

    diff.unified_diff()
        .header(&format!("a/{name}"), &format!("b/{name}"))
        .to_string()
}
