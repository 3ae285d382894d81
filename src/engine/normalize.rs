//! Content normalization for extracted block bodies.
//!
//! Two independent concerns:
//! - unescaping backslash-prefixed marker sequences, so literal marker-like
//!   text can appear inside a block body;
//! - detecting and stripping `N|content` line-number prefixes, the format the
//!   `read` tool emits and models tend to echo back.
//!
//! Also hosts the HTML-entity unescape applied to the whole diff text before
//! parsing, since tool-call channels may entity-escape their payloads.

use std::sync::LazyLock;

use regex::Regex;

/// `N|` prefix: optional whitespace, digits, optional whitespace, pipe.
#[allow(clippy::unwrap_used)] // pattern is a checked literal
static LINE_NUMBER_PREFIX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+\s*\|").unwrap());

/// Aggressive variant: also consumes one space after the pipe.
#[allow(clippy::unwrap_used)] // pattern is a checked literal
static LINE_NUMBER_PREFIX_AGGRESSIVE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\s*\d+\s*\|\s?").unwrap());

/// Replace backslash-escaped marker sequences with their literal form.
///
/// Applied to each block's search/replace text after extraction, so the
/// parser never sees these as structural markers.
pub(crate) fn unescape_markers(text: &str) -> String {
    text.replace("\\<<<<<<< ", "<<<<<<< ")
        .replace("\\<<<<<<<< ", "<<<<<<<< ")
        .replace("\\=======", "=======")
        .replace("\\>>>>>>> ", ">>>>>>> ")
        .replace("\\>>>>>>>> ", ">>>>>>>> ")
        .replace("\\-------", "-------")
}

/// Unescape HTML entities the delivery channel may have introduced.
///
/// `&amp;` is handled last so it cannot manufacture new entities.
/// A string that was never escaped passes through unchanged.
#[must_use]
pub fn unescape_html_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_owned();
    }

    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&apos;", "'")
        .replace("&#91;", "[")
        .replace("&#93;", "]")
        .replace("&lsqb;", "[")
        .replace("&rsqb;", "]")
        .replace("&amp;", "&")
}

/// Whether every line of `text` carries an `N|` line-number prefix.
///
/// Blank text never counts as numbered.
pub(crate) fn every_line_has_line_numbers(text: &str) -> bool {
    if text.trim().is_empty() {
        return false;
    }
    text.split('\n').all(|line| LINE_NUMBER_PREFIX.is_match(line))
}

/// Strip the `N|` prefix from every line.
///
/// Standard mode strips exactly through the pipe; aggressive mode also
/// consumes one following space. Aggressive is a last-resort retry only;
/// it can eat a significant leading space on lines that were never numbered
/// with a trailing space.
pub(crate) fn strip_line_numbers(text: &str, aggressive: bool) -> String {
    let re: &Regex = if aggressive {
        &LINE_NUMBER_PREFIX_AGGRESSIVE
    } else {
        &LINE_NUMBER_PREFIX
    };

    text.split('\n')
        .map(|line| re.replace(line, ""))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Parse the leading digit group of the first line of numbered content.
///
/// Used to derive an effective start line when a block arrives in `N|`
/// form without an explicit `:start_line:` directive.
pub(crate) fn leading_line_number(text: &str) -> Option<usize> {
    let first = text.split('\n').next()?;
    let digits: String = first
        .trim_start()
        .chars()
        .take_while(char::is_ascii_digit)
        .collect();
    digits.parse().ok()
}

/// Render `text` in `N|content` form, numbering from `start`.
///
/// Used by diagnostics (best-match excerpts) and by the `read` tool.
#[must_use]
pub fn add_line_numbers(text: &str, start: usize) -> String {
    text.split('\n')
        .enumerate()
        .map(|(i, line)| format!("{}|{line}", start + i))
        .collect::<Vec<_>>()
        .join("\n")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unescape_markers() {
        let body = "\\<<<<<<< SEARCH literal\n\\=======\n\\>>>>>>> REPLACE literal\n\\-------";
        let out = unescape_markers(body);
        assert_eq!(
            out,
            "<<<<<<< SEARCH literal\n=======\n>>>>>>> REPLACE literal\n-------"
        );
    }

    #[test]
    fn test_unescape_markers_noop() {
        let body = "plain text, no escapes";
        assert_eq!(unescape_markers(body), body);
    }

    #[test]
    fn test_unescape_entities() {
        assert_eq!(unescape_html_entities("&lt;div&gt;"), "<div>");
        assert_eq!(unescape_html_entities("&quot;x&quot;"), "\"x\"");
        assert_eq!(unescape_html_entities("&#39;&apos;"), "''");
        assert_eq!(unescape_html_entities("&#91;a&#93;&lsqb;b&rsqb;"), "[a][b]");
        assert_eq!(unescape_html_entities("a &amp;&amp; b"), "a && b");
    }

    #[test]
    fn test_unescape_entities_amp_last() {
        // &amp;lt; must become &lt;, not <.
        assert_eq!(unescape_html_entities("&amp;lt;"), "&lt;");
    }

    #[test]
    fn test_unescape_entities_noop_roundtrip() {
        let never_escaped = "fn main() { println!(\"hi\"); } < > & [ ]";
        assert_eq!(unescape_html_entities(never_escaped), never_escaped);
    }

    #[test]
    fn test_every_line_has_line_numbers() {
        assert!(every_line_has_line_numbers("1|foo\n2|bar"));
        assert!(every_line_has_line_numbers("  10 | foo\n11|bar"));
        assert!(!every_line_has_line_numbers("1|foo\nbar"));
        assert!(!every_line_has_line_numbers(""));
        assert!(!every_line_has_line_numbers("   "));
    }

    #[test]
    fn test_strip_line_numbers_standard() {
        assert_eq!(strip_line_numbers("1|foo\n2| bar", false), "foo\n bar");
        assert_eq!(strip_line_numbers("  3 |baz", false), "baz");
    }

    #[test]
    fn test_strip_line_numbers_aggressive() {
        assert_eq!(strip_line_numbers("1| foo\n2|  bar", true), "foo\n bar");
    }

    #[test]
    fn test_strip_line_numbers_unnumbered_noop() {
        assert_eq!(strip_line_numbers("foo\nbar", false), "foo\nbar");
    }

    #[test]
    fn test_leading_line_number() {
        assert_eq!(leading_line_number("42|content"), Some(42));
        assert_eq!(leading_line_number("  7 | x"), Some(7));
        assert_eq!(leading_line_number("no digits"), None);
    }

    #[test]
    fn test_add_line_numbers() {
        assert_eq!(add_line_numbers("a\nb", 5), "5|a\n6|b");
        assert_eq!(add_line_numbers("only", 1), "1|only");
    }
}
