//! Error types for the sr-patch crate.
//!
//! The taxonomy splits into fatal and per-block errors. Fatal errors
//! ([`PatchError::MalformedDiff`], [`PatchError::InvalidDiffFormat`]) abort the
//! whole call before any mutation. Per-block errors are collected into
//! [`DiffOutcome::failures`](crate::engine::DiffOutcome::failures) and do not
//! stop sibling blocks from applying.
//!
//! Error payloads are deliberately verbose: the caller is typically an
//! autonomous agent that needs scores, thresholds, searched ranges and buffer
//! excerpts embedded in the message to self-correct its next attempt.

use std::path::PathBuf;

/// sr-patch error types.
#[derive(Debug, thiserror::Error)]
pub enum PatchError {
    /// Marker counts do not line up (missing/mismatched SEARCH, REPLACE or
    /// divider markers). Fatal; the whole call aborts.
    #[error("malformed diff: {reason}")]
    MalformedDiff { reason: String },

    /// Marker counts validated but no complete block could be extracted.
    /// Fatal; the whole call aborts.
    #[error(
        "invalid diff format - missing required sections: {reason}\n\n\
         Debug Info:\n\
         - Expected Format: <<<<<<< SEARCH\\n:start_line:N\\n-------\\n[search content]\\n=======\\n[replace content]\\n>>>>>>> REPLACE\n\
         - Tip: make sure each marker is placed on its own line, in order"
    )]
    InvalidDiffFormat { reason: String },

    /// Search and replace content are identical. Per-block, non-fatal.
    #[error(
        "search and replace content are identical - no changes would be made\n\n\
         Debug Info:\n\
         - Search and replace must be different to make changes\n\
         - Use the read tool to verify the content you want to change"
    )]
    IdenticalContent,

    /// Empty search content. Per-block, non-fatal.
    #[error(
        "empty search content is not allowed\n\n\
         Debug Info:\n\
         - Search content cannot be empty\n\
         - For insertions, provide a :start_line: and include existing content to anchor on"
    )]
    EmptySearch,

    /// No candidate line range cleared the similarity threshold.
    /// Per-block, non-fatal; carries full diagnostic context.
    #[error(
        "no sufficiently similar match found{} ({}% similar, needs {}%)\n\n{details}",
        .line_hint,
        (.score * 100.0).floor(),
        (.threshold * 100.0).floor()
    )]
    NoSimilarMatch {
        /// Best similarity achieved across the searched range.
        score: f64,
        /// The threshold that was required.
        threshold: f64,
        /// ` at line: N` when a start line was declared, empty otherwise.
        line_hint: String,
        /// Search range, search content, best candidate and buffer excerpt.
        details: String,
    },

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// I/O error with context.
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl PatchError {
    /// Whether this error aborts the whole apply call (no partial application)
    /// as opposed to failing a single block.
    #[must_use]
    pub const fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::MalformedDiff { .. } | Self::InvalidDiffFormat { .. }
        )
    }
}

/// Convenience result type for sr-patch operations.
pub type PatchResult<T> = Result<T, PatchError>;
