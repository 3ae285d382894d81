//! Atomic file replacement via [`tempfile::NamedTempFile`].
//!
//! The patched buffer is written to a temp file in the target's directory
//! and renamed over the original, so a crash mid-write never leaves a
//! half-patched file behind.

use std::io::Write;
use std::path::Path;

use anyhow::{Context, Result};

/// Atomically replace `path`'s contents with `content`.
///
/// The temp file lives in the same directory as `path` so the final rename
/// stays on one filesystem and remains atomic.
///
/// # Errors
///
/// Returns an error if the parent directory doesn't exist, writing fails,
/// or the rename fails (e.g., cross-device).
pub fn atomic_write(path: &Path, content: &str) -> Result<()> {
    let parent = path
        .parent()
        .with_context(|| format!("no parent directory for {}", path.display()))?;

    let mut tmp = tempfile::NamedTempFile::new_in(parent)
        .with_context(|| format!("failed to create temp file in {}", parent.display()))?;

    tmp.write_all(content.as_bytes())
        .with_context(|| format!("failed to write temp file for {}", path.display()))?;

    tmp.flush()
        .with_context(|| format!("failed to flush temp file for {}", path.display()))?;

    tmp.persist(path)
        .with_context(|| format!("failed to atomically replace {}", path.display()))?;

    Ok(())
}
