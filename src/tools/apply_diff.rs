//! `apply_diff` tool: fuzzy SEARCH/REPLACE patching of a file.
//!
//! Thin glue over [`crate::engine::apply_diff`]: reads the target file,
//! runs the engine with the section-marking region hook installed, writes
//! the result back atomically, and returns the JSON result object the
//! calling agent expects, plus a unified-diff preview of what changed.

use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::info;

use crate::engine::{self, DiffOptions};
use crate::server::{ContentItem, ToolCallResult, ToolDefinition};

/// Parameters for the `apply_diff` tool.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ApplyDiffParams {
    /// Path to the file to patch (relative to workspace or absolute).
    pub file_path: String,
    /// One or more SEARCH/REPLACE blocks.
    pub diff: String,
    /// Compute and report the result without writing the file.
    #[serde(default)]
    pub dry_run: bool,
}

/// Return the MCP tool definition for `apply_diff`.
pub fn tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: "apply_diff".to_owned(),
        description: "Apply precise, targeted changes to an existing file using one or more \
            SEARCH/REPLACE blocks. SEARCH content should match the existing content, including \
            whitespace and indentation; small drifts in line numbers or whitespace are corrected \
            by fuzzy matching. Provide multiple blocks in one diff for multiple changes."
            .to_owned(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "filePath": {
                    "type": "string",
                    "description": "Path to the file to patch"
                },
                "diff": {
                    "type": "string",
                    "description": "One or more search/replace blocks defining the changes. \
                        The ':start_line:' indicates the starting line number of the original \
                        content and should always be provided; do not add one for the \
                        replacement content. Each block must follow this format:\n\
                        <<<<<<< SEARCH\n\
                        :start_line:[line_number]\n\
                        -------\n\
                        [exact content to find]\n\
                        =======\n\
                        [new content to replace with]\n\
                        >>>>>>> REPLACE"
                },
                "dryRun": {
                    "type": "boolean",
                    "description": "Report the result without writing the file (default: false)",
                    "default": false
                }
            },
            "required": ["filePath", "diff"]
        }),
    }
}

/// Execute the `apply_diff` tool.
///
/// # Errors
///
/// Returns an error only for I/O or serialization failures; diff-level
/// failures are reported in the result payload with `isError` set.
pub fn execute(workspace: &Path, arguments: serde_json::Value) -> Result<ToolCallResult> {
    let params: ApplyDiffParams =
        serde_json::from_value(arguments).context("invalid apply_diff parameters")?;

    let file_path = match super::validate_path(workspace, &params.file_path) {
        Ok(p) => p,
        Err(e) => return Ok(error_result(&format!("{e}"), Vec::new())),
    };

    if !file_path.exists() {
        return Ok(error_result(
            &format!("file not found: {}", file_path.display()),
            Vec::new(),
        ));
    }

    let original = std::fs::read_to_string(&file_path)
        .with_context(|| format!("failed to read {}", file_path.display()))?;

    let options = DiffOptions {
        region_hook: Some(engine::mark_modified_section),
        ..DiffOptions::default()
    };

    let outcome = match engine::apply_diff(&original, &params.diff, &options) {
        Ok(outcome) => outcome,
        // Fatal: malformed/invalid diff text, nothing was touched.
        Err(e) => return Ok(error_result(&e.to_string(), Vec::new())),
    };

    let fail_parts: Vec<serde_json::Value> = outcome
        .failures
        .iter()
        .map(|f| serde_json::json!({ "success": false, "error": f.to_string() }))
        .collect();

    let Some(content) = outcome.content else {
        return Ok(error_result("failed to apply diff - no blocks applied", fail_parts));
    };

    if params.dry_run {
        info!(path = %file_path.display(), applied = outcome.applied_count, "dry run, not writing");
    } else {
        crate::util::atomic::atomic_write(&file_path, &content)?;
    }

    let summary = serde_json::json!({
        "success": true,
        "appliedCount": outcome.applied_count,
        "modifiedSections": outcome.modified_sections,
        "failParts": fail_parts,
    });

    let preview = engine::preview::unified_diff(
        &file_path.display().to_string(),
        &original,
        &content,
    );

    Ok(ToolCallResult {
        content: vec![
            ContentItem {
                content_type: "text".to_owned(),
                text: summary.to_string(),
            },
            ContentItem {
                content_type: "text".to_owned(),
                text: preview,
            },
        ],
        is_error: false,
    })
}

/// Build the failure payload shape the calling agent expects.
fn error_result(error: &str, fail_parts: Vec<serde_json::Value>) -> ToolCallResult {
    let mut payload = serde_json::json!({
        "success": false,
        "error": error,
    });
    if !fail_parts.is_empty() {
        payload["failParts"] = serde_json::Value::Array(fail_parts);
    }
    ToolCallResult {
        content: vec![ContentItem {
            content_type: "text".to_owned(),
            text: payload.to_string(),
        }],
        is_error: true,
    }
}
