//! `read` tool: file reading in `N|content` form.
//!
//! Emits the same line-number format the diff engine's normalizer strips,
//! so an agent can paste read output straight into a SEARCH block. Engine
//! error messages point the agent back here to refresh stale content.

use std::io::Read as _;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::engine::normalize;
use crate::server::{ContentItem, ToolCallResult, ToolDefinition};

/// Parameters for the read tool.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadParams {
    /// Path to the file to read.
    pub file_path: String,
    /// Starting line number (1-based). Default: 1.
    #[serde(default = "default_offset")]
    pub offset: usize,
    /// Maximum number of lines to return. Default: 2000.
    #[serde(default = "default_limit")]
    pub limit: usize,
}

const fn default_offset() -> usize {
    1
}
const fn default_limit() -> usize {
    2000
}

/// Max bytes to check for binary content detection.
const BINARY_CHECK_BYTES: usize = 8192;

pub fn tool_definition() -> ToolDefinition {
    ToolDefinition {
        name: "read".to_owned(),
        description: "Read a file with line numbers in 'N|content' form, the format apply_diff \
            understands in SEARCH blocks. Supports offset and limit for large files. Detects \
            binary files."
            .to_owned(),
        input_schema: serde_json::json!({
            "type": "object",
            "properties": {
                "filePath": {
                    "type": "string",
                    "description": "Path to the file to read"
                },
                "offset": {
                    "type": "integer",
                    "description": "Starting line number (1-based, default: 1)",
                    "default": 1,
                    "minimum": 1
                },
                "limit": {
                    "type": "integer",
                    "description": "Maximum number of lines to return (default: 2000)",
                    "default": 2000,
                    "minimum": 1
                }
            },
            "required": ["filePath"]
        }),
    }
}

/// Execute the read tool.
pub fn execute(workspace: &Path, arguments: serde_json::Value) -> Result<ToolCallResult> {
    let params: ReadParams =
        serde_json::from_value(arguments).context("invalid read parameters")?;

    let file_path = match super::validate_path(workspace, &params.file_path) {
        Ok(p) => p,
        Err(e) => {
            return Ok(ToolCallResult {
                content: vec![ContentItem {
                    content_type: "text".to_owned(),
                    text: format!("Error: {e}"),
                }],
                is_error: true,
            });
        }
    };

    if !file_path.exists() {
        return Ok(ToolCallResult {
            content: vec![ContentItem {
                content_type: "text".to_owned(),
                text: format!("Error: file not found: {}", file_path.display()),
            }],
            is_error: true,
        });
    }

    // Binary detection: only read the head to check for null bytes, avoiding
    // loading entire large binary files into memory.
    {
        let mut file = std::fs::File::open(&file_path)
            .with_context(|| format!("failed to open {}", file_path.display()))?;
        let mut check_buf = vec![0u8; BINARY_CHECK_BYTES];
        let n = file
            .by_ref()
            .take(BINARY_CHECK_BYTES as u64)
            .read(&mut check_buf)
            .with_context(|| format!("failed to read {}", file_path.display()))?;
        if check_buf[..n].contains(&0) {
            let file_size = file.metadata().map(|m| m.len()).unwrap_or(0);
            return Ok(ToolCallResult {
                content: vec![ContentItem {
                    content_type: "text".to_owned(),
                    text: format!(
                        "Binary file cannot be patched as text: {} ({} bytes)",
                        file_path.display(),
                        file_size,
                    ),
                }],
                is_error: true,
            });
        }
    }

    let raw = std::fs::read_to_string(&file_path)
        .with_context(|| format!("failed to read {}", file_path.display()))?;
    let lines: Vec<&str> = raw.lines().collect();
    let total_lines = lines.len();

    // Apply offset (1-based) and limit.
    let start = params.offset.saturating_sub(1).min(total_lines);
    let end = (start + params.limit).min(total_lines);

    let mut output = if start < end {
        normalize::add_line_numbers(&lines[start..end].join("\n"), start + 1)
    } else {
        String::new()
    };

    if end < total_lines {
        output.push_str(&format!(
            "\n\n... ({} more lines, {} total)\n",
            total_lines - end,
            total_lines
        ));
    }

    Ok(ToolCallResult {
        content: vec![ContentItem {
            content_type: "text".to_owned(),
            text: output,
        }],
        is_error: false,
    })
}
