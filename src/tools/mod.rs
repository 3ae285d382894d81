//! Tool router: registers and dispatches MCP tool calls.
//!
//! Each tool is a function that takes JSON arguments and returns a
//! [`ToolCallResult`]. The router maintains the tool registry and
//! provides `list_tools()` / `call_tool()` for the MCP server.

pub mod apply_diff;
pub mod read;

use std::path::{Path, PathBuf};

use anyhow::{Result, bail};
use tracing::debug;

use crate::server::{ContentItem, ToolCallResult, ToolDefinition};

/// Resolve and validate a file path, ensuring it stays within the workspace.
///
/// Rejects null bytes, `..` traversal escapes, and symlinks that resolve outside
/// the workspace boundary. Returns the canonicalized (or safely joined) path.
pub fn validate_path(workspace: &Path, file_path: &str) -> Result<PathBuf> {
    // Reject null bytes (can bypass C-based path APIs).
    if file_path.contains('\0') {
        bail!("path contains null byte");
    }

    let raw_path = if Path::new(file_path).is_absolute() {
        PathBuf::from(file_path)
    } else {
        workspace.join(file_path)
    };

    // Canonicalize workspace first (resolves symlinks like /var → /private/var on macOS).
    let canonical_workspace = workspace
        .canonicalize()
        .unwrap_or_else(|_| workspace.to_path_buf());

    // For existing paths, canonicalize to resolve symlinks and `..`.
    // For non-existing paths, normalize via the deepest existing ancestor.
    let canonical_path = if raw_path.exists() {
        raw_path.canonicalize()?
    } else {
        let mut ancestor = raw_path.clone();
        let mut suffix_parts = Vec::new();
        loop {
            if ancestor.exists() {
                let canon_ancestor = ancestor.canonicalize()?;
                let mut result = canon_ancestor;
                for part in suffix_parts.iter().rev() {
                    result = result.join(part);
                }
                break result;
            }
            if let Some(name) = ancestor.file_name() {
                suffix_parts.push(name.to_os_string());
                if let Some(parent) = ancestor.parent() {
                    ancestor = parent.to_path_buf();
                } else {
                    break raw_path;
                }
            } else {
                break raw_path;
            }
        }
    };

    // Verify the resolved path is within the workspace.
    if !canonical_path.starts_with(&canonical_workspace) {
        bail!("path escapes workspace boundary: {}", file_path);
    }

    Ok(canonical_path)
}

/// Tool router that dispatches MCP tool calls to implementations.
pub struct ToolRouter {
    /// Working directory for file operations.
    workspace: PathBuf,
}

impl ToolRouter {
    /// Create a new tool router.
    #[must_use]
    pub const fn new(workspace: PathBuf) -> Self {
        Self { workspace }
    }

    /// List all available tools with their JSON Schema definitions.
    #[must_use]
    pub fn list_tools(&self) -> Vec<ToolDefinition> {
        vec![apply_diff::tool_definition(), read::tool_definition()]
    }

    /// Call a tool by name with the given JSON arguments.
    ///
    /// # Errors
    ///
    /// Returns an error if the tool name is unknown or the tool execution fails.
    pub fn call_tool(&self, name: &str, arguments: serde_json::Value) -> Result<ToolCallResult> {
        debug!(tool = name, "dispatching tool call");

        match name {
            "apply_diff" => apply_diff::execute(&self.workspace, arguments),
            "read" => read::execute(&self.workspace, arguments),
            _ => {
                let result = ToolCallResult {
                    content: vec![ContentItem {
                        content_type: "text".to_owned(),
                        text: format!("Unknown tool: {name}"),
                    }],
                    is_error: true,
                };
                Ok(result)
            }
        }
    }
}
