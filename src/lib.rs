//! `sr-patch`: fuzzy SEARCH/REPLACE patch engine with an MCP tool surface.
//!
//! The core is [`engine::apply_diff`]: given an original text buffer and a
//! set of SEARCH/REPLACE blocks (each optionally annotated with a
//! `:start_line:`), it locates the intended target region even when line
//! numbers or whitespace have drifted, and applies the replacement while
//! preserving indentation style.
//!
//! The engine is exposed to agents over the Model Context Protocol
//! (JSON-RPC 2.0, newline-delimited stdio):
//!
//! - `apply_diff`: apply one or more SEARCH/REPLACE blocks to a file
//! - `read`: file reading in the `N|content` form the engine understands
//!
//! # Architecture
//!
//! ```text
//! stdin (JSON-RPC) → McpServer → ToolRouter → apply_diff / read
//!                                     ↓
//!                               engine::apply_diff
//! stdout (JSON-RPC) ←─────────────────┘
//! ```

pub mod engine;
pub mod error;
pub mod server;
pub mod tools;
pub mod util;

pub use engine::{DiffOptions, DiffOutcome, apply_diff};
pub use error::{PatchError, PatchResult};
pub use server::run_mcp_server;
