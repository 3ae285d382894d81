//! MCP protocol integration tests.
//!
//! Tests the JSON-RPC 2.0 types, the tool registry, and the two tools
//! end-to-end against real files in a tempdir.

use serde_json::json;

#[test]
fn test_json_rpc_request_parsing() {
    let req_json = json!({
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {
            "protocolVersion": "2025-06-18",
            "capabilities": {},
            "clientInfo": {
                "name": "test-client",
                "version": "0.1.0"
            }
        }
    });

    let req: sr_patch::server::JsonRpcRequest =
        serde_json::from_value(req_json).expect("should parse initialize request");

    assert_eq!(req.method, "initialize");
    assert_eq!(req.id, Some(json!(1)));
}

#[test]
fn test_json_rpc_response_serialization() {
    let resp = sr_patch::server::JsonRpcResponse {
        jsonrpc: "2.0".to_owned(),
        id: Some(json!(1)),
        result: Some(json!({"protocolVersion": "2025-06-18"})),
        error: None,
    };

    let json_str = serde_json::to_string(&resp).expect("should serialize");
    assert!(json_str.contains("2025-06-18"));
    assert!(!json_str.contains("error")); // error is None, should be skipped
}

#[test]
fn test_json_rpc_error_response() {
    let resp = sr_patch::server::JsonRpcResponse {
        jsonrpc: "2.0".to_owned(),
        id: Some(json!(2)),
        result: None,
        error: Some(sr_patch::server::JsonRpcError {
            code: -32601,
            message: "method not found".to_owned(),
            data: None,
        }),
    };

    let json_str = serde_json::to_string(&resp).expect("should serialize");
    assert!(json_str.contains("-32601"));
    assert!(json_str.contains("method not found"));
    assert!(!json_str.contains("result")); // result is None, should be skipped
}

#[test]
fn test_tool_definitions_complete() {
    let router = sr_patch::tools::ToolRouter::new(std::path::PathBuf::from("/tmp"));

    let tools = router.list_tools();
    assert_eq!(tools.len(), 2);

    let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
    assert!(names.contains(&"apply_diff"));
    assert!(names.contains(&"read"));

    // Verify each tool has a description and input_schema.
    for tool in &tools {
        assert!(
            !tool.description.is_empty(),
            "tool {} missing description",
            tool.name
        );
        assert!(
            tool.input_schema.is_object(),
            "tool {} missing input_schema",
            tool.name
        );
    }
}

#[test]
fn test_tool_call_unknown() {
    let router = sr_patch::tools::ToolRouter::new(std::path::PathBuf::from("/tmp"));

    let result = router
        .call_tool("nonexistent_tool", json!({}))
        .expect("should not error");

    assert!(result.is_error);
    assert!(result.content[0].text.contains("Unknown tool"));
}

#[test]
fn test_tool_call_read_nonexistent() {
    let router = sr_patch::tools::ToolRouter::new(std::path::PathBuf::from("/tmp"));

    let result = router
        .call_tool(
            "read",
            json!({
                "filePath": "/tmp/nonexistent_sr_patch_test_file_12345.txt"
            }),
        )
        .expect("should not error");

    assert!(result.is_error);
    assert!(result.content[0].text.contains("not found"));
}

#[test]
fn test_tool_call_read_numbered_output() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file_path = dir.path().join("test_read.txt");
    std::fs::write(&file_path, "alpha\nbeta\ngamma\n").expect("write");

    let router = sr_patch::tools::ToolRouter::new(dir.path().to_path_buf());

    let result = router
        .call_tool(
            "read",
            json!({
                "filePath": file_path.to_str().expect("path")
            }),
        )
        .expect("read should succeed");

    assert!(!result.is_error);
    assert_eq!(result.content[0].text, "1|alpha\n2|beta\n3|gamma");
}

#[test]
fn test_tool_call_read_offset_and_limit() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file_path = dir.path().join("test_read_window.txt");
    let body: Vec<String> = (1..=10).map(|i| format!("row {i}")).collect();
    std::fs::write(&file_path, body.join("\n")).expect("write");

    let router = sr_patch::tools::ToolRouter::new(dir.path().to_path_buf());

    let result = router
        .call_tool(
            "read",
            json!({
                "filePath": file_path.to_str().expect("path"),
                "offset": 4,
                "limit": 2
            }),
        )
        .expect("read should succeed");

    assert!(!result.is_error);
    assert!(result.content[0].text.starts_with("4|row 4\n5|row 5"));
    assert!(result.content[0].text.contains("5 more lines"));
    assert!(result.content[0].text.contains("10 total"));
}

#[test]
fn test_tool_call_apply_diff_patches_file() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file_path = dir.path().join("test_patch.txt");
    std::fs::write(&file_path, "foo\nbar\nbaz\n").expect("write");

    let router = sr_patch::tools::ToolRouter::new(dir.path().to_path_buf());

    let result = router
        .call_tool(
            "apply_diff",
            json!({
                "filePath": file_path.to_str().expect("path"),
                "diff": "<<<<<<< SEARCH\n:start_line:2\n-------\nbar\n=======\nqux\n>>>>>>> REPLACE"
            }),
        )
        .expect("apply_diff should succeed");

    assert!(!result.is_error);

    // First content item is the JSON summary.
    let summary: serde_json::Value =
        serde_json::from_str(&result.content[0].text).expect("summary should be JSON");
    assert_eq!(summary["success"], json!(true));
    assert_eq!(summary["appliedCount"], json!(1));

    // Second is a unified-diff preview.
    assert!(result.content[1].text.contains("-bar"));
    assert!(result.content[1].text.contains("+qux"));

    // Verify the file was actually changed.
    let content = std::fs::read_to_string(&file_path).expect("read");
    assert!(content.contains("qux"));
    assert!(!content.contains("bar"));
}

#[test]
fn test_tool_call_apply_diff_dry_run() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file_path = dir.path().join("test_dry_run.txt");
    std::fs::write(&file_path, "foo\nbar\nbaz\n").expect("write");

    let router = sr_patch::tools::ToolRouter::new(dir.path().to_path_buf());

    let result = router
        .call_tool(
            "apply_diff",
            json!({
                "filePath": file_path.to_str().expect("path"),
                "diff": "<<<<<<< SEARCH\n:start_line:2\n-------\nbar\n=======\nqux\n>>>>>>> REPLACE",
                "dryRun": true
            }),
        )
        .expect("apply_diff should succeed");

    assert!(!result.is_error);
    assert!(result.content[1].text.contains("+qux"));

    // The file must be untouched.
    let content = std::fs::read_to_string(&file_path).expect("read");
    assert_eq!(content, "foo\nbar\nbaz\n");
}

#[test]
fn test_tool_call_apply_diff_no_match_reports_fail_parts() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file_path = dir.path().join("test_no_match.txt");
    std::fs::write(&file_path, "foo\nbar\nbaz\n").expect("write");

    let router = sr_patch::tools::ToolRouter::new(dir.path().to_path_buf());

    let result = router
        .call_tool(
            "apply_diff",
            json!({
                "filePath": file_path.to_str().expect("path"),
                "diff": "<<<<<<< SEARCH\n:start_line:2\n-------\ncompletely different content\n=======\nqux\n>>>>>>> REPLACE"
            }),
        )
        .expect("apply_diff should succeed");

    assert!(result.is_error);
    let payload: serde_json::Value =
        serde_json::from_str(&result.content[0].text).expect("payload should be JSON");
    assert_eq!(payload["success"], json!(false));
    assert!(
        payload["failParts"][0]["error"]
            .as_str()
            .expect("error string")
            .contains("similar match")
    );

    let content = std::fs::read_to_string(&file_path).expect("read");
    assert_eq!(content, "foo\nbar\nbaz\n");
}

#[test]
fn test_tool_call_apply_diff_malformed() {
    let dir = tempfile::tempdir().expect("tempdir");
    let file_path = dir.path().join("test_malformed.txt");
    std::fs::write(&file_path, "foo\n").expect("write");

    let router = sr_patch::tools::ToolRouter::new(dir.path().to_path_buf());

    let result = router
        .call_tool(
            "apply_diff",
            json!({
                "filePath": file_path.to_str().expect("path"),
                "diff": "this is not a diff"
            }),
        )
        .expect("apply_diff should succeed");

    assert!(result.is_error);
    let payload: serde_json::Value =
        serde_json::from_str(&result.content[0].text).expect("payload should be JSON");
    assert_eq!(payload["success"], json!(false));
}

#[test]
fn test_tool_call_apply_diff_path_escape_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");

    let router = sr_patch::tools::ToolRouter::new(dir.path().to_path_buf());

    let result = router
        .call_tool(
            "apply_diff",
            json!({
                "filePath": "../outside.txt",
                "diff": "<<<<<<< SEARCH\n:start_line:1\n-------\nx\n=======\ny\n>>>>>>> REPLACE"
            }),
        )
        .expect("apply_diff should succeed");

    assert!(result.is_error);
    assert!(result.content[0].text.contains("escapes workspace"));
}
