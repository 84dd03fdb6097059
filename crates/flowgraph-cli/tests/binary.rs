//! End-to-end tests running the flowgraph binary

use std::fs;
use std::process::{Command, Output};
use tempfile::tempdir;

fn flowgraph(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_flowgraph"))
        .args(args)
        .env_remove("FLOWGRAPH_LOG_LEVEL")
        .env_remove("FLOWGRAPH_LOG_FORMAT")
        .env_remove("RUST_LOG")
        .output()
        .expect("failed to run flowgraph binary")
}

const DOC: &str = r#"{
    "nodes": [
        {"id": "a", "shape": "flow-chart-rect", "ports": [{"id": "out", "group": "bottom"}]},
        {"id": "b", "shape": "flow-chart-rect", "ports": [{"id": "in", "group": "top"}]}
    ],
    "edges": []
}"#;

#[test]
fn test_shapes_lists_palette() {
    let output = flowgraph(&["shapes"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("Basic nodes"));
    assert!(stdout.contains("decision"));
}

#[test]
fn test_validate_reports_errors() {
    let dir = tempdir().unwrap();
    let good = dir.path().join("good.json");
    let bad = dir.path().join("bad.json");
    fs::write(&good, DOC).unwrap();
    fs::write(&bad, r#"{"nodes": [{"id": "a", "shape": "flow-chart-rect", "parent": "z"}]}"#)
        .unwrap();

    let output = flowgraph(&["validate", "-i", good.to_str().unwrap()]);
    assert!(output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("2 nodes"));

    let output = flowgraph(&["validate", "-i", bad.to_str().unwrap()]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stdout).contains("Dangling reference"));
}

#[test]
fn test_check_connection_exit_status() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("doc.json");
    fs::write(&path, DOC).unwrap();
    let input = path.to_str().unwrap();

    let ok = flowgraph(&["check-connection", "-i", input, "--source", "a:out", "--target", "b:in"]);
    assert!(ok.status.success());

    let refused = flowgraph(&["check-connection", "-i", input, "--source", "a", "--target", "b:in"]);
    assert!(!refused.status.success());
    assert!(String::from_utf8_lossy(&refused.stdout).contains("source has no anchor port"));
}

#[test]
fn test_apply_with_relaxed_config() {
    let dir = tempdir().unwrap();
    let doc = dir.path().join("doc.json");
    let script = dir.path().join("ops.json");
    let config = dir.path().join("editor.json");
    let out = dir.path().join("out.json");
    fs::write(&doc, DOC).unwrap();
    fs::write(&script, r#"[{"op": "connect", "source": "a", "target": "b"}]"#).unwrap();
    fs::write(&config, r#"{"connection": {"require_magnet": false}}"#).unwrap();

    let strict = flowgraph(&[
        "apply",
        "-i",
        doc.to_str().unwrap(),
        "-s",
        script.to_str().unwrap(),
        "-o",
        out.to_str().unwrap(),
    ]);
    assert!(!strict.status.success());

    let relaxed = flowgraph(&[
        "apply",
        "--config",
        config.to_str().unwrap(),
        "-i",
        doc.to_str().unwrap(),
        "-s",
        script.to_str().unwrap(),
        "-o",
        out.to_str().unwrap(),
    ]);
    assert!(relaxed.status.success(), "{}", String::from_utf8_lossy(&relaxed.stderr));
    let written: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&out).unwrap()).unwrap();
    assert_eq!(written["edges"].as_array().unwrap().len(), 1);
}

#[test]
fn test_settings_round_trip() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("settings.json");
    let file = file.to_str().unwrap();

    let output = flowgraph(&["settings", "-f", file, "--set", "zen_mode=true"]);
    assert!(output.status.success());

    let output = flowgraph(&["settings", "-f", file]);
    let shown: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert_eq!(shown["zen_mode"], serde_json::json!(true));
    assert_eq!(shown["open_node_rich_text"], serde_json::json!(true));
}
