// SPDX-License-Identifier: Apache-2.0

//! Drives the installed binary end to end: register a graph file, import
//! it, check the emitted IR.

use std::process::Command;

const GRAPH: &str = r#"# netlist graph dump
netlist "top"
  net "a"
  net "b"
  net "y"
  port "a" input net="a"
  port "b" input net="b"
  port "y" output net="y"
  inst "g0" and
    conn input1 0 "top" "a"
    conn input2 0 "top" "b"
    conn output 0 "top" "y"
end
"#;

#[test]
fn read_then_import_produces_ir_text() {
    let dir = tempfile::tempdir().unwrap();
    let graph_path = dir.path().join("top.graph");
    let session_path = dir.path().join("session.json");
    std::fs::write(&graph_path, GRAPH).unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_nl2ir"))
        .arg("--session")
        .arg(&session_path)
        .arg("read")
        .arg("sv2009")
        .arg(&graph_path)
        .status()
        .unwrap();
    assert!(status.success());

    let output = Command::new(env!("CARGO_BIN_EXE_nl2ir"))
        .arg("--session")
        .arg(&session_path)
        .arg("import")
        .arg("top")
        .output()
        .unwrap();
    assert!(output.status.success());
    let text = String::from_utf8(output.stdout).unwrap();
    assert!(text.contains("module top"), "IR output: {}", text);
    assert!(text.contains("$and"), "IR output: {}", text);
}

#[test]
fn import_without_registered_files_fails() {
    let dir = tempfile::tempdir().unwrap();
    let session_path = dir.path().join("session.json");
    let output = Command::new(env!("CARGO_BIN_EXE_nl2ir"))
        .arg("--session")
        .arg(&session_path)
        .arg("import")
        .arg("top")
        .output()
        .unwrap();
    assert!(!output.status.success());
}

#[test]
fn unknown_top_module_aborts_nonzero() {
    let dir = tempfile::tempdir().unwrap();
    let graph_path = dir.path().join("top.graph");
    let session_path = dir.path().join("session.json");
    std::fs::write(&graph_path, GRAPH).unwrap();

    let status = Command::new(env!("CARGO_BIN_EXE_nl2ir"))
        .arg("--session")
        .arg(&session_path)
        .arg("read")
        .arg("sv")
        .arg(&graph_path)
        .status()
        .unwrap();
    assert!(status.success());

    let output = Command::new(env!("CARGO_BIN_EXE_nl2ir"))
        .arg("--session")
        .arg(&session_path)
        .arg("import")
        .arg("nonexistent")
        .output()
        .unwrap();
    assert!(!output.status.success());
}
