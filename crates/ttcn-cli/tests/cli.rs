use serde_json::Value;
use std::process::Command;

fn workspace_root() -> String {
    format!("{}/../..", env!("CARGO_MANIFEST_DIR"))
}

fn ttcn(args: &[&str]) -> std::process::Output {
    Command::new(env!("CARGO_BIN_EXE_ttcn"))
        .args(args)
        .current_dir(workspace_root())
        .env("RUST_LOG", "warn")
        .output()
        .expect("failed to execute ttcn")
}

#[test]
fn check_json_reports_unreachable_guard() {
    let output = ttcn(&["check", "samples/unreachable_else.ttcn", "--format", "json"]);
    assert_eq!(
        output.status.code(),
        Some(0),
        "stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    let report: Value = serde_json::from_slice(&output.stdout).expect("check output should be JSON");
    assert_eq!(report["schema_version"], 1);
    assert_eq!(report["module"], "UnreachableElse");
    assert_eq!(report["errors"], 0);
    assert_eq!(report["warnings"], 1);
    assert_eq!(report["issues"][0]["code"], "ttcn::check::unreachable_after_else");
}

#[test]
fn after_else_can_be_promoted_to_an_error() {
    let output = ttcn(&[
        "check",
        "samples/unreachable_else.ttcn",
        "--after-else",
        "error",
        "--format",
        "json",
    ]);
    assert_eq!(output.status.code(), Some(1));
    let report: Value = serde_json::from_slice(&output.stdout).expect("check output should be JSON");
    assert_eq!(report["errors"], 1);
    assert_eq!(report["issues"][0]["severity"], "error");
}

#[test]
fn codegen_prints_rust_to_stdout() {
    let output = ttcn(&["codegen", "samples/alt_basic.ttcn"]);
    assert!(
        output.status.success(),
        "stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    let code = String::from_utf8_lossy(&output.stdout);
    assert!(code.contains("// Generated from TTCN-3 module: AltBasic"));
    assert!(code.contains("\"alt_basic.ttcn\", 22"));
}

#[test]
fn codegen_writes_into_the_output_directory() {
    let dir = std::env::temp_dir().join(format!("ttcn_codegen_{}", std::process::id()));
    let output = ttcn(&[
        "codegen",
        "samples/interleave.ttcn",
        "--output",
        dir.to_str().unwrap(),
    ]);
    let written = std::fs::read_to_string(dir.join("interleave.rs"));
    let _ = std::fs::remove_dir_all(&dir);

    assert!(
        output.status.success(),
        "stderr={}",
        String::from_utf8_lossy(&output.stderr)
    );
    assert!(written.expect("generated file").contains("'il_0: loop {"));
}

#[test]
fn codegen_refuses_modules_with_errors() {
    let dir = std::env::temp_dir().join(format!("ttcn_bad_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("bad.ttcn");
    std::fs::write(&path, "module Bad { function f() { repeat; } }").unwrap();

    let output = ttcn(&["codegen", path.to_str().unwrap()]);
    let _ = std::fs::remove_dir_all(&dir);

    assert!(!output.status.success());
    assert!(output.stdout.is_empty());
    assert!(String::from_utf8_lossy(&output.stderr).contains("no code generated"));
}

#[test]
fn parse_json_emits_the_syntax_tree() {
    let output = ttcn(&["parse", "samples/loops.ttcn", "--format", "json"]);
    assert!(output.status.success());
    let program: Value = serde_json::from_slice(&output.stdout).expect("parse output should be JSON");
    assert!(program.is_object());
}

#[test]
fn syntax_errors_fail() {
    let dir = std::env::temp_dir().join(format!("ttcn_syntax_{}", std::process::id()));
    std::fs::create_dir_all(&dir).unwrap();
    let path = dir.join("broken.ttcn");
    std::fs::write(&path, "module Broken { function f( { } }").unwrap();

    let output = ttcn(&["parse", path.to_str().unwrap()]);
    let _ = std::fs::remove_dir_all(&dir);
    assert!(!output.status.success());
}
