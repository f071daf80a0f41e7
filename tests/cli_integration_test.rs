//! CLI integration tests: run the jdeps binary.
//! Uses CARGO_BIN_EXE_jdeps when set (e.g. by `cargo test`).

use std::path::PathBuf;
use std::process::Command;

fn bin() -> Option<PathBuf> {
    std::env::var_os("CARGO_BIN_EXE_jdeps").map(PathBuf::from)
}

#[test]
fn test_cli_help_succeeds() {
    let Some(bin) = bin() else {
        eprintln!("Skipping CLI test: CARGO_BIN_EXE not set");
        return;
    };
    let out = Command::new(bin).arg("--help").output().expect("run --help");
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("--class-path"));
    assert!(stdout.contains("--multi-release"));
}

#[test]
fn test_cli_requires_input() {
    let Some(bin) = bin() else {
        eprintln!("Skipping CLI test: CARGO_BIN_EXE not set");
        return;
    };
    let out = Command::new(bin).output().expect("run without args");
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("no input files"));
}

#[test]
fn test_cli_missing_input_path() {
    let Some(bin) = bin() else {
        eprintln!("Skipping CLI test: CARGO_BIN_EXE not set");
        return;
    };
    let out = Command::new(bin)
        .arg("does/not/exist_12345.jar")
        .output()
        .expect("run with missing input");
    assert!(!out.status.success(), "expected failure for missing input");
}

#[test]
fn test_cli_empty_directory_has_no_dependences() {
    let Some(bin) = bin() else {
        eprintln!("Skipping CLI test: CARGO_BIN_EXE not set");
        return;
    };
    let dir = tempfile::tempdir().unwrap();
    let out = Command::new(&bin).arg(dir.path()).output().expect("run on empty dir");
    assert!(out.status.success(), "stderr: {}", String::from_utf8_lossy(&out.stderr));
    assert!(out.stdout.is_empty());

    let out = Command::new(&bin)
        .arg("--json")
        .arg(dir.path())
        .output()
        .expect("run on empty dir with --json");
    assert!(out.status.success());
    let json: serde_json::Value = serde_json::from_slice(&out.stdout).expect("json output");
    assert_eq!(json["granularity"], "package");
    assert_eq!(json["archives"].as_array().map(Vec::len), Some(0));
}

#[test]
fn test_cli_conflicting_target_filters() {
    let Some(bin) = bin() else {
        eprintln!("Skipping CLI test: CARGO_BIN_EXE not set");
        return;
    };
    let dir = tempfile::tempdir().unwrap();
    let out = Command::new(bin)
        .args(["-p", "java.util", "-e", "java\\..*"])
        .arg(dir.path())
        .output()
        .expect("run with two target filters");
    assert!(!out.status.success());
}

#[test]
fn test_cli_inverse_needs_target_filter() {
    let Some(bin) = bin() else {
        eprintln!("Skipping CLI test: CARGO_BIN_EXE not set");
        return;
    };
    let dir = tempfile::tempdir().unwrap();
    let out = Command::new(bin)
        .arg("--inverse")
        .arg(dir.path())
        .output()
        .expect("run --inverse");
    assert!(!out.status.success());
    assert!(String::from_utf8_lossy(&out.stderr).contains("--inverse"));
}
