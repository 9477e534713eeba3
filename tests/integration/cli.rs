//! Integration tests for the `ggbpuppy` binary

use assert_cmd::Command;
use predicates::prelude::*;
use tempfile::TempDir;

fn ggbpuppy(data_dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("ggbpuppy").expect("Binary should build");
    cmd.arg("--data-dir").arg(data_dir.path());
    cmd
}

fn source_file(dir: &TempDir, contents: &str) -> std::path::PathBuf {
    let path = dir.path().join("construction.ggbscript");
    std::fs::write(&path, contents).expect("Failed to write source");
    path
}

#[test]
fn test_parse_lists_statements_with_lines() {
    let dir = TempDir::new().unwrap();
    let file = source_file(&dir, "A = (1, 2)\n\n// helper\nB = (3, 4) // end\n");

    ggbpuppy(&dir)
        .arg("parse")
        .arg(&file)
        .assert()
        .success()
        .stdout("   1  A = (1, 2)\n   4  B = (3, 4)\n");
}

#[test]
fn test_export_html_writes_page() {
    let dir = TempDir::new().unwrap();
    let out = dir.path().join("out");
    let file = source_file(&dir, "A = (1, 2)");

    let output = ggbpuppy(&dir)
        .arg("export-html")
        .arg(&file)
        .arg("--enable-3d")
        .arg("--out")
        .arg(&out)
        .assert()
        .success()
        .stdout(predicate::str::contains("ggbpuppy_"))
        .get_output()
        .stdout
        .clone();

    let path = String::from_utf8(output).unwrap();
    let html = std::fs::read_to_string(path.trim()).unwrap();
    assert!(html.contains(r#"appName: "3d""#));
    assert!(html.contains(r#""A = (1, 2)""#));
}

#[test]
fn test_share_then_show_with_local_storage() {
    let dir = TempDir::new().unwrap();
    let file = source_file(&dir, "A = (1, 2)");

    let output = ggbpuppy(&dir)
        .args(["--storage", "local", "share"])
        .arg(&file)
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();
    let stdout = String::from_utf8(output).unwrap();
    let id = stdout.lines().next().unwrap().to_string();
    assert_eq!(id.len(), 7);
    assert!(stdout.contains(&format!("/share/{id}")));

    ggbpuppy(&dir)
        .args(["--storage", "local", "show", &id])
        .assert()
        .success()
        .stdout(predicate::str::contains(r#""code": "A = (1, 2)""#));
}

#[test]
fn test_show_unknown_share_fails() {
    let dir = TempDir::new().unwrap();
    ggbpuppy(&dir)
        .args(["--storage", "local", "show", "missing"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Share not found"));
}

#[test]
fn test_missing_source_file_fails() {
    let dir = TempDir::new().unwrap();
    ggbpuppy(&dir)
        .arg("parse")
        .arg(dir.path().join("nope.txt"))
        .assert()
        .failure()
        .stderr(predicate::str::contains("reading"));
}
