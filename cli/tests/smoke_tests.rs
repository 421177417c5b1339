use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::Path;

fn ctxpack() -> Command {
    Command::new(env!("CARGO_BIN_EXE_ctxpack"))
}

fn write_lines(root: &Path, rel: &str, lines: usize) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    let body: String = (1..=lines).map(|i| format!("line {}\n", i)).collect();
    fs::write(path, body).unwrap();
}

fn sample_project() -> tempfile::TempDir {
    let dir = tempfile::tempdir().unwrap();
    write_lines(dir.path(), "Program.cs", 50);
    write_lines(dir.path(), "App.razor", 20);
    write_lines(dir.path(), "bin/Temp.cs", 5);
    dir
}

#[test]
fn shows_help() {
    ctxpack()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("pack"));
}

#[test]
fn list_skips_build_output() {
    let dir = sample_project();
    ctxpack()
        .args(["list", "--no-config", "--root"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Program.cs"))
        .stdout(predicate::str::contains("App.razor"))
        .stdout(predicate::str::contains("Temp.cs").not());
}

#[test]
fn list_missing_root_exits_with_path_error() {
    let dir = tempfile::tempdir().unwrap();
    ctxpack()
        .args(["list", "--no-config", "--root"])
        .arg(dir.path().join("missing"))
        .assert()
        .code(2);
}

#[test]
fn metadata_as_json() {
    let dir = sample_project();
    ctxpack()
        .args(["metadata", "--no-config", "-f", "json", "--root"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("\"lineCount\":50"))
        .stdout(predicate::str::contains("\"lineCount\":20"));
}

#[test]
fn contents_reports_missing_files_per_path() {
    let dir = sample_project();
    ctxpack()
        .args(["contents", "--no-config", "--root"])
        .arg(dir.path())
        .args(["App.razor", "Nope.cs"])
        .assert()
        .success()
        .stdout(predicate::str::contains("\"content\":\"line 1\\n"))
        .stdout(predicate::str::contains("\"error\""));
}

#[test]
fn pack_to_stdout_splits_into_chunks() {
    let dir = sample_project();
    ctxpack()
        .args([
            "pack",
            "--no-config",
            "--no-defaults",
            "-s",
            "program.cs",
            "--target-lines",
            "40",
            "--root",
        ])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("Chunk 1 of 3"))
        .stdout(predicate::str::contains("Chunk 3 of 3"))
        .stdout(predicate::str::contains("App.razor | lines: 20 | chars: "));
}

#[test]
fn pack_saves_chunk_files() {
    let dir = sample_project();
    let out = tempfile::tempdir().unwrap();
    ctxpack()
        .args([
            "pack",
            "--no-config",
            "--target-lines",
            "40",
            "--name",
            "shop",
            "--save",
        ])
        .arg(out.path())
        .arg("--root")
        .arg(dir.path())
        .assert()
        .success();
    assert!(out.path().join("shop_chunk_1.txt").exists());
    let first = fs::read_to_string(out.path().join("shop_chunk_1.txt")).unwrap();
    assert!(first.starts_with("Chunk 1 of "));
}

#[test]
fn zero_target_lines_is_a_chunking_error() {
    let dir = sample_project();
    ctxpack()
        .args(["pack", "--no-config", "--target-lines", "0", "--root"])
        .arg(dir.path())
        .assert()
        .code(3);
}

#[test]
fn unknown_phrase_is_rejected() {
    let dir = sample_project();
    ctxpack()
        .args(["pack", "--no-config", "-p", "does-not-exist", "--root"])
        .arg(dir.path())
        .assert()
        .code(5)
        .stderr(predicate::str::contains("Unknown phrase"));
}

#[test]
fn config_prints_default_toml() {
    let dir = tempfile::tempdir().unwrap();
    ctxpack()
        .args(["config", "--no-config", "--root"])
        .arg(dir.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("[scan]"))
        .stdout(predicate::str::contains("excluded_dirs"));
}
