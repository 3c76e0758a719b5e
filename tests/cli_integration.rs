//! CLI integration tests for slipway.
//!
//! These tests verify the CLI workflow over real manifests in temporary
//! project directories. Probing is kept out of the picture with
//! `--no-check` so the tests do not depend on which libraries the host
//! machine has installed.

use std::fs;
use std::process::Command;

use assert_cmd::prelude::*;
use predicates::prelude::*;
use tempfile::TempDir;

/// Get the slipway binary command.
fn slipway() -> Command {
    Command::cargo_bin("slipway").unwrap()
}

/// Create a temporary directory for test projects.
fn temp_dir() -> TempDir {
    TempDir::new().unwrap()
}

/// Lay out a small project with two targets.
fn write_project(tmp: &TempDir) {
    fs::write(
        tmp.path().join("Slipway.toml"),
        r#"
[project]
name = "imgtools"

[libs.z]
header = "zlib.h"

[libs.png]
header = "png.h"
dependencies = ["z"]

[[target]]
name = "viewer"
kind = "program"
sources = ["src/viewer/*.c"]
libraries = ["png"]

[[target]]
name = "imgcore"
kind = "static-lib"
sources = ["src/imgcore/*.c"]
"#,
    )
    .unwrap();

    for dir in ["src/viewer", "src/imgcore"] {
        fs::create_dir_all(tmp.path().join(dir)).unwrap();
    }
    fs::write(
        tmp.path().join("src/viewer/main.c"),
        "int main(void) { return 0; }\n",
    )
    .unwrap();
    fs::write(tmp.path().join("src/imgcore/core.c"), "void core(void) {}\n").unwrap();
}

// ============================================================================
// slipway targets
// ============================================================================

#[test]
fn test_targets_lists_declared_targets() {
    let tmp = temp_dir();
    write_project(&tmp);

    slipway()
        .args(["targets"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("viewer"))
        .stdout(predicate::str::contains("imgcore"));
}

#[test]
fn test_targets_without_manifest_fails() {
    let tmp = temp_dir();

    slipway()
        .args(["targets"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("Slipway.toml"));
}

// ============================================================================
// slipway build
// ============================================================================

#[test]
fn test_build_no_check_succeeds() {
    let tmp = temp_dir();
    write_project(&tmp);

    slipway()
        .args(["build", "--no-check"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("all buildable"));
}

#[test]
fn test_build_json_report() {
    let tmp = temp_dir();
    write_project(&tmp);

    let output = slipway()
        .args(["build", "--no-check", "--output-format", "json"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .get_output()
        .stdout
        .clone();

    let json: serde_json::Value = serde_json::from_slice(&output).unwrap();
    assert_eq!(json["targets_total"], 2);
    assert_eq!(json["targets_buildable"], 2);
    assert!(json["failures"].as_array().unwrap().is_empty());
}

#[test]
fn test_build_fails_on_missing_sources() {
    let tmp = temp_dir();
    write_project(&tmp);
    fs::remove_file(tmp.path().join("src/viewer/main.c")).unwrap();

    slipway()
        .args(["build", "--no-check"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("no sources"));
}

#[test]
fn test_build_manifest_path_flag() {
    let tmp = temp_dir();
    write_project(&tmp);

    slipway()
        .args([
            "build",
            "--no-check",
            "--manifest-path",
            tmp.path().join("Slipway.toml").to_str().unwrap(),
        ])
        .assert()
        .success();
}

#[test]
fn test_build_rejects_cyclic_libraries() {
    let tmp = temp_dir();
    fs::write(
        tmp.path().join("Slipway.toml"),
        r#"
[libs.a]
dependencies = ["b"]

[libs.b]
dependencies = ["a"]

[[target]]
name = "t"
kind = "program"
sources = ["*.c"]
libraries = ["a"]
"#,
    )
    .unwrap();
    fs::write(tmp.path().join("main.c"), "int main(void) { return 0; }\n").unwrap();

    slipway()
        .args(["build", "--no-check"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("cycle"));
}

// ============================================================================
// slipway check
// ============================================================================

#[test]
fn test_check_empty_libs_succeeds() {
    let tmp = temp_dir();
    fs::write(tmp.path().join("Slipway.toml"), "[project]\nname = \"empty\"\n").unwrap();

    slipway()
        .args(["check"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("0 librar(ies) checked"));
}

// ============================================================================
// slipway flags
// ============================================================================

#[test]
fn test_flags_shows_link_line() {
    let tmp = temp_dir();
    write_project(&tmp);

    slipway()
        .args(["flags", "viewer"])
        .current_dir(tmp.path())
        .assert()
        .success()
        .stdout(predicate::str::contains("-lz"))
        .stdout(predicate::str::contains("-lpng"));
}

#[test]
fn test_flags_unknown_target_fails() {
    let tmp = temp_dir();
    write_project(&tmp);

    slipway()
        .args(["flags", "nonexistent"])
        .current_dir(tmp.path())
        .assert()
        .failure()
        .stderr(predicate::str::contains("no target named"));
}

// ============================================================================
// slipway completions
// ============================================================================

#[test]
fn test_completions_bash() {
    slipway()
        .args(["completions", "bash"])
        .assert()
        .success()
        .stdout(predicate::str::contains("slipway"));
}
