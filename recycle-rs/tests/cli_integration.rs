#![allow(deprecated)] // cargo_bin! macro doesn't exist yet in assert_cmd 2.1

use assert_cmd::Command;
use predicates::prelude::*;
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Recycle root and working directory isolated per test.
struct Sandbox {
    _temp: TempDir,
    root: PathBuf,
    work: PathBuf,
}

impl Sandbox {
    fn new() -> Self {
        let temp = TempDir::new().expect("Failed to create temp dir");
        let root = temp.path().join("recycle");
        let work = temp.path().join("work");
        fs::create_dir_all(&work).unwrap();
        Self {
            _temp: temp,
            root,
            work,
        }
    }

    fn recycle(&self) -> Command {
        self.recycle_in(&self.work)
    }

    fn recycle_in(&self, cwd: &Path) -> Command {
        let mut cmd = Command::cargo_bin("recycle").unwrap();
        cmd.env("RECYCLE_HOME", &self.root)
            .env_remove("RUST_LOG")
            .current_dir(cwd);
        cmd
    }

    fn write(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.work.join(name);
        fs::write(&path, contents).unwrap();
        path
    }

    /// Id of the first listed entry, parsed from `<id>. <path> (<date>)`.
    fn first_listed_id(&self) -> String {
        let output = self.recycle().arg("list").output().unwrap();
        let stdout = String::from_utf8(output.stdout).unwrap();
        stdout
            .lines()
            .next()
            .and_then(|line| line.split('.').next())
            .expect("listing has no entries")
            .to_string()
    }
}

// ============================================================================
// Basic CLI tests
// ============================================================================

#[test]
fn test_help() {
    Command::cargo_bin("recycle")
        .unwrap()
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("store"))
        .stdout(predicate::str::contains("recover"))
        .stdout(predicate::str::contains("list"));
}

#[test]
fn test_store_requires_a_path() {
    let sandbox = Sandbox::new();
    sandbox
        .recycle()
        .arg("store")
        .assert()
        .code(2)
        .stderr(predicate::str::contains("PATH"));
}

#[test]
fn test_recover_requires_numeric_id() {
    let sandbox = Sandbox::new();
    sandbox.recycle().args(["recover", "abc"]).assert().code(2);
    sandbox.recycle().arg("recover").assert().code(2);
}

#[test]
fn test_unknown_command_fails() {
    let sandbox = Sandbox::new();
    sandbox.recycle().arg("purge").assert().code(2);
}

// ============================================================================
// Store / list / recover
// ============================================================================

#[test]
fn test_list_empty_directory() {
    let sandbox = Sandbox::new();
    sandbox
        .recycle()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("No entries for "));
}

#[test]
fn test_store_list_recover_round_trip() {
    let sandbox = Sandbox::new();
    let path = sandbox.write("todo.txt", "buy milk");

    sandbox.recycle().args(["store", "todo.txt"]).assert().success();
    assert!(!path.exists());

    sandbox
        .recycle()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::contains("/todo.txt ("));

    let id = sandbox.first_listed_id();
    sandbox.recycle().args(["recover", &id]).assert().success();

    assert_eq!(fs::read_to_string(&path).unwrap(), "buy milk");
    sandbox
        .recycle()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("No entries for "));
}

#[test]
fn test_list_with_path_argument() {
    let sandbox = Sandbox::new();
    sandbox.write("keep.log", "k");
    sandbox.write("drop.txt", "d");
    sandbox
        .recycle()
        .args(["store", "keep.log", "drop.txt"])
        .assert()
        .success();

    sandbox
        .recycle()
        .args(["list", "drop.txt"])
        .assert()
        .success()
        .stdout(predicate::str::contains("drop.txt"))
        .stdout(predicate::str::contains("keep.log").not());
}

#[test]
fn test_store_missing_file_fails_without_entries() {
    let sandbox = Sandbox::new();
    sandbox
        .recycle()
        .args(["store", "ghost.txt"])
        .assert()
        .code(1)
        .stderr(predicate::str::contains("recycle:"));

    sandbox
        .recycle()
        .arg("list")
        .assert()
        .success()
        .stdout(predicate::str::starts_with("No entries for "));
}

#[test]
fn test_recover_unknown_id_is_not_found() {
    let sandbox = Sandbox::new();
    sandbox
        .recycle()
        .args(["recover", "42"])
        .assert()
        .code(3)
        .stderr(predicate::str::contains("entry with id 42"));
}

#[test]
fn test_recover_onto_existing_file_is_a_conflict() {
    let sandbox = Sandbox::new();
    let path = sandbox.write("clash.txt", "original");
    sandbox.recycle().args(["store", "clash.txt"]).assert().success();
    fs::write(&path, "replacement").unwrap();

    let id = sandbox.first_listed_id();
    sandbox
        .recycle()
        .args(["recover", &id])
        .assert()
        .code(4)
        .stderr(predicate::str::contains("refusing to overwrite"));

    assert_eq!(fs::read_to_string(&path).unwrap(), "replacement");
}

#[test]
fn test_root_flag_overrides_environment() {
    let sandbox = Sandbox::new();
    let other_root = sandbox.work.join("alt-root");
    sandbox.write("flagged.txt", "f");

    sandbox
        .recycle()
        .arg("--root")
        .arg(&other_root)
        .args(["store", "flagged.txt"])
        .assert()
        .success();

    assert!(other_root.join("var/main.db").is_file());
    assert!(!sandbox.root.join("var/main.db").exists());
}
