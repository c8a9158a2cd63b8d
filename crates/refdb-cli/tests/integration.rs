#![allow(deprecated)]
use assert_cmd::Command;
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Runs with `dir` as the process working directory, so the ledger and the
/// scratch area land there by default.
fn refdb(dir: &TempDir) -> Command {
    let mut cmd = Command::cargo_bin("refdb-update").unwrap();
    cmd.current_dir(dir.path())
        .env_remove("REFDB_FROM")
        .env_remove("REFDB_TO")
        .env_remove("REFDB_SMTP_HOST")
        .env_remove("REFDB_SMTP_PORT")
        .env_remove("REFDB_CONFIG")
        .env_remove("RUST_LOG");
    cmd
}

fn work_root(dir: &TempDir) -> PathBuf {
    dir.path().join("work")
}

fn write_tree(root: &Path, set_doc: &str) {
    let src = root.join("src");
    std::fs::create_dir_all(&src).unwrap();
    std::fs::write(src.join("LIBRARIES"), "# stdlib\nstrscan\nset\n").unwrap();
    std::fs::write(
        src.join("strscan.rd"),
        "= class StringScanner < Object\n--- new(str)\n--- scan(regexp)\n",
    )
    .unwrap();
    std::fs::write(src.join("set.rd"), set_doc).unwrap();
}

fn valid_tree(dir: &TempDir) {
    write_tree(&work_root(dir), "= class Set\n--- add(o)\n");
}

fn malformed_tree(dir: &TempDir) {
    write_tree(&work_root(dir), "--- add(o)\n");
}

// ---------------------------------------------------------------------------
// Argument handling
// ---------------------------------------------------------------------------

#[test]
fn help_exits_zero() {
    let dir = TempDir::new().unwrap();
    refdb(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("--smtp-host"))
        .stdout(predicate::str::contains("<WORK_ROOT>"));
}

#[test]
fn missing_work_root_exits_one() {
    let dir = TempDir::new().unwrap();
    refdb(&dir)
        .assert()
        .code(1)
        .stderr(predicate::str::contains("Usage"));
}

#[test]
fn extra_positional_exits_one() {
    let dir = TempDir::new().unwrap();
    refdb(&dir).args(["a", "b"]).assert().code(1);
}

#[test]
fn unknown_option_exits_one() {
    let dir = TempDir::new().unwrap();
    refdb(&dir)
        .args(["--bogus", "work"])
        .assert()
        .code(1);
}

#[test]
fn bad_port_exits_one() {
    let dir = TempDir::new().unwrap();
    refdb(&dir)
        .args(["--smtp-port=mail", "work"])
        .assert()
        .code(1);
}

#[test]
fn smtp_host_without_addresses_exits_one() {
    let dir = TempDir::new().unwrap();
    valid_tree(&dir);
    refdb(&dir)
        .args(["--smtp-host=mail.example.org"])
        .arg(work_root(&dir))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("--from"));
    assert!(!work_root(&dir).join("var/1.9.0").exists());
}

// ---------------------------------------------------------------------------
// Successful runs
// ---------------------------------------------------------------------------

#[test]
fn fresh_work_root_is_published() {
    let dir = TempDir::new().unwrap();
    valid_tree(&dir);

    refdb(&dir).arg(work_root(&dir)).assert().success();

    let live = work_root(&dir).join("var/1.9.0");
    assert!(live.join("refdb.redb").is_file());
    assert!(!dir.path().join("lasterror.log").exists());
    assert!(!dir.path().join("db.tmp").exists());
    assert!(!work_root(&dir).join("var/1.9.0.old").exists());
}

#[test]
fn second_success_republishes() {
    let dir = TempDir::new().unwrap();
    valid_tree(&dir);
    refdb(&dir).arg(work_root(&dir)).assert().success();
    refdb(&dir).arg(work_root(&dir)).assert().success();

    assert!(work_root(&dir).join("var/1.9.0/refdb.redb").is_file());
    assert!(!dir.path().join("lasterror.log").exists());
}

#[test]
fn db_version_and_state_dir_are_honoured() {
    let dir = TempDir::new().unwrap();
    valid_tree(&dir);
    let state = dir.path().join("state");

    refdb(&dir)
        .args(["--db-version", "2.0.0"])
        .arg("--state-dir")
        .arg(&state)
        .arg(work_root(&dir))
        .assert()
        .success();

    assert!(work_root(&dir).join("var/2.0.0/refdb.redb").is_file());
    assert!(state.join("update.lock").exists());
    assert!(!state.join("lasterror.log").exists());
}

#[test]
fn invalid_db_version_exits_one() {
    let dir = TempDir::new().unwrap();
    valid_tree(&dir);
    refdb(&dir)
        .args(["--db-version", "../escape"])
        .arg(work_root(&dir))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid version"));
}

// ---------------------------------------------------------------------------
// Failing runs
// ---------------------------------------------------------------------------

#[test]
fn malformed_tree_is_recorded_not_fatal() {
    let dir = TempDir::new().unwrap();
    malformed_tree(&dir);

    refdb(&dir).arg(work_root(&dir)).assert().success();

    let ledger = std::fs::read_to_string(dir.path().join("lasterror.log")).unwrap();
    assert!(ledger.starts_with(&format!(
        "{}:1: method declared outside of a class or module (BuildError::Parse)",
        work_root(&dir).join("src/set.rd").display()
    )));
    assert!(!work_root(&dir).join("var/1.9.0").exists());
    assert!(!dir.path().join("db.tmp").exists());
}

#[test]
fn repeated_failure_rewrites_identical_ledger() {
    let dir = TempDir::new().unwrap();
    malformed_tree(&dir);

    refdb(&dir).arg(work_root(&dir)).assert().success();
    let first = std::fs::read(dir.path().join("lasterror.log")).unwrap();

    refdb(&dir)
        .arg(work_root(&dir))
        .assert()
        .success()
        .stderr(predicate::str::contains("already reported"));
    let second = std::fs::read(dir.path().join("lasterror.log")).unwrap();
    assert_eq!(first, second);
}

#[test]
fn failure_keeps_previous_live_artifact() {
    let dir = TempDir::new().unwrap();
    valid_tree(&dir);
    refdb(&dir).arg(work_root(&dir)).assert().success();
    let db_file = work_root(&dir).join("var/1.9.0/refdb.redb");
    let before = std::fs::read(&db_file).unwrap();

    malformed_tree(&dir);
    refdb(&dir).arg(work_root(&dir)).assert().success();

    assert_eq!(std::fs::read(&db_file).unwrap(), before);
    assert!(dir.path().join("lasterror.log").exists());
}

#[test]
fn fixed_tree_clears_ledger() {
    let dir = TempDir::new().unwrap();
    malformed_tree(&dir);
    refdb(&dir).arg(work_root(&dir)).assert().success();
    assert!(dir.path().join("lasterror.log").exists());

    valid_tree(&dir);
    refdb(&dir).arg(work_root(&dir)).assert().success();
    assert!(!dir.path().join("lasterror.log").exists());
}

#[test]
fn missing_source_tree_is_recorded() {
    let dir = TempDir::new().unwrap();
    std::fs::create_dir_all(work_root(&dir)).unwrap();

    refdb(&dir).arg(work_root(&dir)).assert().success();

    let ledger = std::fs::read_to_string(dir.path().join("lasterror.log")).unwrap();
    assert!(ledger.contains("(BuildError::MissingIndex)"));
}

#[test]
fn mail_config_file_is_loaded() {
    let dir = TempDir::new().unwrap();
    valid_tree(&dir);
    let config = dir.path().join("mail.yaml");
    // A host with no addresses fails validation, proving the file was read.
    std::fs::write(&config, "smtp_host: mail.example.org\n").unwrap();

    refdb(&dir)
        .arg("--config")
        .arg(&config)
        .arg(work_root(&dir))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("invalid mail configuration"));
}

// ---------------------------------------------------------------------------
// Logging
// ---------------------------------------------------------------------------

#[test]
fn default_log_level_is_info() {
    let dir = TempDir::new().unwrap();
    valid_tree(&dir);
    refdb(&dir)
        .arg(work_root(&dir))
        .assert()
        .success()
        .stderr(predicate::str::contains("update complete"));
}

#[test]
fn rust_log_raises_level() {
    let dir = TempDir::new().unwrap();
    valid_tree(&dir);
    refdb(&dir)
        .env("RUST_LOG", "warn")
        .arg(work_root(&dir))
        .assert()
        .success()
        .stderr(predicate::str::contains("update complete").not())
        .stderr(predicate::str::contains("database published").not());
    assert!(work_root(&dir).join("var/1.9.0/refdb.redb").is_file());
}

#[test]
fn rust_log_lowers_level() {
    let dir = TempDir::new().unwrap();
    valid_tree(&dir);
    refdb(&dir)
        .env("RUST_LOG", "debug")
        .arg(work_root(&dir))
        .assert()
        .success()
        .stderr(predicate::str::contains("DEBUG"));
}

#[test]
fn help_warns_state_dir_must_share_filesystem() {
    let dir = TempDir::new().unwrap();
    refdb(&dir)
        .arg("--help")
        .assert()
        .success()
        .stdout(predicate::str::contains("same filesystem"));
}
