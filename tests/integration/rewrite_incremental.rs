//! Incremental re-run behavior.
//!
//! # Scenarios
//! - **Append one commit**: only the new commit is rewritten and exactly
//!   one mapping is appended; untouched branches skip the engine entirely.
//! - **Idempotence**: a re-run with no source changes leaves destination
//!   refs and the persistent map byte-identical.
//!
//! Requires `git` on `PATH`; tests skip gracefully if unavailable.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use refilter_rs::{run, BranchOutcome, FilterSpec, RunConfig};
use tempfile::TempDir;

fn git_available() -> bool {
    Command::new("git").arg("--version").output().is_ok()
}

fn run_git(repo: &Path, args: &[&str]) {
    let status = Command::new("git")
        .arg("-C")
        .arg(repo)
        .args(args)
        .status()
        .expect("failed to run git");
    assert!(status.success(), "git command failed: {args:?}");
}

fn git_output(repo: &Path, args: &[&str]) -> String {
    let out = Command::new("git")
        .arg("-C")
        .arg(repo)
        .args(args)
        .output()
        .expect("failed to run git");
    assert!(out.status.success(), "git command failed: {args:?}");
    String::from_utf8(out.stdout).expect("git output not utf8")
}

fn init_source(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    run_git(dir, &["init", "-b", "main"]);
    run_git(dir, &["config", "user.email", "test@example.com"]);
    run_git(dir, &["config", "user.name", "Test User"]);
}

fn commit_file(repo: &Path, name: &str, content: &str, msg: &str) {
    fs::write(repo.join(name), content).unwrap();
    run_git(repo, &["add", "."]);
    run_git(repo, &["commit", "-m", msg]);
}

fn base_config(source: &Path, workdir: &Path, destination: &Path) -> RunConfig {
    let mut cfg = RunConfig::new(
        source.to_str().unwrap().to_string(),
        FilterSpec::parse("--prune-empty").unwrap(),
        destination.to_str().unwrap().to_string(),
    );
    cfg.workdir = workdir.to_path_buf();
    cfg
}

fn worker_dir(workdir: &Path) -> PathBuf {
    fs::read_dir(workdir)
        .unwrap()
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .find(|p| {
            p.is_dir()
                && p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.starts_with("worker-") && !n.contains('.'))
        })
        .expect("worker repo not created")
}

fn map_text(workdir: &Path) -> String {
    git_output(
        &worker_dir(workdir),
        &["cat-file", "blob", "refs/filter-branch/state:filter.map"],
    )
}

/// The map as a set of `original:rewritten` lines.
fn map_entries(workdir: &Path) -> Vec<String> {
    map_text(workdir)
        .lines()
        .filter(|l| !l.is_empty())
        .map(str::to_string)
        .collect()
}

/// All destination refs with their targets, as one comparable blob.
fn destination_refs(destination: &Path) -> String {
    git_output(
        destination,
        &["for-each-ref", "--format=%(refname) %(objectname)"],
    )
}

#[test]
fn appended_commit_rewrites_only_the_delta() {
    if !git_available() {
        eprintln!("skipping: git not available");
        return;
    }
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("source");
    let destination = tmp.path().join("destination");
    let workdir = tmp.path().join("work");
    init_source(&source);
    commit_file(&source, "a.txt", "a\n", "c1");
    commit_file(&source, "b.txt", "b\n", "c2");
    run_git(&source, &["branch", "dev"]);
    fs::create_dir_all(&destination).unwrap();
    run_git(&destination, &["init", "--bare"]);

    let cfg = base_config(&source, &workdir, &destination);
    run(&cfg).expect("first run failed");
    let map_before = map_entries(&workdir);

    commit_file(&source, "c.txt", "c\n", "c3");
    let report = run(&cfg).expect("second run failed");

    // Exactly one mapping added; every prior mapping survives unchanged.
    let map_after = map_entries(&workdir);
    assert_eq!(map_after.len(), map_before.len() + 1);
    for entry in &map_before {
        assert!(map_after.contains(entry), "mapping lost: {entry}");
    }

    // The untouched branch skipped the engine.
    let dev = report
        .branches
        .iter()
        .find(|b| b.branch == "dev")
        .expect("dev processed");
    assert_eq!(dev.outcome, BranchOutcome::UpToDate);
    let main = report
        .branches
        .iter()
        .find(|b| b.branch == "main")
        .expect("main processed");
    assert_eq!(main.outcome, BranchOutcome::Rewritten);

    assert_eq!(
        git_output(&destination, &["rev-list", "--count", "main"]).trim(),
        "3"
    );
    assert_eq!(
        git_output(&destination, &["rev-list", "--count", "dev"]).trim(),
        "2"
    );
}

#[test]
fn rerun_without_changes_is_idempotent() {
    if !git_available() {
        eprintln!("skipping: git not available");
        return;
    }
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("source");
    let destination = tmp.path().join("destination");
    let workdir = tmp.path().join("work");
    init_source(&source);
    commit_file(&source, "a.txt", "a\n", "c1");
    commit_file(&source, "b.txt", "b\n", "c2");
    fs::create_dir_all(&destination).unwrap();
    run_git(&destination, &["init", "--bare"]);

    let cfg = base_config(&source, &workdir, &destination);
    run(&cfg).expect("first run failed");
    let refs_before = destination_refs(&destination);
    let map_before = map_text(&workdir);

    let report = run(&cfg).expect("second run failed");

    assert_eq!(destination_refs(&destination), refs_before);
    assert_eq!(map_text(&workdir), map_before);
    assert_eq!(report.rewritten(), 0);
    assert!(report
        .branches
        .iter()
        .all(|b| b.outcome == BranchOutcome::UpToDate));
}
