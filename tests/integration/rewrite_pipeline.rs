//! End-to-end pipeline tests against real `git` repositories.
//!
//! Each test builds a source repository with the `git` CLI, a bare
//! destination, and runs the library pipeline between them.
//!
//! # Scenarios
//! - **First full rewrite**: every branch lands on the destination and the
//!   persistent map holds one entry per source commit.
//! - **Blacklist precedence**: a blacklisted branch never reaches the
//!   destination even when the whitelist matches it.
//! - **Tag plan `none`**: no destination tag is written or deleted.
//! - **Config conflict**: a conflicting configuration fails before any
//!   working-area mutation.
//!
//! Requires `git` on `PATH`; tests skip gracefully if unavailable.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use refilter_rs::{run, ErrorKind, FilterSpec, RefMatcher, RunConfig, TagPlan};
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

fn init_destination(dir: &Path) {
    fs::create_dir_all(dir).unwrap();
    run_git(dir, &["init", "--bare"]);
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

/// The worker repo directory inside the working area.
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

/// Lines of the persistent commit map in the worker repo.
fn map_lines(workdir: &Path) -> Vec<String> {
    let worker = worker_dir(workdir);
    git_output(
        &worker,
        &["cat-file", "blob", "refs/filter-branch/state:filter.map"],
    )
    .lines()
    .filter(|l| !l.is_empty())
    .map(str::to_string)
    .collect()
}

fn branch_names(repo: &Path) -> Vec<String> {
    git_output(repo, &["for-each-ref", "--format=%(refname:short)", "refs/heads"])
        .lines()
        .map(str::to_string)
        .collect()
}

fn tag_names(repo: &Path) -> Vec<String> {
    git_output(repo, &["for-each-ref", "--format=%(refname:short)", "refs/tags"])
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn first_full_rewrite_publishes_all_branches() {
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
    commit_file(&source, "c.txt", "c\n", "c3");
    run_git(&source, &["checkout", "-b", "dev", "main~1"]);
    commit_file(&source, "d.txt", "d\n", "d1");
    run_git(&source, &["checkout", "main"]);
    init_destination(&destination);

    let cfg = base_config(&source, &workdir, &destination);
    let report = run(&cfg).expect("first run failed");

    assert_eq!(report.pushed_branches, 2);
    assert_eq!(report.rewritten(), 2);
    assert_eq!(report.pushed_tags, 0);

    let mut branches = branch_names(&destination);
    branches.sort();
    assert_eq!(branches, ["dev", "main"]);
    assert_eq!(
        git_output(&destination, &["rev-list", "--count", "main"]).trim(),
        "3"
    );
    assert_eq!(
        git_output(&destination, &["rev-list", "--count", "dev"]).trim(),
        "3"
    );
    assert!(tag_names(&destination).is_empty());

    // One mapping per source commit: c1..c3 on main, c1, c2, d1 on dev.
    assert_eq!(map_lines(&workdir).len(), 4);
}

#[test]
fn blacklist_wins_over_whitelist_end_to_end() {
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
    run_git(&source, &["branch", "release/1"]);
    run_git(&source, &["branch", "release/legacy"]);
    init_destination(&destination);

    let mut cfg = base_config(&source, &workdir, &destination);
    cfg.branches = RefMatcher::from_entries(
        &["rx:release/.*".to_string()],
        &["release/legacy".to_string()],
    )
    .unwrap();
    run(&cfg).expect("run failed");

    assert_eq!(branch_names(&destination), ["release/1"]);
}

#[test]
fn tag_plan_none_touches_no_destination_tag() {
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
    run_git(&source, &["tag", "v1"]);
    init_destination(&destination);

    // Pre-seed a destination tag that the run must leave alone.
    let seed = tmp.path().join("seed");
    init_source(&seed);
    commit_file(&seed, "s.txt", "s\n", "seed");
    run_git(
        &seed,
        &[
            "push",
            destination.to_str().unwrap(),
            "HEAD:refs/tags/legacy-tag",
        ],
    );

    let mut cfg = base_config(&source, &workdir, &destination);
    cfg.tag_plan = TagPlan::None;
    let report = run(&cfg).expect("run failed");

    assert_eq!(report.pushed_tags, 0);
    assert_eq!(tag_names(&destination), ["legacy-tag"]);
}

#[test]
fn config_conflict_fails_without_touching_the_workdir() {
    let tmp = TempDir::new().unwrap();
    let source = tmp.path().join("source");
    let destination = tmp.path().join("destination");
    let workdir = tmp.path().join("work");

    let mut cfg = base_config(&source, &workdir, &destination);
    cfg.tag_plan = TagPlan::None;
    cfg.prune_tags = true;
    let err = run(&cfg).expect_err("conflicting config must fail");

    assert_eq!(err.kind(), ErrorKind::ConfigConflict);
    assert!(!workdir.exists());
}
