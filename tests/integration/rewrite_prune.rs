//! Destination reconciliation behavior.
//!
//! # Scenarios
//! - **Prune reconciliation**: destination refs absent from the filtered
//!   source view are deleted once pruning is enabled.
//! - **HEAD safety**: the destination's current HEAD branch is never
//!   pruned; it is skipped with a warning.
//! - **Out-of-scope tags**: tags failing the tag matcher are pruned even
//!   when they still exist on the source.
//!
//! Requires `git` on `PATH`; tests skip gracefully if unavailable.

use std::fs;
use std::path::Path;
use std::process::Command;

use refilter_rs::{run, FilterSpec, RefMatcher, RunConfig, TagPlan};
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

/// Pushes a throwaway commit to the destination as `branch` and `tag`,
/// simulating refs left behind by an earlier, wider run.
fn seed_destination(tmp: &Path, destination: &Path, branch: &str, tag: &str) {
    let seed = tmp.join("seed");
    init_source(&seed);
    commit_file(&seed, "s.txt", "s\n", "seed");
    let dest = destination.to_str().unwrap();
    run_git(&seed, &["push", dest, &format!("HEAD:refs/heads/{branch}")]);
    run_git(&seed, &["push", dest, &format!("HEAD:refs/tags/{tag}")]);
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

fn ref_names(repo: &Path, prefix: &str) -> Vec<String> {
    git_output(repo, &["for-each-ref", "--format=%(refname:short)", prefix])
        .lines()
        .map(str::to_string)
        .collect()
}

#[test]
fn prune_removes_refs_gone_from_the_source() {
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
    run_git(&source, &["tag", "v-keep"]);
    init_destination(&destination);
    seed_destination(tmp.path(), &destination, "old", "tag-x");
    // Keep HEAD away from the seeded branch so it is prunable.
    run_git(&destination, &["symbolic-ref", "HEAD", "refs/heads/main"]);

    let mut cfg = base_config(&source, &workdir, &destination);
    cfg.tag_plan = TagPlan::All;
    cfg.prune_branches = true;
    cfg.prune_tags = true;
    let report = run(&cfg).expect("run failed");

    assert_eq!(report.pruned, 2);
    assert_eq!(ref_names(&destination, "refs/heads"), ["main"]);
    assert_eq!(ref_names(&destination, "refs/tags"), ["v-keep"]);
}

#[test]
fn prune_spares_the_destination_head_branch() {
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
    init_destination(&destination);
    seed_destination(tmp.path(), &destination, "old", "tag-x");
    run_git(&destination, &["symbolic-ref", "HEAD", "refs/heads/old"]);

    let mut cfg = base_config(&source, &workdir, &destination);
    cfg.tag_plan = TagPlan::All;
    cfg.prune_branches = true;
    cfg.prune_tags = true;
    let report = run(&cfg).expect("run failed");

    // tag-x pruned, branch old spared.
    assert_eq!(report.pruned, 1);
    let mut heads = ref_names(&destination, "refs/heads");
    heads.sort();
    assert_eq!(heads, ["main", "old"]);
}

#[test]
fn prune_removes_tags_that_fail_the_matcher() {
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
    run_git(&source, &["tag", "nightly-1"]);
    init_destination(&destination);

    // First run publishes both tags.
    let mut cfg = base_config(&source, &workdir, &destination);
    cfg.tag_plan = TagPlan::All;
    let report = run(&cfg).expect("first run failed");
    assert_eq!(report.pushed_tags, 2);

    // Second run narrows the tag scope and prunes the leftover.
    cfg.tags = RefMatcher::from_entries(&["rx:v.*".to_string()], &[]).unwrap();
    cfg.prune_tags = true;
    let report = run(&cfg).expect("second run failed");

    assert_eq!(report.pruned, 1);
    assert_eq!(ref_names(&destination, "refs/tags"), ["v1"]);
}
