//! The top-level rewrite pipeline.
//!
//! Strictly sequential, single-threaded: acquire the exclusive-run guard,
//! refresh the source mirror, select in-scope branches, ensure the worker,
//! drop stale converted tags, rewrite each branch in turn, publish, prune.
//! Every suspension point is a blocking child process; every failure is
//! fatal and leaves the worker state in place, so the next invocation
//! resumes from the last fully-completed branch.

use std::fs;

use super::branch::{process_branch, BranchOutcome, BranchReport};
use super::config::RunConfig;
use super::errors::RunError;
use super::git;
use super::lock::RunLock;
use super::mirror::Mirror;
use super::prune::{clean_worker_tags, prune_destination};
use super::publish::publish;
use super::worker::Worker;
use super::workdir::Workdir;

/// Summary of one completed run.
#[derive(Debug, Default)]
pub struct RunReport {
    /// Per-branch outcomes, in processing order.
    pub branches: Vec<BranchReport>,
    /// Branch refs pushed to the destination.
    pub pushed_branches: u32,
    /// Tag refs pushed to the destination.
    pub pushed_tags: u32,
    /// Destination refs deleted by the prune passes.
    pub pruned: u32,
}

impl RunReport {
    /// Branches whose delta the engine actually rewrote.
    #[must_use]
    pub fn rewritten(&self) -> u32 {
        self.branches
            .iter()
            .filter(|b| b.outcome == BranchOutcome::Rewritten)
            .count() as u32
    }
}

/// Executes one full rewrite run.
///
/// # Errors
/// Every failure except an unmappable tag is fatal; see the error kinds
/// on [`RunError`].
pub fn run(cfg: &RunConfig) -> Result<RunReport, RunError> {
    cfg.validate()?;
    if !git::available() {
        return Err(RunError::GitMissing);
    }

    // Canonicalize the root so every derived path stays valid regardless
    // of the working directory the child processes run in.
    fs::create_dir_all(&cfg.workdir).map_err(|source| RunError::WorkdirCreate {
        path: cfg.workdir.clone(),
        source,
    })?;
    let root = fs::canonicalize(&cfg.workdir).map_err(|source| RunError::WorkdirCreate {
        path: cfg.workdir.clone(),
        source,
    })?;
    let workdir = Workdir::new(root, &cfg.source_url, &cfg.destination_url);

    let _guard = RunLock::acquire(&workdir.lock_path(), cfg.locking)?;

    let mirror = Mirror::ensure(&workdir.mirror_dir(), &cfg.source_url, cfg.allow_hardlinks)?;
    let in_scope: Vec<String> = mirror
        .branches()?
        .into_iter()
        .filter(|b| cfg.branches.passes(b))
        .collect();
    if in_scope.is_empty() {
        return Err(RunError::NoBranchesInScope);
    }
    let source_tags = mirror.tags()?;

    let worker = Worker::ensure(&workdir.worker_dir(), mirror.path(), &cfg.destination_url)?;

    if cfg.prune_tags {
        clean_worker_tags(&worker, cfg, &source_tags)?;
    }

    let scratch = workdir.scratch_dir();
    let map_snapshot = workdir.map_path();
    let mut report = RunReport::default();
    for branch in &in_scope {
        report
            .branches
            .push(process_branch(&worker, cfg, branch, &scratch, &map_snapshot)?);
    }

    let pushed = publish(&worker, cfg, &in_scope, &source_tags)?;
    report.pushed_branches = pushed.branches;
    report.pushed_tags = pushed.tags;

    report.pruned = prune_destination(&worker, cfg, &in_scope, &source_tags)?;

    Ok(report)
}
