//! Destination reconciliation.
//!
//! Two independently-gated passes run after the main publish: delete
//! destination tags that fell out of scope or vanished from the source,
//! and delete destination branches outside the in-scope set. The
//! destination's current HEAD branch is never deleted, since that would
//! leave the destination without a default branch; it is skipped with a
//! warning instead.
//!
//! A third, earlier pass drops worker-local converted tags that are stale
//! (out of scope or gone from the source) so the publish cannot resurrect
//! them on the destination.

use std::collections::HashSet;

use super::config::RunConfig;
use super::errors::PruneError;
use super::worker::{converted_tag_ref, Worker};

/// Drops stale worker-local converted tags before rewriting starts.
///
/// Returns how many were removed.
///
/// # Errors
/// Fails on git plumbing failure.
pub fn clean_worker_tags(
    worker: &Worker,
    cfg: &RunConfig,
    source_tags: &[String],
) -> Result<u32, PruneError> {
    let source: HashSet<&str> = source_tags.iter().map(String::as_str).collect();
    let mut removed = 0u32;
    for tag in worker.converted_tags().map_err(PruneError::WorkerTag)? {
        if cfg.tags.passes(&tag) && source.contains(tag.as_str()) {
            continue;
        }
        worker
            .repo()
            .delete_ref(&converted_tag_ref(&tag))
            .map_err(PruneError::WorkerTag)?;
        removed += 1;
    }
    Ok(removed)
}

/// Deletes obsolete destination refs after the publish.
///
/// Tag pass (`cfg.prune_tags`): a destination tag goes when it fails the
/// tag matcher or is absent from this run's source tag set. Branch pass
/// (`cfg.prune_branches`): a destination branch goes when it is outside
/// the in-scope branch set, except the destination HEAD branch.
///
/// Returns how many refs were deleted. An empty deletion set skips the
/// push entirely.
///
/// # Errors
/// Fails when ref listing or the deletion push fails.
pub fn prune_destination(
    worker: &Worker,
    cfg: &RunConfig,
    in_scope_branches: &[String],
    source_tags: &[String],
) -> Result<u32, PruneError> {
    let mut deletions: Vec<String> = Vec::new();

    if cfg.prune_tags {
        let source: HashSet<&str> = source_tags.iter().map(String::as_str).collect();
        for tag in list_remote(worker, "--tags", "refs/tags/")? {
            if !cfg.tags.passes(&tag) || !source.contains(tag.as_str()) {
                deletions.push(format!(":refs/tags/{tag}"));
            }
        }
    }

    if cfg.prune_branches {
        let in_scope: HashSet<&str> = in_scope_branches.iter().map(String::as_str).collect();
        let head = destination_head(worker)?;
        for branch in list_remote(worker, "--heads", "refs/heads/")? {
            if in_scope.contains(branch.as_str()) {
                continue;
            }
            if head.as_deref() == Some(branch.as_str()) {
                eprintln!(
                    "warning: not pruning branch {branch:?}: it is the destination HEAD"
                );
                continue;
            }
            deletions.push(format!(":refs/heads/{branch}"));
        }
    }

    if deletions.is_empty() {
        return Ok(0);
    }

    let mut args = vec!["push"];
    if cfg.atomic_push {
        args.push("--atomic");
    }
    args.push("destination");
    args.extend(deletions.iter().map(String::as_str));
    worker.repo().run(&args).map_err(PruneError::Push)?;

    Ok(deletions.len() as u32)
}

/// Lists destination ref short names of one kind, ignoring peeled entries.
fn list_remote(worker: &Worker, kind: &str, prefix: &str) -> Result<Vec<String>, PruneError> {
    let lines = worker
        .repo()
        .lines(&["ls-remote", kind, "destination"])
        .map_err(PruneError::List)?;
    let mut names = Vec::with_capacity(lines.len());
    for line in lines {
        let Some((_, refname)) = line.split_once('\t') else {
            continue;
        };
        if refname.ends_with("^{}") {
            continue;
        }
        if let Some(short) = refname.strip_prefix(prefix) {
            names.push(short.to_string());
        }
    }
    Ok(names)
}

/// The branch name the destination's HEAD points at, if any.
fn destination_head(worker: &Worker) -> Result<Option<String>, PruneError> {
    let lines = worker
        .repo()
        .lines(&["ls-remote", "--symref", "destination", "HEAD"])
        .map_err(PruneError::List)?;
    for line in lines {
        if let Some(rest) = line.strip_prefix("ref: refs/heads/") {
            if let Some((branch, _)) = rest.split_once('\t') {
                return Ok(Some(branch.to_string()));
            }
        }
    }
    Ok(None)
}
