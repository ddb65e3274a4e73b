//! Per-branch incremental rewrite.
//!
//! One branch at a time: fetch the delta from the source remote, stage the
//! tip, hand the unrewritten range to the engine with the persistent state
//! branch, then advance the filtered marker. The marker
//! (`refs/heads/filter-branch/filtered/<b>`) names the *source* commit most
//! recently fully rewritten; it moves only after everything else succeeded,
//! so an interrupted or failed run retries the same delta.
//!
//! # Invariants
//! - `filter-branch/result/<b>` is force-set to the fetched tip before the
//!   engine runs, and holds the rewritten tip afterwards.
//! - A branch whose marker already equals the fetched tip performs no
//!   engine work at all.
//! - Engine stderr reaches the operator verbatim on every outcome.

use std::ffi::OsString;
use std::fs;
use std::io::{self, Write};
use std::path::Path;

use super::commit_map::CommitMap;
use super::config::{RunConfig, TagPlan};
use super::errors::RewriteError;
use super::git::{join_args, GitError};
use super::tags::{map_tag, TagMapOutcome};
use super::worker::{
    filtered_ref, originals_namespace, result_ref, source_ref, Worker, STATE_REF,
};

/// Shell command handed to the engine's tag-name filter: prefixes every
/// visited tag name into the converted-tags namespace.
const TAG_NAME_FILTER: &str = "sed -e 's!^!filter-branch/converted-tags/!'";

/// Exact stderr line the engine emits when the range holds nothing to do.
/// Other lines (state-branch progress) may surround it.
const NOTHING_TO_REWRITE: &str = "Found nothing to rewrite";

/// How one branch fared.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BranchOutcome {
    /// The engine rewrote a non-empty delta.
    Rewritten,
    /// The engine ran but found nothing to rewrite in the range.
    NothingToRewrite,
    /// The filtered marker already matched the source tip; engine skipped.
    UpToDate,
}

/// Result of processing one branch.
#[derive(Debug)]
pub struct BranchReport {
    pub branch: String,
    pub outcome: BranchOutcome,
    /// Tags converted by the ancestor-walk remap (not by the engine).
    pub remapped_tags: u32,
    /// In-scope tags that could not be mapped within the lookup budget.
    pub unmappable_tags: u32,
}

/// Runs the full per-branch sequence from delta fetch to marker advance.
///
/// `scratch` and `map_snapshot` are the transient engine scratch directory
/// and commit-map snapshot path; both are (re)created per branch and
/// removed before returning.
///
/// # Errors
/// Any failure is fatal for the run. Worker state is left in place for
/// inspection; the filtered marker is not advanced.
pub fn process_branch(
    worker: &Worker,
    cfg: &RunConfig,
    branch: &str,
    scratch: &Path,
    map_snapshot: &Path,
) -> Result<BranchReport, RewriteError> {
    let report = rewrite_branch(worker, cfg, branch, scratch, map_snapshot);

    // Transient per-branch artifacts; best-effort cleanup on all paths.
    let _ = fs::remove_dir_all(scratch);
    let _ = fs::remove_file(map_snapshot);
    let _ = worker.park_head();

    report
}

fn rewrite_branch(
    worker: &Worker,
    cfg: &RunConfig,
    branch: &str,
    scratch: &Path,
    map_snapshot: &Path,
) -> Result<BranchReport, RewriteError> {
    let repo = worker.repo();

    // Fetch the branch delta from the local mirror, keeping tags current
    // for the merged-tag enumeration below.
    repo.run(&["fetch", "--update-shallow", "--force", "--tags", "source", branch])
        .map_err(|source| RewriteError::Fetch {
            branch: branch.to_string(),
            source,
        })?;
    let fetch_head = repo
        .output(&["rev-parse", "FETCH_HEAD"])
        .map_err(RewriteError::Git)?;

    // Stage the tip as the engine's input branch and detach HEAD onto it.
    let remote_ref = format!("refs/remotes/source/{branch}");
    repo.update_ref(&source_ref(branch), &remote_ref)
        .map_err(RewriteError::Git)?;
    worker.detach_head(&fetch_head).map_err(RewriteError::Git)?;

    let last = repo
        .try_rev(&filtered_ref(branch))
        .map_err(RewriteError::Git)?;
    if last.as_deref() == Some(fetch_head.as_str()) {
        return Ok(BranchReport {
            branch: branch.to_string(),
            outcome: BranchOutcome::UpToDate,
            remapped_tags: 0,
            unmappable_tags: 0,
        });
    }

    // Stale backup refs from a previous engine run would abort the next one.
    for backup in repo
        .refs_with_prefix(&originals_namespace(branch))
        .map_err(RewriteError::Git)?
    {
        repo.delete_ref(&backup).map_err(RewriteError::Git)?;
    }
    repo.update_ref(&result_ref(branch), &fetch_head)
        .map_err(RewriteError::Git)?;
    if scratch.exists() {
        fs::remove_dir_all(scratch).map_err(|source| RewriteError::Scratch {
            path: scratch.to_path_buf(),
            source,
        })?;
    }

    let merged_tags = if cfg.tag_plan == TagPlan::None {
        Vec::new()
    } else {
        worker
            .tags_merged_into(&fetch_head)
            .map_err(RewriteError::Git)?
            .into_iter()
            .filter(|t| cfg.tags.passes(t))
            .collect()
    };

    let outcome = drive_engine(
        worker,
        cfg,
        branch,
        scratch,
        last.as_deref(),
        !merged_tags.is_empty(),
    )?;

    // Tags the engine did not visit get the ancestor-walk remap.
    let mut remapped = 0u32;
    let mut unmappable = 0u32;
    if cfg.tag_plan == TagPlan::All && !merged_tags.is_empty() {
        let converted = worker.converted_tags().map_err(RewriteError::Git)?;
        let map = CommitMap::materialize(worker, map_snapshot).map_err(RewriteError::Map)?;
        for tag in merged_tags.iter().filter(|t| !converted.contains(t)) {
            match map_tag(worker, &map, tag, cfg.tag_history_lookup)? {
                TagMapOutcome::Mapped => remapped += 1,
                TagMapOutcome::Unmappable => unmappable += 1,
            }
        }
    }

    // The source commit now fully rewritten; next run's delta starts here.
    repo.update_ref(&filtered_ref(branch), &fetch_head)
        .map_err(RewriteError::Git)?;

    Ok(BranchReport {
        branch: branch.to_string(),
        outcome,
        remapped_tags: remapped,
        unmappable_tags: unmappable,
    })
}

/// Invokes the rewrite engine for one branch and classifies its exit.
fn drive_engine(
    worker: &Worker,
    cfg: &RunConfig,
    branch: &str,
    scratch: &Path,
    last: Option<&str>,
    with_tag_filter: bool,
) -> Result<BranchOutcome, RewriteError> {
    let mut args: Vec<OsString> = vec![
        "filter-branch".into(),
        "--remap-to-ancestor".into(),
        "--state-branch".into(),
        STATE_REF.into(),
        "--original".into(),
        originals_namespace(branch).into(),
        "-d".into(),
        scratch.into(),
        "--force".into(),
    ];
    for arg in cfg.filter.engine_args() {
        args.push(arg.into());
    }
    if with_tag_filter {
        args.push("--tag-name-filter".into());
        args.push(TAG_NAME_FILTER.into());
    }
    args.push("--".into());
    let result = result_ref(branch);
    match last {
        Some(last) => args.push(format!("{last}..{result}").into()),
        None => args.push(result.into()),
    }

    let output = worker
        .repo()
        .raw_with_env(&args, &[("FILTER_BRANCH_SQUELCH_WARNING", "1")])
        .map_err(|source| {
            RewriteError::Git(GitError::Spawn {
                args: join_args(&args),
                source,
            })
        })?;

    // The engine's stderr is the operator's progress view.
    let _ = io::stderr().write_all(&output.stderr);

    if output.status.success() {
        return Ok(BranchOutcome::Rewritten);
    }
    let stderr = String::from_utf8_lossy(&output.stderr);
    if output.status.code() == Some(1)
        && stderr.lines().any(|l| l.trim() == NOTHING_TO_REWRITE)
    {
        return Ok(BranchOutcome::NothingToRewrite);
    }
    Err(RewriteError::Engine {
        branch: branch.to_string(),
        code: output.status.code(),
    })
}
