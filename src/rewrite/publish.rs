//! Destination publishing.
//!
//! One push carries everything: every in-scope branch's rewritten tip and
//! every in-scope converted tag. Branches that were up to date this run
//! still appear in the refspec; force-updating a remote ref to the commit
//! it already holds is a no-op, which is what makes repeated runs
//! idempotent on the destination. Failure is fatal with no per-ref retry.

use super::config::{RunConfig, TagPlan};
use super::errors::PublishError;
use super::worker::{converted_tag_ref, result_ref, Worker};

/// What the publish push carried.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PublishReport {
    pub branches: u32,
    pub tags: u32,
}

/// Pushes rewritten branches and converted tags to `destination`.
///
/// `branches` is the in-scope branch set of this run; `source_tags` the
/// tag names seen on the source this run. A tag is pushed when it passes
/// the tag matcher and a converted tag exists in the worker.
///
/// # Errors
/// Fails when the push fails; atomicity follows `cfg.atomic_push`.
pub fn publish(
    worker: &Worker,
    cfg: &RunConfig,
    branches: &[String],
    source_tags: &[String],
) -> Result<PublishReport, PublishError> {
    let mut refspecs = Vec::with_capacity(branches.len());
    let mut report = PublishReport::default();

    for branch in branches {
        refspecs.push(format!("{}:refs/heads/{branch}", result_ref(branch)));
        report.branches += 1;
    }

    if cfg.tag_plan != TagPlan::None {
        let converted = worker.converted_tags().map_err(PublishError)?;
        for tag in source_tags {
            if !cfg.tags.passes(tag) {
                continue;
            }
            if !converted.iter().any(|c| c == tag) {
                continue;
            }
            refspecs.push(format!("{}:refs/tags/{tag}", converted_tag_ref(tag)));
            report.tags += 1;
        }
    }

    let mut args = vec!["push", "--force"];
    if cfg.atomic_push {
        args.push("--atomic");
    }
    args.push("destination");
    args.extend(refspecs.iter().map(String::as_str));
    worker.repo().run(&args).map_err(PublishError)?;

    Ok(report)
}
