//! Ancestor-walk tag remapping.
//!
//! The rewrite engine only translates tags whose tagged commits fall inside
//! a rewritten range. A tag outside the mapped set (typically one whose
//! commit the filter dropped entirely) is remapped here: walk the tag's
//! ancestors in date order, bounded by the configured lookup depth, and
//! convert the tag onto the first ancestor that has a mapping. A tag with
//! no mapped ancestor inside the budget is skipped with a warning; the run
//! continues and that tag simply never reaches the destination.

use super::commit_map::CommitMap;
use super::errors::RewriteError;
use super::worker::{converted_tag_ref, Worker};

/// Outcome of one tag remap attempt.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TagMapOutcome {
    /// A converted tag now points at the mapped commit.
    Mapped,
    /// No mapped ancestor within the lookup budget; warned and skipped.
    Unmappable,
}

/// Remaps `tag` onto the rewrite of its nearest mapped ancestor.
///
/// The walk starts at the tag's own commit (annotated tags are peeled)
/// and inspects at most `lookup_depth` commits in date order.
///
/// # Errors
/// Fails on git plumbing failure; a missing mapping is not an error.
pub fn map_tag(
    worker: &Worker,
    map: &CommitMap,
    tag: &str,
    lookup_depth: u32,
) -> Result<TagMapOutcome, RewriteError> {
    let tag_ref = format!("refs/tags/{tag}^{{commit}}");
    let Some(commit) = worker.repo().try_rev(&tag_ref).map_err(RewriteError::Git)? else {
        eprintln!("warning: tag {tag:?} does not point at a commit, skipping");
        return Ok(TagMapOutcome::Unmappable);
    };

    let max_count = format!("--max-count={lookup_depth}");
    let ancestors = worker
        .repo()
        .lines(&["rev-list", "--date-order", &max_count, &commit])
        .map_err(RewriteError::Git)?;

    for ancestor in &ancestors {
        if let Some(rewritten) = map.lookup(ancestor) {
            worker
                .repo()
                .update_ref(&converted_tag_ref(tag), rewritten)
                .map_err(RewriteError::Git)?;
            return Ok(TagMapOutcome::Mapped);
        }
    }

    eprintln!(
        "warning: tag {tag:?} has no rewritten ancestor within {lookup_depth} commits, skipping"
    );
    Ok(TagMapOutcome::Unmappable)
}
