//! Incremental git history rewriting into a destination repository.
//!
//! A set of history-rewrite filters is applied to every included branch of
//! a source repository; the original-to-rewritten commit mapping persists
//! across runs so only newly added commits are rewritten; tags are remapped
//! onto rewritten commits; and the result is published to a destination
//! repository, optionally pruning refs that fell out of the filtered view.
//!
//! The external `git` tool does all repository work; this crate supplies
//! the incremental bookkeeping around it: the persistent mapping store, the
//! per-branch delta selection, the tag remap walk, destination
//! reconciliation, and the exclusive-run guard over the shared working
//! area. See [`rewrite`] for the pipeline breakdown.

pub mod rewrite;

pub use rewrite::{
    run, BranchOutcome, BranchReport, ConfigError, ErrorKind, FilterSpec, FilterSpecError,
    RefMatcher, RefPattern, RunConfig, RunError, RunReport, TagPlan,
};
