//! Incremental history-rewrite pipeline.
//!
//! Rewrites every included branch of a source repository through an
//! external history-rewrite engine and publishes the result to a
//! destination repository. The original-to-rewritten commit mapping persists
//! in a worker repository between runs, so re-runs only rewrite commits
//! added since the last run.
//!
//! Pipeline overview:
//! 1. `lock` serializes runs sharing a worker directory.
//! 2. `mirror` refreshes a bare mirror of the source and enumerates refs.
//! 3. `ref_match` selects in-scope branches and tags.
//! 4. `worker` maintains the bare scratch repo, its remotes, and the
//!    persistent ref namespace.
//! 5. `branch` fetches each branch delta and drives the engine with the
//!    persistent state branch.
//! 6. `tags` remaps tags the engine could not translate by walking
//!    ancestors against the commit map.
//! 7. `publish` pushes branch and tag updates in one operation.
//! 8. `prune` reconciles destination refs with the filtered source view.
//!
//! # Invariants
//! - The filtered marker of a branch moves only after that branch's delta
//!   was fully rewritten.
//! - The commit mapping is append-only across successful runs.
//! - Destination refs are only mutated by `publish` and `prune`.

pub mod branch;
pub mod commit_map;
pub mod config;
pub mod errors;
pub mod filter_spec;
pub mod git;
pub mod lock;
pub mod mirror;
pub mod prune;
pub mod publish;
pub mod ref_match;
pub mod run;
pub mod tags;
pub mod workdir;
pub mod worker;

pub use branch::{BranchOutcome, BranchReport};
pub use commit_map::CommitMap;
pub use config::{ConfigError, RunConfig, TagPlan, DEFAULT_TAG_HISTORY_LOOKUP};
pub use errors::{ErrorKind, RunError};
pub use filter_spec::{FilterSpec, FilterSpecError};
pub use lock::RunLock;
pub use ref_match::{PatternError, RefMatcher, RefPattern};
pub use run::{run, RunReport};
pub use tags::TagMapOutcome;
pub use workdir::Workdir;
