//! Error types for the rewrite pipeline stages.
//!
//! Errors are stage-specific so diagnostics stay precise; the top-level
//! [`RunError`] wraps them and classifies every failure into one of the
//! operator-facing kinds. All failures are fatal except the tag-remap miss,
//! which is a warning emitted inline by the tag mapper and never an error
//! value.
//!
//! # Design Notes
//! - Git child-process failures keep the child's stderr in the message so
//!   the operator sees what `git` said without extra plumbing.
//! - A corrupt worker repo is rebuilt silently; `WorkerCorrupt` surfaces
//!   only when the rebuild itself fails.

use std::fmt;
use std::io;
use std::path::PathBuf;

use super::config::ConfigError;
use super::filter_spec::FilterSpecError;
use super::git::GitError;
use super::lock::LockError;
use super::ref_match::PatternError;

/// Operator-facing failure classification.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorKind {
    Usage,
    Environment,
    InvalidFilter,
    ConfigConflict,
    SourceUnavailable,
    WorkerCorrupt,
    RewriteFailure,
    PushFailure,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Usage => write!(f, "UsageError"),
            Self::Environment => write!(f, "EnvironmentError"),
            Self::InvalidFilter => write!(f, "InvalidFilter"),
            Self::ConfigConflict => write!(f, "ConfigConflict"),
            Self::SourceUnavailable => write!(f, "SourceUnavailable"),
            Self::WorkerCorrupt => write!(f, "WorkerCorrupt"),
            Self::RewriteFailure => write!(f, "RewriteFailure"),
            Self::PushFailure => write!(f, "PushFailure"),
        }
    }
}

/// Errors from source mirror maintenance.
#[derive(Debug)]
#[non_exhaustive]
pub enum MirrorError {
    /// Fresh mirror clone failed.
    Clone(GitError),
    /// Removing a stale or corrupt mirror directory failed.
    Remove { path: PathBuf, source: io::Error },
    /// The source has no branches at all.
    NoBranches,
    /// Ref enumeration in the mirror failed.
    List(GitError),
}

impl fmt::Display for MirrorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Clone(err) => write!(f, "mirror clone failed: {err}"),
            Self::Remove { path, source } => {
                write!(f, "cannot remove mirror {}: {source}", path.display())
            }
            Self::NoBranches => write!(f, "source repository has no branches"),
            Self::List(err) => write!(f, "mirror ref enumeration failed: {err}"),
        }
    }
}

impl std::error::Error for MirrorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Clone(err) | Self::List(err) => Some(err),
            Self::Remove { source, .. } => Some(source),
            Self::NoBranches => None,
        }
    }
}

/// Errors from worker repo initialization and maintenance.
#[derive(Debug)]
#[non_exhaustive]
pub enum WorkerError {
    /// Building a fresh worker repo failed (after removing any partial one).
    Init(GitError),
    /// Removing a corrupt or partial worker directory failed.
    Remove { path: PathBuf, source: io::Error },
}

impl fmt::Display for WorkerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Init(err) => write!(f, "worker repo rebuild failed: {err}"),
            Self::Remove { path, source } => {
                write!(f, "cannot remove worker {}: {source}", path.display())
            }
        }
    }
}

impl std::error::Error for WorkerError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Init(err) => Some(err),
            Self::Remove { source, .. } => Some(source),
        }
    }
}

/// Errors from the commit-mapping snapshot.
#[derive(Debug)]
#[non_exhaustive]
pub enum MapError {
    /// Reading the map blob out of the state ref failed.
    Extract(GitError),
    /// Writing the transient snapshot file failed.
    Write { path: PathBuf, source: io::Error },
    /// A map line is not `<original>:<rewritten>`.
    MalformedLine { line: usize },
}

impl fmt::Display for MapError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Extract(err) => write!(f, "cannot extract commit map: {err}"),
            Self::Write { path, source } => {
                write!(f, "cannot write map snapshot {}: {source}", path.display())
            }
            Self::MalformedLine { line } => {
                write!(f, "commit map line {line} is malformed")
            }
        }
    }
}

impl std::error::Error for MapError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Extract(err) => Some(err),
            Self::Write { source, .. } => Some(source),
            Self::MalformedLine { .. } => None,
        }
    }
}

/// Errors from one branch rewrite.
#[derive(Debug)]
#[non_exhaustive]
pub enum RewriteError {
    /// Fetching the branch delta from the source remote failed.
    Fetch { branch: String, source: GitError },
    /// Ref plumbing around the engine run failed.
    Git(GitError),
    /// Removing the transient engine scratch failed.
    Scratch { path: PathBuf, source: io::Error },
    /// The engine exited with an error other than the
    /// "nothing to rewrite" escape.
    Engine { branch: String, code: Option<i32> },
    /// The commit-map snapshot could not be built for tag remapping.
    Map(MapError),
}

impl fmt::Display for RewriteError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Fetch { branch, source } => {
                write!(f, "fetching branch {branch:?} failed: {source}")
            }
            Self::Git(err) => write!(f, "{err}"),
            Self::Scratch { path, source } => {
                write!(f, "cannot remove scratch {}: {source}", path.display())
            }
            Self::Engine { branch, code } => match code {
                Some(code) => write!(
                    f,
                    "rewrite engine failed on branch {branch:?} (exit status {code})"
                ),
                None => write!(f, "rewrite engine killed on branch {branch:?}"),
            },
            Self::Map(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for RewriteError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Fetch { source, .. } => Some(source),
            Self::Git(err) => Some(err),
            Self::Scratch { source, .. } => Some(source),
            Self::Engine { .. } => None,
            Self::Map(err) => Some(err),
        }
    }
}

/// The combined destination publish failed.
#[derive(Debug)]
pub struct PublishError(pub GitError);

impl fmt::Display for PublishError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "destination push failed: {}", self.0)
    }
}

impl std::error::Error for PublishError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.0)
    }
}

/// Errors from the destination prune passes.
#[derive(Debug)]
#[non_exhaustive]
pub enum PruneError {
    /// Listing destination refs failed.
    List(GitError),
    /// The deletion push failed.
    Push(GitError),
    /// Dropping a stale worker-local converted tag failed.
    WorkerTag(GitError),
}

impl fmt::Display for PruneError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::List(err) => write!(f, "destination ref listing failed: {err}"),
            Self::Push(err) => write!(f, "prune push failed: {err}"),
            Self::WorkerTag(err) => write!(f, "stale converted-tag cleanup failed: {err}"),
        }
    }
}

impl std::error::Error for PruneError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::List(err) | Self::Push(err) | Self::WorkerTag(err) => Some(err),
        }
    }
}

/// Top-level failure of one run.
///
/// `Display` is the one-line explanation the CLI prints to stderr,
/// prefixed with the [`ErrorKind`].
#[derive(Debug)]
#[non_exhaustive]
pub enum RunError {
    /// `git` is not invocable.
    GitMissing,
    /// Working-area root cannot be created.
    WorkdirCreate { path: PathBuf, source: io::Error },
    /// Bad ref pattern in a whitelist/blacklist.
    Pattern(PatternError),
    Filter(FilterSpecError),
    Config(ConfigError),
    Lock(LockError),
    Mirror(MirrorError),
    /// No source branch passes the branch matcher.
    NoBranchesInScope,
    Worker(WorkerError),
    Rewrite(RewriteError),
    Publish(PublishError),
    Prune(PruneError),
}

impl RunError {
    /// The operator-facing classification of this failure.
    #[must_use]
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::GitMissing => ErrorKind::Environment,
            Self::WorkdirCreate { .. } => ErrorKind::Environment,
            Self::Pattern(_) => ErrorKind::Usage,
            Self::Filter(_) => ErrorKind::InvalidFilter,
            Self::Config(_) => ErrorKind::ConfigConflict,
            Self::Lock(_) => ErrorKind::Environment,
            Self::Mirror(_) => ErrorKind::SourceUnavailable,
            Self::NoBranchesInScope => ErrorKind::SourceUnavailable,
            Self::Worker(_) => ErrorKind::WorkerCorrupt,
            Self::Rewrite(_) | Self::Prune(PruneError::WorkerTag(_)) => ErrorKind::RewriteFailure,
            Self::Publish(_) | Self::Prune(_) => ErrorKind::PushFailure,
        }
    }
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: ", self.kind())?;
        match self {
            Self::GitMissing => write!(f, "git is not available on PATH"),
            Self::WorkdirCreate { path, source } => {
                write!(f, "cannot create workdir {}: {source}", path.display())
            }
            Self::Pattern(err) => write!(f, "{err}"),
            Self::Filter(err) => write!(f, "{err}"),
            Self::Config(err) => write!(f, "{err}"),
            Self::Lock(err) => write!(f, "{err}"),
            Self::Mirror(err) => write!(f, "{err}"),
            Self::NoBranchesInScope => write!(f, "no source branch passes the branch matcher"),
            Self::Worker(err) => write!(f, "{err}"),
            Self::Rewrite(err) => write!(f, "{err}"),
            Self::Publish(err) => write!(f, "{err}"),
            Self::Prune(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for RunError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::GitMissing | Self::NoBranchesInScope => None,
            Self::WorkdirCreate { source, .. } => Some(source),
            Self::Pattern(err) => Some(err),
            Self::Filter(err) => Some(err),
            Self::Config(err) => Some(err),
            Self::Lock(err) => Some(err),
            Self::Mirror(err) => Some(err),
            Self::Worker(err) => Some(err),
            Self::Rewrite(err) => Some(err),
            Self::Publish(err) => Some(err),
            Self::Prune(err) => Some(err),
        }
    }
}

impl From<FilterSpecError> for RunError {
    fn from(err: FilterSpecError) -> Self {
        Self::Filter(err)
    }
}

impl From<ConfigError> for RunError {
    fn from(err: ConfigError) -> Self {
        Self::Config(err)
    }
}

impl From<LockError> for RunError {
    fn from(err: LockError) -> Self {
        Self::Lock(err)
    }
}

impl From<MirrorError> for RunError {
    fn from(err: MirrorError) -> Self {
        Self::Mirror(err)
    }
}

impl From<WorkerError> for RunError {
    fn from(err: WorkerError) -> Self {
        Self::Worker(err)
    }
}

impl From<RewriteError> for RunError {
    fn from(err: RewriteError) -> Self {
        Self::Rewrite(err)
    }
}

impl From<PublishError> for RunError {
    fn from(err: PublishError) -> Self {
        Self::Publish(err)
    }
}

impl From<PruneError> for RunError {
    fn from(err: PruneError) -> Self {
        Self::Prune(err)
    }
}

impl From<PatternError> for RunError {
    fn from(err: PatternError) -> Self {
        Self::Pattern(err)
    }
}
