//! Source mirror maintenance.
//!
//! The mirror is a bare `--mirror` clone of the source repository, kept in
//! the working area so repeated runs fetch deltas instead of recloning.
//! A refresh failure or a corrupt directory demotes to a fresh clone; the
//! mirror is disposable by construction, all durable state lives in the
//! worker repo.
//!
//! After `ensure` returns, the mirror's refs are an exact copy of the
//! source's refs at run start.

use std::ffi::OsString;
use std::fs;
use std::path::{Path, PathBuf};

use super::errors::MirrorError;
use super::git::{self, Repo};

/// A refreshed bare mirror of the source repository.
#[derive(Debug)]
pub struct Mirror {
    repo: Repo,
}

impl Mirror {
    /// Ensures a fresh mirror of `source_url` at `dir`.
    ///
    /// An existing usable mirror is refreshed with a prune-fetch of all
    /// remote refs. If the refresh fails, or the directory is absent or
    /// corrupt, the directory is removed and recloned from scratch.
    ///
    /// # Errors
    /// Fails when the fallback clone fails (`SourceUnavailable` territory)
    /// or a stale directory cannot be removed.
    pub fn ensure(dir: &Path, source_url: &str, allow_hardlinks: bool) -> Result<Self, MirrorError> {
        let repo = Repo::new(dir);
        if repo.is_usable() {
            match repo.run(&["remote", "update", "--prune"]) {
                Ok(()) => return Ok(Self { repo }),
                Err(err) => {
                    eprintln!("mirror refresh failed, recloning: {err}");
                }
            }
        }
        if dir.exists() {
            fs::remove_dir_all(dir).map_err(|source| MirrorError::Remove {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        clone_mirror(dir, source_url, allow_hardlinks)?;
        Ok(Self { repo })
    }

    /// The mirror directory; the worker's `source` remote points here.
    #[must_use]
    pub fn path(&self) -> &Path {
        self.repo.dir()
    }

    /// Enumerates source branch names (short, without `refs/heads/`).
    ///
    /// # Errors
    /// Fails if enumeration fails or the source has no branches at all.
    pub fn branches(&self) -> Result<Vec<String>, MirrorError> {
        let branches = self
            .repo
            .lines(&["for-each-ref", "--format=%(refname:short)", "refs/heads"])
            .map_err(MirrorError::List)?;
        if branches.is_empty() {
            return Err(MirrorError::NoBranches);
        }
        Ok(branches)
    }

    /// Enumerates source tag names (short, without `refs/tags/`).
    ///
    /// This is the "tags seen this run" set the publisher and pruner
    /// reconcile against.
    ///
    /// # Errors
    /// Fails if enumeration fails. No tags is a normal outcome.
    pub fn tags(&self) -> Result<Vec<String>, MirrorError> {
        self.repo
            .lines(&["for-each-ref", "--format=%(refname:short)", "refs/tags"])
            .map_err(MirrorError::List)
    }
}

fn clone_mirror(dir: &Path, source_url: &str, allow_hardlinks: bool) -> Result<(), MirrorError> {
    let mut args: Vec<OsString> = vec!["clone".into(), "--mirror".into()];
    if !allow_hardlinks {
        args.push("--no-hardlinks".into());
    }
    args.push(source_url.into());
    args.push(PathBuf::from(dir).into_os_string());
    git::run_bare(&args).map_err(MirrorError::Clone)
}
