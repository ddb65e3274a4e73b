//! Worker repo maintenance and ref-namespace helpers.
//!
//! The worker is a long-lived bare repository that hosts everything the
//! rewrite pipeline persists between runs:
//!
//! - `refs/remotes/source/<b>`: pristine source branch tips after fetch;
//! - `refs/heads/filter-branch/source/<b>`: the commit staged for the
//!   engine;
//! - `refs/heads/filter-branch/result/<b>`: the rewritten tip;
//! - `refs/heads/filter-branch/filtered/<b>`: the source commit most
//!   recently fully rewritten (the incremental watermark);
//! - `refs/filter-branch/originals/<b>/...`: engine backup refs;
//! - `refs/filter-branch/state`: the run-spanning commit mapping;
//! - `refs/tags/filter-branch/converted-tags/<t>`: rewritten tags.
//!
//! `HEAD` is parked on the `refs/none` sentinel whenever no branch is
//! active, so fetches and ref resets can never touch a checked-out ref.
//!
//! A worker that fails the usability probe is rebuilt from scratch; the
//! rebuild loses no rewrite state it did not already lose (the state ref
//! lived inside the broken repo). A rebuild failure is the only thing
//! surfaced to the operator.

use std::ffi::OsString;
use std::fs;
use std::path::Path;

use super::errors::WorkerError;
use super::git::{GitError, Repo};

/// Ref carrying the authoritative original-to-rewritten commit mapping.
pub const STATE_REF: &str = "refs/filter-branch/state";

/// Symbolic-ref target parking `HEAD` between branch rewrites.
pub const HEAD_SENTINEL: &str = "refs/none";

/// Short tag-name prefix of converted tags (under `refs/tags/`).
pub const CONVERTED_TAG_PREFIX: &str = "filter-branch/converted-tags/";

/// `refs/heads/filter-branch/source/<branch>`
#[must_use]
pub fn source_ref(branch: &str) -> String {
    format!("refs/heads/filter-branch/source/{branch}")
}

/// `refs/heads/filter-branch/result/<branch>`
#[must_use]
pub fn result_ref(branch: &str) -> String {
    format!("refs/heads/filter-branch/result/{branch}")
}

/// `refs/heads/filter-branch/filtered/<branch>`
#[must_use]
pub fn filtered_ref(branch: &str) -> String {
    format!("refs/heads/filter-branch/filtered/{branch}")
}

/// `refs/filter-branch/originals/<branch>` (a namespace, not a single ref)
#[must_use]
pub fn originals_namespace(branch: &str) -> String {
    format!("refs/filter-branch/originals/{branch}")
}

/// `refs/tags/filter-branch/converted-tags/<tag>`
#[must_use]
pub fn converted_tag_ref(tag: &str) -> String {
    format!("refs/tags/{CONVERTED_TAG_PREFIX}{tag}")
}

/// The long-lived bare scratch repository.
#[derive(Debug)]
pub struct Worker {
    repo: Repo,
}

impl Worker {
    /// Ensures a usable worker repo at `dir`.
    ///
    /// A directory that passes the usability probe is reused as-is.
    /// Otherwise any remains are removed and the worker is built fresh:
    /// bare init, `source` remote pointing at the local mirror,
    /// `destination` remote pointing at the destination URL, a prune-fetch
    /// of `destination`, and `HEAD` parked on the sentinel. A failed build
    /// removes the partial directory before surfacing the error.
    ///
    /// # Errors
    /// Fails when the rebuild fails or remains cannot be removed.
    pub fn ensure(dir: &Path, mirror_path: &Path, destination_url: &str) -> Result<Self, WorkerError> {
        let repo = Repo::new(dir);
        if repo.is_usable() {
            return Ok(Self { repo });
        }
        if dir.exists() {
            fs::remove_dir_all(dir).map_err(|source| WorkerError::Remove {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let built = Self::build(&repo, dir, mirror_path, destination_url);
        if let Err(err) = built {
            let _ = fs::remove_dir_all(dir);
            return Err(WorkerError::Init(err));
        }
        Ok(Self { repo })
    }

    fn build(
        repo: &Repo,
        dir: &Path,
        mirror_path: &Path,
        destination_url: &str,
    ) -> Result<(), GitError> {
        let init: Vec<OsString> = vec!["init".into(), "--bare".into(), dir.into()];
        super::git::run_bare(&init)?;
        let add_source: Vec<OsString> =
            vec!["remote".into(), "add".into(), "source".into(), mirror_path.into()];
        repo.run(&add_source)?;
        repo.run(&["remote", "add", "destination", destination_url])?;
        repo.run(&["fetch", "--prune", "destination"])?;
        repo.run(&["symbolic-ref", "HEAD", HEAD_SENTINEL])?;
        Ok(())
    }

    /// The underlying repository handle.
    #[must_use]
    pub fn repo(&self) -> &Repo {
        &self.repo
    }

    /// Detaches `HEAD` directly onto `commit`.
    ///
    /// # Errors
    /// Fails on git plumbing failure.
    pub fn detach_head(&self, commit: &str) -> Result<(), GitError> {
        self.repo
            .run(&["update-ref", "--no-deref", "HEAD", commit])
    }

    /// Parks `HEAD` on the sentinel, marking no branch as active.
    ///
    /// # Errors
    /// Fails on git plumbing failure.
    pub fn park_head(&self) -> Result<(), GitError> {
        self.repo.run(&["symbolic-ref", "HEAD", HEAD_SENTINEL])
    }

    /// Short names of the worker's converted tags (prefix stripped).
    ///
    /// # Errors
    /// Fails on git plumbing failure.
    pub fn converted_tags(&self) -> Result<Vec<String>, GitError> {
        let prefix = format!("refs/tags/{CONVERTED_TAG_PREFIX}");
        Ok(self
            .repo
            .refs_with_prefix(&prefix)?
            .into_iter()
            .filter_map(|r| r.strip_prefix(&prefix).map(str::to_string))
            .collect())
    }

    /// Tags merged into `commit`, excluding the converted-tag namespace.
    ///
    /// # Errors
    /// Fails on git plumbing failure.
    pub fn tags_merged_into(&self, commit: &str) -> Result<Vec<String>, GitError> {
        Ok(self
            .repo
            .lines(&["tag", "--merged", commit])?
            .into_iter()
            .filter(|t| !t.starts_with("filter-branch/"))
            .collect())
    }
}
