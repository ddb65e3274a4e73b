//! Subprocess driver for the external `git` tool.
//!
//! Every interaction with a repository goes through a child `git` process;
//! no object store is read directly. Commands run with `git -C <dir>` so the
//! caller never depends on the process working directory. Stdout is captured
//! and trimmed; stderr is attached to the error when a command fails, so the
//! operator sees what `git` said.
//!
//! # Invariants
//! - No shell is involved: arguments are passed to `git` verbatim.
//! - A non-zero exit status is an error unless the caller inspects the raw
//!   [`std::process::Output`] via [`Repo::raw`].

use std::ffi::OsStr;
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

/// Returns true if a `git` binary is invocable on `PATH`.
pub fn available() -> bool {
    Command::new("git").arg("--version").output().is_ok()
}

/// Runs a `git` command that is not tied to an existing repository
/// (e.g. `clone`). Arguments may include paths.
///
/// # Errors
/// Fails if the process cannot be spawned or exits non-zero.
pub fn run_bare<S: AsRef<OsStr>>(args: &[S]) -> Result<(), GitError> {
    let output = Command::new("git")
        .args(args)
        .output()
        .map_err(|source| GitError::Spawn {
            args: join_args(args),
            source,
        })?;
    check_status(join_args(args), &output)?;
    Ok(())
}

/// Handle to a local git repository (bare or not) addressed by path.
#[derive(Clone, Debug)]
pub struct Repo {
    dir: PathBuf,
}

impl Repo {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// The repository directory this handle addresses.
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Returns true if the directory holds a usable git repository.
    ///
    /// A repository that fails `rev-parse --git-dir` is treated as corrupt
    /// and gets rebuilt by the caller.
    #[must_use]
    pub fn is_usable(&self) -> bool {
        self.dir.is_dir() && self.output(&["rev-parse", "--git-dir"]).is_ok()
    }

    /// Runs a command, discarding stdout.
    ///
    /// # Errors
    /// Fails on spawn failure or non-zero exit; stderr is carried in the error.
    pub fn run<S: AsRef<OsStr>>(&self, args: &[S]) -> Result<(), GitError> {
        self.output(args).map(|_| ())
    }

    /// Runs a command and returns trimmed UTF-8 stdout.
    ///
    /// # Errors
    /// Fails on spawn failure or non-zero exit; stderr is carried in the error.
    pub fn output<S: AsRef<OsStr>>(&self, args: &[S]) -> Result<String, GitError> {
        let output = self.raw(args).map_err(|source| GitError::Spawn {
            args: join_args(args),
            source,
        })?;
        check_status(join_args(args), &output)?;
        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }

    /// Runs a command and returns its stdout split into non-empty lines.
    ///
    /// # Errors
    /// Fails on spawn failure or non-zero exit.
    pub fn lines<S: AsRef<OsStr>>(&self, args: &[S]) -> Result<Vec<String>, GitError> {
        Ok(self
            .output(args)?
            .lines()
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect())
    }

    /// Runs a command and hands back the raw [`Output`] without status
    /// checking. Used where the exit status itself is a signal (the rewrite
    /// engine's "nothing to rewrite" escape).
    ///
    /// # Errors
    /// Fails only if the process cannot be spawned.
    pub fn raw<S: AsRef<OsStr>>(&self, args: &[S]) -> io::Result<Output> {
        self.raw_with_env(args, &[])
    }

    /// Like [`Repo::raw`], with extra environment variables set on the
    /// child process.
    ///
    /// # Errors
    /// Fails only if the process cannot be spawned.
    pub fn raw_with_env<S: AsRef<OsStr>>(
        &self,
        args: &[S],
        envs: &[(&str, &str)],
    ) -> io::Result<Output> {
        let mut cmd = Command::new("git");
        cmd.arg("-C").arg(&self.dir).args(args);
        for (key, value) in envs {
            cmd.env(key, value);
        }
        cmd.output()
    }

    /// Resolves a revision to a full commit id, or `None` if it does not
    /// exist (`rev-parse --verify --quiet` semantics).
    ///
    /// # Errors
    /// Fails only if the process cannot be spawned.
    pub fn try_rev(&self, rev: &str) -> Result<Option<String>, GitError> {
        let args = ["rev-parse", "--verify", "--quiet", rev];
        let output = self.raw(&args).map_err(|source| GitError::Spawn {
            args: join_args(&args),
            source,
        })?;
        if !output.status.success() {
            return Ok(None);
        }
        Ok(Some(
            String::from_utf8_lossy(&output.stdout).trim().to_string(),
        ))
    }

    /// Points `refname` at `target` (creating it if absent).
    ///
    /// # Errors
    /// Fails on spawn failure or non-zero exit.
    pub fn update_ref(&self, refname: &str, target: &str) -> Result<(), GitError> {
        self.run(&["update-ref", refname, target])
    }

    /// Deletes `refname`; deleting an absent ref is an error.
    ///
    /// # Errors
    /// Fails on spawn failure or non-zero exit.
    pub fn delete_ref(&self, refname: &str) -> Result<(), GitError> {
        self.run(&["update-ref", "-d", refname])
    }

    /// Enumerates full ref names under `prefix` (e.g. `refs/tags/x/`).
    ///
    /// # Errors
    /// Fails on spawn failure or non-zero exit.
    pub fn refs_with_prefix(&self, prefix: &str) -> Result<Vec<String>, GitError> {
        self.lines(&["for-each-ref", "--format=%(refname)", prefix])
    }
}

fn check_status(args: String, output: &Output) -> Result<(), GitError> {
    if output.status.success() {
        return Ok(());
    }
    Err(GitError::Exit {
        args,
        code: output.status.code(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    })
}

pub(crate) fn join_args<S: AsRef<OsStr>>(args: &[S]) -> String {
    args.iter()
        .map(|a| a.as_ref().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Failure of one `git` child process.
#[derive(Debug)]
#[non_exhaustive]
pub enum GitError {
    /// The process could not be spawned at all.
    Spawn { args: String, source: io::Error },
    /// The process exited non-zero. `stderr` is trimmed child stderr.
    Exit {
        args: String,
        code: Option<i32>,
        stderr: String,
    },
}

impl fmt::Display for GitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Spawn { args, source } => write!(f, "git {args}: spawn failed: {source}"),
            Self::Exit { args, code, stderr } => {
                match code {
                    Some(code) => write!(f, "git {args}: exit status {code}")?,
                    None => write!(f, "git {args}: killed by signal")?,
                }
                if !stderr.is_empty() {
                    write!(f, ": {stderr}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for GitError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Spawn { source, .. } => Some(source),
            Self::Exit { .. } => None,
        }
    }
}
