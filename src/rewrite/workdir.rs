//! Working-area layout and URL-derived directory naming.
//!
//! The working area holds, per source/destination pair:
//!
//! - `source-<digest>/`: bare mirror of the source repository, where
//!   `<digest>` identifies the source URL;
//! - `worker-<digest>/`: the long-lived bare scratch repository, where
//!   `<digest>` identifies the source/destination URL pair;
//! - `worker-<digest>.lock`: the exclusive-run sentinel;
//! - `worker-<digest>.filter-branch/`: transient engine scratch, removed
//!   before each rewrite;
//! - `worker-<digest>.map`: transient snapshot of the commit mapping.
//!
//! Digests are the first 16 hex characters of a BLAKE3 hash. The worker
//! digest hashes `source_url || NUL || destination_url`; the NUL separator
//! keeps the pair encoding unambiguous. This naming is identity only, not
//! security.

use std::path::{Path, PathBuf};

/// Hex length of a directory digest (64 bits).
const DIGEST_HEX_LEN: usize = 16;

/// Resolved paths of one run's working area.
#[derive(Clone, Debug)]
pub struct Workdir {
    root: PathBuf,
    mirror_digest: String,
    worker_digest: String,
}

impl Workdir {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, source_url: &str, destination_url: &str) -> Self {
        let mut pair = Vec::with_capacity(source_url.len() + destination_url.len() + 1);
        pair.extend_from_slice(source_url.as_bytes());
        pair.push(0);
        pair.extend_from_slice(destination_url.as_bytes());
        Self {
            root: root.into(),
            mirror_digest: short_digest(source_url.as_bytes()),
            worker_digest: short_digest(&pair),
        }
    }

    /// The working-area root (created on demand by the pipeline).
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `source-<digest>/`: the bare mirror of the source repository.
    #[must_use]
    pub fn mirror_dir(&self) -> PathBuf {
        self.root.join(format!("source-{}", self.mirror_digest))
    }

    /// `worker-<digest>/`: the bare scratch repository.
    #[must_use]
    pub fn worker_dir(&self) -> PathBuf {
        self.root.join(format!("worker-{}", self.worker_digest))
    }

    /// `worker-<digest>.lock`: the exclusive-run sentinel file.
    #[must_use]
    pub fn lock_path(&self) -> PathBuf {
        self.root.join(format!("worker-{}.lock", self.worker_digest))
    }

    /// `worker-<digest>.filter-branch/`: transient engine scratch.
    #[must_use]
    pub fn scratch_dir(&self) -> PathBuf {
        self.root
            .join(format!("worker-{}.filter-branch", self.worker_digest))
    }

    /// `worker-<digest>.map`: transient commit-mapping snapshot.
    #[must_use]
    pub fn map_path(&self) -> PathBuf {
        self.root.join(format!("worker-{}.map", self.worker_digest))
    }
}

fn short_digest(bytes: &[u8]) -> String {
    let hash = blake3::hash(bytes);
    let mut out = String::with_capacity(DIGEST_HEX_LEN);
    for b in &hash.as_bytes()[..DIGEST_HEX_LEN / 2] {
        out.push_str(&format!("{b:02x}"));
    }
    out
}
