//! The original-to-rewritten commit mapping.
//!
//! The authoritative mapping lives in the worker repo as a `filter.map`
//! blob in the tree of `refs/filter-branch/state`, one
//! `originalSha:rewrittenSha` entry per line, appended to by the rewrite
//! engine across runs. For tag remapping the blob is snapshotted to a
//! transient file next to the worker and loaded into a hash map for random
//! lookups.
//!
//! A missing state ref loads as an empty map: nothing has ever been
//! rewritten, so every lookup misses.

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use super::errors::MapError;
use super::worker::{Worker, STATE_REF};

/// In-memory snapshot of `filter.map`, keyed by original commit id.
#[derive(Debug, Default)]
pub struct CommitMap {
    entries: HashMap<String, String>,
}

impl CommitMap {
    /// Extracts the map blob from the state ref into `snapshot_path` and
    /// loads it. A missing state ref yields an empty map.
    ///
    /// # Errors
    /// Fails if the blob cannot be read, the snapshot cannot be written,
    /// or a line is malformed.
    pub fn materialize(worker: &Worker, snapshot_path: &Path) -> Result<Self, MapError> {
        let state = worker
            .repo()
            .try_rev(STATE_REF)
            .map_err(MapError::Extract)?;
        if state.is_none() {
            return Ok(Self::default());
        }
        let blob = format!("{STATE_REF}:filter.map");
        let text = worker
            .repo()
            .output(&["cat-file", "blob", &blob])
            .map_err(MapError::Extract)?;
        fs::write(snapshot_path, &text).map_err(|source| MapError::Write {
            path: snapshot_path.to_path_buf(),
            source,
        })?;
        Self::parse(&text)
    }

    /// Parses map text, one `original:rewritten` pair per line.
    ///
    /// A line with an empty rewritten half means the engine processed the
    /// commit but it collapsed to nothing (a pruned chain down to the
    /// root); such commits are unmapped for lookup purposes.
    ///
    /// # Errors
    /// Fails on any line without a `:` or with an empty original half.
    pub fn parse(text: &str) -> Result<Self, MapError> {
        let mut entries = HashMap::new();
        for (idx, line) in text.lines().enumerate() {
            if line.is_empty() {
                continue;
            }
            let Some((original, rewritten)) = line.split_once(':') else {
                return Err(MapError::MalformedLine { line: idx + 1 });
            };
            if original.is_empty() {
                return Err(MapError::MalformedLine { line: idx + 1 });
            }
            if rewritten.is_empty() {
                continue;
            }
            entries.insert(original.to_string(), rewritten.to_string());
        }
        Ok(Self { entries })
    }

    /// Looks up the rewritten commit for `original`.
    #[must_use]
    pub fn lookup(&self, original: &str) -> Option<&str> {
        self.entries.get(original).map(String::as_str)
    }

    /// Number of mapped commits.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
