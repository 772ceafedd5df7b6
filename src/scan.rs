//! Source file collection.
//!
//! First step of the conversion: turn the configured source into a sorted,
//! de-duplicated list of candidate photo paths.
//!
//! ## Rules
//!
//! - A single file given as the source is accepted iff its name matches the
//!   include glob.
//! - A directory is walked one level deep, or to unbounded depth when
//!   `recursive` is set. Symlinks are followed only when `follow_links` is set.
//! - A directory whose path contains any exclude substring is pruned together
//!   with its whole subtree. The same substrings also filter matched files.
//!   Matching is case-insensitive on Windows and case-sensitive elsewhere.
//! - Entries that cannot be visited are logged and skipped.
//! - The cancellation token is polled between entries. A cancelled walk
//!   returns [`Collected::Interrupted`]; callers abort instead of using it.
//!
//! The final list is sorted so that downstream ordering is deterministic.

use crate::cancel::CancelToken;
use crate::config::SourceConfig;
use globset::{GlobBuilder, GlobMatcher};
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::{DirEntry, WalkDir};

#[derive(Error, Debug)]
pub enum ScanError {
    #[error("Invalid include glob: {0}")]
    Glob(#[from] globset::Error),
    #[error("Source not found: {0}")]
    SourceNotFound(PathBuf),
}

/// Result of a collection walk.
#[derive(Debug, PartialEq, Eq)]
pub enum Collected {
    Complete(Vec<PathBuf>),
    /// Cancellation was observed; holds what had been found so far.
    Interrupted(Vec<PathBuf>),
}

/// Compiled include/exclude rules.
struct Filter<'a> {
    include: GlobMatcher,
    exclude: Vec<&'a str>,
}

impl<'a> Filter<'a> {
    fn new(source: &'a SourceConfig) -> Result<Self, ScanError> {
        let include = GlobBuilder::new(&source.include)
            .case_insensitive(cfg!(windows))
            .literal_separator(true)
            .build()?
            .compile_matcher();
        Ok(Self {
            include,
            exclude: source.exclude_patterns(),
        })
    }

    fn is_included(&self, path: &Path) -> bool {
        path.file_name()
            .is_some_and(|name| self.include.is_match(Path::new(name)))
    }

    fn is_excluded(&self, path: &Path) -> bool {
        let haystack = path.to_string_lossy();
        self.exclude.iter().any(|needle| {
            if cfg!(windows) {
                haystack.to_lowercase().contains(&needle.to_lowercase())
            } else {
                haystack.contains(needle)
            }
        })
    }

    fn accepts(&self, path: &Path) -> bool {
        self.is_included(path) && !self.is_excluded(path)
    }
}

/// Collect candidate photo files for a run.
pub fn collect(source: &SourceConfig, cancel: &CancelToken) -> Result<Collected, ScanError> {
    let filter = Filter::new(source)?;
    let root = source.dir.as_path();

    if !root.exists() {
        return Err(ScanError::SourceNotFound(root.to_path_buf()));
    }

    if root.is_file() {
        let files = if filter.is_included(root) {
            vec![root.to_path_buf()]
        } else {
            vec![]
        };
        return Ok(Collected::Complete(files));
    }

    let max_depth = if source.recursive { usize::MAX } else { 1 };
    let walker = WalkDir::new(root)
        .follow_links(source.follow_links)
        .max_depth(max_depth)
        .into_iter()
        .filter_entry(|entry| !is_pruned_dir(entry, &filter));

    let mut files = Vec::new();
    for entry in walker {
        if cancel.is_cancelled() {
            tracing::info!(found = files.len(), "collection interrupted");
            files.sort();
            return Ok(Collected::Interrupted(files));
        }
        let entry = match entry {
            Ok(entry) => entry,
            Err(e) => {
                tracing::warn!(path = ?e.path(), error = %e, "skipping unreadable entry");
                continue;
            }
        };
        if entry.file_type().is_file() && filter.accepts(entry.path()) {
            files.push(entry.into_path());
        }
    }

    files.sort();
    files.dedup();
    tracing::debug!(count = files.len(), root = %root.display(), "collected files");
    Ok(Collected::Complete(files))
}

/// Directories matching an exclude substring are pruned with their subtree.
/// The walk root itself is never pruned.
fn is_pruned_dir(entry: &DirEntry, filter: &Filter) -> bool {
    entry.depth() > 0 && entry.file_type().is_dir() && filter.is_excluded(entry.path())
}
