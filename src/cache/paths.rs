//! Cache directory path management
//!
//! This module provides the `CachePaths` struct which manages all filesystem
//! paths for the cache directory layout:
//!
//! ```text
//! ~/.cache/hubget/
//! ├── model--openai--clip-vit-base-patch16/
//! │   ├── blobs/<contentTag>              # One file per unique content tag
//! │   ├── refs/<revisionName>             # Plain text commit hash
//! │   └── snapshots/<commitHash>/<file>   # Symlink or copy to a blob
//! └── .locks/
//!     └── model--openai--clip-vit-base-patch16/
//!         └── <contentTag>.lock           # flock-based per-blob locking
//! ```

use std::path::{Component, Path, PathBuf};

use crate::config::{REPO_ID_SEPARATOR, default_cache_dir};
use crate::error::HubError;
use crate::types::{ContentTag, RepoId, RepoType};

/// Serialize a repo id and type into a single non-nested folder name.
pub fn repo_folder_name(repo: &RepoId, repo_type: RepoType) -> String {
    [repo_type.as_str(), repo.owner.as_str(), repo.name.as_str()].join(REPO_ID_SEPARATOR)
}

/// Validate a relative filename coming from the caller (or a repo listing)
/// and turn it into a relative path.
///
/// Traversal segments are rejected here, before any path is constructed and
/// before any filesystem or network operation runs.
pub fn relative_filename(filename: &str) -> Result<PathBuf, HubError> {
    if filename.is_empty() {
        return Err(HubError::Configuration("filename cannot be empty".to_string()));
    }

    // Anything but plain forward components (absolute paths, drive
    // prefixes, `..` segments) would leave the snapshot directory.
    let relative = PathBuf::from(filename);
    for component in relative.components() {
        match component {
            Component::Normal(_) | Component::CurDir => {}
            _ => {
                return Err(HubError::PathEscape {
                    path: relative.clone(),
                    root: PathBuf::from("."),
                });
            }
        }
    }

    Ok(relative)
}

/// Lexically normalize a path: drop `.` components and fold `..` into the
/// preceding component. No filesystem access, so it works for paths that do
/// not exist yet.
pub(crate) fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other),
        }
    }
    out
}

/// Manages all filesystem paths for the cache directory layout
#[derive(Debug, Clone)]
pub struct CachePaths {
    root: PathBuf,
}

impl CachePaths {
    /// Creates a new CachePaths with the specified root directory
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Returns the root cache directory
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the locks directory path: `{root}/.locks`
    pub fn locks_dir(&self) -> PathBuf {
        self.root.join(".locks")
    }

    /// Returns the path helper for one repository's storage folder
    pub fn repo(&self, repo: &RepoId, repo_type: RepoType) -> RepoPaths {
        let folder = repo_folder_name(repo, repo_type);
        RepoPaths {
            storage: self.root.join(&folder),
            locks: self.locks_dir().join(&folder),
        }
    }
}

impl Default for CachePaths {
    fn default() -> Self {
        Self::new(default_cache_dir())
    }
}

/// Paths inside a single repository's storage folder
#[derive(Debug, Clone)]
pub struct RepoPaths {
    storage: PathBuf,
    locks: PathBuf,
}

impl RepoPaths {
    /// The repository's storage folder: `{root}/{type}--{owner}--{name}`
    pub fn storage_dir(&self) -> &Path {
        &self.storage
    }

    /// Returns the blobs directory path: `{storage}/blobs`
    pub fn blobs_dir(&self) -> PathBuf {
        self.storage.join("blobs")
    }

    /// Returns the blob path for a content tag: `{storage}/blobs/{tag}`
    pub fn blob_path(&self, tag: &ContentTag) -> PathBuf {
        self.blobs_dir().join(tag.as_str())
    }

    /// Returns the refs directory path: `{storage}/refs`
    pub fn refs_dir(&self) -> PathBuf {
        self.storage.join("refs")
    }

    /// Returns the ref file path for a revision: `{storage}/refs/{revision}`
    ///
    /// Revisions may contain `/` (e.g. `refs/pr/1`), which maps to nested
    /// directories; a revision that would resolve outside the refs directory
    /// is a fatal validation error.
    pub fn ref_path(&self, revision: &str) -> Result<PathBuf, HubError> {
        let refs_dir = self.refs_dir();
        let candidate = normalize(&refs_dir.join(revision));
        if !candidate.starts_with(normalize(&refs_dir)) || candidate == normalize(&refs_dir) {
            return Err(HubError::PathEscape {
                path: refs_dir.join(revision),
                root: refs_dir,
            });
        }
        Ok(candidate)
    }

    /// Returns the snapshots directory path: `{storage}/snapshots`
    pub fn snapshots_dir(&self) -> PathBuf {
        self.storage.join("snapshots")
    }

    /// Returns the snapshot directory for a commit: `{storage}/snapshots/{commit}`
    pub fn snapshot_dir(&self, commit: &str) -> PathBuf {
        self.snapshots_dir().join(commit)
    }

    /// Returns the pointer path for (commit, relative filename), after
    /// verifying that the normalized result stays inside the snapshots root.
    pub fn pointer_path(&self, commit: &str, relative: &Path) -> Result<PathBuf, HubError> {
        let snapshots_dir = self.snapshots_dir();
        let candidate = normalize(&snapshots_dir.join(commit).join(relative));
        if !candidate.starts_with(normalize(&snapshots_dir)) {
            return Err(HubError::PathEscape {
                path: snapshots_dir.join(commit).join(relative),
                root: snapshots_dir,
            });
        }
        Ok(candidate)
    }

    /// Returns the lock file path for a content tag:
    /// `{root}/.locks/{repo_folder}/{tag}.lock`
    pub fn lock_path(&self, tag: &ContentTag) -> PathBuf {
        self.locks.join(format!("{}.lock", tag.as_str()))
    }
}
