//! Revision-to-commit resolution against the local refs store.

use std::fs;
use std::io;

use super::paths::RepoPaths;
use crate::error::HubError;

/// Whether a revision string already names a commit: exactly 40 lowercase
/// hex characters.
pub fn is_commit_hash(revision: &str) -> bool {
    revision.len() == 40
        && revision
            .bytes()
            .all(|b| matches!(b, b'0'..=b'9' | b'a'..=b'f'))
}

/// Resolve a revision to a commit hash using only local state.
///
/// A commit-shaped revision resolves to itself without touching the
/// filesystem. Otherwise the cached ref file is consulted; `None` means no
/// mapping has been stored yet.
pub fn resolve_commit(repo: &RepoPaths, revision: &str) -> Result<Option<String>, HubError> {
    if is_commit_hash(revision) {
        return Ok(Some(revision.to_string()));
    }

    let ref_path = repo.ref_path(revision)?;
    match fs::read_to_string(&ref_path) {
        Ok(contents) => Ok(Some(contents.trim().to_string())),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Persist the revision → commit mapping after a successful remote
/// resolution.
///
/// Does nothing when the revision is itself the commit hash, or when the
/// stored mapping already matches. Safe to race: writers compare before
/// writing and the last writer wins.
pub fn cache_ref(repo: &RepoPaths, revision: &str, commit: &str) -> Result<(), HubError> {
    if revision == commit {
        return Ok(());
    }

    let ref_path = repo.ref_path(revision)?;
    if let Ok(existing) = fs::read_to_string(&ref_path) {
        if existing.trim() == commit {
            return Ok(());
        }
    }

    if let Some(parent) = ref_path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(&ref_path, commit)?;
    Ok(())
}
