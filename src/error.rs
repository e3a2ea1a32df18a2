//! Crate-level error taxonomy.

use std::path::PathBuf;
use thiserror::Error;

/// Errors surfaced by cache resolution and downloads.
#[derive(Error, Debug)]
pub enum HubError {
    /// Contradictory options, or a remote that responded without the
    /// identity headers a hub is expected to send.
    #[error("configuration error: {0}")]
    Configuration(String),
    /// A computed path resolves outside the root it must stay under.
    #[error("path {path:?} escapes its root {root:?}")]
    PathEscape { path: PathBuf, root: PathBuf },
    /// Transport-level failure reaching the metadata or content endpoint.
    #[error("upstream unreachable: {0}")]
    UpstreamUnreachable(String),
    /// No cached entry and outgoing traffic was disabled by the caller.
    #[error(
        "cannot find the requested file in the local cache and outgoing traffic is disabled; \
         unset local_files_only to allow hub look-ups"
    )]
    NotFoundOffline,
    /// The network was attempted and failed, and no cached fallback exists.
    #[error(
        "could not locate the file on the hub and there is no cached copy; \
         check your connection and try again"
    )]
    NotFoundOnline,
    /// Declared length missing, or the stream ended before reaching it.
    #[error("transfer failed: {0}")]
    Transfer(String),
    /// Failed to acquire the per-blob lock within the timeout.
    #[error("timed out acquiring the blob lock")]
    LockTimeout,
    /// An underlying IO operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}
