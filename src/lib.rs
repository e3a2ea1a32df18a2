//! hubget - resolve files on a model hub into a local content-addressed
//! cache.
//!
//! A `(repository, revision, filename)` triple resolves to a local path.
//! Revisions (branches, tags) are mutable names layered over immutable
//! content: each file's bytes are stored once per content tag under
//! `blobs/`, revisions map to commits under `refs/`, and each commit gets a
//! `snapshots/<commit>/` directory of pointers into the blob store. The
//! network is only consulted when the cache cannot answer, and going offline
//! degrades to whatever the cache already holds.

pub mod cache;
pub mod client;
pub mod config;
pub mod error;
pub mod progress;
pub mod publish;
pub mod remote;
pub mod snapshot;
pub mod types;

pub use cache::CachePaths;
pub use client::{DownloadOptions, HubClient};
pub use error::HubError;
pub use progress::{GroupProgress, Progress};
pub use publish::SymlinkPolicy;
pub use snapshot::SnapshotOptions;
pub use types::{ContentTag, RepoId, RepoType};
