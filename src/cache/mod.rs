//! Content-addressed cache: layout, refs, blobs and locking

mod blob;
mod lock;
mod paths;
mod refs;
mod symlink;

pub use blob::{commit_blob, link_blob};
pub use lock::BlobLock;
pub(crate) use paths::normalize;
pub use paths::{CachePaths, RepoPaths, relative_filename, repo_folder_name};
pub use refs::{cache_ref, is_commit_hash, resolve_commit};
pub use symlink::{SymlinkProbe, resolve_link_target};
