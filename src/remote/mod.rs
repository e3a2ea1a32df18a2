//! HTTP plumbing: metadata checks, content downloads, repo listings

mod download;
mod info;
mod metadata;
mod url;

pub use download::fetch_to_temp;
pub use info::{RepoFile, RepoInfo, fetch_repo_info};
pub use metadata::{FileMetadata, fetch_metadata};
pub use url::{file_url, repo_info_url};
