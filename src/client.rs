//! Top-level cache resolution: the `HubClient` and single-file downloads.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::cache::{
    BlobLock, CachePaths, RepoPaths, SymlinkProbe, cache_ref, commit_blob, is_commit_hash,
    link_blob, relative_filename, resolve_commit,
};
use crate::config::{DEFAULT_ETAG_TIMEOUT, DEFAULT_REVISION, default_endpoint};
use crate::error::HubError;
use crate::progress::Progress;
use crate::publish::{SymlinkPolicy, publish_to_local_dir};
use crate::remote::{FileMetadata, fetch_metadata, fetch_to_temp, file_url};
use crate::types::{RepoId, RepoType};

/// Options for a single-file download, resolved to concrete values up
/// front; nothing is re-derived mid-flow.
#[derive(Debug, Clone)]
pub struct DownloadOptions {
    /// Branch, tag or commit hash to resolve. Defaults to `main`.
    pub revision: String,
    /// Folder inside the repo the file lives under, prefixed onto the
    /// filename with `/`.
    pub subfolder: Option<String>,
    /// Kind of repository the file lives in.
    pub repo_type: RepoType,
    /// Re-download even when the cache already holds the file.
    pub force_download: bool,
    /// Forbid any network access; serve from the cache or fail.
    pub local_files_only: bool,
    /// Deadline for the metadata request.
    pub etag_timeout: Duration,
    /// Bearer token sent to the hub (never forwarded to redirect targets).
    pub token: Option<String>,
    /// Publish the resolved file into this directory instead of returning
    /// the in-cache pointer path.
    pub local_dir: Option<PathBuf>,
    /// Placement policy for `local_dir`.
    pub local_dir_use_symlinks: SymlinkPolicy,
}

impl Default for DownloadOptions {
    fn default() -> Self {
        Self {
            revision: DEFAULT_REVISION.to_string(),
            subfolder: None,
            repo_type: RepoType::Model,
            force_download: false,
            local_files_only: false,
            etag_timeout: DEFAULT_ETAG_TIMEOUT,
            token: None,
            local_dir: None,
            local_dir_use_symlinks: SymlinkPolicy::Auto,
        }
    }
}

/// Client for resolving hub files against the local cache.
pub struct HubClient {
    endpoint: String,
    cache: CachePaths,
    probe: SymlinkProbe,
}

impl HubClient {
    /// Create a client resolving against the given cache layout.
    pub fn new(cache: CachePaths) -> Self {
        Self {
            endpoint: default_endpoint(),
            cache,
            probe: SymlinkProbe::new(),
        }
    }

    /// Override the endpoint for this client.
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into().trim_end_matches('/').to_string();
        self
    }

    /// The endpoint requests are sent to.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// The cache layout this client resolves against.
    pub fn cache_paths(&self) -> &CachePaths {
        &self.cache
    }

    pub(crate) fn probe(&self) -> &SymlinkProbe {
        &self.probe
    }

    /// Resolve a (repo, revision, filename) triple to a local path,
    /// downloading only when the cache cannot satisfy the request.
    ///
    /// Returns the snapshot pointer path, or the publication path when
    /// `local_dir` is set.
    pub fn download_file(
        &self,
        repo: &RepoId,
        filename: &str,
        opts: &DownloadOptions,
        progress: Option<&dyn Progress>,
    ) -> Result<PathBuf, HubError> {
        let full_name = match opts.subfolder.as_deref() {
            Some(subfolder) if !subfolder.is_empty() => format!("{}/{}", subfolder, filename),
            _ => filename.to_string(),
        };
        // Traversal in the filename is rejected before any filesystem or
        // network work happens.
        let relative = relative_filename(&full_name)?;
        let paths = self.cache.repo(repo, opts.repo_type);
        fs::create_dir_all(paths.storage_dir())?;

        // Shortcut: a commit hash plus an existing pointer needs no network,
        // regardless of offline mode.
        if is_commit_hash(&opts.revision) && !opts.force_download {
            let pointer = paths.pointer_path(&opts.revision, &relative)?;
            if pointer.exists() {
                return self.finish(pointer, opts, &relative);
            }
        }

        let url = file_url(
            &self.endpoint,
            repo,
            opts.repo_type,
            &opts.revision,
            &full_name,
        );

        let metadata = if opts.local_files_only {
            None
        } else {
            match fetch_metadata(&url, opts.token.as_deref(), opts.etag_timeout) {
                Ok(metadata) => Some(metadata),
                Err(HubError::UpstreamUnreachable(reason)) => {
                    log::warn!(
                        "metadata fetch for {} failed ({}), trying the local cache",
                        url,
                        reason
                    );
                    None
                }
                Err(e) => return Err(e),
            }
        };

        match metadata {
            Some(metadata) => self.online_resolve(&paths, opts, &relative, &url, metadata, progress),
            None => self.offline_resolve(&paths, opts, &relative),
        }
    }

    fn online_resolve(
        &self,
        paths: &RepoPaths,
        opts: &DownloadOptions,
        relative: &Path,
        url: &str,
        metadata: FileMetadata,
        progress: Option<&dyn Progress>,
    ) -> Result<PathBuf, HubError> {
        // The server answered; a registry always identifies the commit and
        // the content. Anything else is a misconfigured remote.
        let commit = metadata.commit_hash.ok_or_else(|| {
            HubError::Configuration(format!(
                "the resource at {} does not carry a commit header; it does not appear \
                 to be served by a model hub (check your endpoint and proxy settings)",
                url
            ))
        })?;
        let tag = metadata.content_tag.ok_or_else(|| {
            HubError::Configuration(format!(
                "the resource at {} has no content tag, so reproducibility cannot be \
                 ensured (check your endpoint and proxy settings)",
                url
            ))
        })?;

        let blob_path = paths.blob_path(&tag);
        let pointer = paths.pointer_path(&commit, relative)?;
        cache_ref(paths, &opts.revision, &commit)?;

        if pointer.exists() && !opts.force_download {
            return self.finish(pointer, opts, relative);
        }

        if blob_path.exists() && !opts.force_download {
            // The bytes are cached under another revision; only the pointer
            // is missing.
            link_blob(&blob_path, &pointer, false, &self.probe)?;
            return self.finish(pointer, opts, relative);
        }

        // Serialize concurrent fetches of the same content.
        let lock_path = paths.lock_path(&tag);
        let _lock = BlobLock::acquire(&lock_path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::TimedOut {
                HubError::LockTimeout
            } else {
                HubError::Io(e)
            }
        })?;

        // Another resolver may have finished while we waited on the lock.
        if !opts.force_download {
            if pointer.exists() {
                return self.finish(pointer, opts, relative);
            }
            if blob_path.exists() {
                link_blob(&blob_path, &pointer, false, &self.probe)?;
                return self.finish(pointer, opts, relative);
            }
        }

        let blobs_dir = paths.blobs_dir();
        fs::create_dir_all(&blobs_dir)?;
        if let Some(expected) = metadata.size {
            warn_if_low_disk(expected, &blobs_dir);
            if let Some(local_dir) = &opts.local_dir {
                warn_if_low_disk(expected, local_dir);
            }
        }

        log::info!("downloading {} to {}", url, blob_path.display());
        let (temp, _size) = fetch_to_temp(
            &metadata.location,
            url,
            opts.token.as_deref(),
            opts.etag_timeout,
            &blobs_dir,
            progress,
        )?;

        commit_blob(temp, &blob_path)?;
        link_blob(&blob_path, &pointer, true, &self.probe)?;
        self.finish(pointer, opts, relative)
    }

    fn offline_resolve(
        &self,
        paths: &RepoPaths,
        opts: &DownloadOptions,
        relative: &Path,
    ) -> Result<PathBuf, HubError> {
        if opts.force_download {
            return Err(HubError::Configuration(
                "cannot force a download without connectivity (force_download with \
                 local_files_only or an unreachable hub)"
                    .to_string(),
            ));
        }

        if let Some(commit) = resolve_commit(paths, &opts.revision)? {
            let pointer = paths.pointer_path(&commit, relative)?;
            if pointer.exists() {
                return self.finish(pointer, opts, relative);
            }
        }

        if opts.local_files_only {
            Err(HubError::NotFoundOffline)
        } else {
            Err(HubError::NotFoundOnline)
        }
    }

    fn finish(
        &self,
        source: PathBuf,
        opts: &DownloadOptions,
        relative: &Path,
    ) -> Result<PathBuf, HubError> {
        match &opts.local_dir {
            Some(local_dir) => publish_to_local_dir(
                &source,
                local_dir,
                relative,
                opts.local_dir_use_symlinks,
                &self.probe,
            ),
            None => Ok(source),
        }
    }
}

impl Default for HubClient {
    /// A client over the default cache directory and endpoint.
    fn default() -> Self {
        Self::new(CachePaths::default())
    }
}

/// Disk-space shortfalls are logged, never enforced.
fn warn_if_low_disk(expected: u64, dir: &Path) {
    match fs2::available_space(dir) {
        Ok(available) if available < expected => {
            log::warn!(
                "not enough disk space at {}: {} bytes needed, {} available",
                dir.display(),
                expected,
                available
            );
        }
        _ => {}
    }
}
