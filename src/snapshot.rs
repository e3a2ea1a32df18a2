//! Snapshot downloads: every file of a revision, through a bounded worker
//! pool.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;

use crossbeam_channel::bounded;

use crate::cache::{cache_ref, resolve_commit};
use crate::client::{DownloadOptions, HubClient};
use crate::config::DEFAULT_MAX_WORKERS;
use crate::error::HubError;
use crate::progress::{GroupProgress, Progress};
use crate::publish::publish_to_local_dir;
use crate::remote::fetch_repo_info;
use crate::types::RepoId;

/// Options for a snapshot download.
#[derive(Debug, Clone)]
pub struct SnapshotOptions {
    /// Per-file options; `local_dir` and the symlink policy apply to every
    /// file of the snapshot.
    pub download: DownloadOptions,
    /// Concurrency bound for parallel file fetches.
    pub max_workers: usize,
}

impl Default for SnapshotOptions {
    fn default() -> Self {
        Self {
            download: DownloadOptions::default(),
            max_workers: DEFAULT_MAX_WORKERS,
        }
    }
}

impl HubClient {
    /// Download every file of a revision and return the snapshot directory
    /// (or the local dir, when one was given).
    pub fn snapshot_download(
        &self,
        repo: &RepoId,
        opts: &SnapshotOptions,
        progress: Option<Arc<dyn GroupProgress>>,
    ) -> Result<PathBuf, HubError> {
        let download = &opts.download;
        let paths = self.cache_paths().repo(repo, download.repo_type);

        if download.local_files_only {
            return self.snapshot_offline(repo, opts);
        }

        let info = match fetch_repo_info(
            self.endpoint(),
            repo,
            download.repo_type,
            &download.revision,
            download.token.as_deref(),
            download.etag_timeout,
        ) {
            Ok(info) => info,
            Err(HubError::UpstreamUnreachable(reason)) => {
                log::warn!(
                    "repo info fetch for {} failed ({}), trying the local cache",
                    repo,
                    reason
                );
                return self.snapshot_offline(repo, opts);
            }
            Err(e) => return Err(e),
        };

        let commit = info.sha.filter(|s| !s.is_empty()).ok_or_else(|| {
            HubError::Configuration(format!(
                "the hub returned no commit hash for {} at revision {}",
                repo, download.revision
            ))
        })?;
        cache_ref(&paths, &download.revision, &commit)?;

        // Workers resolve against the pinned commit, so files whose pointer
        // already exists shortcut without another network round-trip.
        let mut file_opts = download.clone();
        file_opts.revision = commit.clone();

        let filenames: Vec<String> = info.siblings.into_iter().map(|f| f.rfilename).collect();
        let results = run_pool(filenames, opts.max_workers, |filename| {
            let per_file: Option<Box<dyn Progress>> = progress.as_ref().map(|group| {
                let group = Arc::clone(group);
                let name = filename.clone();
                Box::new(move |fraction: f32| group.report(&name, fraction * 100.0))
                    as Box<dyn Progress>
            });
            self.download_file(repo, &filename, &file_opts, per_file.as_deref())
        });

        for result in results {
            result?;
        }

        match &download.local_dir {
            Some(local_dir) => Ok(local_dir.clone()),
            None => Ok(paths.snapshot_dir(&commit)),
        }
    }

    /// Serve a snapshot purely from the cache.
    fn snapshot_offline(&self, repo: &RepoId, opts: &SnapshotOptions) -> Result<PathBuf, HubError> {
        let download = &opts.download;
        if download.force_download {
            return Err(HubError::Configuration(
                "cannot force a download without connectivity (force_download with \
                 local_files_only or an unreachable hub)"
                    .to_string(),
            ));
        }

        let paths = self.cache_paths().repo(repo, download.repo_type);
        let commit = resolve_commit(&paths, &download.revision)?;
        let snapshot_dir = match commit {
            Some(commit) => paths.snapshot_dir(&commit),
            None => {
                return Err(if download.local_files_only {
                    HubError::NotFoundOffline
                } else {
                    HubError::NotFoundOnline
                });
            }
        };

        if !snapshot_dir.is_dir() {
            return Err(if download.local_files_only {
                HubError::NotFoundOffline
            } else {
                HubError::NotFoundOnline
            });
        }

        match &download.local_dir {
            Some(local_dir) => {
                for relative in walk_files(&snapshot_dir)? {
                    publish_to_local_dir(
                        &snapshot_dir.join(&relative),
                        local_dir,
                        &relative,
                        download.local_dir_use_symlinks,
                        self.probe(),
                    )?;
                }
                Ok(local_dir.clone())
            }
            None => Ok(snapshot_dir),
        }
    }
}

/// All regular files under `dir`, as paths relative to it.
fn walk_files(dir: &Path) -> Result<Vec<PathBuf>, HubError> {
    fn visit(base: &Path, dir: &Path, out: &mut Vec<PathBuf>) -> std::io::Result<()> {
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            if entry.file_type()?.is_dir() {
                visit(base, &path, out)?;
            } else if let Ok(relative) = path.strip_prefix(base) {
                out.push(relative.to_path_buf());
            }
        }
        Ok(())
    }

    let mut files = Vec::new();
    visit(dir, dir, &mut files)?;
    Ok(files)
}

/// Run `job` over `items` on at most `max_workers` threads.
///
/// A failed job stops further items from being scheduled; jobs already in
/// flight drain normally. Results arrive in completion order.
pub(crate) fn run_pool<T, F>(
    items: Vec<T>,
    max_workers: usize,
    job: F,
) -> Vec<Result<PathBuf, HubError>>
where
    T: Send,
    F: Fn(T) -> Result<PathBuf, HubError> + Send + Sync,
{
    if items.is_empty() {
        return Vec::new();
    }
    let workers = max_workers.max(1).min(items.len());

    let (work_tx, work_rx) = bounded::<T>(items.len());
    let (result_tx, result_rx) = bounded(items.len());
    let stop = AtomicBool::new(false);

    for item in items {
        // The queue is sized for every item; this cannot block.
        let _ = work_tx.send(item);
    }
    drop(work_tx);

    thread::scope(|scope| {
        for _ in 0..workers {
            let work_rx = work_rx.clone();
            let result_tx = result_tx.clone();
            let job = &job;
            let stop = &stop;

            scope.spawn(move || {
                while let Ok(item) = work_rx.recv() {
                    if stop.load(Ordering::Relaxed) {
                        continue;
                    }
                    let result = job(item);
                    if result.is_err() {
                        stop.store(true, Ordering::Relaxed);
                    }
                    let _ = result_tx.send(result);
                }
            });
        }
    });
    drop(result_tx);

    result_rx.iter().collect()
}
