//! Symlink capability probing and link path helpers.
//!
//! Whether symbolic links work depends on the OS, the filesystem, and (on
//! Windows) developer-mode settings, so it is probed once per cache root by
//! actually creating one. Callers branch only on the returned boolean, never
//! on platform identity.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use dashmap::DashMap;

/// Global counter for unique scratch directory names within a process
static PROBE_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Create a file symlink. `original` may be relative to the link's parent.
#[cfg(unix)]
pub fn symlink_file(original: &Path, link: &Path) -> io::Result<()> {
    std::os::unix::fs::symlink(original, link)
}

/// Create a file symlink. `original` may be relative to the link's parent.
#[cfg(windows)]
pub fn symlink_file(original: &Path, link: &Path) -> io::Result<()> {
    std::os::windows::fs::symlink_file(original, link)
}

/// Process-scoped cache of "does this root support symlinks?" answers.
///
/// Populated on the first probe per normalized root and never re-run for
/// that root until process restart. Pass a handle to every component that
/// needs the answer instead of consulting ambient global state.
#[derive(Debug, Default)]
pub struct SymlinkProbe {
    results: DashMap<PathBuf, bool>,
}

impl SymlinkProbe {
    pub fn new() -> Self {
        Self {
            results: DashMap::new(),
        }
    }

    /// Whether the filesystem under `root` supports symbolic links.
    ///
    /// The first call per root creates the root, runs the filesystem test in
    /// a scratch subdirectory and memoizes the outcome; later calls return
    /// the memoized answer. Probe failures of any kind mean "unsupported".
    pub fn supported(&self, root: &Path) -> bool {
        let key = match fs::create_dir_all(root).and_then(|_| root.canonicalize()) {
            Ok(canonical) => canonical,
            // Root cannot be created or resolved: record the failure under
            // the raw path so the answer stays stable.
            Err(_) => return *self.results.entry(root.to_path_buf()).or_insert(false),
        };

        if let Some(cached) = self.results.get(&key) {
            return *cached;
        }

        let outcome = run_probe(&key).unwrap_or(false);
        *self.results.entry(key).or_insert(outcome)
    }

    /// Pin the answer for a root, bypassing the filesystem test.
    #[cfg(test)]
    pub(crate) fn force(&self, root: &Path, supported: bool) {
        let key = root.canonicalize().unwrap_or_else(|_| root.to_path_buf());
        self.results.insert(key, supported);
    }
}

fn run_probe(root: &Path) -> io::Result<bool> {
    // PID + atomic counter keeps concurrent probes out of each other's way.
    let counter = PROBE_COUNTER.fetch_add(1, Ordering::Relaxed);
    let scratch = root.join(format!(".symlink-probe.{}.{}", std::process::id(), counter));
    fs::create_dir(&scratch)?;

    let outcome = probe_in_scratch(&scratch);
    let _ = fs::remove_dir_all(&scratch);
    outcome
}

fn probe_in_scratch(scratch: &Path) -> io::Result<bool> {
    let src = scratch.join("probe_src");
    let dst = scratch.join("probe_dst");
    fs::write(&src, b"")?;

    match symlink_file(Path::new("probe_src"), &dst) {
        Ok(()) => Ok(fs::symlink_metadata(&dst)?.file_type().is_symlink()),
        Err(_) => Ok(false),
    }
}

/// Compute the relative path from `from_dir` to `target`.
///
/// Both paths must be absolute (or share the same base); the result is what
/// a symlink created inside `from_dir` should contain to reach `target`.
pub fn relative_to(from_dir: &Path, target: &Path) -> PathBuf {
    let from: Vec<_> = from_dir.components().collect();
    let to: Vec<_> = target.components().collect();

    let mut common = 0;
    while common < from.len() && common < to.len() && from[common] == to[common] {
        common += 1;
    }

    let mut relative = PathBuf::new();
    for _ in common..from.len() {
        relative.push("..");
    }
    for component in &to[common..] {
        relative.push(component.as_os_str());
    }
    if relative.as_os_str().is_empty() {
        relative.push(".");
    }
    relative
}

/// The longest common ancestor of two paths, component-wise.
pub fn longest_common_ancestor(a: &Path, b: &Path) -> PathBuf {
    let mut ancestor = PathBuf::new();
    for (ca, cb) in a.components().zip(b.components()) {
        if ca != cb {
            break;
        }
        ancestor.push(ca.as_os_str());
    }
    ancestor
}

/// Follow a chain of symlinks to the real file.
///
/// Relative link targets are resolved against the link's parent directory
/// and the result is lexically normalized so it compares cleanly against
/// other cache paths. Returns the input path unchanged when it is not a
/// symlink.
pub fn resolve_link_target(path: &Path) -> io::Result<PathBuf> {
    let mut current = path.to_path_buf();
    for _ in 0..32 {
        let metadata = fs::symlink_metadata(&current)?;
        if !metadata.file_type().is_symlink() {
            return Ok(super::paths::normalize(&current));
        }
        let target = fs::read_link(&current)?;
        current = if target.is_absolute() {
            target
        } else if let Some(parent) = current.parent() {
            parent.join(target)
        } else {
            target
        };
    }
    Err(io::Error::other("too many levels of symbolic links"))
}
