//! Publishing cached files into a caller-chosen local directory.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use crate::cache::{SymlinkProbe, link_blob, normalize, resolve_link_target};
use crate::config::LOCAL_DIR_SYMLINK_THRESHOLD;
use crate::error::HubError;

/// How a file is placed into a local directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SymlinkPolicy {
    /// Symlink files at or above the size threshold, duplicate smaller
    /// ones.
    #[default]
    Auto,
    /// Always symlink, regardless of size.
    Always,
    /// Always duplicate the bytes.
    Never,
}

/// Place `source` (a snapshot pointer or a blob) into `local_dir` under
/// `relative`, as a symlink or an independent copy.
///
/// A symlink source is resolved to the real blob before the size check and
/// the placement, so the publication never layers a symlink on a symlink.
/// Returns the final path inside the local directory.
pub fn publish_to_local_dir(
    source: &Path,
    local_dir: &Path,
    relative: &Path,
    policy: SymlinkPolicy,
    probe: &SymlinkProbe,
) -> Result<PathBuf, HubError> {
    let destination = normalize(&local_dir.join(relative));
    if !destination.starts_with(normalize(local_dir)) {
        return Err(HubError::PathEscape {
            path: local_dir.join(relative),
            root: local_dir.to_path_buf(),
        });
    }

    if let Some(parent) = destination.parent() {
        fs::create_dir_all(parent)?;
    }

    let real_source = resolve_link_target(source)?;

    let use_symlink = match policy {
        SymlinkPolicy::Always => true,
        SymlinkPolicy::Never => false,
        SymlinkPolicy::Auto => {
            fs::metadata(&real_source)?.len() >= LOCAL_DIR_SYMLINK_THRESHOLD
        }
    };

    match fs::remove_file(&destination) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e.into()),
    }

    if use_symlink {
        // Falls back to a copy by itself when the filesystem between the
        // blob and the destination cannot hold symlinks.
        link_blob(&real_source, &destination, false, probe)?;
    } else {
        fs::copy(&real_source, &destination)?;
    }

    log::debug!(
        "published {} to {}",
        real_source.display(),
        destination.display()
    );
    Ok(destination)
}
