//! Content-addressed blob storage and pointer placement.
//!
//! One physical file per unique content tag, shared by every revision and
//! repo that references those bytes. Pointers (snapshot entries, local-dir
//! publications) are created only after the blob is fully on disk.

use std::fs;
use std::io;
use std::path::Path;

use tempfile::NamedTempFile;

use super::symlink::{SymlinkProbe, longest_common_ancestor, relative_to, resolve_link_target, symlink_file};

/// Move a finished temp file into the blob store under its content tag.
///
/// First write wins: when a blob for the tag already exists the temp file is
/// discarded, so concurrent fetches of the same content converge on one
/// stored blob.
pub fn commit_blob(temp: NamedTempFile, blob_path: &Path) -> io::Result<()> {
    if blob_path.exists() {
        log::debug!("blob {} already cached, discarding download", blob_path.display());
        return Ok(());
    }

    if let Some(parent) = blob_path.parent() {
        fs::create_dir_all(parent)?;
    }

    match temp.persist_noclobber(blob_path) {
        Ok(_) => Ok(()),
        // A concurrent fetch committed the same tag between our existence
        // check and the rename; identical bytes, so theirs stands.
        Err(e) if e.error.kind() == io::ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(e.error),
    }
}

/// Place a pointer to `blob_path` at `pointer_path`.
///
/// Prefers a relative symlink when the filesystem under the common ancestor
/// of the two paths supports them. Without symlinks, a freshly downloaded
/// blob (`new_blob`) is moved to the pointer path, sacrificing
/// deduplication; an existing blob is copied.
pub fn link_blob(
    blob_path: &Path,
    pointer_path: &Path,
    new_blob: bool,
    probe: &SymlinkProbe,
) -> io::Result<()> {
    if let Some(parent) = pointer_path.parent() {
        fs::create_dir_all(parent)?;
    }

    match fs::remove_file(pointer_path) {
        Ok(()) => {}
        Err(e) if e.kind() == io::ErrorKind::NotFound => {}
        Err(e) => return Err(e),
    }

    let ancestor = longest_common_ancestor(blob_path, pointer_path);
    if probe.supported(&ancestor) {
        let link_dir = pointer_path.parent().unwrap_or(Path::new("."));
        let relative = relative_to(link_dir, blob_path);

        return match symlink_file(&relative, pointer_path) {
            Ok(()) => Ok(()),
            Err(e) => {
                // A concurrent resolver may have linked the same blob while
                // we were working; the end state is correct, so accept it.
                if resolve_link_target(pointer_path).is_ok_and(|target| target == blob_path) {
                    log::debug!(
                        "pointer {} already links {}, ignoring race",
                        pointer_path.display(),
                        blob_path.display()
                    );
                    Ok(())
                } else {
                    Err(e)
                }
            }
        };
    }

    if new_blob {
        fs::rename(blob_path, pointer_path)
    } else {
        fs::copy(blob_path, pointer_path).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::tempdir;

    fn temp_with(dir: &Path, contents: &[u8]) -> NamedTempFile {
        let mut temp = NamedTempFile::new_in(dir).unwrap();
        temp.write_all(contents).unwrap();
        temp
    }

    #[test]
    fn commit_moves_temp_into_place() {
        let dir = tempdir().unwrap();
        let blob = dir.path().join("blobs").join("etag-1");

        let temp = temp_with(dir.path(), b"weights");
        commit_blob(temp, &blob).unwrap();

        assert_eq!(fs::read(&blob).unwrap(), b"weights");
    }

    #[test]
    fn commit_is_first_write_wins() {
        let dir = tempdir().unwrap();
        let blob = dir.path().join("blobs").join("etag-1");

        commit_blob(temp_with(dir.path(), b"first"), &blob).unwrap();
        commit_blob(temp_with(dir.path(), b"first"), &blob).unwrap();

        assert_eq!(fs::read(&blob).unwrap(), b"first");
        let entries: Vec<_> = fs::read_dir(blob.parent().unwrap()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    fn concurrent_commits_converge_on_one_blob() {
        use std::sync::{Arc, Barrier};
        use std::thread;

        let dir = tempdir().unwrap();
        let blob = Arc::new(dir.path().join("blobs").join("etag-1"));
        let temp_root = Arc::new(dir.path().to_path_buf());
        let barrier = Arc::new(Barrier::new(4));

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let blob = Arc::clone(&blob);
                let temp_root = Arc::clone(&temp_root);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    let temp = temp_with(&temp_root, b"same bytes");
                    barrier.wait();
                    commit_blob(temp, &blob)
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap().unwrap();
        }

        assert_eq!(fs::read(blob.as_ref()).unwrap(), b"same bytes");
        let entries: Vec<_> = fs::read_dir(blob.parent().unwrap()).unwrap().collect();
        assert_eq!(entries.len(), 1);
    }

    #[test]
    #[cfg(unix)]
    fn link_creates_relative_symlink() {
        let dir = tempdir().unwrap();
        let blob = dir.path().join("blobs").join("etag-1");
        fs::create_dir_all(blob.parent().unwrap()).unwrap();
        fs::write(&blob, b"weights").unwrap();

        let pointer = dir.path().join("snapshots").join("abc").join("model.bin");
        let probe = SymlinkProbe::new();
        link_blob(&blob, &pointer, true, &probe).unwrap();

        assert!(pointer.is_symlink());
        let target = fs::read_link(&pointer).unwrap();
        assert!(target.is_relative(), "expected relative target, got {:?}", target);
        assert_eq!(fs::read(&pointer).unwrap(), b"weights");
        // Blob still in place: deduplication preserved.
        assert!(blob.exists());
    }

    #[test]
    #[cfg(unix)]
    fn link_replaces_existing_pointer() {
        let dir = tempdir().unwrap();
        let blob = dir.path().join("blobs").join("etag-2");
        fs::create_dir_all(blob.parent().unwrap()).unwrap();
        fs::write(&blob, b"new bytes").unwrap();

        let pointer = dir.path().join("snapshots").join("abc").join("model.bin");
        fs::create_dir_all(pointer.parent().unwrap()).unwrap();
        fs::write(&pointer, b"stale").unwrap();

        let probe = SymlinkProbe::new();
        link_blob(&blob, &pointer, false, &probe).unwrap();
        assert_eq!(fs::read(&pointer).unwrap(), b"new bytes");
    }

    #[test]
    #[cfg(unix)]
    fn link_accepts_benign_symlink_race() {
        let dir = tempdir().unwrap();
        let blob = dir.path().join("blobs").join("etag-1");
        fs::create_dir_all(blob.parent().unwrap()).unwrap();
        fs::write(&blob, b"weights").unwrap();

        let pointer = dir.path().join("snapshots").join("abc").join("model.bin");
        let probe = SymlinkProbe::new();
        link_blob(&blob, &pointer, false, &probe).unwrap();
        // Second link of the same blob to the same pointer must succeed.
        link_blob(&blob, &pointer, false, &probe).unwrap();
        assert_eq!(fs::read(&pointer).unwrap(), b"weights");
    }

    #[test]
    fn link_moves_new_blob_without_symlink_support() {
        let dir = tempdir().unwrap();
        let blob = dir.path().join("blobs").join("etag-1");
        fs::create_dir_all(blob.parent().unwrap()).unwrap();
        fs::write(&blob, b"weights").unwrap();

        let pointer = dir.path().join("snapshots").join("abc").join("model.bin");
        let probe = SymlinkProbe::new();
        probe.force(dir.path(), false);

        link_blob(&blob, &pointer, true, &probe).unwrap();
        assert!(!pointer.is_symlink());
        assert_eq!(fs::read(&pointer).unwrap(), b"weights");
        // Moved, not copied: the blob is gone.
        assert!(!blob.exists());
    }

    #[test]
    fn link_copies_existing_blob_without_symlink_support() {
        let dir = tempdir().unwrap();
        let blob = dir.path().join("blobs").join("etag-1");
        fs::create_dir_all(blob.parent().unwrap()).unwrap();
        fs::write(&blob, b"weights").unwrap();

        let pointer = dir.path().join("snapshots").join("abc").join("model.bin");
        let probe = SymlinkProbe::new();
        probe.force(dir.path(), false);

        link_blob(&blob, &pointer, false, &probe).unwrap();
        assert!(!pointer.is_symlink());
        assert_eq!(fs::read(&pointer).unwrap(), b"weights");
        assert!(blob.exists());
    }
}
