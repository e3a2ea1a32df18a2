//! Process-wide defaults and protocol constants.

use std::path::PathBuf;
use std::time::Duration;

/// Base URL of the hub, used when no endpoint is configured.
pub const DEFAULT_ENDPOINT: &str = "https://huggingface.co";

/// Environment variable that overrides the endpoint process-wide.
pub const ENDPOINT_ENV: &str = "HUBGET_ENDPOINT";

/// Symbolic revision used when the caller does not name one.
pub const DEFAULT_REVISION: &str = "main";

/// Deadline for the metadata (HEAD) request.
pub const DEFAULT_ETAG_TIMEOUT: Duration = Duration::from_secs(10);

/// Default concurrency bound for snapshot downloads.
pub const DEFAULT_MAX_WORKERS: usize = 4;

/// Lower bound for the adaptive download chunk size (10 MiB).
pub const MIN_DOWNLOAD_CHUNK_SIZE: usize = 10 * 1024 * 1024;

/// Files at or above this size are symlinked into a local dir when the
/// symlink policy is `Auto`; smaller files are duplicated (5 MiB).
pub const LOCAL_DIR_SYMLINK_THRESHOLD: u64 = 5 * 1024 * 1024;

/// Separator joining repo type, owner and name into one folder name.
pub const REPO_ID_SEPARATOR: &str = "--";

/// Response header carrying the resolved commit hash.
pub const HEADER_REPO_COMMIT: &str = "X-Repo-Commit";

/// Response header carrying the content tag of a linked (CDN-hosted) file.
pub const HEADER_LINKED_ETAG: &str = "X-Linked-Etag";

/// Response header carrying the size of a linked (CDN-hosted) file.
pub const HEADER_LINKED_SIZE: &str = "X-Linked-Size";

/// User agent sent on every outbound request.
pub const USER_AGENT: &str = concat!("hubget/", env!("CARGO_PKG_VERSION"));

/// The endpoint to use: the `HUBGET_ENDPOINT` environment variable if set,
/// otherwise [`DEFAULT_ENDPOINT`]. Trailing slashes are trimmed so URL
/// construction can always insert its own.
pub fn default_endpoint() -> String {
    let endpoint =
        std::env::var(ENDPOINT_ENV).unwrap_or_else(|_| DEFAULT_ENDPOINT.to_string());
    endpoint.trim_end_matches('/').to_string()
}

/// Default cache root: the platform cache directory + "hubget".
///
/// Uses `dirs::cache_dir()` which resolves to:
/// - Linux: `~/.cache`
/// - macOS: `~/Library/Caches`
/// - Windows: `C:\Users\<user>\AppData\Local`
pub fn default_cache_dir() -> PathBuf {
    let cache_dir = dirs::cache_dir().unwrap_or_else(|| PathBuf::from(".cache"));
    cache_dir.join("hubget")
}
