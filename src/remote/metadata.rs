//! Metadata-only freshness check for a file URL.

use std::time::Duration;

use crate::config::{HEADER_LINKED_ETAG, HEADER_LINKED_SIZE, HEADER_REPO_COMMIT, USER_AGENT};
use crate::error::HubError;
use crate::types::ContentTag;

/// Transient result of a freshness check. Never persisted; only used to
/// drive resolution.
#[derive(Debug, Clone)]
pub struct FileMetadata {
    /// Commit hash the revision resolved to, from the commit header.
    pub commit_hash: Option<String>,
    /// Opaque identity token for the file bytes.
    pub content_tag: Option<ContentTag>,
    /// Where the content actually lives: the redirect target if the server
    /// redirected, otherwise the requested URL.
    pub location: String,
    /// Declared size in bytes, preferring the linked-size header.
    pub size: Option<u64>,
}

/// Fetch metadata for a file URL with a HEAD request.
///
/// Redirects are not followed (the `Location` header is captured instead)
/// and compression is refused so the declared size is the true byte length.
/// Transport failures, timeouts and error statuses all map to
/// [`HubError::UpstreamUnreachable`]; retrying is the caller's decision.
pub fn fetch_metadata(
    url: &str,
    token: Option<&str>,
    timeout: Duration,
) -> Result<FileMetadata, HubError> {
    let agent = ureq::builder()
        .timeout(timeout)
        .redirects(0)
        .user_agent(USER_AGENT)
        .build();

    let mut request = agent.head(url).set("Accept-Encoding", "identity");
    if let Some(token) = token {
        request = request.set("Authorization", &format!("Bearer {}", token));
    }

    let response = match request.call() {
        Ok(response) => response,
        Err(ureq::Error::Status(code, _)) => {
            return Err(HubError::UpstreamUnreachable(format!("HTTP {} for {}", code, url)));
        }
        Err(ureq::Error::Transport(e)) => {
            return Err(HubError::UpstreamUnreachable(e.to_string()));
        }
    };

    let commit_hash = response
        .header(HEADER_REPO_COMMIT)
        .map(str::to_string)
        .filter(|s| !s.is_empty());

    let content_tag = response
        .header(HEADER_LINKED_ETAG)
        .or_else(|| response.header("ETag"))
        .and_then(|raw| ContentTag::parse(raw).ok());

    let location = if (300..400).contains(&response.status()) {
        response
            .header("Location")
            .map(str::to_string)
            .unwrap_or_else(|| response.get_url().to_string())
    } else {
        response.get_url().to_string()
    };

    let size = response
        .header(HEADER_LINKED_SIZE)
        .or_else(|| response.header("Content-Length"))
        .and_then(|s| s.parse::<u64>().ok());

    Ok(FileMetadata {
        commit_hash,
        content_tag,
        location,
        size,
    })
}
