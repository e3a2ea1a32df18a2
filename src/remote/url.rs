//! URL construction for hub endpoints.

use crate::config::DEFAULT_REVISION;
use crate::types::{RepoId, RepoType};

/// URL resolving a file at a revision:
/// `{endpoint}[/datasets|/spaces]/{repoId}/resolve/{revision}/{filename}`.
///
/// `filename` is the full path inside the repo (subfolder, if any, already
/// prefixed with `/`).
pub fn file_url(
    endpoint: &str,
    repo: &RepoId,
    repo_type: RepoType,
    revision: &str,
    filename: &str,
) -> String {
    format!(
        "{}{}/{}/resolve/{}/{}",
        endpoint,
        repo_type.url_prefix(),
        repo,
        revision,
        filename
    )
}

/// URL of the repo info API for a repo at a revision.
pub fn repo_info_url(endpoint: &str, repo: &RepoId, repo_type: RepoType, revision: &str) -> String {
    if revision == DEFAULT_REVISION {
        format!("{}/api/{}/{}", endpoint, repo_type.api_segment(), repo)
    } else {
        format!(
            "{}/api/{}/{}/revision/{}",
            endpoint,
            repo_type.api_segment(),
            repo,
            revision
        )
    }
}
