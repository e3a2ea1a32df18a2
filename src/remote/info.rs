//! Repo info lookup: the file listing and resolved commit for a revision.

use std::time::Duration;

use serde::Deserialize;

use crate::config::USER_AGENT;
use crate::error::HubError;
use crate::remote::url::repo_info_url;
use crate::types::{RepoId, RepoType};

/// A file entry in a repo listing.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoFile {
    /// Path of the file relative to the repo root.
    pub rfilename: String,
}

/// Repo information returned by the hub API.
#[derive(Debug, Clone, Deserialize)]
pub struct RepoInfo {
    /// Commit hash the queried revision resolves to.
    pub sha: Option<String>,
    /// Files available under that commit.
    #[serde(default)]
    pub siblings: Vec<RepoFile>,
}

/// Fetch the repo info for a revision.
pub fn fetch_repo_info(
    endpoint: &str,
    repo: &RepoId,
    repo_type: RepoType,
    revision: &str,
    token: Option<&str>,
    timeout: Duration,
) -> Result<RepoInfo, HubError> {
    let url = repo_info_url(endpoint, repo, repo_type, revision);

    let agent = ureq::builder()
        .timeout(timeout)
        .user_agent(USER_AGENT)
        .build();

    let mut request = agent.get(&url);
    if let Some(token) = token {
        request = request.set("Authorization", &format!("Bearer {}", token));
    }

    let body = match request.call() {
        Ok(response) => response
            .into_string()
            .map_err(|e| HubError::UpstreamUnreachable(e.to_string()))?,
        Err(ureq::Error::Status(code, _)) => {
            return Err(HubError::UpstreamUnreachable(format!("HTTP {} for {}", code, url)));
        }
        Err(ureq::Error::Transport(e)) => {
            return Err(HubError::UpstreamUnreachable(e.to_string()));
        }
    };

    serde_json::from_str(&body).map_err(|e| {
        HubError::Configuration(format!("unexpected repo info response from {}: {}", url, e))
    })
}
