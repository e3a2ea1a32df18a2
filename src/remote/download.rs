//! Streaming download into a temporary file.

use std::io::{Read, Write};
use std::path::Path;
use std::time::Duration;

use tempfile::NamedTempFile;

use crate::config::{MIN_DOWNLOAD_CHUNK_SIZE, USER_AGENT};
use crate::error::HubError;
use crate::progress::Progress;

/// Stream a GET request into a freshly created temp file under `temp_dir`.
///
/// Redirects are followed. The authorization header is only sent when the
/// download URL is the originally requested URL; a CDN redirect to another
/// host must not see the caller's credentials. Returns the temp file and the
/// number of bytes written, which is verified against the declared
/// `Content-Length` (a missing or unmet declaration is a [`HubError::Transfer`]).
pub fn fetch_to_temp(
    url: &str,
    original_url: &str,
    token: Option<&str>,
    timeout: Duration,
    temp_dir: &Path,
    progress: Option<&dyn Progress>,
) -> Result<(NamedTempFile, u64), HubError> {
    let agent = ureq::builder()
        .timeout_connect(timeout)
        .timeout_read(timeout)
        .user_agent(USER_AGENT)
        .build();

    let mut request = agent.get(url);
    if let Some(token) = token {
        if url == original_url {
            request = request.set("Authorization", &format!("Bearer {}", token));
        }
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

    let total: u64 = response
        .header("Content-Length")
        .and_then(|s| s.parse().ok())
        .ok_or_else(|| {
            HubError::Transfer(format!("no usable content-length header for {}", url))
        })?;

    // Chunks scale with the file so progress lands roughly once per percent,
    // but never drop below the floor.
    let chunk_size = MIN_DOWNLOAD_CHUNK_SIZE.max((total / 100) as usize);

    let mut temp = NamedTempFile::new_in(temp_dir)?;
    let mut reader = response.into_reader();
    let mut buffer = vec![0u8; chunk_size];
    let mut written: u64 = 0;

    loop {
        let read = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) => {
                return Err(HubError::Transfer(format!(
                    "stream failed after {} of {} bytes: {}",
                    written, total, e
                )));
            }
        };
        temp.write_all(&buffer[..read])?;
        written += read as u64;

        if let Some(progress) = progress {
            progress.report(written as f32 / total as f32);
        }
    }

    // The server's declared length is the ground truth; end-of-stream alone
    // does not prove the transfer is complete.
    if written != total {
        return Err(HubError::Transfer(format!(
            "stream ended after {} bytes, expected {}",
            written, total
        )));
    }

    temp.flush()?;
    Ok((temp, written))
}
