//! Artifact uploading to Maven repositories.
//!
//! Files are sent one at a time with HTTP `PUT`. `file://` base URLs are
//! served by copying, which keeps local and test deployments offline.

use std::path::{Path, PathBuf};
use std::time::Duration;

use reqwest::blocking::{Body, Client};
use reqwest::{StatusCode, Url};

use nexstage_core::config::ServerCredentials;
use nexstage_util::errors::{NexstageError, NexstageResult};

use crate::auth;
use crate::error_body;
use crate::repository::join_url;
use crate::service::ArtifactUploader;

const MAX_RETRIES: u32 = 3;
const RETRY_DELAY: Duration = Duration::from_secs(2);

/// Upload `file` to `url` with authentication and retries.
///
/// Server errors, timeouts and connection failures are retried; any other
/// non-success status fails immediately.
pub fn put_file(
    client: &Client,
    credentials: Option<&ServerCredentials>,
    url: &str,
    file: &Path,
) -> NexstageResult<()> {
    if url.starts_with("file:") {
        return copy_to_file_url(url, file);
    }

    let mut last_err = String::new();
    for attempt in 0..MAX_RETRIES {
        if attempt > 0 {
            std::thread::sleep(RETRY_DELAY * attempt);
        }

        let body = Body::from(std::fs::File::open(file)?);
        let req = auth::apply_auth(client.put(url).body(body), credentials);

        match req.send() {
            Ok(resp) => {
                let status = resp.status();
                if status.is_success() {
                    tracing::debug!("Uploaded {} -> {url}", file.display());
                    return Ok(());
                }
                let text = resp.text().unwrap_or_default();
                if status.is_server_error() {
                    last_err = format!("HTTP {status}: {}", error_body::summarize(&text));
                    continue;
                }
                return Err(upload_error(status, url, &text));
            }
            Err(e) if e.is_timeout() || e.is_connect() => {
                last_err = e.to_string();
                continue;
            }
            Err(e) => {
                return Err(NexstageError::remote(
                    None,
                    format!("Upload to {url} failed: {e}"),
                ));
            }
        }
    }

    Err(NexstageError::remote(
        None,
        format!("Upload to {url} failed after {MAX_RETRIES} attempts: {last_err}"),
    ))
}

fn upload_error(status: StatusCode, url: &str, body: &str) -> NexstageError {
    let hint = match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => " (check the server credentials)",
        StatusCode::BAD_REQUEST => " (the repository may be closed or not accept this path)",
        _ => "",
    };
    NexstageError::remote(
        Some(status.as_u16()),
        format!(
            "Upload to {url} rejected{hint}: {}",
            error_body::summarize(body)
        ),
    )
}

fn copy_to_file_url(url: &str, file: &Path) -> NexstageResult<()> {
    let dest = file_url_path(url)?;
    nexstage_util::fs::copy_file(file, &dest)?;
    tracing::debug!("Copied {} -> {}", file.display(), dest.display());
    Ok(())
}

/// Local path of a `file://` URL.
pub fn file_url_path(url: &str) -> NexstageResult<PathBuf> {
    Url::parse(url)
        .ok()
        .and_then(|u| u.to_file_path().ok())
        .ok_or_else(|| NexstageError::configuration(format!("Invalid file URL '{url}'")))
}

/// Uploader for plain Maven repositories (deferred and direct deploys).
#[derive(Debug, Clone)]
pub struct RepositoryUploader {
    client: Client,
    credentials: Option<ServerCredentials>,
}

impl RepositoryUploader {
    pub fn new(client: Client, credentials: Option<ServerCredentials>) -> Self {
        Self {
            client,
            credentials,
        }
    }
}

impl ArtifactUploader for RepositoryUploader {
    fn upload(&self, base_url: &str, path: &str, file: &Path) -> NexstageResult<()> {
        put_file(
            &self.client,
            self.credentials.as_ref(),
            &join_url(base_url, path),
            file,
        )
    }
}
