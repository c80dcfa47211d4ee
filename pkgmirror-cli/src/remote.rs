//! HTTP remote index client for pkgmirror.
//!
//! Talks to a package index's sync surface:
//! - Record enumeration and changelog windows (bootstrap + catch-up)
//! - Per-record current document, where a 404 means "deleted upstream"
//! - Streaming download of the pregenerated seed archive

use anyhow::{Context, Result, anyhow};
use async_trait::async_trait;
use pkgmirror_core::fs_store::escape_name;
use pkgmirror_core::{ChangelogEntry, RemoteError, RemoteIndexClient};
use serde_json::Value;
use std::io::{Seek, SeekFrom, Write};

/// HTTP client for a remote package index.
pub struct HttpIndexClient {
    base_url: String,
    http: reqwest::Client,
}

impl HttpIndexClient {
    /// Create a new client targeting `base_url` (e.g. `https://index.example.org`).
    pub fn new(base_url: &str) -> Self {
        let url = base_url.trim_end_matches('/').to_string();
        Self {
            base_url: url,
            http: reqwest::Client::builder()
                .timeout(std::time::Duration::from_secs(300))
                .build()
                .expect("Failed to create HTTP client"),
        }
    }

    fn metadata_url(&self, name: &str) -> String {
        // Same escaping rule the file store uses for path components.
        format!("{}/pypi/{}/json", self.base_url, escape_name(name))
    }

    async fn get_checked(&self, url: &str) -> Result<reqwest::Response, RemoteError> {
        let resp = self
            .http
            .get(url)
            .send()
            .await
            .map_err(|e| RemoteError::Transport(format!("GET {url} failed: {e}")))?;
        check_success(resp, url).await
    }
}

async fn check_success(
    resp: reqwest::Response,
    url: &str,
) -> Result<reqwest::Response, RemoteError> {
    let status = resp.status();
    if status.is_success() {
        return Ok(resp);
    }
    let message = resp.text().await.unwrap_or_default();
    Err(RemoteError::Http {
        status: status.as_u16(),
        message: format!("GET {url}: {message}"),
    })
}

#[async_trait]
impl RemoteIndexClient for HttpIndexClient {
    /// GET /packages
    async fn list_all_record_names(&self) -> Result<Vec<String>, RemoteError> {
        let url = format!("{}/packages", self.base_url);
        self.get_checked(&url)
            .await?
            .json()
            .await
            .map_err(|e| RemoteError::Protocol(format!("bad /packages response: {e}")))
    }

    /// GET /changelog?since=N
    async fn changelog_since(&self, since: u64) -> Result<Vec<ChangelogEntry>, RemoteError> {
        let url = format!("{}/changelog?since={}", self.base_url, since);
        self.get_checked(&url)
            .await?
            .json()
            .await
            .map_err(|e| RemoteError::Protocol(format!("bad /changelog response: {e}")))
    }

    /// GET /changelog/serial
    async fn latest_serial(&self) -> Result<u64, RemoteError> {
        let url = format!("{}/changelog/serial", self.base_url);
        self.get_checked(&url)
            .await?
            .json()
            .await
            .map_err(|e| RemoteError::Protocol(format!("bad /changelog/serial response: {e}")))
    }

    /// GET /pypi/{name}/json — 404 is expected absence, not an error.
    async fn fetch_current(&self, name: &str) -> Result<Option<Value>, RemoteError> {
        let url = self.metadata_url(name);
        let resp = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| RemoteError::Transport(format!("GET {url} failed: {e}")))?;
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let resp = check_success(resp, &url).await?;
        let value = resp
            .json::<Value>()
            .await
            .map_err(|e| RemoteError::Protocol(format!("bad document for {name}: {e}")))?;
        Ok(Some(value))
    }
}

/// Stream-download a seed archive into an unnamed temporary file,
/// rewound and ready for reading. The file is deleted when dropped.
pub async fn download_archive(url: &str) -> Result<std::fs::File> {
    // No overall timeout here: seed archives can be arbitrarily large.
    let mut resp = reqwest::Client::new()
        .get(url)
        .send()
        .await
        .with_context(|| format!("Failed to connect to {url}"))?;
    if !resp.status().is_success() {
        return Err(anyhow!("GET {} failed ({})", url, resp.status()));
    }

    let mut file = tempfile::tempfile().context("Failed to create temporary file")?;
    while let Some(chunk) = resp
        .chunk()
        .await
        .with_context(|| format!("Download from {url} interrupted"))?
    {
        file.write_all(&chunk)?;
    }
    file.seek(SeekFrom::Start(0))?;
    Ok(file)
}
