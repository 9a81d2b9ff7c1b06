//! Release discovery and archive download
//!
//! The latest release is read from the HTML releases page rather than the
//! `/latest` endpoint, which skips pre-release tags.

use super::version::ReleaseVersion;
use crate::product::ProductConfig;
use anyhow::{Context, Result};
use regex::Regex;
use reqwest::StatusCode;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use url::Url;

/// Release headings on the GitHub releases page
const RELEASE_TAG_PATTERN: &str = r#"<h2 class="sr-only" id.*v(.*)</h2>"#;

/// Where release archives come from
#[derive(Debug, Clone)]
pub enum ArchiveSource {
    /// Discover (or use a pinned) release and download it
    Remote { pinned: Option<ReleaseVersion> },
    /// Use an archive already on disk (for development use)
    Local {
        path: PathBuf,
        version: ReleaseVersion,
    },
}

/// Release fetcher - lists releases and downloads their archives
pub struct ReleaseFetcher {
    releases_url: Url,
    client: reqwest::Client,
}

impl ReleaseFetcher {
    /// Create a new fetcher with a custom user agent
    pub fn new(releases_url: Url, user_agent: &str) -> Self {
        Self {
            releases_url,
            client: reqwest::Client::builder()
                .user_agent(user_agent)
                .build()
                .unwrap_or_else(|_| reqwest::Client::new()),
        }
    }

    /// Create a fetcher from a product config, honoring the URL override variable
    pub fn from_config<C: ProductConfig>(config: &C) -> Result<Self> {
        let url_str = std::env::var(config.releases_url_env())
            .unwrap_or_else(|_| config.default_releases_url().to_string());
        let url =
            Url::parse(&url_str).with_context(|| format!("Invalid releases URL: {}", url_str))?;
        Ok(Self::new(url, config.user_agent()))
    }

    /// Releases page this fetcher reads
    pub fn releases_url(&self) -> &Url {
        &self.releases_url
    }

    /// Find the newest release tag listed on the releases page
    pub async fn latest_version(&self) -> Result<ReleaseVersion> {
        let response = self
            .client
            .get(self.releases_url.clone())
            .send()
            .await
            .with_context(|| format!("Failed to fetch releases from {}", self.releases_url))?;

        if response.status() != StatusCode::OK {
            anyhow::bail!(
                "failed when try to get releases data from {}: HTTP {}",
                self.releases_url,
                response.status()
            );
        }

        let body = response.text().await?;
        if body.is_empty() {
            anyhow::bail!("failed when try to get releases data: empty response");
        }

        let tags = scrape_release_tags(&body)?;
        let latest = tags
            .first()
            .ok_or_else(|| anyhow::anyhow!("could not find the latest release tag version"))?;
        tracing::info!(version = %latest, "discovered latest release");
        ReleaseVersion::parse(latest)
    }

    /// Stream an archive into a temporary file inside `dir`
    ///
    /// The file is deleted when the returned handle is dropped.
    pub async fn download_archive(&self, url: &str, dir: &Path) -> Result<NamedTempFile> {
        let url = Url::parse(url).with_context(|| format!("Invalid archive URL: {}", url))?;
        let mut response = self
            .client
            .get(url.clone())
            .send()
            .await
            .with_context(|| format!("Failed to download {}", url))?;

        if !response.status().is_success() {
            anyhow::bail!("Failed to download {}: HTTP {}", url, response.status());
        }

        let mut file = tempfile::Builder::new()
            .prefix(".release-")
            .suffix(".tar.gz")
            .tempfile_in(dir)
            .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;

        let mut written = 0usize;
        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk)
                .context("Failed to write downloaded archive")?;
            written += chunk.len();
        }
        file.flush()?;

        tracing::info!(url = %url, bytes = written, "downloaded release archive");
        Ok(file)
    }
}

/// Extract every release version from a releases page, newest first
pub fn scrape_release_tags(html: &str) -> Result<Vec<String>> {
    let re = Regex::new(RELEASE_TAG_PATTERN).context("Invalid release tag pattern")?;
    Ok(re
        .captures_iter(html)
        .filter_map(|caps| caps.get(1).map(|m| m.as_str().to_string()))
        .collect())
}
