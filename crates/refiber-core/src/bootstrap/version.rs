//! Release version tags

use anyhow::Result;
use semver::Version;
use std::fmt;

/// A release version as it appears in tags (`v1.2.3`) and archive folders (`1.2.3`)
///
/// The value ends up in URLs and file names, so it is restricted to a
/// conservative character set.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseVersion(String);

impl ReleaseVersion {
    /// Parse a version string, handling an optional leading 'v'
    pub fn parse(version_str: &str) -> Result<Self> {
        let trimmed = version_str.trim();
        let cleaned = trimmed.strip_prefix('v').unwrap_or(trimmed);

        if cleaned.is_empty() {
            anyhow::bail!("Invalid version '{}': empty", version_str);
        }
        if let Some(bad) = cleaned
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '+' | '_')))
        {
            anyhow::bail!("Invalid version '{}': unexpected character {:?}", version_str, bad);
        }
        if cleaned.starts_with('.') {
            anyhow::bail!("Invalid version '{}'", version_str);
        }

        Ok(Self(cleaned.to_string()))
    }

    /// Version without the 'v' prefix
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Git tag name
    pub fn tag(&self) -> String {
        format!("v{}", self.0)
    }

    /// Semver view of the version, if it is one
    pub fn semver(&self) -> Option<Version> {
        Version::parse(&self.0).ok()
    }

    /// Pre-release tags are picked up by discovery too; callers may want to say so
    pub fn is_prerelease(&self) -> bool {
        self.semver().is_some_and(|v| !v.pre.is_empty())
    }
}

impl fmt::Display for ReleaseVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
