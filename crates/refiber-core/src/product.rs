//! Product configuration trait for CLI binaries
//!
//! The bootstrap flow itself knows nothing about GitHub or Go module names;
//! a binary supplies those through this trait.

use crate::bootstrap::version::ReleaseVersion;
use std::path::Path;

/// Configuration trait for a project template product
///
/// Each product defines:
/// - Product identity (name, display name)
/// - Where releases are listed and where their archives live
/// - The placeholder module name baked into the template
/// - Post-setup instructions
pub trait ProductConfig: Clone + Send + Sync + 'static {
    /// Internal product name (used for CLI command, archive root folder)
    fn name(&self) -> &'static str;

    /// Human-readable display name
    fn display_name(&self) -> &'static str;

    /// Default URL of the HTML releases page scraped for the latest tag
    fn default_releases_url(&self) -> &'static str;

    /// Environment variable name for overriding the releases page URL
    fn releases_url_env(&self) -> &'static str;

    /// URL of the source archive for a release
    fn archive_url(&self, version: &ReleaseVersion) -> String;

    /// Module identifier baked into the template sources
    fn default_module_name(&self) -> &'static str;

    /// Generate the "next steps" instructions after project creation
    fn next_steps(&self, dir: &Path) -> Vec<String>;

    /// Top-level folder inside the release archive
    fn archive_root_folder(&self, version: &ReleaseVersion) -> String {
        format!("{}-{}", self.name(), version)
    }

    /// User agent string for HTTP requests
    fn user_agent(&self) -> &'static str {
        self.name()
    }
}
