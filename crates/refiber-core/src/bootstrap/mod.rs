//! Project bootstrap: release discovery, archive extraction, module rewrite
//!
//! This module provides:
//! - Release discovery and download (`release`)
//! - Safe .tar.gz extraction into the project directory (`extractor`)
//! - Concurrent Go module name rewriting (`rewriter`)
//! - Release tag parsing (`version`)

pub mod extractor;
pub mod release;
pub mod rewriter;
pub mod version;

use crate::product::ProductConfig;
use anyhow::{Context, Result};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

pub use extractor::extract_tar_gz;
pub use release::{scrape_release_tags, ArchiveSource, ReleaseFetcher};
pub use rewriter::{rewrite_module_name, RewriteJob, RewriteReport};
pub use version::ReleaseVersion;

/// Steps of [`create_project`], reported as they start
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Preparing,
    Discovering,
    Downloading(ReleaseVersion),
    Extracting,
    RewritingModule,
    Done,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stage::Preparing => write!(f, "Preparing..."),
            Stage::Discovering => write!(f, "Looking up the latest release..."),
            Stage::Downloading(version) => write!(f, "Downloading {}...", version.tag()),
            Stage::Extracting => write!(f, "Extracting..."),
            Stage::RewritingModule => write!(f, "Updating module name..."),
            Stage::Done => write!(f, "Done"),
        }
    }
}

/// What to create and where
#[derive(Debug, Clone)]
pub struct ProjectRequest {
    /// Directory the project is extracted into (created if missing)
    pub project_dir: PathBuf,
    /// Module name replacing the template's default one
    pub module_name: Option<String>,
    /// Release archive to use
    pub source: ArchiveSource,
}

/// Result of a successful bootstrap
#[derive(Debug, Clone)]
pub struct ProjectOutcome {
    pub project_dir: PathBuf,
    pub version: ReleaseVersion,
    /// Non-fatal problems (module rewrite, .env copy)
    pub warnings: Vec<String>,
    pub rewrite: Option<RewriteReport>,
}

/// Create a project from a release archive
///
/// Extraction failures abort; module rewrite and `.env` failures are
/// reported through [`ProjectOutcome::warnings`].
pub async fn create_project<C: ProductConfig>(
    config: &C,
    request: &ProjectRequest,
    mut on_stage: impl FnMut(&Stage),
) -> Result<ProjectOutcome> {
    let project_dir = request.project_dir.clone();

    on_stage(&Stage::Preparing);
    if directory_is_non_empty(&project_dir) {
        anyhow::bail!(
            "directory {} already exists and is not empty. Please choose a different name",
            project_dir.display()
        );
    }
    create_project_dir(&project_dir)?;

    // Keeps a downloaded archive alive until extraction is done
    let mut download = None;
    let (archive_path, version) = match &request.source {
        ArchiveSource::Local { path, version } => (path.clone(), version.clone()),
        ArchiveSource::Remote { pinned } => {
            let fetcher = ReleaseFetcher::from_config(config)?;
            let version = match pinned {
                Some(version) => version.clone(),
                None => {
                    on_stage(&Stage::Discovering);
                    fetcher.latest_version().await?
                }
            };

            on_stage(&Stage::Downloading(version.clone()));
            let scratch = project_dir
                .parent()
                .filter(|p| !p.as_os_str().is_empty())
                .unwrap_or(Path::new("."));
            let file = fetcher
                .download_archive(&config.archive_url(&version), scratch)
                .await?;
            let path = file.path().to_path_buf();
            download = Some(file);
            (path, version)
        }
    };

    on_stage(&Stage::Extracting);
    let root_folder = config.archive_root_folder(&version);
    tracing::info!(
        archive = %archive_path.display(),
        dest = %project_dir.display(),
        root = %root_folder,
        "extracting release"
    );
    {
        let dest = project_dir.clone();
        tokio::task::spawn_blocking(move || extract_tar_gz(&archive_path, &dest, &root_folder))
            .await
            .context("Extraction task failed")?
            .context("Failed to extract release archive")?;
    }
    if let Some(file) = download {
        file.close()
            .context("Failed to remove downloaded archive")?;
    }

    let mut warnings = Vec::new();
    if let Err(e) = copy_env_example(&project_dir) {
        warnings.push(format!("{:#}", e));
    }

    let mut rewrite = None;
    if let Some(module) = wanted_module_name(config, request.module_name.as_deref()) {
        on_stage(&Stage::RewritingModule);
        let dir = project_dir.clone();
        let default = config.default_module_name();
        let (report, rewrite_warnings) = tokio::task::spawn_blocking(move || {
            let mut warnings = Vec::new();
            rewrite_module_name(&dir, default, &module, &mut warnings)
                .map(|report| (report, warnings))
        })
        .await
        .context("Module rewrite task failed")??;

        tracing::info!(
            files = report.processed.len(),
            changed = report.changed,
            "module name updated"
        );
        warnings.extend(rewrite_warnings);
        rewrite = Some(report);
    }

    on_stage(&Stage::Done);
    Ok(ProjectOutcome {
        project_dir,
        version,
        warnings,
        rewrite,
    })
}

/// Module name to rewrite to, if it differs from the template's default
fn wanted_module_name<C: ProductConfig>(config: &C, module_name: Option<&str>) -> Option<String> {
    let module = module_name?.trim();
    if module.is_empty() || module == config.default_module_name() {
        return None;
    }
    Some(module.to_string())
}

/// True when `path` is a directory with at least one entry
pub fn directory_is_non_empty(path: &Path) -> bool {
    fs::read_dir(path)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

fn create_project_dir(path: &Path) -> Result<()> {
    if path.exists() {
        return Ok(());
    }

    let mut builder = fs::DirBuilder::new();
    builder.recursive(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::DirBuilderExt;
        builder.mode(0o751);
    }
    builder
        .create(path)
        .with_context(|| format!("Failed to create directory: {}", path.display()))
}

/// Seed `.env` from `.env.example`; an existing `.env` is left alone
///
/// Returns whether a copy was made.
pub fn copy_env_example(project_dir: &Path) -> Result<bool> {
    let example = project_dir.join(".env.example");
    let env = project_dir.join(".env");
    if !example.is_file() || env.exists() {
        return Ok(false);
    }

    fs::copy(&example, &env).with_context(|| {
        format!(
            "Failed to copy {} to {}",
            example.display(),
            env.display()
        )
    })?;
    Ok(true)
}
