//! Typed failures of the extraction and rewrite stages
//!
//! Orchestration code wraps these in `anyhow` with extra context; the enums
//! exist so callers (and tests) can tell a hostile archive apart from an
//! ordinary I/O failure.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while unpacking a release archive. All of them are fatal.
#[derive(Debug, Error)]
pub enum ExtractError {
    #[error("failed to open archive {}: {source}", path.display())]
    Open {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to read tar header: {0}")]
    ReadEntry(#[source] io::Error),

    /// The entry would land outside the destination directory
    #[error("illegal file path: {}", path.display())]
    IllegalPath { path: PathBuf },

    #[error("entry name is not valid UTF-8: {name}")]
    NonUtf8Path { name: String },

    #[error("failed to create directory {}: {source}", path.display())]
    CreateDir {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to create file {}: {source}", path.display())]
    CreateFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write file {}: {source}", path.display())]
    WriteFile {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to set file permissions on {}: {source}", path.display())]
    SetPermissions {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// Errors raised inside the rewrite pipeline.
///
/// These never abort a bootstrap: the first one is turned into a warning.
#[derive(Debug, Error)]
pub enum RewriteError {
    #[error("failed to walk {}: {source}", root.display())]
    Walk {
        root: PathBuf,
        #[source]
        source: walkdir::Error,
    },

    #[error("failed to read {}: {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl ExtractError {
    /// True when the archive tried to escape the destination directory
    pub fn is_containment_violation(&self) -> bool {
        matches!(self, ExtractError::IllegalPath { .. })
    }
}
