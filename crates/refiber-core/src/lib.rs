//! Refiber Core - bootstrap library for the Refiber project CLI
//!
//! Creates a new project from a released source archive of the Refiber
//! template: the archive is unpacked into the project directory and the
//! template's Go module name is replaced with the user's.
//!
//! # Architecture
//!
//! - **Layer 1: Core Operations** - archive extraction, module rewriting, release lookup
//! - **Layer 2: Workflow Orchestration** - `ProductConfig` trait and `create_project`
//! - **Layer 3: CLI/TUI Interface** - Optional cliclack-based prompts (feature-gated)
//!
//! # Feature Flags
//!
//! - `tui` (default): Enables the cliclack-based TUI prompts module
//!
//! # Example Usage (without TUI)
//!
//! ```ignore
//! use refiber_core::bootstrap::{extract_tar_gz, rewrite_module_name};
//!
//! extract_tar_gz(&archive, &dest, "refiber-0.3.1")?;
//!
//! let mut warnings = Vec::new();
//! rewrite_module_name(&dest, "bykevin.work/refiber", "example.com/app", &mut warnings)?;
//! ```
//!
//! Logging goes through `tracing`; installing a subscriber is left to the binary.

pub mod bootstrap;
pub mod error;
pub mod product;

#[cfg(feature = "tui")]
pub mod tui;

// Re-export main types for convenience
pub use bootstrap::{
    create_project, extract_tar_gz, rewrite_module_name, ArchiveSource, ProjectOutcome,
    ProjectRequest, ReleaseFetcher, ReleaseVersion, RewriteReport, Stage,
};
pub use error::{ExtractError, RewriteError};
pub use product::ProductConfig;

#[cfg(feature = "tui")]
pub use tui::run;
