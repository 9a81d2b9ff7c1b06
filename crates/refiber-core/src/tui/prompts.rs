//! Charm-style CLI prompts using cliclack

use crate::bootstrap::{self, ArchiveSource, ProjectOutcome, ProjectRequest, ReleaseVersion};
use crate::product::ProductConfig;
use anyhow::Result;
use colored::Colorize;
use std::path::{Path, PathBuf};

/// CLI arguments for the new-project command
#[derive(Debug, Clone, Default)]
pub struct CreateArgs {
    /// Project name (also the directory created under the current one)
    pub name: Option<String>,

    /// Go module name to use instead of the template's default
    pub module: Option<String>,

    /// Release to use instead of the latest one
    pub version: Option<String>,

    /// Local release archive to use instead of downloading (for development use)
    pub archive: Option<PathBuf>,

    /// Auto-confirm all prompts (non-interactive mode)
    pub yes: bool,
}

/// Run the CLI with interactive prompts
pub async fn run<C: ProductConfig>(config: &C, args: CreateArgs) -> Result<()> {
    cliclack::intro(config.display_name())?;

    // Step 1: Project name and directory
    let project_dir = select_project_dir(&args)?;

    // Step 2: Module name
    let module_name = select_module_name(config, &args)?;

    // Step 3: Release source
    let source = select_source(&args)?;

    // Step 4: Create project
    let request = ProjectRequest {
        project_dir,
        module_name,
        source,
    };
    let outcome = create_project(config, &request).await?;

    if outcome.version.is_prerelease() {
        cliclack::log::info(format!(
            "{} is a pre-release version",
            outcome.version.tag()
        ))?;
    }
    for warning in &outcome.warnings {
        cliclack::log::warning(warning)?;
    }

    // Step 5: Show next steps
    print_next_steps(config, &outcome.project_dir)?;

    Ok(())
}

fn select_project_dir(args: &CreateArgs) -> Result<PathBuf> {
    let name = match &args.name {
        Some(name) => name.trim().to_string(),
        None => {
            let input: String = cliclack::input("Please provide a project name")
                .placeholder("my-app")
                .validate(|input: &String| {
                    if input.trim().is_empty() {
                        Err("Project name is required")
                    } else {
                        Ok(())
                    }
                })
                .interact()?;
            input.trim().to_string()
        }
    };

    if name.is_empty() {
        anyhow::bail!("Project name is required.");
    }

    let current_dir = std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."));
    let path = current_dir.join(&name);

    if bootstrap::directory_is_non_empty(&path) {
        anyhow::bail!(
            "directory {} already exists and is not empty. Please choose a different name",
            name
        );
    }

    cliclack::log::info(format!("Using directory: {}", path.display()))?;
    Ok(path)
}

fn select_module_name<C: ProductConfig>(config: &C, args: &CreateArgs) -> Result<Option<String>> {
    if let Some(module) = &args.module {
        return Ok(Some(module.clone()));
    }

    // Keep the template's module name in non-interactive mode
    if args.yes {
        return Ok(None);
    }

    let input: String = cliclack::input("Go module name")
        .placeholder(config.default_module_name())
        .default_input(config.default_module_name())
        .validate(|input: &String| {
            if input.trim().chars().any(char::is_whitespace) {
                Err("Module name cannot contain spaces")
            } else {
                Ok(())
            }
        })
        .interact()?;

    Ok(Some(input))
}

fn select_source(args: &CreateArgs) -> Result<ArchiveSource> {
    let pinned = args
        .version
        .as_deref()
        .map(ReleaseVersion::parse)
        .transpose()?;

    match &args.archive {
        Some(path) => {
            let version = pinned.ok_or_else(|| {
                anyhow::anyhow!("--release is required when using a local archive")
            })?;
            cliclack::log::info(format!("Using local archive {}", path.display()))?;
            Ok(ArchiveSource::Local {
                path: path.clone(),
                version,
            })
        }
        None => {
            if let Some(version) = &pinned {
                cliclack::log::info(format!("Using release {}", version.tag()))?;
            }
            Ok(ArchiveSource::Remote { pinned })
        }
    }
}

async fn create_project<C: ProductConfig>(
    config: &C,
    request: &ProjectRequest,
) -> Result<ProjectOutcome> {
    let spinner = cliclack::spinner();
    spinner.start("Preparing...");

    let result = bootstrap::create_project(config, request, |stage| {
        spinner.set_message(stage);
    })
    .await;

    match result {
        Ok(outcome) => {
            spinner.stop(format!(
                "Created {} project ({}) in {}",
                config.display_name(),
                outcome.version.tag(),
                outcome.project_dir.display()
            ));
            Ok(outcome)
        }
        Err(e) => {
            spinner.stop("Failed to create project");
            Err(e)
        }
    }
}

fn print_next_steps<C: ProductConfig>(config: &C, project_dir: &Path) -> Result<()> {
    let steps = config.next_steps(project_dir);

    println!();
    println!("  Next steps");
    println!();

    for step in &steps {
        let (command, rest) = step.split_once(' ').unwrap_or((step.as_str(), ""));
        println!("  {} {}", command.green(), rest.dimmed());
        println!();
    }

    cliclack::outro("Happy coding!")?;

    Ok(())
}
