//! Refiber CLI - Project bootstrapping from Refiber releases

use anyhow::Result;
use clap::{ArgAction, Parser, Subcommand};
use refiber_core::tui::CreateArgs;
use refiber_core::{ProductConfig, ReleaseVersion};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Refiber product configuration
#[derive(Clone)]
pub struct RefiberConfig;

impl ProductConfig for RefiberConfig {
    fn name(&self) -> &'static str {
        "refiber"
    }

    fn display_name(&self) -> &'static str {
        "Refiber"
    }

    fn default_releases_url(&self) -> &'static str {
        "https://github.com/refiber/refiber/releases"
    }

    fn releases_url_env(&self) -> &'static str {
        "REFIBER_RELEASES_URL"
    }

    fn archive_url(&self, version: &ReleaseVersion) -> String {
        format!(
            "https://github.com/refiber/refiber/archive/refs/tags/{}.tar.gz",
            version.tag()
        )
    }

    fn default_module_name(&self) -> &'static str {
        "bykevin.work/refiber"
    }

    fn next_steps(&self, dir: &Path) -> Vec<String> {
        let mut steps = Vec::new();
        let current = std::env::current_dir().ok();

        // Step 1: cd to directory if not current
        if current.as_deref() != Some(dir) {
            let shown = current
                .as_deref()
                .and_then(|cwd| dir.strip_prefix(cwd).ok())
                .unwrap_or(dir);
            steps.push(format!("cd {}", shown.display()));
        }

        // Step 2: frontend assets
        steps.push("npm i && npm run build".to_string());

        // Step 3: live-reload dev server
        steps.push("air".to_string());

        steps
    }
}

#[derive(Parser, Debug)]
#[command(name = "refiber")]
#[command(about = "CLI for bootstrapping Refiber projects")]
#[command(version)]
pub struct Args {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Initiate a new Refiber project
    New(NewArgs),
}

#[derive(Parser, Debug)]
pub struct NewArgs {
    /// Project name; a directory with this name is created
    pub name: Option<String>,

    /// Go module name for the project (defaults to the template's)
    #[arg(short, long)]
    pub module: Option<String>,

    /// Release version to use instead of the latest one
    #[arg(long = "release")]
    pub release: Option<String>,

    /// Local release archive (.tar.gz) to use instead of downloading (for development use)
    #[arg(long)]
    pub archive: Option<PathBuf>,

    /// Auto-confirm all prompts (non-interactive mode)
    #[arg(short, long)]
    pub yes: bool,
}

impl From<NewArgs> for CreateArgs {
    fn from(args: NewArgs) -> Self {
        CreateArgs {
            name: args.name,
            module: args.module,
            version: args.release,
            archive: args.archive,
            yes: args.yes,
        }
    }
}

/// Map `-v` occurrences to a filter level
fn log_level(verbose: u8) -> &'static str {
    match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

fn init_logging(verbose: u8) {
    let level = log_level(verbose);
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("refiber={level},refiber_core={level}")));

    // A second subscriber (tests) is not an error worth surfacing
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .try_init();
}

#[tokio::main]
async fn main() -> Result<()> {
    // Ensure terminal cursor is restored on panic
    let default_panic = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let _ = console::Term::stderr().show_cursor();
        default_panic(info);
    }));

    // Handle Ctrl+C gracefully
    ctrlc::set_handler(move || {
        let _ = console::Term::stderr().show_cursor();
        std::process::exit(130);
    })
    .ok();

    let args = Args::parse();
    init_logging(args.verbose);
    let config = RefiberConfig;

    let create_args = match args.command {
        Some(Command::New(new_args)) => new_args.into(),
        // No subcommand provided, default to new-project behavior (interactive mode)
        None => CreateArgs::default(),
    };
    tracing::debug!(?create_args, "starting");

    let result = refiber_core::run(&config, create_args).await;

    // Ensure cursor is visible on normal exit
    let _ = console::Term::stderr().show_cursor();

    result
}
