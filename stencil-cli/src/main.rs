//! stencil: keep generated files in step with the sources they come from.
//!
//! # Usage
//!
//! ```text
//! stencil [--root <dir>] init [<dir>]
//! stencil template add <template> [--ext <ext>] [--filename <expr>] [--include <dir>...] [--pattern <glob>]
//! stencil template list
//! stencil template remove <template>
//! stencil render [--template <template>] [--source <file>]
//! stencil delete <source>
//! stencil rename <old> <new>
//! stencil status [--template <template>] [--json]
//! stencil diff [--template <template>]
//! stencil prune [--template <template>]
//! stencil watch
//! ```

mod commands;

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};

use commands::{
    diff::DiffArgs,
    init::InitArgs,
    lifecycle::{DeleteArgs, RenameArgs},
    prune::PruneArgs,
    render::RenderArgs,
    status::StatusArgs,
    template::TemplateCommand,
    watch::WatchArgs,
    Workspace,
};

// ---------------------------------------------------------------------------
// CLI entry point
// ---------------------------------------------------------------------------

#[derive(Parser, Debug)]
#[command(
    name = "stencil",
    version,
    about = "Render templates over source files and keep the generated artifacts in sync",
    long_about = None,
)]
struct Cli {
    /// Project root. Defaults to the nearest ancestor holding a stencil.yaml.
    #[arg(long, global = true, value_name = "DIR")]
    root: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Create a stencil.yaml manifest.
    Init(InitArgs),

    /// Manage the templates tracked by the project.
    Template {
        #[command(subcommand)]
        command: TemplateCommand,
    },

    /// Render sources and write their artifacts.
    Render(RenderArgs),

    /// Delete the artifacts generated from a source.
    Delete(DeleteArgs),

    /// Follow a source rename in every template.
    Rename(RenameArgs),

    /// Show the state of every tracked artifact.
    Status(StatusArgs),

    /// Show unified diffs of what render would write.
    Diff(DiffArgs),

    /// Delete artifacts whose source is gone.
    Prune(PruneArgs),

    /// Watch the project and render on change until ctrl-c.
    Watch(WatchArgs),
}

// ---------------------------------------------------------------------------
// Main
// ---------------------------------------------------------------------------

fn main() -> Result<()> {
    let cli = Cli::parse();
    // The watcher installs its own tracing subscriber, which also captures `log`.
    if !matches!(cli.command, Commands::Watch(_)) {
        init_logging();
    }

    let workspace = Workspace::new(cli.root)?;
    match cli.command {
        Commands::Init(args) => args.run(&workspace),
        Commands::Template { command } => commands::template::run(command, &workspace),
        Commands::Render(args) => args.run(&workspace),
        Commands::Delete(args) => args.run(&workspace),
        Commands::Rename(args) => args.run(&workspace),
        Commands::Status(args) => args.run(&workspace),
        Commands::Diff(args) => args.run(&workspace),
        Commands::Prune(args) => args.run(&workspace),
        Commands::Watch(args) => args.run(&workspace),
    }
}

fn init_logging() {
    let env = env_logger::Env::new()
        .filter_or("STENCIL_LOG", "warn")
        .write_style("STENCIL_LOG_STYLE");
    let _ = env_logger::Builder::from_env(env)
        .format_timestamp(None)
        .try_init();
}
