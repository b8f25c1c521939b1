//! `stencil watch`: foreground watcher, stopped with ctrl-c.

use anyhow::{Context, Result};
use clap::Args;

use super::Workspace;

/// Arguments for `stencil watch`. Log verbosity follows `RUST_LOG`.
#[derive(Args, Debug)]
pub struct WatchArgs {}

impl WatchArgs {
    pub fn run(self, workspace: &Workspace) -> Result<()> {
        let root = workspace.project_root()?;
        println!("Watching '{}' (ctrl-c to stop)", root.display());
        stencil_watch::start_blocking(&root).context("watcher exited with error")?;
        Ok(())
    }
}
