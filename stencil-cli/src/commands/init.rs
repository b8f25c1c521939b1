//! `stencil init [<dir>]`

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use stencil_core::{project::manifest_path_at, Project};

use super::Workspace;

/// Create a stencil.yaml manifest.
#[derive(Args, Debug)]
pub struct InitArgs {
    /// Project root directory. Defaults to `--root` or the current directory.
    pub path: Option<PathBuf>,
}

impl InitArgs {
    pub fn run(self, workspace: &Workspace) -> Result<()> {
        let target = match &self.path {
            Some(path) => workspace.resolve(path),
            None => workspace.init_target(),
        };
        fs::create_dir_all(&target)
            .with_context(|| format!("cannot create '{}'", target.display()))?;
        let root = fs::canonicalize(&target)
            .with_context(|| format!("cannot resolve path '{}'", target.display()))?;

        let existed = manifest_path_at(&root).is_file();
        let project = Project::init_at(&root)
            .with_context(|| format!("failed to init project at '{}'", root.display()))?;

        if existed {
            println!(
                "✓ Project already initialized ({} templates)",
                project.templates().len()
            );
        } else {
            println!("✓ Initialized project at '{}'", root.display());
        }
        println!("  Manifest: {}", manifest_path_at(&root).display());
        Ok(())
    }
}
