//! `stencil delete <source>` and `stencil rename <old> <new>`

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use stencil_sync::pipeline::{self, RenderScope};
use stencil_sync::ArtifactResult;

use super::{display_path, print_results, Workspace};

/// Arguments for `stencil delete`.
#[derive(Args, Debug)]
pub struct DeleteArgs {
    /// Source whose artifacts should be removed.
    pub source: PathBuf,
}

impl DeleteArgs {
    pub fn run(self, workspace: &Workspace) -> Result<()> {
        let project = workspace.open()?;
        let source = workspace.resolve(&self.source);
        let templates = pipeline::open_templates(&project, &RenderScope::All)
            .context("failed to open templates")?;
        let results = pipeline::delete_source(&project, &templates, &source)
            .with_context(|| format!("delete failed for '{}'", source.display()))?;

        if results.iter().all(|(_, r)| *r == ArtifactResult::NoArtifact) {
            println!(
                "No artifacts generated from '{}'.",
                display_path(project.root(), &source)
            );
        }
        print_results(project.root(), &results, false);
        Ok(())
    }
}

/// Arguments for `stencil rename`.
#[derive(Args, Debug)]
pub struct RenameArgs {
    /// Previous source path.
    pub old: PathBuf,

    /// New source path. When only the old file exists it is moved first.
    pub new: PathBuf,
}

impl RenameArgs {
    pub fn run(self, workspace: &Workspace) -> Result<()> {
        let project = workspace.open()?;
        let old = workspace.resolve(&self.old);
        let new = workspace.resolve(&self.new);

        if old.is_file() && !new.exists() {
            if let Some(parent) = new.parent() {
                fs::create_dir_all(parent)
                    .with_context(|| format!("cannot create '{}'", parent.display()))?;
            }
            fs::rename(&old, &new).with_context(|| {
                format!("cannot move '{}' to '{}'", old.display(), new.display())
            })?;
        }
        if !new.is_file() {
            anyhow::bail!("source '{}' does not exist", new.display());
        }

        let templates = pipeline::open_templates(&project, &RenderScope::All)
            .context("failed to open templates")?;
        let results = pipeline::rename_source(&project, &templates, &old, &new)
            .with_context(|| {
                format!("rename failed for '{}' -> '{}'", old.display(), new.display())
            })?;
        print_results(project.root(), &results, true);
        Ok(())
    }
}
