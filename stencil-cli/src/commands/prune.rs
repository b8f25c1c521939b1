//! `stencil prune`: delete artifacts whose source is gone.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use stencil_sync::pipeline;

use super::{display_path, Workspace};

/// Arguments for `stencil prune`.
#[derive(Args, Debug)]
pub struct PruneArgs {
    /// Only prune this template.
    #[arg(long, value_name = "TEMPLATE")]
    pub template: Option<PathBuf>,
}

impl PruneArgs {
    pub fn run(self, workspace: &Workspace) -> Result<()> {
        let project = workspace.open()?;
        let scope = workspace.scope(self.template.as_deref());
        let templates =
            pipeline::open_templates(&project, &scope).context("failed to open templates")?;

        let mut removed = Vec::new();
        for template in &templates {
            removed.extend(template.prune_orphans(false).with_context(|| {
                format!(
                    "prune failed for '{}'",
                    display_path(project.root(), template.path())
                )
            })?);
        }

        if removed.is_empty() {
            println!("No orphaned artifacts.");
            return Ok(());
        }
        project.save().context("failed to save stencil.yaml")?;
        for path in &removed {
            println!("✗ deleted {}", display_path(project.root(), path));
        }
        println!("✓ Pruned {} artifact(s)", removed.len());
        Ok(())
    }
}
