//! `stencil diff`: show unified diffs for what render would write.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use stencil_sync::{diff_template, pipeline};

use super::{display_path, Workspace};

/// Arguments for `stencil diff`.
#[derive(Args, Debug)]
pub struct DiffArgs {
    /// Only diff this template.
    #[arg(long, value_name = "TEMPLATE")]
    pub template: Option<PathBuf>,
}

impl DiffArgs {
    pub fn run(self, workspace: &Workspace) -> Result<()> {
        let project = workspace.open()?;
        let scope = workspace.scope(self.template.as_deref());
        let templates =
            pipeline::open_templates(&project, &scope).context("failed to open templates")?;

        let mut any = false;
        for template in &templates {
            let diffs = diff_template(template, project.root()).with_context(|| {
                format!(
                    "diff failed for '{}'",
                    display_path(project.root(), template.path())
                )
            })?;
            for diff in diffs {
                any = true;
                print!("{}", diff.unified_diff);
                if !diff.unified_diff.ends_with('\n') {
                    println!();
                }
            }
        }

        if !any {
            println!("No differences.");
        }
        Ok(())
    }
}
