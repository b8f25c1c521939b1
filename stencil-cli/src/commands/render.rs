//! `stencil render`: render sources and write their artifacts.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;

use stencil_sync::pipeline::{self, TemplateRun};

use super::{display_path, print_results, Workspace};

/// Arguments for `stencil render`.
#[derive(Args, Debug)]
pub struct RenderArgs {
    /// Only render with this template.
    #[arg(long, value_name = "TEMPLATE")]
    pub template: Option<PathBuf>,

    /// Only render this source file.
    #[arg(long, value_name = "FILE")]
    pub source: Option<PathBuf>,

    /// Also list artifacts that did not change.
    #[arg(long, short = 'v')]
    pub verbose: bool,
}

impl RenderArgs {
    pub fn run(self, workspace: &Workspace) -> Result<()> {
        let project = workspace.open()?;
        let scope = workspace.scope(self.template.as_deref());
        let root = project.root().to_path_buf();

        if let Some(source) = &self.source {
            let source = workspace.resolve(source);
            let templates = pipeline::open_templates(&project, &scope)
                .context("failed to open templates")?;
            let results = pipeline::render_source(&project, &templates, &source)
                .with_context(|| format!("render failed for '{}'", source.display()))?;
            if results.is_empty() {
                println!(
                    "No template processes '{}'.",
                    display_path(&root, &source)
                );
            }
            print_results(&root, &results, self.verbose);
            return Ok(());
        }

        let runs = pipeline::run(&project, &scope).context("render failed")?;
        if runs.is_empty() {
            println!("No templates tracked. Run `stencil template add` first.");
            return Ok(());
        }
        let failed = summarize(&root, &runs, self.verbose);
        if failed > 0 {
            anyhow::bail!("{failed} source(s) failed to render");
        }
        Ok(())
    }
}

fn summarize(root: &Path, runs: &[TemplateRun], verbose: bool) -> usize {
    let mut failed = 0;
    for run in runs {
        println!(
            "{}: {} changed, {} sources",
            display_path(root, &run.template),
            run.changed(),
            run.results.len() + run.failures.len()
        );
        print_results(root, &run.results, verbose);
        for failure in &run.failures {
            eprintln!(
                "✗ {}: {}",
                display_path(root, &failure.source),
                failure.error
            );
        }
        failed += run.failures.len();
    }
    failed
}
