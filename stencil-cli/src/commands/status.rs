//! `stencil status`: artifact state per template.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use colored::Colorize;
use serde::Serialize;
use tabled::{settings::Style, Table, Tabled};

use stencil_sync::{pipeline, ArtifactReport, ArtifactStatus};

use super::{display_path, Workspace};

/// Arguments for `stencil status`.
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Only report on this template.
    #[arg(long, value_name = "TEMPLATE")]
    pub template: Option<PathBuf>,

    /// Emit machine-readable JSON.
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    pub fn run(self, workspace: &Workspace) -> Result<()> {
        let project = workspace.open()?;
        let scope = workspace.scope(self.template.as_deref());
        let templates =
            pipeline::open_templates(&project, &scope).context("failed to open templates")?;

        let mut report = Vec::with_capacity(templates.len());
        for template in &templates {
            let artifacts = template.status().with_context(|| {
                format!("status check failed for '{}'", template.path().display())
            })?;
            report.push((template.path().to_path_buf(), artifacts));
        }

        if self.json {
            print_json(project.root(), report)?;
            return Ok(());
        }
        print_table(project.root(), report);
        Ok(())
    }
}

type TemplateStatus = (PathBuf, Vec<ArtifactReport>);

#[derive(Serialize)]
struct StatusReportJson {
    summary: StatusSummaryJson,
    templates: Vec<TemplateStatusJson>,
}

#[derive(Serialize, Default)]
struct StatusSummaryJson {
    templates: usize,
    artifacts: usize,
    current: usize,
    orphaned: usize,
    unmapped: usize,
    missing: usize,
}

#[derive(Serialize)]
struct TemplateStatusJson {
    template: String,
    artifacts: Vec<ArtifactStatusJson>,
}

#[derive(Serialize)]
struct ArtifactStatusJson {
    artifact: String,
    source: Option<String>,
    status: &'static str,
}

#[derive(Tabled)]
struct StatusTableRow {
    #[tabled(rename = "artifact")]
    artifact: String,
    #[tabled(rename = "source")]
    source: String,
    #[tabled(rename = "status")]
    status: String,
}

impl StatusSummaryJson {
    fn count(&mut self, status: &ArtifactStatus) {
        self.artifacts += 1;
        match status {
            ArtifactStatus::Current => self.current += 1,
            ArtifactStatus::Orphaned { .. } => self.orphaned += 1,
            ArtifactStatus::Unmapped => self.unmapped += 1,
            ArtifactStatus::Missing => self.missing += 1,
        }
    }
}

fn summarize(report: &[TemplateStatus]) -> StatusSummaryJson {
    let mut summary = StatusSummaryJson {
        templates: report.len(),
        ..StatusSummaryJson::default()
    };
    for (_, artifacts) in report {
        for artifact in artifacts {
            summary.count(&artifact.status);
        }
    }
    summary
}

fn print_json(root: &Path, report: Vec<TemplateStatus>) -> Result<()> {
    let payload = StatusReportJson {
        summary: summarize(&report),
        templates: report
            .into_iter()
            .map(|(template, artifacts)| TemplateStatusJson {
                template: display_path(root, &template),
                artifacts: artifacts
                    .into_iter()
                    .map(|a| ArtifactStatusJson {
                        artifact: display_path(root, &a.artifact),
                        source: a.source.as_deref().map(|s| display_path(root, s)),
                        status: a.status.label(),
                    })
                    .collect(),
            })
            .collect(),
    };
    println!(
        "{}",
        serde_json::to_string_pretty(&payload).context("failed to serialize status JSON")?
    );
    Ok(())
}

fn print_table(root: &Path, report: Vec<TemplateStatus>) {
    let summary = summarize(&report);
    println!(
        "stencil v{} | {} templates | {} artifacts | {} need attention",
        env!("CARGO_PKG_VERSION"),
        summary.templates,
        summary.artifacts,
        summary.artifacts - summary.current,
    );

    if report.is_empty() {
        println!("No templates tracked.");
        return;
    }

    let separator = "■".repeat(60).bright_black().to_string();
    println!("{separator}");
    for (template, artifacts) in report {
        println!("{}", display_path(root, &template).bold());
        if artifacts.is_empty() {
            println!("  (no artifacts)");
            println!("{separator}");
            continue;
        }
        let rows: Vec<StatusTableRow> = artifacts
            .into_iter()
            .map(|a| StatusTableRow {
                artifact: display_path(root, &a.artifact),
                source: a
                    .source
                    .as_deref()
                    .map(|s| display_path(root, s))
                    .unwrap_or_else(|| "-".to_string()),
                status: status_indicator(&a.status),
            })
            .collect();
        let mut table = Table::new(rows);
        table.with(Style::rounded());
        println!("{table}");
        println!("{separator}");
    }

    if summary.orphaned > 0 {
        println!("Run 'stencil prune' to delete orphaned artifacts.");
    }
    if summary.missing > 0 {
        println!("Run 'stencil render' to regenerate missing artifacts.");
    }
}

fn status_indicator(status: &ArtifactStatus) -> String {
    let label = status.label().to_uppercase();
    match status {
        ArtifactStatus::Current => label.green().bold().to_string(),
        ArtifactStatus::Orphaned { .. } => label.magenta().bold().to_string(),
        ArtifactStatus::Unmapped => label.yellow().bold().to_string(),
        ArtifactStatus::Missing => label.red().bold().to_string(),
    }
}
