//! `stencil template add|list|remove`

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use tabled::{settings::Style, Table, Tabled};

use stencil_core::TemplateSettings;
use stencil_sync::Template;

use super::{display_path, Workspace};

/// Manage the templates tracked by the project.
#[derive(Subcommand, Debug)]
pub enum TemplateCommand {
    /// Track a template, or replace the settings of a tracked one.
    Add(AddArgs),

    /// List tracked templates with their source selection.
    List,

    /// Stop tracking a template. Its artifacts stay on disk.
    Remove(RemoveArgs),
}

#[derive(Args, Debug)]
pub struct AddArgs {
    /// Tera template file inside the project.
    pub template: PathBuf,

    /// Extension for generated files (default `.ts`).
    #[arg(long = "ext", value_name = "EXT")]
    pub output_extension: Option<String>,

    /// Tera expression naming each artifact, e.g. `{{ stem }}.model`.
    #[arg(long = "filename", value_name = "EXPR")]
    pub output_filename: Option<String>,

    /// Root-relative directory to take sources from. Repeatable.
    #[arg(long = "include", value_name = "DIR")]
    pub include: Vec<String>,

    /// Glob selecting sources inside each included directory.
    #[arg(long, value_name = "GLOB")]
    pub pattern: Option<String>,
}

#[derive(Args, Debug)]
pub struct RemoveArgs {
    /// Tracked template to remove.
    pub template: PathBuf,
}

#[derive(Tabled)]
struct TemplateRow {
    #[tabled(rename = "template")]
    template: String,
    #[tabled(rename = "include")]
    include: String,
    #[tabled(rename = "pattern")]
    pattern: String,
    #[tabled(rename = "ext")]
    extension: String,
    #[tabled(rename = "artifacts")]
    artifacts: usize,
}

pub fn run(cmd: TemplateCommand, workspace: &Workspace) -> Result<()> {
    match cmd {
        TemplateCommand::Add(args) => add(args, workspace),
        TemplateCommand::List => list(workspace),
        TemplateCommand::Remove(args) => remove(args, workspace),
    }
}

fn add(args: AddArgs, workspace: &Workspace) -> Result<()> {
    let project = workspace.open()?;
    let template = workspace.resolve(&args.template);
    if !template.is_file() {
        anyhow::bail!("template file '{}' does not exist", template.display());
    }

    let defaults = TemplateSettings::default();
    let settings = TemplateSettings {
        output_extension: args.output_extension,
        output_filename: args.output_filename,
        include: args.include,
        pattern: args.pattern.unwrap_or(defaults.pattern),
    };
    let path = project
        .add_template(&template, settings)
        .with_context(|| format!("failed to add template '{}'", template.display()))?;

    // Compile before saving so a broken template never lands in the manifest.
    Template::open(Arc::clone(&project), &path)
        .with_context(|| format!("template '{}' does not compile", path.display()))?;
    project.save().context("failed to save stencil.yaml")?;

    println!(
        "✓ Tracking template '{}'",
        display_path(project.root(), &path)
    );
    Ok(())
}

fn list(workspace: &Workspace) -> Result<()> {
    let project = workspace.open()?;
    let templates = project.templates();
    if templates.is_empty() {
        println!("No templates tracked.");
        println!("Run: stencil template add <template>");
        return Ok(());
    }

    let mut rows = Vec::with_capacity(templates.len());
    for template in &templates {
        let settings = project
            .template_settings(template)
            .with_context(|| format!("failed to read settings for '{}'", template.display()))?;
        let artifacts = project
            .children(template)
            .with_context(|| format!("failed to list artifacts of '{}'", template.display()))?
            .len();
        rows.push(TemplateRow {
            template: display_path(project.root(), template),
            include: if settings.include.is_empty() {
                ".".to_string()
            } else {
                settings.include.join(", ")
            },
            pattern: settings.pattern,
            extension: settings
                .output_extension
                .unwrap_or_else(|| ".ts".to_string()),
            artifacts,
        });
    }

    let mut table = Table::new(rows);
    table.with(Style::rounded());
    println!("{table}");
    Ok(())
}

fn remove(args: RemoveArgs, workspace: &Workspace) -> Result<()> {
    let project = workspace.open()?;
    let template = workspace.resolve(&args.template);
    project
        .remove_template(&template)
        .with_context(|| format!("failed to remove template '{}'", template.display()))?;
    project.save().context("failed to save stencil.yaml")?;
    println!(
        "✓ Removed template '{}'",
        display_path(project.root(), &template)
    );
    Ok(())
}
