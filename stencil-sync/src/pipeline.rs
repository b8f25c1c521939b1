//! Shared render pipeline used by the CLI and the watcher.
//!
//! Batch operations render with `persist = false` and save the project once
//! at the end, so a run produces a single manifest write.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use stencil_core::{paths, Project, SourceUnit};

use crate::error::SyncError;
use crate::template::Template;
use crate::writer::ArtifactResult;

/// Which templates a pipeline run covers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RenderScope {
    /// Every tracked template.
    All,
    /// A single template, absolute or root-relative.
    Template(PathBuf),
}

/// A source that failed to render or reconcile. Other sources still run.
#[derive(Debug)]
pub struct SourceFailure {
    pub source: PathBuf,
    pub error: SyncError,
}

/// Outcome of running one template over its sources.
#[derive(Debug)]
pub struct TemplateRun {
    pub template: PathBuf,
    pub results: Vec<(PathBuf, ArtifactResult)>,
    pub failures: Vec<SourceFailure>,
}

impl TemplateRun {
    pub fn changed(&self) -> usize {
        self.results.iter().filter(|(_, r)| r.is_change()).count()
    }
}

/// Open the templates selected by `scope`.
pub fn open_templates(
    project: &Arc<Project>,
    scope: &RenderScope,
) -> Result<Vec<Template>, SyncError> {
    match scope {
        RenderScope::All => project
            .templates()
            .iter()
            .map(|path| Template::open(Arc::clone(project), path))
            .collect(),
        RenderScope::Template(path) => Ok(vec![Template::open(Arc::clone(project), path)?]),
    }
}

/// Render every source of every template in `scope`, then save the project.
pub fn run(project: &Arc<Project>, scope: &RenderScope) -> Result<Vec<TemplateRun>, SyncError> {
    let templates = open_templates(project, scope)?;
    run_templates(project, &templates)
}

/// Render every source of already opened templates, then save the project.
pub fn run_templates<'a>(
    project: &Project,
    templates: impl IntoIterator<Item = &'a Template>,
) -> Result<Vec<TemplateRun>, SyncError> {
    let mut runs = Vec::new();
    for template in templates {
        runs.push(run_template(template)?);
    }
    project.save()?;
    Ok(runs)
}

fn run_template(template: &Template) -> Result<TemplateRun, SyncError> {
    let mut run = TemplateRun {
        template: template.path().to_path_buf(),
        results: Vec::new(),
        failures: Vec::new(),
    };
    for source in template.source_units()? {
        let unit = SourceUnit::new(&source);
        match template.render_to_file(&unit, false) {
            Ok(result) => run.results.push((source, result)),
            Err(error) => {
                tracing::warn!("{}: {}: {error}", template.path().display(), source.display());
                run.failures.push(SourceFailure { source, error });
            }
        }
    }
    Ok(run)
}

/// Render `source` with every template that processes it.
///
/// The project is saved when any template touched an artifact.
pub fn render_source(
    project: &Project,
    templates: &[Template],
    source: &Path,
) -> Result<Vec<(PathBuf, ArtifactResult)>, SyncError> {
    let source = paths::normalize(source);
    let unit = SourceUnit::new(&source);
    let mut results = Vec::new();
    for template in templates.iter().filter(|t| t.should_process(&source)) {
        results.push((template.path().to_path_buf(), template.render_to_file(&unit, false)?));
    }
    save_if_changed(project, &results)?;
    Ok(results)
}

/// Delete the artifacts generated from `source` in every template.
pub fn delete_source(
    project: &Project,
    templates: &[Template],
    source: &Path,
) -> Result<Vec<(PathBuf, ArtifactResult)>, SyncError> {
    let source = paths::normalize(source);
    let mut results = Vec::new();
    for template in templates {
        results.push((template.path().to_path_buf(), template.delete_artifact(&source, false)?));
    }
    save_if_changed(project, &results)?;
    Ok(results)
}

/// Follow a source rename in every template.
///
/// Templates that process the new path rename (or, lacking an artifact,
/// render) it; templates that do not delete whatever the old path produced.
pub fn rename_source(
    project: &Project,
    templates: &[Template],
    old: &Path,
    new: &Path,
) -> Result<Vec<(PathBuf, ArtifactResult)>, SyncError> {
    let old = paths::normalize(old);
    let new = paths::normalize(new);
    let unit = SourceUnit::new(&new);
    let mut results = Vec::new();
    for template in templates {
        let result = if template.should_process(&new) {
            match template.rename_artifact(&unit, &old, false)? {
                ArtifactResult::NoArtifact => template.render_to_file(&unit, false)?,
                other => other,
            }
        } else {
            template.delete_artifact(&old, false)?
        };
        results.push((template.path().to_path_buf(), result));
    }
    save_if_changed(project, &results)?;
    Ok(results)
}

// Unchanged renders may still have adopted a file or fixed its mapping.
fn save_if_changed(
    project: &Project,
    results: &[(PathBuf, ArtifactResult)],
) -> Result<(), SyncError> {
    if results.iter().any(|(_, r)| *r != ArtifactResult::NoArtifact) {
        project.save()?;
    }
    Ok(())
}
