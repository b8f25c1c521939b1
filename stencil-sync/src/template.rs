//! A tracked template and the lifecycle operations on its artifacts.
//!
//! Each [`Template`] holds one mutex per scope. Every mutation of its scope,
//! and the allocation/lookup reads feeding it, run under that lock; templates
//! of the same project proceed in parallel and only meet inside the
//! container's own synchronization. A reopened template can take over the
//! mutex of the instance it replaces with [`Template::share_lock`].

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use stencil_core::{paths, Project, SourceScope, SourceUnit};
use stencil_renderer::TemplateEngine;

use crate::allocator;
use crate::error::SyncError;
use crate::render::{NamingPolicy, SourceCatalog, SourceRenderer};
use crate::status::{self, ArtifactReport, ArtifactStatus};
use crate::tracker::ContainerTracker;
use crate::vcs::{self, VersionControl};
use crate::writer::{ArtifactResult, Reconciler};

/// The collaborators a template delegates to.
pub struct TemplateParts {
    pub renderer: Arc<dyn SourceRenderer>,
    pub naming: Arc<dyn NamingPolicy>,
    pub sources: Arc<dyn SourceCatalog>,
    pub vcs: Arc<dyn VersionControl>,
}

/// One template item plus the scope of artifacts it owns.
pub struct Template {
    path: PathBuf,
    tracker: Arc<dyn ContainerTracker>,
    parts: TemplateParts,
    lock: Arc<Mutex<()>>,
}

impl Template {
    pub fn new(path: &Path, tracker: Arc<dyn ContainerTracker>, parts: TemplateParts) -> Self {
        Self {
            path: paths::normalize(path),
            tracker,
            parts,
            lock: Arc::new(Mutex::new(())),
        }
    }

    /// The mutex serializing work on this template's scope.
    pub fn lock_handle(&self) -> Arc<Mutex<()>> {
        Arc::clone(&self.lock)
    }

    /// Use `lock` instead of this template's own mutex, so a reopened
    /// template stays serialized with the instance it replaces.
    pub fn share_lock(mut self, lock: Arc<Mutex<()>>) -> Self {
        self.lock = lock;
        self
    }

    /// Open a template tracked by `project`: compile it with Tera, build its
    /// source scope and pick up the project's version control.
    pub fn open(project: Arc<Project>, template: &Path) -> Result<Self, SyncError> {
        let path = if template.is_absolute() {
            paths::normalize(template)
        } else {
            paths::normalize(&project.root().join(template))
        };
        let settings = project.template_settings(&path)?;
        let engine = Arc::new(TemplateEngine::load(
            project.root(),
            &path,
            settings.clone(),
        )?);
        let sources = Arc::new(SourceScope::from_settings(project.root(), &settings)?);
        let parts = TemplateParts {
            renderer: engine.clone(),
            naming: engine,
            sources,
            vcs: vcs::from_settings(project.vcs()),
        };
        Ok(Self::new(&path, project, parts))
    }

    /// Absolute path of the template item.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every source unit this template processes.
    pub fn source_units(&self) -> Result<BTreeSet<PathBuf>, SyncError> {
        Ok(self.parts.sources.list()?)
    }

    /// Whether `path` belongs to this template's sources.
    pub fn should_process(&self, path: &Path) -> bool {
        self.parts.sources.contains(path)
    }

    /// Render `source` without touching the filesystem.
    pub fn render(&self, source: &SourceUnit) -> Result<Option<String>, SyncError> {
        Ok(self.parts.renderer.render(source)?)
    }

    /// Render `source` and reconcile its artifact.
    ///
    /// A render failure returns before anything is written or remapped.
    pub fn render_to_file(
        &self,
        source: &SourceUnit,
        persist: bool,
    ) -> Result<ArtifactResult, SyncError> {
        let rendered = self.render(source)?;
        let _guard = self.guard();
        self.reconciler()
            .reconcile(source, rendered.as_deref(), persist)
    }

    /// Delete the artifact generated from `source`; no-op when none exists.
    pub fn delete_artifact(
        &self,
        source: &Path,
        persist: bool,
    ) -> Result<ArtifactResult, SyncError> {
        let _guard = self.guard();
        self.reconciler().delete_by_source(source, persist)
    }

    /// Follow a rename of the source at `old_path` to `source`.
    pub fn rename_artifact(
        &self,
        source: &SourceUnit,
        old_path: &Path,
        persist: bool,
    ) -> Result<ArtifactResult, SyncError> {
        let _guard = self.guard();
        self.reconciler().rename(source, old_path, persist)
    }

    /// Absolute paths of the artifacts in this template's scope.
    pub fn artifacts(&self) -> Result<Vec<PathBuf>, SyncError> {
        let _guard = self.guard();
        Ok(self.tracker.children(&self.path)?)
    }

    /// Path the artifact for `source` would be written to now.
    pub fn planned_path(&self, source: &SourceUnit) -> Result<PathBuf, SyncError> {
        let _guard = self.guard();
        allocator::allocate(
            self.tracker.as_ref(),
            &self.path,
            source,
            self.parts.naming.as_ref(),
        )
    }

    /// Artifact currently mapped to `source`, if any.
    pub fn artifact_for(&self, source: &Path) -> Result<Option<PathBuf>, SyncError> {
        let _guard = self.guard();
        crate::lookup::find_by_source_path(self.tracker.as_ref(), &self.path, source)
    }

    /// Classify every artifact in scope.
    pub fn status(&self) -> Result<Vec<ArtifactReport>, SyncError> {
        let _guard = self.guard();
        status::check(
            self.tracker.as_ref(),
            &self.path,
            self.parts.sources.as_ref(),
        )
    }

    /// Delete artifacts whose source is gone or no longer in scope.
    ///
    /// Returns the removed artifact paths.
    pub fn prune_orphans(&self, persist: bool) -> Result<Vec<PathBuf>, SyncError> {
        let _guard = self.guard();
        let reports = status::check(
            self.tracker.as_ref(),
            &self.path,
            self.parts.sources.as_ref(),
        )?;
        let reconciler = self.reconciler();
        let mut removed = Vec::new();
        for report in reports {
            if let ArtifactStatus::Orphaned { source } = &report.status {
                if let ArtifactResult::Deleted { path } =
                    reconciler.delete_by_source(source, false)?
                {
                    removed.push(path);
                }
            }
        }
        if persist && !removed.is_empty() {
            self.tracker.save()?;
        }
        Ok(removed)
    }

    fn reconciler(&self) -> Reconciler<'_> {
        Reconciler {
            tracker: self.tracker.as_ref(),
            scope: &self.path,
            naming: self.parts.naming.as_ref(),
            vcs: self.parts.vcs.as_ref(),
        }
    }

    fn guard(&self) -> MutexGuard<'_, ()> {
        self.lock.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl std::fmt::Debug for Template {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Template").field("path", &self.path).finish()
    }
}
