pub mod diff;
pub mod init;
pub mod lifecycle;
pub mod prune;
pub mod render;
pub mod status;
pub mod template;
pub mod watch;

use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::{Context, Result};

use stencil_core::{paths, project::find_root_from, Project};
use stencil_sync::{ArtifactResult, RenderScope};

/// Where the command runs: the working directory plus an optional `--root`.
#[derive(Debug)]
pub struct Workspace {
    cwd: PathBuf,
    root: Option<PathBuf>,
}

impl Workspace {
    pub fn new(root: Option<PathBuf>) -> Result<Self> {
        let cwd = std::env::current_dir().context("could not determine current directory")?;
        Ok(Self { cwd, root })
    }

    /// Directory `init` writes to when no path is given.
    pub fn init_target(&self) -> PathBuf {
        match &self.root {
            Some(root) => self.resolve(root),
            None => self.cwd.clone(),
        }
    }

    /// Project root from `--root`, or the nearest ancestor with a manifest.
    pub fn project_root(&self) -> Result<PathBuf> {
        let root = match &self.root {
            Some(root) => self.resolve(root),
            None => find_root_from(&self.cwd).with_context(|| {
                format!(
                    "no stencil.yaml found in '{}' or its parents; run `stencil init` first",
                    self.cwd.display()
                )
            })?,
        };
        fs::canonicalize(&root)
            .with_context(|| format!("cannot resolve project root '{}'", root.display()))
    }

    pub fn open(&self) -> Result<Arc<Project>> {
        let root = self.project_root()?;
        let project = Project::load_at(&root)
            .with_context(|| format!("failed to load project at '{}'", root.display()))?;
        Ok(Arc::new(project))
    }

    /// Absolute form of a path argument, resolved against the working
    /// directory. Existing parents are canonicalized so the result lines up
    /// with the canonical project root even when the file itself is gone.
    pub fn resolve(&self, path: &Path) -> PathBuf {
        let abs = paths::normalize(&self.cwd.join(path));
        if let Ok(real) = fs::canonicalize(&abs) {
            return real;
        }
        match (abs.parent(), abs.file_name()) {
            (Some(parent), Some(name)) => match fs::canonicalize(parent) {
                Ok(parent) => parent.join(name),
                Err(_) => abs,
            },
            _ => abs,
        }
    }

    pub fn scope(&self, template: Option<&Path>) -> RenderScope {
        match template {
            Some(template) => RenderScope::Template(self.resolve(template)),
            None => RenderScope::All,
        }
    }
}

/// Root-relative display form of `path`.
pub fn display_path(root: &Path, path: &Path) -> String {
    paths::to_slash(&paths::relative_to(root, path))
}

/// One line per artifact result; `None` for results with nothing to report.
pub fn describe(root: &Path, result: &ArtifactResult) -> Option<String> {
    let line = match result {
        ArtifactResult::Written { path } => format!("✓ wrote {}", display_path(root, path)),
        ArtifactResult::Unchanged { path } => format!("= unchanged {}", display_path(root, path)),
        ArtifactResult::Deleted { path } => format!("✗ deleted {}", display_path(root, path)),
        ArtifactResult::Renamed { from, to } => format!(
            "→ renamed {} to {}",
            display_path(root, from),
            display_path(root, to)
        ),
        ArtifactResult::Remapped { path } => format!("~ remapped {}", display_path(root, path)),
        ArtifactResult::NoArtifact => return None,
    };
    Some(line)
}

/// Print the lines for `results`, skipping unchanged artifacts unless `verbose`.
pub fn print_results(root: &Path, results: &[(PathBuf, ArtifactResult)], verbose: bool) {
    for (_, result) in results {
        if !verbose && matches!(result, ArtifactResult::Unchanged { .. }) {
            continue;
        }
        if let Some(line) = describe(root, result) {
            println!("{line}");
        }
    }
}
