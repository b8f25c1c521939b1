//! Container tracking seam.
//!
//! The engine never touches the manifest directly; it goes through
//! [`ContainerTracker`], which [`Project`] implements. Implementations are
//! shared between templates and must synchronize internally.

use std::path::{Path, PathBuf};

use stencil_core::{Project, ProjectError};

/// Operations the sync engine needs from the container that tracks
/// templates and their artifacts.
pub trait ContainerTracker: Send + Sync {
    /// Directory that stored mappings are relative to.
    fn root(&self) -> &Path;

    /// Absolute paths of the artifacts directly owned by `scope`.
    fn children(&self, scope: &Path) -> Result<Vec<PathBuf>, ProjectError>;

    /// Track an existing file as an artifact of `scope`.
    fn add_from_file(&self, scope: &Path, file: &Path) -> Result<PathBuf, ProjectError>;

    /// Untrack an artifact and delete its file.
    fn remove(&self, item: &Path) -> Result<(), ProjectError>;

    /// Rename an artifact's file in place; returns the new path.
    fn rename(&self, item: &Path, new_name: &str) -> Result<PathBuf, ProjectError>;

    /// Scope that tracks `item`, if any.
    fn owner(&self, item: &Path) -> Result<Option<PathBuf>, ProjectError>;

    /// Whether items expose an attribute slot called `name`.
    fn supports_attribute(&self, name: &str) -> bool;

    fn attribute(&self, item: &Path, name: &str) -> Result<Option<String>, ProjectError>;

    fn set_attribute(&self, item: &Path, name: &str, value: &str) -> Result<(), ProjectError>;

    /// Persist the container.
    fn save(&self) -> Result<(), ProjectError>;
}

impl ContainerTracker for Project {
    fn root(&self) -> &Path {
        Project::root(self)
    }

    fn children(&self, scope: &Path) -> Result<Vec<PathBuf>, ProjectError> {
        Project::children(self, scope)
    }

    fn add_from_file(&self, scope: &Path, file: &Path) -> Result<PathBuf, ProjectError> {
        self.add_child(scope, file)
    }

    fn remove(&self, item: &Path) -> Result<(), ProjectError> {
        self.remove_child(item)
    }

    fn rename(&self, item: &Path, new_name: &str) -> Result<PathBuf, ProjectError> {
        self.rename_child(item, new_name)
    }

    fn owner(&self, item: &Path) -> Result<Option<PathBuf>, ProjectError> {
        self.owner_of(item)
    }

    fn supports_attribute(&self, name: &str) -> bool {
        self.manifest().attributes.contains(name)
    }

    fn attribute(&self, item: &Path, name: &str) -> Result<Option<String>, ProjectError> {
        Project::attribute(self, item, name)
    }

    fn set_attribute(&self, item: &Path, name: &str, value: &str) -> Result<(), ProjectError> {
        Project::set_attribute(self, item, name, value)
    }

    fn save(&self) -> Result<(), ProjectError> {
        Project::save(self)
    }
}
